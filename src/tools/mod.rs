//! Interactive tools.
//!
//! Tools receive pointer and keyboard events targeted at the active view.
//! They mutate view-local state (selection, previews, the raster) directly
//! and queue [`ToolIntent`]s for everything that must go through the
//! action history; the editor drains the queue after each event and runs
//! the actions with full access to every view.

mod brush;
mod clicker;
mod edit;

pub use brush::BrushTool;
pub use clicker::{ClickKind, ClickerTool};
pub use edit::EditTool;

use std::collections::HashMap;

use log::debug;

use crate::action::{Action, ActionManager, GroupId};
use crate::config::RenderConfig;
use crate::error::EngineError;
use crate::geometry::CanvasPoint;
use crate::render::RendererRegistry;
use crate::view::View;

/// Canvas-pixel radius within which a click grabs a vertex.
pub const VERTEX_GRAB_RANGE: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// A pointer event in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub position: CanvasPoint,
    pub button: MouseButton,
    pub shift: bool,
    pub alt: bool,
}

impl MouseEvent {
    pub fn left(position: CanvasPoint) -> Self {
        Self {
            position,
            button: MouseButton::Left,
            shift: false,
            alt: false,
        }
    }
}

/// A keyboard event, keyed by the DOM-style key name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            shift: false,
        }
    }
}

/// A history operation queued by a tool.
pub enum ToolIntent {
    /// Apply the action through the manager.
    Perform {
        action: Box<dyn Action>,
        group: Option<GroupId>,
    },
    /// Push an already-applied action onto the history.
    Record {
        action: Box<dyn Action>,
        group: Option<GroupId>,
    },
}

/// Everything a tool may touch while handling an event.
pub struct ToolContext<'a> {
    pub view_index: usize,
    pub view: &'a mut View,
    pub actions: &'a mut ActionManager,
    pub registry: &'a RendererRegistry,
    pub config: &'a RenderConfig,
    pub intents: &'a mut Vec<ToolIntent>,
}

impl ToolContext<'_> {
    pub fn perform(&mut self, action: impl Action + 'static) {
        self.intents.push(ToolIntent::Perform {
            action: Box::new(action),
            group: None,
        });
    }

    pub fn perform_in_group(&mut self, action: impl Action + 'static, group: GroupId) {
        self.intents.push(ToolIntent::Perform {
            action: Box::new(action),
            group: Some(group),
        });
    }

    pub fn record(&mut self, action: impl Action + 'static) {
        self.intents.push(ToolIntent::Record {
            action: Box::new(action),
            group: None,
        });
    }
}

/// An interactive tool bound to the active view.
pub trait Tool {
    fn name(&self) -> &'static str;

    /// Downcast hook so callers can reach tool-specific configuration.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    fn activate(&mut self, _ctx: &mut ToolContext) {}

    /// Called when another tool takes over; must drop transient state.
    fn deactivate(&mut self, _ctx: &mut ToolContext) {}

    fn on_mouse_down(&mut self, _event: &MouseEvent, _ctx: &mut ToolContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn on_mouse_move(&mut self, _event: &MouseEvent, _ctx: &mut ToolContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn on_mouse_up(&mut self, _event: &MouseEvent, _ctx: &mut ToolContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn on_key_down(&mut self, _event: &KeyEvent, _ctx: &mut ToolContext) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Owns all registered tools and routes events to the active one.
#[derive(Default)]
pub struct ToolManager {
    tools: HashMap<&'static str, Box<dyn Tool>>,
    active: Option<&'static str>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with the built-in tools registered and the edit tool
    /// active by default.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.register(Box::new(EditTool::new()));
        manager.register(Box::new(ClickerTool::new()));
        manager.register(Box::new(BrushTool::new()));
        manager.active = Some("edit");
        manager
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn active_tool(&self) -> Option<&'static str> {
        self.active
    }

    /// A registered tool by name, for tool-specific configuration.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Tool + 'static)> {
        self.tools.get_mut(name).map(|tool| tool.as_mut())
    }

    /// Switch tools, running the deactivate/activate lifecycle.
    pub fn activate(&mut self, name: &str, ctx: &mut ToolContext) -> bool {
        let Some((key, _)) = self.tools.get_key_value(name) else {
            return false;
        };
        let key = *key;
        if self.active == Some(key) {
            return true;
        }
        if let Some(previous) = self.active.take()
            && let Some(tool) = self.tools.get_mut(previous)
        {
            tool.deactivate(ctx);
        }
        if let Some(tool) = self.tools.get_mut(key) {
            tool.activate(ctx);
        }
        debug!("tool {key} activated");
        self.active = Some(key);
        true
    }

    /// Route an event to the active tool.
    pub fn mouse_down(&mut self, event: &MouseEvent, ctx: &mut ToolContext) -> Result<(), EngineError> {
        match self.active_mut() {
            Some(tool) => tool.on_mouse_down(event, ctx),
            None => Ok(()),
        }
    }

    pub fn mouse_move(&mut self, event: &MouseEvent, ctx: &mut ToolContext) -> Result<(), EngineError> {
        match self.active_mut() {
            Some(tool) => tool.on_mouse_move(event, ctx),
            None => Ok(()),
        }
    }

    pub fn mouse_up(&mut self, event: &MouseEvent, ctx: &mut ToolContext) -> Result<(), EngineError> {
        match self.active_mut() {
            Some(tool) => tool.on_mouse_up(event, ctx),
            None => Ok(()),
        }
    }

    pub fn key_down(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> Result<(), EngineError> {
        match self.active_mut() {
            Some(tool) => tool.on_key_down(event, ctx),
            None => Ok(()),
        }
    }

    fn active_mut(&mut self) -> Option<&mut Box<dyn Tool>> {
        self.active.and_then(|name| self.tools.get_mut(name))
    }
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolManager")
            .field("tools", &self.tools.len())
            .field("active", &self.active)
            .finish()
    }
}
