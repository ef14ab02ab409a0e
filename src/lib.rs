//! Vellum - image and video annotation engine
//!
//! The headless core of an annotation editor: typed geometry, an undoable
//! action history, per-kind annotation renderers producing draw commands,
//! raster mask painting, video keyframe inference and frame loading. The
//! embedding UI owns the actual canvas, network and decoding; this crate
//! owns every piece of state behind them.

mod action;
mod annotation_manager;
mod callback;
mod camera;
mod config;
mod editor;
mod error;
mod frames;
mod geometry;
mod interpolate;
mod layer;
mod model;
mod raster;
mod render;
mod serializer;
mod tools;
mod view;

pub use action::{
    Action, ActionEvent, ActionManager, CreateAnnotationAction, DeleteAnnotationAction,
    EditContext, GroupId, UpdateAnnotationDataAction,
};
pub use annotation_manager::{AnnotationChange, AnnotationManager};
pub use callback::{CallbackHandle, CallbackHandleCollection, CallbackStatus};
pub use camera::{Camera, MAX_SCALE, MIN_SCALE, ZOOM_STEP};
pub use config::RenderConfig;
pub use editor::Editor;
pub use error::EngineError;
pub use frames::{FrameQuality, FrameRequest, FramesLoader, LoadedFrame, DEFAULT_CONCURRENCY};
pub use geometry::{
    polygon_contains, CanvasPoint, CanvasRect, CanvasSpace, ImagePoint, ImageRect, ImageSpace,
    Point, Rectangle,
};
pub use interpolate::{
    interpolate_path, lerp, lerp_point, lerp_rect, resample_closed_path, InterpolationParams,
};
pub use layer::{Color, DrawCommand, Layer};
pub use model::*;
pub use raster::{
    create_raster_from_annotations, decode_dense_rle, encode_dense_rle, DecodedRle, Raster,
    BACKGROUND,
};
pub use render::{
    class_color, AnnotationRenderer, BoundingBoxRenderer, CuboidRenderer,
    DirectionalVectorRenderer, EllipseRenderer, InstanceIdRenderer, KeypointRenderer,
    LineRenderer, LinkRenderer, MaskRenderer, PolygonRenderer, RasterLayerRenderer, RenderContext,
    RendererRegistry, SkeletonRenderer, TagRenderer, TextRenderer, VERTEX_RADIUS,
};
pub use serializer::{AnnotationTypeSerializer, SerializerRegistry};
pub use tools::{
    BrushTool, ClickKind, ClickerTool, EditTool, KeyEvent, MouseButton, MouseEvent, Tool,
    ToolContext, ToolIntent, ToolManager, VERTEX_GRAB_RANGE,
};
pub use view::View;
