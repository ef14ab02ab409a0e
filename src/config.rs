//! Engine configuration.
//!
//! Feature toggles are threaded explicitly through editor construction
//! rather than read from a process-wide flag manager, so two editors in the
//! same process can run different feature combinations (useful for
//! exercising both render paths side by side in tests).

/// Render/feature configuration for one editor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Use batched per-annotation draw callbacks with dirty tracking.
    /// When false, layers re-render everything on every flush.
    pub batched_layers: bool,
    /// Enable the raster mask subsystem. When false, raster creation
    /// is a no-op and mask annotations render nothing.
    pub raster_masks: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            batched_layers: true,
            raster_masks: true,
        }
    }
}

impl RenderConfig {
    /// Configuration matching the legacy immediate-draw pipeline.
    pub fn legacy() -> Self {
        Self {
            batched_layers: false,
            raster_masks: false,
        }
    }
}
