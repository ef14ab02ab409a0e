//! Annotation renderer framework.
//!
//! Each annotation kind registers an [`AnnotationRenderer`] in the
//! [`RendererRegistry`]. Renderers translate annotation payloads into
//! [`DrawCommand`]s on a [`Layer`] and expose the geometric operations
//! tools need: outline path, editable vertices, translation, vertex moves
//! and keyframe interpolation.

mod bounding_box;
mod ellipse;
mod keypoint;
mod line;
mod mask;
mod polygon;
mod simple;
mod skeleton;

pub use bounding_box::BoundingBoxRenderer;
pub use ellipse::EllipseRenderer;
pub use keypoint::KeypointRenderer;
pub use line::LineRenderer;
pub use mask::MaskRenderer;
pub use polygon::PolygonRenderer;
pub use simple::{
    CuboidRenderer, DirectionalVectorRenderer, InstanceIdRenderer, LinkRenderer,
    RasterLayerRenderer, TagRenderer, TextRenderer,
};
pub use skeleton::SkeletonRenderer;

use std::collections::HashMap;

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect};
use crate::interpolate::InterpolationParams;
use crate::layer::{Color, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind};

// ============================================================================
// Render context
// ============================================================================

/// Per-annotation state handed to a renderer during a render pass.
pub struct RenderContext<'a> {
    pub camera: &'a Camera,
    pub config: &'a RenderConfig,
    pub color: Color,
    pub is_selected: bool,
    pub is_highlighted: bool,
}

impl RenderContext<'_> {
    /// Stroke width scaled up for selected or highlighted annotations.
    pub fn line_width(&self) -> f32 {
        if self.is_selected { 2.0 } else { 1.0 }
    }

    /// Fill color, only applied while highlighted or selected.
    pub fn fill(&self) -> Option<Color> {
        if self.is_selected || self.is_highlighted {
            let [r, g, b, _] = self.color;
            Some([r, g, b, 0.15])
        } else {
            None
        }
    }
}

/// Radius of vertex markers in canvas pixels.
pub const VERTEX_RADIUS: f32 = 3.5;

/// Deterministic per-class color from a golden-angle hue walk.
pub fn class_color(class_id: u32) -> Color {
    let hue = (class_id as f32 * 137.508) % 360.0;
    let h = hue / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    [r, g, b, 1.0]
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Kind-specific rendering and geometry operations.
///
/// `path` returns the outline used for hit testing; `all_vertices` the
/// editable control points in the order `move_vertex` indexes them.
pub trait AnnotationRenderer {
    fn kind(&self) -> AnnotationKind;

    /// Append this annotation's draw commands to `layer`.
    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError>;

    /// The image-space outline path. Empty for kinds without geometry.
    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint>;

    /// All editable control points, indexable by `move_vertex`.
    fn all_vertices(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        self.path(data)
    }

    /// Translate the whole annotation by an image-space delta.
    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint);

    /// Move the control point at `vertex_index` to an absolute position.
    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint);

    /// Whether this kind can be interpolated between video keyframes.
    fn supports_interpolate(&self) -> bool {
        false
    }

    /// Interpolate between two keyframe payloads of this kind.
    fn interpolate(
        &self,
        _start: &AnnotationData,
        _end: &AnnotationData,
        _params: &InterpolationParams,
    ) -> Result<AnnotationData, EngineError> {
        Err(EngineError::InterpolationNotSupported { kind: self.kind() })
    }

    /// Image-space bounding rectangle, if the kind has spatial extent.
    fn bounding_rect(&self, data: &AnnotationData) -> Option<ImageRect> {
        ImageRect::around_points(self.all_vertices(data).iter())
    }
}

/// Shared mismatch error for renderers handed the wrong payload variant.
pub(crate) fn kind_mismatch(expected: AnnotationKind, data: &AnnotationData) -> EngineError {
    EngineError::KindMismatch {
        expected,
        actual: data.kind(),
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Lookup table from annotation kind to its renderer.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: HashMap<AnnotationKind, Box<dyn AnnotationRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with renderers for every built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BoundingBoxRenderer));
        registry.register(Box::new(PolygonRenderer));
        registry.register(Box::new(KeypointRenderer));
        registry.register(Box::new(SkeletonRenderer));
        registry.register(Box::new(EllipseRenderer));
        registry.register(Box::new(LineRenderer));
        registry.register(Box::new(MaskRenderer));
        registry.register(Box::new(CuboidRenderer));
        registry.register(Box::new(TagRenderer));
        registry.register(Box::new(TextRenderer));
        registry.register(Box::new(InstanceIdRenderer));
        registry.register(Box::new(LinkRenderer));
        registry.register(Box::new(DirectionalVectorRenderer));
        registry.register(Box::new(RasterLayerRenderer));
        registry
    }

    /// Register a renderer, replacing any previous one for the same kind.
    pub fn register(&mut self, renderer: Box<dyn AnnotationRenderer>) {
        self.renderers.insert(renderer.kind(), renderer);
    }

    pub fn get(&self, kind: AnnotationKind) -> Result<&dyn AnnotationRenderer, EngineError> {
        self.renderers
            .get(&kind)
            .map(|r| r.as_ref())
            .ok_or(EngineError::RendererNotRegistered { kind })
    }

    pub fn contains(&self, kind: AnnotationKind) -> bool {
        self.renderers.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::PolygonData;

    #[test]
    fn test_registry_with_defaults_covers_all_kinds() {
        let registry = RendererRegistry::with_defaults();
        for kind in AnnotationKind::ALL {
            assert!(registry.contains(kind), "missing renderer for {kind:?}");
        }
    }

    #[test]
    fn test_get_unregistered_kind_errors() {
        let registry = RendererRegistry::new();
        assert!(matches!(
            registry.get(AnnotationKind::Polygon),
            Err(EngineError::RendererNotRegistered { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch_reports_both_kinds() {
        let data = AnnotationData::Polygon(PolygonData {
            path: vec![Point::new(0.0, 0.0)],
            additional_paths: Vec::new(),
        });
        let err = kind_mismatch(AnnotationKind::BoundingBox, &data);
        assert!(matches!(
            err,
            EngineError::KindMismatch {
                expected: AnnotationKind::BoundingBox,
                actual: AnnotationKind::Polygon,
            }
        ));
    }

    #[test]
    fn test_class_color_is_opaque_and_stable() {
        assert_eq!(class_color(3), class_color(3));
        assert_eq!(class_color(3)[3], 1.0);
        assert_ne!(class_color(3), class_color(4));
    }
}
