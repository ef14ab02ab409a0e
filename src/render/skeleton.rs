//! Skeleton renderer: named nodes drawn as vertices, occluded nodes dimmed.

use crate::error::EngineError;
use crate::geometry::ImagePoint;
use crate::interpolate::{InterpolationParams, lerp_point};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind, SkeletonData, SkeletonNode};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

pub struct SkeletonRenderer;

fn skeleton_of(data: &AnnotationData) -> Option<&SkeletonData> {
    match data {
        AnnotationData::Skeleton(skeleton) => Some(skeleton),
        _ => None,
    }
}

impl AnnotationRenderer for SkeletonRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Skeleton
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let skeleton = skeleton_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        for node in &skeleton.nodes {
            let mut fill = ctx.color;
            if node.occluded {
                fill[3] *= 0.4;
            }
            layer.push(
                id,
                DrawCommand::Circle {
                    center: ctx.camera.image_to_canvas(node.point),
                    radius: VERTEX_RADIUS,
                    fill,
                },
            );
            if ctx.is_selected {
                layer.push(
                    id,
                    DrawCommand::Text {
                        anchor: ctx.camera.image_to_canvas(node.point),
                        text: node.name.clone(),
                        color: ctx.color,
                    },
                );
            }
        }
        Ok(())
    }

    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        skeleton_of(data)
            .map(|s| s.nodes.iter().map(|n| n.point).collect())
            .unwrap_or_default()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::Skeleton(skeleton) = data {
            for node in &mut skeleton.nodes {
                node.point = node.point + delta;
            }
        }
    }

    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        if let AnnotationData::Skeleton(skeleton) = data
            && let Some(node) = skeleton.nodes.get_mut(vertex_index)
        {
            node.point = to;
        }
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    /// Nodes are matched by name; nodes present in only one keyframe are
    /// carried over unchanged from the start keyframe.
    fn interpolate(
        &self,
        start: &AnnotationData,
        end: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, EngineError> {
        params.require_linear()?;
        let start = skeleton_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = skeleton_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;

        let nodes = start
            .nodes
            .iter()
            .map(|node| {
                match end.nodes.iter().find(|candidate| candidate.name == node.name) {
                    Some(target) => SkeletonNode {
                        name: node.name.clone(),
                        point: lerp_point(node.point, target.point, params.factor),
                        occluded: if params.factor < 0.5 {
                            node.occluded
                        } else {
                            target.occluded
                        },
                    },
                    None => node.clone(),
                }
            })
            .collect();
        Ok(AnnotationData::Skeleton(SkeletonData { nodes }))
    }
}
