//! Annotation data model.
//!
//! Every annotation carries a kind-specific payload, modelled as the
//! [`AnnotationData`] tagged union so render and serialize sites match
//! exhaustively instead of duck-typing a data bag. Image annotations store
//! their payload directly; video annotations wrap per-frame payloads with
//! segment and interpolation bookkeeping (see [`video`]).

mod compound_path;
mod video;

pub use compound_path::{
    resolve_deletable_vertex_context, CompoundPath, DeletableVertexContext, EditablePoint,
};
pub use video::VideoAnnotationData;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{ImagePoint, ImageRect};

/// Unique identifier of an annotation within an editor.
pub type AnnotationId = u64;

/// Discriminant of an annotation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    BoundingBox,
    Polygon,
    Skeleton,
    Keypoint,
    Tag,
    Mask,
    InstanceId,
    Text,
    Cuboid,
    Ellipse,
    Line,
    Link,
    DirectionalVector,
    RasterLayer,
}

impl AnnotationKind {
    /// Every built-in kind, in declaration order.
    pub const ALL: [AnnotationKind; 14] = [
        AnnotationKind::BoundingBox,
        AnnotationKind::Polygon,
        AnnotationKind::Skeleton,
        AnnotationKind::Keypoint,
        AnnotationKind::Tag,
        AnnotationKind::Mask,
        AnnotationKind::InstanceId,
        AnnotationKind::Text,
        AnnotationKind::Cuboid,
        AnnotationKind::Ellipse,
        AnnotationKind::Line,
        AnnotationKind::Link,
        AnnotationKind::DirectionalVector,
        AnnotationKind::RasterLayer,
    ];

    /// Stable wire name, matching the serialized `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::BoundingBox => "bounding_box",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Skeleton => "skeleton",
            AnnotationKind::Keypoint => "keypoint",
            AnnotationKind::Tag => "tag",
            AnnotationKind::Mask => "mask",
            AnnotationKind::InstanceId => "instance_id",
            AnnotationKind::Text => "text",
            AnnotationKind::Cuboid => "cuboid",
            AnnotationKind::Ellipse => "ellipse",
            AnnotationKind::Line => "line",
            AnnotationKind::Link => "link",
            AnnotationKind::DirectionalVector => "directional_vector",
            AnnotationKind::RasterLayer => "raster_layer",
        }
    }
}

/// Polygon payload: a primary path plus optional additional paths
/// (holes or disjoint regions).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonData {
    pub path: Vec<ImagePoint>,
    #[serde(default)]
    pub additional_paths: Vec<Vec<ImagePoint>>,
}

/// A single named node of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonNode {
    pub name: String,
    pub point: ImagePoint,
    #[serde(default)]
    pub occluded: bool,
}

/// Skeleton payload: a set of named, possibly occluded nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonData {
    pub nodes: Vec<SkeletonNode>,
}

/// Mask payload. The pixel data itself lives in the view's raster buffer;
/// the annotation only carries the derived bounding box once decoded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<ImageRect>,
}

/// Cuboid payload: front and back faces as axis-aligned rectangles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuboidData {
    pub front: ImageRect,
    pub back: ImageRect,
}

/// Ellipse payload: center plus the points where the two radii end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseData {
    pub center: ImagePoint,
    pub right: ImagePoint,
    pub top: ImagePoint,
}

/// Polyline payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineData {
    pub path: Vec<ImagePoint>,
}

/// Link payload: connects two annotations by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub from: AnnotationId,
    pub to: AnnotationId,
}

/// Directional-vector payload: angle in radians plus length in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalVectorData {
    pub angle: f32,
    pub length: f32,
}

/// Raster-layer payload: the run-length-encoded label map for a whole view
/// plus the mapping from mask annotation ids to label indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RasterLayerData {
    /// Dense RLE, encoded as (label, run_length) pairs.
    pub dense_rle: Vec<u32>,
    /// Total number of pixels the RLE must decode to.
    pub total_pixels: u32,
    /// Mask annotation id -> label index on the decoded label map.
    pub mask_annotation_ids_mapping: HashMap<AnnotationId, u8>,
}

/// The kind-specific payload of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnnotationData {
    BoundingBox(ImageRect),
    Polygon(PolygonData),
    Skeleton(SkeletonData),
    Keypoint(ImagePoint),
    Tag,
    Mask(MaskData),
    InstanceId(u64),
    Text(String),
    Cuboid(CuboidData),
    Ellipse(EllipseData),
    Line(LineData),
    Link(LinkData),
    DirectionalVector(DirectionalVectorData),
    RasterLayer(RasterLayerData),
}

impl AnnotationData {
    /// The discriminant of this payload.
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationData::BoundingBox(_) => AnnotationKind::BoundingBox,
            AnnotationData::Polygon(_) => AnnotationKind::Polygon,
            AnnotationData::Skeleton(_) => AnnotationKind::Skeleton,
            AnnotationData::Keypoint(_) => AnnotationKind::Keypoint,
            AnnotationData::Tag => AnnotationKind::Tag,
            AnnotationData::Mask(_) => AnnotationKind::Mask,
            AnnotationData::InstanceId(_) => AnnotationKind::InstanceId,
            AnnotationData::Text(_) => AnnotationKind::Text,
            AnnotationData::Cuboid(_) => AnnotationKind::Cuboid,
            AnnotationData::Ellipse(_) => AnnotationKind::Ellipse,
            AnnotationData::Line(_) => AnnotationKind::Line,
            AnnotationData::Link(_) => AnnotationKind::Link,
            AnnotationData::DirectionalVector(_) => AnnotationKind::DirectionalVector,
            AnnotationData::RasterLayer(_) => AnnotationKind::RasterLayer,
        }
    }
}

/// Reference to an actor (annotator/reviewer) attached to an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorReference {
    pub actor_id: u64,
    pub role: ActorRole,
}

/// Role of an actor reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Annotator,
    Reviewer,
}

/// Payload container distinguishing image and video annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationPayload {
    /// A plain image annotation: one payload.
    Image(AnnotationData),
    /// A video annotation: payloads per keyframe plus segment bookkeeping.
    Video(VideoAnnotationData),
}

/// A single annotation on an image or video.
///
/// An annotation belongs to exactly one view's manager at a time; ownership
/// moves only through explicit manager operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier.
    pub id: AnnotationId,
    /// The annotation class this instance belongs to.
    pub class_id: u32,
    /// Actors who worked on this annotation.
    #[serde(default)]
    pub actors: Vec<ActorReference>,
    /// Stacking order. `None` sorts above every explicit z-index.
    #[serde(default)]
    pub z_index: Option<i32>,
    /// Kind-specific payload.
    pub payload: AnnotationPayload,
}

impl Annotation {
    /// Create an image annotation.
    pub fn image(id: AnnotationId, class_id: u32, data: AnnotationData) -> Self {
        Self {
            id,
            class_id,
            actors: Vec::new(),
            z_index: None,
            payload: AnnotationPayload::Image(data),
        }
    }

    /// Create a video annotation.
    pub fn video(id: AnnotationId, class_id: u32, data: VideoAnnotationData) -> Self {
        Self {
            id,
            class_id,
            actors: Vec::new(),
            z_index: None,
            payload: AnnotationPayload::Video(data),
        }
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    pub fn is_video(&self) -> bool {
        matches!(self.payload, AnnotationPayload::Video(_))
    }

    /// The payload kind. For video annotations this is the kind of the
    /// first keyframe; all keyframes of one annotation share a kind.
    pub fn kind(&self) -> Option<AnnotationKind> {
        match &self.payload {
            AnnotationPayload::Image(data) => Some(data.kind()),
            AnnotationPayload::Video(video) => video.kind(),
        }
    }

    /// The image payload, if this is an image annotation.
    pub fn image_data(&self) -> Option<&AnnotationData> {
        match &self.payload {
            AnnotationPayload::Image(data) => Some(data),
            AnnotationPayload::Video(_) => None,
        }
    }

    /// Mutable image payload, if this is an image annotation.
    pub fn image_data_mut(&mut self) -> Option<&mut AnnotationData> {
        match &mut self.payload {
            AnnotationPayload::Image(data) => Some(data),
            AnnotationPayload::Video(_) => None,
        }
    }

    /// The video payload, if this is a video annotation.
    pub fn video_data(&self) -> Option<&VideoAnnotationData> {
        match &self.payload {
            AnnotationPayload::Video(video) => Some(video),
            AnnotationPayload::Image(_) => None,
        }
    }

    /// Mutable video payload, if this is a video annotation.
    pub fn video_data_mut(&mut self) -> Option<&mut VideoAnnotationData> {
        match &mut self.payload {
            AnnotationPayload::Video(video) => Some(video),
            AnnotationPayload::Image(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;

    #[test]
    fn test_kind_of_image_annotation() {
        let annotation = Annotation::image(
            1,
            0,
            AnnotationData::BoundingBox(Rectangle::new(0.0, 0.0, 10.0, 10.0)),
        );
        assert_eq!(annotation.kind(), Some(AnnotationKind::BoundingBox));
        assert!(!annotation.is_video());
    }

    #[test]
    fn test_payload_accessors() {
        let mut annotation = Annotation::image(1, 0, AnnotationData::Tag);
        assert!(annotation.image_data().is_some());
        assert!(annotation.video_data().is_none());
        assert!(annotation.image_data_mut().is_some());
        assert!(annotation.video_data_mut().is_none());
    }

    #[test]
    fn test_kind_names_are_snake_case() {
        assert_eq!(AnnotationKind::BoundingBox.name(), "bounding_box");
        assert_eq!(AnnotationKind::DirectionalVector.name(), "directional_vector");
        assert_eq!(AnnotationKind::RasterLayer.name(), "raster_layer");
    }
}
