//! Wire (de)serialization of annotation payloads.
//!
//! Each annotation kind registers an [`AnnotationTypeSerializer`] converting
//! between the in-memory payload and the backend wire shape. The wire shape
//! nests the payload under a kind-named sub-object, e.g.
//! `{"bounding_box": {"x": 0, "y": 0, "w": 10, "h": 10}}`, so a payload of
//! the wrong kind is detectable as a missing field.
//!
//! This is the single seam through which a new annotation kind supplies its
//! wire format; the engine itself never talks to the network.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect, Point, Rectangle};
use crate::model::{
    AnnotationData, AnnotationKind, CuboidData, DirectionalVectorData, EllipseData, LineData,
    LinkData, MaskData, PolygonData, RasterLayerData, SkeletonData, SkeletonNode,
};

/// Bidirectional conversion between a payload and its backend shape.
pub trait AnnotationTypeSerializer {
    /// The annotation kind this serializer handles.
    fn kind(&self) -> AnnotationKind;

    /// Convert a payload to its wire shape. Errors if the payload is of a
    /// different kind.
    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError>;

    /// Parse a wire shape into a payload.
    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError>;

    /// The payload a freshly created annotation of this kind starts with.
    fn default_data(&self) -> AnnotationData;
}

/// Registry of serializers keyed by annotation kind.
pub struct SerializerRegistry {
    serializers: HashMap<AnnotationKind, Box<dyn AnnotationTypeSerializer>>,
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SerializerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            serializers: HashMap::new(),
        }
    }

    /// A registry with every built-in kind registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BoundingBoxSerializer));
        registry.register(Box::new(PolygonSerializer));
        registry.register(Box::new(SkeletonSerializer));
        registry.register(Box::new(KeypointSerializer));
        registry.register(Box::new(TagSerializer));
        registry.register(Box::new(MaskSerializer));
        registry.register(Box::new(InstanceIdSerializer));
        registry.register(Box::new(TextSerializer));
        registry.register(Box::new(CuboidSerializer));
        registry.register(Box::new(EllipseSerializer));
        registry.register(Box::new(LineSerializer));
        registry.register(Box::new(LinkSerializer));
        registry.register(Box::new(DirectionalVectorSerializer));
        registry.register(Box::new(RasterLayerSerializer));
        registry
    }

    /// Register (or replace) the serializer for a kind.
    pub fn register(&mut self, serializer: Box<dyn AnnotationTypeSerializer>) {
        self.serializers.insert(serializer.kind(), serializer);
    }

    /// Look up the serializer for a kind.
    pub fn get(
        &self,
        kind: AnnotationKind,
    ) -> Result<&dyn AnnotationTypeSerializer, EngineError> {
        self.serializers
            .get(&kind)
            .map(|s| s.as_ref())
            .ok_or(EngineError::SerializerNotRegistered { kind })
    }

    /// Serialize a payload via its registered serializer.
    pub fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        self.get(data.kind())?.serialize(data)
    }

    /// Deserialize a wire payload of a known kind.
    pub fn deserialize(
        &self,
        kind: AnnotationKind,
        raw: &Value,
    ) -> Result<AnnotationData, EngineError> {
        self.get(kind)?.deserialize(raw)
    }
}

// ============================================================================
// JSON helpers
// ============================================================================

fn expect_kind(data: &AnnotationData, expected: AnnotationKind) -> Result<(), EngineError> {
    if data.kind() == expected {
        Ok(())
    } else {
        Err(EngineError::KindMismatch {
            expected,
            actual: data.kind(),
        })
    }
}

fn sub_payload<'a>(raw: &'a Value, field: &'static str) -> Result<&'a Value, EngineError> {
    raw.get(field).ok_or_else(|| EngineError::MissingField {
        field: field.to_string(),
    })?;
    Ok(&raw[field])
}

fn field_f32(value: &Value, field: &'static str) -> Result<f32, EngineError> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .ok_or_else(|| EngineError::MissingField {
            field: field.to_string(),
        })
}

fn field_u64(value: &Value, field: &'static str) -> Result<u64, EngineError> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| EngineError::MissingField {
            field: field.to_string(),
        })
}

fn point_to_json(point: &ImagePoint) -> Value {
    json!({ "x": point.x, "y": point.y })
}

fn point_from_json(value: &Value) -> Result<ImagePoint, EngineError> {
    Ok(Point::new(field_f32(value, "x")?, field_f32(value, "y")?))
}

fn path_to_json(path: &[ImagePoint]) -> Value {
    Value::Array(path.iter().map(point_to_json).collect())
}

fn path_from_json(value: &Value) -> Result<Vec<ImagePoint>, EngineError> {
    value
        .as_array()
        .ok_or(EngineError::MissingField {
            field: "path".to_string(),
        })?
        .iter()
        .map(point_from_json)
        .collect()
}

fn rect_to_json(rect: &ImageRect) -> Value {
    json!({ "x": rect.x, "y": rect.y, "w": rect.width, "h": rect.height })
}

fn rect_from_json(value: &Value) -> Result<ImageRect, EngineError> {
    Ok(Rectangle::new(
        field_f32(value, "x")?,
        field_f32(value, "y")?,
        field_f32(value, "w")?,
        field_f32(value, "h")?,
    ))
}

// ============================================================================
// Per-kind serializers
// ============================================================================

pub struct BoundingBoxSerializer;

impl AnnotationTypeSerializer for BoundingBoxSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::BoundingBox
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::BoundingBox(rect) = data else {
            unreachable!()
        };
        Ok(json!({ "bounding_box": rect_to_json(rect) }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "bounding_box")?;
        Ok(AnnotationData::BoundingBox(rect_from_json(payload)?))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::BoundingBox(Rectangle::new(0.0, 0.0, 0.0, 0.0))
    }
}

pub struct PolygonSerializer;

impl AnnotationTypeSerializer for PolygonSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Polygon
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Polygon(polygon) = data else {
            unreachable!()
        };
        Ok(json!({
            "polygon": {
                "path": path_to_json(&polygon.path),
                "additional_paths": polygon
                    .additional_paths
                    .iter()
                    .map(|path| path_to_json(path))
                    .collect::<Vec<_>>(),
            }
        }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "polygon")?;
        let path = path_from_json(sub_payload(payload, "path")?)?;
        let additional_paths = match payload.get("additional_paths") {
            None | Some(Value::Null) => Vec::new(),
            Some(paths) => paths
                .as_array()
                .ok_or(EngineError::MissingField {
                    field: "additional_paths".to_string(),
                })?
                .iter()
                .map(path_from_json)
                .collect::<Result<_, _>>()?,
        };
        Ok(AnnotationData::Polygon(PolygonData {
            path,
            additional_paths,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Polygon(PolygonData::default())
    }
}

pub struct SkeletonSerializer;

impl AnnotationTypeSerializer for SkeletonSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Skeleton
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Skeleton(skeleton) = data else {
            unreachable!()
        };
        let nodes: Vec<Value> = skeleton
            .nodes
            .iter()
            .map(|node| {
                json!({
                    "name": node.name,
                    "x": node.point.x,
                    "y": node.point.y,
                    "occluded": node.occluded,
                })
            })
            .collect();
        Ok(json!({ "skeleton": { "nodes": nodes } }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "skeleton")?;
        let nodes = sub_payload(payload, "nodes")?
            .as_array()
            .ok_or(EngineError::MissingField {
                field: "nodes".to_string(),
            })?
            .iter()
            .map(|node| {
                Ok(SkeletonNode {
                    name: node
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or(EngineError::MissingField {
                            field: "name".to_string(),
                        })?
                        .to_string(),
                    point: point_from_json(node)?,
                    occluded: node.get("occluded").and_then(Value::as_bool).unwrap_or(false),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(AnnotationData::Skeleton(SkeletonData { nodes }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Skeleton(SkeletonData::default())
    }
}

pub struct KeypointSerializer;

impl AnnotationTypeSerializer for KeypointSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Keypoint
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Keypoint(point) = data else {
            unreachable!()
        };
        Ok(json!({ "keypoint": point_to_json(point) }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "keypoint")?;
        Ok(AnnotationData::Keypoint(point_from_json(payload)?))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Keypoint(Point::new(0.0, 0.0))
    }
}

pub struct TagSerializer;

impl AnnotationTypeSerializer for TagSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Tag
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        Ok(json!({ "tag": {} }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        sub_payload(raw, "tag")?;
        Ok(AnnotationData::Tag)
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Tag
    }
}

pub struct MaskSerializer;

impl AnnotationTypeSerializer for MaskSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Mask
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Mask(mask) = data else {
            unreachable!()
        };
        let mut payload = json!({});
        if let Some(rect) = &mask.bounding_box {
            payload["bounding_box"] = rect_to_json(rect);
        }
        Ok(json!({ "mask": payload }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "mask")?;
        let bounding_box = match payload.get("bounding_box") {
            None | Some(Value::Null) => None,
            Some(rect) => Some(rect_from_json(rect)?),
        };
        Ok(AnnotationData::Mask(MaskData { bounding_box }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Mask(MaskData::default())
    }
}

pub struct InstanceIdSerializer;

impl AnnotationTypeSerializer for InstanceIdSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::InstanceId
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::InstanceId(value) = data else {
            unreachable!()
        };
        Ok(json!({ "instance_id": { "value": value } }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "instance_id")?;
        Ok(AnnotationData::InstanceId(field_u64(payload, "value")?))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::InstanceId(0)
    }
}

pub struct TextSerializer;

impl AnnotationTypeSerializer for TextSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Text
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Text(text) = data else {
            unreachable!()
        };
        Ok(json!({ "text": { "text": text } }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "text")?;
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .ok_or(EngineError::MissingField {
                field: "text".to_string(),
            })?;
        Ok(AnnotationData::Text(text.to_string()))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Text(String::new())
    }
}

pub struct CuboidSerializer;

impl AnnotationTypeSerializer for CuboidSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Cuboid
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Cuboid(cuboid) = data else {
            unreachable!()
        };
        Ok(json!({
            "cuboid": {
                "front": rect_to_json(&cuboid.front),
                "back": rect_to_json(&cuboid.back),
            }
        }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "cuboid")?;
        Ok(AnnotationData::Cuboid(CuboidData {
            front: rect_from_json(sub_payload(payload, "front")?)?,
            back: rect_from_json(sub_payload(payload, "back")?)?,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Cuboid(CuboidData {
            front: Rectangle::new(0.0, 0.0, 0.0, 0.0),
            back: Rectangle::new(0.0, 0.0, 0.0, 0.0),
        })
    }
}

pub struct EllipseSerializer;

impl AnnotationTypeSerializer for EllipseSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Ellipse
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Ellipse(ellipse) = data else {
            unreachable!()
        };
        Ok(json!({
            "ellipse": {
                "center": point_to_json(&ellipse.center),
                "right": point_to_json(&ellipse.right),
                "top": point_to_json(&ellipse.top),
            }
        }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "ellipse")?;
        Ok(AnnotationData::Ellipse(EllipseData {
            center: point_from_json(sub_payload(payload, "center")?)?,
            right: point_from_json(sub_payload(payload, "right")?)?,
            top: point_from_json(sub_payload(payload, "top")?)?,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Ellipse(EllipseData {
            center: Point::new(0.0, 0.0),
            right: Point::new(0.0, 0.0),
            top: Point::new(0.0, 0.0),
        })
    }
}

pub struct LineSerializer;

impl AnnotationTypeSerializer for LineSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Line
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Line(line) = data else {
            unreachable!()
        };
        Ok(json!({ "line": { "path": path_to_json(&line.path) } }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "line")?;
        Ok(AnnotationData::Line(LineData {
            path: path_from_json(sub_payload(payload, "path")?)?,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Line(LineData::default())
    }
}

pub struct LinkSerializer;

impl AnnotationTypeSerializer for LinkSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Link
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::Link(link) = data else {
            unreachable!()
        };
        Ok(json!({ "link": { "from": link.from, "to": link.to } }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "link")?;
        Ok(AnnotationData::Link(LinkData {
            from: field_u64(payload, "from")?,
            to: field_u64(payload, "to")?,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::Link(LinkData { from: 0, to: 0 })
    }
}

pub struct DirectionalVectorSerializer;

impl AnnotationTypeSerializer for DirectionalVectorSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::DirectionalVector
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::DirectionalVector(vector) = data else {
            unreachable!()
        };
        Ok(json!({
            "directional_vector": { "angle": vector.angle, "length": vector.length }
        }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "directional_vector")?;
        Ok(AnnotationData::DirectionalVector(DirectionalVectorData {
            angle: field_f32(payload, "angle")?,
            length: field_f32(payload, "length")?,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::DirectionalVector(DirectionalVectorData {
            angle: 0.0,
            length: 0.0,
        })
    }
}

pub struct RasterLayerSerializer;

impl AnnotationTypeSerializer for RasterLayerSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::RasterLayer
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, EngineError> {
        expect_kind(data, self.kind())?;
        let AnnotationData::RasterLayer(raster) = data else {
            unreachable!()
        };
        let mapping: HashMap<String, u8> = raster
            .mask_annotation_ids_mapping
            .iter()
            .map(|(id, label)| (id.to_string(), *label))
            .collect();
        Ok(json!({
            "raster_layer": {
                "dense_rle": raster.dense_rle,
                "total_pixels": raster.total_pixels,
                "mask_annotation_ids_mapping": mapping,
            }
        }))
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, EngineError> {
        let payload = sub_payload(raw, "raster_layer")?;

        let dense_rle = payload
            .get("dense_rle")
            .and_then(Value::as_array)
            .ok_or(EngineError::MissingField {
                field: "dense_rle".to_string(),
            })?
            .iter()
            .map(|v| {
                v.as_u64()
                    .map(|v| v as u32)
                    .ok_or(EngineError::MissingField {
                        field: "dense_rle".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total_pixels = field_u64(payload, "total_pixels")? as u32;

        let mapping = payload
            .get("mask_annotation_ids_mapping")
            .and_then(Value::as_object)
            .ok_or(EngineError::MissingField {
                field: "mask_annotation_ids_mapping".to_string(),
            })?
            .iter()
            .map(|(id, label)| {
                let id = id.parse::<u64>().map_err(|_| EngineError::InvalidPayload {
                    message: format!("mask annotation id '{id}' is not numeric"),
                })?;
                let label = label.as_u64().ok_or(EngineError::InvalidPayload {
                    message: "label index is not an integer".to_string(),
                })? as u8;
                Ok((id, label))
            })
            .collect::<Result<HashMap<_, _>, EngineError>>()?;

        Ok(AnnotationData::RasterLayer(RasterLayerData {
            dense_rle,
            total_pixels,
            mask_annotation_ids_mapping: mapping,
        }))
    }

    fn default_data(&self) -> AnnotationData {
        AnnotationData::RasterLayer(RasterLayerData::default())
    }
}
