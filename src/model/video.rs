//! Video annotation payloads.
//!
//! A video annotation stores explicit keyframe payloads and is only visible
//! inside its segments. Between keyframes the view either clamps to the
//! nearest keyframe or interpolates, depending on the `interpolated` flag
//! and the renderer's capabilities (see `View::infer_video_data`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AnnotationData, AnnotationKind};

/// Per-frame payloads plus segment and interpolation bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotationData {
    /// Explicitly authored payloads, keyed by frame index.
    pub frames: BTreeMap<u32, AnnotationData>,
    /// Inclusive `[start, end]` frame ranges where the annotation exists.
    /// `None` marks a global annotation (e.g. a video tag) visible on every
    /// frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<[u32; 2]>>,
    /// Whether geometry should be interpolated between keyframes.
    #[serde(default)]
    pub interpolated: bool,
    /// Interpolation algorithm tag (e.g. `"linear-1.1"`). `None` means the
    /// default linear algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolate_algorithm: Option<String>,
}

impl VideoAnnotationData {
    pub fn new(frames: BTreeMap<u32, AnnotationData>, segments: Option<Vec<[u32; 2]>>) -> Self {
        Self {
            frames,
            segments,
            interpolated: false,
            interpolate_algorithm: None,
        }
    }

    pub fn with_interpolation(mut self, algorithm: Option<String>) -> Self {
        self.interpolated = true;
        self.interpolate_algorithm = algorithm;
        self
    }

    /// The payload kind, taken from the first keyframe.
    pub fn kind(&self) -> Option<AnnotationKind> {
        self.frames.values().next().map(AnnotationData::kind)
    }

    /// Whether the annotation exists at the given frame. Global annotations
    /// (no segments) exist everywhere.
    pub fn covers_frame(&self, frame_index: u32) -> bool {
        match &self.segments {
            None => true,
            Some(segments) => segments
                .iter()
                .any(|[start, end]| frame_index >= *start && frame_index <= *end),
        }
    }

    /// The explicitly authored payload at a frame, if it is a keyframe.
    pub fn keyframe_at(&self, frame_index: u32) -> Option<&AnnotationData> {
        self.frames.get(&frame_index)
    }

    /// The closest keyframe strictly before the given frame.
    pub fn keyframe_before(&self, frame_index: u32) -> Option<(u32, &AnnotationData)> {
        self.frames
            .range(..frame_index)
            .next_back()
            .map(|(index, data)| (*index, data))
    }

    /// The closest keyframe strictly after the given frame.
    pub fn keyframe_after(&self, frame_index: u32) -> Option<(u32, &AnnotationData)> {
        self.frames
            .range(frame_index + 1..)
            .next()
            .map(|(index, data)| (*index, data))
    }

    /// Insert or replace a keyframe.
    pub fn set_keyframe(&mut self, frame_index: u32, data: AnnotationData) {
        self.frames.insert(frame_index, data);
    }

    /// Remove a keyframe; returns the removed payload.
    pub fn remove_keyframe(&mut self, frame_index: u32) -> Option<AnnotationData> {
        self.frames.remove(&frame_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rectangle};

    fn keyframes(indices: &[u32]) -> BTreeMap<u32, AnnotationData> {
        indices
            .iter()
            .map(|&i| {
                (
                    i,
                    AnnotationData::Keypoint(Point::new(i as f32, i as f32)),
                )
            })
            .collect()
    }

    #[test]
    fn test_segments_gate_visibility() {
        let video = VideoAnnotationData::new(keyframes(&[0, 10]), Some(vec![[0, 5], [8, 12]]));
        assert!(video.covers_frame(0));
        assert!(video.covers_frame(5));
        assert!(!video.covers_frame(6));
        assert!(video.covers_frame(8));
        assert!(video.covers_frame(12));
        assert!(!video.covers_frame(13));
    }

    #[test]
    fn test_global_annotation_covers_everything() {
        let video = VideoAnnotationData::new(keyframes(&[0]), None);
        assert!(video.covers_frame(0));
        assert!(video.covers_frame(9999));
    }

    #[test]
    fn test_bracketing_keyframes() {
        let video = VideoAnnotationData::new(keyframes(&[2, 6, 9]), Some(vec![[0, 20]]));

        assert_eq!(video.keyframe_before(6).map(|(i, _)| i), Some(2));
        assert_eq!(video.keyframe_after(6).map(|(i, _)| i), Some(9));
        assert_eq!(video.keyframe_before(2), None);
        assert_eq!(video.keyframe_after(9), None);
        assert!(video.keyframe_at(6).is_some());
        assert!(video.keyframe_at(5).is_none());
    }

    #[test]
    fn test_kind_comes_from_first_keyframe() {
        let mut frames = BTreeMap::new();
        frames.insert(
            3,
            AnnotationData::BoundingBox(Rectangle::new(0.0, 0.0, 5.0, 5.0)),
        );
        let video = VideoAnnotationData::new(frames, Some(vec![[0, 10]]));
        assert_eq!(video.kind(), Some(AnnotationKind::BoundingBox));

        let empty = VideoAnnotationData::new(BTreeMap::new(), None);
        assert_eq!(empty.kind(), None);
    }
}
