//! A single view: one image or video, its camera, its annotations and the
//! rendering state attached to them.

use std::collections::HashMap;

use log::{debug, warn};

use crate::annotation_manager::AnnotationManager;
use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::EngineError;
use crate::frames::FramesLoader;
use crate::geometry::{ImagePoint, polygon_contains};
use crate::interpolate::InterpolationParams;
use crate::layer::Layer;
use crate::model::{Annotation, AnnotationData, AnnotationId, AnnotationKind, AnnotationPayload};
use crate::raster::{Raster, create_raster_from_annotations};
use crate::render::{RenderContext, RendererRegistry, class_color};

pub struct View {
    /// Stable id of the file this view shows.
    pub file_id: u64,
    pub image_size: (u32, u32),
    pub camera: Camera,
    pub annotations: AnnotationManager,
    pub layer: Layer,
    /// Shared mask label map, present once a raster layer was loaded or a
    /// mask was painted.
    pub raster: Option<Raster>,
    pub frames_loader: FramesLoader,
    /// Playhead for video files; always 0 for still images.
    pub current_frame_index: u32,
    pub total_frames: u32,
}

impl View {
    pub fn new(file_id: u64, image_size: (u32, u32), viewport: (u32, u32)) -> Self {
        let mut camera = Camera::new(image_size, viewport);
        camera.scale_to_fit();
        Self {
            file_id,
            image_size,
            camera,
            annotations: AnnotationManager::new(),
            layer: Layer::new(),
            raster: None,
            frames_loader: FramesLoader::default(),
            current_frame_index: 0,
            total_frames: 1,
        }
    }

    pub fn is_video(&self) -> bool {
        self.total_frames > 1
    }

    /// Jump the playhead and point the frame loader at the new position.
    pub fn set_current_frame(&mut self, frame_index: u32) {
        let clamped = frame_index.min(self.total_frames.saturating_sub(1));
        if clamped != self.current_frame_index {
            self.current_frame_index = clamped;
            self.frames_loader.set_next_frame_to_load(clamped);
            self.frames_loader.load_hq_frame(clamped);
            self.layer.mark_changed();
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the view's annotations with freshly deserialized ones,
    /// building the raster from any raster-layer payload among them. Mask
    /// annotations get their decoded bounding boxes written back.
    pub fn load_annotations(
        &mut self,
        annotations: Vec<Annotation>,
        config: &RenderConfig,
    ) -> Result<(), EngineError> {
        self.annotations.clear();
        self.raster = None;

        let built =
            create_raster_from_annotations(config, None, &annotations, self.image_size)?;
        let mut mask_bounds = HashMap::new();
        if let Some((raster, bounds)) = built {
            self.raster = Some(raster);
            mask_bounds = bounds;
        }

        for mut annotation in annotations {
            // The raster layer is absorbed into the raster buffer; it is
            // not rendered or listed as a regular annotation.
            if annotation.kind() == Some(AnnotationKind::RasterLayer) {
                continue;
            }
            if let Some(bounds) = mask_bounds.get(&annotation.id)
                && let Some(AnnotationData::Mask(mask)) = annotation.image_data_mut()
            {
                mask.bounding_box = Some(*bounds);
            }
            self.annotations.add(annotation);
        }
        self.layer.mark_changed();
        debug!(
            "view {} loaded {} annotations",
            self.file_id,
            self.annotations.len()
        );
        Ok(())
    }

    // ========================================================================
    // Video data inference
    // ========================================================================

    /// The payload of an annotation as it appears on a given frame.
    ///
    /// Image annotations always return their payload. Video annotations are
    /// gated by their segments, then resolved in order: exact keyframe,
    /// clamp before the first or after the last keyframe, interpolation
    /// between the surrounding keyframes when enabled and supported, and
    /// otherwise a hold on the previous keyframe.
    pub fn infer_data_at(
        &self,
        annotation: &Annotation,
        frame_index: u32,
        registry: &RendererRegistry,
    ) -> Result<Option<AnnotationData>, EngineError> {
        let video = match &annotation.payload {
            AnnotationPayload::Image(data) => return Ok(Some(data.clone())),
            AnnotationPayload::Video(video) => video,
        };
        if !video.covers_frame(frame_index) {
            return Ok(None);
        }
        if let Some(data) = video.keyframe_at(frame_index) {
            return Ok(Some(data.clone()));
        }

        let before = video.keyframe_before(frame_index);
        let after = video.keyframe_after(frame_index);
        match (before, after) {
            (None, None) => Ok(None),
            // Before the first keyframe: clamp forward.
            (None, Some((_, data))) => Ok(Some(data.clone())),
            // After the last keyframe: hold the last payload.
            (Some((_, data)), None) => Ok(Some(data.clone())),
            (Some((prev_index, prev)), Some((next_index, next))) => {
                if video.interpolated {
                    let renderer = registry.get(prev.kind())?;
                    if renderer.supports_interpolate() {
                        let factor = (frame_index - prev_index) as f32
                            / (next_index - prev_index) as f32;
                        let params = InterpolationParams {
                            algorithm: video.interpolate_algorithm.clone(),
                            factor,
                        };
                        return renderer.interpolate(prev, next, &params).map(Some);
                    }
                }
                Ok(Some(prev.clone()))
            }
        }
    }

    /// `infer_data_at` for the current playhead.
    pub fn infer_current_data(
        &self,
        annotation: &Annotation,
        registry: &RendererRegistry,
    ) -> Result<Option<AnnotationData>, EngineError> {
        self.infer_data_at(annotation, self.current_frame_index, registry)
    }

    // ========================================================================
    // Rendering and hit testing
    // ========================================================================

    /// Run a full render pass, filling the layer with draw commands for
    /// every annotation visible on the current frame.
    pub fn render(
        &mut self,
        registry: &RendererRegistry,
        config: &RenderConfig,
    ) -> Result<(), EngineError> {
        self.layer.begin_render();
        let ids: Vec<AnnotationId> = self.annotations.ids().to_vec();
        for id in ids {
            let Some(annotation) = self.annotations.get(id).cloned() else {
                continue;
            };
            let Some(data) = self.infer_current_data(&annotation, registry)? else {
                continue;
            };
            let renderer = registry.get(data.kind())?;
            let ctx = RenderContext {
                camera: &self.camera,
                config,
                color: class_color(annotation.class_id),
                is_selected: self.annotations.is_selected(id),
                is_highlighted: self.annotations.highlighted() == Some(id),
            };
            self.layer.begin_batch(id);
            if let Err(err) = renderer.render(&mut self.layer, id, &data, &ctx) {
                warn!("annotation {id} failed to render: {err}");
            }
        }
        if let Some(raster) = &mut self.raster
            && let Some(region) = raster.take_dirty()
        {
            self.layer.invalidate_region(region);
        }
        Ok(())
    }

    /// The topmost annotation whose outline contains the given image point.
    pub fn hit_test(
        &self,
        point: ImagePoint,
        registry: &RendererRegistry,
    ) -> Result<Option<AnnotationId>, EngineError> {
        for id in self.annotations.ids().iter().rev() {
            let Some(annotation) = self.annotations.get(*id) else {
                continue;
            };
            let Some(data) = self.infer_current_data(annotation, registry)? else {
                continue;
            };
            let renderer = registry.get(data.kind())?;
            let path = renderer.path(&data);
            if path.len() >= 3 && polygon_contains(&path, &point) {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    /// The vertex of an annotation within grab range of an image point.
    /// Range is given in canvas pixels so the grab radius tracks zoom.
    pub fn find_vertex(
        &self,
        id: AnnotationId,
        point: ImagePoint,
        canvas_range: f32,
        registry: &RendererRegistry,
    ) -> Result<Option<usize>, EngineError> {
        let annotation = self.annotations.require(id)?;
        let Some(data) = self.infer_current_data(annotation, registry)? else {
            return Ok(None);
        };
        let renderer = registry.get(data.kind())?;
        let range = canvas_range / self.camera.scale();
        Ok(renderer
            .all_vertices(&data)
            .iter()
            .enumerate()
            .filter(|(_, vertex)| vertex.distance_to(&point) <= range)
            .min_by(|(_, a), (_, b)| {
                a.distance_to(&point)
                    .partial_cmp(&b.distance_to(&point))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(index, _)| index))
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("file_id", &self.file_id)
            .field("image_size", &self.image_size)
            .field("annotations", &self.annotations.len())
            .field("current_frame_index", &self.current_frame_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ImageRect, Point};
    use crate::model::VideoAnnotationData;
    use std::collections::BTreeMap;

    fn view() -> View {
        View::new(1, (100, 100), (100, 100))
    }

    fn video_box(interpolated: bool) -> Annotation {
        let mut frames = BTreeMap::new();
        frames.insert(
            10,
            AnnotationData::BoundingBox(ImageRect::new(0.0, 0.0, 10.0, 10.0)),
        );
        frames.insert(
            20,
            AnnotationData::BoundingBox(ImageRect::new(10.0, 10.0, 10.0, 10.0)),
        );
        let mut video = VideoAnnotationData::new(frames, Some(vec![[10, 30]]));
        if interpolated {
            video = video.with_interpolation(None);
        }
        Annotation::video(1, 1, video)
    }

    #[test]
    fn test_infer_outside_segments_is_invisible() {
        let registry = RendererRegistry::with_defaults();
        let data = view()
            .infer_data_at(&video_box(true), 5, &registry)
            .unwrap();
        assert_eq!(data, None);
    }

    #[test]
    fn test_infer_exact_keyframe_wins() {
        let registry = RendererRegistry::with_defaults();
        let data = view()
            .infer_data_at(&video_box(true), 10, &registry)
            .unwrap();
        assert_eq!(
            data,
            Some(AnnotationData::BoundingBox(ImageRect::new(
                0.0, 0.0, 10.0, 10.0
            )))
        );
    }

    #[test]
    fn test_infer_interpolates_between_keyframes() {
        let registry = RendererRegistry::with_defaults();
        let data = view()
            .infer_data_at(&video_box(true), 15, &registry)
            .unwrap();
        assert_eq!(
            data,
            Some(AnnotationData::BoundingBox(ImageRect::new(
                5.0, 5.0, 10.0, 10.0
            )))
        );
    }

    #[test]
    fn test_infer_holds_previous_keyframe_when_not_interpolated() {
        let registry = RendererRegistry::with_defaults();
        let data = view()
            .infer_data_at(&video_box(false), 15, &registry)
            .unwrap();
        assert_eq!(
            data,
            Some(AnnotationData::BoundingBox(ImageRect::new(
                0.0, 0.0, 10.0, 10.0
            )))
        );
    }

    #[test]
    fn test_infer_holds_last_keyframe_inside_trailing_segment() {
        let registry = RendererRegistry::with_defaults();
        let data = view()
            .infer_data_at(&video_box(true), 25, &registry)
            .unwrap();
        assert_eq!(
            data,
            Some(AnnotationData::BoundingBox(ImageRect::new(
                10.0, 10.0, 10.0, 10.0
            )))
        );
    }

    #[test]
    fn test_hit_test_returns_topmost() {
        let mut view = view();
        let registry = RendererRegistry::with_defaults();
        view.annotations.add(
            Annotation::image(
                1,
                1,
                AnnotationData::BoundingBox(ImageRect::new(0.0, 0.0, 50.0, 50.0)),
            )
            .with_z_index(1),
        );
        view.annotations.add(
            Annotation::image(
                2,
                1,
                AnnotationData::BoundingBox(ImageRect::new(10.0, 10.0, 50.0, 50.0)),
            )
            .with_z_index(2),
        );

        // z-index 2 renders below z-index 1 (descending order), so the
        // topmost annotation at the overlap is id 1.
        let hit = view
            .hit_test(Point::new(20.0, 20.0), &registry)
            .unwrap();
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn test_load_annotations_writes_mask_bounds_back() {
        use crate::model::{MaskData, RasterLayerData};
        let mut view = View::new(1, (4, 2), (100, 100));
        let registry = RendererRegistry::with_defaults();
        let config = RenderConfig::default();
        view.load_annotations(
            vec![
                Annotation::image(5, 1, AnnotationData::Mask(MaskData::default())),
                Annotation::image(
                    6,
                    1,
                    AnnotationData::RasterLayer(RasterLayerData {
                        dense_rle: vec![0, 1, 1, 2, 0, 5],
                        total_pixels: 8,
                        mask_annotation_ids_mapping: HashMap::from([(5, 1)]),
                    }),
                ),
            ],
            &config,
        )
        .unwrap();

        // Raster layer absorbed, mask annotation kept with decoded bounds.
        assert_eq!(view.annotations.len(), 1);
        let mask = view.annotations.get(5).unwrap();
        let data = view.infer_current_data(mask, &registry).unwrap().unwrap();
        assert_eq!(
            data,
            AnnotationData::Mask(MaskData {
                bounding_box: Some(ImageRect::new(1.0, 0.0, 2.0, 1.0)),
            })
        );
        assert!(view.raster.is_some());
    }
}
