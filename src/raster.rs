//! Raster mask storage and the dense run-length codec.
//!
//! All masks of one view share a single label map: a `u8` buffer the size
//! of the image where 0 means background and each mask annotation owns one
//! label value. On the wire the label map travels as a dense RLE inside a
//! `raster_layer` annotation.

use std::collections::HashMap;

use log::debug;
use ndarray::Array2;

use crate::config::RenderConfig;
use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect};
use crate::model::{Annotation, AnnotationData, AnnotationId, AnnotationKind, RasterLayerData};

/// Background label on the label map.
pub const BACKGROUND: u8 = 0;

// ============================================================================
// Dense RLE codec
// ============================================================================

/// Decoded label map plus per-label pixel bounds.
#[derive(Debug)]
pub struct DecodedRle {
    pub buffer: Array2<u8>,
    /// Tight pixel bounds per non-background label.
    pub bounds: HashMap<u8, ImageRect>,
}

/// Decode a dense RLE of `(label, run_length)` pairs into a row-major
/// label map of `width * height` pixels.
///
/// Per-label bounds are accumulated while decoding: a run confined to one
/// row contributes its start and end columns; a run spanning multiple rows
/// necessarily touches every column.
pub fn decode_dense_rle(
    rle: &[u32],
    width: u32,
    height: u32,
) -> Result<DecodedRle, EngineError> {
    if rle.len() % 2 != 0 {
        return Err(EngineError::InvalidRle {
            message: format!("dense rle must hold (label, length) pairs, got {} values", rle.len()),
        });
    }
    let total_pixels = width as usize * height as usize;
    let mut buffer = Array2::zeros((height as usize, width as usize));
    let mut bounds: HashMap<u8, Bounds> = HashMap::new();
    let mut cursor = 0usize;

    for pair in rle.chunks_exact(2) {
        let label = u8::try_from(pair[0]).map_err(|_| EngineError::InvalidRle {
            message: format!("label {} exceeds the u8 label range", pair[0]),
        })?;
        let length = pair[1] as usize;
        if cursor + length > total_pixels {
            return Err(EngineError::InvalidRle {
                message: format!(
                    "runs decode to more than {total_pixels} pixels ({} x {})",
                    width, height
                ),
            });
        }
        if label != BACKGROUND && length > 0 {
            buffer
                .as_slice_mut()
                .expect("freshly allocated arrays are contiguous")[cursor..cursor + length]
                .fill(label);
            bounds
                .entry(label)
                .or_default()
                .include_run(cursor, length, width as usize);
        }
        cursor += length;
    }

    if cursor != total_pixels {
        return Err(EngineError::InvalidRle {
            message: format!("runs decode to {cursor} pixels, expected {total_pixels}"),
        });
    }

    Ok(DecodedRle {
        buffer,
        bounds: bounds
            .into_iter()
            .map(|(label, b)| (label, b.to_rect()))
            .collect(),
    })
}

/// Encode a label map back into dense RLE pairs.
pub fn encode_dense_rle(buffer: &Array2<u8>) -> Vec<u32> {
    let mut rle = Vec::new();
    let mut run_label: Option<u8> = None;
    let mut run_length = 0u32;

    for &label in buffer.iter() {
        match run_label {
            Some(current) if current == label => run_length += 1,
            Some(current) => {
                rle.extend([current as u32, run_length]);
                run_label = Some(label);
                run_length = 1;
            }
            None => {
                run_label = Some(label);
                run_length = 1;
            }
        }
    }
    if let Some(current) = run_label {
        rle.extend([current as u32, run_length]);
    }
    rle
}

/// The tight region covered by any label in either bounds map.
fn combined_region(
    before: &HashMap<u8, ImageRect>,
    after: &HashMap<u8, ImageRect>,
) -> Option<ImageRect> {
    before
        .values()
        .chain(after.values())
        .copied()
        .reduce(|a, b| a.union(&b))
}

/// Integer pixel bounds under construction.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: usize::MAX,
            min_y: usize::MAX,
            max_x: 0,
            max_y: 0,
        }
    }
}

impl Bounds {
    fn include_run(&mut self, start: usize, length: usize, width: usize) {
        let end = start + length - 1;
        let start_row = start / width;
        let end_row = end / width;
        self.min_y = self.min_y.min(start_row);
        self.max_y = self.max_y.max(end_row);
        if start_row == end_row {
            self.min_x = self.min_x.min(start % width);
            self.max_x = self.max_x.max(end % width);
        } else {
            // A run crossing a row boundary touches both edge columns.
            self.min_x = 0;
            self.max_x = width - 1;
        }
    }

    fn include_pixel(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    fn is_empty(&self) -> bool {
        self.min_x == usize::MAX
    }

    fn to_rect(self) -> ImageRect {
        ImageRect::new(
            self.min_x as f32,
            self.min_y as f32,
            (self.max_x - self.min_x + 1) as f32,
            (self.max_y - self.min_y + 1) as f32,
        )
    }
}

// ============================================================================
// Raster
// ============================================================================

/// The shared label map of one view plus label bookkeeping.
pub struct Raster {
    width: u32,
    height: u32,
    buffer: Array2<u8>,
    label_for_annotation: HashMap<AnnotationId, u8>,
    annotation_for_label: HashMap<u8, AnnotationId>,
    bounds: HashMap<u8, ImageRect>,
    next_label: u8,
    /// Region changed since the last flush, for partial recomposite.
    dirty: Option<ImageRect>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: Array2::zeros((height as usize, width as usize)),
            label_for_annotation: HashMap::new(),
            annotation_for_label: HashMap::new(),
            bounds: HashMap::new(),
            next_label: 1,
            dirty: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer(&self) -> &Array2<u8> {
        &self.buffer
    }

    pub fn label_of(&self, id: AnnotationId) -> Option<u8> {
        self.label_for_annotation.get(&id).copied()
    }

    pub fn annotation_of(&self, label: u8) -> Option<AnnotationId> {
        self.annotation_for_label.get(&label).copied()
    }

    /// The tight pixel bounds of one annotation's mask, if it has pixels.
    pub fn bounds_of(&self, id: AnnotationId) -> Option<ImageRect> {
        let label = self.label_of(id)?;
        self.bounds.get(&label).copied()
    }

    /// Assign (or look up) the label value for a mask annotation.
    pub fn register(&mut self, id: AnnotationId) -> Result<u8, EngineError> {
        if let Some(label) = self.label_of(id) {
            return Ok(label);
        }
        if self.next_label == u8::MAX {
            return Err(EngineError::InvalidRle {
                message: "label map exhausted, at most 254 masks per view".to_string(),
            });
        }
        let label = self.next_label;
        self.next_label += 1;
        self.label_for_annotation.insert(id, label);
        self.annotation_for_label.insert(label, id);
        Ok(label)
    }

    /// Drop a mask's pixels and its label assignment.
    pub fn unregister(&mut self, id: AnnotationId) {
        if let Some(label) = self.label_for_annotation.remove(&id) {
            self.annotation_for_label.remove(&label);
            if let Some(region) = self.bounds.remove(&label) {
                for value in self.buffer.iter_mut() {
                    if *value == label {
                        *value = BACKGROUND;
                    }
                }
                self.mark_dirty(region);
            }
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.buffer.get((y as usize, x as usize)).copied()
    }

    /// Paint a filled circle of `label` (BACKGROUND erases). Returns the
    /// affected region, or `None` when the stamp misses the image.
    pub fn paint_circle(
        &mut self,
        center: ImagePoint,
        radius: f32,
        label: u8,
    ) -> Option<ImageRect> {
        let min_x = ((center.x - radius).floor().max(0.0)) as u32;
        let min_y = ((center.y - radius).floor().max(0.0)) as u32;
        let max_x = ((center.x + radius).ceil() as i64).min(self.width as i64 - 1);
        let max_y = ((center.y + radius).ceil() as i64).min(self.height as i64 - 1);
        if max_x < min_x as i64 || max_y < min_y as i64 {
            return None;
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);

        let mut erased_labels: Vec<u8> = Vec::new();
        let mut touched = Bounds::default();
        let radius_sq = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let cell = &mut self.buffer[(y as usize, x as usize)];
                if *cell != label {
                    if *cell != BACKGROUND && !erased_labels.contains(cell) {
                        erased_labels.push(*cell);
                    }
                    *cell = label;
                    touched.include_pixel(x as usize, y as usize);
                }
            }
        }
        if touched.is_empty() {
            return None;
        }

        let region = touched.to_rect();
        if label != BACKGROUND {
            self.bounds
                .entry(label)
                .and_modify(|b| *b = b.union(&region))
                .or_insert(region);
        }
        // Overpainted labels may have shrunk; their bounds go stale and are
        // recomputed from the buffer.
        for stale in erased_labels {
            self.recompute_bounds(stale);
        }
        self.mark_dirty(region);
        Some(region)
    }

    /// Replace the whole label map. Only the region covered by labels
    /// (before or after the replacement) is marked dirty.
    pub fn set_buffer(&mut self, buffer: Array2<u8>, bounds: HashMap<u8, ImageRect>) {
        let region = combined_region(&self.bounds, &bounds);
        self.buffer = buffer;
        self.bounds = bounds;
        if let Some(region) = region {
            self.mark_dirty(region);
        }
    }

    /// Copy of the current per-label bounds, suitable for a later
    /// [`Raster::swap_state`].
    pub fn snapshot_bounds(&self) -> HashMap<u8, ImageRect> {
        self.bounds.clone()
    }

    /// Exchange the pixel buffer and bounds with a stored snapshot,
    /// returning the previously live state. The union of the label bounds
    /// on both sides of the swap is marked dirty.
    pub fn swap_state(
        &mut self,
        buffer: Array2<u8>,
        bounds: HashMap<u8, ImageRect>,
    ) -> (Array2<u8>, HashMap<u8, ImageRect>) {
        let region = combined_region(&self.bounds, &bounds);
        let live_buffer = std::mem::replace(&mut self.buffer, buffer);
        let live_bounds = std::mem::replace(&mut self.bounds, bounds);
        if let Some(region) = region {
            self.mark_dirty(region);
        }
        (live_buffer, live_bounds)
    }

    fn recompute_bounds(&mut self, label: u8) {
        let Some(old) = self.bounds.remove(&label) else {
            return;
        };
        let mut fresh = Bounds::default();
        let min_x = old.x.max(0.0) as usize;
        let min_y = old.y.max(0.0) as usize;
        let max_x = ((old.x + old.width) as usize).min(self.width as usize);
        let max_y = ((old.y + old.height) as usize).min(self.height as usize);
        for y in min_y..max_y {
            for x in min_x..max_x {
                if self.buffer[(y, x)] == label {
                    fresh.include_pixel(x, y);
                }
            }
        }
        if !fresh.is_empty() {
            self.bounds.insert(label, fresh.to_rect());
        }
    }

    fn mark_dirty(&mut self, region: ImageRect) {
        self.dirty = Some(match self.dirty {
            Some(existing) => existing.union(&region),
            None => region,
        });
    }

    /// The region changed since the last call, if any.
    pub fn take_dirty(&mut self) -> Option<ImageRect> {
        self.dirty.take()
    }

    /// Serialize the label map into a `raster_layer` payload.
    pub fn encode(&self) -> RasterLayerData {
        RasterLayerData {
            dense_rle: encode_dense_rle(&self.buffer),
            total_pixels: self.width * self.height,
            mask_annotation_ids_mapping: self.label_for_annotation.clone(),
        }
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("labels", &self.label_for_annotation.len())
            .finish()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Build a view's raster from its deserialized annotations.
///
/// Returns `Ok(None)` when raster masks are disabled, when the view already
/// has a raster, or when the annotations carry no masks at all. Mask
/// annotations without a `raster_layer` sibling, or a `raster_layer`
/// mapping that points at a missing mask, are load errors.
///
/// On success the returned map carries the decoded bounding box per mask
/// annotation id, ready to be written back onto the mask payloads.
pub fn create_raster_from_annotations(
    config: &RenderConfig,
    existing: Option<&Raster>,
    annotations: &[Annotation],
    image_size: (u32, u32),
) -> Result<Option<(Raster, HashMap<AnnotationId, ImageRect>)>, EngineError> {
    if !config.raster_masks || existing.is_some() {
        return Ok(None);
    }

    let mask_ids: Vec<AnnotationId> = annotations
        .iter()
        .filter(|a| a.kind() == Some(AnnotationKind::Mask))
        .map(|a| a.id)
        .collect();
    let raster_layer = annotations.iter().find_map(|a| match a.image_data() {
        Some(AnnotationData::RasterLayer(data)) => Some(data),
        _ => None,
    });

    let Some(data) = raster_layer else {
        if let Some(id) = mask_ids.first() {
            return Err(EngineError::MissingRasterLayer { id: *id });
        }
        return Ok(None);
    };
    for id in data.mask_annotation_ids_mapping.keys() {
        if !mask_ids.contains(id) {
            return Err(EngineError::MissingMaskPayload { id: *id });
        }
    }

    let (width, height) = image_size;
    let expected = width * height;
    if data.total_pixels != expected {
        return Err(EngineError::InvalidRle {
            message: format!(
                "raster layer holds {} pixels, image is {width} x {height}",
                data.total_pixels
            ),
        });
    }

    let decoded = decode_dense_rle(&data.dense_rle, width, height)?;
    let mut raster = Raster::new(width, height);
    let mut annotation_bounds = HashMap::new();

    let mut mapping: Vec<(AnnotationId, u8)> = data
        .mask_annotation_ids_mapping
        .iter()
        .map(|(id, label)| (*id, *label))
        .collect();
    mapping.sort_by_key(|(_, label)| *label);
    for (id, label) in mapping {
        raster.label_for_annotation.insert(id, label);
        raster.annotation_for_label.insert(label, id);
        raster.next_label = raster.next_label.max(label + 1);
        if let Some(rect) = decoded.bounds.get(&label) {
            annotation_bounds.insert(id, *rect);
        }
    }
    raster.set_buffer(decoded.buffer, decoded.bounds);
    debug!(
        "raster loaded, {} labels on {}x{} map",
        raster.label_for_annotation.len(),
        width,
        height
    );
    Ok(Some((raster, annotation_bounds)))
}
