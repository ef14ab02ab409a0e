//! Progressive video frame loading.
//!
//! The loader schedules which frames to fetch and in what order; the
//! embedding platform performs the actual fetch. Scheduling produces
//! [`FrameRequest`]s drained via [`FramesLoader::take_requests`]; the
//! platform answers with [`FramesLoader::complete_lq`] /
//! [`FramesLoader::complete_hq`]. Low-quality frames are fetched eagerly
//! around the playhead under a concurrency cap; high-quality frames only
//! on demand for the frame being viewed.

use std::collections::{BTreeMap, HashSet};

use image::RgbaImage;
use log::debug;

use crate::callback::{CallbackHandle, CallbackHandleCollection, CallbackStatus};

/// Default number of low-quality fetches in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameQuality {
    Low,
    High,
}

/// A fetch the platform should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    pub index: u32,
    pub quality: FrameQuality,
    pub url: String,
}

/// One video frame and its load state.
#[derive(Debug, Clone, Default)]
pub struct LoadedFrame {
    pub hq_url: String,
    pub lq_url: Option<String>,
    pub hq_data: Option<RgbaImage>,
    pub lq_data: Option<RgbaImage>,
    pub hq_data_loaded: bool,
    pub lq_data_loaded: bool,
}

impl LoadedFrame {
    pub fn new(hq_url: impl Into<String>, lq_url: Option<String>) -> Self {
        Self {
            hq_url: hq_url.into(),
            lq_url,
            ..Self::default()
        }
    }

    /// Best available pixels: high quality if loaded, else low quality.
    pub fn best_data(&self) -> Option<&RgbaImage> {
        self.hq_data.as_ref().or(self.lq_data.as_ref())
    }
}

pub struct FramesLoader {
    frames: BTreeMap<u32, LoadedFrame>,
    /// The index scheduling walks outward from (usually the playhead).
    next_frame_to_load: u32,
    /// Low-quality fetches currently in flight.
    loading: HashSet<u32>,
    concurrency: usize,
    requests: Vec<FrameRequest>,
    on_frame_loaded: CallbackHandleCollection<u32>,
}

impl Default for FramesLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl FramesLoader {
    pub fn new(concurrency: usize) -> Self {
        Self {
            frames: BTreeMap::new(),
            next_frame_to_load: 0,
            loading: HashSet::new(),
            concurrency: concurrency.max(1),
            requests: Vec::new(),
            on_frame_loaded: CallbackHandleCollection::new(),
        }
    }

    /// Subscribe to frame-loaded notifications (argument is the index).
    /// Fires once per frame, when its low-quality data resolves.
    pub fn on_frame_loaded(
        &self,
        callback: impl FnMut(&u32) -> CallbackStatus + 'static,
    ) -> CallbackHandle {
        self.on_frame_loaded.add(callback)
    }

    pub fn frame(&self, index: u32) -> Option<&LoadedFrame> {
        self.frames.get(&index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Replace the frame set and start scheduling from frame 0.
    pub fn set_frames_to_load(&mut self, frames: impl IntoIterator<Item = (u32, LoadedFrame)>) {
        self.frames = frames.into_iter().collect();
        self.loading.clear();
        self.requests.clear();
        self.next_frame_to_load = 0;
        self.schedule();
    }

    /// Add frames without disturbing ones already loaded.
    pub fn add_frames_to_load(&mut self, frames: impl IntoIterator<Item = (u32, LoadedFrame)>) {
        for (index, frame) in frames {
            self.frames.entry(index).or_insert(frame);
        }
        self.schedule();
    }

    /// Move the scheduling anchor (playhead moved).
    pub fn set_next_frame_to_load(&mut self, index: u32) {
        self.next_frame_to_load = index;
        self.schedule();
    }

    /// Request the high-quality image of one frame. High-quality fetches
    /// bypass the low-quality concurrency cap.
    pub fn load_hq_frame(&mut self, index: u32) {
        let Some(frame) = self.frames.get(&index) else {
            return;
        };
        if frame.hq_data_loaded || self.pending(index, FrameQuality::High) {
            return;
        }
        self.requests.push(FrameRequest {
            index,
            quality: FrameQuality::High,
            url: frame.hq_url.clone(),
        });
    }

    /// Fetches the platform should start now. Draining is idempotent.
    pub fn take_requests(&mut self) -> Vec<FrameRequest> {
        std::mem::take(&mut self.requests)
    }

    /// The platform finished a low-quality fetch.
    pub fn complete_lq(&mut self, index: u32, data: RgbaImage) {
        self.loading.remove(&index);
        if let Some(frame) = self.frames.get_mut(&index) {
            frame.lq_data = Some(data);
            frame.lq_data_loaded = true;
            self.on_frame_loaded.call(&index);
        }
        self.schedule();
    }

    /// The platform finished a high-quality fetch. Frame-loaded callbacks
    /// fire on low-quality completion only.
    pub fn complete_hq(&mut self, index: u32, data: RgbaImage) {
        if let Some(frame) = self.frames.get_mut(&index) {
            frame.hq_data = Some(data);
            frame.hq_data_loaded = true;
        }
    }

    /// A fetch failed. The slot is freed and the frame stays unloaded, so
    /// the next scheduling pass may retry it.
    pub fn fail(&mut self, index: u32, quality: FrameQuality) {
        debug!("frame {index} {quality:?} fetch failed");
        if quality == FrameQuality::Low {
            self.loading.remove(&index);
            self.schedule();
        }
    }

    /// Drop decoded pixels to free memory, keeping URLs for reloading.
    pub fn cleanup(&mut self) {
        for frame in self.frames.values_mut() {
            frame.hq_data = None;
            frame.lq_data = None;
            frame.hq_data_loaded = false;
            frame.lq_data_loaded = false;
        }
        self.loading.clear();
        self.requests.clear();
    }

    fn pending(&self, index: u32, quality: FrameQuality) -> bool {
        self.requests
            .iter()
            .any(|r| r.index == index && r.quality == quality)
    }

    /// Fill free low-quality slots with the unloaded frames closest to the
    /// anchor index. Lower index wins a distance tie.
    fn schedule(&mut self) {
        while self.loading.len() < self.concurrency {
            let anchor = self.next_frame_to_load;
            let next = self
                .frames
                .iter()
                .filter(|(index, frame)| !frame.lq_data_loaded && !self.loading.contains(*index))
                .min_by_key(|(index, _)| (u32::abs_diff(**index, anchor), **index))
                .map(|(index, frame)| {
                    let url = frame.lq_url.clone().unwrap_or_else(|| frame.hq_url.clone());
                    (*index, url)
                });
            let Some((index, url)) = next else {
                break;
            };
            self.loading.insert(index);
            self.requests.push(FrameRequest {
                index,
                quality: FrameQuality::Low,
                url,
            });
        }
    }
}

impl std::fmt::Debug for FramesLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramesLoader")
            .field("frames", &self.frames.len())
            .field("loading", &self.loading)
            .field("next_frame_to_load", &self.next_frame_to_load)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frames(count: u32) -> Vec<(u32, LoadedFrame)> {
        (0..count)
            .map(|i| {
                (
                    i,
                    LoadedFrame::new(format!("hq/{i}.png"), Some(format!("lq/{i}.png"))),
                )
            })
            .collect()
    }

    fn pixels() -> RgbaImage {
        RgbaImage::new(2, 2)
    }

    #[test]
    fn test_initial_scheduling_respects_concurrency_cap() {
        let mut loader = FramesLoader::new(2);
        loader.set_frames_to_load(frames(4));

        let requests = loader.take_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.quality == FrameQuality::Low));
        assert_eq!(requests[0].index, 0);
        assert_eq!(requests[1].index, 1);
        // Nothing more until a fetch completes.
        assert!(loader.take_requests().is_empty());
    }

    #[test]
    fn test_completion_frees_a_slot_for_the_next_closest() {
        let mut loader = FramesLoader::new(2);
        loader.set_frames_to_load(frames(4));
        loader.take_requests();

        loader.complete_lq(0, pixels());
        let requests = loader.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].index, 2);
    }

    #[test]
    fn test_anchor_move_prefers_frames_near_playhead() {
        let mut loader = FramesLoader::new(1);
        loader.set_frames_to_load(frames(10));
        loader.take_requests();

        loader.set_next_frame_to_load(7);
        loader.complete_lq(0, pixels());
        let requests = loader.take_requests();
        assert_eq!(requests[0].index, 7);
    }

    #[test]
    fn test_hq_load_bypasses_cap_and_is_not_repeated() {
        let mut loader = FramesLoader::new(1);
        loader.set_frames_to_load(frames(3));
        loader.take_requests();

        loader.load_hq_frame(2);
        loader.load_hq_frame(2);
        let requests = loader.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].quality, FrameQuality::High);

        loader.complete_hq(2, pixels());
        loader.load_hq_frame(2);
        assert!(loader.take_requests().is_empty());
    }

    #[test]
    fn test_on_frame_loaded_fires_once_on_lq_completion() {
        let mut loader = FramesLoader::new(1);
        loader.set_frames_to_load(frames(2));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = Rc::clone(&seen);
        let _handle = loader.on_frame_loaded(move |index| {
            seen_cb.borrow_mut().push(*index);
            CallbackStatus::Continue
        });

        loader.complete_lq(0, pixels());
        loader.complete_hq(0, pixels());
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn test_failed_fetch_frees_the_slot() {
        let mut loader = FramesLoader::new(1);
        loader.set_frames_to_load(frames(3));
        loader.take_requests();

        loader.fail(0, FrameQuality::Low);
        let requests = loader.take_requests();
        assert_eq!(requests[0].index, 0);
    }

    #[test]
    fn test_cleanup_drops_pixels_but_keeps_urls() {
        let mut loader = FramesLoader::new(2);
        loader.set_frames_to_load(frames(2));
        loader.take_requests();
        loader.complete_lq(0, pixels());

        loader.cleanup();
        let frame = loader.frame(0).unwrap();
        assert!(frame.lq_data.is_none());
        assert!(!frame.lq_data_loaded);
        assert_eq!(frame.hq_url, "hq/0.png");
    }
}
