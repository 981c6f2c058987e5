//! Video input for the webcam mode.
//!
//! The core only needs two things from a video source: whether a new frame
//! is ready, and the colour at a texture coordinate. Frames are plain RGB8
//! buffers sampled on the CPU.

use std::path::{Path, PathBuf};

use crate::acquisition::{Acquisition, AcquisitionState};
use crate::error::VideoError;

/// Rec. 601 luma weights
pub const LUMINANCE_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Perceived brightness of a linear 0.0-1.0 RGB colour
pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMINANCE_WEIGHTS[0] + rgb[1] * LUMINANCE_WEIGHTS[1] + rgb[2] * LUMINANCE_WEIGHTS[2]
}

/// One RGB8 video frame, rows stored top to bottom
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, VideoError> {
        if width == 0 || height == 0 || rgb.len() != (width * height * 3) as usize {
            return Err(VideoError::Empty { width, height });
        }
        Ok(Self { width, height, rgb })
    }

    /// Single-colour frame
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, VideoError> {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 3] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width as usize + x) * 3;
        [
            self.rgb[i] as f32 / 255.0,
            self.rgb[i + 1] as f32 / 255.0,
            self.rgb[i + 2] as f32 / 255.0,
        ]
    }

    /// Bilinearly filtered colour at texture coordinate (u, v)
    ///
    /// `v = 0` is the bottom row of the image, matching GPU texture
    /// conventions for flipped video uploads. Coordinates clamp to the edge.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 3] {
        let x = u * self.width as f32 - 0.5;
        let y = (1.0 - v) * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let c00 = self.texel(x0, y0);
        let c10 = self.texel(x0 + 1, y0);
        let c01 = self.texel(x0, y0 + 1);
        let c11 = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 3];
        for (c, slot) in out.iter_mut().enumerate() {
            let top = c00[c] + (c10[c] - c00[c]) * fx;
            let bottom = c01[c] + (c11[c] - c01[c]) * fx;
            *slot = top + (bottom - top) * fy;
        }
        out
    }
}

/// A live (or simulated) video feed
pub trait VideoSource: Send {
    /// Next frame if one arrived since the last call
    fn poll_frame(&mut self) -> Option<VideoFrame>;
}

/// Presents one frame once; stands in for a camera that never changes
pub struct StillImageSource {
    frame: Option<VideoFrame>,
}

impl StillImageSource {
    pub fn new(frame: VideoFrame) -> Self {
        Self { frame: Some(frame) }
    }

    /// Decode an image file into a single video frame
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let image = image::open(path)
            .map_err(|source| VideoError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let (width, height) = image.dimensions();
        log::info!("Video: {} ({}x{})", path.display(), width, height);
        Ok(Self::new(VideoFrame::new(width, height, image.into_raw())?))
    }
}

impl VideoSource for StillImageSource {
    fn poll_frame(&mut self) -> Option<VideoFrame> {
        self.frame.take()
    }
}

/// Video acquisition plus the most recent frame
pub struct VideoFeed {
    source: Acquisition<Box<dyn VideoSource>, VideoError>,
    latest: Option<VideoFrame>,
    frames_received: u64,
}

impl VideoFeed {
    pub fn new(source: Acquisition<Box<dyn VideoSource>, VideoError>) -> Self {
        Self {
            source,
            latest: None,
            frames_received: 0,
        }
    }

    /// Feed backed by an already-open source
    pub fn with_source(source: impl VideoSource + 'static) -> Self {
        let source: Box<dyn VideoSource> = Box::new(source);
        Self::new(Acquisition::ready("video", source))
    }

    /// Feed that never delivers frames
    pub fn unavailable() -> Self {
        Self::new(Acquisition::unavailable("video"))
    }

    /// Load `path` as the video frame on a background thread
    pub fn open_image(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            log::info!("No video source configured; webcam mode will stay empty");
            return Self::unavailable();
        };
        Self::new(Acquisition::spawn("video", move || {
            let source: Box<dyn VideoSource> = Box::new(StillImageSource::open(&path)?);
            Ok(source)
        }))
    }

    /// Pull a new frame if the source has one; returns whether it did
    pub fn poll(&mut self) -> bool {
        let Some(source) = self.source.get_mut() else {
            return false;
        };
        match source.poll_frame() {
            Some(frame) => {
                self.latest = Some(frame);
                self.frames_received += 1;
                true
            }
            None => false,
        }
    }

    /// Most recent frame, once at least one has arrived
    pub fn latest(&self) -> Option<&VideoFrame> {
        self.latest.as_ref()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn state(&self) -> AcquisitionState {
        self.source.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weights() {
        assert!((luminance([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(luminance([1.0, 0.0, 0.0]), 0.299);
        assert_eq!(luminance([0.0, 1.0, 0.0]), 0.587);
        assert_eq!(luminance([0.0, 0.0, 1.0]), 0.114);
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        assert!(VideoFrame::new(2, 2, vec![0; 5]).is_err());
        assert!(VideoFrame::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_solid_frame_samples_uniformly() {
        let frame = VideoFrame::solid(4, 3, [255, 0, 51]).unwrap();
        for &(u, v) in &[(0.0, 0.0), (0.5, 0.5), (0.99, 0.2), (1.0, 1.0)] {
            let c = frame.sample(u, v);
            assert!((c[0] - 1.0).abs() < 1e-6);
            assert!(c[1].abs() < 1e-6);
            assert!((c[2] - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_v_zero_is_bottom_row() {
        // Top row white, bottom row black
        let mut rgb = vec![255u8; 2 * 3];
        rgb.extend(vec![0u8; 2 * 3]);
        let frame = VideoFrame::new(2, 2, rgb).unwrap();
        assert_eq!(frame.sample(0.25, 0.0), [0.0, 0.0, 0.0]);
        assert_eq!(frame.sample(0.25, 1.0), [1.0, 1.0, 1.0]);
        // Halfway between the rows blends them
        let mid = frame.sample(0.25, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_still_image_delivers_once() {
        let frame = VideoFrame::solid(1, 1, [10, 20, 30]).unwrap();
        let mut feed = VideoFeed::with_source(StillImageSource::new(frame.clone()));
        assert!(feed.poll());
        assert!(!feed.poll());
        assert_eq!(feed.latest(), Some(&frame));
        assert_eq!(feed.frames_received(), 1);
    }

    #[test]
    fn test_unavailable_feed_never_delivers() {
        let mut feed = VideoFeed::open_image(None);
        assert!(!feed.poll());
        assert!(feed.latest().is_none());
        assert_eq!(feed.state(), AcquisitionState::Failed);
    }
}
