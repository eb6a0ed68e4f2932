//! Resolved frames and where they go
//!
//! - [`Frame`]         one rgb8 image, row major
//! - [`FrameSink`]     receives every emitted frame in order
//! - [`PngSequence`]   numbered png files in a directory
//! - [`FrameCollector`] keeps frames in memory

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::debug;

use super::compositor::Color;
use crate::error::FrameError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>, // rgb, 3 bytes per pixel
}

impl Frame {
    /// An all black frame
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 3],
        }
    }

    /// Store a resolved color, rounded and clamped to 0..=255
    pub fn set(&mut self, x: usize, y: usize, color: Color) {
        let at = (y * self.width + x) * 3;
        for (ch, value) in self.pixels[at..at + 3].iter_mut().zip(color.iter()) {
            *ch = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let at = (y * self.width + x) * 3;
        [self.pixels[at], self.pixels[at + 1], self.pixels[at + 2]]
    }

    /// Copy one full row of already converted pixels
    pub fn copy_row(&mut self, y: usize, row: &[u8]) {
        let at = y * self.width * 3;
        self.pixels[at..at + row.len()].copy_from_slice(row);
    }

    pub fn is_black(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }
}

pub trait FrameSink {
    fn emit(&mut self, frame: &Frame) -> Result<(), FrameError>;
}

/// Writes `<directory>/<prefix>_<number>.png`, numbers starting at 1
#[derive(Debug)]
pub struct PngSequence {
    directory: PathBuf,
    prefix: String,
    next: u64,
}

impl PngSequence {
    pub fn new(directory: impl AsRef<Path>, prefix: &str) -> Result<Self, FrameError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            prefix: prefix.to_string(),
            next: 1,
        })
    }

    /// Continue numbering after `frames` already written frames
    pub fn resume_after(mut self, frames: u64) -> Self {
        self.next = frames + 1;
        self
    }

    pub fn path_of(&self, number: u64) -> PathBuf {
        self.directory.join(format!("{}_{:05}.png", self.prefix, number))
    }
}

impl FrameSink for PngSequence {
    fn emit(&mut self, frame: &Frame) -> Result<(), FrameError> {
        let expected = frame.width * frame.height * 3;
        let image = RgbImage::from_raw(frame.width as u32, frame.height as u32, frame.pixels.clone()).ok_or(
            FrameError::Size {
                expected,
                found: frame.pixels.len(),
            },
        )?;

        let path = self.path_of(self.next);
        image.save(&path)?;
        debug!("wrote {}", path.display());
        self.next += 1;
        Ok(())
    }
}

/// Keeps every emitted frame
#[derive(Debug, Default)]
pub struct FrameCollector {
    pub frames: Vec<Frame>,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for FrameCollector {
    fn emit(&mut self, frame: &Frame) -> Result<(), FrameError> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_rounds_and_clamps() {
        let mut f = Frame::new(2, 2);
        f.set(1, 1, Color::new(300.0, 12.6, -4.0));
        assert_eq!(f.get(1, 1), [255, 13, 0]);
        assert_eq!(f.get(0, 1), [0, 0, 0]);
    }

    #[test]
    fn png_names_are_numbered() {
        let dir = std::env::temp_dir().join("starfield_png_names");
        let seq = PngSequence::new(&dir, "frame").unwrap().resume_after(41);
        assert_eq!(seq.path_of(seq.next), dir.join("frame_00042.png"));
    }
}
