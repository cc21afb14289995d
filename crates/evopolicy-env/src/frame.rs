use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How [`Environment::render`](crate::Environment::render) should present the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Show the state directly (log, window, terminal); no frame is returned.
    Human,
    /// Return an RGB frame.
    RgbArray,
}

/// An RGB image, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Creates a frame filled with one color.
    #[must_use]
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let pixels = rgb.repeat(width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Sets a pixel; coordinates outside the frame are ignored.
    pub fn put(&mut self, x: isize, y: isize, rgb: [u8; 3]) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y * self.width + x) * 3;
        self.pixels[offset..offset + 3].copy_from_slice(&rgb);
    }

    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let offset = (y * self.width + x) * 3;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ]
    }
}

/// Frames captured from one rollout plus where they should be written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub path: PathBuf,
    pub frames: Vec<Frame>,
}

/// Encodes a [`Recording`] (e.g. as an animation) at its target path.
pub trait FrameExporter {
    type Error;

    fn export(&self, recording: &Recording) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_ignores_out_of_bounds() {
        let mut frame = Frame::filled(4, 3, [255, 255, 255]);
        frame.put(1, 2, [1, 2, 3]);
        frame.put(-1, 0, [9, 9, 9]);
        frame.put(4, 0, [9, 9, 9]);
        assert_eq!(frame.pixel(1, 2), [1, 2, 3]);
        assert_eq!(frame.pixel(0, 0), [255, 255, 255]);
        assert_eq!(frame.pixels.len(), 4 * 3 * 3);
    }
}
