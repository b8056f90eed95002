//! Frame and video configuration.

use crate::{
    error::{invalid, Result},
    escape::Complex,
};

/// Everything needed to render one frame.
///
/// The top imaginary bound is not stored: see [`FrameConfig::max_im`].
#[derive(Clone, Debug, PartialEq)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
    pub min_re: f64,
    pub max_re: f64,
    pub min_im: f64,
    pub name: String,
}

impl FrameConfig {
    pub fn max_im(&self) -> f64 {
        derive_max_im(self.width, self.height, self.min_re, self.max_re, self.min_im)
    }

    pub fn viewport(&self) -> Result<Viewport> {
        Viewport::new(self.width, self.height, self.min_re, self.max_re, self.min_im)
    }

    /// Splits the output name at the first `.` of its file name into
    /// `(prefix, extension)`. The prefix keeps any leading directories.
    pub fn split_name(&self) -> Result<(&str, &str)> {
        let file_name = self
            .name
            .rfind(std::path::is_separator)
            .map_or(0, |separator| separator + 1);
        let dot = self.name[file_name..]
            .find('.')
            .ok_or_else(|| invalid(format!("output name {:?} has no extension", self.name)))?;
        let (prefix, ext) = self.name.split_at(file_name + dot);
        Ok((prefix, &ext[1..]))
    }

    /// `<prefix>_<index>.<ext>`
    pub fn frame_name(&self, index: usize) -> Result<String> {
        let (prefix, ext) = self.split_name()?;
        Ok(format!("{}_{}.{}", prefix, index, ext))
    }

    /// The `printf`-style pattern matching every [`FrameConfig::frame_name`].
    pub fn frame_pattern(&self) -> Result<String> {
        let (prefix, ext) = self.split_name()?;
        Ok(format!("{}_%d.{}", prefix, ext))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoConfig {
    pub frames: usize,
    /// How far the viewport shrinks per frame (see [`crate::sequencer::ShrinkViewport`]).
    pub per_frame_delta: f64,
}

/// `max_im = min_im + (max_re - min_re) * height / width`
pub fn derive_max_im(width: u32, height: u32, min_re: f64, max_re: f64, min_im: f64) -> f64 {
    min_im + (max_re - min_re) * height as f64 / width as f64
}

/// A region of the complex plane laid over a `width` x `height` pixel grid.
///
/// Pixel `(0, 0)` is the top left corner `(min_re, max_im)` and pixel
/// `(width - 1, height - 1)` is the bottom right corner `(max_re, min_im)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub min_re: f64,
    pub max_re: f64,
    pub min_im: f64,
    pub max_im: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, min_re: f64, max_re: f64, min_im: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(invalid(format!("frame size {}x{} is empty", width, height)));
        }
        if !(min_re.is_finite() && max_re.is_finite() && min_im.is_finite()) {
            return Err(invalid("viewport bounds must be finite"));
        }
        if max_re <= min_re {
            return Err(invalid(format!(
                "viewport is inverted: max_re {} <= min_re {}",
                max_re, min_re
            )));
        }

        Ok(Viewport {
            width,
            height,
            min_re,
            max_re,
            min_im,
            max_im: derive_max_im(width, height, min_re, max_re, min_im),
        })
    }

    pub fn re_step(&self) -> f64 {
        step(self.max_re - self.min_re, self.width)
    }

    pub fn im_step(&self) -> f64 {
        step(self.max_im - self.min_im, self.height)
    }

    pub fn point(&self, x: u32, y: u32) -> Complex {
        Complex {
            real: self.min_re + x as f64 * self.re_step(),
            imaginary: self.max_im - y as f64 * self.im_step(),
        }
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A single pixel along an axis sits on the lower bound.
fn step(span: f64, pixels: u32) -> f64 {
    if pixels > 1 {
        span / (pixels - 1) as f64
    } else {
        0.0
    }
}
