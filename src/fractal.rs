//! The render protocol every engine implements.

use std::path::Path;

use crate::{
    config::Viewport,
    error::{invalid, Result},
};

/// `init_frame`, then `render_frame`, then `save_frame`, once per image.
pub trait Fractal {
    /// Records the frame geometry and gives the image store a fresh, cleared canvas.
    fn init_frame(&mut self, width: u32, height: u32, max_iterations: u32) -> Result<()>;

    /// Colours every pixel of the viewport starting at `min_re`, `min_im`.
    fn render_frame(&mut self, min_re: f64, max_re: f64, min_im: f64) -> Result<()>;

    fn save_frame(&mut self, name: &Path) -> Result<()>;
}

/// Geometry recorded by [`Fractal::init_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32, max_iterations: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(invalid(format!("frame size {}x{} is empty", width, height)));
        }
        if max_iterations < 2 {
            return Err(invalid(format!(
                "max_iterations must be at least 2, got {}",
                max_iterations
            )));
        }
        Ok(Frame {
            width,
            height,
            max_iterations,
        })
    }

    pub fn viewport(&self, min_re: f64, max_re: f64, min_im: f64) -> Result<Viewport> {
        Viewport::new(self.width, self.height, min_re, max_re, min_im)
    }
}

/// The frame recorded by the last `init_frame`, or an error if there was none.
pub(crate) fn initialised(frame: Option<Frame>) -> Result<Frame> {
    frame.ok_or_else(|| invalid("render_frame called before init_frame"))
}
