//! Escape-time rendering one pixel at a time.

use std::path::Path;

use log::debug;

use crate::{
    colour::colour_of,
    config::Viewport,
    error::Result,
    escape::escape_time,
    fractal::{initialised, Fractal, Frame},
    image_store::ImageStore,
    pixel::Pixel,
};

pub struct SequentialEngine<S> {
    store: S,
    frame: Option<Frame>,
}

impl<S: ImageStore> SequentialEngine<S> {
    pub fn new(store: S) -> Self {
        SequentialEngine { store, frame: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: ImageStore> Fractal for SequentialEngine<S> {
    fn init_frame(&mut self, width: u32, height: u32, max_iterations: u32) -> Result<()> {
        debug!(
            "initializing frame size {}x{} with {} max iterations",
            width, height, max_iterations
        );
        let frame = Frame::new(width, height, max_iterations)?;

        self.store.set_size(width, height);
        self.store.clear();
        self.frame = Some(frame);
        Ok(())
    }

    fn render_frame(&mut self, min_re: f64, max_re: f64, min_im: f64) -> Result<()> {
        let frame = initialised(self.frame)?;
        let viewport = frame.viewport(min_re, max_re, min_im)?;
        debug!(
            "rendering frame min_re={} max_re={} min_im={} max_im={}",
            viewport.min_re, viewport.max_re, viewport.min_im, viewport.max_im
        );

        for y in 0..viewport.height {
            for x in 0..viewport.width {
                let result = escape_time(viewport.point(x, y), frame.max_iterations);
                self.store.set_pixel(Pixel {
                    x,
                    y,
                    colour: colour_of(result, frame.max_iterations),
                });
            }
        }
        Ok(())
    }

    fn save_frame(&mut self, name: &Path) -> Result<()> {
        debug!("saving image {}", name.display());
        self.store.save(name)
    }
}

/// The iteration-count buffer the sequential path walks, row-major from the top.
pub fn iteration_counts(viewport: &Viewport, max_iterations: u32) -> Vec<u32> {
    (0..viewport.height)
        .flat_map(|y| (0..viewport.width).map(move |x| (x, y)))
        .map(|(x, y)| escape_time(viewport.point(x, y), max_iterations).to_count(max_iterations))
        .collect()
}
