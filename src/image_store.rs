//! Where rendered pixels go.

use std::path::Path;

use image::RgbaImage;
use log::debug;

use crate::{
    error::Result,
    pixel::{Pixel, Rgba},
};

/// A canvas the engines paint into and persist.
pub trait ImageStore {
    fn set_size(&mut self, width: u32, height: u32);

    /// Fills the whole canvas with the background colour.
    fn clear(&mut self);

    fn set_pixel(&mut self, pixel: Pixel);

    fn save(&self, path: &Path) -> Result<()>;
}

/// An [`ImageStore`] backed by [`image::RgbaImage`]; the file format follows the extension.
pub struct RgbaImageStore {
    image: RgbaImage,
    background: Rgba,
}

impl RgbaImageStore {
    pub fn new() -> Self {
        Self::with_background(Rgba::WHITE)
    }

    pub fn with_background(background: Rgba) -> Self {
        RgbaImageStore {
            image: RgbaImage::new(0, 0),
            background,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl Default for RgbaImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore for RgbaImageStore {
    fn set_size(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        let Rgba { r, g, b, a } = self.background;
        for pixel in self.image.pixels_mut() {
            *pixel = image::Rgba([r, g, b, a]);
        }
    }

    fn set_pixel(&mut self, pixel: Pixel) {
        let Rgba { r, g, b, a } = pixel.colour;
        self.image.put_pixel(pixel.x, pixel.y, image::Rgba([r, g, b, a]));
    }

    fn save(&self, path: &Path) -> Result<()> {
        debug!(
            "writing {}x{} image to {}",
            self.image.width(),
            self.image.height(),
            path.display()
        );
        self.image.save(path)?;
        Ok(())
    }
}
