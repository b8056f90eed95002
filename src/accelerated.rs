//! Escape-time rendering with one kernel lane per pixel.

use std::path::Path;

use log::{debug, trace};

use crate::{
    colour::colour_counts,
    device::{ComputeDevice, DeviceKind},
    error::{Error, Result},
    fractal::{initialised, Fractal, Frame},
    image_store::ImageStore,
};

pub struct AcceleratedEngine<S> {
    store: S,
    kind: DeviceKind,
    /// Only populated when the device is held across renders.
    held: Option<Box<dyn ComputeDevice>>,
    hold_device: bool,
    frame: Option<Frame>,
}

impl<S: ImageStore> AcceleratedEngine<S> {
    /// Acquires a `kind` device at the start of each render and releases it at the end.
    pub fn new(store: S, kind: DeviceKind) -> Self {
        AcceleratedEngine {
            store,
            kind,
            held: None,
            hold_device: false,
            frame: None,
        }
    }

    /// Keeps the device after the first render until the engine is dropped.
    pub fn holding_device(mut self) -> Self {
        self.hold_device = true;
        self
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn dispatch(&mut self, frame: Frame, min_re: f64, max_re: f64, min_im: f64) -> Result<Vec<u32>> {
        let viewport = frame.viewport(min_re, max_re, min_im)?;
        debug!(
            "rendering frame min_re={} max_re={} min_im={} max_im={} on {}",
            viewport.min_re, viewport.max_re, viewport.min_im, viewport.max_im, self.kind
        );

        let counts = if self.hold_device {
            if self.held.is_none() {
                self.held = Some(self.kind.acquire()?);
            }
            match self.held.as_mut() {
                Some(device) => device.dispatch(&viewport, frame.max_iterations),
                None => Err(Error::DeviceUnavailable(self.kind.to_string())),
            }
        } else {
            // Dropped, and so released, before this block is left.
            let mut device = self.kind.acquire()?;
            device.dispatch(&viewport, frame.max_iterations)
        }?;

        if counts.len() != viewport.len() {
            return Err(Error::KernelError(format!(
                "kernel returned {} counts for {} pixels",
                counts.len(),
                viewport.len()
            )));
        }
        Ok(counts)
    }
}

impl<S: ImageStore> Fractal for AcceleratedEngine<S> {
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
        let counts = self.dispatch(frame, min_re, max_re, min_im)?;

        trace!("writing {} pixels", counts.len());
        for pixel in colour_counts(&counts, frame.width, frame.max_iterations) {
            self.store.set_pixel(pixel);
        }
        Ok(())
    }

    fn save_frame(&mut self, name: &Path) -> Result<()> {
        debug!("saving image {}", name.display());
        self.store.save(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Viewport, image_store::RgbaImageStore, sequential::iteration_counts,
        sequential::SequentialEngine,
    };

    fn render<F: Fractal>(engine: &mut F) {
        engine.init_frame(90, 60, 40).unwrap();
        engine.render_frame(-2.0, 1.0, -1.2).unwrap();
    }

    #[test]
    fn cpu_lanes_agree_with_the_sequential_engine() {
        let viewport = Viewport::new(90, 60, -2.0, 1.0, -1.2).unwrap();
        let mut device = DeviceKind::Cpu.acquire().unwrap();
        assert_eq!(
            device.dispatch(&viewport, 40).unwrap(),
            iteration_counts(&viewport, 40)
        );

        let mut sequential = SequentialEngine::new(RgbaImageStore::new());
        let mut accelerated = AcceleratedEngine::new(RgbaImageStore::new(), DeviceKind::Cpu);
        render(&mut sequential);
        render(&mut accelerated);
        assert_eq!(
            sequential.store().image().as_raw(),
            accelerated.store().image().as_raw()
        );
    }

    #[test]
    fn held_device_renders_the_same_frames() {
        let mut scoped = AcceleratedEngine::new(RgbaImageStore::new(), DeviceKind::Cpu);
        let mut held =
            AcceleratedEngine::new(RgbaImageStore::new(), DeviceKind::Cpu).holding_device();
        for _ in 0..2 {
            render(&mut scoped);
            render(&mut held);
            assert_eq!(scoped.store().image().as_raw(), held.store().image().as_raw());
        }
        assert!(held.held.is_some());
        assert!(scoped.held.is_none());
    }

    #[test]
    fn rejects_bad_input_before_acquiring_a_device() {
        // A GPU engine on a machine without one still reports configuration errors first.
        let mut engine = AcceleratedEngine::new(RgbaImageStore::new(), DeviceKind::Gpu);
        assert!(matches!(
            engine.render_frame(-2.0, 1.0, -1.2),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            engine.init_frame(10, 10, 1),
            Err(Error::InvalidConfiguration(_))
        ));
        engine.init_frame(10, 10, 30).unwrap();
        assert!(matches!(
            engine.render_frame(1.0, 1.0, -1.2),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn gpu_render_is_either_complete_or_unavailable() {
        let mut engine = AcceleratedEngine::new(RgbaImageStore::new(), DeviceKind::Gpu);
        engine.init_frame(32, 32, 30).unwrap();
        match engine.render_frame(-2.0, 1.0, -1.2) {
            Ok(()) => {
                let centre = engine.store().image().get_pixel(21, 19);
                assert_eq!(centre.0, [0, 0, 0, 255]);
            }
            Err(Error::DeviceUnavailable(reason)) => println!("Skipping test: {}", reason),
            Err(error) => panic!("unexpected error: {}", error),
        }
    }
}
