//! Compute devices for the accelerated engine.
//!
//! A device is acquired right before a dispatch and released when the value
//! is dropped, whichever way the render exits.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use log::{debug, trace, warn};
use rayon::prelude::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::{
    config::Viewport,
    error::{Error, Result},
    escape::escape_time,
    gpu::GpuDevice,
};

/// Runs the escape-time kernel with one independent lane per pixel.
pub trait ComputeDevice {
    fn name(&self) -> &str;

    /// Returns the row-major iteration-count buffer for `viewport`, with
    /// `max_iterations` marking bounded pixels.
    fn dispatch(&mut self, viewport: &Viewport, max_iterations: u32) -> Result<Vec<u32>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// Lanes emulated on a CPU thread pool.
    Cpu,
    /// A `wgpu` adapter running `compute.wgsl`.
    ///
    /// The kernel works in `f32`, so counts only approximately agree with the
    /// `f64` engines: pixels near the set's boundary may escape at a different
    /// iteration.
    Gpu,
}

impl DeviceKind {
    pub fn acquire(self) -> Result<Box<dyn ComputeDevice>> {
        let device: Result<Box<dyn ComputeDevice>> = match self {
            DeviceKind::Cpu => CpuDevice::acquire().map(boxed),
            DeviceKind::Gpu => GpuDevice::acquire().map(boxed),
        };
        match device {
            Ok(device) => {
                debug!("acquired {} device {}", self, device.name());
                Ok(device)
            }
            Err(error) => {
                warn!("could not acquire {} device: {}", self, error);
                Err(error)
            }
        }
    }
}

fn boxed(device: impl ComputeDevice + 'static) -> Box<dyn ComputeDevice> {
    Box::new(device)
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Gpu => write!(f, "gpu"),
        }
    }
}

/// A dedicated rayon pool with one worker per core.
pub struct CpuDevice {
    name: String,
    pool: rayon::ThreadPool,
}

impl CpuDevice {
    pub fn acquire() -> Result<Self> {
        let threads = num_cpus::get();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("mandelbrot-lane-{}", index))
            .build()
            .map_err(|error| Error::DeviceUnavailable(error.to_string()))?;

        Ok(CpuDevice {
            name: format!("{} threads", threads),
            pool,
        })
    }
}

impl ComputeDevice for CpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&mut self, viewport: &Viewport, max_iterations: u32) -> Result<Vec<u32>> {
        trace!("begin cpu dispatch of {} lanes", viewport.len());

        let mut counts = vec![0; viewport.len()];
        let width = viewport.width as usize;
        let lanes = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                counts.par_iter_mut().enumerate().for_each(|(index, count)| {
                    let point = viewport.point((index % width) as u32, (index / width) as u32);
                    *count = escape_time(point, max_iterations).to_count(max_iterations);
                })
            })
        }));
        if lanes.is_err() {
            return Err(Error::KernelError("a cpu lane panicked".into()));
        }

        trace!("end cpu dispatch");
        Ok(counts)
    }
}

impl Drop for CpuDevice {
    fn drop(&mut self) {
        debug!("releasing cpu device {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::IterationResult;

    #[test]
    fn cpu_lanes_fill_the_whole_buffer() {
        let viewport = Viewport::new(7, 5, -2.0, 1.0, -1.0).unwrap();
        let mut device = CpuDevice::acquire().unwrap();
        let counts = device.dispatch(&viewport, 20).unwrap();

        assert_eq!(counts.len(), 35);
        for (index, count) in counts.iter().enumerate() {
            let point = viewport.point(index as u32 % 7, index as u32 / 7);
            assert_eq!(
                IterationResult::from_count(*count, 20),
                escape_time(point, 20)
            );
        }
    }

    #[test]
    fn device_kinds_display_in_lower_case() {
        assert_eq!(DeviceKind::Cpu.to_string(), "cpu");
        assert_eq!(DeviceKind::Gpu.to_string(), "gpu");
    }
}
