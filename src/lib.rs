//! Mandelbrot set images and zoom videos.
//!
//! Every pixel of a viewport over the complex plane is tested with the
//! escape-time algorithm, either one pixel at a time ([`SequentialEngine`])
//! or with one kernel lane per pixel on a compute device
//! ([`AcceleratedEngine`]). Escape iterations are coloured on a
//! black -> red -> white gradient. A [`FrameSequencer`] renders a run of
//! frames, changing the viewport or iteration budget between them, and hands
//! the files to a video encoder.

pub mod accelerated;
mod buffer;
pub mod colour;
mod command_encoder;
mod compute;
pub mod config;
pub mod device;
pub mod encoder;
mod error;
pub mod escape;
pub mod fractal;
pub mod gpu;
pub mod image_store;
pub mod pixel;
pub mod sequencer;
pub mod sequential;
mod var;

pub use accelerated::AcceleratedEngine;
pub use config::{FrameConfig, VideoConfig, Viewport};
pub use device::DeviceKind;
pub use encoder::{EncodeRequest, Ffmpeg, VideoEncoder};
pub use error::{Error, Result};
pub use fractal::Fractal;
pub use image_store::{ImageStore, RgbaImageStore};
pub use sequencer::FrameSequencer;
pub use sequential::SequentialEngine;
