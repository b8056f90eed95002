use bytemuck::{Pod, Zeroable};

use crate::config::Viewport;

/// Workgroup size for `compute.wgsl#mandelbrot`.
pub const MANDELBROT_WORKGROUP_SIZE_Y: u32 = 64;

pub const MANDELBROT_DISPATCH_SIZE_Y: u32 = 1024;

/// Pixels covered by one step of the dispatch grid's `x` dimension. Hardcoded
/// in `compute.wgsl#mandelbrot`'s pixel index.
pub const LANES_PER_X: u32 = MANDELBROT_DISPATCH_SIZE_Y * MANDELBROT_WORKGROUP_SIZE_Y;

/**
Dispatch size for `compute.wgsl#mandelbrot`.

Every pixel gets one invocation. A single dimension runs into the
[maxComputeWorkgroupsPerDimension](https://www.w3.org/TR/webgpu/#dom-supported-limits-maxcomputeworkgroupsperdimension)
limit of 65535 as soon as a frame has more pixels than that, so the work is
laid out in two dimensions: chunks of `1024 * 64 = 65536` pixels along `x`,
each chunk split into 1024 workgroups of `(1, 64, 1)` along `y`.

The pixel index is then `global_invocation_id.x * 65536 + global_invocation_id.y`.
Up to 65535 trailing invocations fall outside the frame and return early.
*/
pub fn mandelbrot_dispatch_size(total_work: usize) -> (u32, u32, u32) {
    let x = (total_work / LANES_PER_X as usize + 1) as u32;
    (x, MANDELBROT_DISPATCH_SIZE_Y, 1)
}

/// Uniform block for `compute.wgsl#Params`.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub max_iterations: u32,
    pub total: u32,
    pub min_re: f32,
    pub max_im: f32,
    pub re_step: f32,
    pub im_step: f32,
}

impl Params {
    pub fn new(viewport: &Viewport, max_iterations: u32) -> Self {
        Params {
            width: viewport.width,
            height: viewport.height,
            max_iterations,
            total: viewport.len() as u32,
            min_re: viewport.min_re as f32,
            max_im: viewport.max_im as f32,
            re_step: viewport.re_step() as f32,
            im_step: viewport.im_step() as f32,
        }
    }
}
