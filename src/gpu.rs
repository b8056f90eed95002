//! The escape-time kernel on a `wgpu` adapter.

use log::{debug, info, trace};

use crate::{
    buffer::{self, copy_buffer_to_buffer},
    command_encoder::{self, CommandEncoderExt},
    compute::{mandelbrot_dispatch_size, Params},
    config::Viewport,
    device::ComputeDevice,
    error::{Error, Result},
    var,
};

/// An adapter, its logical device and the compiled `mandelbrot` pipeline.
pub struct GpuDevice {
    name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl GpuDevice {
    pub fn acquire() -> Result<Self> {
        pollster::block_on(Self::request())
    }

    async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| Error::DeviceUnavailable("no GPU adapter found".into()))?;

        let adapter_info = adapter.get_info();
        info!("GPU adapter: {:?}", adapter_info);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|error| Error::DeviceUnavailable(error.to_string()))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let compute_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("compute-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("compute.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compute-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compute-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("compute-pipeline"),
            layout: Some(&pipeline_layout),
            module: &compute_shader_module,
            entry_point: "mandelbrot",
        });

        if let Some(error) = device.pop_error_scope().await {
            return Err(Error::KernelError(format!("compiling kernel: {}", error)));
        }

        Ok(GpuDevice {
            name: adapter_info.name,
            device,
            queue,
            bind_group_layout,
            pipeline,
        })
    }

    fn check_capacity(&self, total_work: u64) -> Result<()> {
        let limit = u64::from(self.device.limits().max_storage_buffer_binding_size);
        if buffer::byte_size::<u32>(total_work) > limit || total_work > u64::from(u32::MAX) {
            return Err(Error::KernelError(format!(
                "{} pixels exceed the device's storage limit of {} bytes",
                total_work, limit
            )));
        }
        Ok(())
    }

    fn read_back(&self, staging: &buffer::Buffer<u32>) -> Result<Vec<u32>> {
        let slice = staging.slice(..);
        let (sender, receiver) = futures_channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        // Blocks until the dispatch and the copy have finished.
        self.device.poll(wgpu::Maintain::Wait);

        pollster::block_on(receiver)
            .map_err(|_| Error::KernelError("buffer mapping was cancelled".into()))?
            .map_err(|error| Error::KernelError(format!("buffer mapping failed: {}", error)))?;

        let counts = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(counts)
    }
}

impl ComputeDevice for GpuDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&mut self, viewport: &Viewport, max_iterations: u32) -> Result<Vec<u32>> {
        let total_work = viewport.len() as u64;
        self.check_capacity(total_work)?;
        trace!("begin gpu dispatch of {} lanes", total_work);

        // Covers buffer and bind group creation as well as the pass.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params = var::Builder::new(Params::new(viewport, max_iterations))
            .with_label("params")
            .create(&self.device);

        let counts = buffer::Builder::<u32>::new(total_work)
            .with_label("iteration-counts")
            .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
            .create(&self.device);

        let staging = buffer::Builder::<u32>::new(total_work)
            .with_label("iteration-counts-staging")
            .with_usage(wgpu::BufferUsages::MAP_READ)
            .create(&self.device);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compute-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counts.binding_resource(),
                },
            ],
        });

        let command_buffer = command_encoder::record(
            &self.device,
            &wgpu::CommandEncoderDescriptor {
                label: Some("mandelbrot"),
            },
            |command_encoder| {
                command_encoder.with_compute_pass(
                    &wgpu::ComputePassDescriptor {
                        label: Some("compute-pass"),
                    },
                    |compute_pass| {
                        let (x, y, z) = mandelbrot_dispatch_size(total_work as usize);
                        compute_pass.set_pipeline(&self.pipeline);
                        compute_pass.set_bind_group(0, &bind_group, &[]);
                        compute_pass.insert_debug_marker("mandelbrot");
                        compute_pass.dispatch_workgroups(x, y, z);
                    },
                );
                copy_buffer_to_buffer(command_encoder, &counts, &staging, counts.len());
            },
        );
        self.queue.submit([command_buffer]);

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::KernelError(format!("dispatch failed: {}", error)));
        }

        let result = self.read_back(&staging);

        params.destroy();
        counts.destroy();
        staging.destroy();

        trace!("end gpu dispatch");
        result
    }
}

impl Drop for GpuDevice {
    fn drop(&mut self) {
        debug!("releasing gpu device {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::{escape_time, IterationResult};

    /// `None` when this machine has no usable adapter.
    fn gpu() -> Option<GpuDevice> {
        match GpuDevice::acquire() {
            Ok(device) => Some(device),
            Err(error) => {
                println!("Skipping test: {}", error);
                None
            }
        }
    }

    #[test]
    fn gpu_acquisition_does_not_panic() {
        match GpuDevice::acquire() {
            Ok(device) => println!("GPU available: {}", device.name()),
            Err(Error::DeviceUnavailable(reason)) => println!("GPU unavailable: {}", reason),
            Err(error) => panic!("unexpected error: {}", error),
        }
    }

    #[test]
    fn gpu_matches_cpu_away_from_the_boundary() {
        let Some(mut device) = gpu() else {
            return;
        };

        let viewport = Viewport::new(64, 48, -2.0, 1.0, -1.2).unwrap();
        let counts = device.dispatch(&viewport, 40).unwrap();
        assert_eq!(counts.len(), viewport.len());

        // The kernel runs in f32, so pixels right on the set's edge may
        // disagree by an iteration or two. Most of the frame must not.
        let mismatches = counts
            .iter()
            .enumerate()
            .filter(|(index, count)| {
                let point = viewport.point(*index as u32 % 64, *index as u32 / 64);
                IterationResult::from_count(**count, 40) != escape_time(point, 40)
            })
            .count();
        assert!(mismatches * 100 < counts.len(), "{} mismatches", mismatches);
    }

    #[test]
    fn frames_wider_than_one_dispatch_row_are_covered() {
        let Some(mut device) = gpu() else {
            return;
        };

        let viewport = Viewport::new(400, 200, 3.0, 4.0, 3.0).unwrap();
        let counts = device.dispatch(&viewport, 10).unwrap();
        assert!(counts.iter().all(|count| *count == 0));
    }

    #[test]
    fn dispatch_leaves_the_error_scopes_balanced() {
        let Some(mut device) = gpu() else {
            return;
        };

        let viewport = Viewport::new(8, 8, -2.0, 1.0, -1.0).unwrap();
        device.device.push_error_scope(wgpu::ErrorFilter::Validation);
        for _ in 0..2 {
            assert_eq!(device.dispatch(&viewport, 10).unwrap().len(), 64);
        }
        assert!(pollster::block_on(device.device.pop_error_scope()).is_none());
    }
}
