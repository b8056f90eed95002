pub trait CommandEncoderExt {
    fn with_compute_pass<'pass, A>(
        &'pass mut self,
        descriptor: &wgpu::ComputePassDescriptor,
        function: impl FnOnce(&mut wgpu::ComputePass<'pass>) -> A,
    ) -> A;
}

impl CommandEncoderExt for wgpu::CommandEncoder {
    fn with_compute_pass<'pass, A>(
        &'pass mut self,
        descriptor: &wgpu::ComputePassDescriptor,
        function: impl FnOnce(&mut wgpu::ComputePass<'pass>) -> A,
    ) -> A {
        let mut compute_pass = self.begin_compute_pass(descriptor);
        function(&mut compute_pass)
    }
}

/// Records commands with `function` and finishes the encoder.
pub fn record(
    device: &wgpu::Device,
    descriptor: &wgpu::CommandEncoderDescriptor,
    function: impl FnOnce(&mut wgpu::CommandEncoder),
) -> wgpu::CommandBuffer {
    let mut command_encoder = device.create_command_encoder(descriptor);
    function(&mut command_encoder);
    command_encoder.finish()
}
