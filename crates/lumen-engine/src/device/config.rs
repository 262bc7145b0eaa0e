/// Options for bringing up the wgpu device and window surface.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB surface format when the surface offers one.
    pub prefer_srgb: bool,

    /// Swap behavior. `Fifo` is the only mode every backend guarantees.
    pub present_mode: wgpu::PresentMode,

    /// Requested alpha mode; falls back to the first supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,

    /// Limits requested from the adapter. `max_sampled_textures_per_shader_stage`
    /// bounds the texture slots a scene may use.
    pub required_limits: wgpu::Limits,

    /// Frames the presentation engine may queue ahead (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
