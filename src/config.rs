/// Settings used when creating the GPU device and running the frame loop.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    pub device_label: String,
    /// The batch pool is only trimmed once it holds at least this many batches.
    pub batch_pool_trim_threshold: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::LowPower,
            device_label: "kestrel device".to_string(),
            batch_pool_trim_threshold: 16,
        }
    }
}
