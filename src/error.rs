use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot pop render state: the state stack is empty")]
    StateStackUnderflow,
    #[error("Cannot pop clip rect: the clip stack is empty")]
    ClipStackUnderflow,
    #[error("Invalid batch capacity: {0}")]
    InvalidCapacity(usize),
    #[error("A batch cannot hold {0} quads")]
    BatchOverflow(usize),
    #[error("Blend mode not registered: {0}")]
    UnknownBlendMode(String),
    #[error("Invalid texture size: {width}x{height}")]
    TextureSize { width: u32, height: u32 },
    #[error("No GPU device is available")]
    NoDevice,
    #[error("Failed to find GPU adapter: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),
    #[error("Failed to create device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
