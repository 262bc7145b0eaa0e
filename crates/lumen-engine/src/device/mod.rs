//! wgpu backend.
//!
//! - [`Gpu`] owns the window surface and the device
//! - [`WgpuDevice`] / [`WgpuFrameEncoder`] implement the backend traits
//! - shader interfaces are reflected with naga before wgpu sees the module

mod config;
mod encoder;
mod frame;
mod gpu;
mod reflect;
mod surface;
mod wgpu_device;

pub use config::GpuInit;
pub use encoder::WgpuFrameEncoder;
pub use gpu::{Gpu, GpuFrame, SurfaceErrorAction};
pub use wgpu_device::{WgpuDevice, WgpuPipeline, WgpuTexture};
