use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// Prefers an sRGB format when asked, else takes the surface's first format.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let srgb = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    prefer_srgb
        .then(|| srgb.into_iter().find(|f| formats.contains(f)))
        .flatten()
        .or_else(|| formats.first().copied())
}

pub(crate) fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// A zero-sized surface cannot be configured; the new size is recorded and
/// configuration waits for a non-zero resize.
pub(crate) fn is_configurable(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

/// What the frame loop should do about a failed frame acquisition.
///
/// `Lost`/`Outdated` need a reconfigure (done by the caller), an OOM is
/// unrecoverable, anything else costs one frame.
pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
