use crate::render::Renderer;
use crate::source::RenderSource;

use super::{Gpu, SurfaceErrorAction, WgpuDevice, WgpuFrameEncoder};

impl<S: RenderSource> Renderer<WgpuDevice, S> {
    /// Renders one frame to the window surface and presents it.
    ///
    /// When no swapchain image can be acquired the source is not ticked and
    /// the returned action says whether to retry next frame or shut down.
    pub fn draw(&mut self, gpu: &mut Gpu<'_>) -> Result<(), SurfaceErrorAction> {
        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => return Err(gpu.handle_surface_error(err)),
        };

        {
            let device = gpu.render_device();
            let mut encoder = WgpuFrameEncoder::new(device, &mut frame.encoder, &frame.view);
            self.render_frame(device, &mut encoder);
        }

        gpu.submit(frame);
        Ok(())
    }
}
