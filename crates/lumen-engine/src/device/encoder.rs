use crate::backend::FrameEncoder;
use crate::color::Color;

use super::reflect::{SAMPLER_GROUP, TEXTURE_GROUP, UNIFORM_GROUP};
use super::wgpu_device::{WgpuDevice, WgpuPipeline, WgpuTexture};

/// [`FrameEncoder`] recording into one render pass over the frame target.
///
/// The pass is opened by `clear` (or lazily, loading the previous contents,
/// by the first other command) and closed by `end_encoding` or drop. Uniform
/// and texture binds are collected and turned into bind groups right before
/// each draw.
pub struct WgpuFrameEncoder<'a> {
    device: &'a WgpuDevice,
    encoder: &'a mut wgpu::CommandEncoder,
    target: &'a wgpu::TextureView,
    pass: Option<wgpu::RenderPass<'static>>,
    bound: PendingBinds,
    ended: bool,
}

#[derive(Default)]
struct PendingBinds {
    pipeline: Option<WgpuPipeline>,
    uniform: Option<wgpu::Buffer>,
    textures: Vec<Option<wgpu::TextureView>>,
}

impl<'a> WgpuFrameEncoder<'a> {
    pub fn new(
        device: &'a WgpuDevice,
        encoder: &'a mut wgpu::CommandEncoder,
        target: &'a wgpu::TextureView,
    ) -> Self {
        Self {
            device,
            encoder,
            target,
            pass: None,
            bound: PendingBinds::default(),
            ended: false,
        }
    }

    fn pass(&mut self) -> &mut wgpu::RenderPass<'static> {
        let Self {
            pass,
            encoder,
            target,
            ..
        } = self;
        pass.get_or_insert_with(|| begin_pass(encoder, target, wgpu::LoadOp::Load))
    }

    fn usable(&self, what: &str) -> bool {
        if self.ended {
            log::warn!("{what} after end_encoding ignored");
        }
        !self.ended
    }
}

fn begin_pass(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'static> {
    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
        .forget_lifetime()
}

/// Builds groups 0..=2 from what is currently bound, or `None` (with a
/// warning) when the pipeline expects a binding that was never set.
fn bind_groups(device: &WgpuDevice, bound: &PendingBinds) -> Option<[wgpu::BindGroup; 3]> {
    let pipeline = bound.pipeline.as_ref()?;

    let uniform_entries: Vec<wgpu::BindGroupEntry<'_>> = match (pipeline.uniform_size, &bound.uniform) {
        (None, _) => Vec::new(),
        (Some(_), Some(buffer)) => vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        (Some(_), None) => {
            log::warn!("draw skipped: pipeline expects a uniform buffer");
            return None;
        }
    };

    let mut texture_entries = Vec::with_capacity(pipeline.texture_slots as usize);
    for slot in 0..pipeline.texture_slots {
        let Some(Some(view)) = bound.textures.get(slot as usize) else {
            log::warn!("draw skipped: texture slot {slot} is not bound");
            return None;
        };
        texture_entries.push(wgpu::BindGroupEntry {
            binding: slot,
            resource: wgpu::BindingResource::TextureView(view),
        });
    }

    let uniform_group = device.device().create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("lumen uniform bind group"),
        layout: &pipeline.uniform_layout,
        entries: &uniform_entries,
    });
    let texture_group = device.device().create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("lumen texture bind group"),
        layout: &pipeline.texture_layout,
        entries: &texture_entries,
    });

    Some([uniform_group, texture_group, pipeline.sampler_group.clone()])
}

impl FrameEncoder<WgpuDevice> for WgpuFrameEncoder<'_> {
    fn clear(&mut self, color: Color) {
        if !self.usable("clear") {
            return;
        }
        // A clear restarts the pass so the load op applies to the whole target.
        self.pass = None;
        self.pass = Some(begin_pass(
            self.encoder,
            self.target,
            wgpu::LoadOp::Clear(color.into()),
        ));
    }

    fn set_pipeline(&mut self, pipeline: &WgpuPipeline) {
        if !self.usable("set_pipeline") {
            return;
        }
        self.pass().set_pipeline(&pipeline.pipeline);
        self.bound.textures = vec![None; pipeline.texture_slots as usize];
        self.bound.pipeline = Some(pipeline.clone());
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        if self.usable("set_vertex_buffer") {
            self.pass().set_vertex_buffer(slot, buffer.slice(..));
        }
    }

    fn set_index_buffer(&mut self, buffer: &wgpu::Buffer) {
        if self.usable("set_index_buffer") {
            self.pass()
                .set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
        }
    }

    fn set_uniform_buffer(&mut self, binding: u32, buffer: &wgpu::Buffer) {
        if !self.usable("set_uniform_buffer") {
            return;
        }
        if binding != 0 {
            log::warn!("uniform binding {binding} ignored; uniforms live at group {UNIFORM_GROUP} binding 0");
            return;
        }
        self.bound.uniform = Some(buffer.clone());
    }

    fn set_texture(&mut self, slot: u32, texture: &WgpuTexture) {
        if !self.usable("set_texture") {
            return;
        }
        match self.bound.textures.get_mut(slot as usize) {
            Some(entry) => *entry = Some(texture.view.clone()),
            None => log::warn!(
                "texture slot {slot} is outside the pipeline's group {TEXTURE_GROUP} layout"
            ),
        }
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if !self.usable("draw_indexed") {
            return;
        }
        let Some(groups) = bind_groups(self.device, &self.bound) else {
            if self.bound.pipeline.is_none() {
                log::warn!("draw skipped: no pipeline bound");
            }
            return;
        };

        let pass = self.pass();
        for (group, bind_group) in (UNIFORM_GROUP..=SAMPLER_GROUP).zip(groups.iter()) {
            pass.set_bind_group(group, bind_group, &[]);
        }
        pass.draw_indexed(0..index_count, 0, 0..1);
    }

    fn end_encoding(&mut self) {
        self.pass = None;
        self.ended = true;
    }
}
