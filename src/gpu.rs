//! wgpu Render Device
//!
//! [`RenderDevice`] implementation for hosts built on wgpu. Buffers and
//! render targets live in slot maps keyed by the handles the overlay hands
//! out, so the host can resolve the handles of a recorded
//! [`VolumeRasterPass`](crate::scheduler::VolumeRasterPass) back to GPU
//! objects when it encodes the pass.

use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::host::{BufferDesc, BufferId, RenderDevice, RenderTargetDesc, TextureId};

/// A render target with its pre-built default view.
pub struct GpuRenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuRenderTarget {
    fn new(device: &wgpu::Device, desc: &RenderTargetDesc) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.extent.x.max(1),
                height: desc.extent.y.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

pub struct WgpuRenderDevice {
    device: wgpu::Device,
    buffers: SlotMap<BufferId, wgpu::Buffer>,
    targets: SlotMap<TextureId, GpuRenderTarget>,
}

impl WgpuRenderDevice {
    #[must_use]
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            buffers: SlotMap::with_key(),
            targets: SlotMap::with_key(),
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(id)
    }

    #[inline]
    #[must_use]
    pub fn render_target(&self, id: TextureId) -> Option<&GpuRenderTarget> {
        self.targets.get(id)
    }

    #[inline]
    #[must_use]
    pub fn texture_view(&self, id: TextureId) -> Option<&wgpu::TextureView> {
        self.targets.get(id).map(|t| &t.view)
    }

    /// Drops every buffer, e.g. after device loss. Handles held by the
    /// overlay then report invalid and are recreated on the next init.
    pub fn clear_buffers(&mut self) {
        for (_, buffer) in self.buffers.drain() {
            buffer.destroy();
        }
    }

    /// Number of live render targets.
    #[inline]
    #[must_use]
    pub fn render_target_count(&self) -> usize {
        self.targets.len()
    }
}

impl RenderDevice for WgpuRenderDevice {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> BufferId {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: desc.contents,
                usage: desc.usage,
            });
        self.buffers.insert(buffer)
    }

    fn is_buffer_valid(&self, id: BufferId) -> bool {
        self.buffers.contains_key(id)
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> TextureId {
        log::debug!(
            "Creating {} {}x{} {:?}",
            desc.label,
            desc.extent.x,
            desc.extent.y,
            desc.format
        );
        self.targets.insert(GpuRenderTarget::new(&self.device, desc))
    }

    fn release_render_target(&mut self, id: TextureId) {
        if let Some(target) = self.targets.remove(id) {
            target.texture.destroy();
        }
    }
}
