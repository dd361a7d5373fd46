//! Backend images, their view caches and buffers as seen by the utility engine.
//!
//! [`ImageHelper`] tracks what the engine needs to know about an allocated image: formats,
//! extents, layout, which subresources hold defined content and the updates staged for it.
//! [`ImageViewHelper`] lazily creates and caches views into one image.

use std::cell::RefCell;
use std::rc::Rc;

use aero_gles_texture::{Extents, InternalFormat};
use hashbrown::HashMap;

use crate::error::BackendError;
use crate::format;
use crate::hal::{
    Access, BufferHandle, BufferImageCopy, ClearValue, CommandRecorder, Device, ImageAspects,
    ImageBarrier, ImageHandle, ImageLayout, ImageViewDesc, ImageViewHandle, PipelineStages,
    MAX_DRAW_BUFFERS,
};

pub type SharedImage = Rc<RefCell<ImageHelper>>;
pub type SharedImageViews = Rc<RefCell<ImageViewHelper>>;

/// Layers beyond this index are not tracked for defined content and always count as defined.
pub const MAX_CONTENT_DEFINED_LAYER_COUNT: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageType {
    D2,
    D3,
}

fn is_read_only_layout(layout: ImageLayout) -> bool {
    matches!(layout, ImageLayout::ShaderReadOnly | ImageLayout::TransferSrc)
}

/// Stages and accesses that may have touched an image last left in `layout`.
fn layout_producer(layout: ImageLayout) -> (PipelineStages, Access) {
    match layout {
        ImageLayout::Undefined => (PipelineStages::TOP_OF_PIPE, Access::empty()),
        ImageLayout::General => (
            PipelineStages::COMPUTE_SHADER,
            Access::SHADER_READ | Access::SHADER_WRITE,
        ),
        ImageLayout::ColorAttachment => (
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            Access::COLOR_ATTACHMENT_WRITE,
        ),
        ImageLayout::DepthStencilAttachment => (
            PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
            Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        ImageLayout::ShaderReadOnly => (
            PipelineStages::FRAGMENT_SHADER | PipelineStages::COMPUTE_SHADER,
            Access::SHADER_READ,
        ),
        ImageLayout::TransferSrc => (PipelineStages::TRANSFER, Access::TRANSFER_READ),
        ImageLayout::TransferDst => (PipelineStages::TRANSFER, Access::TRANSFER_WRITE),
        ImageLayout::Present => (PipelineStages::COLOR_ATTACHMENT_OUTPUT, Access::empty()),
    }
}

fn layer_range_bits(layer: u32, layer_count: u32) -> u8 {
    let end = (layer + layer_count).min(MAX_CONTENT_DEFINED_LAYER_COUNT);
    (layer..end).fold(0u8, |bits, l| bits | 1 << l)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StagedUpdateKind {
    Clear(ClearValue),
    /// Resets channels that only exist because the format is emulated.
    ClearEmulatedChannels(ClearValue),
    Buffer { buffer: BufferHandle, copy: BufferImageCopy },
}

/// An update recorded against an image but not yet flushed to the command stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StagedUpdate {
    /// GL level.
    pub level: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    pub aspects: ImageAspects,
    pub kind: StagedUpdateKind,
}

impl StagedUpdate {
    fn overlaps(&self, level: u32, layer: u32, layer_count: u32) -> bool {
        self.level == level
            && self.base_layer < layer + layer_count
            && layer < self.base_layer + self.layer_count
    }
}

/// Clears folded into a render pass's load ops instead of being recorded on their own.
///
/// Slots `0..MAX_DRAW_BUFFERS` hold color attachments; the last slot holds depth/stencil.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeferredClears {
    values: [Option<(ImageAspects, ClearValue)>; MAX_DRAW_BUFFERS + 1],
}

impl DeferredClears {
    pub const DEPTH_STENCIL_INDEX: usize = MAX_DRAW_BUFFERS;

    pub fn store(&mut self, index: usize, aspects: ImageAspects, value: ClearValue) {
        self.values[index] = Some((aspects, value));
    }

    pub fn get(&self, index: usize) -> Option<(ImageAspects, ClearValue)> {
        self.values[index]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

#[derive(Debug)]
pub struct ImageHelper {
    handle: ImageHandle,
    image_type: ImageType,
    intended_format: InternalFormat,
    actual_format: InternalFormat,
    extents: Extents,
    rotated_aspect_ratio: bool,
    first_allocated_level: u32,
    level_count: u32,
    layer_count: u32,
    samples: u32,
    current_layout: ImageLayout,
    /// Per backend level, one bit per layer.
    content_defined: Vec<u8>,
    stencil_content_defined: Vec<u8>,
    staged_updates: Vec<StagedUpdate>,
    yuv: bool,
}

impl ImageHelper {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        handle: ImageHandle,
        image_type: ImageType,
        intended_format: InternalFormat,
        extents: Extents,
        first_allocated_level: u32,
        level_count: u32,
        layer_count: u32,
        samples: u32,
    ) -> Self {
        Self {
            handle,
            image_type,
            intended_format,
            actual_format: format::actual_image_format(intended_format),
            extents,
            rotated_aspect_ratio: false,
            first_allocated_level,
            level_count,
            layer_count,
            samples,
            current_layout: ImageLayout::Undefined,
            content_defined: vec![0; level_count as usize],
            stencil_content_defined: vec![0; level_count as usize],
            staged_updates: Vec::new(),
            yuv: false,
        }
    }

    pub fn into_shared(self) -> SharedImage {
        Rc::new(RefCell::new(self))
    }

    pub fn with_actual_format(mut self, actual: InternalFormat) -> Self {
        self.actual_format = actual;
        self
    }

    /// Marks the image as presented with a 90 or 270 degree pre-rotation.
    pub fn with_rotated_aspect_ratio(mut self, rotated: bool) -> Self {
        self.rotated_aspect_ratio = rotated;
        self
    }

    pub fn with_yuv(mut self, yuv: bool) -> Self {
        self.yuv = yuv;
        self
    }

    pub fn handle(&self) -> ImageHandle {
        self.handle
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn intended_format(&self) -> InternalFormat {
        self.intended_format
    }

    pub fn actual_format(&self) -> InternalFormat {
        self.actual_format
    }

    pub fn aspects(&self) -> ImageAspects {
        format::aspects(self.actual_format)
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn first_allocated_level(&self) -> u32 {
        self.first_allocated_level
    }

    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn is_yuv(&self) -> bool {
        self.yuv
    }

    pub fn current_layout(&self) -> ImageLayout {
        self.current_layout
    }

    pub fn set_current_layout(&mut self, layout: ImageLayout) {
        self.current_layout = layout;
    }

    /// Records a barrier moving the whole image into `new_layout` for work in `dst_stages`.
    ///
    /// Read-to-same-read transitions need no barrier and record nothing.
    pub fn change_layout(
        &mut self,
        cmd: &mut dyn CommandRecorder,
        new_layout: ImageLayout,
        dst_stages: PipelineStages,
        dst_access: Access,
    ) {
        let old_layout = self.current_layout;
        if old_layout == new_layout && is_read_only_layout(new_layout) {
            return;
        }
        let (src_stages, src_access) = layout_producer(old_layout);
        cmd.image_barrier(ImageBarrier {
            image: self.handle,
            aspects: self.aspects(),
            base_level: 0,
            level_count: self.level_count,
            base_layer: 0,
            layer_count: self.layer_count,
            old_layout,
            new_layout,
            src_stages,
            src_access,
            dst_stages,
            dst_access,
        });
        self.current_layout = new_layout;
    }

    pub fn has_emulated_image_channels(&self) -> bool {
        format::has_emulated_channels(self.intended_format, self.actual_format)
    }

    /// Backend level index for a GL level.
    pub fn to_vk_level(&self, level_gl: u32) -> u32 {
        debug_assert!(level_gl >= self.first_allocated_level);
        level_gl - self.first_allocated_level
    }

    pub fn level_extents(&self, level_vk: u32) -> Extents {
        self.extents.mip(level_vk, self.image_type == ImageType::D3)
    }

    /// 2D extents of a level with width and height swapped under a 90/270 degree pre-rotation.
    pub fn rotated_level_extents_2d(&self, level_vk: u32) -> Extents {
        let extents = self.level_extents(level_vk);
        if self.rotated_aspect_ratio {
            Extents::new(extents.height, extents.width, 1)
        } else {
            Extents::new(extents.width, extents.height, 1)
        }
    }

    pub fn has_subresource_defined_content(
        &self,
        level_gl: u32,
        layer: u32,
        layer_count: u32,
    ) -> bool {
        self.defined_bits(&self.content_defined, level_gl, layer, layer_count)
    }

    pub fn has_subresource_defined_stencil_content(
        &self,
        level_gl: u32,
        layer: u32,
        layer_count: u32,
    ) -> bool {
        self.defined_bits(&self.stencil_content_defined, level_gl, layer, layer_count)
    }

    fn defined_bits(&self, bits: &[u8], level_gl: u32, layer: u32, layer_count: u32) -> bool {
        if layer >= MAX_CONTENT_DEFINED_LAYER_COUNT {
            return true;
        }
        let level = self.to_vk_level(level_gl) as usize;
        let range = layer_range_bits(layer, layer_count);
        bits.get(level).is_some_and(|b| b & range != 0)
    }

    /// Marks `aspects` of the subresource as holding defined content.
    pub fn on_write(&mut self, level_gl: u32, layer: u32, layer_count: u32, aspects: ImageAspects) {
        if layer >= MAX_CONTENT_DEFINED_LAYER_COUNT {
            return;
        }
        let level = self.to_vk_level(level_gl) as usize;
        let range = layer_range_bits(layer, layer_count);
        if aspects.intersects(ImageAspects::COLOR | ImageAspects::DEPTH) {
            if let Some(bits) = self.content_defined.get_mut(level) {
                *bits |= range;
            }
        }
        if aspects.contains(ImageAspects::STENCIL) {
            if let Some(bits) = self.stencil_content_defined.get_mut(level) {
                *bits |= range;
            }
        }
    }

    /// Drops the defined-content mark of a subresource.
    ///
    /// Returns whether the image prefers to keep its contents defined anyway: emulated channels
    /// must keep valid values (a clear of them is staged instead), and untracked layers cannot
    /// be invalidated.
    pub fn invalidate_subresource_content(
        &mut self,
        level_gl: u32,
        layer: u32,
        layer_count: u32,
    ) -> bool {
        if layer >= MAX_CONTENT_DEFINED_LAYER_COUNT {
            tracing::debug!(
                layer,
                "invalidation of an untracked layer ignored; contents stay defined"
            );
            return true;
        }
        let level = self.to_vk_level(level_gl) as usize;
        let range = layer_range_bits(layer, layer_count);
        if let Some(bits) = self.content_defined.get_mut(level) {
            *bits &= !range;
        }

        if self.has_emulated_image_channels() && self.aspects().contains(ImageAspects::COLOR) {
            self.stage_update(StagedUpdate {
                level: level_gl,
                base_layer: layer,
                layer_count,
                aspects: ImageAspects::COLOR,
                kind: StagedUpdateKind::ClearEmulatedChannels(self.emulated_channels_clear_value()),
            });
            return true;
        }
        false
    }

    pub fn invalidate_subresource_stencil_content(
        &mut self,
        level_gl: u32,
        layer: u32,
        layer_count: u32,
    ) -> bool {
        if layer >= MAX_CONTENT_DEFINED_LAYER_COUNT {
            return true;
        }
        let level = self.to_vk_level(level_gl) as usize;
        let range = layer_range_bits(layer, layer_count);
        if let Some(bits) = self.stencil_content_defined.get_mut(level) {
            *bits &= !range;
        }
        false
    }

    fn emulated_channels_clear_value(&self) -> ClearValue {
        match format::NumericClass::of(self.actual_format) {
            format::NumericClass::Float => ClearValue::Float([0.0, 0.0, 0.0, 1.0]),
            format::NumericClass::Sint => ClearValue::Int([0, 0, 0, 1]),
            format::NumericClass::Uint => ClearValue::Uint([0, 0, 0, 1]),
        }
    }

    pub fn stage_update(&mut self, update: StagedUpdate) {
        self.staged_updates.push(update);
    }

    pub fn staged_updates(&self) -> &[StagedUpdate] {
        &self.staged_updates
    }

    pub fn has_staged_updates_for_subresource(
        &self,
        level_gl: u32,
        layer: u32,
        layer_count: u32,
    ) -> bool {
        self.staged_updates
            .iter()
            .any(|u| u.overlaps(level_gl, layer, layer_count))
    }

    /// Flushes the updates staged for one subresource.
    ///
    /// When `deferred` is given and the only pending update is a full clear of exactly this
    /// subresource, the clear is handed to the render pass through `deferred` instead of being
    /// recorded.
    pub fn flush_single_subresource_staged_updates(
        &mut self,
        cmd: &mut dyn CommandRecorder,
        level_gl: u32,
        layer: u32,
        layer_count: u32,
        deferred: Option<(&mut DeferredClears, usize)>,
    ) {
        let (pending, rest): (Vec<StagedUpdate>, Vec<StagedUpdate>) = self
            .staged_updates
            .drain(..)
            .partition(|u| u.overlaps(level_gl, layer, layer_count));
        self.staged_updates = rest;
        if pending.is_empty() {
            return;
        }

        if let (Some((clears, index)), [update]) = (deferred, pending.as_slice()) {
            if let StagedUpdateKind::Clear(value) = update.kind {
                if update.base_layer == layer && update.layer_count == layer_count {
                    clears.store(index, update.aspects, value);
                    self.on_write(level_gl, layer, layer_count, update.aspects);
                    return;
                }
            }
        }

        let level_vk = self.to_vk_level(level_gl);
        if self.current_layout != ImageLayout::TransferDst {
            cmd.image_barrier(ImageBarrier {
                image: self.handle,
                aspects: self.aspects(),
                base_level: level_vk,
                level_count: 1,
                base_layer: layer,
                layer_count,
                old_layout: self.current_layout,
                new_layout: ImageLayout::TransferDst,
                src_stages: PipelineStages::TOP_OF_PIPE,
                src_access: Access::empty(),
                dst_stages: PipelineStages::TRANSFER,
                dst_access: Access::TRANSFER_WRITE,
            });
            self.current_layout = ImageLayout::TransferDst;
        }

        for update in pending {
            match update.kind {
                StagedUpdateKind::Clear(value) | StagedUpdateKind::ClearEmulatedChannels(value) => {
                    cmd.clear_image(
                        self.handle,
                        update.aspects,
                        level_vk,
                        update.base_layer,
                        update.layer_count,
                        value,
                    );
                }
                StagedUpdateKind::Buffer { buffer, copy } => {
                    cmd.copy_buffer_to_image(buffer, self.handle, ImageLayout::TransferDst, copy);
                }
            }
            self.on_write(level_gl, update.base_layer, update.layer_count, update.aspects);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ViewKey {
    Draw {
        level: u32,
        layer: u32,
        layer_count: u32,
    },
    DepthOrStencil {
        level: u32,
        layer: u32,
        layer_count: u32,
        aspect: ImageAspects,
    },
}

/// Identifies the exact subresource range a view covers, for framebuffer and descriptor caching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSubresourceSerial {
    pub view_serial: u64,
    pub level: u32,
    pub level_count: u32,
    pub layer: u32,
    pub layer_count: u32,
}

/// Lazily created views into a single image.
#[derive(Debug)]
pub struct ImageViewHelper {
    serial: u64,
    views: HashMap<ViewKey, ImageViewHandle>,
    copy_view: Option<ImageViewHandle>,
}

impl ImageViewHelper {
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            views: HashMap::new(),
            copy_view: None,
        }
    }

    pub fn into_shared(self) -> SharedImageViews {
        Rc::new(RefCell::new(self))
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn copy_image_view(&self) -> Option<ImageViewHandle> {
        self.copy_view
    }

    pub fn set_copy_image_view(&mut self, view: Option<ImageViewHandle>) {
        self.copy_view = view;
    }

    pub fn subresource_serial(
        &self,
        level_gl: u32,
        level_count: u32,
        layer: u32,
        layer_count: u32,
    ) -> ImageSubresourceSerial {
        ImageSubresourceSerial {
            view_serial: self.serial,
            level: level_gl,
            level_count,
            layer,
            layer_count,
        }
    }

    /// View of `layer_count` layers of one level.
    pub fn level_draw_image_view(
        &mut self,
        device: &mut dyn Device,
        image: &ImageHelper,
        level_vk: u32,
        layer: u32,
        layer_count: u32,
    ) -> Result<ImageViewHandle, BackendError> {
        let key = ViewKey::Draw {
            level: level_vk,
            layer,
            layer_count,
        };
        self.get_or_create(device, key, || {
            view_desc(image, level_vk, layer, layer_count, wgpu::TextureAspect::All)
        })
    }

    /// Single-layer 2D view of one level.
    pub fn level_layer_draw_image_view(
        &mut self,
        device: &mut dyn Device,
        image: &ImageHelper,
        level_vk: u32,
        layer: u32,
    ) -> Result<ImageViewHandle, BackendError> {
        self.level_draw_image_view(device, image, level_vk, layer, 1)
    }

    pub fn level_depth_or_stencil_image_view(
        &mut self,
        device: &mut dyn Device,
        image: &ImageHelper,
        level_vk: u32,
        layer: u32,
        layer_count: u32,
        aspect: ImageAspects,
    ) -> Result<ImageViewHandle, BackendError> {
        let key = ViewKey::DepthOrStencil {
            level: level_vk,
            layer,
            layer_count,
            aspect,
        };
        let texture_aspect = if aspect == ImageAspects::DEPTH {
            wgpu::TextureAspect::DepthOnly
        } else {
            wgpu::TextureAspect::StencilOnly
        };
        self.get_or_create(device, key, || {
            view_desc(image, level_vk, layer, layer_count, texture_aspect)
        })
    }

    pub fn level_layer_depth_or_stencil_image_view(
        &mut self,
        device: &mut dyn Device,
        image: &ImageHelper,
        level_vk: u32,
        layer: u32,
        aspect: ImageAspects,
    ) -> Result<ImageViewHandle, BackendError> {
        self.level_depth_or_stencil_image_view(device, image, level_vk, layer, 1, aspect)
    }

    fn get_or_create(
        &mut self,
        device: &mut dyn Device,
        key: ViewKey,
        desc: impl FnOnce() -> ImageViewDesc,
    ) -> Result<ImageViewHandle, BackendError> {
        if let Some(view) = self.views.get(&key) {
            return Ok(*view);
        }
        let view = device.create_image_view(&desc())?;
        self.views.insert(key, view);
        Ok(view)
    }

    pub fn release(&mut self) {
        self.views.clear();
        self.copy_view = None;
    }
}

/// Description of a view over `layer_count` layers of one level of `image`.
pub(crate) fn view_desc(
    image: &ImageHelper,
    level_vk: u32,
    layer: u32,
    layer_count: u32,
    aspect: wgpu::TextureAspect,
) -> ImageViewDesc {
    let dimension = match (image.image_type(), layer_count) {
        (ImageType::D3, 1) => wgpu::TextureViewDimension::D2,
        (ImageType::D3, _) => wgpu::TextureViewDimension::D3,
        (ImageType::D2, 1) => wgpu::TextureViewDimension::D2,
        (ImageType::D2, _) => wgpu::TextureViewDimension::D2Array,
    };
    ImageViewDesc {
        image: image.handle(),
        dimension,
        format: format::texture_format(image.actual_format()),
        aspect,
        base_level: level_vk,
        level_count: 1,
        base_layer: layer,
        layer_count,
    }
}

/// A sub-range of a backend buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHelper {
    pub handle: BufferHandle,
    pub offset: u64,
    pub size: u64,
}

impl BufferHelper {
    pub fn new(handle: BufferHandle, offset: u64, size: u64) -> Self {
        Self {
            handle,
            offset,
            size,
        }
    }
}
