#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use aero_gles_texture::caps::{ClientVersion, ContextId, ContextState};
use aero_gles_texture::texture::EglImageId;
use aero_gles_texture::texture_impl::{
    CopyRegion, CopyTextureOptions, EglImageSource, ExternalMemory, FramebufferSource,
    PixelSource, PixelUnpackState, StorageAttrib, StreamImageDesc, SurfaceBinding, SyncSource,
    TextureImpl,
};
use aero_gles_texture::{
    Box3D, DirtyBits, Extents, Format, ImageIndex, Observer, Offset, Rectangle, SubjectIndex,
    SubjectMessage, Texture, TextureTarget, TextureType,
};
use anyhow::bail;

/// Backend calls in the order the front-end issued them.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetImage { index: ImageIndex, size: Extents },
    SetSubImage { index: ImageIndex, area: Box3D },
    SetCompressedImage { index: ImageIndex, size: Extents },
    SetCompressedSubImage { index: ImageIndex },
    CopyImage { index: ImageIndex },
    CopySubImage { index: ImageIndex, dest_offset: Offset },
    CopyTexture { index: ImageIndex, source_level: u32 },
    CopySubTexture { index: ImageIndex },
    CopyCompressedTexture,
    CopyTextureSubData,
    SetStorage { levels: u32, size: Extents },
    SetStorageMultisample { samples: u32 },
    SetStorageExternalMemory { levels: u32 },
    SetStorageAttribs { levels: u32 },
    SetImageExternal { index: ImageIndex },
    SetImageFromStream { acquired: bool },
    SetEglImageTarget { levels: u32 },
    SetBuffer,
    GenerateMipmap,
    ClearImage { level: u32 },
    ClearSubImage { level: u32 },
    BindTexImage,
    ReleaseTexImage,
    OrphanImages(Vec<EglImageId>),
    SetBaseLevel(u32),
    SyncState(DirtyBits, SyncSource),
    InitializeContents(ImageIndex),
    Destroy,
}

impl Call {
    fn op(&self) -> &'static str {
        match self {
            Call::SetImage { .. } => "set_image",
            Call::SetSubImage { .. } => "set_sub_image",
            Call::SetCompressedImage { .. } => "set_compressed_image",
            Call::SetCompressedSubImage { .. } => "set_compressed_sub_image",
            Call::CopyImage { .. } => "copy_image",
            Call::CopySubImage { .. } => "copy_sub_image",
            Call::CopyTexture { .. } => "copy_texture",
            Call::CopySubTexture { .. } => "copy_sub_texture",
            Call::CopyCompressedTexture => "copy_compressed_texture",
            Call::CopyTextureSubData => "copy_texture_sub_data",
            Call::SetStorage { .. } => "set_storage",
            Call::SetStorageMultisample { .. } => "set_storage_multisample",
            Call::SetStorageExternalMemory { .. } => "set_storage_external_memory",
            Call::SetStorageAttribs { .. } => "set_storage_attribs",
            Call::SetImageExternal { .. } => "set_image_external",
            Call::SetImageFromStream { .. } => "set_image_from_stream",
            Call::SetEglImageTarget { .. } => "set_egl_image_target",
            Call::SetBuffer => "set_buffer",
            Call::GenerateMipmap => "generate_mipmap",
            Call::ClearImage { .. } => "clear_image",
            Call::ClearSubImage { .. } => "clear_sub_image",
            Call::BindTexImage => "bind_tex_image",
            Call::ReleaseTexImage => "release_tex_image",
            Call::OrphanImages(_) => "orphan_images",
            Call::SetBaseLevel(_) => "set_base_level",
            Call::SyncState(..) => "sync_state",
            Call::InitializeContents(_) => "initialize_contents",
            Call::Destroy => "on_destroy",
        }
    }
}

/// Shared view of a [`MockTextureImpl`] that outlives the boxed backend.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Rc<RefCell<Vec<Call>>>,
    fail_on: Rc<Cell<Option<&'static str>>>,
    memory_size: Rc<Cell<u64>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> Box<dyn TextureImpl> {
        Box::new(MockTextureImpl {
            recorder: self.clone(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(Call::op).collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Makes the next call to `op` (and every later one) fail.
    pub fn fail_on(&self, op: &'static str) {
        self.fail_on.set(Some(op));
    }

    pub fn set_memory_size(&self, bytes: u64) {
        self.memory_size.set(bytes);
    }

    fn record(&self, call: Call) -> anyhow::Result<()> {
        let op = call.op();
        if self.fail_on.get() == Some(op) {
            bail!("injected {op} failure");
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

pub struct MockTextureImpl {
    recorder: Recorder,
}

impl TextureImpl for MockTextureImpl {
    fn set_image(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _format: Format,
        size: Extents,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetImage { index: *index, size })
    }

    fn set_sub_image(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        area: &Box3D,
        _format: Format,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetSubImage {
            index: *index,
            area: *area,
        })
    }

    fn set_compressed_image(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _format: Format,
        size: Extents,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> anyhow::Result<()> {
        self.recorder
            .record(Call::SetCompressedImage { index: *index, size })
    }

    fn set_compressed_sub_image(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _area: &Box3D,
        _format: Format,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> anyhow::Result<()> {
        self.recorder
            .record(Call::SetCompressedSubImage { index: *index })
    }

    fn copy_image(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _source_area: &Rectangle,
        _format: Format,
        _source: &FramebufferSource,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::CopyImage { index: *index })
    }

    fn copy_sub_image(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        dest_offset: Offset,
        _source_area: &Rectangle,
        _source: &FramebufferSource,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::CopySubImage {
            index: *index,
            dest_offset,
        })
    }

    fn copy_texture(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _format: Format,
        source_level: u32,
        _options: CopyTextureOptions,
        _source: &Texture,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::CopyTexture {
            index: *index,
            source_level,
        })
    }

    fn copy_sub_texture(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _dest_offset: Offset,
        _source_level: u32,
        _source_box: &Box3D,
        _options: CopyTextureOptions,
        _source: &Texture,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::CopySubTexture { index: *index })
    }

    fn copy_compressed_texture(
        &mut self,
        _ctx: &ContextState,
        _source: &Texture,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::CopyCompressedTexture)
    }

    fn copy_texture_sub_data(
        &mut self,
        _ctx: &ContextState,
        _source: &Texture,
        _region: &CopyRegion,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::CopyTextureSubData)
    }

    fn set_storage(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        levels: u32,
        _format: Format,
        size: Extents,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetStorage { levels, size })
    }

    fn set_storage_multisample(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        samples: u32,
        _format: Format,
        _size: Extents,
        _fixed_sample_locations: bool,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetStorageMultisample { samples })
    }

    fn set_storage_external_memory(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        levels: u32,
        _format: Format,
        _size: Extents,
        _memory: &ExternalMemory,
    ) -> anyhow::Result<()> {
        self.recorder
            .record(Call::SetStorageExternalMemory { levels })
    }

    fn set_storage_attribs(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        levels: u32,
        _format: Format,
        _size: Extents,
        _attribs: &[StorageAttrib],
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetStorageAttribs { levels })
    }

    fn set_image_external(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
        _format: Format,
        _size: Extents,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetImageExternal { index: *index })
    }

    fn set_image_from_stream(
        &mut self,
        _ctx: &ContextState,
        desc: Option<&StreamImageDesc>,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetImageFromStream {
            acquired: desc.is_some(),
        })
    }

    fn set_egl_image_target(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        image: &EglImageSource,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SetEglImageTarget {
            levels: image.level_count,
        })
    }

    fn set_buffer(&mut self, _ctx: &ContextState, _format: Format) -> anyhow::Result<()> {
        self.recorder.record(Call::SetBuffer)
    }

    fn generate_mipmap(&mut self, _ctx: &ContextState) -> anyhow::Result<()> {
        self.recorder.record(Call::GenerateMipmap)
    }

    fn clear_image(
        &mut self,
        _ctx: &ContextState,
        level: u32,
        _data: Option<&[u8]>,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::ClearImage { level })
    }

    fn clear_sub_image(
        &mut self,
        _ctx: &ContextState,
        level: u32,
        _area: &Box3D,
        _data: Option<&[u8]>,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::ClearSubImage { level })
    }

    fn bind_tex_image(
        &mut self,
        _ctx: &ContextState,
        _surface: &SurfaceBinding,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::BindTexImage)
    }

    fn release_tex_image(&mut self, _ctx: &ContextState) -> anyhow::Result<()> {
        self.recorder.record(Call::ReleaseTexImage)
    }

    fn orphan_images(&mut self, _ctx: &ContextState, images: &[EglImageId]) -> anyhow::Result<()> {
        self.recorder.record(Call::OrphanImages(images.to_vec()))
    }

    fn set_base_level(&mut self, _ctx: &ContextState, base_level: u32) -> anyhow::Result<()> {
        self.recorder.record(Call::SetBaseLevel(base_level))
    }

    fn sync_state(
        &mut self,
        _ctx: &ContextState,
        dirty_bits: DirtyBits,
        source: SyncSource,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::SyncState(dirty_bits, source))
    }

    fn initialize_contents(
        &mut self,
        _ctx: &ContextState,
        index: &ImageIndex,
    ) -> anyhow::Result<()> {
        self.recorder.record(Call::InitializeContents(*index))
    }

    fn on_destroy(&mut self, _ctx: &ContextState) {
        let _ = self.recorder.record(Call::Destroy);
    }

    fn memory_size(&self) -> u64 {
        self.recorder.memory_size.get()
    }

    fn level_memory_size(&self, _target: TextureTarget, _level: u32) -> u64 {
        0
    }
}

/// Observer that records every message a texture sends.
#[derive(Default)]
pub struct MessageLog {
    pub messages: Vec<(SubjectIndex, SubjectMessage)>,
}

impl Observer for MessageLog {
    fn on_subject_state_change(&mut self, index: SubjectIndex, message: SubjectMessage) {
        self.messages.push((index, message));
    }
}

pub fn ctx() -> ContextState {
    ContextState::new(ContextId(1), ClientVersion::ES_3_0).with_robust_resource_init(false)
}

pub fn robust_ctx() -> ContextState {
    ContextState::new(ContextId(1), ClientVersion::ES_3_0).with_robust_resource_init(true)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}
