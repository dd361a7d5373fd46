//! Backend delegate contract for [`crate::Texture`].
//!
//! The front-end owns the logical state; a `TextureImpl` performs the native work. Every method
//! returns `anyhow::Result` so backends can attach their own error context; the front-end wraps
//! failures in [`crate::TextureError::Backend`] and stops the compound operation.

use crate::buffer::Buffer;
use crate::caps::ContextState;
use crate::format::Format;
use crate::image_desc::InitState;
use crate::image_index::{Box3D, Extents, ImageIndex, Offset, Rectangle, TextureTarget, TextureType};
use crate::texture::{DirtyBits, EglImageId, SurfaceId, Texture, TextureId};

/// Pixel store parameters for uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelUnpackState {
    pub alignment: u32,
    pub row_length: u32,
    pub image_height: u32,
    pub skip_pixels: u32,
    pub skip_rows: u32,
    pub skip_images: u32,
}

impl Default for PixelUnpackState {
    fn default() -> Self {
        Self {
            alignment: 4,
            row_length: 0,
            image_height: 0,
            skip_pixels: 0,
            skip_rows: 0,
            skip_images: 0,
        }
    }
}

/// Source pixels of an upload. `None` defines storage without contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelSource<'a> {
    pub unpack_buffer: Option<&'a Buffer>,
    pub pixels: Option<&'a [u8]>,
}

impl PixelSource<'_> {
    pub const EMPTY: PixelSource<'static> = PixelSource {
        unpack_buffer: None,
        pixels: None,
    };

    pub fn has_data(&self) -> bool {
        self.unpack_buffer.is_some() || self.pixels.is_some()
    }
}

/// The read side of a framebuffer used by `copy_image`/`copy_sub_image`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramebufferSource {
    pub read_attachment_size: Extents,
    /// Texture backing the read attachment, when it is a texture.
    pub read_texture: Option<TextureId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyTextureOptions {
    pub flip_y: bool,
    pub premultiply_alpha: bool,
    pub unmultiply_alpha: bool,
}

/// Region of a `CopyImageSubData` between two textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyRegion {
    pub src_level: u32,
    pub src_offset: Offset,
    pub dst_level: u32,
    pub dst_offset: Offset,
    pub extents: Extents,
}

/// A presentation surface bound with `eglBindTexImage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceBinding {
    pub id: SurfaceId,
    pub size: Extents,
    pub format: Format,
    pub has_protected_content: bool,
}

/// Frame description acquired from an external stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: Format,
}

/// An EGL image this texture is redefined from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EglImageSource {
    pub id: EglImageId,
    pub extents: Extents,
    pub format: Format,
    pub level_count: u32,
    pub init_state: InitState,
    pub has_protected_content: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryObjectId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalMemory {
    pub memory: MemoryObjectId,
    pub offset: u64,
    pub create_flags: u32,
    pub usage_flags: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageAttrib {
    /// `GL_SURFACE_COMPRESSION_EXT`; `None` requests the default rate.
    SurfaceCompression(Option<u32>),
}

/// Why state is being synced to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncSource {
    Draw,
    Dispatch,
    GenerateMipmap,
    Blit,
    CopyImage,
    ReadPixels,
    Other,
}

#[allow(clippy::too_many_arguments)]
pub trait TextureImpl {
    fn set_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        format: Format,
        size: Extents,
        unpack: &PixelUnpackState,
        source: PixelSource<'_>,
    ) -> anyhow::Result<()>;

    fn set_sub_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        area: &Box3D,
        format: Format,
        unpack: &PixelUnpackState,
        source: PixelSource<'_>,
    ) -> anyhow::Result<()>;

    fn set_compressed_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        format: Format,
        size: Extents,
        unpack: &PixelUnpackState,
        source: PixelSource<'_>,
    ) -> anyhow::Result<()>;

    fn set_compressed_sub_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        area: &Box3D,
        format: Format,
        unpack: &PixelUnpackState,
        source: PixelSource<'_>,
    ) -> anyhow::Result<()>;

    fn copy_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        source_area: &Rectangle,
        format: Format,
        source: &FramebufferSource,
    ) -> anyhow::Result<()>;

    fn copy_sub_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        dest_offset: Offset,
        source_area: &Rectangle,
        source: &FramebufferSource,
    ) -> anyhow::Result<()>;

    fn copy_texture(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        format: Format,
        source_level: u32,
        options: CopyTextureOptions,
        source: &Texture,
    ) -> anyhow::Result<()>;

    fn copy_sub_texture(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        dest_offset: Offset,
        source_level: u32,
        source_box: &Box3D,
        options: CopyTextureOptions,
        source: &Texture,
    ) -> anyhow::Result<()>;

    fn copy_compressed_texture(
        &mut self,
        ctx: &ContextState,
        source: &Texture,
    ) -> anyhow::Result<()>;

    fn copy_texture_sub_data(
        &mut self,
        ctx: &ContextState,
        source: &Texture,
        region: &CopyRegion,
    ) -> anyhow::Result<()>;

    fn set_storage(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
    ) -> anyhow::Result<()>;

    fn set_storage_multisample(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        samples: u32,
        format: Format,
        size: Extents,
        fixed_sample_locations: bool,
    ) -> anyhow::Result<()>;

    fn set_storage_external_memory(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
        memory: &ExternalMemory,
    ) -> anyhow::Result<()>;

    fn set_storage_attribs(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
        attribs: &[StorageAttrib],
    ) -> anyhow::Result<()>;

    fn set_image_external(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        format: Format,
        size: Extents,
    ) -> anyhow::Result<()>;

    /// `None` releases the current stream frame.
    fn set_image_from_stream(
        &mut self,
        ctx: &ContextState,
        desc: Option<&StreamImageDesc>,
    ) -> anyhow::Result<()>;

    fn set_egl_image_target(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        image: &EglImageSource,
    ) -> anyhow::Result<()>;

    fn set_buffer(&mut self, ctx: &ContextState, format: Format) -> anyhow::Result<()>;

    fn generate_mipmap(&mut self, ctx: &ContextState) -> anyhow::Result<()>;

    fn clear_image(
        &mut self,
        ctx: &ContextState,
        level: u32,
        data: Option<&[u8]>,
    ) -> anyhow::Result<()>;

    fn clear_sub_image(
        &mut self,
        ctx: &ContextState,
        level: u32,
        area: &Box3D,
        data: Option<&[u8]>,
    ) -> anyhow::Result<()>;

    fn bind_tex_image(
        &mut self,
        ctx: &ContextState,
        surface: &SurfaceBinding,
    ) -> anyhow::Result<()>;

    fn release_tex_image(&mut self, ctx: &ContextState) -> anyhow::Result<()>;

    /// Breaks aliasing with EGL images before storage is redefined.
    fn orphan_images(&mut self, ctx: &ContextState, images: &[EglImageId]) -> anyhow::Result<()>;

    fn set_base_level(&mut self, ctx: &ContextState, base_level: u32) -> anyhow::Result<()>;

    fn sync_state(
        &mut self,
        ctx: &ContextState,
        dirty_bits: DirtyBits,
        source: SyncSource,
    ) -> anyhow::Result<()>;

    /// Zero-fills `index` for robust resource initialization.
    fn initialize_contents(&mut self, ctx: &ContextState, index: &ImageIndex) -> anyhow::Result<()>;

    fn on_destroy(&mut self, ctx: &ContextState);

    /// Backend-reported allocation size; `0` defers to the front-end's accounting.
    fn memory_size(&self) -> u64 {
        0
    }

    fn level_memory_size(&self, _target: TextureTarget, _level: u32) -> u64 {
        0
    }
}
