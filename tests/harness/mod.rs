#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use aero_gles_texture::caps::ContextState;
use aero_gles_texture::texture::EglImageId;
use aero_gles_texture::texture_impl::{
    CopyRegion, CopyTextureOptions, EglImageSource, ExternalMemory, FramebufferSource,
    PixelSource, PixelUnpackState, StorageAttrib, StreamImageDesc, SurfaceBinding, SyncSource,
    TextureImpl,
};
use aero_gles_texture::{
    Box3D, DirtyBits, Extents, Format, ImageIndex, Offset, Rectangle, Texture, TextureType,
};
use aero_gles_utils::hal::recording::{RecordingCommands, RecordingDevice};
use aero_gles_utils::hal::{ClearValue, Features, ImageAspects, ImageHandle};
use aero_gles_utils::image::{ImageHelper, ImageType};
use aero_gles_utils::utils::params::ClearTextureParameters;
use aero_gles_utils::{UtilsConfig, UtilsEngine};
use anyhow::{bail, Context, Result};

/// Device, command stream and engine of one context, shared by the textures created in it.
pub struct Gpu {
    pub device: RecordingDevice,
    pub cmd: RecordingCommands,
    pub engine: UtilsEngine,
    /// Image of the single texture the tests drive.
    pub image: Option<ImageHelper>,
    next_image: u32,
}

pub type SharedGpu = Rc<RefCell<Gpu>>;

impl Gpu {
    pub fn new(features: Features, config: UtilsConfig) -> SharedGpu {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
        Rc::new(RefCell::new(Gpu {
            device: RecordingDevice::new(features),
            cmd: RecordingCommands::new(),
            engine: UtilsEngine::new(config),
            image: None,
            next_image: 1,
        }))
    }

    fn clear_level(&mut self, level: u32, layer: u32, value: ClearValue) -> Result<()> {
        let Gpu {
            device,
            cmd,
            engine,
            image,
            ..
        } = self;
        let image = image.as_mut().context("texture has no storage")?;
        let aspects = image.aspects();
        engine.clear_texture(
            device,
            cmd,
            image,
            &ClearTextureParameters {
                aspects,
                level,
                layer,
                clear_value: value,
            },
        )?;
        Ok(())
    }
}

/// Texture backend realizing storage, clears, robust initialization and mipmap generation with
/// the utility engine. Everything else is rejected.
pub struct GpuTexture {
    gpu: SharedGpu,
}

impl GpuTexture {
    pub fn new(gpu: &SharedGpu) -> Box<dyn TextureImpl> {
        Box::new(GpuTexture { gpu: gpu.clone() })
    }
}

fn unsupported<T>(what: &str) -> Result<T> {
    bail!("{what} is not realized by the GPU texture backend")
}

/// RGBA8 clear data, zeros when absent.
fn clear_value(data: Option<&[u8]>) -> ClearValue {
    let mut rgba = [0.0; 4];
    if let Some(data) = data {
        for (channel, byte) in rgba.iter_mut().zip(data) {
            *channel = f32::from(*byte) / 255.0;
        }
    }
    ClearValue::Float(rgba)
}

impl TextureImpl for GpuTexture {
    fn set_image(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _format: Format,
        _size: Extents,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> Result<()> {
        unsupported("set_image")
    }

    fn set_sub_image(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _area: &Box3D,
        _format: Format,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> Result<()> {
        unsupported("set_sub_image")
    }

    fn set_compressed_image(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _format: Format,
        _size: Extents,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> Result<()> {
        unsupported("set_compressed_image")
    }

    fn set_compressed_sub_image(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _area: &Box3D,
        _format: Format,
        _unpack: &PixelUnpackState,
        _source: PixelSource<'_>,
    ) -> Result<()> {
        unsupported("set_compressed_sub_image")
    }

    fn copy_image(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _source_area: &Rectangle,
        _format: Format,
        _source: &FramebufferSource,
    ) -> Result<()> {
        unsupported("copy_image")
    }

    fn copy_sub_image(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _dest_offset: Offset,
        _source_area: &Rectangle,
        _source: &FramebufferSource,
    ) -> Result<()> {
        unsupported("copy_sub_image")
    }

    fn copy_texture(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _format: Format,
        _source_level: u32,
        _options: CopyTextureOptions,
        _source: &Texture,
    ) -> Result<()> {
        unsupported("copy_texture")
    }

    fn copy_sub_texture(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _dest_offset: Offset,
        _source_level: u32,
        _source_box: &Box3D,
        _options: CopyTextureOptions,
        _source: &Texture,
    ) -> Result<()> {
        unsupported("copy_sub_texture")
    }

    fn copy_compressed_texture(&mut self, _ctx: &ContextState, _source: &Texture) -> Result<()> {
        unsupported("copy_compressed_texture")
    }

    fn copy_texture_sub_data(
        &mut self,
        _ctx: &ContextState,
        _source: &Texture,
        _region: &CopyRegion,
    ) -> Result<()> {
        unsupported("copy_texture_sub_data")
    }

    fn set_storage(
        &mut self,
        _ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
    ) -> Result<()> {
        let (image_type, layers) = match texture_type {
            TextureType::D2 => (ImageType::D2, 1),
            TextureType::D2Array => (ImageType::D2, size.depth),
            TextureType::CubeMap => (ImageType::D2, 6),
            TextureType::D3 => (ImageType::D3, 1),
            other => return unsupported(&format!("{other:?} storage")),
        };
        let mut gpu = self.gpu.borrow_mut();
        let handle = ImageHandle(gpu.next_image);
        gpu.next_image += 1;
        let depth = if image_type == ImageType::D3 {
            size.depth
        } else {
            1
        };
        gpu.image = Some(ImageHelper::new(
            handle,
            image_type,
            format.sized_internal_format(),
            Extents::new(size.width, size.height, depth),
            0,
            levels,
            layers,
            1,
        ));
        Ok(())
    }

    fn set_storage_multisample(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        _samples: u32,
        _format: Format,
        _size: Extents,
        _fixed_sample_locations: bool,
    ) -> Result<()> {
        unsupported("set_storage_multisample")
    }

    fn set_storage_external_memory(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        _levels: u32,
        _format: Format,
        _size: Extents,
        _memory: &ExternalMemory,
    ) -> Result<()> {
        unsupported("set_storage_external_memory")
    }

    fn set_storage_attribs(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        _levels: u32,
        _format: Format,
        _size: Extents,
        _attribs: &[StorageAttrib],
    ) -> Result<()> {
        unsupported("set_storage_attribs")
    }

    fn set_image_external(
        &mut self,
        _ctx: &ContextState,
        _index: &ImageIndex,
        _format: Format,
        _size: Extents,
    ) -> Result<()> {
        unsupported("set_image_external")
    }

    fn set_image_from_stream(
        &mut self,
        _ctx: &ContextState,
        _desc: Option<&StreamImageDesc>,
    ) -> Result<()> {
        unsupported("set_image_from_stream")
    }

    fn set_egl_image_target(
        &mut self,
        _ctx: &ContextState,
        _texture_type: TextureType,
        _image: &EglImageSource,
    ) -> Result<()> {
        unsupported("set_egl_image_target")
    }

    fn set_buffer(&mut self, _ctx: &ContextState, _format: Format) -> Result<()> {
        unsupported("set_buffer")
    }

    fn generate_mipmap(&mut self, _ctx: &ContextState) -> Result<()> {
        let mut gpu = self.gpu.borrow_mut();
        let Gpu {
            device,
            cmd,
            engine,
            image,
            ..
        } = &mut *gpu;
        let image = image.as_mut().context("texture has no storage")?;
        if !engine.should_generate_mipmap_with_draw(image) {
            return unsupported("compute mipmap generation");
        }
        engine.generate_mipmap_with_draw(device, cmd, image, true)?;
        Ok(())
    }

    fn clear_image(&mut self, _ctx: &ContextState, level: u32, data: Option<&[u8]>) -> Result<()> {
        let mut gpu = self.gpu.borrow_mut();
        let layers = gpu.image.as_ref().map_or(1, ImageHelper::layer_count);
        for layer in 0..layers {
            gpu.clear_level(level, layer, clear_value(data))?;
        }
        Ok(())
    }

    fn clear_sub_image(
        &mut self,
        _ctx: &ContextState,
        _level: u32,
        _area: &Box3D,
        _data: Option<&[u8]>,
    ) -> Result<()> {
        unsupported("clear_sub_image")
    }

    fn bind_tex_image(&mut self, _ctx: &ContextState, _surface: &SurfaceBinding) -> Result<()> {
        unsupported("bind_tex_image")
    }

    fn release_tex_image(&mut self, _ctx: &ContextState) -> Result<()> {
        Ok(())
    }

    fn orphan_images(&mut self, _ctx: &ContextState, _images: &[EglImageId]) -> Result<()> {
        Ok(())
    }

    fn set_base_level(&mut self, _ctx: &ContextState, _base_level: u32) -> Result<()> {
        Ok(())
    }

    fn sync_state(
        &mut self,
        _ctx: &ContextState,
        _dirty_bits: DirtyBits,
        _source: SyncSource,
    ) -> Result<()> {
        Ok(())
    }

    fn initialize_contents(&mut self, _ctx: &ContextState, index: &ImageIndex) -> Result<()> {
        let mut gpu = self.gpu.borrow_mut();
        let depth_stencil = gpu
            .image
            .as_ref()
            .is_some_and(|image| !image.aspects().contains(ImageAspects::COLOR));
        let value = if depth_stencil {
            ClearValue::DepthStencil {
                depth: 1.0,
                stencil: 0,
            }
        } else {
            ClearValue::Float([0.0; 4])
        };
        let first = index.layer().unwrap_or(0);
        let count = if index.has_layer() {
            index.layer_count()
        } else {
            gpu.image.as_ref().map_or(1, ImageHelper::layer_count)
        };
        for layer in first..first + count {
            gpu.clear_level(index.level(), layer, value)?;
        }
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &ContextState) {
        self.gpu.borrow_mut().image = None;
    }
}
