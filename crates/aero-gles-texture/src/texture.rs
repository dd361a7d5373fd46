//! The texture front-end.
//!
//! [`Texture`] validates nothing (callers validate GL arguments first) but owns the mutation
//! protocol every storage change follows: release a bound surface, orphan EGL image siblings,
//! call the backend, update the image descriptions, honour the mipmap-generation hint, then
//! signal observers. A failing backend call aborts the sequence before any description changes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::buffer::Buffer;
use crate::caps::{ClientVersion, ContextId, ContextState};
use crate::error::{delegate, TextureError};
use crate::format::Format;
use crate::image_desc::{ImageDesc, InitState};
use crate::image_index::{
    Box3D, Extents, ImageIndex, Offset, Rectangle, TextureTarget, TextureType,
    IMPLEMENTATION_MAX_TEXTURE_LEVELS,
};
use crate::observer::{Observer, ObserverRef, Subject, SubjectIndex, SubjectMessage};
use crate::sampler::{
    ColorGeneric, CompareFunc, CompareMode, MagFilter, MinFilter, SamplerState, SrgbDecode,
    SrgbOverride, SwizzleComponent, WrapMode,
};
use crate::texture_impl::{
    CopyRegion, CopyTextureOptions, EglImageSource, ExternalMemory, FramebufferSource,
    PixelSource, PixelUnpackState, StorageAttrib, StreamImageDesc, SurfaceBinding, SyncSource,
    TextureImpl,
};
use crate::texture_state::{
    AstcDecodePrecision, DepthStencilMode, FocalPoint, FoveationState, SamplerFormat,
    TextureState, TextureUsage, TilingMode,
};

bitflags! {
    /// State the backend has not seen yet.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyBits: u64 {
        const SWIZZLE_RED = 1 << 0;
        const SWIZZLE_GREEN = 1 << 1;
        const SWIZZLE_BLUE = 1 << 2;
        const SWIZZLE_ALPHA = 1 << 3;
        const SRGB_OVERRIDE = 1 << 4;
        const SRGB_DECODE = 1 << 5;
        const MIN_FILTER = 1 << 6;
        const MAG_FILTER = 1 << 7;
        const WRAP_S = 1 << 8;
        const WRAP_T = 1 << 9;
        const WRAP_R = 1 << 10;
        const MAX_ANISOTROPY = 1 << 11;
        const MIN_LOD = 1 << 12;
        const MAX_LOD = 1 << 13;
        const COMPARE_MODE = 1 << 14;
        const COMPARE_FUNC = 1 << 15;
        const BORDER_COLOR = 1 << 16;
        const BASE_LEVEL = 1 << 17;
        const MAX_LEVEL = 1 << 18;
        const DEPTH_STENCIL_TEXTURE_MODE = 1 << 19;
        const RENDERABILITY_VALIDATION = 1 << 20;
        const USAGE = 1 << 21;
        const LABEL = 1 << 22;
        const ASTC_DECODE_PRECISION = 1 << 23;
        const BOUND_AS_IMAGE = 1 << 24;
        const BOUND_AS_ATTACHMENT = 1 << 25;
        const BOUND_TO_MSRTT_FRAMEBUFFER = 1 << 26;
        const IMPLEMENTATION = 1 << 27;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EglImageId(pub u32);

/// Identifies one framebuffer attachment binding of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferSerial(pub u64);

#[derive(Clone, Debug)]
struct CompletenessCache {
    /// `None` until computed, and after any invalidation.
    context: Option<ContextId>,
    sampler_state: SamplerState,
    sampler_complete: bool,
}

fn determine_init_state(ctx: &ContextState, source: PixelSource<'_>) -> InitState {
    if !ctx.is_robust_resource_init_enabled() || source.has_data() {
        InitState::Initialized
    } else {
        InitState::MayNeedInit
    }
}

fn box_depth(area: &Box3D) -> u32 {
    area.depth.max(0) as u32
}

pub struct Texture {
    id: TextureId,
    label: String,
    state: TextureState,
    imp: Box<dyn TextureImpl>,
    dirty_bits: DirtyBits,
    completeness_cache: CompletenessCache,
    cached_sampler_format: Option<(CompareMode, SamplerFormat)>,
    bound_surface: Option<SurfaceId>,
    bound_stream: Option<StreamId>,
    /// EGL images created from this texture.
    source_images: Vec<EglImageId>,
    /// EGL image this texture was redefined from.
    target_image: Option<EglImageId>,
    bound_framebuffer_serials: Vec<FramebufferSerial>,
    subject: Subject,
    self_observer: Option<Weak<RefCell<dyn Observer>>>,
    destroyed: bool,
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("type", &self.state.texture_type())
            .field("dirty_bits", &self.dirty_bits)
            .field("init_state", &self.state.init_state())
            .field("bound_surface", &self.bound_surface)
            .finish_non_exhaustive()
    }
}

impl Texture {
    pub fn new(id: TextureId, texture_type: TextureType, imp: Box<dyn TextureImpl>) -> Self {
        let state = TextureState::new(texture_type);
        let completeness_cache = CompletenessCache {
            context: None,
            sampler_state: state.sampler_state().clone(),
            sampler_complete: false,
        };
        Self {
            id,
            label: String::new(),
            state,
            imp,
            dirty_bits: DirtyBits::IMPLEMENTATION,
            completeness_cache,
            cached_sampler_format: None,
            bound_surface: None,
            bound_stream: None,
            source_images: Vec::new(),
            target_image: None,
            bound_framebuffer_serials: Vec::new(),
            subject: Subject::new(),
            self_observer: None,
            destroyed: false,
        }
    }

    /// A shared texture that can observe its bound buffer. Buffer textures must be created this
    /// way for resizes and writes to reach them.
    pub fn new_shared(
        id: TextureId,
        texture_type: TextureType,
        imp: Box<dyn TextureImpl>,
    ) -> Rc<RefCell<Texture>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Texture>>| {
            let mut texture = Texture::new(id, texture_type, imp);
            let observer: Weak<RefCell<dyn Observer>> = weak.clone();
            texture.self_observer = Some(observer);
            RefCell::new(texture)
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn texture_type(&self) -> TextureType {
        self.state.texture_type()
    }

    pub fn state(&self) -> &TextureState {
        &self.state
    }

    pub fn implementation(&self) -> &dyn TextureImpl {
        self.imp.as_ref()
    }

    pub fn dirty_bits(&self) -> DirtyBits {
        self.dirty_bits
    }

    pub fn has_any_dirty_bit(&self) -> bool {
        !self.dirty_bits.is_empty()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bound_surface(&self) -> Option<SurfaceId> {
        self.bound_surface
    }

    pub fn bound_stream(&self) -> Option<StreamId> {
        self.bound_stream
    }

    pub fn target_image(&self) -> Option<EglImageId> {
        self.target_image
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn add_observer(&mut self, index: SubjectIndex, observer: &ObserverRef) {
        self.subject.add_observer(index, observer);
    }

    pub fn remove_observer(&mut self, observer: &Weak<RefCell<dyn Observer>>) {
        self.subject.remove_observer(observer);
    }

    fn notify(&self, message: SubjectMessage) {
        self.subject.on_state_change(message);
    }

    fn invalidate_completeness_cache(&mut self) {
        self.completeness_cache.context = None;
    }

    fn signal_dirty_state(&mut self, bit: DirtyBits) {
        self.dirty_bits |= bit;
        self.invalidate_completeness_cache();
        self.cached_sampler_format = None;

        if bit == DirtyBits::BASE_LEVEL || bit == DirtyBits::MAX_LEVEL {
            self.notify(SubjectMessage::SubjectChanged);
        } else {
            self.notify(SubjectMessage::DirtyBitsFlagged);
        }
    }

    /// `Initialized` only holds if no description still needs initialization.
    fn signal_dirty_storage(&mut self, init_state: InitState) {
        trace!(texture = self.id.0, ?init_state, "texture storage changed");
        self.state.init_state = match init_state {
            InitState::MayNeedInit => InitState::MayNeedInit,
            InitState::Initialized => self.state.scan_init_state(),
        };
        self.invalidate_completeness_cache();
        self.cached_sampler_format = None;
        self.notify(SubjectMessage::SubjectChanged);
    }

    // Sampler parameters.

    pub fn set_swizzle_red(&mut self, swizzle: SwizzleComponent) {
        if self.state.swizzle_state.red != swizzle {
            self.state.swizzle_state.red = swizzle;
            self.signal_dirty_state(DirtyBits::SWIZZLE_RED);
        }
    }

    pub fn set_swizzle_green(&mut self, swizzle: SwizzleComponent) {
        if self.state.swizzle_state.green != swizzle {
            self.state.swizzle_state.green = swizzle;
            self.signal_dirty_state(DirtyBits::SWIZZLE_GREEN);
        }
    }

    pub fn set_swizzle_blue(&mut self, swizzle: SwizzleComponent) {
        if self.state.swizzle_state.blue != swizzle {
            self.state.swizzle_state.blue = swizzle;
            self.signal_dirty_state(DirtyBits::SWIZZLE_BLUE);
        }
    }

    pub fn set_swizzle_alpha(&mut self, swizzle: SwizzleComponent) {
        if self.state.swizzle_state.alpha != swizzle {
            self.state.swizzle_state.alpha = swizzle;
            self.signal_dirty_state(DirtyBits::SWIZZLE_ALPHA);
        }
    }

    pub fn set_min_filter(&mut self, filter: MinFilter) {
        if self.state.sampler_state.set_min_filter(filter) {
            self.signal_dirty_state(DirtyBits::MIN_FILTER);
        }
    }

    pub fn set_mag_filter(&mut self, filter: MagFilter) {
        if self.state.sampler_state.set_mag_filter(filter) {
            self.signal_dirty_state(DirtyBits::MAG_FILTER);
        }
    }

    pub fn set_wrap_s(&mut self, wrap: WrapMode) {
        if self.state.sampler_state.set_wrap_s(wrap) {
            self.signal_dirty_state(DirtyBits::WRAP_S);
        }
    }

    pub fn set_wrap_t(&mut self, wrap: WrapMode) {
        if self.state.sampler_state.set_wrap_t(wrap) {
            self.signal_dirty_state(DirtyBits::WRAP_T);
        }
    }

    pub fn set_wrap_r(&mut self, wrap: WrapMode) {
        if self.state.sampler_state.set_wrap_r(wrap) {
            self.signal_dirty_state(DirtyBits::WRAP_R);
        }
    }

    pub fn set_max_anisotropy(&mut self, max_anisotropy: f32) {
        if self.state.sampler_state.set_max_anisotropy(max_anisotropy) {
            self.signal_dirty_state(DirtyBits::MAX_ANISOTROPY);
        }
    }

    pub fn set_min_lod(&mut self, lod: f32) {
        if self.state.sampler_state.set_min_lod(lod) {
            self.signal_dirty_state(DirtyBits::MIN_LOD);
        }
    }

    pub fn set_max_lod(&mut self, lod: f32) {
        if self.state.sampler_state.set_max_lod(lod) {
            self.signal_dirty_state(DirtyBits::MAX_LOD);
        }
    }

    pub fn set_compare_mode(&mut self, mode: CompareMode) {
        if self.state.sampler_state.set_compare_mode(mode) {
            self.signal_dirty_state(DirtyBits::COMPARE_MODE);
        }
    }

    pub fn set_compare_func(&mut self, func: CompareFunc) {
        if self.state.sampler_state.set_compare_func(func) {
            self.signal_dirty_state(DirtyBits::COMPARE_FUNC);
        }
    }

    pub fn set_srgb_decode(&mut self, decode: SrgbDecode) {
        if self.state.sampler_state.set_srgb_decode(decode) {
            self.signal_dirty_state(DirtyBits::SRGB_DECODE);
        }
    }

    pub fn set_srgb_override(&mut self, srgb_override: SrgbOverride) {
        let old = self.state.srgb_override;
        self.state.srgb_override = srgb_override;
        if old != srgb_override {
            self.signal_dirty_state(DirtyBits::SRGB_OVERRIDE);
        }
    }

    pub fn set_border_color(&mut self, color: ColorGeneric) {
        self.state.sampler_state.set_border_color(color);
        self.signal_dirty_state(DirtyBits::BORDER_COLOR);
    }

    pub fn set_depth_stencil_texture_mode(&mut self, mode: DepthStencilMode) {
        if self.state.depth_stencil_mode != mode {
            self.state.depth_stencil_mode = mode;
            self.signal_dirty_state(DirtyBits::DEPTH_STENCIL_TEXTURE_MODE);
        }
    }

    pub fn set_usage(&mut self, usage: TextureUsage) {
        self.state.usage = usage;
        self.signal_dirty_state(DirtyBits::USAGE);
    }

    pub fn set_renderability_validation(&mut self, enabled: bool) {
        self.state.renderability_validation = enabled;
        self.signal_dirty_state(DirtyBits::RENDERABILITY_VALIDATION);
    }

    pub fn set_astc_decode_precision(&mut self, precision: AstcDecodePrecision) {
        if self.state.set_astc_decode_precision(precision) {
            self.signal_dirty_state(DirtyBits::ASTC_DECODE_PRECISION);
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.signal_dirty_state(DirtyBits::LABEL);
    }

    pub fn set_protected_content(&mut self, protected: bool) {
        self.state.has_protected_content = protected;
    }

    pub fn set_tiling_mode(&mut self, mode: TilingMode) {
        self.state.tiling_mode = mode;
    }

    pub fn set_crop(&mut self, rect: Rectangle) {
        self.state.set_crop(rect);
    }

    pub fn set_generate_mipmap_hint(&mut self, enabled: bool) {
        self.state.set_generate_mipmap_hint(enabled);
    }

    /// Changes `GL_TEXTURE_BASE_LEVEL`. The previous value is restored if the backend rejects
    /// the new effective base.
    pub fn set_base_level(
        &mut self,
        ctx: &ContextState,
        base_level: u32,
    ) -> Result<(), TextureError> {
        let previous = self.state.base_level();
        if !self.state.set_base_level(base_level) {
            return Ok(());
        }
        let effective = self.state.effective_base_level();
        if let Err(err) = delegate("set_base_level", self.imp.set_base_level(ctx, effective)) {
            self.state.set_base_level(previous);
            return Err(err);
        }
        self.signal_dirty_state(DirtyBits::BASE_LEVEL);
        Ok(())
    }

    pub fn set_max_level(&mut self, max_level: u32) {
        if self.state.set_max_level(max_level) {
            self.signal_dirty_state(DirtyBits::MAX_LEVEL);
        }
    }

    // Queries.

    pub fn extents(&self, target: TextureTarget, level: u32) -> Extents {
        self.state.image_desc(target, level).size
    }

    pub fn width(&self, target: TextureTarget, level: u32) -> u32 {
        self.extents(target, level).width
    }

    pub fn height(&self, target: TextureTarget, level: u32) -> u32 {
        self.extents(target, level).height
    }

    pub fn depth(&self, target: TextureTarget, level: u32) -> u32 {
        self.extents(target, level).depth
    }

    pub fn format(&self, target: TextureTarget, level: u32) -> Format {
        self.state.image_desc(target, level).format
    }

    pub fn samples(&self, target: TextureTarget, level: u32) -> u32 {
        self.state.image_desc(target, level).samples
    }

    pub fn fixed_sample_locations(&self, target: TextureTarget, level: u32) -> bool {
        self.state.image_desc(target, level).fixed_sample_locations
    }

    pub fn mipmap_max_level(&self) -> u32 {
        self.state.mipmap_max_level()
    }

    pub fn is_mipmap_complete(&self) -> bool {
        self.state.compute_mipmap_completeness()
    }

    /// Sampler completeness, cached per context and per completeness-relevant sampler state.
    /// `sampler` overrides the texture's own sampler parameters.
    pub fn is_sampler_complete(
        &mut self,
        ctx: &ContextState,
        sampler: Option<&SamplerState>,
    ) -> bool {
        let sampler = match sampler {
            Some(sampler) => sampler.clone(),
            None => self.state.sampler_state().clone(),
        };
        let cache = &self.completeness_cache;
        if cache.context != Some(ctx.id) || !cache.sampler_state.same_completeness(&sampler) {
            let complete = self.state.compute_sampler_completeness(&sampler, ctx);
            self.completeness_cache = CompletenessCache {
                context: Some(ctx.id),
                sampler_state: sampler,
                sampler_complete: complete,
            };
        }
        self.completeness_cache.sampler_complete
    }

    pub fn required_sampler_format(&mut self, sampler: &SamplerState) -> SamplerFormat {
        if let Some((compare_mode, format)) = self.cached_sampler_format {
            if compare_mode == sampler.compare_mode() {
                return format;
            }
        }
        let format = self.state.compute_required_sampler_format(sampler);
        self.cached_sampler_format = Some((sampler.compare_mode(), format));
        format
    }

    /// Bytes of storage, as reported by the backend or summed over the image descriptions.
    pub fn memory_size(&self) -> u64 {
        let reported = self.imp.memory_size();
        if reported > 0 {
            return reported;
        }
        self.state
            .image_descs()
            .iter()
            .fold(0u64, |total, desc| total.saturating_add(desc.memory_size()))
    }

    pub fn level_memory_size(&self, target: TextureTarget, level: u32) -> u64 {
        let reported = self.imp.level_memory_size(target, level);
        if reported > 0 {
            return reported;
        }
        self.state.image_desc(target, level).memory_size()
    }

    // Image definition.

    fn release_tex_image_internal(&mut self, ctx: &ContextState) -> Result<(), TextureError> {
        if self.bound_surface.is_some() {
            self.release_tex_image_from_surface(ctx)?;
        }
        Ok(())
    }

    fn orphan_images(&mut self, ctx: &ContextState) -> Result<(), TextureError> {
        let images: Vec<EglImageId> = match self.target_image {
            Some(image) => vec![image],
            None => self.source_images.clone(),
        };
        if images.is_empty() {
            return Ok(());
        }
        delegate("orphan_images", self.imp.orphan_images(ctx, &images))?;
        debug!(texture = self.id.0, ?images, "orphaned EGL image siblings");
        self.target_image = None;
        self.source_images.clear();
        Ok(())
    }

    fn handle_mipmap_generation_hint(
        &mut self,
        ctx: &ContextState,
        level: u32,
    ) -> Result<(), TextureError> {
        if self.state.generate_mipmap_hint() && level == 0 {
            self.generate_mipmap(ctx)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_image(
        &mut self,
        ctx: &ContextState,
        unpack: &PixelUnpackState,
        target: TextureTarget,
        level: u32,
        format: Format,
        size: Extents,
        source: PixelSource<'_>,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        let index = ImageIndex::from_target(target, level, size.depth);
        delegate(
            "set_image",
            self.imp.set_image(ctx, &index, format, size, unpack, source),
        )?;

        let init_state = determine_init_state(ctx, source);
        self.state
            .set_image_desc(target, level, ImageDesc::new(size, format, init_state));
        self.handle_mipmap_generation_hint(ctx, level)?;
        self.signal_dirty_storage(init_state);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_sub_image(
        &mut self,
        ctx: &ContextState,
        unpack: &PixelUnpackState,
        target: TextureTarget,
        level: u32,
        area: &Box3D,
        format: Format,
        source: PixelSource<'_>,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());
        let index = ImageIndex::from_target(target, level, box_depth(area));
        self.ensure_sub_image_initialized(ctx, &index, area)?;
        delegate(
            "set_sub_image",
            self.imp.set_sub_image(ctx, &index, area, format, unpack, source),
        )?;
        self.handle_mipmap_generation_hint(ctx, level)?;
        self.notify(SubjectMessage::ContentsChanged);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_compressed_image(
        &mut self,
        ctx: &ContextState,
        unpack: &PixelUnpackState,
        target: TextureTarget,
        level: u32,
        format: Format,
        size: Extents,
        source: PixelSource<'_>,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        let index = ImageIndex::from_target(target, level, size.depth);
        delegate(
            "set_compressed_image",
            self.imp
                .set_compressed_image(ctx, &index, format, size, unpack, source),
        )?;

        let init_state = determine_init_state(ctx, source);
        self.state
            .set_image_desc(target, level, ImageDesc::new(size, format, init_state));
        self.signal_dirty_storage(init_state);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_compressed_sub_image(
        &mut self,
        ctx: &ContextState,
        unpack: &PixelUnpackState,
        target: TextureTarget,
        level: u32,
        area: &Box3D,
        format: Format,
        source: PixelSource<'_>,
    ) -> Result<(), TextureError> {
        let index = ImageIndex::from_target(target, level, box_depth(area));
        self.ensure_sub_image_initialized(ctx, &index, area)?;
        delegate(
            "set_compressed_sub_image",
            self.imp
                .set_compressed_sub_image(ctx, &index, area, format, unpack, source),
        )?;
        self.notify(SubjectMessage::ContentsChanged);
        Ok(())
    }

    /// `glCopyTexImage2D`. Under robust resource init the copy is assumed to be clipped to the
    /// read framebuffer; the destination is created and zeroed first whenever clipping could
    /// leave texels unwritten.
    pub fn copy_image(
        &mut self,
        ctx: &ContextState,
        target: TextureTarget,
        level: u32,
        source_area: &Rectangle,
        format: Format,
        source: &FramebufferSource,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        let index = ImageIndex::from_target(target, level, 1);

        let mut dest_box = Box3D::default();
        let mut force_copy_sub_image = false;
        if ctx.is_robust_resource_init_enabled() {
            let fb_size = source.read_attachment_size;
            let fb_width = fb_size.width as i32;
            let fb_height = fb_size.height as i32;
            let out_of_bounds = source_area.x < 0
                || source_area.y < 0
                || source_area.x1() > fb_width
                || source_area.y1() > fb_height;
            force_copy_sub_image = out_of_bounds && source.read_texture != Some(self.id);

            let bounds = Rectangle::new(0, 0, fb_width, fb_height);
            if let Some(clipped) = source_area.clip(&bounds) {
                dest_box = Box3D::new(
                    clipped.x - source_area.x,
                    clipped.y - source_area.y,
                    0,
                    clipped.width,
                    clipped.height,
                    1,
                );
            }
        }

        let init_state = determine_init_state(ctx, PixelSource::EMPTY);
        let size = Extents::new(
            source_area.width.max(0) as u32,
            source_area.height.max(0) as u32,
            1,
        );

        if force_copy_sub_image || self.does_sub_image_need_init(ctx, &index, &dest_box) {
            trace!(texture = self.id.0, ?dest_box, "copy_image split into define + init + copy");
            delegate(
                "set_image",
                self.imp.set_image(
                    ctx,
                    &index,
                    format,
                    size,
                    &PixelUnpackState::default(),
                    PixelSource::EMPTY,
                ),
            )?;
            self.state
                .set_image_desc(target, level, ImageDesc::new(size, format, init_state));
            self.ensure_sub_image_initialized(ctx, &index, &dest_box)?;
            delegate(
                "copy_sub_image",
                self.imp
                    .copy_sub_image(ctx, &index, Offset::default(), source_area, source),
            )?;
        } else {
            delegate(
                "copy_image",
                self.imp.copy_image(ctx, &index, source_area, format, source),
            )?;
        }

        self.state.set_image_desc(
            target,
            level,
            ImageDesc::new(size, format, InitState::Initialized),
        );
        self.handle_mipmap_generation_hint(ctx, level)?;
        self.signal_dirty_storage(init_state);
        Ok(())
    }

    pub fn copy_sub_image(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        dest_offset: Offset,
        source_area: &Rectangle,
        source: &FramebufferSource,
    ) -> Result<(), TextureError> {
        let mut dest_box = Box3D::default();
        if ctx.is_robust_resource_init_enabled() {
            let fb_size = source.read_attachment_size;
            let bounds = Rectangle::new(0, 0, fb_size.width as i32, fb_size.height as i32);
            if let Some(clipped) = source_area.clip(&bounds) {
                dest_box = Box3D::new(
                    dest_offset.x + clipped.x - source_area.x,
                    dest_offset.y + clipped.y - source_area.y,
                    0,
                    clipped.width,
                    clipped.height,
                    1,
                );
            }
        }

        self.ensure_sub_image_initialized(ctx, index, &dest_box)?;
        delegate(
            "copy_sub_image",
            self.imp
                .copy_sub_image(ctx, index, dest_offset, source_area, source),
        )?;
        self.handle_mipmap_generation_hint(ctx, index.level())?;
        self.notify(SubjectMessage::ContentsChanged);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn copy_texture(
        &mut self,
        ctx: &ContextState,
        target: TextureTarget,
        level: u32,
        format: Format,
        source_level: u32,
        options: CopyTextureOptions,
        source: &mut Texture,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());
        debug_assert!(source.texture_type() != TextureType::CubeMap);

        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        // Source contents are read, so they must be defined.
        source.ensure_initialized(ctx)?;

        let index = ImageIndex::from_target(target, level, 1);
        delegate(
            "copy_texture",
            self.imp
                .copy_texture(ctx, &index, format, source_level, options, source),
        )?;

        let source_desc = *source
            .state
            .image_desc(source.state.texture_type().non_cube_target(), source_level);
        self.state.set_image_desc(
            target,
            level,
            ImageDesc::new(source_desc.size, format, InitState::Initialized),
        );
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn copy_sub_texture(
        &mut self,
        ctx: &ContextState,
        target: TextureTarget,
        level: u32,
        dest_offset: Offset,
        source_level: u32,
        source_box: &Box3D,
        options: CopyTextureOptions,
        source: &mut Texture,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());

        source.ensure_initialized(ctx)?;

        let dest_box = Box3D::new(
            dest_offset.x,
            dest_offset.y,
            dest_offset.z,
            source_box.width,
            source_box.height,
            source_box.depth,
        );
        let index = ImageIndex::from_target(target, level, box_depth(source_box));
        self.ensure_sub_image_initialized(ctx, &index, &dest_box)?;

        delegate(
            "copy_sub_texture",
            self.imp.copy_sub_texture(
                ctx,
                &index,
                dest_offset,
                source_level,
                source_box,
                options,
                source,
            ),
        )?;
        self.notify(SubjectMessage::ContentsChanged);
        Ok(())
    }

    /// Replaces level 0 with a copy of `source`'s compressed level 0.
    pub fn copy_compressed_texture(
        &mut self,
        ctx: &ContextState,
        source: &Texture,
    ) -> Result<(), TextureError> {
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        delegate(
            "copy_compressed_texture",
            self.imp.copy_compressed_texture(ctx, source),
        )?;

        let source_target = source.state.texture_type().non_cube_target();
        let desc = *source.state.image_desc(source_target, 0);
        self.state
            .set_image_desc(self.state.texture_type().non_cube_target(), 0, desc);
        self.signal_dirty_storage(desc.init_state);
        Ok(())
    }

    /// `glCopyImageSubData` with this texture as the destination.
    pub fn copy_texture_sub_data(
        &mut self,
        ctx: &ContextState,
        source: &Texture,
        region: &CopyRegion,
    ) -> Result<(), TextureError> {
        delegate(
            "copy_texture_sub_data",
            self.imp.copy_texture_sub_data(ctx, source, region),
        )?;
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    // Immutable storage.

    fn begin_immutable_storage(&mut self, levels: u32) {
        self.state.immutable_format = true;
        self.state.immutable_levels = levels;
        self.state.clear_image_descs();
    }

    fn end_immutable_storage(&mut self, init_state: InitState) {
        self.dirty_bits |= DirtyBits::BASE_LEVEL | DirtyBits::MAX_LEVEL;
        self.signal_dirty_storage(init_state);
    }

    pub fn set_storage(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(texture_type, self.state.texture_type());
        debug_assert!(levels >= 1);
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        delegate(
            "set_storage",
            self.imp.set_storage(ctx, texture_type, levels, format, size),
        )?;

        let init_state = determine_init_state(ctx, PixelSource::EMPTY);
        self.begin_immutable_storage(levels);
        self.state
            .set_image_desc_chain(0, levels - 1, size, format, init_state);
        debug!(texture = self.id.0, ?texture_type, levels, ?size, "immutable storage defined");
        self.end_immutable_storage(init_state);
        Ok(())
    }

    /// Sample count is rounded to the nearest supported count, never below the request.
    pub fn set_storage_multisample(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        samples: u32,
        format: Format,
        size: Extents,
        fixed_sample_locations: bool,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(texture_type, self.state.texture_type());
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        let samples = ctx.sample_counts.nearest(samples);
        delegate(
            "set_storage_multisample",
            self.imp.set_storage_multisample(
                ctx,
                texture_type,
                samples,
                format,
                size,
                fixed_sample_locations,
            ),
        )?;

        let init_state = determine_init_state(ctx, PixelSource::EMPTY);
        self.begin_immutable_storage(1);
        self.state.set_image_desc_chain_multisample(
            size,
            format,
            samples,
            fixed_sample_locations,
            init_state,
        );
        self.signal_dirty_storage(init_state);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_storage_external_memory(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
        memory: &ExternalMemory,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(texture_type, self.state.texture_type());
        debug_assert!(levels >= 1);
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        delegate(
            "set_storage_external_memory",
            self.imp
                .set_storage_external_memory(ctx, texture_type, levels, format, size, memory),
        )?;

        self.state.is_external_memory_texture = true;
        self.begin_immutable_storage(levels);
        self.state
            .set_image_desc_chain(0, levels - 1, size, format, InitState::Initialized);
        self.end_immutable_storage(InitState::Initialized);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_storage_attribs(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        format: Format,
        size: Extents,
        attribs: &[StorageAttrib],
    ) -> Result<(), TextureError> {
        debug_assert_eq!(texture_type, self.state.texture_type());
        debug_assert!(levels >= 1);
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        delegate(
            "set_storage_attribs",
            self.imp
                .set_storage_attribs(ctx, texture_type, levels, format, size, attribs),
        )?;

        self.state.compression_fixed_rate = attribs.iter().find_map(|attrib| match attrib {
            StorageAttrib::SurfaceCompression(rate) => *rate,
        });
        let init_state = determine_init_state(ctx, PixelSource::EMPTY);
        self.begin_immutable_storage(levels);
        self.state
            .set_image_desc_chain(0, levels - 1, size, format, init_state);
        self.end_immutable_storage(init_state);
        Ok(())
    }

    /// Defines an image whose storage was created outside GL. Its contents are considered
    /// initialized.
    pub fn set_image_external(
        &mut self,
        ctx: &ContextState,
        target: TextureTarget,
        level: u32,
        format: Format,
        size: Extents,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(target.texture_type(), self.state.texture_type());
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        let index = ImageIndex::from_target(target, level, size.depth);
        delegate(
            "set_image_external",
            self.imp.set_image_external(ctx, &index, format, size),
        )?;

        self.state.set_image_desc(
            target,
            level,
            ImageDesc::new(size, format, InitState::Initialized),
        );
        self.handle_mipmap_generation_hint(ctx, level)?;
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    pub fn generate_mipmap(&mut self, ctx: &ContextState) -> Result<(), TextureError> {
        // Images are only orphaned when the texture is not already mip complete.
        if !self.is_mipmap_complete() {
            self.orphan_images(ctx)?;
        }

        let base_level = self.state.effective_base_level();
        let max_level = self.state.mipmap_max_level();
        if max_level <= base_level {
            return Ok(());
        }

        let base_desc = *self
            .state
            .image_desc(self.state.base_image_target(), base_level);
        if base_desc.size.is_empty() {
            trace!(texture = self.id.0, "generate_mipmap on empty base level is a no-op");
            return Ok(());
        }

        if ctx.is_robust_resource_init_enabled() {
            let texture_type = self.state.texture_type();
            for index in ImageIndex::iter_generic(texture_type, base_level..base_level + 1, None) {
                let desc = self.state.image_desc(index.target(), index.level());
                if desc.init_state == InitState::MayNeedInit {
                    delegate(
                        "initialize_contents",
                        self.imp.initialize_contents(ctx, &index),
                    )?;
                }
            }
        }

        self.sync_state(ctx, SyncSource::GenerateMipmap)?;
        delegate("generate_mipmap", self.imp.generate_mipmap(ctx))?;

        self.state.set_image_desc_chain(
            base_level,
            max_level,
            base_desc.size,
            base_desc.format,
            InitState::Initialized,
        );

        // The surface keeps its contents; only the binding is dropped.
        if let Some(surface) = self.bound_surface.take() {
            debug!(texture = self.id.0, surface = surface.0, "generate_mipmap detached surface");
        }

        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    /// `glClearTexImage`.
    pub fn clear_image(
        &mut self,
        ctx: &ContextState,
        level: u32,
        data: Option<&[u8]>,
    ) -> Result<(), TextureError> {
        delegate("clear_image", self.imp.clear_image(ctx, level, data))?;
        self.handle_mipmap_generation_hint(ctx, level)?;

        let texture_type = self.state.texture_type();
        for index in ImageIndex::iter_generic(texture_type, level..level + 1, None) {
            self.set_init_state_for_index(&index, InitState::Initialized);
        }

        self.notify(SubjectMessage::ContentsChanged);
        Ok(())
    }

    /// `glClearTexSubImage`. Cube faces are addressed through `area`'s z range.
    pub fn clear_sub_image(
        &mut self,
        ctx: &ContextState,
        level: u32,
        area: &Box3D,
        data: Option<&[u8]>,
    ) -> Result<(), TextureError> {
        let texture_type = self.state.texture_type();
        let first_layer = area.z.max(0) as u32;
        let layers = first_layer..first_layer + box_depth(area);
        let indices: Vec<ImageIndex> =
            ImageIndex::iter_generic(texture_type, level..level + 1, Some(layers)).collect();
        for index in &indices {
            let flattened = if index.texture_type() == TextureType::CubeMap {
                Box3D::new(area.x, area.y, 0, area.width, area.height, 1)
            } else {
                *area
            };
            self.ensure_sub_image_initialized(ctx, index, &flattened)?;
        }

        delegate("clear_sub_image", self.imp.clear_sub_image(ctx, level, area, data))?;
        self.handle_mipmap_generation_hint(ctx, level)?;
        self.notify(SubjectMessage::ContentsChanged);
        Ok(())
    }

    // EGL surfaces, streams and images.

    /// `eglBindTexImage`: level 0 aliases the surface's back buffer.
    pub fn bind_tex_image_from_surface(
        &mut self,
        ctx: &ContextState,
        surface: &SurfaceBinding,
    ) -> Result<(), TextureError> {
        self.release_tex_image_internal(ctx)?;

        delegate("bind_tex_image", self.imp.bind_tex_image(ctx, surface))?;

        self.bound_surface = Some(surface.id);
        let target = self.state.texture_type().non_cube_target();
        self.state.set_image_desc(
            target,
            0,
            ImageDesc::new(surface.size, surface.format, InitState::Initialized),
        );
        self.state.has_protected_content = surface.has_protected_content;
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    pub fn release_tex_image_from_surface(
        &mut self,
        ctx: &ContextState,
    ) -> Result<(), TextureError> {
        delegate("release_tex_image", self.imp.release_tex_image(ctx))?;

        self.bound_surface = None;
        let target = self.state.texture_type().non_cube_target();
        self.state.clear_image_desc(target, 0);
        self.state.has_protected_content = false;
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    pub fn bind_stream(&mut self, stream: StreamId) {
        debug_assert_eq!(self.state.texture_type(), TextureType::External);
        self.bound_stream = Some(stream);
    }

    pub fn release_stream(&mut self) {
        self.bound_stream = None;
    }

    pub fn acquire_image_from_stream(
        &mut self,
        ctx: &ContextState,
        desc: &StreamImageDesc,
    ) -> Result<(), TextureError> {
        debug_assert!(self.bound_stream.is_some());
        delegate(
            "set_image_from_stream",
            self.imp.set_image_from_stream(ctx, Some(desc)),
        )?;

        let size = Extents::new(desc.width, desc.height, 1);
        self.state.set_image_desc(
            TextureTarget::External,
            0,
            ImageDesc::new(size, desc.format, InitState::Initialized),
        );
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    pub fn release_image_from_stream(&mut self, ctx: &ContextState) -> Result<(), TextureError> {
        debug_assert!(self.bound_stream.is_some());
        delegate(
            "set_image_from_stream",
            self.imp.set_image_from_stream(ctx, None),
        )?;

        self.state.clear_image_desc(TextureTarget::External, 0);
        self.signal_dirty_storage(InitState::Initialized);
        Ok(())
    }

    fn set_egl_image_target_impl(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        levels: u32,
        image: &EglImageSource,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(texture_type, self.state.texture_type());
        debug_assert!(levels >= 1);
        self.release_tex_image_internal(ctx)?;
        self.orphan_images(ctx)?;

        delegate(
            "set_egl_image_target",
            self.imp.set_egl_image_target(ctx, texture_type, image),
        )?;

        self.target_image = Some(image.id);
        self.state.clear_image_descs();
        self.state.set_image_desc_chain(
            0,
            levels - 1,
            image.extents,
            image.format,
            image.init_state,
        );
        self.state.has_protected_content = image.has_protected_content;
        self.signal_dirty_storage(image.init_state);
        Ok(())
    }

    /// `glEGLImageTargetTexture2DOES`: a mutable single-level alias of `image`.
    pub fn set_egl_image_target(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        image: &EglImageSource,
    ) -> Result<(), TextureError> {
        self.set_egl_image_target_impl(ctx, texture_type, 1, image)
    }

    /// `glEGLImageTargetTexStorageEXT`: an immutable alias of every level of `image`.
    pub fn set_storage_egl_image_target(
        &mut self,
        ctx: &ContextState,
        texture_type: TextureType,
        image: &EglImageSource,
    ) -> Result<(), TextureError> {
        let levels = image.level_count.max(1);
        self.set_egl_image_target_impl(ctx, texture_type, levels, image)?;
        self.state.immutable_format = true;
        self.state.immutable_levels = levels;
        self.dirty_bits |= DirtyBits::BASE_LEVEL | DirtyBits::MAX_LEVEL;
        Ok(())
    }

    pub fn on_bind_as_egl_image_source(&mut self, image: EglImageId) {
        self.state.has_been_bound_as_egl_image_source = true;
        if !self.source_images.contains(&image) {
            self.source_images.push(image);
        }
    }

    // Buffer textures.

    /// `glTexBufferRange`; `size == 0` binds everything past `offset`.
    pub fn set_buffer_range(
        &mut self,
        ctx: &ContextState,
        buffer: Option<Buffer>,
        format: Format,
        offset: u64,
        size: u64,
    ) -> Result<(), TextureError> {
        debug_assert_eq!(self.state.texture_type(), TextureType::Buffer);
        delegate("set_buffer", self.imp.set_buffer(ctx, format))?;

        self.detach_buffer_observer();
        self.state.immutable_format = true;
        self.state.buffer.set(buffer.clone(), offset, size);
        self.state.clear_image_descs();

        let Some(buffer) = buffer else {
            self.signal_dirty_storage(determine_init_state(ctx, PixelSource::EMPTY));
            return Ok(());
        };

        let available = self.state.buffer.available_size();
        let pixel_bytes = u64::from(format.info().pixel_bytes.max(1));
        let width = u32::try_from(available / pixel_bytes).unwrap_or(u32::MAX);
        self.state.immutable_levels = 1;
        let init_state = buffer.init_state();
        self.state.set_image_desc(
            TextureTarget::Buffer,
            0,
            ImageDesc::new(Extents::new(width, 1, 1), format, init_state),
        );
        self.signal_dirty_storage(init_state);

        if let Some(observer) = &self.self_observer {
            buffer.add_observer(observer.clone());
        }
        buffer.add_contents_observer(self.id);
        Ok(())
    }

    pub fn set_buffer(
        &mut self,
        ctx: &ContextState,
        buffer: Option<Buffer>,
        format: Format,
    ) -> Result<(), TextureError> {
        self.set_buffer_range(ctx, buffer, format, 0, 0)
    }

    fn detach_buffer_observer(&mut self) {
        if let Some(buffer) = self.state.buffer.get() {
            if let Some(observer) = &self.self_observer {
                buffer.remove_observer(observer);
            }
            buffer.remove_contents_observer(self.id);
        }
    }

    fn on_buffer_contents_change(&mut self) {
        self.state.init_state = InitState::MayNeedInit;
        self.signal_dirty_state(DirtyBits::IMPLEMENTATION);
        self.notify(SubjectMessage::ContentsChanged);
    }

    fn refresh_buffer_extent(&mut self) {
        let mut desc = *self.state.image_desc(TextureTarget::Buffer, 0);
        let pixel_bytes = u64::from(desc.format.info().pixel_bytes.max(1));
        let available = self.state.buffer.available_size();
        desc.size.width = u32::try_from(available / pixel_bytes).unwrap_or(u32::MAX);
        // The new data store has not been written through this texture.
        desc.init_state = InitState::MayNeedInit;
        self.state.set_image_desc(TextureTarget::Buffer, 0, desc);
        trace!(texture = self.id.0, width = desc.size.width, "buffer texture resized");
    }

    // Robust resource initialization.

    fn does_sub_image_need_init(
        &self,
        ctx: &ContextState,
        index: &ImageIndex,
        area: &Box3D,
    ) -> bool {
        if !ctx.is_robust_resource_init_enabled()
            || self.state.init_state() == InitState::Initialized
        {
            return false;
        }

        // Pre-initialize the texture contents if necessary.
        let desc = self.state.image_desc(index.target(), index.level());
        if desc.init_state != InitState::MayNeedInit {
            return false;
        }

        debug_assert_eq!(self.state.init_state(), InitState::MayNeedInit);
        !area.covers_same_extent(&desc.size)
    }

    fn ensure_sub_image_initialized(
        &mut self,
        ctx: &ContextState,
        index: &ImageIndex,
        area: &Box3D,
    ) -> Result<(), TextureError> {
        if self.does_sub_image_need_init(ctx, index, area) {
            delegate(
                "initialize_contents",
                self.imp.initialize_contents(ctx, index),
            )?;
        }
        self.set_init_state_for_index(index, InitState::Initialized);
        Ok(())
    }

    /// Zeroes every image that may be read uninitialized. Only acts under robust resource
    /// initialization.
    pub fn ensure_initialized(&mut self, ctx: &ContextState) -> Result<(), TextureError> {
        if !ctx.is_robust_resource_init_enabled()
            || self.state.init_state() == InitState::Initialized
        {
            return Ok(());
        }

        let texture_type = self.state.texture_type();
        let mut any_dirty = false;
        let levels = 0..IMPLEMENTATION_MAX_TEXTURE_LEVELS + 1;
        for index in ImageIndex::iter_generic(texture_type, levels, None) {
            let desc = *self.state.image_desc(index.target(), index.level());
            if desc.init_state != InitState::MayNeedInit || desc.size.is_empty() {
                continue;
            }
            delegate(
                "initialize_contents",
                self.imp.initialize_contents(ctx, &index),
            )?;
            self.state.set_image_desc(
                index.target(),
                index.level(),
                ImageDesc {
                    init_state: InitState::Initialized,
                    ..desc
                },
            );
            any_dirty = true;
        }

        if any_dirty {
            self.signal_dirty_storage(InitState::Initialized);
        }
        self.state.init_state = InitState::Initialized;
        Ok(())
    }

    /// Init state of one image. An entire-level cube index is `MayNeedInit` if any face is.
    pub fn init_state_for_index(&self, index: &ImageIndex) -> InitState {
        if index.is_entire_level_cube_map() {
            let any_face_uninitialized = TextureTarget::CUBE_FACES.iter().any(|&face| {
                self.state.image_desc(face, index.level()).init_state == InitState::MayNeedInit
            });
            return if any_face_uninitialized {
                InitState::MayNeedInit
            } else {
                InitState::Initialized
            };
        }
        self.state.image_desc(index.target(), index.level()).init_state
    }

    pub fn init_state(&self) -> InitState {
        self.state.init_state()
    }

    pub fn set_init_state_for_index(&mut self, index: &ImageIndex, init_state: InitState) {
        if index.is_entire_level_cube_map() {
            for face in 0..TextureTarget::CUBE_FACES.len() as u32 {
                let face_index =
                    ImageIndex::new(TextureType::CubeMap, index.level(), Some(face), 1);
                self.set_init_state_for_index(&face_index, init_state);
            }
            return;
        }

        let target = index.target();
        let desc = *self.state.image_desc(target, index.level());
        self.state.set_image_desc(
            target,
            index.level(),
            ImageDesc { init_state, ..desc },
        );
    }

    /// Marks every defined image, and the aggregate, as `init_state`.
    pub fn set_init_state(&mut self, init_state: InitState) {
        for desc in self.state.image_descs_mut() {
            if desc.is_defined() {
                desc.init_state = init_state;
            }
        }
        self.state.init_state = init_state;
    }

    // Backend sync.

    pub fn sync_state(
        &mut self,
        ctx: &ContextState,
        source: SyncSource,
    ) -> Result<(), TextureError> {
        delegate(
            "sync_state",
            self.imp.sync_state(ctx, self.dirty_bits, source),
        )?;
        self.dirty_bits = DirtyBits::empty();
        self.state.init_state = InitState::Initialized;
        Ok(())
    }

    // Binding markers.

    pub fn on_bind_as_image_texture(&mut self) {
        if !self.state.has_been_bound_as_image {
            self.dirty_bits |= DirtyBits::BOUND_AS_IMAGE;
            self.state.has_been_bound_as_image = true;
        }
    }

    pub fn on_bind_to_msrtt_framebuffer(&mut self) {
        if !self.state.has_been_bound_to_msrtt_framebuffer {
            self.dirty_bits |= DirtyBits::BOUND_TO_MSRTT_FRAMEBUFFER;
            self.state.has_been_bound_to_msrtt_framebuffer = true;
        }
    }

    // Framebuffer attachment.

    pub fn on_attach(&mut self, serial: FramebufferSerial) {
        self.bound_framebuffer_serials.push(serial);
        if !self.state.has_been_bound_as_attachment {
            self.dirty_bits |= DirtyBits::BOUND_AS_ATTACHMENT;
            self.state.has_been_bound_as_attachment = true;
        }
    }

    pub fn on_detach(&mut self, serial: FramebufferSerial) {
        match self.bound_framebuffer_serials.iter().position(|&s| s == serial) {
            Some(position) => {
                self.bound_framebuffer_serials.remove(position);
            }
            None => debug_assert!(false, "detaching unattached framebuffer {serial:?}"),
        }
    }

    pub fn bound_framebuffer_serials(&self) -> &[FramebufferSerial] {
        &self.bound_framebuffer_serials
    }

    pub fn attachment_size(&self, index: &ImageIndex) -> Extents {
        if index.is_entire_level_cube_map() && !self.state.is_cube_complete() {
            return Extents::default();
        }
        self.state.image_desc_for_index(index).size
    }

    pub fn attachment_format(&self, index: &ImageIndex) -> Format {
        if index.is_entire_level_cube_map() && !self.state.is_cube_complete() {
            return Format::NONE;
        }
        self.state.image_desc_for_index(index).format
    }

    pub fn attachment_samples(&self, index: &ImageIndex) -> u32 {
        if index.is_entire_level_cube_map() {
            return 0;
        }
        self.state.image_desc_for_index(index).samples
    }

    pub fn attachment_fixed_sample_locations(&self, index: &ImageIndex) -> bool {
        if index.is_entire_level_cube_map() {
            return true;
        }
        self.state.image_desc_for_index(index).fixed_sample_locations
    }

    pub fn is_renderable(&self, ctx: &ContextState, index: &ImageIndex) -> bool {
        if self.bound_surface.is_some() {
            return true;
        }
        // ES2 without renderability validation defers to the driver.
        if !self.state.renderability_validation() && ctx.client_version < ClientVersion::ES_3_0 {
            return true;
        }
        self.attachment_format(index)
            .info()
            .texture_attachment_support(ctx.client_version, ctx.extensions)
    }

    /// Whether a read-back of `level` has anything to read. Empty levels skip the backend.
    pub fn has_contents(&self, target: TextureTarget, level: u32) -> bool {
        !self.extents(target, level).is_empty()
    }

    // Foveated rendering.

    pub fn foveation(&self) -> &FoveationState {
        self.state.foveation()
    }

    pub fn is_foveation_enabled(&self) -> bool {
        self.state.foveation().foveated_feature_bits() & FoveationState::FOVEATION_ENABLE_BIT != 0
    }

    pub fn set_foveated_feature_bits(&mut self, bits: u32) {
        self.state.foveation.set_foveated_feature_bits(bits);
    }

    pub fn set_min_pixel_density(&mut self, density: f32) {
        self.state.foveation.set_min_pixel_density(density);
    }

    pub fn set_focal_point(&mut self, layer: usize, focal_point: usize, point: FocalPoint) {
        if self.state.foveation().focal_point(layer, focal_point) == point {
            return;
        }
        self.state.foveation.set_focal_point(layer, focal_point, point);
        self.state
            .foveation
            .set_foveated_feature_bits(FoveationState::FOVEATION_ENABLE_BIT);
        self.notify(SubjectMessage::FoveatedRenderingStateChanged);
    }

    // Destruction.

    /// Tears down every external binding, then the backend. Errors from the teardown steps are
    /// logged and swallowed; the backend is always destroyed exactly once.
    pub fn on_destroy(&mut self, ctx: &ContextState) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.notify(SubjectMessage::TextureIdDeleted);

        if self.bound_surface.is_some() {
            if let Err(err) = self.release_tex_image_from_surface(ctx) {
                warn!(texture = self.id.0, error = %err, "failed to release bound surface");
            }
            self.bound_surface = None;
        }

        self.bound_stream = None;

        if let Err(err) = self.orphan_images(ctx) {
            warn!(texture = self.id.0, error = %err, "failed to orphan EGL images");
        }

        self.detach_buffer_observer();
        self.state.buffer.set(None, 0, 0);

        self.imp.on_destroy(ctx);
        debug!(texture = self.id.0, "texture destroyed");
    }
}

impl Observer for Texture {
    fn on_subject_state_change(&mut self, index: SubjectIndex, message: SubjectMessage) {
        match message {
            SubjectMessage::ContentsChanged => {
                if index == SubjectIndex::Buffer {
                    let observed = self
                        .state
                        .buffer
                        .get()
                        .is_some_and(|buffer| buffer.has_contents_observer(self.id));
                    if observed {
                        self.on_buffer_contents_change();
                    }
                } else {
                    self.signal_dirty_storage(InitState::Initialized);
                }
            }
            SubjectMessage::DirtyBitsFlagged => {
                self.signal_dirty_state(DirtyBits::IMPLEMENTATION);
            }
            SubjectMessage::SubjectChanged => {
                self.state.init_state = InitState::MayNeedInit;
                self.signal_dirty_state(DirtyBits::IMPLEMENTATION);
                self.notify(SubjectMessage::ContentsChanged);
                if index == SubjectIndex::Buffer && self.state.buffer.get().is_some() {
                    self.refresh_buffer_extent();
                }
            }
            SubjectMessage::StorageReleased => {
                if index == SubjectIndex::TextureImpl {
                    self.notify(SubjectMessage::StorageReleased);
                }
            }
            SubjectMessage::SubjectMapped
            | SubjectMessage::SubjectUnmapped
            | SubjectMessage::BindingChanged => {
                let observed = self
                    .state
                    .buffer
                    .get()
                    .is_some_and(|buffer| buffer.has_contents_observer(self.id));
                if observed {
                    self.on_buffer_contents_change();
                }
            }
            SubjectMessage::InitializationComplete => {
                self.set_init_state(InitState::Initialized);
            }
            SubjectMessage::InternalMemoryAllocationChanged => {
                self.signal_dirty_state(DirtyBits::IMPLEMENTATION);
            }
            SubjectMessage::FoveatedRenderingStateChanged | SubjectMessage::TextureIdDeleted => {
                trace!(texture = self.id.0, ?message, "ignored texture subject message");
            }
        }
    }
}
