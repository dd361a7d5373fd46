//! Logical texture state and the completeness predicates built on it.

use crate::buffer::OffsetBindingPointer;
use crate::caps::{ClientVersion, ContextState};
use crate::format::{BaseFormat, ComponentType, Format};
use crate::image_desc::{ImageDesc, InitState};
use crate::image_index::{
    Extents, ImageIndex, Rectangle, TextureTarget, TextureType, IMPLEMENTATION_MAX_TEXTURE_LEVELS,
};
use crate::sampler::{CompareMode, SamplerState, SrgbOverride, SwizzleState, WrapMode, MinFilter};

/// `GL_TEXTURE_MAX_LEVEL` before the application sets it.
pub const INITIAL_MAX_LEVEL: u32 = 1000;

/// Focal points per foveated layer.
pub const MAX_FOCAL_POINTS: usize = 2;

/// Layers that can carry their own focal points.
pub const MAX_FOVEATED_LAYERS: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthStencilMode {
    #[default]
    DepthComponent,
    StencilIndex,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextureUsage {
    #[default]
    None,
    FramebufferAttachment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AstcDecodePrecision {
    #[default]
    Rgba16F,
    Rgba8,
    Rgb9E5,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TilingMode {
    #[default]
    Optimal,
    Linear,
}

/// Sampler type a shader must declare to read this texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerFormat {
    Float,
    Unsigned,
    Signed,
    Shadow,
    Invalid,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FocalPoint {
    pub focal_x: f32,
    pub focal_y: f32,
    pub gain_x: f32,
    pub gain_y: f32,
    pub fovea_area: f32,
}

/// `QCOM_texture_foveated` state.
#[derive(Clone, Debug, PartialEq)]
pub struct FoveationState {
    foveated_feature_bits: u32,
    supported_features: u32,
    min_pixel_density: f32,
    focal_points: [[FocalPoint; MAX_FOCAL_POINTS]; MAX_FOVEATED_LAYERS],
}

impl FoveationState {
    pub const FOVEATION_ENABLE_BIT: u32 = 0x1;
    pub const FOVEATION_SCALED_BIN_METHOD_BIT: u32 = 0x2;

    pub fn foveated_feature_bits(&self) -> u32 {
        self.foveated_feature_bits
    }

    pub fn set_foveated_feature_bits(&mut self, bits: u32) {
        self.foveated_feature_bits = bits;
    }

    pub fn supported_features(&self) -> u32 {
        self.supported_features
    }

    pub fn min_pixel_density(&self) -> f32 {
        self.min_pixel_density
    }

    pub fn set_min_pixel_density(&mut self, density: f32) {
        self.min_pixel_density = density;
    }

    pub fn focal_point(&self, layer: usize, index: usize) -> FocalPoint {
        self.focal_points[layer][index]
    }

    pub fn set_focal_point(&mut self, layer: usize, index: usize, point: FocalPoint) {
        self.focal_points[layer][index] = point;
    }
}

impl Default for FoveationState {
    fn default() -> Self {
        Self {
            foveated_feature_bits: 0,
            supported_features: Self::FOVEATION_ENABLE_BIT | Self::FOVEATION_SCALED_BIN_METHOD_BIT,
            min_pixel_density: 0.0,
            focal_points: [[FocalPoint::default(); MAX_FOCAL_POINTS]; MAX_FOVEATED_LAYERS],
        }
    }
}

fn image_desc_index(target: TextureTarget, level: u32) -> usize {
    match target.cube_face_index() {
        Some(face) => level as usize * 6 + face as usize,
        None => level as usize,
    }
}

fn is_pow2(value: u32) -> bool {
    value.is_power_of_two()
}

#[derive(Clone, Debug)]
pub struct TextureState {
    pub(crate) texture_type: TextureType,
    pub(crate) sampler_state: SamplerState,
    pub(crate) srgb_override: SrgbOverride,
    pub(crate) swizzle_state: SwizzleState,
    pub(crate) base_level: u32,
    pub(crate) max_level: u32,
    pub(crate) depth_stencil_mode: DepthStencilMode,
    pub(crate) is_external_memory_texture: bool,
    pub(crate) has_been_bound_as_image: bool,
    pub(crate) has_been_bound_as_attachment: bool,
    pub(crate) has_been_bound_to_msrtt_framebuffer: bool,
    pub(crate) has_been_bound_as_egl_image_source: bool,
    pub(crate) immutable_format: bool,
    pub(crate) immutable_levels: u32,
    pub(crate) usage: TextureUsage,
    pub(crate) has_protected_content: bool,
    pub(crate) renderability_validation: bool,
    pub(crate) tiling_mode: TilingMode,
    pub(crate) buffer: OffsetBindingPointer,
    pub(crate) foveation: FoveationState,
    pub(crate) compression_fixed_rate: Option<u32>,
    astc_decode_precision: AstcDecodePrecision,
    image_descs: Vec<ImageDesc>,
    crop_rect: Rectangle,
    generate_mipmap_hint: bool,
    pub(crate) init_state: InitState,
}

impl TextureState {
    pub fn new(texture_type: TextureType) -> Self {
        let slots = (IMPLEMENTATION_MAX_TEXTURE_LEVELS + 1) * texture_type.faces();
        Self {
            texture_type,
            sampler_state: SamplerState::default_for_type(texture_type),
            srgb_override: SrgbOverride::Default,
            swizzle_state: SwizzleState::default(),
            base_level: 0,
            max_level: INITIAL_MAX_LEVEL,
            depth_stencil_mode: DepthStencilMode::DepthComponent,
            is_external_memory_texture: false,
            has_been_bound_as_image: false,
            has_been_bound_as_attachment: false,
            has_been_bound_to_msrtt_framebuffer: false,
            has_been_bound_as_egl_image_source: false,
            immutable_format: false,
            immutable_levels: 0,
            usage: TextureUsage::None,
            has_protected_content: false,
            renderability_validation: true,
            tiling_mode: TilingMode::Optimal,
            buffer: OffsetBindingPointer::default(),
            foveation: FoveationState::default(),
            compression_fixed_rate: None,
            astc_decode_precision: AstcDecodePrecision::Rgba16F,
            image_descs: vec![ImageDesc::default(); slots as usize],
            crop_rect: Rectangle::default(),
            generate_mipmap_hint: false,
            init_state: InitState::Initialized,
        }
    }

    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    pub fn sampler_state(&self) -> &SamplerState {
        &self.sampler_state
    }

    pub fn swizzle_state(&self) -> &SwizzleState {
        &self.swizzle_state
    }

    pub fn swizzle_required(&self) -> bool {
        self.swizzle_state.swizzle_required()
    }

    pub fn srgb_override(&self) -> SrgbOverride {
        self.srgb_override
    }

    pub fn base_level(&self) -> u32 {
        self.base_level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn depth_stencil_mode(&self) -> DepthStencilMode {
        self.depth_stencil_mode
    }

    pub fn immutable_format(&self) -> bool {
        self.immutable_format
    }

    pub fn immutable_levels(&self) -> u32 {
        self.immutable_levels
    }

    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    pub fn init_state(&self) -> InitState {
        self.init_state
    }

    pub fn buffer(&self) -> &OffsetBindingPointer {
        &self.buffer
    }

    pub fn foveation(&self) -> &FoveationState {
        &self.foveation
    }

    pub fn has_protected_content(&self) -> bool {
        self.has_protected_content
    }

    pub fn renderability_validation(&self) -> bool {
        self.renderability_validation
    }

    pub fn tiling_mode(&self) -> TilingMode {
        self.tiling_mode
    }

    pub fn is_external_memory_texture(&self) -> bool {
        self.is_external_memory_texture
    }

    pub fn has_been_bound_as_image(&self) -> bool {
        self.has_been_bound_as_image
    }

    pub fn has_been_bound_as_attachment(&self) -> bool {
        self.has_been_bound_as_attachment
    }

    pub fn has_been_bound_to_msrtt_framebuffer(&self) -> bool {
        self.has_been_bound_to_msrtt_framebuffer
    }

    pub fn has_been_bound_as_egl_image_source(&self) -> bool {
        self.has_been_bound_as_egl_image_source
    }

    pub fn compression_fixed_rate(&self) -> Option<u32> {
        self.compression_fixed_rate
    }

    pub fn crop(&self) -> Rectangle {
        self.crop_rect
    }

    pub fn set_crop(&mut self, rect: Rectangle) {
        self.crop_rect = rect;
    }

    pub fn generate_mipmap_hint(&self) -> bool {
        self.generate_mipmap_hint
    }

    pub fn set_generate_mipmap_hint(&mut self, hint: bool) {
        self.generate_mipmap_hint = hint;
    }

    pub fn astc_decode_precision(&self) -> AstcDecodePrecision {
        self.astc_decode_precision
    }

    pub fn set_astc_decode_precision(&mut self, precision: AstcDecodePrecision) -> bool {
        if self.astc_decode_precision == precision {
            return false;
        }
        self.astc_decode_precision = precision;
        true
    }

    pub fn set_base_level(&mut self, base_level: u32) -> bool {
        if self.base_level == base_level {
            return false;
        }
        self.base_level = base_level;
        true
    }

    pub fn set_max_level(&mut self, max_level: u32) -> bool {
        if self.max_level == max_level {
            return false;
        }
        self.max_level = max_level;
        true
    }

    pub fn effective_base_level(&self) -> u32 {
        if self.immutable_format {
            return self.base_level.min(self.immutable_levels.saturating_sub(1));
        }
        self.base_level.min(IMPLEMENTATION_MAX_TEXTURE_LEVELS)
    }

    pub fn effective_max_level(&self) -> u32 {
        if self.immutable_format {
            let clamped = self.max_level.max(self.effective_base_level());
            return clamped.min(self.immutable_levels.saturating_sub(1));
        }
        if self.texture_type.is_mipmap_supported()
            && self.sampler_state.min_filter().is_mipmap_filtered()
        {
            self.max_level
        } else {
            self.max_level.max(self.base_level)
        }
    }

    /// Highest level a full mip chain from the effective base would reach, clamped to the
    /// effective max level.
    pub fn mipmap_max_level(&self) -> u32 {
        let base = self.image_desc(self.base_image_target(), self.effective_base_level());
        let mut max_dim = base.size.width.max(base.size.height);
        if self.texture_type == TextureType::D3 {
            max_dim = max_dim.max(base.size.depth);
        }
        let expected_levels = max_dim.max(1).ilog2();
        (self.effective_base_level() + expected_levels).min(self.effective_max_level())
    }

    pub fn base_image_target(&self) -> TextureTarget {
        self.texture_type.target(0)
    }

    pub fn image_desc(&self, target: TextureTarget, level: u32) -> &ImageDesc {
        let index = image_desc_index(target, level);
        assert!(
            index < self.image_descs.len(),
            "image desc {target:?} level {level} out of range"
        );
        &self.image_descs[index]
    }

    /// Entire-level cube indices read the first face; the texture must be cube complete.
    pub fn image_desc_for_index(&self, index: &ImageIndex) -> &ImageDesc {
        if index.is_entire_level_cube_map() {
            debug_assert!(self.is_cube_complete());
            return self.image_desc(TextureTarget::CubeMapPositiveX, index.level());
        }
        self.image_desc(index.target(), index.level())
    }

    pub fn image_descs(&self) -> &[ImageDesc] {
        &self.image_descs
    }

    pub fn base_level_desc(&self) -> &ImageDesc {
        debug_assert!(self.texture_type != TextureType::CubeMap || self.is_cube_complete());
        self.image_desc(self.base_image_target(), self.effective_base_level())
    }

    pub fn level_zero_desc(&self) -> &ImageDesc {
        debug_assert!(self.texture_type != TextureType::CubeMap || self.is_cube_complete());
        self.image_desc(self.base_image_target(), 0)
    }

    /// Stores `desc` and refreshes the aggregate init state. A `MayNeedInit` desc makes the
    /// aggregate `MayNeedInit`; otherwise every desc is rescanned.
    pub fn set_image_desc(&mut self, target: TextureTarget, level: u32, desc: ImageDesc) {
        let index = image_desc_index(target, level);
        assert!(
            index < self.image_descs.len(),
            "image desc {target:?} level {level} out of range"
        );
        self.image_descs[index] = desc;

        if desc.init_state == InitState::MayNeedInit {
            self.init_state = InitState::MayNeedInit;
        } else if self.scan_init_state() == InitState::Initialized {
            self.init_state = InitState::Initialized;
        }
    }

    /// Aggregate init state derived from every description.
    pub(crate) fn scan_init_state(&self) -> InitState {
        if self
            .image_descs
            .iter()
            .all(|desc| desc.init_state == InitState::Initialized)
        {
            InitState::Initialized
        } else {
            InitState::MayNeedInit
        }
    }

    /// Defines levels `base_level..=max_level` by halving `base_size`. Array layers keep their
    /// count; cube maps get every face.
    pub fn set_image_desc_chain(
        &mut self,
        base_level: u32,
        max_level: u32,
        base_size: Extents,
        format: Format,
        init_state: InitState,
    ) {
        let halve_depth = !self.texture_type.is_array();
        for level in base_level..=max_level {
            let size = base_size.mip(level - base_level, halve_depth);
            let desc = ImageDesc::new(size, format, init_state);
            for face in 0..self.texture_type.faces() {
                self.set_image_desc(self.texture_type.target(face), level, desc);
            }
        }
    }

    pub fn set_image_desc_chain_multisample(
        &mut self,
        base_size: Extents,
        format: Format,
        samples: u32,
        fixed_sample_locations: bool,
        init_state: InitState,
    ) {
        debug_assert!(self.texture_type != TextureType::CubeMap);
        let desc = ImageDesc::new_multisample(
            base_size,
            format,
            samples,
            fixed_sample_locations,
            init_state,
        );
        self.set_image_desc(self.base_image_target(), 0, desc);
    }

    pub fn clear_image_desc(&mut self, target: TextureTarget, level: u32) {
        self.set_image_desc(target, level, ImageDesc::default());
    }

    /// Resets every description. The aggregate init state is left untouched.
    pub fn clear_image_descs(&mut self) {
        self.image_descs.fill(ImageDesc::default());
    }

    pub(crate) fn image_descs_mut(&mut self) -> &mut [ImageDesc] {
        &mut self.image_descs
    }

    pub fn is_cube_complete(&self) -> bool {
        assert_eq!(self.texture_type, TextureType::CubeMap);
        let level = self.effective_base_level();
        let base = self.image_desc(TextureTarget::CubeMapPositiveX, level);
        if base.size.width == 0 || base.size.width != base.size.height {
            return false;
        }

        TextureTarget::CUBE_FACES[1..].iter().all(|&face| {
            let desc = self.image_desc(face, level);
            desc.size.width == base.size.width
                && desc.size.height == base.size.height
                && Format::same_sized(&desc.format, &base.format)
        })
    }

    pub fn compute_sampler_completeness(&self, sampler: &SamplerState, ctx: &ContextState) -> bool {
        if self.texture_type == TextureType::Buffer {
            return self.buffer.get().is_some();
        }

        if !self.compute_sampler_completeness_for_copy_image(sampler, ctx) {
            return false;
        }

        // Filter state does not apply to multisampled textures.
        if self.texture_type.is_multisampled() {
            return true;
        }

        if sampler.is_point_sampled() {
            return true;
        }

        let info = self
            .image_desc(self.base_image_target(), self.effective_base_level())
            .format
            .info();

        if !info.is_depth_or_stencil() {
            return info.filter_support(ctx.client_version, ctx.extensions);
        }

        // Unsized depth formats stay filterable for WebGL 1.0 compatibility.
        if info.depth_bits > 0
            && sampler.compare_mode() == CompareMode::None
            && ctx.client_version >= ClientVersion::ES_3_0
            && info.sized
        {
            return false;
        }

        if info.stencil_bits > 0 {
            if info.depth_bits > 0 {
                if self.depth_stencil_mode == DepthStencilMode::StencilIndex {
                    return false;
                }
            } else {
                return false;
            }
        }

        true
    }

    /// Completeness rules that do not depend on the format, as used by `CopyImageSubData`.
    pub fn compute_sampler_completeness_for_copy_image(
        &self,
        sampler: &SamplerState,
        ctx: &ContextState,
    ) -> bool {
        if self.texture_type == TextureType::Buffer {
            return self.buffer.get().is_some();
        }

        let base = self.image_desc(self.base_image_target(), self.effective_base_level());
        if base.size.is_empty() {
            return false;
        }
        debug_assert!(self.base_level < IMPLEMENTATION_MAX_TEXTURE_LEVELS || self.immutable_format);

        if self.texture_type == TextureType::CubeMap && base.size.width != base.size.height {
            return false;
        }

        let npot_support = ctx
            .extensions
            .contains(crate::caps::Extensions::TEXTURE_NPOT)
            || ctx.client_version >= ClientVersion::ES_3_0;
        if !npot_support
            && ((!sampler.wrap_s().clamps() && !is_pow2(base.size.width))
                || (!sampler.wrap_t().clamps() && !is_pow2(base.size.height)))
        {
            return false;
        }

        if self.texture_type.is_mipmap_supported() && sampler.min_filter().is_mipmap_filtered() {
            if !npot_support && (!is_pow2(base.size.width) || !is_pow2(base.size.height)) {
                return false;
            }
            if !self.compute_mipmap_completeness() {
                return false;
            }
        } else if self.texture_type == TextureType::CubeMap && !self.is_cube_complete() {
            return false;
        }

        if self.texture_type == TextureType::External {
            if !ctx
                .extensions
                .contains(crate::caps::Extensions::EGL_IMAGE_EXTERNAL_WRAP_MODES)
                && (sampler.wrap_s() != WrapMode::ClampToEdge
                    || sampler.wrap_t() != WrapMode::ClampToEdge)
            {
                return false;
            }
            if !matches!(sampler.min_filter(), MinFilter::Linear | MinFilter::Nearest) {
                return false;
            }
        }

        true
    }

    pub fn compute_mipmap_completeness(&self) -> bool {
        let max_level = self.mipmap_max_level();
        let base_level = self.effective_base_level();
        if base_level > max_level {
            return false;
        }

        (base_level..=max_level).all(|level| {
            if self.texture_type == TextureType::CubeMap {
                TextureTarget::CUBE_FACES
                    .iter()
                    .all(|&face| self.compute_level_completeness(face, level))
            } else {
                self.compute_level_completeness(self.texture_type.non_cube_target(), level)
            }
        })
    }

    pub fn compute_level_completeness(&self, target: TextureTarget, level: u32) -> bool {
        debug_assert!(level < IMPLEMENTATION_MAX_TEXTURE_LEVELS);

        if self.immutable_format {
            return true;
        }

        let base = self.image_desc(self.base_image_target(), self.effective_base_level());
        if base.size.is_empty() {
            return false;
        }

        let desc = self.image_desc(target, level);
        if desc.size.is_empty() {
            return false;
        }

        if !Format::same_sized(&desc.format, &base.format) {
            return false;
        }

        debug_assert!(level >= self.effective_base_level());
        let relative_level = level - self.effective_base_level();
        let expected = base.size.mip(relative_level, self.texture_type == TextureType::D3);
        if desc.size.width != expected.width || desc.size.height != expected.height {
            return false;
        }

        if (self.texture_type == TextureType::D3 || self.texture_type.is_array())
            && desc.size.depth != expected.depth
        {
            return false;
        }

        true
    }

    /// Number of consecutive levels from the effective base whose sizes follow the halving rule.
    pub fn enabled_level_count(&self) -> u32 {
        let base_level = self.effective_base_level();
        let max_level = self.mipmap_max_level();
        let target = self.texture_type.target(0);
        let halve_depth = !self.texture_type.is_array();

        let mut count = 0;
        let mut expected: Option<Extents> = None;
        for level in base_level..=max_level {
            let size = self.image_desc(target, level).size;
            if size.is_empty() {
                break;
            }
            if let Some(previous) = expected {
                if previous.mip(1, halve_depth) != size {
                    break;
                }
            }
            expected = Some(size);
            count += 1;
        }
        count
    }

    pub fn compute_required_sampler_format(&self, sampler: &SamplerState) -> SamplerFormat {
        let info = self
            .image_desc(self.base_image_target(), self.effective_base_level())
            .format
            .info();
        let base_format = info.base_format();
        let reads_depth = base_format == BaseFormat::DepthComponent
            || (base_format == BaseFormat::DepthStencil
                && self.depth_stencil_mode == DepthStencilMode::DepthComponent);
        let reads_stencil = base_format == BaseFormat::StencilIndex
            || (base_format == BaseFormat::DepthStencil
                && self.depth_stencil_mode == DepthStencilMode::StencilIndex);

        if reads_depth && sampler.compare_mode() != CompareMode::None {
            return SamplerFormat::Shadow;
        }
        if reads_stencil {
            return SamplerFormat::Unsigned;
        }
        match info.component_type {
            ComponentType::UnsignedNormalized
            | ComponentType::SignedNormalized
            | ComponentType::Float => SamplerFormat::Float,
            ComponentType::Int => SamplerFormat::Signed,
            ComponentType::UnsignedInt => SamplerFormat::Unsigned,
            ComponentType::None => SamplerFormat::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::InternalFormat;

    fn rgba8() -> Format {
        Format::new(InternalFormat::Rgba8)
    }

    #[test]
    fn defaults() {
        let state = TextureState::new(TextureType::CubeMap);
        assert_eq!(state.image_descs().len(), 17 * 6);
        assert_eq!(state.max_level(), INITIAL_MAX_LEVEL);
        assert_eq!(state.init_state(), InitState::Initialized);
        assert_eq!(state.astc_decode_precision(), AstcDecodePrecision::Rgba16F);
        assert!(state.renderability_validation());
    }

    #[test]
    fn effective_levels_clamp_for_immutable_textures() {
        let mut state = TextureState::new(TextureType::D2);
        state.immutable_format = true;
        state.immutable_levels = 3;

        state.set_base_level(5);
        state.set_max_level(1);
        assert_eq!(state.effective_base_level(), 2);
        assert_eq!(state.effective_max_level(), 2);

        state.set_base_level(0);
        state.set_max_level(1);
        assert_eq!(state.effective_max_level(), 1);
    }

    #[test]
    fn effective_max_level_without_mip_filter_tracks_base() {
        let mut state = TextureState::new(TextureType::D2);
        state.sampler_state.set_min_filter(MinFilter::Linear);
        state.set_base_level(4);
        state.set_max_level(2);
        assert_eq!(state.effective_max_level(), 4);
    }

    #[test]
    fn mipmap_max_level_uses_depth_for_3d() {
        let mut state = TextureState::new(TextureType::D3);
        state.set_image_desc(
            TextureTarget::D3,
            0,
            ImageDesc::new(Extents::new(4, 4, 16), rgba8(), InitState::Initialized),
        );
        assert_eq!(state.mipmap_max_level(), 4);
    }

    #[test]
    fn init_state_aggregate_tracks_descs() {
        let mut state = TextureState::new(TextureType::D2);
        let desc = |init_state| ImageDesc::new(Extents::new(4, 4, 1), rgba8(), init_state);
        state.set_image_desc(TextureTarget::D2, 0, desc(InitState::MayNeedInit));
        state.set_image_desc(TextureTarget::D2, 1, desc(InitState::MayNeedInit));
        assert_eq!(state.init_state(), InitState::MayNeedInit);

        state.set_image_desc(TextureTarget::D2, 0, desc(InitState::Initialized));
        assert_eq!(state.init_state(), InitState::MayNeedInit);

        state.set_image_desc(TextureTarget::D2, 1, desc(InitState::Initialized));
        assert_eq!(state.init_state(), InitState::Initialized);
    }

    #[test]
    fn clear_image_descs_keeps_aggregate() {
        let mut state = TextureState::new(TextureType::D2);
        state.set_image_desc(
            TextureTarget::D2,
            0,
            ImageDesc::new(Extents::new(1, 1, 1), rgba8(), InitState::MayNeedInit),
        );
        state.clear_image_descs();
        assert_eq!(state.init_state(), InitState::MayNeedInit);
        assert!(!state.image_desc(TextureTarget::D2, 0).is_defined());
    }

    #[test]
    fn chain_keeps_array_layers() {
        let mut state = TextureState::new(TextureType::D2Array);
        state.set_image_desc_chain(0, 2, Extents::new(8, 8, 6), rgba8(), InitState::Initialized);
        assert_eq!(state.image_desc(TextureTarget::D2Array, 2).size, Extents::new(2, 2, 6));
        assert_eq!(state.enabled_level_count(), 3);
    }

    #[test]
    fn required_sampler_format() {
        let mut state = TextureState::new(TextureType::D2);
        state.set_image_desc(
            TextureTarget::D2,
            0,
            ImageDesc::new(
                Extents::new(1, 1, 1),
                Format::new(InternalFormat::Depth24Stencil8),
                InitState::Initialized,
            ),
        );
        let mut sampler = SamplerState::default();
        assert_eq!(state.compute_required_sampler_format(&sampler), SamplerFormat::Float);
        sampler.set_compare_mode(CompareMode::CompareRefToTexture);
        assert_eq!(state.compute_required_sampler_format(&sampler), SamplerFormat::Shadow);
        state.depth_stencil_mode = DepthStencilMode::StencilIndex;
        assert_eq!(state.compute_required_sampler_format(&sampler), SamplerFormat::Unsigned);
    }
}
