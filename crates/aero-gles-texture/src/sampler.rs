//! Sampler parameters and swizzle state.
//!
//! Every setter returns whether the stored value changed so [`crate::Texture`] only flags dirty
//! bits for real changes.

use crate::image_index::TextureType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl MinFilter {
    pub fn is_mipmap_filtered(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }

    /// Same mip selection, nearest texel selection.
    pub fn to_nearest(self) -> MinFilter {
        match self {
            MinFilter::Linear => MinFilter::Nearest,
            MinFilter::LinearMipmapNearest => MinFilter::NearestMipmapNearest,
            MinFilter::LinearMipmapLinear => MinFilter::NearestMipmapLinear,
            other => other,
        }
    }

    /// Same texel selection, nearest mip selection.
    pub fn to_nearest_mip(self) -> MinFilter {
        match self {
            MinFilter::LinearMipmapLinear => MinFilter::LinearMipmapNearest,
            MinFilter::NearestMipmapLinear => MinFilter::NearestMipmapNearest,
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

impl WrapMode {
    pub fn clamps(self) -> bool {
        matches!(self, WrapMode::ClampToEdge | WrapMode::ClampToBorder)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareMode {
    None,
    CompareRefToTexture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SrgbDecode {
    Decode,
    SkipDecode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SrgbOverride {
    #[default]
    Default,
    Srgb,
}

/// Border color in the numeric class the sampler reads it as.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorGeneric {
    Float([f32; 4]),
    Int([i32; 4]),
    UnsignedInt([u32; 4]),
}

impl Default for ColorGeneric {
    fn default() -> Self {
        ColorGeneric::Float([0.0; 4])
    }
}

/// The subset of sampler state sampler completeness depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompletenessKey {
    min_filter: MinFilter,
    mag_filter: MagFilter,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
    compare_enabled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SamplerState {
    min_filter: MinFilter,
    mag_filter: MagFilter,
    wrap_s: WrapMode,
    wrap_t: WrapMode,
    wrap_r: WrapMode,
    max_anisotropy: f32,
    min_lod: f32,
    max_lod: f32,
    compare_mode: CompareMode,
    compare_func: CompareFunc,
    srgb_decode: SrgbDecode,
    border_color: ColorGeneric,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            wrap_r: WrapMode::Repeat,
            max_anisotropy: 1.0,
            min_lod: -1000.0,
            max_lod: 1000.0,
            compare_mode: CompareMode::None,
            compare_func: CompareFunc::LessEqual,
            srgb_decode: SrgbDecode::Decode,
            border_color: ColorGeneric::default(),
        }
    }
}

macro_rules! setter {
    ($set:ident, $get:ident, $field:ident, $ty:ty) => {
        pub fn $get(&self) -> $ty {
            self.$field
        }

        pub fn $set(&mut self, value: $ty) -> bool {
            if self.$field == value {
                return false;
            }
            self.$field = value;
            true
        }
    };
}

impl SamplerState {
    /// External and rectangle textures have no mips and default to clamped linear sampling.
    pub fn default_for_type(texture_type: TextureType) -> Self {
        let mut state = Self::default();
        if matches!(texture_type, TextureType::External | TextureType::Rectangle) {
            state.min_filter = MinFilter::Linear;
            state.wrap_s = WrapMode::ClampToEdge;
            state.wrap_t = WrapMode::ClampToEdge;
        }
        state
    }

    setter!(set_min_filter, min_filter, min_filter, MinFilter);
    setter!(set_mag_filter, mag_filter, mag_filter, MagFilter);
    setter!(set_wrap_s, wrap_s, wrap_s, WrapMode);
    setter!(set_wrap_t, wrap_t, wrap_t, WrapMode);
    setter!(set_wrap_r, wrap_r, wrap_r, WrapMode);
    setter!(set_max_anisotropy, max_anisotropy, max_anisotropy, f32);
    setter!(set_min_lod, min_lod, min_lod, f32);
    setter!(set_max_lod, max_lod, max_lod, f32);
    setter!(set_compare_mode, compare_mode, compare_mode, CompareMode);
    setter!(set_compare_func, compare_func, compare_func, CompareFunc);
    setter!(set_srgb_decode, srgb_decode, srgb_decode, SrgbDecode);

    pub fn border_color(&self) -> ColorGeneric {
        self.border_color
    }

    /// Border color writes always count as a change.
    pub fn set_border_color(&mut self, color: ColorGeneric) {
        self.border_color = color;
    }

    /// `MAG=NEAREST` and `MIN` in `{NEAREST, NEAREST_MIPMAP_NEAREST}`.
    pub fn is_point_sampled(&self) -> bool {
        self.mag_filter == MagFilter::Nearest
            && matches!(
                self.min_filter,
                MinFilter::Nearest | MinFilter::NearestMipmapNearest
            )
    }

    pub fn completeness_key(&self) -> CompletenessKey {
        CompletenessKey {
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            wrap_s: self.wrap_s,
            wrap_t: self.wrap_t,
            compare_enabled: self.compare_mode != CompareMode::None,
        }
    }

    pub fn same_completeness(&self, other: &SamplerState) -> bool {
        self.completeness_key() == other.completeness_key()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwizzleComponent {
    Red,
    Green,
    Blue,
    Alpha,
    Zero,
    One,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SwizzleState {
    pub red: SwizzleComponent,
    pub green: SwizzleComponent,
    pub blue: SwizzleComponent,
    pub alpha: SwizzleComponent,
}

impl Default for SwizzleState {
    fn default() -> Self {
        Self {
            red: SwizzleComponent::Red,
            green: SwizzleComponent::Green,
            blue: SwizzleComponent::Blue,
            alpha: SwizzleComponent::Alpha,
        }
    }
}

impl SwizzleState {
    pub fn swizzle_required(&self) -> bool {
        *self != SwizzleState::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_report_changes() {
        let mut state = SamplerState::default();
        assert!(!state.set_min_filter(MinFilter::NearestMipmapLinear));
        assert!(state.set_min_filter(MinFilter::Linear));
        assert!(!state.set_min_filter(MinFilter::Linear));
    }

    #[test]
    fn point_sampling() {
        let mut state = SamplerState::default();
        assert!(!state.is_point_sampled());
        state.set_mag_filter(MagFilter::Nearest);
        state.set_min_filter(MinFilter::NearestMipmapNearest);
        assert!(state.is_point_sampled());
        state.set_min_filter(MinFilter::NearestMipmapLinear);
        assert!(!state.is_point_sampled());
    }

    #[test]
    fn nearest_conversions() {
        assert_eq!(MinFilter::LinearMipmapLinear.to_nearest(), MinFilter::NearestMipmapLinear);
        assert_eq!(MinFilter::LinearMipmapLinear.to_nearest_mip(), MinFilter::LinearMipmapNearest);
        assert_eq!(MinFilter::Nearest.to_nearest_mip(), MinFilter::Nearest);
    }

    #[test]
    fn lod_changes_do_not_affect_completeness() {
        let a = SamplerState::default();
        let mut b = a.clone();
        b.set_max_lod(4.0);
        assert!(a.same_completeness(&b));
        b.set_wrap_s(WrapMode::ClampToEdge);
        assert!(!a.same_completeness(&b));
    }

    #[test]
    fn external_defaults_clamp() {
        let state = SamplerState::default_for_type(TextureType::External);
        assert_eq!(state.min_filter(), MinFilter::Linear);
        assert_eq!(state.wrap_s(), WrapMode::ClampToEdge);
    }
}
