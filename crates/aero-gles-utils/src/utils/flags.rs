//! Shader variant flags.
//!
//! Every utility shader is compiled into variants selected by a small set of flags. Each function
//! gets its own typed flags value; [`ShaderFlags::bits`] serializes it into the `u32` used as the
//! shader/pipeline cache key.

use aero_gles_texture::InternalFormat;

use crate::format::{NumericClass, VertexFormat};
use crate::hal::MAX_DRAW_BUFFERS;

/// IEEE-754 binary16 encoding of `1.0`.
pub const FLOAT16_ONE: u32 = half::f16::ONE.to_bits() as u32;
/// IEEE-754 binary32 encoding of `1.0`.
pub const FLOAT32_ONE: u32 = 1.0f32.to_bits();

pub trait ShaderFlags: Copy {
    fn bits(&self) -> u32;
}

fn class_bits(class: NumericClass) -> u32 {
    match class {
        NumericClass::Float => 0,
        NumericClass::Sint => 1,
        NumericClass::Uint => 2,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConvertIndexFlags {
    pub primitive_restart: bool,
    pub indirect: bool,
}

impl ShaderFlags for ConvertIndexFlags {
    fn bits(&self) -> u32 {
        u32::from(self.primitive_restart) | u32::from(self.indirect) << 1
    }
}

/// Width of the source indices of an indexed line-loop draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    pub fn bytes(self) -> u32 {
        match self {
            IndexWidth::U8 => 1,
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

impl ShaderFlags for IndexWidth {
    fn bits(&self) -> u32 {
        match self {
            IndexWidth::U8 => 0,
            IndexWidth::U16 => 1,
            IndexWidth::U32 => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConvertVertexFlags {
    SintToSint,
    UintToUint,
    SintToFloat,
    UintToFloat,
    SnormToFloat,
    UnormToFloat,
    FixedToFloat,
    FloatToFloat,
}

impl ConvertVertexFlags {
    /// Picks the conversion for reading `src` attributes and writing `dst` attributes.
    ///
    /// Same-class normalized and half-float conversions copy raw bits.
    pub fn for_formats(src: &VertexFormat, dst: &VertexFormat) -> Self {
        // Integer destinations only accept integers of the same signedness.
        assert!(!dst.is_sint() || src.is_sint(), "sint destination needs a sint source");
        assert!(!dst.is_uint() || src.is_uint(), "uint destination needs a uint source");
        assert!(!src.is_fixed() || dst.is_float(), "fixed source needs a float destination");

        if src.is_half_float() && dst.is_half_float() {
            return ConvertVertexFlags::UintToUint;
        }
        if (src.is_snorm() && dst.is_snorm()) || (src.is_unorm() && dst.is_unorm()) {
            assert_eq!(src.red_bits, dst.red_bits, "normalized copies keep the channel width");
            return ConvertVertexFlags::UintToUint;
        }
        if src.is_sint() && dst.is_sint() {
            ConvertVertexFlags::SintToSint
        } else if src.is_uint() && dst.is_uint() {
            ConvertVertexFlags::UintToUint
        } else if src.is_sint() {
            ConvertVertexFlags::SintToFloat
        } else if src.is_uint() {
            ConvertVertexFlags::UintToFloat
        } else if src.is_snorm() {
            ConvertVertexFlags::SnormToFloat
        } else if src.is_unorm() {
            ConvertVertexFlags::UnormToFloat
        } else if src.is_fixed() {
            ConvertVertexFlags::FixedToFloat
        } else {
            ConvertVertexFlags::FloatToFloat
        }
    }

    /// Raw value written into a destination alpha channel the source does not have.
    pub fn emulated_alpha(self, src: &VertexFormat, dst: &VertexFormat) -> u32 {
        let src_value_bits = if src.is_packed_1010102() {
            2
        } else {
            src.channel_bytes * 8
        };
        let src_value_mask = if src_value_bits == 32 {
            u32::MAX
        } else {
            (1u32 << src_value_bits) - 1
        };

        match self {
            ConvertVertexFlags::SintToSint
            | ConvertVertexFlags::SintToFloat
            | ConvertVertexFlags::UintToFloat => 1,
            ConvertVertexFlags::UintToUint => {
                if dst.is_snorm() {
                    src_value_mask >> 1
                } else if dst.is_unorm() {
                    src_value_mask
                } else if dst.is_half_float() {
                    FLOAT16_ONE
                } else {
                    1
                }
            }
            ConvertVertexFlags::SnormToFloat => src_value_mask >> 1,
            ConvertVertexFlags::UnormToFloat => src_value_mask,
            ConvertVertexFlags::FixedToFloat => 0x10000,
            ConvertVertexFlags::FloatToFloat => FLOAT32_ONE,
        }
    }
}

impl ShaderFlags for ConvertVertexFlags {
    fn bits(&self) -> u32 {
        *self as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageClearFlags {
    pub attachment_index: u32,
    pub class: NumericClass,
    pub clear_depth: bool,
}

impl ImageClearFlags {
    pub fn new(attachment_index: u32, format: InternalFormat, clear_depth: bool) -> Self {
        assert!((attachment_index as usize) < MAX_DRAW_BUFFERS);
        Self {
            attachment_index,
            class: NumericClass::of(format),
            clear_depth,
        }
    }
}

impl ShaderFlags for ImageClearFlags {
    fn bits(&self) -> u32 {
        self.attachment_index | class_bits(self.class) << 3 | u32::from(self.clear_depth) << 5
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SrcDimension {
    D2,
    D2Array,
    D3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageCopyFlags {
    pub src: NumericClass,
    pub dst: NumericClass,
    pub src_dimension: SrcDimension,
}

impl ShaderFlags for ImageCopyFlags {
    fn bits(&self) -> u32 {
        let dimension = match self.src_dimension {
            SrcDimension::D2 => 0,
            SrcDimension::D2Array => 1,
            SrcDimension::D3 => 2,
        };
        class_bits(self.src) | class_bits(self.dst) << 2 | dimension << 4
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CopyImageToBufferFlags {
    pub src_is_3d: bool,
}

impl CopyImageToBufferFlags {
    pub fn new(src_format: InternalFormat, src_is_3d: bool) -> Self {
        // Only the float variant exists.
        assert!(!src_format.info().is_integer(), "integer sources are not supported");
        Self { src_is_3d }
    }
}

impl ShaderFlags for CopyImageToBufferFlags {
    fn bits(&self) -> u32 {
        1 | u32::from(self.src_is_3d) << 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlitKind {
    Color(NumericClass),
    Depth,
    Stencil,
    DepthStencil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlitResolveFlags {
    pub kind: BlitKind,
    pub src_is_array: bool,
    pub is_resolve: bool,
}

impl BlitResolveFlags {
    pub fn new(
        color_format: Option<InternalFormat>,
        blit_depth: bool,
        blit_stencil: bool,
        src_layer_count: u32,
        src_samples: u32,
    ) -> Self {
        let kind = match color_format {
            Some(format) => BlitKind::Color(NumericClass::of(format)),
            None if blit_depth && blit_stencil => BlitKind::DepthStencil,
            None if blit_depth => BlitKind::Depth,
            None => BlitKind::Stencil,
        };
        Self {
            kind,
            src_is_array: src_layer_count > 1,
            is_resolve: src_samples > 1,
        }
    }
}

impl ShaderFlags for BlitResolveFlags {
    fn bits(&self) -> u32 {
        let kind = match self.kind {
            BlitKind::Color(NumericClass::Float) => 0,
            BlitKind::Color(NumericClass::Sint) => 1,
            BlitKind::Color(NumericClass::Uint) => 2,
            BlitKind::Depth => 3,
            BlitKind::Stencil => 4,
            BlitKind::DepthStencil => 5,
        };
        kind | u32::from(self.src_is_array) << 3 | u32::from(self.is_resolve) << 4
    }
}

/// Variant of the blit shader that samples a 3D source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Blit3DSrcFlags {
    pub class: NumericClass,
}

impl ShaderFlags for Blit3DSrcFlags {
    fn bits(&self) -> u32 {
        class_bits(self.class)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StencilNoExportFlags {
    pub src_is_array: bool,
    pub is_resolve: bool,
}

impl ShaderFlags for StencilNoExportFlags {
    fn bits(&self) -> u32 {
        u32::from(self.src_is_array) | u32::from(self.is_resolve) << 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MipmapPrecision {
    Rgba8,
    Rgba8UseHalf,
    Rgba16,
    Rgba16UseHalf,
    Rgba32F,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GenerateMipmapFlags {
    pub precision: MipmapPrecision,
    /// Number of levels one dispatch writes: 6, or 4 when storage images are limited.
    pub dest_size: u32,
}

impl GenerateMipmapFlags {
    pub fn new(actual: InternalFormat, supports_float16: bool, dest_size: u32) -> Self {
        assert!(dest_size == 4 || dest_size == 6);
        let red_bits = actual.info().red_bits;
        let precision = if red_bits <= 8 {
            if supports_float16 {
                MipmapPrecision::Rgba8UseHalf
            } else {
                MipmapPrecision::Rgba8
            }
        } else if red_bits <= 16 {
            if supports_float16 {
                MipmapPrecision::Rgba16UseHalf
            } else {
                MipmapPrecision::Rgba16
            }
        } else {
            MipmapPrecision::Rgba32F
        };
        Self {
            precision,
            dest_size,
        }
    }
}

impl ShaderFlags for GenerateMipmapFlags {
    fn bits(&self) -> u32 {
        let precision = match self.precision {
            MipmapPrecision::Rgba8 => 0,
            MipmapPrecision::Rgba8UseHalf => 1,
            MipmapPrecision::Rgba16 => 2,
            MipmapPrecision::Rgba16UseHalf => 3,
            MipmapPrecision::Rgba32F => 4,
        };
        precision | u32::from(self.dest_size == 6) << 3
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EtcToBcFlags {
    EtcRgba8ToBc3,
    EtcRg11ToBc5,
}

impl EtcToBcFlags {
    pub fn for_format(intended: InternalFormat) -> Option<Self> {
        use InternalFormat as I;

        match intended {
            I::Etc2Rgb8 | I::Etc2Srgb8 | I::Etc2Rgba8 => Some(EtcToBcFlags::EtcRgba8ToBc3),
            I::EacR11 | I::EacR11Snorm | I::EacRg11 | I::EacRg11Snorm => {
                Some(EtcToBcFlags::EtcRg11ToBc5)
            }
            _ => None,
        }
    }
}

impl ShaderFlags for EtcToBcFlags {
    fn bits(&self) -> u32 {
        *self as u32
    }
}

/// Type of one color input of the unresolve shader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UnresolveColorType {
    #[default]
    Unused = 0,
    Float = 1,
    Sint = 2,
    Uint = 3,
}

impl UnresolveColorType {
    pub fn of(format: InternalFormat) -> Self {
        match NumericClass::of(format) {
            NumericClass::Float => UnresolveColorType::Float,
            NumericClass::Sint => UnresolveColorType::Sint,
            NumericClass::Uint => UnresolveColorType::Uint,
        }
    }
}

/// Which attachments an unresolve fragment shader writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UnresolveFlags {
    pub colors: [UnresolveColorType; MAX_DRAW_BUFFERS],
    pub depth: bool,
    /// Stencil is written through shader stencil export.
    pub stencil: bool,
}

impl UnresolveFlags {
    pub const DEPTH_BIT: u32 = 16;
    pub const STENCIL_BIT: u32 = 17;

    pub fn color_count(&self) -> u32 {
        self.colors
            .iter()
            .filter(|&&ty| ty != UnresolveColorType::Unused)
            .count() as u32
    }

    pub fn input_count(&self) -> u32 {
        self.color_count() + u32::from(self.depth) + u32::from(self.stencil)
    }
}

impl ShaderFlags for UnresolveFlags {
    fn bits(&self) -> u32 {
        let mut bits = 0;
        for (i, ty) in self.colors.iter().enumerate() {
            bits |= (*ty as u32) << (2 * i);
        }
        if self.depth {
            bits |= 1 << Self::DEPTH_BIT;
        }
        if self.stencil {
            bits |= 1 << Self::STENCIL_BIT;
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{VertexKind, VertexPacking};

    fn vf(kind: VertexKind, channels: u32, bytes: u32) -> VertexFormat {
        VertexFormat::new(kind, channels, bytes)
    }

    #[test]
    fn same_class_normalized_copies_are_bitwise() {
        let src = vf(VertexKind::Unorm, 3, 1);
        let dst = vf(VertexKind::Unorm, 4, 1);
        let flags = ConvertVertexFlags::for_formats(&src, &dst);
        assert_eq!(flags, ConvertVertexFlags::UintToUint);
        assert_eq!(flags.emulated_alpha(&src, &dst), 0xFF);

        let src = vf(VertexKind::Snorm, 3, 2);
        let dst = vf(VertexKind::Snorm, 4, 2);
        let flags = ConvertVertexFlags::for_formats(&src, &dst);
        assert_eq!(flags, ConvertVertexFlags::UintToUint);
        assert_eq!(flags.emulated_alpha(&src, &dst), 0x7FFF);
    }

    #[test]
    fn half_to_half_uses_float16_one() {
        let src = vf(VertexKind::HalfFloat, 3, 2);
        let dst = vf(VertexKind::HalfFloat, 4, 2);
        let flags = ConvertVertexFlags::for_formats(&src, &dst);
        assert_eq!(flags, ConvertVertexFlags::UintToUint);
        assert_eq!(flags.emulated_alpha(&src, &dst), FLOAT16_ONE);
        assert_eq!(FLOAT16_ONE, 0x3C00);
    }

    #[test]
    fn conversions_to_float() {
        let dst = vf(VertexKind::Float, 4, 4);
        let cases = [
            (vf(VertexKind::Sint, 3, 2), ConvertVertexFlags::SintToFloat, 1),
            (vf(VertexKind::Uint, 3, 1), ConvertVertexFlags::UintToFloat, 1),
            (vf(VertexKind::Snorm, 3, 1), ConvertVertexFlags::SnormToFloat, 0x7F),
            (vf(VertexKind::Unorm, 3, 2), ConvertVertexFlags::UnormToFloat, 0xFFFF),
            (vf(VertexKind::Fixed, 3, 4), ConvertVertexFlags::FixedToFloat, 0x10000),
            (vf(VertexKind::Float, 3, 4), ConvertVertexFlags::FloatToFloat, FLOAT32_ONE),
        ];
        for (src, expected, alpha) in cases {
            let flags = ConvertVertexFlags::for_formats(&src, &dst);
            assert_eq!(flags, expected, "{src:?}");
            assert_eq!(flags.emulated_alpha(&src, &dst), alpha, "{src:?}");
        }
        assert_eq!(f32::from_bits(FLOAT32_ONE), 1.0);
    }

    #[test]
    fn packed_unorm_alpha_uses_two_bits() {
        let dst = vf(VertexKind::Float, 4, 4);
        for packing in [VertexPacking::A2Bgr10, VertexPacking::Rgb10A2] {
            let src = VertexFormat::packed_1010102(VertexKind::Unorm, packing);
            let flags = ConvertVertexFlags::for_formats(&src, &dst);
            assert_eq!(flags, ConvertVertexFlags::UnormToFloat);
            assert_eq!(flags.emulated_alpha(&src, &dst), 0b11, "{packing:?}");
        }
    }

    #[test]
    fn uint32_mask_does_not_overflow() {
        let src = vf(VertexKind::Uint, 3, 4);
        let dst = vf(VertexKind::Uint, 4, 4);
        assert_eq!(ConvertVertexFlags::for_formats(&src, &dst).emulated_alpha(&src, &dst), 1);
        let dst = vf(VertexKind::Unorm, 4, 4);
        assert_eq!(ConvertVertexFlags::UintToUint.emulated_alpha(&src, &dst), u32::MAX);
    }

    #[test]
    #[should_panic(expected = "sint destination needs a sint source")]
    fn sint_destination_rejects_float_source() {
        let src = vf(VertexKind::Float, 3, 4);
        let dst = vf(VertexKind::Sint, 4, 4);
        ConvertVertexFlags::for_formats(&src, &dst);
    }

    #[test]
    fn blit_flags_pick_kind_array_and_resolve() {
        let flags = BlitResolveFlags::new(Some(InternalFormat::Rgba8Ui), false, false, 1, 4);
        assert_eq!(flags.kind, BlitKind::Color(NumericClass::Uint));
        assert!(flags.is_resolve);
        assert!(!flags.src_is_array);

        let flags = BlitResolveFlags::new(None, true, true, 3, 1);
        assert_eq!(flags.kind, BlitKind::DepthStencil);
        assert!(flags.src_is_array);

        assert_eq!(BlitResolveFlags::new(None, false, true, 1, 1).kind, BlitKind::Stencil);
        assert_eq!(BlitResolveFlags::new(None, true, false, 1, 1).kind, BlitKind::Depth);
    }

    #[test]
    fn mipmap_precision_follows_red_bits() {
        let flags = GenerateMipmapFlags::new(InternalFormat::Rgba8, false, 6);
        assert_eq!(flags.precision, MipmapPrecision::Rgba8);
        let flags = GenerateMipmapFlags::new(InternalFormat::Rgba16F, true, 4);
        assert_eq!(flags.precision, MipmapPrecision::Rgba16UseHalf);
        let flags = GenerateMipmapFlags::new(InternalFormat::Rgba32F, true, 6);
        assert_eq!(flags.precision, MipmapPrecision::Rgba32F);
        assert_ne!(
            GenerateMipmapFlags::new(InternalFormat::Rgba8, false, 6).bits(),
            GenerateMipmapFlags::new(InternalFormat::Rgba8, false, 4).bits()
        );
    }

    #[test]
    fn unresolve_bits_pack_two_bits_per_attachment() {
        let mut flags = UnresolveFlags::default();
        flags.colors[0] = UnresolveColorType::Float;
        flags.colors[2] = UnresolveColorType::Uint;
        flags.depth = true;
        assert_eq!(flags.bits(), 0b1 | 0b11 << 4 | 1 << 16);
        assert_eq!(flags.input_count(), 3);
    }

    #[test]
    fn image_clear_flags_are_distinct_per_attachment() {
        let a = ImageClearFlags::new(0, InternalFormat::Rgba8, false);
        let b = ImageClearFlags::new(1, InternalFormat::Rgba8, false);
        let c = ImageClearFlags::new(0, InternalFormat::Rgba8I, false);
        let d = ImageClearFlags::new(0, InternalFormat::Rgba8, true);
        let bits = [a.bits(), b.bits(), c.bits(), d.bits()];
        for i in 0..bits.len() {
            for j in i + 1..bits.len() {
                assert_ne!(bits[i], bits[j]);
            }
        }
    }
}
