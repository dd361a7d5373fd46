//! Mapping from GL internal formats to what the backend actually allocates, plus the vertex
//! attribute formats the vertex conversion shader understands.
//!
//! Images carry two formats: the *intended* format the application asked for and the *actual*
//! format backing it. They differ when the backend emulates a format (RGB8 stored as RGBA8,
//! luminance stored as red, ETC decompressed to RGBA8), and several utility operations need to
//! know which channels exist only because of that emulation.

use aero_gles_texture::format::ComponentType;
use aero_gles_texture::InternalFormat;

use crate::hal::ImageAspects;

/// Integer-ness of a format as seen by a shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Float,
    Sint,
    Uint,
}

impl NumericClass {
    pub fn of(format: InternalFormat) -> Self {
        match format.info().component_type {
            ComponentType::Int => NumericClass::Sint,
            ComponentType::UnsignedInt => NumericClass::Uint,
            _ => NumericClass::Float,
        }
    }
}

pub fn is_sint(format: InternalFormat) -> bool {
    format.info().component_type == ComponentType::Int
}

pub fn is_uint(format: InternalFormat) -> bool {
    format.info().component_type == ComponentType::UnsignedInt
}

pub fn is_unorm(format: InternalFormat) -> bool {
    format.info().component_type == ComponentType::UnsignedNormalized
}

pub fn is_snorm(format: InternalFormat) -> bool {
    format.info().component_type == ComponentType::SignedNormalized
}

pub fn is_half_float(format: InternalFormat) -> bool {
    let info = format.info();
    info.component_type == ComponentType::Float && info.red_bits == 16
}

pub fn is_etc(format: InternalFormat) -> bool {
    matches!(
        format,
        InternalFormat::Etc2Rgb8
            | InternalFormat::Etc2Srgb8
            | InternalFormat::Etc2Rgba8
            | InternalFormat::EacR11
            | InternalFormat::EacR11Snorm
            | InternalFormat::EacRg11
            | InternalFormat::EacRg11Snorm
    )
}

/// Number of stored channels.
pub fn channel_count(format: InternalFormat) -> u32 {
    let info = format.info();
    [
        info.red_bits,
        info.green_bits,
        info.blue_bits,
        info.alpha_bits,
        info.luminance_bits,
        info.depth_bits,
        info.stencil_bits,
    ]
    .iter()
    .filter(|&&bits| bits > 0)
    .count() as u32
}

/// Format the backend allocates for `intended`.
pub fn actual_image_format(intended: InternalFormat) -> InternalFormat {
    use InternalFormat as I;

    match intended {
        I::Rgb8 | I::Rgb565 | I::Rgba4 | I::Rgb5A1 => I::Rgba8,
        I::Luminance8 | I::Alpha8 => I::R8,
        I::Luminance8Alpha8 => I::Rg8,
        I::Etc2Rgb8 | I::Etc2Rgba8 => I::Rgba8,
        I::Etc2Srgb8 => I::Srgb8Alpha8,
        I::EacR11 | I::EacR11Snorm => I::R16F,
        I::EacRg11 | I::EacRg11Snorm => I::Rgba16F,
        other => other,
    }
}

/// The wgpu format an actual image format is created with.
pub fn texture_format(actual: InternalFormat) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as T;
    use InternalFormat as I;

    Some(match actual {
        I::None => return None,
        I::R8 | I::Alpha8 | I::Luminance8 => T::R8Unorm,
        I::Rg8 | I::Luminance8Alpha8 => T::Rg8Unorm,
        I::Rgb8 | I::Rgba8 | I::Rgb565 | I::Rgba4 | I::Rgb5A1 => T::Rgba8Unorm,
        I::Srgb8Alpha8 => T::Rgba8UnormSrgb,
        I::Bgra8 => T::Bgra8Unorm,
        I::Rgb10A2 => T::Rgb10a2Unorm,
        I::R8Snorm => T::R8Snorm,
        I::Rgba8Snorm => T::Rgba8Snorm,
        I::R16F => T::R16Float,
        I::Rgba16F => T::Rgba16Float,
        I::R32F => T::R32Float,
        I::Rgba32F => T::Rgba32Float,
        I::R8I => T::R8Sint,
        I::R8Ui => T::R8Uint,
        I::R16I => T::R16Sint,
        I::R16Ui => T::R16Uint,
        I::R32I => T::R32Sint,
        I::R32Ui => T::R32Uint,
        I::Rgba8I => T::Rgba8Sint,
        I::Rgba8Ui => T::Rgba8Uint,
        I::Rgba32I => T::Rgba32Sint,
        I::Rgba32Ui => T::Rgba32Uint,
        I::DepthComponent16 => T::Depth16Unorm,
        I::DepthComponent24 => T::Depth24Plus,
        I::DepthComponent32F => T::Depth32Float,
        I::Depth24Stencil8 => T::Depth24PlusStencil8,
        I::Depth32FStencil8 => T::Depth32FloatStencil8,
        I::StencilIndex8 => T::Stencil8,
        I::Etc2Rgb8 => T::Etc2Rgb8Unorm,
        I::Etc2Srgb8 => T::Etc2Rgb8UnormSrgb,
        I::Etc2Rgba8 => T::Etc2Rgba8Unorm,
        I::EacR11 => T::EacR11Unorm,
        I::EacR11Snorm => T::EacR11Snorm,
        I::EacRg11 => T::EacRg11Unorm,
        I::EacRg11Snorm => T::EacRg11Snorm,
    })
}

/// BC format an ETC/EAC image is transcoded into when the device cannot sample ETC directly.
pub fn etc_transcode_target(intended: InternalFormat) -> Option<wgpu::TextureFormat> {
    use InternalFormat as I;

    match intended {
        I::Etc2Rgb8 | I::Etc2Rgba8 => Some(wgpu::TextureFormat::Bc3RgbaUnorm),
        I::Etc2Srgb8 => Some(wgpu::TextureFormat::Bc3RgbaUnormSrgb),
        I::EacR11 | I::EacRg11 => Some(wgpu::TextureFormat::Bc5RgUnorm),
        I::EacR11Snorm | I::EacRg11Snorm => Some(wgpu::TextureFormat::Bc5RgSnorm),
        _ => None,
    }
}

pub fn aspects(format: InternalFormat) -> ImageAspects {
    let info = format.info();
    let mut aspects = ImageAspects::empty();
    if info.depth_bits > 0 {
        aspects |= ImageAspects::DEPTH;
    }
    if info.stencil_bits > 0 {
        aspects |= ImageAspects::STENCIL;
    }
    if aspects.is_empty() && format != InternalFormat::None {
        aspects = ImageAspects::COLOR;
    }
    aspects
}

/// Whether the backend can render to `actual` as a color attachment.
pub fn is_color_renderable(actual: InternalFormat) -> bool {
    let info = actual.info();
    !info.compressed
        && !info.is_depth_or_stencil()
        && info.component_type != ComponentType::SignedNormalized
        && actual != InternalFormat::None
}

/// Whether `actual` carries channels `intended` does not have.
pub fn has_emulated_channels(intended: InternalFormat, actual: InternalFormat) -> bool {
    let intended_info = intended.info();
    let actual_info = actual.info();

    (intended_info.luminance_bits > 0 || intended == InternalFormat::Alpha8)
        || (intended_info.green_bits == 0 && actual_info.green_bits > 0)
        || (intended_info.blue_bits == 0 && actual_info.blue_bits > 0)
        || (intended_info.alpha_bits == 0 && actual_info.alpha_bits > 0)
}

/// Mask of channels (green = 2, blue = 4, alpha = 8) that exist in `actual` only through
/// emulation and must read back as their default value.
pub fn default_channels_mask(intended: InternalFormat, actual: InternalFormat) -> u32 {
    let intended_info = intended.info();
    let actual_info = actual.info();

    let mut mask = 0;
    if intended_info.green_bits == 0 && actual_info.green_bits > 0 {
        mask |= 2;
    }
    if intended_info.blue_bits == 0 && actual_info.blue_bits > 0 {
        mask |= 4;
    }
    if intended_info.alpha_bits == 0 && actual_info.alpha_bits > 0 {
        mask |= 8;
    }
    mask
}

/// Component interpretation of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Unorm,
    Snorm,
    Uint,
    Sint,
    /// 16.16 fixed point.
    Fixed,
    HalfFloat,
    Float,
}

/// Channel order of a 32-bit `10-10-10-2` packed vertex attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexPacking {
    #[default]
    None,
    /// Alpha in the top two bits, red in the low ten (`INT_2_10_10_10_REV`).
    A2Bgr10,
    /// Red in the top ten bits, alpha in the low two.
    Rgb10A2,
}

/// A vertex attribute format as consumed by the vertex conversion shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    pub kind: VertexKind,
    pub channel_count: u32,
    /// Bytes per channel; packed formats report one byte per channel.
    pub channel_bytes: u32,
    pub red_bits: u32,
    pub packing: VertexPacking,
}

impl VertexFormat {
    pub const fn new(kind: VertexKind, channel_count: u32, channel_bytes: u32) -> Self {
        Self {
            kind,
            channel_count,
            channel_bytes,
            red_bits: channel_bytes * 8,
            packing: VertexPacking::None,
        }
    }

    pub const fn packed_1010102(kind: VertexKind, packing: VertexPacking) -> Self {
        Self {
            kind,
            channel_count: 4,
            channel_bytes: 1,
            red_bits: 10,
            packing,
        }
    }

    pub fn is_packed_1010102(&self) -> bool {
        self.packing != VertexPacking::None
    }

    pub fn is_sint(&self) -> bool {
        self.kind == VertexKind::Sint
    }

    pub fn is_uint(&self) -> bool {
        self.kind == VertexKind::Uint
    }

    pub fn is_snorm(&self) -> bool {
        self.kind == VertexKind::Snorm
    }

    pub fn is_unorm(&self) -> bool {
        self.kind == VertexKind::Unorm
    }

    pub fn is_fixed(&self) -> bool {
        self.kind == VertexKind::Fixed
    }

    pub fn is_half_float(&self) -> bool {
        self.kind == VertexKind::HalfFloat
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, VertexKind::Float | VertexKind::HalfFloat)
    }

    pub fn pixel_bytes(&self) -> u32 {
        self.channel_count * self.channel_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb8_is_emulated_with_alpha() {
        let actual = actual_image_format(InternalFormat::Rgb8);
        assert_eq!(actual, InternalFormat::Rgba8);
        assert!(has_emulated_channels(InternalFormat::Rgb8, actual));
        assert_eq!(default_channels_mask(InternalFormat::Rgb8, actual), 8);
    }

    #[test]
    fn red_only_formats_default_green_blue_alpha() {
        assert_eq!(default_channels_mask(InternalFormat::R8, InternalFormat::Rgba8), 2 | 4 | 8);
        assert_eq!(default_channels_mask(InternalFormat::Rgba8, InternalFormat::Rgba8), 0);
    }

    #[test]
    fn numeric_class_follows_component_type() {
        assert_eq!(NumericClass::of(InternalFormat::Rgba8I), NumericClass::Sint);
        assert_eq!(NumericClass::of(InternalFormat::R32Ui), NumericClass::Uint);
        assert_eq!(NumericClass::of(InternalFormat::Rgba8Snorm), NumericClass::Float);
        assert_eq!(NumericClass::of(InternalFormat::Rgba16F), NumericClass::Float);
    }

    #[test]
    fn depth_stencil_aspects() {
        assert_eq!(
            aspects(InternalFormat::Depth24Stencil8),
            ImageAspects::DEPTH | ImageAspects::STENCIL
        );
        assert_eq!(aspects(InternalFormat::StencilIndex8), ImageAspects::STENCIL);
        assert_eq!(aspects(InternalFormat::Rgba8), ImageAspects::COLOR);
    }
}
