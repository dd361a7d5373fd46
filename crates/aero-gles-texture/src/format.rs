//! GLES internal format table.
//!
//! Only the subset of formats the texture model needs to reason about completeness, memory
//! accounting and renderability is described here. Legacy unsized formats (`RGBA` +
//! `UNSIGNED_BYTE`, `DEPTH_COMPONENT` + `FLOAT`, ...) resolve to a sized entry but keep
//! `sized == false` so completeness rules that only apply to sized formats can tell them apart.

use crate::caps::{ClientVersion, Extensions};

/// Sized internal formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    #[default]
    None,
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Srgb8Alpha8,
    Bgra8,
    Rgb565,
    Rgba4,
    Rgb5A1,
    Rgb10A2,
    R8Snorm,
    Rgba8Snorm,
    R16F,
    Rgba16F,
    R32F,
    Rgba32F,
    R8I,
    R8Ui,
    R16I,
    R16Ui,
    R32I,
    R32Ui,
    Rgba8I,
    Rgba8Ui,
    Rgba32I,
    Rgba32Ui,
    Alpha8,
    Luminance8,
    Luminance8Alpha8,
    DepthComponent16,
    DepthComponent24,
    DepthComponent32F,
    Depth24Stencil8,
    Depth32FStencil8,
    StencilIndex8,
    Etc2Rgb8,
    Etc2Srgb8,
    Etc2Rgba8,
    EacR11,
    EacR11Snorm,
    EacRg11,
    EacRg11Snorm,
}

/// Base formats accepted by the legacy unsized upload path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnsizedFormat {
    Rgba,
    Rgb,
    Bgra,
    Alpha,
    Luminance,
    LuminanceAlpha,
    DepthComponent,
    DepthStencil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    HalfFloat,
    Float,
    UnsignedShort565,
    UnsignedShort4444,
    UnsignedShort5551,
    UnsignedInt248,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComponentType {
    #[default]
    None,
    UnsignedNormalized,
    SignedNormalized,
    Float,
    Int,
    UnsignedInt,
}

/// Which aspect a format exposes when sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseFormat {
    None,
    Color,
    DepthComponent,
    DepthStencil,
    StencilIndex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum FilterSupport {
    Always,
    Never,
    /// Core in ES 3.0, otherwise behind `OES_texture_half_float_linear`.
    HalfFloat,
    /// Always behind `OES_texture_float_linear`.
    Float32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum RenderSupport {
    Always,
    Never,
    Es3,
    ColorBufferFloat,
    Bgra8,
}

/// Static description of one internal format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatInfo {
    pub sized_internal_format: InternalFormat,
    pub sized: bool,
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,
    pub luminance_bits: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub pixel_bytes: u32,
    pub component_type: ComponentType,
    pub srgb: bool,
    /// Compressed formats store `block_bytes` per 4x4 block instead of `pixel_bytes` per texel.
    pub compressed: bool,
    pub block_bytes: u32,
    filter: FilterSupport,
    render: RenderSupport,
}

impl FormatInfo {
    const NONE: FormatInfo = FormatInfo {
        sized_internal_format: InternalFormat::None,
        sized: false,
        red_bits: 0,
        green_bits: 0,
        blue_bits: 0,
        alpha_bits: 0,
        luminance_bits: 0,
        depth_bits: 0,
        stencil_bits: 0,
        pixel_bytes: 0,
        component_type: ComponentType::None,
        srgb: false,
        compressed: false,
        block_bytes: 0,
        filter: FilterSupport::Never,
        render: RenderSupport::Never,
    };

    pub fn is_depth_or_stencil(&self) -> bool {
        self.depth_bits > 0 || self.stencil_bits > 0
    }

    pub fn base_format(&self) -> BaseFormat {
        match (self.depth_bits > 0, self.stencil_bits > 0) {
            (true, true) => BaseFormat::DepthStencil,
            (true, false) => BaseFormat::DepthComponent,
            (false, true) => BaseFormat::StencilIndex,
            (false, false) if self.sized_internal_format == InternalFormat::None => {
                BaseFormat::None
            }
            (false, false) => BaseFormat::Color,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.component_type, ComponentType::Int | ComponentType::UnsignedInt)
    }

    pub fn filter_support(&self, version: ClientVersion, extensions: Extensions) -> bool {
        match self.filter {
            FilterSupport::Always => true,
            FilterSupport::Never => false,
            FilterSupport::HalfFloat => {
                version >= ClientVersion::ES_3_0
                    || extensions.contains(Extensions::TEXTURE_HALF_FLOAT_LINEAR)
            }
            FilterSupport::Float32 => extensions.contains(Extensions::TEXTURE_FLOAT_LINEAR),
        }
    }

    pub fn texture_attachment_support(
        &self,
        version: ClientVersion,
        extensions: Extensions,
    ) -> bool {
        match self.render {
            RenderSupport::Always => true,
            RenderSupport::Never => false,
            RenderSupport::Es3 => version >= ClientVersion::ES_3_0,
            RenderSupport::ColorBufferFloat => extensions.contains(Extensions::COLOR_BUFFER_FLOAT),
            RenderSupport::Bgra8 => extensions.contains(Extensions::TEXTURE_FORMAT_BGRA8888),
        }
    }

    /// Bytes needed for one image of `width x height x depth` texels (single sample).
    pub fn image_bytes(&self, width: u32, height: u32, depth: u32) -> u64 {
        if self.compressed {
            let blocks_x = u64::from(width.div_ceil(4));
            let blocks_y = u64::from(height.div_ceil(4));
            blocks_x
                .saturating_mul(blocks_y)
                .saturating_mul(u64::from(self.block_bytes))
                .saturating_mul(u64::from(depth))
        } else {
            u64::from(self.pixel_bytes)
                .saturating_mul(u64::from(width))
                .saturating_mul(u64::from(height))
                .saturating_mul(u64::from(depth))
        }
    }
}

struct Bits {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

const fn color(
    format: InternalFormat,
    bits: Bits,
    pixel_bytes: u32,
    component_type: ComponentType,
    filter: FilterSupport,
    render: RenderSupport,
) -> FormatInfo {
    FormatInfo {
        sized_internal_format: format,
        sized: true,
        red_bits: bits.r,
        green_bits: bits.g,
        blue_bits: bits.b,
        alpha_bits: bits.a,
        luminance_bits: 0,
        depth_bits: 0,
        stencil_bits: 0,
        pixel_bytes,
        component_type,
        srgb: false,
        compressed: false,
        block_bytes: 0,
        filter,
        render,
    }
}

const fn depth_stencil(
    format: InternalFormat,
    depth: u8,
    stencil: u8,
    pixel_bytes: u32,
) -> FormatInfo {
    FormatInfo {
        sized_internal_format: format,
        sized: true,
        red_bits: 0,
        green_bits: 0,
        blue_bits: 0,
        alpha_bits: 0,
        luminance_bits: 0,
        depth_bits: depth,
        stencil_bits: stencil,
        pixel_bytes,
        component_type: if depth == 0 {
            ComponentType::UnsignedInt
        } else if matches!(
            format,
            InternalFormat::DepthComponent32F | InternalFormat::Depth32FStencil8
        ) {
            ComponentType::Float
        } else {
            ComponentType::UnsignedNormalized
        },
        srgb: false,
        compressed: false,
        block_bytes: 0,
        filter: FilterSupport::Never,
        render: RenderSupport::Always,
    }
}

const fn etc(format: InternalFormat, bits: Bits, block_bytes: u32, signed: bool) -> FormatInfo {
    FormatInfo {
        sized_internal_format: format,
        sized: true,
        red_bits: bits.r,
        green_bits: bits.g,
        blue_bits: bits.b,
        alpha_bits: bits.a,
        luminance_bits: 0,
        depth_bits: 0,
        stencil_bits: 0,
        pixel_bytes: 0,
        component_type: if signed {
            ComponentType::SignedNormalized
        } else {
            ComponentType::UnsignedNormalized
        },
        srgb: false,
        compressed: true,
        block_bytes,
        filter: FilterSupport::Always,
        render: RenderSupport::Never,
    }
}

const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Bits {
    Bits { r, g, b, a }
}

impl InternalFormat {
    pub fn info(self) -> FormatInfo {
        use ComponentType as C;
        use FilterSupport as F;
        use InternalFormat as I;
        use RenderSupport as R;

        match self {
            I::None => FormatInfo::NONE,
            I::R8 => color(self, rgba(8, 0, 0, 0), 1, C::UnsignedNormalized, F::Always, R::Es3),
            I::Rg8 => color(self, rgba(8, 8, 0, 0), 2, C::UnsignedNormalized, F::Always, R::Es3),
            I::Rgb8 => {
                color(self, rgba(8, 8, 8, 0), 3, C::UnsignedNormalized, F::Always, R::Always)
            }
            I::Rgba8 => {
                color(self, rgba(8, 8, 8, 8), 4, C::UnsignedNormalized, F::Always, R::Always)
            }
            I::Srgb8Alpha8 => FormatInfo {
                srgb: true,
                ..color(self, rgba(8, 8, 8, 8), 4, C::UnsignedNormalized, F::Always, R::Es3)
            },
            I::Bgra8 => {
                color(self, rgba(8, 8, 8, 8), 4, C::UnsignedNormalized, F::Always, R::Bgra8)
            }
            I::Rgb565 => {
                color(self, rgba(5, 6, 5, 0), 2, C::UnsignedNormalized, F::Always, R::Always)
            }
            I::Rgba4 => {
                color(self, rgba(4, 4, 4, 4), 2, C::UnsignedNormalized, F::Always, R::Always)
            }
            I::Rgb5A1 => {
                color(self, rgba(5, 5, 5, 1), 2, C::UnsignedNormalized, F::Always, R::Always)
            }
            I::Rgb10A2 => {
                color(self, rgba(10, 10, 10, 2), 4, C::UnsignedNormalized, F::Always, R::Es3)
            }
            I::R8Snorm => {
                color(self, rgba(8, 0, 0, 0), 1, C::SignedNormalized, F::Always, R::Never)
            }
            I::Rgba8Snorm => {
                color(self, rgba(8, 8, 8, 8), 4, C::SignedNormalized, F::Always, R::Never)
            }
            I::R16F => {
                color(self, rgba(16, 0, 0, 0), 2, C::Float, F::HalfFloat, R::ColorBufferFloat)
            }
            I::Rgba16F => {
                color(self, rgba(16, 16, 16, 16), 8, C::Float, F::HalfFloat, R::ColorBufferFloat)
            }
            I::R32F => color(self, rgba(32, 0, 0, 0), 4, C::Float, F::Float32, R::ColorBufferFloat),
            I::Rgba32F => {
                color(self, rgba(32, 32, 32, 32), 16, C::Float, F::Float32, R::ColorBufferFloat)
            }
            I::R8I => color(self, rgba(8, 0, 0, 0), 1, C::Int, F::Never, R::Es3),
            I::R8Ui => color(self, rgba(8, 0, 0, 0), 1, C::UnsignedInt, F::Never, R::Es3),
            I::R16I => color(self, rgba(16, 0, 0, 0), 2, C::Int, F::Never, R::Es3),
            I::R16Ui => color(self, rgba(16, 0, 0, 0), 2, C::UnsignedInt, F::Never, R::Es3),
            I::R32I => color(self, rgba(32, 0, 0, 0), 4, C::Int, F::Never, R::Es3),
            I::R32Ui => color(self, rgba(32, 0, 0, 0), 4, C::UnsignedInt, F::Never, R::Es3),
            I::Rgba8I => color(self, rgba(8, 8, 8, 8), 4, C::Int, F::Never, R::Es3),
            I::Rgba8Ui => color(self, rgba(8, 8, 8, 8), 4, C::UnsignedInt, F::Never, R::Es3),
            I::Rgba32I => color(self, rgba(32, 32, 32, 32), 16, C::Int, F::Never, R::Es3),
            I::Rgba32Ui => color(self, rgba(32, 32, 32, 32), 16, C::UnsignedInt, F::Never, R::Es3),
            I::Alpha8 => {
                color(self, rgba(0, 0, 0, 8), 1, C::UnsignedNormalized, F::Always, R::Never)
            }
            I::Luminance8 => FormatInfo {
                luminance_bits: 8,
                ..color(self, rgba(0, 0, 0, 0), 1, C::UnsignedNormalized, F::Always, R::Never)
            },
            I::Luminance8Alpha8 => FormatInfo {
                luminance_bits: 8,
                ..color(self, rgba(0, 0, 0, 8), 2, C::UnsignedNormalized, F::Always, R::Never)
            },
            I::DepthComponent16 => depth_stencil(self, 16, 0, 2),
            I::DepthComponent24 => depth_stencil(self, 24, 0, 4),
            I::DepthComponent32F => depth_stencil(self, 32, 0, 4),
            I::Depth24Stencil8 => depth_stencil(self, 24, 8, 4),
            I::Depth32FStencil8 => depth_stencil(self, 32, 8, 8),
            I::StencilIndex8 => depth_stencil(self, 0, 8, 1),
            I::Etc2Rgb8 => etc(self, rgba(8, 8, 8, 0), 8, false),
            I::Etc2Srgb8 => FormatInfo {
                srgb: true,
                ..etc(self, rgba(8, 8, 8, 0), 8, false)
            },
            I::Etc2Rgba8 => etc(self, rgba(8, 8, 8, 8), 16, false),
            I::EacR11 => etc(self, rgba(11, 0, 0, 0), 8, false),
            I::EacR11Snorm => etc(self, rgba(11, 0, 0, 0), 8, true),
            I::EacRg11 => etc(self, rgba(11, 11, 0, 0), 16, false),
            I::EacRg11Snorm => etc(self, rgba(11, 11, 0, 0), 16, true),
        }
    }
}

/// The format recorded in an image description.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Format {
    sized_format: InternalFormat,
    legacy_unsized: bool,
}

impl Format {
    pub const NONE: Format = Format {
        sized_format: InternalFormat::None,
        legacy_unsized: false,
    };

    pub fn new(format: InternalFormat) -> Self {
        Self {
            sized_format: format,
            legacy_unsized: false,
        }
    }

    /// Resolves a legacy `(format, type)` pair. Returns `None` for combinations the table does not
    /// describe.
    pub fn from_unsized(format: UnsizedFormat, ty: PixelType) -> Option<Self> {
        use InternalFormat as I;
        use PixelType as T;
        use UnsizedFormat as U;

        let sized_format = match (format, ty) {
            (U::Rgba, T::UnsignedByte) => I::Rgba8,
            (U::Rgba, T::HalfFloat) => I::Rgba16F,
            (U::Rgba, T::Float) => I::Rgba32F,
            (U::Rgba, T::UnsignedShort4444) => I::Rgba4,
            (U::Rgba, T::UnsignedShort5551) => I::Rgb5A1,
            (U::Rgb, T::UnsignedByte) => I::Rgb8,
            (U::Rgb, T::UnsignedShort565) => I::Rgb565,
            (U::Bgra, T::UnsignedByte) => I::Bgra8,
            (U::Alpha, T::UnsignedByte) => I::Alpha8,
            (U::Luminance, T::UnsignedByte) => I::Luminance8,
            (U::LuminanceAlpha, T::UnsignedByte) => I::Luminance8Alpha8,
            (U::DepthComponent, T::UnsignedShort) => I::DepthComponent16,
            (U::DepthComponent, T::UnsignedInt) => I::DepthComponent24,
            (U::DepthComponent, T::Float) => I::DepthComponent32F,
            (U::DepthStencil, T::UnsignedInt248) => I::Depth24Stencil8,
            _ => return None,
        };
        Some(Self {
            sized_format,
            legacy_unsized: true,
        })
    }

    pub fn sized_internal_format(&self) -> InternalFormat {
        self.sized_format
    }

    pub fn is_valid(&self) -> bool {
        self.sized_format != InternalFormat::None
    }

    pub fn info(&self) -> FormatInfo {
        let mut info = self.sized_format.info();
        if self.legacy_unsized {
            info.sized = false;
        }
        info
    }

    /// Two formats are "same sized" when they resolve to the same sized internal format.
    pub fn same_sized(a: &Format, b: &Format) -> bool {
        a.sized_format == b.sized_format
    }
}

impl From<InternalFormat> for Format {
    fn from(format: InternalFormat) -> Self {
        Format::new(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsized_rgba_is_same_sized_as_rgba8() {
        let legacy = Format::from_unsized(UnsizedFormat::Rgba, PixelType::UnsignedByte).unwrap();
        assert!(Format::same_sized(&legacy, &Format::new(InternalFormat::Rgba8)));
        assert!(!legacy.info().sized);
        assert!(Format::new(InternalFormat::Rgba8).info().sized);
    }

    #[test]
    fn float_filtering_requires_extension() {
        let info = InternalFormat::Rgba32F.info();
        assert!(!info.filter_support(ClientVersion::ES_3_0, Extensions::empty()));
        assert!(info.filter_support(ClientVersion::ES_3_0, Extensions::TEXTURE_FLOAT_LINEAR));

        let half = InternalFormat::Rgba16F.info();
        assert!(!half.filter_support(ClientVersion::ES_2_0, Extensions::empty()));
        assert!(half.filter_support(ClientVersion::ES_3_0, Extensions::empty()));
    }

    #[test]
    fn integer_formats_never_filter() {
        assert!(!InternalFormat::Rgba8Ui
            .info()
            .filter_support(ClientVersion::ES_3_2, Extensions::all()));
    }

    #[test]
    fn compressed_image_bytes_round_up_to_blocks() {
        let info = InternalFormat::Etc2Rgba8.info();
        assert_eq!(info.image_bytes(5, 5, 1), 2 * 2 * 16);
    }

    #[test]
    fn base_formats() {
        assert_eq!(InternalFormat::Depth24Stencil8.info().base_format(), BaseFormat::DepthStencil);
        assert_eq!(InternalFormat::StencilIndex8.info().base_format(), BaseFormat::StencilIndex);
        assert_eq!(InternalFormat::None.info().base_format(), BaseFormat::None);
    }
}
