//! Push-constant blocks shared with the utility shaders, and the caller-facing parameter structs.
//!
//! The `*ShaderParams` structs are `#[repr(C)]` and uploaded verbatim; their sizes are pinned
//! with compile-time assertions since the shaders declare the same layouts.

use aero_gles_texture::{InternalFormat, Rectangle};
use bytemuck::{Pod, Zeroable};

use crate::format::VertexFormat;
use crate::hal::{ClearValue, ImageAspects};
use crate::utils::flags::IndexWidth;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ConvertIndexShaderParams {
    pub src_offset: u32,
    pub dst_offset_div4: u32,
    pub max_index: u32,
    pub _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ConvertIndexIndirectShaderParams {
    pub src_indirect_offset_div4: u32,
    pub src_offset: u32,
    pub dst_offset_div4: u32,
    pub max_index: u32,
    pub dst_indirect_offset_div4: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ConvertIndexIndirectLineLoopShaderParams {
    pub cmd_offset_div4: u32,
    pub dst_cmd_offset_div4: u32,
    pub src_offset: u32,
    pub dst_offset_div4: u32,
    pub is_restart_enabled: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ConvertIndirectLineLoopShaderParams {
    pub cmd_offset_div4: u32,
    pub dst_cmd_offset_div4: u32,
    pub dst_offset_div4: u32,
}

/// Vertex conversion layout. `n*` are channel counts, `b*` bytes per channel, `s*` strides and
/// `e*` channels per 32-bit word for source and destination.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ConvertVertexShaderParams {
    pub output_count: u32,
    pub component_count: u32,
    pub src_offset: u32,
    pub dst_offset: u32,
    pub ns: u32,
    pub bs: u32,
    pub ss: u32,
    pub es: u32,
    pub nd: u32,
    pub bd: u32,
    pub sd: u32,
    pub ed: u32,
    pub src_emulated_alpha: u32,
    pub is_src_hdr: u32,
    pub is_src_a2bgr10: u32,
    pub _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ImageClearShaderParams {
    /// Raw clear color; interpreted as float, int or uint by the shader variant.
    pub clear_value: [u32; 4],
    pub clear_depth: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ImageCopyShaderParams {
    pub src_offset: [i32; 2],
    pub dst_offset: [i32; 2],
    pub src_mip: i32,
    pub src_layer: i32,
    pub src_sample_count: u32,
    pub src_has_luminance: u32,
    pub src_is_alpha: u32,
    pub src_is_srgb: u32,
    pub dst_is_srgb: u32,
    pub dst_default_channels_mask: u32,
    pub flip_x: u32,
    pub flip_y: u32,
    pub premultiply_alpha: u32,
    pub unmultiply_alpha: u32,
    pub dst_has_luminance: u32,
    pub dst_is_alpha: u32,
    pub rotate_xy: u32,
    pub _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CopyImageToBufferShaderParams {
    pub src_offset: [i32; 2],
    pub src_depth: i32,
    pub reverse_row_order: u32,
    pub size: [u32; 2],
    pub output_offset: u32,
    pub output_pitch: u32,
    pub is_dst_snorm: u32,
    pub _padding: [u32; 3],
}

/// Blit and resolve share one block; `offset` holds two `f32` bit patterns for blits and two
/// `i32` values for resolves.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BlitResolveShaderParams {
    pub offset: [u32; 2],
    pub stretch: [f32; 2],
    pub inv_src_extent: [f32; 2],
    pub src_layer: i32,
    pub samples: i32,
    pub inv_samples: f32,
    pub output_mask: u32,
    pub flip_x: u32,
    pub flip_y: u32,
    pub rotate_xy: u32,
    pub _padding: [u32; 3],
}

impl BlitResolveShaderParams {
    pub fn set_blit_offset(&mut self, x: f32, y: f32) {
        self.offset = [x.to_bits(), y.to_bits()];
    }

    pub fn set_resolve_offset(&mut self, x: i32, y: i32) {
        self.offset = [x as u32, y as u32];
    }

    pub fn blit_offset(&self) -> [f32; 2] {
        [f32::from_bits(self.offset[0]), f32::from_bits(self.offset[1])]
    }

    pub fn resolve_offset(&self) -> [i32; 2] {
        [self.offset[0] as i32, self.offset[1] as i32]
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BlitResolveStencilNoExportShaderParams {
    pub offset: [u32; 2],
    pub stretch: [f32; 2],
    pub inv_src_extent: [f32; 2],
    pub src_layer: i32,
    pub src_width: i32,
    pub blit_area: [i32; 4],
    pub dst_pitch: u32,
    pub flip_x: u32,
    pub flip_y: u32,
    pub rotate_xy: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExportStencilShaderParams {
    pub bit: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OverlayDrawShaderParams {
    pub viewport_size: [u32; 2],
    pub is_text: u32,
    pub rotate_xy: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GenerateMipmapShaderParams {
    pub inv_src_extent: [f32; 2],
    pub level_count: u32,
    pub _padding: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct EtcToBcShaderParams {
    pub offset_x: u32,
    pub offset_y: u32,
    pub texel_offset: i32,
    pub width: u32,
    pub height: u32,
    pub alpha_bits: u32,
    pub is_signed: u32,
    pub is_eac_rg: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FocalPoint {
    pub focus_x: f32,
    pub focus_y: f32,
    pub gain_x: f32,
    pub gain_y: f32,
    pub fovea_area: f32,
    pub _padding: [f32; 3],
}

pub const MAX_FOCAL_POINTS: usize = 2;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GenerateFragmentShadingRateShaderParams {
    pub texture_width: u32,
    pub texture_height: u32,
    pub attachment_width: u32,
    pub attachment_height: u32,
    pub attachment_block_width: u32,
    pub attachment_block_height: u32,
    pub num_focal_points: u32,
    pub _padding: u32,
    pub focal_points: [FocalPoint; MAX_FOCAL_POINTS],
}

const _: [(); 16] = [(); core::mem::size_of::<ConvertIndexShaderParams>()];
const _: [(); 20] = [(); core::mem::size_of::<ConvertIndexIndirectShaderParams>()];
const _: [(); 20] = [(); core::mem::size_of::<ConvertIndexIndirectLineLoopShaderParams>()];
const _: [(); 12] = [(); core::mem::size_of::<ConvertIndirectLineLoopShaderParams>()];
const _: [(); 64] = [(); core::mem::size_of::<ConvertVertexShaderParams>()];
const _: [(); 20] = [(); core::mem::size_of::<ImageClearShaderParams>()];
const _: [(); 80] = [(); core::mem::size_of::<ImageCopyShaderParams>()];
const _: [(); 48] = [(); core::mem::size_of::<CopyImageToBufferShaderParams>()];
const _: [(); 64] = [(); core::mem::size_of::<BlitResolveShaderParams>()];
const _: [(); 64] = [(); core::mem::size_of::<BlitResolveStencilNoExportShaderParams>()];
const _: [(); 4] = [(); core::mem::size_of::<ExportStencilShaderParams>()];
const _: [(); 16] = [(); core::mem::size_of::<OverlayDrawShaderParams>()];
const _: [(); 16] = [(); core::mem::size_of::<GenerateMipmapShaderParams>()];
const _: [(); 32] = [(); core::mem::size_of::<EtcToBcShaderParams>()];
const _: [(); 96] = [(); core::mem::size_of::<GenerateFragmentShadingRateShaderParams>()];

/// Pre-rotation applied to a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SurfaceRotation {
    #[default]
    Identity,
    Rotated90Degrees,
    Rotated180Degrees,
    Rotated270Degrees,
}

impl SurfaceRotation {
    pub fn is_rotated_aspect_ratio(self) -> bool {
        matches!(
            self,
            SurfaceRotation::Rotated90Degrees | SurfaceRotation::Rotated270Degrees
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertIndexParameters {
    pub src_offset: u32,
    pub dst_offset: u32,
    pub max_index: u32,
    pub primitive_restart: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertIndexIndirectParameters {
    pub src_indirect_buffer_offset: u32,
    pub src_index_buffer_offset: u32,
    pub dst_index_buffer_offset: u32,
    pub max_index: u32,
    pub dst_indirect_buffer_offset: u32,
    pub primitive_restart: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertLineLoopIndexIndirectParameters {
    pub indirect_buffer_offset: u32,
    pub dst_indirect_buffer_offset: u32,
    pub src_index_buffer_offset: u32,
    pub dst_index_buffer_offset: u32,
    pub index_width: IndexWidth,
    pub primitive_restart: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertLineLoopArrayIndirectParameters {
    pub indirect_buffer_offset: u32,
    pub dst_indirect_buffer_offset: u32,
    pub dst_index_buffer_offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertVertexParameters {
    pub vertex_count: usize,
    pub src_format: VertexFormat,
    pub dst_format: VertexFormat,
    pub src_stride: usize,
    pub src_offset: usize,
    pub dst_offset: usize,
}

/// One extra range converted with the same pipeline and descriptor set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffsetAndVertexCount {
    pub src_offset: u32,
    pub dst_offset: u32,
    pub vertex_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearFramebufferParameters {
    pub clear_area: Rectangle,
    pub clear_color: bool,
    pub clear_depth: bool,
    pub clear_stencil: bool,
    pub stencil_mask: u8,
    pub color_mask: wgpu::ColorWrites,
    pub color_attachment_index_gl: u32,
    pub color_format: InternalFormat,
    pub color_clear_value: ClearValue,
    pub depth_stencil_clear_value: ClearValue,
}

impl Default for ClearFramebufferParameters {
    fn default() -> Self {
        Self {
            clear_area: Rectangle::default(),
            clear_color: false,
            clear_depth: false,
            clear_stencil: false,
            stencil_mask: 0xFF,
            color_mask: wgpu::ColorWrites::ALL,
            color_attachment_index_gl: 0,
            color_format: InternalFormat::Rgba8,
            color_clear_value: ClearValue::Float([0.0; 4]),
            depth_stencil_clear_value: ClearValue::DepthStencil {
                depth: 1.0,
                stencil: 0,
            },
        }
    }
}

/// Clear of one level/layer of an image through a temporary render pass load op.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearTextureParameters {
    pub aspects: ImageAspects,
    pub level: u32,
    pub layer: u32,
    pub clear_value: ClearValue,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearImageParameters {
    pub clear_area: Rectangle,
    pub color_mask: wgpu::ColorWrites,
    pub color_clear_value: ClearValue,
    pub dst_level: u32,
    pub dst_layer: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlitResolveParameters {
    pub src_offset: [i32; 2],
    pub dst_offset: [i32; 2],
    /// Added to the offset when the destination is rotated by 180 or 270 degrees.
    pub rotated_offset_factor: [i32; 2],
    pub stretch: [f32; 2],
    pub src_extents: [i32; 2],
    pub blit_area: Rectangle,
    pub src_layer: i32,
    pub linear: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotation: SurfaceRotation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyImageParameters {
    pub src_offset: [i32; 2],
    pub src_extents: [i32; 2],
    pub dst_offset: [i32; 2],
    pub src_mip: i32,
    pub src_layer: i32,
    pub src_sample_count: u32,
    pub src_height: i32,
    pub dst_mip: u32,
    pub dst_layer: u32,
    pub src_premultiply_alpha: bool,
    pub src_unmultiply_alpha: bool,
    pub src_flip_y: bool,
    pub dst_flip_y: bool,
    pub src_rotation: SurfaceRotation,
    pub src_format: InternalFormat,
    pub dst_format: InternalFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyImageBitsParameters {
    pub src_offset: [i32; 3],
    pub src_level: u32,
    pub dst_offset: [i32; 3],
    pub dst_level: u32,
    pub copy_extents: [u32; 3],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyImageToBufferParameters {
    pub src_offset: [i32; 2],
    pub src_layer: i32,
    pub src_mip: u32,
    pub size: [u32; 2],
    pub output_offset: u32,
    pub output_pitch: u32,
    pub reverse_row_order: bool,
    pub output_format: InternalFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerateMipmapParameters {
    pub src_level: u32,
    pub dst_level_count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnresolveParameters {
    /// Bit `i` requests unresolving color attachment `i`.
    pub color_mask: u8,
    pub depth: bool,
    pub stencil: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayDrawParameters {
    pub text_widget_count: u32,
    pub graph_widget_count: u32,
    pub rotate_xy: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GenerateFragmentShadingRateParameters {
    pub texture_width: u32,
    pub texture_height: u32,
    pub attachment_width: u32,
    pub attachment_height: u32,
    pub attachment_block_width: u32,
    pub attachment_block_height: u32,
    pub focal_points: [Option<FocalPoint>; MAX_FOCAL_POINTS],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_offset_round_trips_through_bits() {
        let mut params = BlitResolveShaderParams::default();
        params.set_blit_offset(-1.5, 32.25);
        assert_eq!(params.blit_offset(), [-1.5, 32.25]);
        params.set_resolve_offset(-3, 7);
        assert_eq!(params.resolve_offset(), [-3, 7]);
    }

    #[test]
    fn convert_vertex_params_upload_as_sixteen_words() {
        let params = ConvertVertexShaderParams {
            output_count: 7,
            ..Default::default()
        };
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&params));
        assert_eq!(words.len(), 16);
        assert_eq!(words[0], 7);
    }
}
