//! ETC/EAC to BC transcoding on the GPU, for devices that can sample BC but not ETC.

use super::flags::{EtcToBcFlags, ShaderFlags};
use super::params::EtcToBcShaderParams;
use super::{end_render_pass_for_outside_commands, Function, UtilsEngine};
use crate::error::Result;
use crate::format;
use crate::hal::{
    Access, BufferImageCopy, CommandRecorder, DescriptorResource, DescriptorType, DescriptorWrite,
    Device, ImageAspects, ImageLayout, PipelineStages,
};
use crate::image::{view_desc, BufferHelper, ImageHelper, ImageType};
use crate::shaders::{ShaderKey, ShaderProgram};

const ETC_BLOCK_SIZE: u32 = 4;
const ETC_TO_BC_GROUP_SIZE: u32 = 8;

/// Unsigned integer format with one texel per compressed block of `block_bytes`.
fn block_uint_format(block_bytes: u32) -> wgpu::TextureFormat {
    match block_bytes {
        8 => wgpu::TextureFormat::Rg32Uint,
        16 => wgpu::TextureFormat::Rgba32Uint,
        _ => unreachable!("ETC blocks are 8 or 16 bytes"),
    }
}

impl UtilsEngine {
    /// Transcodes the ETC blocks `region` describes in `src` into the BC image `dst`, one
    /// dispatch per layer.
    pub fn trans_code_etc_to_bc(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        src: &BufferHelper,
        dst: &mut ImageHelper,
        region: &BufferImageCopy,
    ) -> Result<()> {
        let intended = dst.intended_format();
        let info = intended.info();
        let Some(flags) = EtcToBcFlags::for_format(intended) else {
            panic!("{intended:?} is not an ETC format");
        };
        assert!(
            region.buffer_row_length % ETC_BLOCK_SIZE == 0
                && region.buffer_image_height % ETC_BLOCK_SIZE == 0
                && region.extent[2] == 1
        );
        assert_eq!(dst.image_type(), ImageType::D2);

        let slice_texels = (region.buffer_row_length / ETC_BLOCK_SIZE)
            * (region.buffer_image_height / ETC_BLOCK_SIZE);
        let slice_size = u64::from(slice_texels) * u64::from(info.block_bytes);
        let texel_buffer_size = slice_size * u64::from(region.layer_count);

        // BC blocks cover 4x4 texels, so the shader works on whole blocks.
        let width = region.extent[0].next_multiple_of(ETC_BLOCK_SIZE);
        let height = region.extent[1].next_multiple_of(ETC_BLOCK_SIZE);

        let mut shader_params = EtcToBcShaderParams {
            offset_x: region.offset[0] as u32,
            offset_y: region.offset[1] as u32,
            texel_offset: 0,
            width,
            height,
            alpha_bits: u32::from(info.alpha_bits),
            is_signed: u32::from(format::is_snorm(intended)),
            is_eac_rg: u32::from(format::channel_count(intended) == 2),
        };

        end_render_pass_for_outside_commands(cmd);
        dst.change_layout(
            cmd,
            ImageLayout::General,
            PipelineStages::COMPUTE_SHADER,
            Access::SHADER_WRITE,
        );

        let texel_buffer = DescriptorWrite {
            binding: 0,
            array_element: 0,
            ty: DescriptorType::UniformTexelBuffer,
            resource: DescriptorResource::Buffer {
                buffer: src.handle,
                offset: src.offset + region.buffer_offset,
                size: texel_buffer_size,
            },
        };
        let shader = ShaderKey::new(ShaderProgram::EtcToBcComp, flags.bits());

        // Storage views of block-compressed images can only cover one layer.
        for i in 0..region.layer_count {
            let mut desc = view_desc(
                dst,
                region.level,
                region.base_layer + i,
                1,
                wgpu::TextureAspect::All,
            );
            desc.format = Some(block_uint_format(info.block_bytes));
            let view = device.create_image_view(&desc)?;

            let set = self.allocate_descriptor_set(device, Function::TransCodeEtcToBc)?;
            cmd.update_descriptor_set(
                set,
                &[
                    texel_buffer,
                    DescriptorWrite {
                        binding: 1,
                        array_element: 0,
                        ty: DescriptorType::StorageImage,
                        resource: DescriptorResource::Image {
                            view,
                            layout: ImageLayout::General,
                        },
                    },
                ],
            );

            self.setup_compute_program(
                device,
                cmd,
                Function::TransCodeEtcToBc,
                shader,
                Some(set),
                bytemuck::bytes_of(&shader_params),
            )?;
            cmd.dispatch(
                width.div_ceil(ETC_TO_BC_GROUP_SIZE),
                height.div_ceil(ETC_TO_BC_GROUP_SIZE),
                1,
            );

            shader_params.texel_offset += slice_texels as i32;
        }

        let level_gl = dst.first_allocated_level() + region.level;
        dst.on_write(level_gl, region.base_layer, region.layer_count, ImageAspects::COLOR);
        Ok(())
    }
}
