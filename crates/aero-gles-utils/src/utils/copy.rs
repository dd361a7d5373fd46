//! Image copies that reinterpret, convert or re-lay out texels on the way.

use aero_gles_texture::format::FormatInfo;
use aero_gles_texture::Rectangle;

use super::flags::{
    ConvertVertexFlags, CopyImageToBufferFlags, ImageCopyFlags, ShaderFlags, SrcDimension,
    FLOAT16_ONE, FLOAT32_ONE,
};
use super::params::{
    ConvertVertexShaderParams, CopyImageBitsParameters, CopyImageParameters,
    CopyImageToBufferParameters, CopyImageToBufferShaderParams, ImageCopyShaderParams,
    SurfaceRotation,
};
use super::{
    buffer_resource, create_scratch_buffer, end_render_pass_for_outside_commands,
    set_depth_stencil_unused, Function, UtilsEngine,
};
use crate::error::Result;
use crate::format::{self, NumericClass};
use crate::hal::{
    Access, BufferImageCopy, CommandRecorder, DescriptorResource, DescriptorType, DescriptorWrite,
    Device, GraphicsPipelineDesc, ImageAspects, ImageLayout, ImageViewHandle, LoadOp,
    MemoryBarrier, PipelineStages, RenderPassClosureReason, RenderPassDesc, ShaderSource, Viewport,
};
use crate::image::{view_desc, BufferHelper, ImageHelper, ImageType};
use crate::shaders::{ShaderKey, ShaderProgram};

const COPY_IMAGE_TO_BUFFER_GROUP_SIZE: u32 = 8;

/// Luminance/alpha formats: any luminance, or alpha without color.
fn is_luma(info: &FormatInfo) -> bool {
    info.luminance_bits > 0
        || (info.alpha_bits > 0
            && info.red_bits == 0
            && info.green_bits == 0
            && info.blue_bits == 0)
}

/// Emulated alpha written into the destination of a bit copy, in the destination's encoding.
fn bit_copy_emulated_alpha(
    dst_actual: aero_gles_texture::InternalFormat,
    bytes_per_channel: u32,
) -> u32 {
    if dst_actual.info().is_integer() {
        1
    } else if format::is_unorm(dst_actual) {
        assert_eq!(bytes_per_channel, 1);
        0xFF
    } else if format::is_snorm(dst_actual) {
        assert_eq!(bytes_per_channel, 1);
        0x7F
    } else {
        match bytes_per_channel {
            2 => FLOAT16_ONE,
            4 => FLOAT32_ONE,
            _ => unreachable!("float channels are 16 or 32 bits"),
        }
    }
}

fn bit_copy_region(
    image: &ImageHelper,
    level_gl: u32,
    offset: [i32; 3],
    extents: [u32; 3],
) -> BufferImageCopy {
    let is_3d = image.image_type() == ImageType::D3;
    BufferImageCopy {
        buffer_offset: 0,
        buffer_row_length: 0,
        buffer_image_height: 0,
        aspects: ImageAspects::COLOR,
        level: image.to_vk_level(level_gl),
        base_layer: if is_3d { 0 } else { offset[2] as u32 },
        layer_count: if is_3d { 1 } else { extents[2] },
        offset: [offset[0], offset[1], if is_3d { offset[2] } else { 0 }],
        extent: [extents[0], extents[1], if is_3d { extents[2] } else { 1 }],
    }
}

impl UtilsEngine {
    /// Draws `src` into `dst` with format conversion, flips, pre-rotation and alpha
    /// (un)premultiplication.
    ///
    /// The views are created by the caller for this copy, so no render pass may be open.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_image(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &mut ImageHelper,
        dst_view: ImageViewHandle,
        src: &mut ImageHelper,
        src_view: ImageViewHandle,
        params: &CopyImageParameters,
    ) -> Result<()> {
        assert!(
            cmd.active_render_pass().is_none(),
            "copy_image views are not retained across render passes"
        );
        assert!(!(params.src_flip_y && params.dst_flip_y));
        let features = self.features(device);

        let src_info = params.src_format.info();
        let dst_info = params.dst_format.info();
        let dst_intended = dst.intended_format().info();

        let mut shader_params = ImageCopyShaderParams {
            src_offset: params.src_offset,
            dst_offset: params.dst_offset,
            src_mip: params.src_mip,
            src_layer: params.src_layer,
            src_sample_count: params.src_sample_count,
            src_has_luminance: u32::from(src_info.luminance_bits > 0),
            src_is_alpha: u32::from(is_luma(&src_info) && src_info.alpha_bits > 0),
            src_is_srgb: u32::from(src_info.srgb),
            dst_is_srgb: u32::from(dst_info.srgb),
            dst_default_channels_mask: format::default_channels_mask(
                dst.intended_format(),
                dst.actual_format(),
            ),
            flip_x: 0,
            flip_y: u32::from(params.src_flip_y || params.dst_flip_y),
            premultiply_alpha: u32::from(params.src_premultiply_alpha),
            unmultiply_alpha: u32::from(params.src_unmultiply_alpha),
            dst_has_luminance: u32::from(dst_intended.luminance_bits > 0),
            dst_is_alpha: u32::from(is_luma(&dst_intended) && dst_intended.alpha_bits > 0),
            rotate_xy: 0,
            _padding: 0,
        };

        // sRGB on both sides can be copied as if linear unless alpha is multiplied in between.
        if src_info.srgb
            && dst_info.srgb
            && !params.src_premultiply_alpha
            && !params.src_unmultiply_alpha
        {
            shader_params.src_is_srgb = 0;
            shader_params.dst_is_srgb = 0;
        }

        if params.src_flip_y {
            // The shader expects the index of the last row.
            shader_params.src_offset[1] = params.src_height - params.src_offset[1] - 1;
        } else if params.dst_flip_y {
            shader_params.src_offset[1] = params.src_offset[1] + params.src_extents[1] - 1;
        }

        match params.src_rotation {
            SurfaceRotation::Identity => {}
            SurfaceRotation::Rotated90Degrees => shader_params.rotate_xy = 1,
            SurfaceRotation::Rotated180Degrees => {
                debug_assert_eq!(shader_params.flip_y, 1);
                shader_params.flip_x = 1;
                shader_params.flip_y = 0;
                shader_params.src_offset[0] += params.src_extents[0];
                shader_params.src_offset[1] -= params.src_extents[1];
            }
            SurfaceRotation::Rotated270Degrees => {
                debug_assert_eq!(shader_params.flip_y, 0);
                shader_params.flip_x = 1;
                shader_params.flip_y = 1;
                shader_params.src_offset[0] += params.src_extents[0];
                shader_params.src_offset[1] += params.src_extents[1];
                shader_params.rotate_xy = 1;
            }
        }

        let mut render_pass = RenderPassDesc {
            samples: dst.samples(),
            ..RenderPassDesc::default()
        };
        render_pass.colors[0] = format::texture_format(dst.actual_format());

        let mut render_area = Rectangle::new(
            params.dst_offset[0],
            params.dst_offset[1],
            params.src_extents[0],
            params.src_extents[1],
        );
        if params.src_rotation.is_rotated_aspect_ratio() {
            std::mem::swap(&mut render_area.width, &mut render_area.height);
        }

        src.change_layout(
            cmd,
            ImageLayout::ShaderReadOnly,
            PipelineStages::FRAGMENT_SHADER,
            Access::SHADER_READ,
        );
        dst.change_layout(
            cmd,
            ImageLayout::ColorAttachment,
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            Access::COLOR_ATTACHMENT_WRITE,
        );
        self.start_render_pass(cmd, render_pass, dst_view, render_area, LoadOp::Load)?;

        let set = self.allocate_descriptor_set(device, Function::ImageCopy)?;
        cmd.update_descriptor_set(
            set,
            &[DescriptorWrite {
                binding: 0,
                array_element: 0,
                ty: DescriptorType::SampledImage,
                resource: DescriptorResource::Image {
                    view: src_view,
                    layout: src.current_layout(),
                },
            }],
        );

        let fragment = if params.src_sample_count > 1 {
            ShaderKey::new(ShaderProgram::ImageCopyFloatFrag, 0)
        } else {
            let src_dimension = if src.image_type() == ImageType::D3 {
                SrcDimension::D3
            } else if src.layer_count() > 1 {
                SrcDimension::D2Array
            } else {
                SrcDimension::D2
            };
            let flags = ImageCopyFlags {
                src: NumericClass::of(params.src_format),
                dst: NumericClass::of(params.dst_format),
                src_dimension,
            };
            ShaderKey::new(ShaderProgram::ImageCopyFrag, flags.bits())
        };

        let desc = GraphicsPipelineDesc::new(render_pass);
        self.setup_graphics_program(
            device,
            cmd,
            Function::ImageCopy,
            ShaderSource::Library(ShaderKey::new(ShaderProgram::FullScreenTriVert, 0)),
            Some(ShaderSource::Library(fragment)),
            &desc,
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.set_viewport(Viewport::from_rect(render_area, 0.0, 1.0));
        cmd.set_scissor(render_area);
        set_depth_stencil_unused(&features, cmd);
        cmd.draw(3, 0);

        dst.on_write(
            params.dst_mip,
            params.dst_layer,
            1,
            ImageAspects::COLOR,
        );
        cmd.end_render_pass(RenderPassClosureReason::TemporaryForImageCopy);
        Ok(())
    }

    /// Copies the bit pattern of an RGB image emulated as RGBA into another such image, keeping
    /// the destination's emulated alpha valid.
    ///
    /// The texels go through two scratch buffers: image to buffer, buffer-to-buffer conversion,
    /// then buffer to image.
    pub fn copy_image_bits(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &mut ImageHelper,
        src: &mut ImageHelper,
        params: &CopyImageBitsParameters,
    ) -> Result<()> {
        let src_intended = src.intended_format().info();
        let dst_intended = dst.intended_format().info();
        assert!(src_intended.blue_bits > 0 && src_intended.alpha_bits == 0);
        assert!(dst_intended.blue_bits > 0 && dst_intended.alpha_bits == 0);

        let src_actual = src.actual_format();
        let dst_actual = dst.actual_format();
        let src_pixel_bytes = src_actual.info().pixel_bytes;
        let dst_pixel_bytes = dst_actual.info().pixel_bytes;

        let [width, height, depth] = params.copy_extents;
        let total_pixels = width * height * depth;
        let src_size = u64::from(src_pixel_bytes * total_pixels).next_multiple_of(4);
        let dst_size = u64::from(dst_pixel_bytes * total_pixels).next_multiple_of(4);

        let src_buffer = create_scratch_buffer(
            device,
            src_size,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )?;
        let dst_buffer = create_scratch_buffer(
            device,
            dst_size,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;

        end_render_pass_for_outside_commands(cmd);
        src.change_layout(
            cmd,
            ImageLayout::TransferSrc,
            PipelineStages::TRANSFER,
            Access::TRANSFER_READ,
        );
        dst.change_layout(
            cmd,
            ImageLayout::TransferDst,
            PipelineStages::TRANSFER,
            Access::TRANSFER_WRITE,
        );

        cmd.copy_image_to_buffer(
            src.handle(),
            src.current_layout(),
            src_buffer.handle,
            bit_copy_region(src, params.src_level, params.src_offset, params.copy_extents),
        );
        cmd.memory_barrier(MemoryBarrier {
            src_stages: PipelineStages::TRANSFER,
            src_access: Access::TRANSFER_WRITE,
            dst_stages: PipelineStages::COMPUTE_SHADER,
            dst_access: Access::SHADER_READ,
        });

        // The source is read as three channels so the destination alpha comes from
        // `src_emulated_alpha` instead of the source's own emulated alpha.
        let bs = src_pixel_bytes / format::channel_count(src_actual);
        let nd = format::channel_count(dst_actual);
        let bd = dst_pixel_bytes / nd;
        assert!(4 % bs == 0 && 4 % bd == 0);
        assert_eq!(bs, bd, "bit copies keep the channel width");

        let component_count = total_pixels * nd;
        let shader_params = ConvertVertexShaderParams {
            output_count: component_count.div_ceil(4 / bd),
            component_count,
            src_offset: 0,
            dst_offset: 0,
            ns: 3,
            bs,
            ss: src_pixel_bytes,
            es: 4 / bs,
            nd,
            bd,
            sd: nd * bd,
            ed: 4 / bd,
            src_emulated_alpha: bit_copy_emulated_alpha(dst_actual, bd),
            is_src_hdr: 0,
            is_src_a2bgr10: 0,
            _padding: 0,
        };
        self.convert_vertex_buffer_impl(
            device,
            cmd,
            &dst_buffer,
            &src_buffer,
            ConvertVertexFlags::UintToUint,
            shader_params,
            &[],
        )?;

        cmd.memory_barrier(MemoryBarrier {
            src_stages: PipelineStages::COMPUTE_SHADER,
            src_access: Access::SHADER_WRITE,
            dst_stages: PipelineStages::TRANSFER,
            dst_access: Access::TRANSFER_READ,
        });
        cmd.copy_buffer_to_image(
            dst_buffer.handle,
            dst.handle(),
            dst.current_layout(),
            bit_copy_region(dst, params.dst_level, params.dst_offset, params.copy_extents),
        );

        let layer = if dst.image_type() == ImageType::D3 { 0 } else { params.dst_offset[2] as u32 };
        let layer_count = if dst.image_type() == ImageType::D3 { 1 } else { depth };
        dst.on_write(params.dst_level, layer, layer_count, ImageAspects::COLOR);
        Ok(())
    }

    /// Reads a region of one level/layer of `src` into `dst` as tightly packed RGBA8 rows.
    pub fn copy_image_to_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &BufferHelper,
        src: &mut ImageHelper,
        params: &CopyImageToBufferParameters,
    ) -> Result<()> {
        assert_eq!(params.output_offset % 4, 0);
        assert_eq!(params.output_pitch % 4, 0);

        let is_3d = src.image_type() == ImageType::D3;
        let shader_params = CopyImageToBufferShaderParams {
            src_offset: params.src_offset,
            src_depth: params.src_layer,
            reverse_row_order: u32::from(params.reverse_row_order),
            size: params.size,
            output_offset: params.output_offset / 4,
            output_pitch: params.output_pitch / 4,
            is_dst_snorm: u32::from(format::is_snorm(params.output_format)),
            _padding: [0; 3],
        };
        let flags = CopyImageToBufferFlags::new(src.actual_format(), is_3d);

        // Texels are copied as stored, without decoding sRGB.
        let layer = if is_3d { 0 } else { params.src_layer as u32 };
        let mut desc = view_desc(src, params.src_mip, layer, 1, wgpu::TextureAspect::All);
        desc.format = desc.format.map(|format| format.remove_srgb_suffix());
        if is_3d {
            desc.dimension = wgpu::TextureViewDimension::D3;
        }
        let view = device.create_image_view(&desc)?;

        end_render_pass_for_outside_commands(cmd);
        src.change_layout(
            cmd,
            ImageLayout::ShaderReadOnly,
            PipelineStages::COMPUTE_SHADER,
            Access::SHADER_READ,
        );

        let set = self.allocate_descriptor_set(device, Function::CopyImageToBuffer)?;
        cmd.update_descriptor_set(
            set,
            &[
                DescriptorWrite {
                    binding: 0,
                    array_element: 0,
                    ty: DescriptorType::SampledImage,
                    resource: DescriptorResource::Image {
                        view,
                        layout: src.current_layout(),
                    },
                },
                DescriptorWrite {
                    binding: 1,
                    array_element: 0,
                    ty: DescriptorType::StorageBuffer,
                    resource: buffer_resource(dst),
                },
            ],
        );

        self.setup_compute_program(
            device,
            cmd,
            Function::CopyImageToBuffer,
            ShaderKey::new(ShaderProgram::CopyImageToBufferComp, flags.bits()),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.dispatch(
            params.size[0].div_ceil(COPY_IMAGE_TO_BUFFER_GROUP_SIZE),
            params.size[1].div_ceil(COPY_IMAGE_TO_BUFFER_GROUP_SIZE),
            1,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aero_gles_texture::{Extents, InternalFormat};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hal::recording::{Command, Created, RecordingCommands, RecordingDevice};
    use crate::hal::{BufferHandle, Features, ImageHandle};

    fn image(handle: u32, format: InternalFormat, image_type: ImageType) -> ImageHelper {
        ImageHelper::new(
            ImageHandle(handle),
            image_type,
            format,
            Extents::new(64, 32, 4),
            0,
            1,
            if image_type == ImageType::D3 { 1 } else { 4 },
            1,
        )
    }

    fn pushed_copy_params(cmd: &RecordingCommands) -> ImageCopyShaderParams {
        bytemuck::pod_read_unaligned(cmd.push_constant_blocks()[0])
    }

    #[test]
    fn copy_with_dst_flip_points_at_last_row() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut src = image(1, InternalFormat::Rgba8, ImageType::D2);
        let mut dst = image(2, InternalFormat::Rgb8, ImageType::D2);

        let params = CopyImageParameters {
            src_offset: [2, 3],
            src_extents: [10, 5],
            dst_offset: [1, 1],
            src_sample_count: 1,
            src_height: 32,
            dst_flip_y: true,
            src_format: InternalFormat::Rgba8,
            dst_format: InternalFormat::Rgb8,
            ..CopyImageParameters::default()
        };
        engine
            .copy_image(
                &mut device,
                &mut cmd,
                &mut dst,
                ImageViewHandle(100),
                &mut src,
                ImageViewHandle(101),
                &params,
            )
            .expect("copy");

        let pushed = pushed_copy_params(&cmd);
        assert_eq!(pushed.src_offset, [2, 7]);
        assert_eq!(pushed.flip_y, 1);
        assert_eq!(pushed.dst_default_channels_mask, 8);
        assert_eq!(
            cmd.commands().last(),
            Some(&Command::EndRenderPass(RenderPassClosureReason::TemporaryForImageCopy))
        );
        assert!(dst.has_subresource_defined_content(0, 0, 1));
        assert_eq!(src.current_layout(), ImageLayout::ShaderReadOnly);
    }

    #[test]
    fn rotated_copy_swaps_render_area() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut src = image(1, InternalFormat::Rgba8, ImageType::D2);
        let mut dst = image(2, InternalFormat::Rgba8, ImageType::D2);

        let params = CopyImageParameters {
            src_extents: [10, 5],
            src_sample_count: 1,
            src_rotation: SurfaceRotation::Rotated270Degrees,
            src_format: InternalFormat::Rgba8,
            dst_format: InternalFormat::Rgba8,
            ..CopyImageParameters::default()
        };
        engine
            .copy_image(
                &mut device,
                &mut cmd,
                &mut dst,
                ImageViewHandle(100),
                &mut src,
                ImageViewHandle(101),
                &params,
            )
            .expect("copy");

        let pushed = pushed_copy_params(&cmd);
        assert_eq!((pushed.flip_x, pushed.flip_y, pushed.rotate_xy), (1, 1, 1));
        assert_eq!(pushed.src_offset, [10, 5]);
        assert!(cmd
            .commands()
            .contains(&Command::SetScissor(Rectangle::new(0, 0, 5, 10))));
    }

    #[test]
    fn srgb_to_srgb_copy_stays_encoded() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut src = image(1, InternalFormat::Srgb8Alpha8, ImageType::D2);
        let mut dst = image(2, InternalFormat::Srgb8Alpha8, ImageType::D2);

        let params = CopyImageParameters {
            src_extents: [4, 4],
            src_sample_count: 1,
            src_format: InternalFormat::Srgb8Alpha8,
            dst_format: InternalFormat::Srgb8Alpha8,
            ..CopyImageParameters::default()
        };
        engine
            .copy_image(
                &mut device,
                &mut cmd,
                &mut dst,
                ImageViewHandle(100),
                &mut src,
                ImageViewHandle(101),
                &params,
            )
            .expect("copy");
        let pushed = pushed_copy_params(&cmd);
        assert_eq!((pushed.src_is_srgb, pushed.dst_is_srgb), (0, 0));
    }

    #[test]
    fn bit_copy_round_trips_through_scratch_buffers() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut src = image(1, InternalFormat::Rgb8, ImageType::D2);
        let mut dst = image(2, InternalFormat::Rgb8, ImageType::D2);

        let params = CopyImageBitsParameters {
            src_offset: [0, 0, 1],
            src_level: 0,
            dst_offset: [4, 4, 2],
            dst_level: 0,
            copy_extents: [3, 3, 2],
        };
        engine
            .copy_image_bits(&mut device, &mut cmd, &mut dst, &mut src, &params)
            .expect("copy");

        let buffers: Vec<u64> = device
            .created()
            .iter()
            .filter_map(|c| match c {
                Created::Buffer(_, size, _) => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(buffers, vec![72, 72]);

        let kinds: Vec<&'static str> = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::CopyImageToBuffer(..) => Some("to_buffer"),
                Command::MemoryBarrier(_) => Some("barrier"),
                Command::Dispatch(..) => Some("dispatch"),
                Command::CopyBufferToImage(..) => Some("to_image"),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["to_buffer", "barrier", "dispatch", "barrier", "to_image"]);

        let pushed: ConvertVertexShaderParams =
            bytemuck::pod_read_unaligned(cmd.push_constant_blocks()[0]);
        assert_eq!((pushed.ns, pushed.nd, pushed.ss), (3, 4, 4));
        assert_eq!(pushed.src_emulated_alpha, 0xFF);
        assert_eq!(pushed.component_count, 72);

        let region = cmd
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::CopyBufferToImage(_, _, _, region) => Some(*region),
                _ => None,
            })
            .expect("copy to image");
        assert_eq!((region.base_layer, region.layer_count), (2, 2));
        assert_eq!(region.offset, [4, 4, 0]);
        assert!(dst.has_subresource_defined_content(0, 3, 1));
    }

    #[test]
    fn image_to_buffer_reads_a_linear_3d_view() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut src = image(1, InternalFormat::Srgb8Alpha8, ImageType::D3);

        let params = CopyImageToBufferParameters {
            src_offset: [0, 0],
            src_layer: 2,
            src_mip: 0,
            size: [20, 9],
            output_offset: 16,
            output_pitch: 80,
            reverse_row_order: true,
            output_format: InternalFormat::Rgba8,
        };
        engine
            .copy_image_to_buffer(
                &mut device,
                &mut cmd,
                &BufferHelper::new(BufferHandle(50), 0, 4096),
                &mut src,
                &params,
            )
            .expect("copy");

        let view = device
            .created()
            .iter()
            .find_map(|c| match c {
                Created::ImageView(_, desc) => Some(*desc),
                _ => None,
            })
            .expect("view");
        assert_eq!(view.dimension, wgpu::TextureViewDimension::D3);
        assert_eq!(view.format, Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(view.base_layer, 0);

        let pushed: CopyImageToBufferShaderParams =
            bytemuck::pod_read_unaligned(cmd.push_constant_blocks()[0]);
        assert_eq!(pushed.src_depth, 2);
        assert_eq!((pushed.output_offset, pushed.output_pitch), (4, 20));
        assert_eq!(cmd.dispatches(), vec![(3, 2, 1)]);
    }
}
