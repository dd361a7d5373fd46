//! Blits and multisample resolves drawn with a sampling fragment shader, plus the compute
//! fallback for stencil when the device cannot export stencil from a fragment shader.

use super::flags::{Blit3DSrcFlags, BlitResolveFlags, ShaderFlags, StencilNoExportFlags};
use super::params::{
    BlitResolveParameters, BlitResolveShaderParams, BlitResolveStencilNoExportShaderParams,
    SurfaceRotation,
};
use super::{
    begin_render_pass, create_scratch_buffer, depth_state_for_write,
    end_render_pass_for_outside_commands, storage_buffer_writes, FramebufferTarget, Function,
    UtilsEngine,
};
use crate::error::Result;
use crate::format::NumericClass;
use crate::hal::{
    Access, BufferImageCopy, CommandRecorder, DepthState, DescriptorResource, DescriptorType,
    DescriptorWrite, Device, GraphicsPipelineDesc, ImageAspects, ImageLayout, ImageViewHandle,
    MemoryBarrier, PipelineStages, ShaderSource, StencilState, Viewport, MAX_DRAW_BUFFERS,
};
use crate::image::{ImageHelper, ImageType};
use crate::render_target::RenderTarget;
use crate::shaders::{ShaderKey, ShaderProgram};

const STENCIL_NO_EXPORT_GROUP_SIZE: u32 = 8;

/// Source offset handed to the shaders. Blits stretch and take a float offset; resolves copy
/// texel for texel and take an integer one.
#[derive(Clone, Copy, Debug, PartialEq)]
enum SrcOffset {
    Blit([f32; 2]),
    Resolve([i32; 2]),
}

impl SrcOffset {
    fn new(params: &BlitResolveParameters, is_resolve: bool) -> Self {
        let factor_x = if params.flip_x { -1 } else { 1 };
        let factor_y = if params.flip_y { -1 } else { 1 };
        let rotated = matches!(
            params.rotation,
            SurfaceRotation::Rotated180Degrees | SurfaceRotation::Rotated270Degrees
        );

        if is_resolve {
            let mut offset = [
                params.dst_offset[0] - params.src_offset[0] * factor_x,
                params.dst_offset[1] - params.src_offset[1] * factor_y,
            ];
            if rotated {
                // Sample positions near the edge are off by one otherwise.
                offset[0] += params.rotated_offset_factor[0] - 1;
                offset[1] += params.rotated_offset_factor[1] - 1;
            }
            SrcOffset::Resolve(offset)
        } else {
            let mut offset = [
                params.dst_offset[0] as f32 * params.stretch[0]
                    - (params.src_offset[0] * factor_x) as f32,
                params.dst_offset[1] as f32 * params.stretch[1]
                    - (params.src_offset[1] * factor_y) as f32,
            ];
            if rotated {
                offset[0] += params.rotated_offset_factor[0] as f32;
                offset[1] += params.rotated_offset_factor[1] as f32;
            }
            SrcOffset::Blit(offset)
        }
    }

    fn bits(self) -> [u32; 2] {
        match self {
            SrcOffset::Blit(offset) => offset.map(f32::to_bits),
            SrcOffset::Resolve(offset) => offset.map(|o| o as u32),
        }
    }
}

fn sampled_image(binding: u32, view: ImageViewHandle, layout: ImageLayout) -> DescriptorWrite {
    DescriptorWrite {
        binding,
        array_element: 0,
        ty: DescriptorType::SampledImage,
        resource: DescriptorResource::Image { view, layout },
    }
}

fn sampler_write(binding: u32, sampler: crate::hal::SamplerHandle) -> DescriptorWrite {
    DescriptorWrite {
        binding,
        array_element: 0,
        ty: DescriptorType::Sampler,
        resource: DescriptorResource::Sampler(sampler),
    }
}

impl UtilsEngine {
    /// Blits or resolves `src` into the framebuffer's enabled color attachments.
    pub fn color_blit_resolve(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        framebuffer: &FramebufferTarget,
        src: &mut ImageHelper,
        src_view: ImageViewHandle,
        params: &BlitResolveParameters,
    ) -> Result<()> {
        self.blit_resolve_impl(device, cmd, framebuffer, src, Some(src_view), None, None, params)
    }

    /// Blits or resolves depth and/or stencil into the framebuffer's depth/stencil attachment.
    ///
    /// Stencil goes through the fragment shader, so the device must support stencil export;
    /// otherwise use [`UtilsEngine::stencil_blit_resolve_no_shader_export`].
    #[allow(clippy::too_many_arguments)]
    pub fn depth_stencil_blit_resolve(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        framebuffer: &FramebufferTarget,
        src: &mut ImageHelper,
        src_depth_view: Option<ImageViewHandle>,
        src_stencil_view: Option<ImageViewHandle>,
        params: &BlitResolveParameters,
    ) -> Result<()> {
        assert!(src_depth_view.is_some() || src_stencil_view.is_some());
        self.blit_resolve_impl(
            device,
            cmd,
            framebuffer,
            src,
            None,
            src_depth_view,
            src_stencil_view,
            params,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn blit_resolve_impl(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        framebuffer: &FramebufferTarget,
        src: &mut ImageHelper,
        src_color_view: Option<ImageViewHandle>,
        src_depth_view: Option<ImageViewHandle>,
        src_stencil_view: Option<ImageViewHandle>,
        params: &BlitResolveParameters,
    ) -> Result<()> {
        let features = self.features(device);
        let is_resolve = src.samples() > 1;
        let blit_color = src_color_view.is_some();
        let blit_depth = src_depth_view.is_some();
        let blit_stencil = src_stencil_view.is_some();

        assert!(blit_color != (blit_depth || blit_stencil));
        assert!((blit_color && !is_resolve) || !params.linear);
        assert!(!blit_stencil || features.supports_shader_stencil_export);

        let mut shader_params = BlitResolveShaderParams {
            stretch: params.stretch,
            inv_src_extent: params.src_extents.map(|e| 1.0 / e as f32),
            src_layer: params.src_layer,
            samples: src.samples() as i32,
            inv_samples: 1.0 / src.samples() as f32,
            output_mask: u32::from(framebuffer.enabled_draw_buffers),
            flip_x: u32::from(params.flip_x),
            flip_y: u32::from(params.flip_y),
            rotate_xy: u32::from(params.rotation.is_rotated_aspect_ratio()),
            ..BlitResolveShaderParams::default()
        };
        match SrcOffset::new(params, is_resolve) {
            SrcOffset::Blit([x, y]) => shader_params.set_blit_offset(x, y),
            SrcOffset::Resolve([x, y]) => shader_params.set_resolve_offset(x, y),
        }

        let is_src_3d = src.image_type() == ImageType::D3;
        assert!(!is_src_3d || (blit_color && !is_resolve));
        let (function, fragment) = if is_src_3d {
            let flags = Blit3DSrcFlags {
                class: NumericClass::of(src.intended_format()),
            };
            (
                Function::Blit3DSrc,
                ShaderKey::new(ShaderProgram::Blit3DSrcFrag, flags.bits()),
            )
        } else {
            let flags = BlitResolveFlags::new(
                blit_color.then(|| src.intended_format()),
                blit_depth,
                blit_stencil,
                src.layer_count(),
                src.samples(),
            );
            (
                Function::BlitResolve,
                ShaderKey::new(ShaderProgram::BlitResolveFrag, flags.bits()),
            )
        };

        let mut desc = GraphicsPipelineDesc::new(framebuffer.render_pass);
        desc.subpass = framebuffer.subpass;
        if blit_color {
            desc.set_color_write_masks(wgpu::ColorWrites::ALL, framebuffer.enabled_draw_buffers);
            for i in 0..MAX_DRAW_BUFFERS {
                if framebuffer.emulated_alpha_attachments & (1 << i) != 0 {
                    desc.color_write_masks[i].remove(wgpu::ColorWrites::ALPHA);
                }
            }
        } else {
            desc.color_write_masks = [wgpu::ColorWrites::empty(); MAX_DRAW_BUFFERS];
        }
        if blit_depth {
            desc.depth = depth_state_for_write(features.supports_depth_clamp);
        }
        if blit_stencil {
            desc.stencil = StencilState::replace_always();
        }

        if blit_color {
            assert!(
                cmd.active_render_pass().is_none(),
                "color blits start their own render pass"
            );
        }
        end_render_pass_for_outside_commands(cmd);
        src.change_layout(
            cmd,
            ImageLayout::ShaderReadOnly,
            PipelineStages::FRAGMENT_SHADER,
            Access::SHADER_READ,
        );
        begin_render_pass(cmd, framebuffer.begin(params.blit_area))?;

        let set = self.allocate_descriptor_set(device, function)?;
        let mut writes = Vec::with_capacity(3);
        if let Some(view) = src_color_view.or(src_depth_view) {
            writes.push(sampled_image(0, view, src.current_layout()));
        }
        if let Some(view) = src_stencil_view {
            writes.push(sampled_image(1, view, src.current_layout()));
        }
        let sampler = if params.linear {
            self.linear_sampler(device)?
        } else {
            self.point_sampler(device)?
        };
        writes.push(sampler_write(2, sampler));
        cmd.update_descriptor_set(set, &writes);

        self.setup_graphics_program(
            device,
            cmd,
            function,
            ShaderSource::Library(ShaderKey::new(ShaderProgram::FullScreenTriVert, 0)),
            Some(ShaderSource::Library(fragment)),
            &desc,
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.set_viewport(Viewport::from_rect(framebuffer.complete_render_area, 0.0, 1.0));
        cmd.set_scissor(params.blit_area);
        if features.supports_dynamic_depth_stencil_state {
            cmd.set_depth_state(if blit_depth {
                desc.depth
            } else {
                DepthState::default()
            });
            cmd.set_stencil_state(desc.stencil);
        }
        if blit_stencil {
            cmd.set_stencil_compare_mask(0xFF);
            cmd.set_stencil_write_mask(0xFF);
            cmd.set_stencil_reference(0);
        }

        cmd.draw(3, 0);
        Ok(())
    }

    /// Blits or resolves stencil without shader stencil export.
    ///
    /// A compute pass packs the blitted stencil values four per word into a scratch buffer,
    /// which is then copied into the stencil aspect of `dst`.
    pub fn stencil_blit_resolve_no_shader_export(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &RenderTarget,
        src: &mut ImageHelper,
        src_stencil_view: ImageViewHandle,
        params: &BlitResolveParameters,
    ) -> Result<()> {
        assert!(!params.linear);
        let is_resolve = src.samples() > 1;

        let area = params.blit_area;
        let row_uints = (area.width as u32).div_ceil(4);
        let buffer_size = u64::from(row_uints) * 4 * area.height as u64;
        let buffer = create_scratch_buffer(
            device,
            buffer_size,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;

        let shader_params = BlitResolveStencilNoExportShaderParams {
            offset: SrcOffset::new(params, is_resolve).bits(),
            stretch: params.stretch,
            inv_src_extent: params.src_extents.map(|e| 1.0 / e as f32),
            src_layer: params.src_layer,
            src_width: params.src_extents[0],
            blit_area: [area.x, area.y, area.width, area.height],
            dst_pitch: row_uints,
            flip_x: u32::from(params.flip_x),
            flip_y: u32::from(params.flip_y),
            rotate_xy: u32::from(params.rotation.is_rotated_aspect_ratio()),
        };
        let flags = StencilNoExportFlags {
            src_is_array: src.layer_count() > 1,
            is_resolve,
        };

        let dst_image = dst.image_for_write();
        let mut dst_image = dst_image.borrow_mut();

        end_render_pass_for_outside_commands(cmd);
        src.change_layout(
            cmd,
            ImageLayout::ShaderReadOnly,
            PipelineStages::COMPUTE_SHADER,
            Access::SHADER_READ,
        );
        dst_image.change_layout(
            cmd,
            ImageLayout::TransferDst,
            PipelineStages::TRANSFER,
            Access::TRANSFER_WRITE,
        );

        let set = self.allocate_descriptor_set(device, Function::BlitResolveStencilNoExport)?;
        let sampler = self.point_sampler(device)?;
        let mut writes = storage_buffer_writes(0, &[&buffer]);
        writes.push(sampled_image(1, src_stencil_view, src.current_layout()));
        writes.push(sampler_write(2, sampler));
        cmd.update_descriptor_set(set, &writes);

        self.setup_compute_program(
            device,
            cmd,
            Function::BlitResolveStencilNoExport,
            ShaderKey::new(ShaderProgram::BlitResolveStencilNoExportComp, flags.bits()),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;
        cmd.dispatch(
            row_uints.div_ceil(STENCIL_NO_EXPORT_GROUP_SIZE),
            (area.height as u32).div_ceil(STENCIL_NO_EXPORT_GROUP_SIZE),
            1,
        );

        cmd.memory_barrier(MemoryBarrier {
            src_stages: PipelineStages::COMPUTE_SHADER,
            src_access: Access::SHADER_WRITE,
            dst_stages: PipelineStages::TRANSFER,
            dst_access: Access::TRANSFER_READ,
        });

        let level_gl = dst.level_index();
        let layer = dst.layer_index();
        cmd.copy_buffer_to_image(
            buffer.handle,
            dst_image.handle(),
            dst_image.current_layout(),
            BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: row_uints * 4,
                buffer_image_height: area.height as u32,
                aspects: ImageAspects::STENCIL,
                level: dst_image.to_vk_level(level_gl),
                base_layer: layer,
                layer_count: 1,
                offset: [area.x, area.y, 0],
                extent: [area.width as u32, area.height as u32, 1],
            },
        );
        dst_image.on_write(level_gl, layer, 1, ImageAspects::STENCIL);
        Ok(())
    }
}
