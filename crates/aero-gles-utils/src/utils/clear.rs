use aero_gles_texture::Rectangle;

use super::flags::{ImageClearFlags, ShaderFlags};
use super::params::{
    ClearFramebufferParameters, ClearImageParameters, ClearTextureParameters,
    ImageClearShaderParams,
};
use super::{
    begin_render_pass, depth_state_for_write, end_render_pass_for_outside_commands,
    set_depth_stencil_unused, FramebufferTarget, Function, UtilsEngine,
};
use crate::error::Result;
use crate::format;
use crate::hal::{
    Access, ClearValue, CommandRecorder, Device, GraphicsPipelineDesc, ImageAspects, ImageLayout,
    LoadOp, PipelineStages, RenderPassClosureReason, RenderPassDesc, ShaderSource, StencilState,
    Viewport, MAX_DRAW_BUFFERS,
};
use crate::image::{view_desc, ImageHelper};
use crate::shaders::{ShaderKey, ShaderProgram};

fn full_screen_tri() -> ShaderSource {
    ShaderSource::Library(ShaderKey::new(ShaderProgram::FullScreenTriVert, 0))
}

/// Raw bits of a color clear value as the clear shader reads them.
fn clear_value_bits(value: ClearValue) -> [u32; 4] {
    match value {
        ClearValue::Float(v) => v.map(f32::to_bits),
        ClearValue::Int(v) => v.map(|c| c as u32),
        ClearValue::Uint(v) => v,
        ClearValue::DepthStencil { .. } => [0; 4],
    }
}

fn depth_stencil_values(value: ClearValue) -> (f32, u8) {
    match value {
        ClearValue::DepthStencil { depth, stencil } => (depth, stencil as u8),
        _ => (0.0, 0),
    }
}

impl UtilsEngine {
    /// Clears `params.clear_area` of the framebuffer with a full-screen draw.
    ///
    /// Used for masked clears and for clears of part of an attachment. The draw is recorded in
    /// the framebuffer's own render pass, which is left open.
    pub fn clear_framebuffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        framebuffer: &FramebufferTarget,
        params: &ClearFramebufferParameters,
    ) -> Result<()> {
        let features = self.features(device);

        if cmd.active_render_pass() == Some(framebuffer.serial) {
            cmd.grow_render_area(params.clear_area);
        } else {
            begin_render_pass(cmd, framebuffer.begin(params.clear_area))?;
        }

        let (clear_depth, clear_stencil) = depth_stencil_values(params.depth_stencil_clear_value);
        let shader_params = ImageClearShaderParams {
            clear_value: clear_value_bits(params.color_clear_value),
            clear_depth,
        };

        let mut desc = GraphicsPipelineDesc::new(framebuffer.render_pass);
        desc.subpass = framebuffer.subpass;
        desc.color_write_masks = [wgpu::ColorWrites::empty(); MAX_DRAW_BUFFERS];
        if params.clear_color {
            desc.color_write_masks[params.color_attachment_index_gl as usize] = params.color_mask;
        }
        if params.clear_depth {
            desc.depth = depth_state_for_write(features.supports_depth_clamp);
        }
        if params.clear_stencil {
            desc.stencil = StencilState::replace_always();
        }

        let fragment = params.clear_color.then(|| {
            let flags = ImageClearFlags::new(
                params.color_attachment_index_gl,
                params.color_format,
                params.clear_depth,
            );
            ShaderSource::Library(ShaderKey::new(ShaderProgram::ImageClearFrag, flags.bits()))
        });
        self.setup_graphics_program(
            device,
            cmd,
            Function::ImageClear,
            full_screen_tri(),
            fragment,
            &desc,
            None,
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.set_viewport(Viewport::from_rect(framebuffer.complete_render_area, 0.0, 1.0));
        cmd.set_scissor(params.clear_area);
        if features.supports_dynamic_depth_stencil_state {
            cmd.set_depth_state(desc.depth);
            cmd.set_stencil_state(desc.stencil);
        }
        if params.clear_stencil {
            cmd.set_stencil_compare_mask(0xFF);
            cmd.set_stencil_write_mask(params.stencil_mask);
            cmd.set_stencil_reference(clear_stencil);
        }

        cmd.draw(3, 0);
        Ok(())
    }

    /// Clears part of one level/layer of a color image through a temporary render pass.
    ///
    /// Images the backend cannot render to are left untouched.
    pub fn clear_image(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        image: &mut ImageHelper,
        params: &ClearImageParameters,
    ) -> Result<()> {
        let actual = image.actual_format();
        if !format::is_color_renderable(actual) {
            tracing::warn!(?actual, "clear of a non-renderable image skipped");
            return Ok(());
        }
        let features = self.features(device);

        let level_vk = image.to_vk_level(params.dst_level);
        let view = device.create_image_view(&view_desc(
            image,
            level_vk,
            params.dst_layer,
            1,
            wgpu::TextureAspect::All,
        ))?;

        end_render_pass_for_outside_commands(cmd);
        image.change_layout(
            cmd,
            ImageLayout::ColorAttachment,
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            Access::COLOR_ATTACHMENT_WRITE,
        );

        let mut render_pass = RenderPassDesc {
            samples: image.samples(),
            ..RenderPassDesc::default()
        };
        render_pass.colors[0] = format::texture_format(actual);
        self.start_render_pass(cmd, render_pass, view, params.clear_area, LoadOp::Load)?;

        let mut desc = GraphicsPipelineDesc::new(render_pass);
        desc.set_color_write_masks(params.color_mask, 1);

        let flags = ImageClearFlags::new(0, actual, false);
        let shader_params = ImageClearShaderParams {
            clear_value: clear_value_bits(params.color_clear_value),
            clear_depth: 0.0,
        };
        self.setup_graphics_program(
            device,
            cmd,
            Function::ImageClear,
            full_screen_tri(),
            Some(ShaderSource::Library(ShaderKey::new(
                ShaderProgram::ImageClearFrag,
                flags.bits(),
            ))),
            &desc,
            None,
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.set_viewport(Viewport::from_rect(params.clear_area, 0.0, 1.0));
        cmd.set_scissor(params.clear_area);
        set_depth_stencil_unused(&features, cmd);
        cmd.draw(3, 0);

        image.on_write(params.dst_level, params.dst_layer, 1, ImageAspects::COLOR);
        cmd.end_render_pass(RenderPassClosureReason::TemporaryForImageClear);
        Ok(())
    }

    /// Clears a whole level/layer of an image with a render pass load op.
    pub fn clear_texture(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        image: &mut ImageHelper,
        params: &ClearTextureParameters,
    ) -> Result<()> {
        let level_vk = image.to_vk_level(params.level);
        let extents = image.level_extents(level_vk);
        let render_area = Rectangle::new(0, 0, extents.width as i32, extents.height as i32);
        let texture_format = format::texture_format(image.actual_format());

        let mut render_pass = RenderPassDesc {
            samples: image.samples(),
            ..RenderPassDesc::default()
        };
        let (aspect, layout, stages, access) = if params.aspects.contains(ImageAspects::COLOR) {
            render_pass.colors[0] = texture_format;
            (
                wgpu::TextureAspect::All,
                ImageLayout::ColorAttachment,
                PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                Access::COLOR_ATTACHMENT_WRITE,
            )
        } else {
            render_pass.depth_stencil = texture_format;
            let aspect = if params.aspects == ImageAspects::DEPTH {
                wgpu::TextureAspect::DepthOnly
            } else if params.aspects == ImageAspects::STENCIL {
                wgpu::TextureAspect::StencilOnly
            } else {
                wgpu::TextureAspect::All
            };
            (
                aspect,
                ImageLayout::DepthStencilAttachment,
                PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS,
                Access::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        };

        let view = device.create_image_view(&view_desc(image, level_vk, params.layer, 1, aspect))?;

        end_render_pass_for_outside_commands(cmd);
        image.change_layout(cmd, layout, stages, access);
        self.start_render_pass(
            cmd,
            render_pass,
            view,
            render_area,
            LoadOp::Clear(params.clear_value),
        )?;

        image.on_write(params.level, params.layer, 1, params.aspects);
        cmd.end_render_pass(RenderPassClosureReason::TemporaryForClearTexture);
        Ok(())
    }
}
