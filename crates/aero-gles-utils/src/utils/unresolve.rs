//! Unresolve: loading single-sampled resolve attachments back into the transient multisampled
//! attachments at the start of a multisampled-render-to-texture render pass.

use super::flags::{UnresolveColorType, UnresolveFlags};
use super::params::{ExportStencilShaderParams, UnresolveParameters};
use super::{depth_state_for_write, FramebufferTarget, Function, UtilsEngine};
use crate::error::Result;
use crate::hal::{
    CommandRecorder, DepthState, DescriptorResource, DescriptorType, DescriptorWrite, Device,
    GraphicsPipelineDesc, ImageAspects, ImageLayout, ImageViewHandle, ShaderSource, StencilState,
    Viewport, MAX_DRAW_BUFFERS,
};
use crate::render_target::RenderTarget;
use crate::shaders::{ShaderKey, ShaderProgram};

fn input_attachment(binding: u32, view: ImageViewHandle) -> DescriptorWrite {
    DescriptorWrite {
        binding,
        array_element: 0,
        ty: DescriptorType::InputAttachment,
        resource: DescriptorResource::Image {
            view,
            layout: ImageLayout::ShaderReadOnly,
        },
    }
}

impl UtilsEngine {
    /// Draws the resolve attachments selected by `params` into the open render pass of
    /// `framebuffer`.
    ///
    /// `color_targets` is indexed by GL draw buffer; every selected target and
    /// `depth_stencil_target` (when depth or stencil is selected) must have a resolve
    /// attachment. Without shader stencil export, stencil is written one bit per draw and must
    /// have been cleared to zero beforehand.
    pub fn unresolve(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        framebuffer: &FramebufferTarget,
        color_targets: &[Option<&RenderTarget>],
        depth_stencil_target: Option<&RenderTarget>,
        params: &UnresolveParameters,
    ) -> Result<()> {
        assert_eq!(
            cmd.active_render_pass(),
            Some(framebuffer.serial),
            "unresolve draws into the framebuffer's open render pass"
        );
        let features = self.features(device);

        // The unresolve subpass packs the selected attachments, so shader outputs are numbered
        // by selection order rather than GL index.
        let mut flags = UnresolveFlags::default();
        let mut color_views = Vec::with_capacity(MAX_DRAW_BUFFERS);
        for index_gl in 0..MAX_DRAW_BUFFERS {
            if params.color_mask & (1 << index_gl) == 0 {
                continue;
            }
            let Some(Some(target)) = color_targets.get(index_gl) else {
                panic!("unresolve of color attachment {index_gl} without a render target");
            };
            assert!(target.has_resolve_attachment() && target.is_image_transient());

            let format = target.resolve_image_for_render_pass().borrow().intended_format();
            flags.colors[color_views.len()] = UnresolveColorType::of(format);
            color_views.push(target.resolve_image_view(device)?);
        }

        let mut depth_view = None;
        let mut stencil_view = None;
        if params.depth || params.stencil {
            let Some(target) = depth_stencil_target else {
                panic!("unresolve of depth/stencil without a render target");
            };
            assert!(target.has_resolve_attachment() && target.is_image_transient());
            if params.depth {
                depth_view =
                    Some(target.resolve_depth_or_stencil_image_view(device, ImageAspects::DEPTH)?);
            }
            if params.stencil {
                stencil_view = Some(
                    target.resolve_depth_or_stencil_image_view(device, ImageAspects::STENCIL)?,
                );
            }
        }

        let stencil_with_export = params.stencil && features.supports_shader_stencil_export;
        flags.depth = params.depth;
        flags.stencil = stencil_with_export;

        let mut desc = GraphicsPipelineDesc::new(framebuffer.render_pass);
        desc.subpass = framebuffer.subpass;
        let vertex = ShaderSource::Library(ShaderKey::new(ShaderProgram::FullScreenTriVert, 0));

        cmd.set_viewport(Viewport::from_rect(framebuffer.complete_render_area, 0.0, 1.0));
        cmd.set_scissor(framebuffer.complete_render_area);

        let input_count = flags.input_count();
        if input_count > 0 {
            let function = Function::Unresolve(input_count);
            if params.depth {
                desc.depth = depth_state_for_write(features.supports_depth_clamp);
            }
            if stencil_with_export {
                desc.stencil = StencilState::replace_always();
            }

            let mut views = Vec::with_capacity(input_count as usize);
            if stencil_with_export {
                views.extend(stencil_view);
            }
            views.extend(depth_view);
            views.extend(color_views.iter().copied());
            let writes: Vec<_> = views
                .into_iter()
                .enumerate()
                .map(|(binding, view)| input_attachment(binding as u32, view))
                .collect();

            let set = self.allocate_descriptor_set(device, function)?;
            cmd.update_descriptor_set(set, &writes);

            self.setup_graphics_program(
                device,
                cmd,
                function,
                vertex.clone(),
                Some(ShaderSource::Unresolve(flags)),
                &desc,
                Some(set),
                &[],
            )?;

            if features.supports_dynamic_depth_stencil_state {
                cmd.set_depth_state(desc.depth);
                cmd.set_stencil_state(desc.stencil);
            }
            if stencil_with_export {
                cmd.set_stencil_compare_mask(0xFF);
                cmd.set_stencil_write_mask(0xFF);
                cmd.set_stencil_reference(0);
            }
            cmd.draw(3, 0);
        }

        if let (Some(stencil_view), false) = (stencil_view, stencil_with_export) {
            desc.color_write_masks = [wgpu::ColorWrites::empty(); MAX_DRAW_BUFFERS];
            desc.depth = DepthState::default();
            desc.stencil = StencilState::replace_always();

            let set = self.allocate_descriptor_set(device, Function::ExportStencil)?;
            cmd.update_descriptor_set(set, &[input_attachment(0, stencil_view)]);
            self.setup_graphics_program(
                device,
                cmd,
                Function::ExportStencil,
                vertex,
                Some(ShaderSource::Library(ShaderKey::new(
                    ShaderProgram::ExportStencilFrag,
                    0,
                ))),
                &desc,
                Some(set),
                &[],
            )?;

            if features.supports_dynamic_depth_stencil_state {
                cmd.set_depth_state(desc.depth);
                cmd.set_stencil_state(desc.stencil);
            }
            cmd.set_stencil_compare_mask(0xFF);
            cmd.set_stencil_reference(0xFF);

            // One draw per bit; the shader discards fragments whose source bit is clear.
            for bit in 0..8u32 {
                cmd.set_stencil_write_mask(1 << bit);
                let shader_params = ExportStencilShaderParams { bit };
                self.push_constants(
                    device,
                    cmd,
                    Function::ExportStencil,
                    bytemuck::bytes_of(&shader_params),
                )?;
                cmd.draw(3, 0);
            }
        }

        Ok(())
    }
}
