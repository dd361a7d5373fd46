//! Debug overlay: instanced quads for graph and text widgets blended over the presented image.

use aero_gles_texture::Rectangle;

use super::params::{OverlayDrawParameters, OverlayDrawShaderParams};
use super::{buffer_resource, set_depth_stencil_unused, Function, UtilsEngine};
use crate::error::Result;
use crate::format;
use crate::hal::{
    Access, CommandRecorder, DescriptorResource, DescriptorType, DescriptorWrite, Device,
    GraphicsPipelineDesc, ImageAspects, ImageLayout, ImageViewHandle, LoadOp, PipelineStages,
    RenderPassClosureReason, RenderPassDesc, ShaderSource, Viewport,
};
use crate::image::{BufferHelper, ImageHelper};
use crate::shaders::{ShaderKey, ShaderProgram};

/// Each widget is one four-vertex triangle strip instance.
const WIDGET_VERTEX_COUNT: u32 = 4;

fn overlay_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

impl UtilsEngine {
    /// Draws the overlay widgets described by the two uniform buffers over `dst` in a render
    /// pass of its own.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_overlay(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        text_widgets: &BufferHelper,
        graph_widgets: &BufferHelper,
        font: &mut ImageHelper,
        font_view: ImageViewHandle,
        dst: &mut ImageHelper,
        dst_view: ImageViewHandle,
        params: &OverlayDrawParameters,
    ) -> Result<()> {
        assert!(
            dst.level_count() == 1 && dst.layer_count() == 1 && dst.first_allocated_level() == 0
        );
        let features = self.features(device);

        let extents = dst.extents();
        let mut shader_params = OverlayDrawShaderParams {
            viewport_size: [extents.width, extents.height],
            is_text: 0,
            rotate_xy: u32::from(params.rotate_xy),
        };
        if params.rotate_xy {
            shader_params.viewport_size.swap(0, 1);
        }
        let render_area = Rectangle::new(
            0,
            0,
            shader_params.viewport_size[0] as i32,
            shader_params.viewport_size[1] as i32,
        );

        let mut render_pass = RenderPassDesc {
            samples: 1,
            ..RenderPassDesc::default()
        };
        render_pass.colors[0] = format::texture_format(dst.actual_format());
        let mut desc = GraphicsPipelineDesc::new(render_pass);
        desc.topology = wgpu::PrimitiveTopology::TriangleStrip;
        desc.blend = Some(overlay_blend());

        font.change_layout(
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

        let set = self.allocate_descriptor_set(device, Function::OverlayDraw)?;
        cmd.update_descriptor_set(
            set,
            &[
                DescriptorWrite {
                    binding: 0,
                    array_element: 0,
                    ty: DescriptorType::UniformBuffer,
                    resource: buffer_resource(text_widgets),
                },
                DescriptorWrite {
                    binding: 1,
                    array_element: 0,
                    ty: DescriptorType::UniformBuffer,
                    resource: buffer_resource(graph_widgets),
                },
                DescriptorWrite {
                    binding: 2,
                    array_element: 0,
                    ty: DescriptorType::SampledImage,
                    resource: DescriptorResource::Image {
                        view: font_view,
                        layout: font.current_layout(),
                    },
                },
            ],
        );

        self.setup_graphics_program(
            device,
            cmd,
            Function::OverlayDraw,
            ShaderSource::Library(ShaderKey::new(ShaderProgram::OverlayDrawVert, 0)),
            Some(ShaderSource::Library(ShaderKey::new(ShaderProgram::OverlayDrawFrag, 0))),
            &desc,
            Some(set),
            &[],
        )?;

        cmd.set_viewport(Viewport::from_rect(render_area, 0.0, 1.0));
        cmd.set_scissor(render_area);
        set_depth_stencil_unused(&features, cmd);

        if params.graph_widget_count > 0 {
            shader_params.is_text = 0;
            self.push_constants(
                device,
                cmd,
                Function::OverlayDraw,
                bytemuck::bytes_of(&shader_params),
            )?;
            cmd.draw_instanced(WIDGET_VERTEX_COUNT, params.graph_widget_count, 0);
        }
        if params.text_widget_count > 0 {
            shader_params.is_text = 1;
            self.push_constants(
                device,
                cmd,
                Function::OverlayDraw,
                bytemuck::bytes_of(&shader_params),
            )?;
            cmd.draw_instanced(WIDGET_VERTEX_COUNT, params.text_widget_count, 0);
        }

        dst.on_write(0, 0, 1, ImageAspects::COLOR);
        cmd.end_render_pass(RenderPassClosureReason::TemporaryForOverlayDraw);
        Ok(())
    }
}
