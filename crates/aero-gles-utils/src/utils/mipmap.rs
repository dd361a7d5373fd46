//! Mipmap generation, either with one compute dispatch writing several levels at once or with a
//! chain of full-screen draws sampling level N into level N+1.

use aero_gles_texture::Rectangle;

use super::flags::{BlitResolveFlags, GenerateMipmapFlags, ShaderFlags};
use super::params::{BlitResolveShaderParams, GenerateMipmapParameters, GenerateMipmapShaderParams};
use super::{end_render_pass_for_outside_commands, set_depth_stencil_unused, Function, UtilsEngine};
use crate::error::Result;
use crate::format;
use crate::hal::{
    Access, CommandRecorder, DescriptorResource, DescriptorType, DescriptorWrite, Device,
    GraphicsPipelineDesc, ImageAspects, ImageBarrier, ImageLayout, ImageViewHandle, LoadOp,
    PipelineStages, RenderPassClosureReason, RenderPassDesc, ShaderSource, Viewport,
};
use crate::image::{view_desc, ImageHelper, ImageType};
use crate::shaders::{ShaderKey, ShaderProgram};

/// Each compute workgroup downsamples a 64x64 tile of the source level.
const GENERATE_MIPMAP_TILE_SIZE: u32 = 64;

/// Barrier handing one level written as a color attachment to fragment shader reads.
fn level_read_barrier(image: &ImageHelper, level_vk: u32) -> ImageBarrier {
    ImageBarrier {
        image: image.handle(),
        aspects: ImageAspects::COLOR,
        base_level: level_vk,
        level_count: 1,
        base_layer: 0,
        layer_count: image.layer_count(),
        old_layout: ImageLayout::ColorAttachment,
        new_layout: ImageLayout::ShaderReadOnly,
        src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
        src_access: Access::COLOR_ATTACHMENT_WRITE,
        dst_stages: PipelineStages::FRAGMENT_SHADER,
        dst_access: Access::SHADER_READ,
    }
}

impl UtilsEngine {
    /// Whether mipmaps of `image` are generated with draws rather than the compute shader.
    pub fn should_generate_mipmap_with_draw(&self, image: &ImageHelper) -> bool {
        self.config().prefer_draw_mipmap_generation
            && image.image_type() == ImageType::D2
            && image.samples() == 1
            && format::is_color_renderable(image.actual_format())
    }

    /// Downsamples `params.src_level` of `src` into up to six (four when storage images are
    /// limited) following levels of `dst` in one dispatch.
    ///
    /// `dst_level_views` holds one storage view per destination level; missing trailing entries
    /// reuse the last view. Layout transitions and content tracking are left to the caller so
    /// consecutive layers need no barriers in between.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_mipmap(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        src: &ImageHelper,
        src_level_zero_view: ImageViewHandle,
        dst: &ImageHelper,
        dst_level_views: &[ImageViewHandle],
        params: &GenerateMipmapParameters,
    ) -> Result<()> {
        let features = self.features(device);
        let max_levels = self.config().generate_mipmap_levels(&features);
        assert!(params.dst_level_count >= 1 && params.dst_level_count <= max_levels);
        let Some(&last_view) = dst_level_views.last() else {
            panic!("generate_mipmap needs at least one destination view");
        };
        assert!(dst_level_views.len() <= max_levels as usize);

        let src_extents = src.level_extents(src.to_vk_level(params.src_level));
        assert_eq!(src_extents.depth, 1);

        let shader_params = GenerateMipmapShaderParams {
            inv_src_extent: [
                1.0 / src_extents.width as f32,
                1.0 / src_extents.height as f32,
            ],
            level_count: params.dst_level_count,
            _padding: 0,
        };
        let flags = GenerateMipmapFlags::new(
            src.actual_format(),
            features.supports_shader_float16,
            max_levels,
        );

        end_render_pass_for_outside_commands(cmd);

        let set = self.allocate_descriptor_set(device, Function::GenerateMipmap)?;
        let sampler = self.linear_sampler(device)?;
        let mut writes: Vec<DescriptorWrite> = (0..max_levels)
            .map(|level| DescriptorWrite {
                binding: 0,
                array_element: level,
                ty: DescriptorType::StorageImage,
                resource: DescriptorResource::Image {
                    view: dst_level_views
                        .get(level as usize)
                        .copied()
                        .unwrap_or(last_view),
                    layout: dst.current_layout(),
                },
            })
            .collect();
        writes.push(DescriptorWrite {
            binding: 1,
            array_element: 0,
            ty: DescriptorType::CombinedImageSampler,
            resource: DescriptorResource::CombinedImageSampler {
                view: src_level_zero_view,
                sampler,
            },
        });
        cmd.update_descriptor_set(set, &writes);

        self.setup_compute_program(
            device,
            cmd,
            Function::GenerateMipmap,
            ShaderKey::new(ShaderProgram::GenerateMipmapComp, flags.bits()),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;
        cmd.dispatch(
            src_extents.width.div_ceil(GENERATE_MIPMAP_TILE_SIZE),
            src_extents.height.div_ceil(GENERATE_MIPMAP_TILE_SIZE),
            1,
        );
        Ok(())
    }

    /// Generates every level after the first allocated one by drawing each level from the one
    /// before it, layer by layer.
    ///
    /// Only single-sampled 2D color-renderable images qualify. The whole image ends up in
    /// [`ImageLayout::ShaderReadOnly`].
    pub fn generate_mipmap_with_draw(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        image: &mut ImageHelper,
        mipmap_filtered: bool,
    ) -> Result<()> {
        let actual = image.actual_format();
        assert!(image.image_type() == ImageType::D2 && image.samples() == 1);
        assert!(format::is_color_renderable(actual));
        let features = self.features(device);

        let layer_count = image.layer_count();
        let level_count = image.level_count();
        let base_level_gl = image.first_allocated_level();
        let base_level_vk = image.to_vk_level(base_level_gl);
        let max_level_vk = base_level_vk + level_count - 1;

        end_render_pass_for_outside_commands(cmd);
        image.change_layout(
            cmd,
            ImageLayout::ColorAttachment,
            PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            Access::COLOR_ATTACHMENT_WRITE,
        );

        let flags = BlitResolveFlags::new(Some(actual), false, false, layer_count, 1);
        let fragment = ShaderKey::new(ShaderProgram::BlitResolveFrag, flags.bits());

        let mut render_pass = RenderPassDesc {
            samples: 1,
            ..RenderPassDesc::default()
        };
        render_pass.colors[0] = format::texture_format(actual);
        let mut desc = GraphicsPipelineDesc::new(render_pass);
        desc.set_color_write_masks(wgpu::ColorWrites::ALL, 1);

        let mut shader_params = BlitResolveShaderParams {
            stretch: [1.0, 1.0],
            samples: 1,
            inv_samples: 1.0,
            output_mask: 1,
            ..BlitResolveShaderParams::default()
        };
        shader_params.set_blit_offset(0.0, 0.0);

        let sampler = if mipmap_filtered {
            self.linear_sampler(device)?
        } else {
            self.point_sampler(device)?
        };

        for src_level_vk in base_level_vk..max_level_vk {
            cmd.image_barrier(level_read_barrier(image, src_level_vk));

            let dst_level_vk = src_level_vk + 1;
            let extents = image.level_extents(dst_level_vk);
            let render_area = Rectangle::new(0, 0, extents.width as i32, extents.height as i32);
            shader_params.inv_src_extent = [
                1.0 / render_area.width as f32,
                1.0 / render_area.height as f32,
            ];

            for layer in 0..layer_count {
                let src_view = device.create_image_view(&view_desc(
                    image,
                    src_level_vk,
                    layer,
                    1,
                    wgpu::TextureAspect::All,
                ))?;
                let dst_view = device.create_image_view(&view_desc(
                    image,
                    dst_level_vk,
                    layer,
                    1,
                    wgpu::TextureAspect::All,
                ))?;

                self.start_render_pass(cmd, render_pass, dst_view, render_area, LoadOp::Load)?;

                let set = self.allocate_descriptor_set(device, Function::BlitResolve)?;
                cmd.update_descriptor_set(
                    set,
                    &[
                        DescriptorWrite {
                            binding: 0,
                            array_element: 0,
                            ty: DescriptorType::SampledImage,
                            resource: DescriptorResource::Image {
                                view: src_view,
                                layout: ImageLayout::ShaderReadOnly,
                            },
                        },
                        DescriptorWrite {
                            binding: 2,
                            array_element: 0,
                            ty: DescriptorType::Sampler,
                            resource: DescriptorResource::Sampler(sampler),
                        },
                    ],
                );

                shader_params.src_layer = layer as i32;
                self.setup_graphics_program(
                    device,
                    cmd,
                    Function::BlitResolve,
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
            }

            cmd.end_render_pass(RenderPassClosureReason::GenerateMipmapWithDraw);
            let dst_level_gl = base_level_gl + (dst_level_vk - base_level_vk);
            image.on_write(dst_level_gl, 0, layer_count, ImageAspects::COLOR);
        }

        cmd.image_barrier(level_read_barrier(image, max_level_vk));
        image.set_current_layout(ImageLayout::ShaderReadOnly);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aero_gles_texture::{Extents, InternalFormat};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::UtilsConfig;
    use crate::hal::recording::{Command, RecordingCommands, RecordingDevice};
    use crate::hal::{Features, ImageHandle};

    fn image(layers: u32, levels: u32) -> ImageHelper {
        ImageHelper::new(
            ImageHandle(4),
            ImageType::D2,
            InternalFormat::Rgba8,
            Extents::new(256, 128, 1),
            0,
            levels,
            layers,
            1,
        )
    }

    #[test]
    fn compute_mipmap_fills_unused_level_views_with_the_last() {
        let mut device = RecordingDevice::new(Features {
            max_per_stage_storage_images: 4,
            ..Features::default()
        });
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let img = image(1, 5);

        let views = [ImageViewHandle(10), ImageViewHandle(11)];
        let params = GenerateMipmapParameters {
            src_level: 0,
            dst_level_count: 2,
        };
        engine
            .generate_mipmap(&mut device, &mut cmd, &img, ImageViewHandle(1), &img, &views, &params)
            .expect("mipmap");

        let writes = cmd
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::UpdateDescriptorSet(_, writes) => Some(writes.clone()),
                _ => None,
            })
            .expect("descriptor update");
        let storage_views: Vec<_> = writes
            .iter()
            .filter_map(|w| match w.resource {
                DescriptorResource::Image { view, .. } => Some((w.array_element, view)),
                _ => None,
            })
            .collect();
        assert_eq!(
            storage_views,
            vec![
                (0, ImageViewHandle(10)),
                (1, ImageViewHandle(11)),
                (2, ImageViewHandle(11)),
                (3, ImageViewHandle(11)),
            ]
        );
        assert_eq!(cmd.dispatches(), vec![(4, 2, 1)]);
    }

    #[test]
    fn draw_mipmap_closes_one_pass_per_level() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut img = image(2, 3);

        engine
            .generate_mipmap_with_draw(&mut device, &mut cmd, &mut img, true)
            .expect("mipmap");

        let commands = cmd.commands();
        let draws = commands.iter().filter(|c| matches!(c, Command::Draw { .. })).count();
        assert_eq!(draws, 4);

        let closures: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::EndRenderPass(reason) => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            closures,
            vec![
                RenderPassClosureReason::NewRenderPass,
                RenderPassClosureReason::GenerateMipmapWithDraw,
                RenderPassClosureReason::NewRenderPass,
                RenderPassClosureReason::GenerateMipmapWithDraw,
            ]
        );

        let read_levels: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::ImageBarrier(b) if b.new_layout == ImageLayout::ShaderReadOnly => {
                    Some(b.base_level)
                }
                _ => None,
            })
            .collect();
        assert_eq!(read_levels, vec![0, 1, 2]);
        assert_eq!(img.current_layout(), ImageLayout::ShaderReadOnly);
        assert!(img.has_subresource_defined_content(2, 0, 2));
    }

    #[test]
    fn draw_generation_is_opt_in() {
        let img = image(1, 4);
        assert!(!UtilsEngine::default().should_generate_mipmap_with_draw(&img));

        let engine = UtilsEngine::new(UtilsConfig {
            prefer_draw_mipmap_generation: true,
            ..UtilsConfig::default()
        });
        assert!(engine.should_generate_mipmap_with_draw(&img));
    }
}
