//! Foveated rendering: fills a fragment shading rate attachment from a set of focal points.

use super::params::{
    FocalPoint, GenerateFragmentShadingRateParameters, GenerateFragmentShadingRateShaderParams,
    MAX_FOCAL_POINTS,
};
use super::{end_render_pass_for_outside_commands, Function, UtilsEngine};
use crate::error::Result;
use crate::hal::{
    Access, CommandRecorder, DescriptorResource, DescriptorType, DescriptorWrite, Device,
    ImageLayout, ImageViewHandle, PipelineStages,
};
use crate::image::ImageHelper;
use crate::shaders::{ShaderKey, ShaderProgram};

const SHADING_RATE_GROUP_SIZE: u32 = 8;

impl UtilsEngine {
    pub fn generate_fragment_shading_rate(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        attachment: &mut ImageHelper,
        attachment_view: ImageViewHandle,
        params: &GenerateFragmentShadingRateParameters,
    ) -> Result<()> {
        let mut focal_points = [FocalPoint::default(); MAX_FOCAL_POINTS];
        let mut num_focal_points = 0;
        for point in params.focal_points.iter().flatten() {
            focal_points[num_focal_points] = *point;
            num_focal_points += 1;
        }

        let shader_params = GenerateFragmentShadingRateShaderParams {
            texture_width: params.texture_width,
            texture_height: params.texture_height,
            attachment_width: params.attachment_width,
            attachment_height: params.attachment_height,
            attachment_block_width: params.attachment_block_width,
            attachment_block_height: params.attachment_block_height,
            num_focal_points: num_focal_points as u32,
            _padding: 0,
            focal_points,
        };

        end_render_pass_for_outside_commands(cmd);
        attachment.change_layout(
            cmd,
            ImageLayout::General,
            PipelineStages::COMPUTE_SHADER,
            Access::SHADER_WRITE,
        );

        let set = self.allocate_descriptor_set(device, Function::GenerateFragmentShadingRate)?;
        cmd.update_descriptor_set(
            set,
            &[DescriptorWrite {
                binding: 0,
                array_element: 0,
                ty: DescriptorType::StorageImage,
                resource: DescriptorResource::Image {
                    view: attachment_view,
                    layout: attachment.current_layout(),
                },
            }],
        );

        self.setup_compute_program(
            device,
            cmd,
            Function::GenerateFragmentShadingRate,
            ShaderKey::new(ShaderProgram::GenerateFragmentShadingRateComp, 0),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;
        cmd.dispatch(
            params.attachment_width.div_ceil(SHADING_RATE_GROUP_SIZE),
            params.attachment_height.div_ceil(SHADING_RATE_GROUP_SIZE),
            1,
        );

        attachment.on_write(
            attachment.first_allocated_level(),
            0,
            attachment.layer_count(),
            attachment.aspects(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aero_gles_texture::{Extents, InternalFormat};

    use super::*;
    use crate::hal::recording::{Command, RecordingCommands, RecordingDevice};
    use crate::hal::{Features, ImageHandle};
    use crate::image::ImageType;

    #[test]
    fn focal_points_are_packed_and_counted() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut attachment = ImageHelper::new(
            ImageHandle(8),
            ImageType::D2,
            InternalFormat::R8Ui,
            Extents::new(60, 34, 1),
            0,
            1,
            1,
            1,
        );

        let fovea = FocalPoint {
            focus_x: 0.25,
            focus_y: -0.5,
            gain_x: 2.0,
            gain_y: 2.0,
            fovea_area: 0.1,
            _padding: [0.0; 3],
        };
        let params = GenerateFragmentShadingRateParameters {
            texture_width: 960,
            texture_height: 544,
            attachment_width: 60,
            attachment_height: 34,
            attachment_block_width: 16,
            attachment_block_height: 16,
            focal_points: [None, Some(fovea)],
        };
        engine
            .generate_fragment_shading_rate(
                &mut device,
                &mut cmd,
                &mut attachment,
                ImageViewHandle(3),
                &params,
            )
            .expect("shading rate");

        assert_eq!(cmd.dispatches(), vec![(8, 5, 1)]);
        let pushed: GenerateFragmentShadingRateShaderParams = cmd
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::PushConstants(_, _, data) => Some(bytemuck::pod_read_unaligned(data)),
                _ => None,
            })
            .expect("push constants");
        assert_eq!(pushed.num_focal_points, 1);
        assert_eq!(pushed.focal_points[0], fovea);
        assert_eq!(attachment.current_layout(), ImageLayout::General);
    }
}
