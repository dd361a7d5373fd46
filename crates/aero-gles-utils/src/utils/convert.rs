//! Index and vertex buffer conversion dispatches.

use super::flags::{ConvertIndexFlags, ConvertVertexFlags, ShaderFlags, FLOAT32_ONE};
use super::params::{
    ConvertIndexIndirectParameters, ConvertIndexIndirectShaderParams,
    ConvertIndexIndirectLineLoopShaderParams, ConvertIndexParameters, ConvertIndexShaderParams,
    ConvertIndirectLineLoopShaderParams, ConvertLineLoopArrayIndirectParameters,
    ConvertLineLoopIndexIndirectParameters, ConvertVertexParameters, ConvertVertexShaderParams,
    OffsetAndVertexCount,
};
use super::{end_render_pass_for_outside_commands, storage_buffer_writes, Function, UtilsEngine};
use crate::error::Result;
use crate::format::{NumericClass, VertexPacking};
use crate::hal::{CommandRecorder, Device};
use crate::image::BufferHelper;
use crate::shaders::{ShaderKey, ShaderProgram};

const INVOCATIONS_PER_GROUP: u32 = 64;
/// Each source index is handled by two invocations (one per 16-bit half).
const INVOCATIONS_PER_INDEX: u32 = 2;

fn index_group_count(max_index: u32) -> u32 {
    (max_index * INVOCATIONS_PER_INDEX).div_ceil(INVOCATIONS_PER_GROUP)
}

impl UtilsEngine {
    /// Widens 8-bit indices in `src` into 16-bit indices in `dst`.
    pub fn convert_index_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &BufferHelper,
        src: &BufferHelper,
        params: &ConvertIndexParameters,
    ) -> Result<()> {
        end_render_pass_for_outside_commands(cmd);

        let set = self.allocate_descriptor_set(device, Function::ConvertIndexBuffer)?;
        cmd.update_descriptor_set(set, &storage_buffer_writes(0, &[dst, src]));

        let shader_params = ConvertIndexShaderParams {
            src_offset: params.src_offset,
            dst_offset_div4: params.dst_offset >> 2,
            max_index: params.max_index,
            _padding: 0,
        };
        let flags = ConvertIndexFlags {
            primitive_restart: params.primitive_restart,
            indirect: false,
        };
        self.setup_compute_program(
            device,
            cmd,
            Function::ConvertIndexBuffer,
            ShaderKey::new(ShaderProgram::ConvertIndexComp, flags.bits()),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.dispatch(index_group_count(params.max_index), 1, 1);
        Ok(())
    }

    /// Widens the 8-bit indices an indirect draw references and rewrites its command.
    pub fn convert_index_indirect_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        src_indirect: &BufferHelper,
        src_index: &BufferHelper,
        dst_indirect: &BufferHelper,
        dst_index: &BufferHelper,
        params: &ConvertIndexIndirectParameters,
    ) -> Result<()> {
        end_render_pass_for_outside_commands(cmd);

        let set = self.allocate_descriptor_set(device, Function::ConvertIndexIndirectBuffer)?;
        cmd.update_descriptor_set(
            set,
            &storage_buffer_writes(0, &[dst_index, src_index, src_indirect, dst_indirect]),
        );

        let shader_params = ConvertIndexIndirectShaderParams {
            src_indirect_offset_div4: params.src_indirect_buffer_offset >> 2,
            src_offset: params.src_index_buffer_offset,
            dst_offset_div4: params.dst_index_buffer_offset >> 2,
            max_index: params.max_index,
            dst_indirect_offset_div4: params.dst_indirect_buffer_offset >> 2,
        };
        let flags = ConvertIndexFlags {
            primitive_restart: params.primitive_restart,
            indirect: true,
        };
        self.setup_compute_program(
            device,
            cmd,
            Function::ConvertIndexIndirectBuffer,
            ShaderKey::new(ShaderProgram::ConvertIndexComp, flags.bits()),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.dispatch(index_group_count(params.max_index), 1, 1);
        Ok(())
    }

    /// Builds a closed line-loop index list and its indexed indirect command from an indexed
    /// indirect line-loop draw.
    pub fn convert_line_loop_index_indirect_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        src_indirect: &BufferHelper,
        src_index: &BufferHelper,
        dst_indirect: &BufferHelper,
        dst_index: &BufferHelper,
        params: &ConvertLineLoopIndexIndirectParameters,
    ) -> Result<()> {
        end_render_pass_for_outside_commands(cmd);

        let function = Function::ConvertIndexIndirectLineLoopBuffer;
        let set = self.allocate_descriptor_set(device, function)?;
        cmd.update_descriptor_set(
            set,
            &storage_buffer_writes(0, &[dst_index, src_index, src_indirect, dst_indirect]),
        );

        let shader_params = ConvertIndexIndirectLineLoopShaderParams {
            cmd_offset_div4: params.indirect_buffer_offset >> 2,
            dst_cmd_offset_div4: params.dst_indirect_buffer_offset >> 2,
            src_offset: params.src_index_buffer_offset,
            dst_offset_div4: params.dst_index_buffer_offset >> 2,
            is_restart_enabled: u32::from(params.primitive_restart),
        };
        self.setup_compute_program(
            device,
            cmd,
            function,
            ShaderKey::new(
                ShaderProgram::ConvertIndexIndirectLineLoopComp,
                params.index_width.bits(),
            ),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.dispatch(1, 1, 1);
        Ok(())
    }

    /// Builds the `0..count, 0` index list and an indexed indirect command from an array
    /// indirect line-loop draw.
    pub fn convert_line_loop_array_indirect_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        src_indirect: &BufferHelper,
        dst_indirect: &BufferHelper,
        dst_index: &BufferHelper,
        params: &ConvertLineLoopArrayIndirectParameters,
    ) -> Result<()> {
        end_render_pass_for_outside_commands(cmd);

        let function = Function::ConvertIndirectLineLoopBuffer;
        let set = self.allocate_descriptor_set(device, function)?;
        cmd.update_descriptor_set(
            set,
            &storage_buffer_writes(0, &[src_indirect, dst_indirect, dst_index]),
        );

        let shader_params = ConvertIndirectLineLoopShaderParams {
            cmd_offset_div4: params.indirect_buffer_offset >> 2,
            dst_cmd_offset_div4: params.dst_indirect_buffer_offset >> 2,
            dst_offset_div4: params.dst_index_buffer_offset >> 2,
        };
        self.setup_compute_program(
            device,
            cmd,
            function,
            ShaderKey::new(ShaderProgram::ConvertIndirectLineLoopComp, 0),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;

        cmd.dispatch(1, 1, 1);
        Ok(())
    }

    /// Converts vertex attributes from `params.src_format` to `params.dst_format`.
    ///
    /// Each entry of `additional` converts another range with the same pipeline and descriptor
    /// set. The ranges read the same source and write the same destination, so no barrier is
    /// recorded between them.
    pub fn convert_vertex_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &BufferHelper,
        src: &BufferHelper,
        params: &ConvertVertexParameters,
        additional: &[OffsetAndVertexCount],
    ) -> Result<()> {
        let src_format = &params.src_format;
        let dst_format = &params.dst_format;

        let ns = src_format.channel_count;
        let bs = src_format.pixel_bytes() / ns;
        let nd = dst_format.channel_count;
        let bd = dst_format.pixel_bytes() / nd;
        assert!(4 % bs == 0 && 4 % bd == 0, "channels must pack into 32-bit words");

        let flags = ConvertVertexFlags::for_formats(src_format, dst_format);
        let component_count = params.vertex_count as u32 * nd;
        let ed = 4 / bd;
        let shader_params = ConvertVertexShaderParams {
            output_count: component_count.div_ceil(ed),
            component_count,
            src_offset: params.src_offset as u32,
            dst_offset: params.dst_offset as u32,
            ns,
            bs,
            ss: params.src_stride as u32,
            es: 4 / bs,
            nd,
            bd,
            sd: nd * bd,
            ed,
            src_emulated_alpha: if ns < nd {
                flags.emulated_alpha(src_format, dst_format)
            } else {
                0
            },
            is_src_hdr: u32::from(src_format.is_packed_1010102()),
            is_src_a2bgr10: u32::from(src_format.packing == VertexPacking::A2Bgr10),
            _padding: 0,
        };

        self.convert_vertex_buffer_impl(device, cmd, dst, src, flags, shader_params, additional)
    }

    /// Expands tightly packed 32-bit RGB texels into RGBA, filling alpha with one.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_rgb_to_rgba(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        src_class: NumericClass,
        src: &BufferHelper,
        src_offset: u32,
        pixel_count: u32,
        dst: &BufferHelper,
    ) -> Result<()> {
        let (flags, src_emulated_alpha) = match src_class {
            NumericClass::Uint => (ConvertVertexFlags::UintToUint, 1),
            NumericClass::Sint => (ConvertVertexFlags::SintToSint, 1),
            NumericClass::Float => (ConvertVertexFlags::FloatToFloat, FLOAT32_ONE),
        };
        let component_count = pixel_count * 4;
        let shader_params = ConvertVertexShaderParams {
            output_count: component_count,
            component_count,
            src_offset,
            dst_offset: 0,
            ns: 3,
            bs: 4,
            ss: 12,
            es: 1,
            nd: 4,
            bd: 4,
            sd: 16,
            ed: 1,
            src_emulated_alpha,
            is_src_hdr: 0,
            is_src_a2bgr10: 0,
            _padding: 0,
        };
        self.convert_vertex_buffer_impl(device, cmd, dst, src, flags, shader_params, &[])
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn convert_vertex_buffer_impl(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        dst: &BufferHelper,
        src: &BufferHelper,
        flags: ConvertVertexFlags,
        shader_params: ConvertVertexShaderParams,
        additional: &[OffsetAndVertexCount],
    ) -> Result<()> {
        // The shader writes whole words at the destination.
        assert_eq!(dst.offset % 4, 0, "destination must be 4-byte aligned");
        end_render_pass_for_outside_commands(cmd);

        let function = Function::ConvertVertexBuffer;
        let set = self.allocate_descriptor_set(device, function)?;
        cmd.update_descriptor_set(set, &storage_buffer_writes(0, &[dst, src]));

        self.setup_compute_program(
            device,
            cmd,
            function,
            ShaderKey::new(ShaderProgram::ConvertVertexComp, flags.bits()),
            Some(set),
            bytemuck::bytes_of(&shader_params),
        )?;
        cmd.dispatch(shader_params.output_count.div_ceil(INVOCATIONS_PER_GROUP), 1, 1);

        for range in additional {
            let component_count = range.vertex_count * shader_params.nd;
            let constants = ConvertVertexShaderParams {
                component_count,
                output_count: component_count.div_ceil(shader_params.ed),
                src_offset: range.src_offset,
                dst_offset: range.dst_offset,
                ..shader_params
            };
            self.push_constants(device, cmd, function, bytemuck::bytes_of(&constants))?;
            cmd.dispatch(constants.output_count.div_ceil(INVOCATIONS_PER_GROUP), 1, 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{VertexFormat, VertexKind};
    use crate::hal::recording::{Command, RecordingCommands, RecordingDevice};
    use crate::hal::{BufferHandle, DescriptorResource, Features};

    fn buffer(id: u32, offset: u64) -> BufferHelper {
        BufferHelper::new(BufferHandle(id), offset, 1024)
    }

    #[test]
    fn index_conversion_dispatches_two_invocations_per_index() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();

        let params = ConvertIndexParameters {
            src_offset: 3,
            dst_offset: 8,
            max_index: 100,
            primitive_restart: true,
        };
        engine
            .convert_index_buffer(&mut device, &mut cmd, &buffer(1, 0), &buffer(2, 0), &params)
            .expect("convert");

        assert_eq!(cmd.dispatches(), vec![(4, 1, 1)]);
        let pushed: ConvertIndexShaderParams =
            bytemuck::pod_read_unaligned(cmd.push_constant_blocks()[0]);
        assert_eq!(pushed.dst_offset_div4, 2);
        assert_eq!(pushed.src_offset, 3);
    }

    #[test]
    fn indirect_index_buffers_bind_destination_first() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();

        engine
            .convert_index_indirect_buffer(
                &mut device,
                &mut cmd,
                &buffer(10, 0),
                &buffer(11, 0),
                &buffer(12, 0),
                &buffer(13, 0),
                &ConvertIndexIndirectParameters::default(),
            )
            .expect("convert");

        let writes = cmd
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::UpdateDescriptorSet(_, writes) => Some(writes.clone()),
                _ => None,
            })
            .expect("descriptor update");
        let order: Vec<(u32, u32)> = writes
            .iter()
            .map(|w| match w.resource {
                DescriptorResource::Buffer { buffer, .. } => (w.binding, buffer.0),
                _ => panic!("expected buffers"),
            })
            .collect();
        assert_eq!(order, vec![(0, 13), (1, 11), (2, 10), (3, 12)]);
    }

    #[test]
    fn vertex_conversion_fills_missing_alpha() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();

        let params = ConvertVertexParameters {
            vertex_count: 10,
            src_format: VertexFormat::new(VertexKind::Unorm, 3, 1),
            dst_format: VertexFormat::new(VertexKind::Float, 4, 4),
            src_stride: 3,
            src_offset: 0,
            dst_offset: 0,
        };
        let extra = [OffsetAndVertexCount {
            src_offset: 300,
            dst_offset: 640,
            vertex_count: 100,
        }];
        engine
            .convert_vertex_buffer(
                &mut device,
                &mut cmd,
                &buffer(1, 0),
                &buffer(2, 0),
                &params,
                &extra,
            )
            .expect("convert");

        let blocks = cmd.push_constant_blocks();
        assert_eq!(blocks.len(), 2);
        let first: ConvertVertexShaderParams = bytemuck::pod_read_unaligned(blocks[0]);
        assert_eq!(first.bs, 1);
        assert_eq!(first.es, 4);
        assert_eq!(first.component_count, 40);
        assert_eq!(first.output_count, 40);
        assert_eq!(first.src_emulated_alpha, 0xFF);

        let second: ConvertVertexShaderParams = bytemuck::pod_read_unaligned(blocks[1]);
        assert_eq!(second.component_count, 400);
        assert_eq!(second.src_offset, 300);
        assert_eq!(second.dst_offset, 640);
        assert_eq!(cmd.dispatches(), vec![(1, 1, 1), (7, 1, 1)]);
        assert_eq!(engine.compute_pipeline_count(), 1);
    }

    #[test]
    fn packed_sources_select_their_channel_order() {
        let cases = [(VertexPacking::A2Bgr10, 1), (VertexPacking::Rgb10A2, 0)];
        for (packing, a2bgr10) in cases {
            let mut device = RecordingDevice::new(Features::default());
            let mut cmd = RecordingCommands::new();
            let mut engine = UtilsEngine::default();

            let params = ConvertVertexParameters {
                vertex_count: 16,
                src_format: VertexFormat::packed_1010102(VertexKind::Snorm, packing),
                dst_format: VertexFormat::new(VertexKind::Float, 4, 4),
                src_stride: 4,
                src_offset: 0,
                dst_offset: 0,
            };
            engine
                .convert_vertex_buffer(
                    &mut device,
                    &mut cmd,
                    &buffer(1, 0),
                    &buffer(2, 0),
                    &params,
                    &[],
                )
                .expect("convert");

            let pushed: ConvertVertexShaderParams =
                bytemuck::pod_read_unaligned(cmd.push_constant_blocks()[0]);
            assert_eq!(pushed.is_src_hdr, 1, "{packing:?}");
            assert_eq!(pushed.is_src_a2bgr10, a2bgr10, "{packing:?}");
            assert_eq!((pushed.ns, pushed.bs), (4, 1));
        }
    }

    #[test]
    fn rgb_float_copy_uses_float_one_alpha() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();

        engine
            .copy_rgb_to_rgba(
                &mut device,
                &mut cmd,
                NumericClass::Float,
                &buffer(1, 0),
                12,
                5,
                &buffer(2, 0),
            )
            .expect("copy");
        let params: ConvertVertexShaderParams =
            bytemuck::pod_read_unaligned(cmd.push_constant_blocks()[0]);
        assert_eq!(params.src_emulated_alpha, FLOAT32_ONE);
        assert_eq!(params.output_count, 20);
        assert_eq!((params.ns, params.nd, params.ss, params.sd), (3, 4, 12, 16));
    }
}
