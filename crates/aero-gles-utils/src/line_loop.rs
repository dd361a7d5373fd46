//! Line-loop emulation.
//!
//! The GPU API has no line-loop topology, so line loops are drawn as line strips over an index
//! list that repeats the first vertex at the end. Index lists for host-visible draws are built on
//! the CPU; indirect draws, whose counts only exist on the device, are expanded by the engine's
//! line-loop compute functions.

use bytemuck::{Pod, Zeroable};

use crate::error::Result;
use crate::hal::{
    Access, BufferCopy, CommandRecorder, Device, MemoryBarrier, PipelineStages,
};
use crate::image::BufferHelper;
use crate::utils::flags::IndexWidth;
use crate::utils::params::{
    ConvertLineLoopArrayIndirectParameters, ConvertLineLoopIndexIndirectParameters,
};
use crate::utils::{create_scratch_buffer, end_render_pass_for_outside_commands, UtilsEngine};

/// Indexed indirect draw arguments as the device consumes them.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

const _: [(); 20] = [(); core::mem::size_of::<DrawIndexedIndirectArgs>()];

/// A generated line-loop index list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineLoopIndices {
    pub buffer: BufferHelper,
    pub index_count: u32,
    pub index_width: IndexWidth,
}

/// Generated index list plus the indirect command that draws it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineLoopIndirect {
    pub index_buffer: BufferHelper,
    pub indirect_buffer: BufferHelper,
}

fn restart_index(width: IndexWidth) -> u32 {
    match width {
        IndexWidth::U8 => 0xFF,
        IndexWidth::U16 => 0xFFFF,
        IndexWidth::U32 => 0xFFFF_FFFF,
    }
}

fn read_indices(width: IndexWidth, count: usize, src: &[u8]) -> Vec<u32> {
    let bytes = &src[..count * width.bytes() as usize];
    match width {
        IndexWidth::U8 => bytes.iter().map(|&i| u32::from(i)).collect(),
        IndexWidth::U16 => bytes
            .chunks_exact(2)
            .map(|c| u32::from(u16::from_ne_bytes([c[0], c[1]])))
            .collect(),
        IndexWidth::U32 => bytes
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}

fn write_indices(width: IndexWidth, indices: &[u32]) -> Vec<u8> {
    match width {
        IndexWidth::U8 => indices.iter().map(|&i| i as u8).collect(),
        IndexWidth::U16 => indices
            .iter()
            .flat_map(|&i| (i as u16).to_ne_bytes())
            .collect(),
        IndexWidth::U32 => bytemuck::cast_slice(indices).to_vec(),
    }
}

/// `first..first + count` followed by `first`.
pub fn line_loop_array_indices(count: u32, first: u32) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..count).map(|i| first.wrapping_add(i)).collect();
    indices.push(first);
    indices
}

/// Closes every loop between restart indices. Restart indices are kept and become
/// `out_restart`.
pub fn line_loop_indices_with_restart(indices: &[u32], restart: u32, out_restart: u32) -> Vec<u32> {
    let mut out = Vec::with_capacity(indices.len() + indices.len() / 2 + 1);
    let mut loop_start = 0;
    for (i, &index) in indices.iter().enumerate() {
        if index == restart {
            if i > loop_start {
                out.push(indices[loop_start]);
            }
            out.push(out_restart);
            loop_start = i + 1;
        } else {
            out.push(index);
        }
    }
    if indices.len() > loop_start {
        out.push(indices[loop_start]);
    }
    out
}

/// Builds line-loop index lists for one context, keeping the buffers of the latest draw alive
/// until [`LineLoopHelper::release`].
#[derive(Debug, Default)]
pub struct LineLoopHelper {
    index_buffer: Option<BufferHelper>,
    indirect_buffer: Option<BufferHelper>,
}

impl LineLoopHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_buffer(&self) -> Option<&BufferHelper> {
        self.index_buffer.as_ref()
    }

    pub fn indirect_buffer(&self) -> Option<&BufferHelper> {
        self.indirect_buffer.as_ref()
    }

    fn allocate_index_buffer(
        &mut self,
        device: &mut dyn Device,
        size: u64,
    ) -> Result<BufferHelper> {
        let buffer = create_scratch_buffer(
            device,
            size,
            wgpu::BufferUsages::INDEX | wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )?;
        self.index_buffer = Some(buffer);
        Ok(buffer)
    }

    fn allocate_indirect_buffer(&mut self, device: &mut dyn Device) -> Result<BufferHelper> {
        let buffer = create_scratch_buffer(
            device,
            core::mem::size_of::<DrawIndexedIndirectArgs>() as u64,
            wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::STORAGE,
        )?;
        self.indirect_buffer = Some(buffer);
        Ok(buffer)
    }

    /// Index list for `draw_arrays(LINE_LOOP, first_vertex, clamped_vertex_count)`; always
    /// 32-bit with `clamped_vertex_count + 1` entries.
    pub fn index_buffer_for_draw_arrays(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        clamped_vertex_count: u32,
        first_vertex: i32,
    ) -> Result<BufferHelper> {
        // Negative first vertices wrap like the GL conversion to an unsigned index.
        let indices = line_loop_array_indices(clamped_vertex_count, first_vertex as u32);
        let data: &[u8] = bytemuck::cast_slice(&indices);
        let buffer = self.allocate_index_buffer(device, data.len() as u64)?;
        cmd.write_buffer(buffer.handle, buffer.offset, data);
        Ok(buffer)
    }

    /// Index list for `draw_elements(LINE_LOOP)` reading `index_count` indices at
    /// `element_offset` of `element_array`. `element_contents` is the host copy of the whole
    /// element array buffer.
    ///
    /// 8-bit indices and primitive restart need the indices on the host and are streamed;
    /// everything else is copied on the device with the first index appended.
    #[allow(clippy::too_many_arguments)]
    pub fn index_buffer_for_element_array_buffer(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        element_array: &BufferHelper,
        element_contents: &[u8],
        index_width: IndexWidth,
        index_count: u32,
        element_offset: u64,
        primitive_restart: bool,
    ) -> Result<LineLoopIndices> {
        if index_width == IndexWidth::U8 || primitive_restart {
            tracing::trace!(?index_width, index_count, "streaming line-loop indices");
            return self.stream_indices(
                device,
                cmd,
                index_width,
                index_count,
                &element_contents[element_offset as usize..],
                primitive_restart,
            );
        }

        let unit = u64::from(index_width.bytes());
        let count = u64::from(index_count);
        let buffer = self.allocate_index_buffer(device, unit * (count + 1))?;

        let src_offset = element_array.offset + element_offset;
        end_render_pass_for_outside_commands(cmd);
        cmd.copy_buffer(
            element_array.handle,
            buffer.handle,
            &[
                BufferCopy {
                    src_offset,
                    dst_offset: buffer.offset,
                    size: count * unit,
                },
                BufferCopy {
                    src_offset,
                    dst_offset: buffer.offset + count * unit,
                    size: unit,
                },
            ],
        );
        cmd.memory_barrier(MemoryBarrier {
            src_stages: PipelineStages::TRANSFER,
            src_access: Access::TRANSFER_WRITE,
            dst_stages: PipelineStages::VERTEX_INPUT,
            dst_access: Access::INDEX_READ,
        });

        Ok(LineLoopIndices {
            buffer,
            index_count: index_count + 1,
            index_width,
        })
    }

    /// Builds the line-loop index list from host indices.
    ///
    /// 8-bit indices are widened to 16 bits when the device cannot draw with them. With
    /// primitive restart, each loop between restart indices is closed separately and the
    /// restart index is kept (widened along with the indices).
    pub fn stream_indices(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        index_width: IndexWidth,
        index_count: u32,
        src: &[u8],
        primitive_restart: bool,
    ) -> Result<LineLoopIndices> {
        let widen = !device.features().supports_index_type_uint8;
        let out_width = if index_width == IndexWidth::U8 && widen {
            IndexWidth::U16
        } else {
            index_width
        };

        let indices = read_indices(index_width, index_count as usize, src);
        let out = if primitive_restart {
            line_loop_indices_with_restart(
                &indices,
                restart_index(index_width),
                restart_index(out_width),
            )
        } else {
            let mut out = indices;
            if let Some(&first) = out.first() {
                out.push(first);
            }
            out
        };

        let data = write_indices(out_width, &out);
        let buffer = self.allocate_index_buffer(device, data.len() as u64)?;
        cmd.write_buffer(buffer.handle, buffer.offset, &data);

        Ok(LineLoopIndices {
            buffer,
            index_count: out.len() as u32,
            index_width: out_width,
        })
    }

    /// Expands an indexed indirect line-loop draw on the device.
    #[allow(clippy::too_many_arguments)]
    pub fn stream_indices_indirect(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        engine: &mut UtilsEngine,
        index_width: IndexWidth,
        src_index: &BufferHelper,
        src_indirect: &BufferHelper,
        indirect_offset: u64,
        primitive_restart: bool,
    ) -> Result<LineLoopIndirect> {
        let unit = u64::from(index_width.bytes());
        let size = if primitive_restart {
            // The smallest restart-separated loop, two indices plus the restart index, grows
            // from three to four indices; larger loops grow less.
            let input_count = src_index.size / unit;
            ((input_count * 4) / 3 + 1) * unit
        } else {
            src_index.size + unit
        };

        let index_buffer = self.allocate_index_buffer(device, size)?;
        let indirect_buffer = self.allocate_indirect_buffer(device)?;

        engine.convert_line_loop_index_indirect_buffer(
            device,
            cmd,
            src_indirect,
            src_index,
            &indirect_buffer,
            &index_buffer,
            &ConvertLineLoopIndexIndirectParameters {
                indirect_buffer_offset: indirect_offset as u32,
                dst_indirect_buffer_offset: 0,
                src_index_buffer_offset: 0,
                dst_index_buffer_offset: 0,
                index_width,
                primitive_restart,
            },
        )?;

        Ok(LineLoopIndirect {
            index_buffer,
            indirect_buffer,
        })
    }

    /// Expands an array indirect line-loop draw of at most `vertex_count` vertices on the
    /// device into 32-bit indices.
    pub fn stream_array_indirect(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        engine: &mut UtilsEngine,
        vertex_count: u32,
        src_indirect: &BufferHelper,
        indirect_offset: u64,
    ) -> Result<LineLoopIndirect> {
        let size = (u64::from(vertex_count) + 1) * u64::from(IndexWidth::U32.bytes());
        let index_buffer = self.allocate_index_buffer(device, size)?;
        let indirect_buffer = self.allocate_indirect_buffer(device)?;

        engine.convert_line_loop_array_indirect_buffer(
            device,
            cmd,
            src_indirect,
            &indirect_buffer,
            &index_buffer,
            &ConvertLineLoopArrayIndirectParameters {
                indirect_buffer_offset: indirect_offset as u32,
                dst_indirect_buffer_offset: 0,
                dst_index_buffer_offset: 0,
            },
        )?;

        Ok(LineLoopIndirect {
            index_buffer,
            indirect_buffer,
        })
    }

    /// Drops the buffers of the latest draw.
    pub fn release(&mut self) {
        self.index_buffer = None;
        self.indirect_buffer = None;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hal::recording::{Command, Created, RecordingCommands, RecordingDevice};
    use crate::hal::{BufferHandle, Features};

    fn written(cmd: &RecordingCommands) -> Vec<u8> {
        cmd.commands()
            .iter()
            .find_map(|c| match c {
                Command::WriteBuffer(_, _, data) => Some(data.clone()),
                _ => None,
            })
            .expect("buffer write")
    }

    #[test]
    fn restart_closes_each_loop() {
        let out =
            line_loop_indices_with_restart(&[1, 2, 3, 0xFF, 4, 5, 0xFF, 0xFF, 6], 0xFF, 0xFFFF);
        assert_eq!(out, vec![1, 2, 3, 1, 0xFFFF, 4, 5, 4, 0xFFFF, 0xFFFF, 6, 6]);
    }

    #[test]
    fn u8_indices_are_widened_without_device_support() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut helper = LineLoopHelper::new();

        let result = helper
            .stream_indices(&mut device, &mut cmd, IndexWidth::U8, 3, &[7, 8, 9], false)
            .expect("stream");
        assert_eq!(result.index_width, IndexWidth::U16);
        assert_eq!(result.index_count, 4);
        assert_eq!(written(&cmd), write_indices(IndexWidth::U16, &[7, 8, 9, 7]));
        assert_eq!(result.buffer.size, 8);
    }

    #[test]
    fn u8_indices_stay_narrow_with_device_support() {
        let mut device = RecordingDevice::new(Features {
            supports_index_type_uint8: true,
            ..Features::default()
        });
        let mut cmd = RecordingCommands::new();
        let mut helper = LineLoopHelper::new();

        let result = helper
            .stream_indices(&mut device, &mut cmd, IndexWidth::U8, 4, &[1, 0xFF, 2, 3], true)
            .expect("stream");
        assert_eq!(result.index_width, IndexWidth::U8);
        assert_eq!(written(&cmd), vec![1, 1, 0xFF, 2, 3, 2]);
    }

    #[test]
    fn device_copy_appends_the_first_index() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut helper = LineLoopHelper::new();
        let elements = BufferHelper::new(BufferHandle(40), 64, 256);

        let result = helper
            .index_buffer_for_element_array_buffer(
                &mut device,
                &mut cmd,
                &elements,
                &[],
                IndexWidth::U16,
                10,
                6,
                false,
            )
            .expect("element array");
        assert_eq!(result.index_count, 11);
        assert_eq!(result.buffer.size, 22);

        let copies = cmd
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::CopyBuffer(src, _, regions) => {
                    assert_eq!(*src, BufferHandle(40));
                    Some(regions.clone())
                }
                _ => None,
            })
            .expect("copy");
        assert_eq!(
            copies,
            vec![
                BufferCopy {
                    src_offset: 70,
                    dst_offset: 0,
                    size: 20,
                },
                BufferCopy {
                    src_offset: 70,
                    dst_offset: 20,
                    size: 2,
                },
            ]
        );
    }

    #[test]
    fn indirect_arrays_allocate_a_draw_command() {
        let mut device = RecordingDevice::new(Features::default());
        let mut cmd = RecordingCommands::new();
        let mut engine = UtilsEngine::default();
        let mut helper = LineLoopHelper::new();

        let result = helper
            .stream_array_indirect(
                &mut device,
                &mut cmd,
                &mut engine,
                99,
                &BufferHelper::new(BufferHandle(50), 0, 16),
                16,
            )
            .expect("indirect");
        assert_eq!(result.index_buffer.size, 400);
        assert_eq!(result.indirect_buffer.size, 20);
        assert_eq!(cmd.dispatches(), vec![(1, 1, 1)]);
        assert!(device.created().iter().any(|c| matches!(
            c,
            Created::Buffer(_, 20, usage) if usage.contains(wgpu::BufferUsages::INDIRECT)
        )));

        helper.release();
        assert!(helper.index_buffer().is_none() && helper.indirect_buffer().is_none());
    }
}
