mod common;

use aero_gles_utils::hal::recording::Command;
use aero_gles_utils::hal::{BufferHandle, Features};
use aero_gles_utils::line_loop::line_loop_array_indices;
use aero_gles_utils::utils::flags::IndexWidth;
use aero_gles_utils::{BufferHelper, LineLoopHelper};
use common::setup;
use pretty_assertions::assert_eq;

fn written_u32(commands: &[Command]) -> Vec<u32> {
    commands
        .iter()
        .find_map(|c| match c {
            Command::WriteBuffer(_, _, data) => Some(
                data.chunks_exact(4)
                    .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            _ => None,
        })
        .expect("buffer write")
}

#[test]
fn draw_arrays_closes_the_loop() {
    let (mut device, mut cmd, _) = setup(Features::default());
    let mut helper = LineLoopHelper::new();

    let buffer = helper
        .index_buffer_for_draw_arrays(&mut device, &mut cmd, 3, 10)
        .expect("draw arrays");
    assert_eq!(buffer.size, 16);
    assert_eq!(written_u32(cmd.commands()), vec![10, 11, 12, 10]);
    assert_eq!(helper.index_buffer(), Some(&buffer));
}

#[test]
fn negative_first_vertex_wraps() {
    assert_eq!(
        line_loop_array_indices(2, -1i32 as u32),
        vec![u32::MAX, 0, u32::MAX]
    );
}

#[test]
fn restart_streams_from_host_copy() {
    let (mut device, mut cmd, _) = setup(Features::default());
    let mut helper = LineLoopHelper::new();
    let contents: Vec<u8> = [0xAAAAu16, 1, 2, 0xFFFF, 3, 4, 5]
        .iter()
        .flat_map(|i| i.to_ne_bytes())
        .collect();

    let result = helper
        .index_buffer_for_element_array_buffer(
            &mut device,
            &mut cmd,
            &BufferHelper::new(BufferHandle(3), 0, contents.len() as u64),
            &contents,
            IndexWidth::U16,
            6,
            2,
            true,
        )
        .expect("element array");
    assert_eq!(result.index_count, 8);
    assert_eq!(result.index_width, IndexWidth::U16);

    let data = cmd
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::WriteBuffer(_, _, data) => Some(data.clone()),
            _ => None,
        })
        .expect("buffer write");
    let indices: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(indices, vec![1, 2, 1, 0xFFFF, 3, 4, 5, 3]);
    assert!(!cmd.commands().iter().any(|c| matches!(c, Command::CopyBuffer(..))));
}

#[test]
fn indexed_indirect_with_restart_reserves_room_for_closing_indices() {
    let (mut device, mut cmd, mut engine) = setup(Features::default());
    let mut helper = LineLoopHelper::new();

    let result = helper
        .stream_indices_indirect(
            &mut device,
            &mut cmd,
            &mut engine,
            IndexWidth::U16,
            &BufferHelper::new(BufferHandle(4), 0, 300),
            &BufferHelper::new(BufferHandle(5), 0, 40),
            20,
            true,
        )
        .expect("indirect");
    // 150 source indices grow to at most 201.
    assert_eq!(result.index_buffer.size, 402);
    assert_eq!(result.indirect_buffer.size, 20);
    assert_eq!(cmd.dispatches(), vec![(1, 1, 1)]);

    let without_restart = helper
        .stream_indices_indirect(
            &mut device,
            &mut cmd,
            &mut engine,
            IndexWidth::U32,
            &BufferHelper::new(BufferHandle(4), 0, 300),
            &BufferHelper::new(BufferHandle(5), 0, 40),
            0,
            false,
        )
        .expect("indirect");
    assert_eq!(without_restart.index_buffer.size, 304);
    assert_eq!(engine.compute_pipeline_count(), 2);
}
