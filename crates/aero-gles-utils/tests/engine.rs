mod common;

use aero_gles_texture::{Extents, InternalFormat};
use aero_gles_utils::hal::recording::{Command, FailPoint, RecordingCommands, RecordingDevice};
use aero_gles_utils::hal::{
    Access, BufferHandle, ClearValue, Features, ImageAspects, ImageLayout, ImageViewHandle,
    PipelineStages, RenderPassClosureReason,
};
use aero_gles_utils::utils::params::{
    ClearTextureParameters, ConvertIndexParameters, GenerateMipmapParameters,
};
use aero_gles_utils::{BackendError, BufferHelper, UtilsEngine, UtilsError};
use common::{count, image, setup, target};
use pretty_assertions::assert_eq;

fn convert(
    engine: &mut UtilsEngine,
    device: &mut RecordingDevice,
    cmd: &mut RecordingCommands,
) -> aero_gles_utils::Result<()> {
    engine.convert_index_buffer(
        device,
        cmd,
        &BufferHelper::new(BufferHandle(2), 0, 512),
        &BufferHelper::new(BufferHandle(1), 0, 256),
        &ConvertIndexParameters {
            src_offset: 0,
            dst_offset: 0,
            max_index: 255,
            primitive_restart: false,
        },
    )
}

#[test]
fn repeated_operations_only_record_commands() {
    let (mut device, mut cmd, mut engine) = setup(Features::default());

    convert(&mut engine, &mut device, &mut cmd).expect("first");
    let created = device.created().len();
    convert(&mut engine, &mut device, &mut cmd).expect("second");

    assert_eq!(engine.compute_pipeline_count(), 1);
    assert_eq!(device.count(FailPoint::ComputePipeline), 1);
    // Only the descriptor set is allocated again.
    assert_eq!(device.created().len(), created + 1);
    assert_eq!(cmd.dispatches().len(), 2);
}

#[test]
fn pipeline_failure_is_reported_and_retried() {
    let (mut device, mut cmd, mut engine) = setup(Features::default());

    device.fail_on(FailPoint::ComputePipeline, BackendError::OutOfDeviceMemory);
    let err = convert(&mut engine, &mut device, &mut cmd).expect_err("pipeline creation fails");
    assert!(matches!(
        err,
        UtilsError::Backend(BackendError::OutOfDeviceMemory)
    ));
    assert!(cmd.dispatches().is_empty());
    assert_eq!(engine.compute_pipeline_count(), 0);

    device.clear_failure();
    convert(&mut engine, &mut device, &mut cmd).expect("retry succeeds");
    assert_eq!(cmd.dispatches().len(), 1);
}

#[test]
fn invalidated_render_target_is_redefined_by_a_clear() {
    let (mut device, mut cmd, mut engine) = setup(Features::default());
    let rt = target(9, InternalFormat::Rgba8, 3, 1);

    assert!(!rt.has_defined_content());
    rt.restore_entire_content();
    assert!(rt.has_defined_content());
    assert!(!rt.invalidate_entire_content());
    assert!(!rt.has_defined_content());

    let image = rt.image_for_write();
    engine
        .clear_texture(
            &mut device,
            &mut cmd,
            &mut image.borrow_mut(),
            &ClearTextureParameters {
                aspects: ImageAspects::COLOR,
                level: rt.level_index(),
                layer: rt.layer_index(),
                clear_value: ClearValue::Float([0.0, 0.0, 0.0, 1.0]),
            },
        )
        .expect("clear");

    assert!(rt.has_defined_content());
    assert_eq!(
        cmd.commands().last(),
        Some(&Command::EndRenderPass(
            RenderPassClosureReason::TemporaryForClearTexture
        ))
    );
}

#[test]
fn compute_mipmap_generation_writes_every_requested_level() {
    let (mut device, mut cmd, mut engine) = setup(Features::default());
    let mut img = image(4, InternalFormat::Rgba8, Extents::new(64, 64, 1), 5, 1, 1);
    img.change_layout(
        &mut cmd,
        ImageLayout::General,
        PipelineStages::COMPUTE_SHADER,
        Access::SHADER_WRITE,
    );

    let src_view = ImageViewHandle(100);
    let dst_views: Vec<_> = (101..105).map(ImageViewHandle).collect();
    engine
        .generate_mipmap(
            &mut device,
            &mut cmd,
            &img,
            src_view,
            &img,
            &dst_views,
            &GenerateMipmapParameters {
                src_level: 0,
                dst_level_count: 4,
            },
        )
        .expect("mipmap");

    assert_eq!(cmd.dispatches(), vec![(1, 1, 1)]);
    assert_eq!(
        count(&cmd, |c| matches!(c, Command::UpdateDescriptorSet(..))),
        1
    );
}
