#![allow(dead_code)]

use aero_gles_texture::{Extents, InternalFormat};
use aero_gles_utils::hal::recording::{Command, RecordingCommands, RecordingDevice};
use aero_gles_utils::hal::{Features, ImageHandle};
use aero_gles_utils::image::{ImageHelper, ImageType, ImageViewHelper};
use aero_gles_utils::{RenderTarget, RenderTargetTransience, UtilsConfig, UtilsEngine};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// A recording device, an empty command stream and a fresh engine.
pub fn setup(features: Features) -> (RecordingDevice, RecordingCommands, UtilsEngine) {
    init_tracing();
    (
        RecordingDevice::new(features),
        RecordingCommands::new(),
        UtilsEngine::new(UtilsConfig::default()),
    )
}

pub fn image_2d(handle: u32, format: InternalFormat, width: u32, height: u32) -> ImageHelper {
    ImageHelper::new(
        ImageHandle(handle),
        ImageType::D2,
        format,
        Extents::new(width, height, 1),
        0,
        1,
        1,
        1,
    )
}

pub fn image(
    handle: u32,
    format: InternalFormat,
    extents: Extents,
    levels: u32,
    layers: u32,
    samples: u32,
) -> ImageHelper {
    ImageHelper::new(
        ImageHandle(handle),
        ImageType::D2,
        format,
        extents,
        0,
        levels,
        layers,
        samples,
    )
}

/// A render target over level `level` of a fresh image, without resolve attachment.
pub fn target(handle: u32, format: InternalFormat, levels: u32, level: u32) -> RenderTarget {
    let mut target = RenderTarget::new();
    target.init(
        image(handle, format, Extents::new(64, 32, 1), levels, 1, 1).into_shared(),
        ImageViewHelper::new(u64::from(handle)).into_shared(),
        None,
        None,
        0,
        level,
        0,
        1,
        RenderTargetTransience::Default,
    );
    target
}

pub fn count(cmd: &RecordingCommands, pred: impl Fn(&Command) -> bool) -> usize {
    cmd.commands().iter().filter(|c| pred(c)).count()
}
