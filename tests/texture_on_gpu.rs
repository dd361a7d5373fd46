mod harness;

use aero_gles_texture::sampler::MinFilter;
use aero_gles_texture::{
    ClientVersion, ContextId, ContextState, Extents, Format, InitState, InternalFormat, Texture,
    TextureId, TextureType,
};
use aero_gles_utils::hal::recording::Command;
use aero_gles_utils::hal::{Features, ImageLayout, RenderPassClosureReason};
use aero_gles_utils::UtilsConfig;
use harness::{Gpu, GpuTexture};
use pretty_assertions::assert_eq;

fn closures(gpu: &harness::SharedGpu) -> Vec<RenderPassClosureReason> {
    gpu.borrow()
        .cmd
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::EndRenderPass(reason) => Some(*reason),
            _ => None,
        })
        .collect()
}

#[test]
fn robust_init_clears_every_storage_level() {
    let gpu = Gpu::new(Features::default(), UtilsConfig::default());
    let ctx =
        ContextState::new(ContextId(1), ClientVersion::ES_3_0).with_robust_resource_init(true);
    let mut texture = Texture::new(TextureId(1), TextureType::D2, GpuTexture::new(&gpu));

    texture
        .set_storage(
            &ctx,
            TextureType::D2,
            3,
            Format::new(InternalFormat::Rgba8),
            Extents::new(32, 16, 1),
        )
        .expect("storage");
    assert_eq!(texture.init_state(), InitState::MayNeedInit);

    texture.ensure_initialized(&ctx).expect("initialize");
    assert_eq!(texture.init_state(), InitState::Initialized);
    assert_eq!(
        closures(&gpu),
        vec![RenderPassClosureReason::TemporaryForClearTexture; 3]
    );

    let gpu = gpu.borrow();
    let image = gpu.image.as_ref().expect("image");
    assert!((0..3).all(|level| image.has_subresource_defined_content(level, 0, 1)));
}

#[test]
fn mipmaps_are_drawn_level_by_level() {
    let gpu = Gpu::new(
        Features::default(),
        UtilsConfig {
            prefer_draw_mipmap_generation: true,
            ..UtilsConfig::default()
        },
    );
    let ctx = ContextState::new(ContextId(1), ClientVersion::ES_3_0);
    let mut texture = Texture::new(TextureId(2), TextureType::D2, GpuTexture::new(&gpu));

    texture
        .set_storage(
            &ctx,
            TextureType::D2,
            4,
            Format::new(InternalFormat::Rgba8),
            Extents::new(64, 64, 1),
        )
        .expect("storage");
    texture
        .clear_image(&ctx, 0, Some(&[255, 0, 0, 255]))
        .expect("clear");
    texture.set_min_filter(MinFilter::LinearMipmapLinear);
    texture.generate_mipmap(&ctx).expect("mipmap");

    assert_eq!(
        closures(&gpu),
        vec![
            RenderPassClosureReason::TemporaryForClearTexture,
            RenderPassClosureReason::GenerateMipmapWithDraw,
            RenderPassClosureReason::GenerateMipmapWithDraw,
            RenderPassClosureReason::GenerateMipmapWithDraw,
        ]
    );
    assert!(texture.is_sampler_complete(&ctx, None));

    let gpu = gpu.borrow();
    let image = gpu.image.as_ref().expect("image");
    assert_eq!(image.current_layout(), ImageLayout::ShaderReadOnly);
    assert!((1..4).all(|level| image.has_subresource_defined_content(level, 0, 1)));
}

#[test]
fn compute_only_mipmap_generation_surfaces_the_backend_error() {
    let gpu = Gpu::new(Features::default(), UtilsConfig::default());
    let ctx = ContextState::new(ContextId(1), ClientVersion::ES_3_0);
    let mut texture = Texture::new(TextureId(3), TextureType::D2, GpuTexture::new(&gpu));

    texture
        .set_storage(
            &ctx,
            TextureType::D2,
            2,
            Format::new(InternalFormat::Rgba8),
            Extents::new(8, 8, 1),
        )
        .expect("storage");
    let err = texture.generate_mipmap(&ctx).expect_err("not realized");
    assert!(err.to_string().contains("generate_mipmap"), "{err}");
}
