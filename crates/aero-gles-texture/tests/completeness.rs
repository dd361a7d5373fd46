mod common;

use aero_gles_texture::caps::Extensions;
use aero_gles_texture::format::InternalFormat;
use aero_gles_texture::sampler::{CompareMode, MagFilter, MinFilter, WrapMode};
use aero_gles_texture::texture_state::SamplerFormat;
use aero_gles_texture::{
    ClientVersion, ContextId, ContextState, Extents, Format, PixelSource, PixelUnpackState,
    SamplerState, Texture, TextureId, TextureTarget, TextureType,
};
use common::{ctx, Recorder};
use pretty_assertions::assert_eq;

fn rgba8() -> Format {
    Format::new(InternalFormat::Rgba8)
}

fn new_texture(texture_type: TextureType) -> (Texture, Recorder) {
    let recorder = Recorder::new();
    let texture = Texture::new(TextureId(1), texture_type, recorder.backend());
    (texture, recorder)
}

fn define(texture: &mut Texture, target: TextureTarget, level: u32, size: Extents, format: Format) {
    texture
        .set_image(
            &ctx(),
            &PixelUnpackState::default(),
            target,
            level,
            format,
            size,
            PixelSource::EMPTY,
        )
        .expect("set_image");
}

#[test]
fn immutable_storage_defines_full_chain() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    texture
        .set_storage(&ctx(), TextureType::D2, 4, rgba8(), Extents::new(8, 8, 1))
        .expect("set_storage");

    assert_eq!(texture.state().enabled_level_count(), 4);
    let sizes: Vec<Extents> = (0..4)
        .map(|level| texture.extents(TextureTarget::D2, level))
        .collect();
    assert_eq!(
        sizes,
        vec![
            Extents::new(8, 8, 1),
            Extents::new(4, 4, 1),
            Extents::new(2, 2, 1),
            Extents::new(1, 1, 1),
        ]
    );
    assert!(texture.is_mipmap_complete());
    assert!(texture.state().immutable_format());
    assert_eq!(texture.state().immutable_levels(), 4);
}

#[test]
fn base_level_only_is_not_mipmap_complete() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    define(&mut texture, TextureTarget::D2, 0, Extents::new(4, 4, 1), rgba8());

    assert_eq!(texture.mipmap_max_level(), 2);
    assert!(!texture.state().compute_mipmap_completeness());
    assert!(!texture.is_sampler_complete(&ctx(), None));

    // Without mip filtering the base level alone is enough.
    texture.set_min_filter(MinFilter::Linear);
    assert!(texture.is_sampler_complete(&ctx(), None));
}

#[test]
fn cube_completeness_tracks_each_face() {
    let (mut texture, _recorder) = new_texture(TextureType::CubeMap);
    for face in TextureTarget::CUBE_FACES {
        define(&mut texture, face, 0, Extents::new(16, 16, 1), rgba8());
    }
    assert!(texture.state().is_cube_complete());

    define(
        &mut texture,
        TextureTarget::CubeMapNegativeY,
        0,
        Extents::new(8, 8, 1),
        rgba8(),
    );
    assert!(!texture.state().is_cube_complete());

    define(
        &mut texture,
        TextureTarget::CubeMapNegativeY,
        0,
        Extents::new(16, 16, 1),
        Format::new(InternalFormat::Srgb8Alpha8),
    );
    // Same extent but a different sized format.
    assert!(!texture.state().is_cube_complete());

    define(
        &mut texture,
        TextureTarget::CubeMapNegativeY,
        0,
        Extents::new(16, 16, 1),
        rgba8(),
    );
    assert!(texture.state().is_cube_complete());
}

#[test]
fn non_square_cube_face_is_incomplete() {
    let (mut texture, _recorder) = new_texture(TextureType::CubeMap);
    for face in TextureTarget::CUBE_FACES {
        define(&mut texture, face, 0, Extents::new(16, 8, 1), rgba8());
    }
    assert!(!texture.state().is_cube_complete());
}

#[test]
fn level_completeness_follows_halving_law() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    let base = Extents::new(16, 4, 1);
    for level in 0..5 {
        define(&mut texture, TextureTarget::D2, level, base.mip(level, true), rgba8());
    }
    assert_eq!(texture.extents(TextureTarget::D2, 4), Extents::new(1, 1, 1));
    assert!(texture.is_mipmap_complete());

    define(&mut texture, TextureTarget::D2, 2, Extents::new(4, 2, 1), rgba8());
    let state = texture.state();
    assert!(state.compute_level_completeness(TextureTarget::D2, 1));
    assert!(!state.compute_level_completeness(TextureTarget::D2, 2));
    assert!(state.compute_level_completeness(TextureTarget::D2, 3));
    assert!(!state.compute_mipmap_completeness());
}

#[test]
fn array_levels_keep_layer_count() {
    let (mut texture, _recorder) = new_texture(TextureType::D2Array);
    define(&mut texture, TextureTarget::D2Array, 0, Extents::new(4, 4, 3), rgba8());
    define(&mut texture, TextureTarget::D2Array, 1, Extents::new(2, 2, 3), rgba8());
    define(&mut texture, TextureTarget::D2Array, 2, Extents::new(1, 1, 1), rgba8());

    let state = texture.state();
    assert!(state.compute_level_completeness(TextureTarget::D2Array, 1));
    assert!(!state.compute_level_completeness(TextureTarget::D2Array, 2));
}

#[test]
fn npot_requires_clamp_on_es2_without_extension() {
    let es2 =
        ContextState::new(ContextId(2), ClientVersion::ES_2_0).with_robust_resource_init(false);
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    define(&mut texture, TextureTarget::D2, 0, Extents::new(6, 4, 1), rgba8());
    texture.set_min_filter(MinFilter::Linear);

    assert!(!texture.is_sampler_complete(&es2, None));

    texture.set_wrap_s(WrapMode::ClampToEdge);
    assert!(texture.is_sampler_complete(&es2, None));

    let es2_npot = ContextState::new(ContextId(3), ClientVersion::ES_2_0)
        .with_extensions(Extensions::TEXTURE_NPOT)
        .with_robust_resource_init(false);
    texture.set_wrap_s(WrapMode::Repeat);
    assert!(texture.is_sampler_complete(&es2_npot, None));
}

#[test]
fn float_textures_need_linear_filter_support() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    define(
        &mut texture,
        TextureTarget::D2,
        0,
        Extents::new(4, 4, 1),
        Format::new(InternalFormat::Rgba32F),
    );
    texture.set_min_filter(MinFilter::Linear);
    assert!(!texture.is_sampler_complete(&ctx(), None));

    let mut point = SamplerState::default();
    point.set_min_filter(MinFilter::Nearest);
    point.set_mag_filter(MagFilter::Nearest);
    assert!(texture.is_sampler_complete(&ctx(), Some(&point)));

    let linear_float = ContextState::new(ContextId(4), ClientVersion::ES_3_0)
        .with_extensions(Extensions::TEXTURE_FLOAT_LINEAR)
        .with_robust_resource_init(false);
    assert!(texture.is_sampler_complete(&linear_float, None));
}

#[test]
fn sized_depth_needs_compare_mode_on_es3() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    define(
        &mut texture,
        TextureTarget::D2,
        0,
        Extents::new(4, 4, 1),
        Format::new(InternalFormat::DepthComponent24),
    );
    texture.set_min_filter(MinFilter::Linear);
    assert!(!texture.is_sampler_complete(&ctx(), None));

    texture.set_compare_mode(CompareMode::CompareRefToTexture);
    assert!(texture.is_sampler_complete(&ctx(), None));
    let sampler = texture.state().sampler_state().clone();
    assert_eq!(texture.required_sampler_format(&sampler), SamplerFormat::Shadow);
}

#[test]
fn completeness_cache_is_invalidated_by_storage_changes() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    texture.set_min_filter(MinFilter::Linear);
    assert!(!texture.is_sampler_complete(&ctx(), None));

    define(&mut texture, TextureTarget::D2, 0, Extents::new(4, 4, 1), rgba8());
    assert!(texture.is_sampler_complete(&ctx(), None));
}

#[test]
fn external_textures_require_clamped_single_level_sampling() {
    let (mut texture, _recorder) = new_texture(TextureType::External);
    define(&mut texture, TextureTarget::External, 0, Extents::new(5, 3, 1), rgba8());
    assert!(texture.is_sampler_complete(&ctx(), None));

    texture.set_wrap_t(WrapMode::Repeat);
    assert!(!texture.is_sampler_complete(&ctx(), None));

    let with_wrap_modes = ContextState::new(ContextId(5), ClientVersion::ES_3_0)
        .with_extensions(Extensions::EGL_IMAGE_EXTERNAL_WRAP_MODES)
        .with_robust_resource_init(false);
    assert!(texture.is_sampler_complete(&with_wrap_modes, None));
}

#[test]
fn effective_levels_clamp_to_immutable_range() {
    let (mut texture, _recorder) = new_texture(TextureType::D2);
    texture
        .set_storage(&ctx(), TextureType::D2, 3, rgba8(), Extents::new(8, 8, 1))
        .expect("set_storage");

    for base in 0..6 {
        for max in 0..6 {
            texture.set_base_level(&ctx(), base).expect("set_base_level");
            texture.set_max_level(max);
            let state = texture.state();
            let effective_base = base.min(2);
            assert_eq!(state.effective_base_level(), effective_base);
            assert_eq!(state.effective_max_level(), max.clamp(effective_base, 2));
        }
    }
}
