//! Shader identities and the WGSL sources this crate owns.
//!
//! Most utility shaders live in the backend's shader library and are addressed by a
//! [`ShaderKey`]: the program plus the serialized variant flags. The unresolve fragment shader
//! is generated per attachment combination (see [`unresolve`]).

pub mod unresolve;

use thiserror::Error;

pub use unresolve::generate_unresolve_wgsl;

/// Every shader program the engine can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    ConvertIndexComp,
    ConvertIndirectLineLoopComp,
    ConvertIndexIndirectLineLoopComp,
    ConvertVertexComp,
    FullScreenTriVert,
    ImageClearFrag,
    ImageCopyFrag,
    ImageCopyFloatFrag,
    CopyImageToBufferComp,
    BlitResolveFrag,
    Blit3DSrcFrag,
    BlitResolveStencilNoExportComp,
    ExportStencilFrag,
    OverlayDrawVert,
    OverlayDrawFrag,
    GenerateMipmapComp,
    EtcToBcComp,
    GenerateFragmentShadingRateComp,
}

impl ShaderProgram {
    pub fn is_compute(self) -> bool {
        matches!(
            self,
            ShaderProgram::ConvertIndexComp
                | ShaderProgram::ConvertIndirectLineLoopComp
                | ShaderProgram::ConvertIndexIndirectLineLoopComp
                | ShaderProgram::ConvertVertexComp
                | ShaderProgram::CopyImageToBufferComp
                | ShaderProgram::BlitResolveStencilNoExportComp
                | ShaderProgram::GenerateMipmapComp
                | ShaderProgram::EtcToBcComp
                | ShaderProgram::GenerateFragmentShadingRateComp
        )
    }
}

/// A library shader variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub program: ShaderProgram,
    pub flags: u32,
}

impl ShaderKey {
    pub const fn new(program: ShaderProgram, flags: u32) -> Self {
        Self { program, flags }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderGenError {
    #[error("unresolve shader has no inputs")]
    NoInputs,
    #[error("stencil export is not expressible in WGSL")]
    StencilExportUnsupported,
}

/// Full-screen triangle covering the viewport; draw with three vertices.
pub const FULL_SCREEN_TRI_WGSL: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}
"#;

/// Discards every fragment whose resolved stencil value lacks the pushed bit.
///
/// Drawn once per stencil bit with the write mask set to that bit and a reference of `0xFF`.
pub const EXPORT_STENCIL_WGSL: &str = r#"
struct Params {
    bit: u32,
}

var<push_constant> params: Params;

@group(0) @binding(0) var stencil_input: texture_2d<u32>;

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) {
    let stencil = textureLoad(stencil_input, vec2<i32>(frag_coord.xy), 0).r;
    if ((stencil & (1u << params.bit)) == 0u) {
        discard;
    }
}
"#;

/// WGSL for the library programs this crate ships itself.
pub fn library_wgsl(program: ShaderProgram) -> Option<&'static str> {
    match program {
        ShaderProgram::FullScreenTriVert => Some(FULL_SCREEN_TRI_WGSL),
        ShaderProgram::ExportStencilFrag => Some(EXPORT_STENCIL_WGSL),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn validate_wgsl(source: &str) {
    let module = naga::front::wgsl::parse_str(source).expect("wgsl parse");
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .expect("wgsl validate");
}
