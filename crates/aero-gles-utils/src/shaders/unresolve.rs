//! Generated unresolve fragment shaders.
//!
//! Unresolve copies the single-sampled (resolve) contents of attachments back into their
//! multisampled counterparts at the start of a render pass. Inputs are bound in the order
//! stencil, depth, then colors by attachment index; color `i` is written to `@location(i)`.

use std::fmt::Write;

use super::ShaderGenError;
use crate::utils::flags::{UnresolveColorType, UnresolveFlags};

fn color_types(ty: UnresolveColorType) -> Option<(&'static str, &'static str)> {
    match ty {
        UnresolveColorType::Unused => None,
        UnresolveColorType::Float => Some(("f32", "vec4<f32>")),
        UnresolveColorType::Sint => Some(("i32", "vec4<i32>")),
        UnresolveColorType::Uint => Some(("u32", "vec4<u32>")),
    }
}

/// Generates the WGSL source for `flags`.
///
/// WGSL has no stencil export, so stencil must go through the per-bit export-stencil path.
pub fn generate_unresolve_wgsl(flags: &UnresolveFlags) -> Result<String, ShaderGenError> {
    if flags.stencil {
        return Err(ShaderGenError::StencilExportUnsupported);
    }
    if flags.input_count() == 0 {
        return Err(ShaderGenError::NoInputs);
    }

    let mut src = String::new();
    let mut binding = 0;

    if flags.depth {
        let _ = writeln!(src, "@group(0) @binding({binding}) var depth_input: texture_depth_2d;");
        binding += 1;
    }
    for (index, ty) in flags.colors.iter().enumerate() {
        if let Some((scalar, _)) = color_types(*ty) {
            let _ = writeln!(
                src,
                "@group(0) @binding({binding}) var color_input{index}: texture_2d<{scalar}>;"
            );
            binding += 1;
        }
    }

    src.push_str("\nstruct FragmentOutput {\n");
    for (index, ty) in flags.colors.iter().enumerate() {
        if let Some((_, vector)) = color_types(*ty) {
            let _ = writeln!(src, "    @location({index}) color{index}: {vector},");
        }
    }
    if flags.depth {
        src.push_str("    @builtin(frag_depth) depth: f32,\n");
    }
    src.push_str("}\n\n");

    src.push_str("@fragment\n");
    src.push_str("fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> FragmentOutput {\n");
    src.push_str("    let coord = vec2<i32>(frag_coord.xy);\n");
    src.push_str("    var out: FragmentOutput;\n");
    for (index, ty) in flags.colors.iter().enumerate() {
        if color_types(*ty).is_some() {
            let _ = writeln!(
                src,
                "    out.color{index} = textureLoad(color_input{index}, coord, 0);"
            );
        }
    }
    if flags.depth {
        src.push_str("    out.depth = textureLoad(depth_input, coord, 0);\n");
    }
    src.push_str("    return out;\n}\n");

    Ok(src)
}
