//! GPU-side helpers behind the GLES texture model.
//!
//! - `hal`: the device and command recorder traits the helpers record into, plus a recording
//!   backend used by tests.
//! - `format` / `image`: backend format table and image, view and buffer bookkeeping.
//! - `render_target`: framebuffer attachments backed by an image level/layer.
//! - `utils`: [`UtilsEngine`], compute and draw passes for the GL operations the GPU API has no
//!   direct equivalent for.
//! - `shaders`: the shader library and generated WGSL.
//! - `line_loop`: line-loop index list generation.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod format;
pub mod hal;
pub mod image;
pub mod line_loop;
pub mod render_target;
pub mod shaders;
pub mod utils;

pub use config::UtilsConfig;
pub use error::{BackendError, Result, UtilsError};
pub use image::{BufferHelper, ImageHelper, ImageViewHelper};
pub use line_loop::{DrawIndexedIndirectArgs, LineLoopHelper};
pub use render_target::{RenderTarget, RenderTargetTransience};
pub use utils::{FramebufferTarget, Function, UtilsEngine};
