//! GLES texture object model.
//!
//! This crate tracks everything the GL front-end knows about a texture independently of the GPU
//! API underneath it:
//! - `format` / `caps`: internal-format metadata and the context capabilities it is judged
//!   against.
//! - `image_index` / `image_desc`: addressing of individual images and their per-image metadata.
//! - `sampler`: sampler parameters and swizzle state.
//! - `texture_state`: the logical texture state plus sampler/mipmap completeness.
//! - `texture`: [`Texture`], the mutation protocol over that state, delegating native work to a
//!   [`TextureImpl`] backend.
//! - `buffer` / `observer`: buffer objects backing buffer textures and the notification plumbing
//!   between GL objects.

#![deny(unsafe_code)]

pub mod buffer;
pub mod caps;
pub mod error;
pub mod format;
pub mod image_desc;
pub mod image_index;
pub mod observer;
pub mod sampler;
pub mod texture;
pub mod texture_impl;
pub mod texture_state;

pub use buffer::{Buffer, BufferId, OffsetBindingPointer};
pub use caps::{ClientVersion, ContextId, ContextState, Extensions, SampleCounts};
pub use error::TextureError;
pub use format::{Format, FormatInfo, InternalFormat};
pub use image_desc::{ImageDesc, InitState};
pub use image_index::{
    Box3D, Extents, ImageIndex, Offset, Rectangle, TextureTarget, TextureType,
    IMPLEMENTATION_MAX_TEXTURE_LEVELS,
};
pub use observer::{Observer, ObserverRef, Subject, SubjectIndex, SubjectMessage};
pub use sampler::SamplerState;
pub use texture::{
    DirtyBits, EglImageId, FramebufferSerial, StreamId, SurfaceId, Texture, TextureId,
};
pub use texture_impl::{PixelSource, PixelUnpackState, SyncSource, TextureImpl};
pub use texture_state::{SamplerFormat, TextureState};
