use crate::format::Format;
use crate::image_index::Extents;

/// Whether an image's contents are known to be defined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InitState {
    #[default]
    Initialized,
    /// Storage exists but nothing has written it yet; robust resource init must zero it before
    /// it is read.
    MayNeedInit,
}

/// Metadata for one (face or layer slot, level) image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDesc {
    pub size: Extents,
    pub format: Format,
    pub samples: u32,
    pub fixed_sample_locations: bool,
    pub init_state: InitState,
}

impl Default for ImageDesc {
    fn default() -> Self {
        Self {
            size: Extents::default(),
            format: Format::NONE,
            samples: 0,
            fixed_sample_locations: true,
            init_state: InitState::Initialized,
        }
    }
}

impl ImageDesc {
    pub fn new(size: Extents, format: Format, init_state: InitState) -> Self {
        Self {
            size,
            format,
            init_state,
            ..Self::default()
        }
    }

    pub fn new_multisample(
        size: Extents,
        format: Format,
        samples: u32,
        fixed_sample_locations: bool,
        init_state: InitState,
    ) -> Self {
        Self {
            size,
            format,
            samples,
            fixed_sample_locations,
            init_state,
        }
    }

    /// Undefined images are excluded from completeness.
    pub fn is_defined(&self) -> bool {
        !self.size.is_empty()
    }

    /// Bytes of storage this image accounts for, saturating at `u64::MAX`.
    pub fn memory_size(&self) -> u64 {
        self.format
            .info()
            .image_bytes(self.size.width, self.size.height, self.size.depth)
            .saturating_mul(u64::from(self.samples.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::InternalFormat;

    #[test]
    fn default_is_undefined_and_initialized() {
        let desc = ImageDesc::default();
        assert!(!desc.is_defined());
        assert_eq!(desc.init_state, InitState::Initialized);
        assert!(desc.fixed_sample_locations);
        assert_eq!(desc.memory_size(), 0);
    }

    #[test]
    fn memory_size_counts_samples() {
        let format = Format::new(InternalFormat::Rgba8);
        let single = ImageDesc::new(Extents::new(4, 4, 1), format, InitState::Initialized);
        assert_eq!(single.memory_size(), 64);
        let msaa = ImageDesc::new_multisample(
            Extents::new(4, 4, 1),
            format,
            4,
            true,
            InitState::Initialized,
        );
        assert_eq!(msaa.memory_size(), 256);
    }

    #[test]
    fn memory_size_saturates() {
        let desc = ImageDesc::new_multisample(
            Extents::new(u32::MAX, u32::MAX, u32::MAX),
            Format::new(InternalFormat::Rgba32F),
            16,
            true,
            InitState::Initialized,
        );
        assert_eq!(desc.memory_size(), u64::MAX);
    }
}
