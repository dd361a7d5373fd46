//! Context-level state the texture model reads: client version, enabled extensions and the
//! robust resource initialization toggle.

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientVersion {
    pub major: u8,
    pub minor: u8,
}

impl ClientVersion {
    pub const ES_2_0: ClientVersion = ClientVersion { major: 2, minor: 0 };
    pub const ES_3_0: ClientVersion = ClientVersion { major: 3, minor: 0 };
    pub const ES_3_1: ClientVersion = ClientVersion { major: 3, minor: 1 };
    pub const ES_3_2: ClientVersion = ClientVersion { major: 3, minor: 2 };
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Extensions: u32 {
        const TEXTURE_NPOT = 1 << 0;
        const TEXTURE_FLOAT_LINEAR = 1 << 1;
        const TEXTURE_HALF_FLOAT_LINEAR = 1 << 2;
        const EGL_IMAGE_EXTERNAL_WRAP_MODES = 1 << 3;
        const TEXTURE_FORMAT_BGRA8888 = 1 << 4;
        const COLOR_BUFFER_FLOAT = 1 << 5;
        const DEPTH_TEXTURE = 1 << 6;
    }
}

/// Identity of a context, used to key per-context memoization.
///
/// `ContextId(0)` never names a live context; caches reset to it when invalidated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

/// Per-format sample count support, used when allocating multisampled storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleCounts(Vec<u32>);

impl SampleCounts {
    pub fn new(mut counts: Vec<u32>) -> Self {
        counts.sort_unstable();
        counts.dedup();
        Self(counts)
    }

    /// Smallest supported count that is at least `requested`, or the largest supported count.
    pub fn nearest(&self, requested: u32) -> u32 {
        self.0
            .iter()
            .copied()
            .find(|&count| count >= requested)
            .or_else(|| self.0.last().copied())
            .unwrap_or(requested)
    }
}

impl Default for SampleCounts {
    fn default() -> Self {
        Self::new(vec![1, 4])
    }
}

#[derive(Clone, Debug)]
pub struct ContextState {
    pub id: ContextId,
    pub client_version: ClientVersion,
    pub extensions: Extensions,
    pub robust_resource_init: bool,
    pub sample_counts: SampleCounts,
}

impl ContextState {
    pub fn new(id: ContextId, client_version: ClientVersion) -> Self {
        Self {
            id,
            client_version,
            extensions: Extensions::empty(),
            robust_resource_init: robust_init_forced(),
            sample_counts: SampleCounts::default(),
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_robust_resource_init(mut self, enabled: bool) -> Self {
        self.robust_resource_init = enabled;
        self
    }

    pub fn is_robust_resource_init_enabled(&self) -> bool {
        self.robust_resource_init
    }
}

fn robust_init_forced() -> bool {
    // Lets CI exercise the robust-init paths without threading a flag through every harness.
    env_var_truthy("AERO_GLES_ROBUST_INIT")
}

pub fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}
