use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    /// A backend delegate failed. The logical state is left as it was before the call.
    #[error("texture backend operation `{op}` failed")]
    Backend {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("texture {0} has already been destroyed")]
    Destroyed(u32),
}

pub(crate) fn delegate<T>(op: &'static str, result: anyhow::Result<T>) -> Result<T, TextureError> {
    result.map_err(|source| TextureError::Backend { op, source })
}
