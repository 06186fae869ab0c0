/// Everything that can stop an APNG from being decoded, optimized or written.
///
/// Files are processed as all-or-nothing units, so every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad signature, missing or misplaced IHDR, invalid chunk names,
    /// truncated chunks, unknown critical chunks.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// Frame rectangles outside the canvas, empty rectangles, or dimensions
    /// above the sanity ceiling.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// The deflate stream or the scanline data could not be processed.
    #[error("codec failure: {0}")]
    CodecFailure(String),

    /// A frame or compression buffer could not be allocated.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedContainer(msg.into())
    }

    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        Self::UnsupportedGeometry(msg.into())
    }

    pub(crate) fn codec(msg: impl Into<String>) -> Self {
        Self::CodecFailure(msg.into())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::ResourceExhaustion(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
