/// The container the optimized frames are headed for.
///
/// Some animated formats cannot express everything APNG can, so the encoder
/// asks the target which primitives it may use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Plain APNG output, every dispose op is available.
    Apng,
    /// Frames that will be re-muxed into animated WebP: no "previous"
    /// disposal and frame offsets on even coordinates.
    #[default]
    WebP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub dispose_previous: bool,
    pub even_offsets: bool,
}

impl Target {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Target::Apng => Capabilities {
                dispose_previous: true,
                even_offsets: false,
            },
            Target::WebP => Capabilities {
                dispose_previous: false,
                even_offsets: true,
            },
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub target: Target,
    /// Reject chunks whose CRC doesn't match instead of logging a warning.
    pub strict_crc: bool,
    /// Carry color-type independent ancillary chunks of the default image
    /// over to the output.
    pub keep_metadata: bool,
}

impl Options {
    pub fn for_target(target: Target) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}
