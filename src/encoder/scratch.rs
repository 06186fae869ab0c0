use crate::{error::Result, frame::Frame};

/// Row and compression buffers used to try one candidate.
#[derive(Debug, Default)]
pub(crate) struct TrialScratch {
    pub rows: Vec<u8>,
    pub row_buffer: Vec<u8>,
    pub compressed: Vec<u8>,
}

/// Canvas-sized buffers reused across the transitions of one encode.
#[derive(Debug)]
pub(crate) struct EncoderScratch {
    /// Previous frame with its rectangle cleared, for background disposal.
    pub cleared: Frame,
    /// Blend-over images for the none, background and previous disposals.
    pub over: [Frame; 3],
    /// Canvas left behind by the last frame's disposal.
    pub rest: Frame,
    pub trial: TrialScratch,
}
impl EncoderScratch {
    pub(crate) fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Result<Self> {
        let blank = || Frame::new(width, height, bytes_per_pixel);
        Ok(Self {
            cleared: blank()?,
            over: [blank()?, blank()?, blank()?],
            rest: blank()?,
            trial: TrialScratch::default(),
        })
    }
}
