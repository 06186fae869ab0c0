use miniz_oxide::deflate::core::CompressionStrategy;

use super::scratch::TrialScratch;
use crate::{
    error::Result,
    filters::{filter_adaptive, filter_none},
    frame::{BlendOp, DisposeOp, Frame, Rect},
    image_data::compress_data,
};

const TRIAL_LEVEL: u8 = 2;
const FINAL_LEVEL: u8 = 9;

/// Which buffer a candidate takes its pixels from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CandidateImage {
    /// The next frame itself, drawn with `BlendOp::Source`.
    Next,
    /// One of the blend-over images in the encoder scratch.
    Over(usize),
}

/// One way of getting from the current canvas to the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeCandidate {
    pub rect: Rect,
    /// Applied to the frame before the transition.
    pub dispose_op: DisposeOp,
    /// Applied to the frame after the transition.
    pub blend_op: BlendOp,
    /// Rows use adaptive filtering rather than filter type 0.
    pub filtered: bool,
    /// Size of the trial compression.
    pub size: usize,
    pub(crate) image: CandidateImage,
}
impl EncodeCandidate {
    pub(crate) fn new(
        rect: Rect,
        dispose_op: DisposeOp,
        blend_op: BlendOp,
        image: CandidateImage,
    ) -> Self {
        Self {
            rect,
            dispose_op,
            blend_op,
            filtered: false,
            size: usize::MAX,
            image,
        }
    }
}

/// Builds the scanlines of `rect`, filtered or not, into `scratch.rows`.
fn prepare_rows(image: &Frame, rect: Rect, filtered: bool, scratch: &mut TrialScratch) {
    scratch.rows.clear();
    let rows = image.rect_rows(rect);
    if filtered {
        filter_adaptive(
            rows,
            image.bytes_per_pixel(),
            &mut scratch.rows,
            &mut scratch.row_buffer,
        );
    } else {
        filter_none(rows, &mut scratch.rows);
    }
}

fn strategy(filtered: bool) -> CompressionStrategy {
    if filtered {
        CompressionStrategy::Filtered
    } else {
        CompressionStrategy::Default
    }
}

/// Compresses `rect` of `image` both ways at a fast level and records the
/// smaller result in the candidate. Ties go to adaptive filtering.
pub(crate) fn run_trial(
    candidate: &mut EncodeCandidate,
    image: &Frame,
    scratch: &mut TrialScratch,
) -> Result<()> {
    let mut sizes = [0; 2];
    for (filtered, size) in [false, true].into_iter().zip(sizes.iter_mut()) {
        prepare_rows(image, candidate.rect, filtered, scratch);
        compress_data(
            &scratch.rows,
            TRIAL_LEVEL,
            strategy(filtered),
            &mut scratch.compressed,
        )?;
        *size = scratch.compressed.len();
    }
    candidate.filtered = sizes[0] >= sizes[1];
    candidate.size = sizes[0].min(sizes[1]);
    Ok(())
}

/// Compresses the chosen rectangle at full effort with its winning filter
/// mode.
pub(crate) fn compress_final(
    image: &Frame,
    rect: Rect,
    filtered: bool,
    scratch: &mut TrialScratch,
) -> Result<Vec<u8>> {
    prepare_rows(image, rect, filtered, scratch);
    let mut out = Vec::new();
    compress_data(&scratch.rows, FINAL_LEVEL, strategy(filtered), &mut out)?;
    Ok(out)
}

/// The smallest candidate; the earliest one wins a tie.
pub(crate) fn pick_best(candidates: &[EncodeCandidate]) -> Option<&EncodeCandidate> {
    candidates
        .iter()
        .reduce(|best, c| if c.size < best.size { c } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Pixel;

    fn candidate(dispose_op: DisposeOp, blend_op: BlendOp, size: usize) -> EncodeCandidate {
        EncodeCandidate {
            size,
            ..EncodeCandidate::new(Rect::new(0, 0, 1, 1), dispose_op, blend_op, CandidateImage::Next)
        }
    }

    #[test]
    fn ties_go_to_the_earlier_candidate() {
        let candidates = [
            candidate(DisposeOp::None, BlendOp::Source, 40),
            candidate(DisposeOp::None, BlendOp::Over, 30),
            candidate(DisposeOp::Background, BlendOp::Source, 30),
        ];
        let best = pick_best(&candidates).unwrap();
        assert_eq!(
            (best.dispose_op, best.blend_op),
            (DisposeOp::None, BlendOp::Over)
        );
        assert!(pick_best(&[]).is_none());
    }

    #[test]
    fn trial_sizes_match_a_final_stream_of_the_same_mode() {
        let mut image = Frame::rgba(8, 8).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                image.set(x, y, Pixel::opaque(x as u8 * 30, y as u8 * 30, 7));
            }
        }
        let mut scratch = TrialScratch::default();
        let mut c = EncodeCandidate::new(
            Rect::new(2, 2, 4, 4),
            DisposeOp::None,
            BlendOp::Source,
            CandidateImage::Next,
        );
        run_trial(&mut c, &image, &mut scratch).unwrap();
        assert!(c.size > 0 && c.size < usize::MAX);

        let data = compress_final(&image, c.rect, c.filtered, &mut scratch).unwrap();
        let raw = crate::image_data::decompress_data(&data, 4 * 17).unwrap();
        assert_eq!(raw.len(), 4 * 17);
    }
}
