use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    animation::AnimationSequence,
    color::ColorModel,
    decoder::AncillaryChunk,
    error::{Error, Result},
    frame::{BlendOp, DisposeOp, Frame, FrameControl, Rect},
    options::Capabilities,
};

mod candidate;
mod rect;
mod scratch;

pub use candidate::EncodeCandidate;
use candidate::{compress_final, pick_best, run_trial, CandidateImage};
use rect::{diff_frames, Diff, DiffRules};
use scratch::{EncoderScratch, TrialScratch};

/// Compressed image data of one frame and the control written before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Absent for the default image and for still images.
    pub control: Option<FrameControl>,
    /// A complete zlib stream.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EncodedAnimation {
    pub width: u32,
    pub height: u32,
    pub color_model: ColorModel,
    pub loop_count: u32,
    pub frames: Vec<EncodedFrame>,
    pub ancillary: Vec<AncillaryChunk>,
}
impl EncodedAnimation {
    /// Needs acTL and fcTL chunks.
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Frames that are part of the animation, the default image excluded.
    pub fn num_frames(&self) -> u32 {
        self.frames.iter().filter(|f| f.control.is_some()).count() as u32
    }
}

/// The frame waiting for its dispose op to be decided.
struct Pending {
    rect: Rect,
    blend_op: BlendOp,
    data: Vec<u8>,
}

/// Encodes every frame as the cheapest delta from the canvas before it.
pub fn encode_sequence(
    sequence: &AnimationSequence,
    capabilities: Capabilities,
) -> Result<EncodedAnimation> {
    let frames = sequence.frames();
    let count = frames.len();
    let animated = count > 1;
    let first = if animated {
        sequence.first_displayed()
    } else {
        0
    };
    let (width, height) = (sequence.width(), sequence.height());
    let canvas = Rect::canvas(width, height);
    let model = sequence.color_model();
    let rules = DiffRules::for_model(model);
    let mut scratch = EncoderScratch::new(width, height, model.bytes_per_pixel())?;

    let mut encoded = Vec::new();
    encoded.try_reserve_exact(count)?;
    if first == 1 {
        let data = compress_whole(&frames[0], &mut scratch.trial)?;
        info!("default image: {} bytes", data.len());
        encoded.push(EncodedFrame {
            control: None,
            data,
        });
    }

    let mut pending = Pending {
        rect: canvas,
        blend_op: BlendOp::Source,
        data: compress_whole(&frames[first], &mut scratch.trial)?,
    };
    for i in first..count.saturating_sub(1) {
        let (current, next) = (&frames[i], &frames[i + 1]);
        let candidates = transition_candidates(
            current,
            next,
            pending.rect,
            capabilities.dispose_previous && i > first,
            &rules,
            capabilities.even_offsets,
            &mut scratch,
        )?;
        let best = *pick_best(&candidates)
            .ok_or_else(|| Error::codec("no way to encode the transition"))?;
        debug!(
            "frame {}: {} candidates, best {:?}/{:?} at {} bytes",
            i + 1 - first,
            candidates.len(),
            best.dispose_op,
            best.blend_op,
            best.size
        );

        let control = FrameControl {
            rect: pending.rect,
            delay: current.delay,
            dispose_op: best.dispose_op,
            blend_op: pending.blend_op,
        };
        log_frame(i - first, count - first, &control, pending.data.len());
        encoded.push(EncodedFrame {
            control: Some(control),
            data: std::mem::take(&mut pending.data),
        });

        if best.dispose_op != DisposeOp::Previous {
            scratch.rest.copy_from(current);
        }
        if best.dispose_op == DisposeOp::Background {
            if let Some(transparent) = rules.transparent_sample() {
                scratch.rest.fill_rect(pending.rect, transparent);
            }
        }

        let image = candidate_image(&best, next, &scratch.over);
        pending = Pending {
            rect: best.rect,
            blend_op: best.blend_op,
            data: compress_final(image, best.rect, best.filtered, &mut scratch.trial)?,
        };
    }

    let last = &frames[count - 1];
    let control = animated.then(|| FrameControl {
        rect: pending.rect,
        delay: last.delay,
        dispose_op: DisposeOp::None,
        blend_op: pending.blend_op,
    });
    match &control {
        Some(control) => log_frame(count - 1 - first, count - first, control, pending.data.len()),
        None => info!("still image: {} bytes", pending.data.len()),
    }
    encoded.push(EncodedFrame {
        control,
        data: pending.data,
    });

    Ok(EncodedAnimation {
        width,
        height,
        color_model: model.clone(),
        loop_count: sequence.loop_count,
        frames: encoded,
        ancillary: sequence.ancillary.clone(),
    })
}

fn log_frame(index: usize, total: usize, control: &FrameControl, size: usize) {
    let rect = control.rect;
    info!(
        "frame {} of {total}: {}x{} at ({}, {}), dispose {:?}, blend {:?}, {size} bytes",
        index + 1,
        rect.width,
        rect.height,
        rect.x,
        rect.y,
        control.dispose_op,
        control.blend_op
    );
}

/// Full-canvas encoding used for the first frame and the default image.
fn compress_whole(frame: &Frame, scratch: &mut TrialScratch) -> Result<Vec<u8>> {
    let mut candidate = EncodeCandidate::new(
        frame.bounds(),
        DisposeOp::None,
        BlendOp::Source,
        CandidateImage::Next,
    );
    run_trial(&mut candidate, frame, scratch)?;
    compress_final(frame, candidate.rect, candidate.filtered, scratch)
}

fn candidate_image<'f>(
    candidate: &EncodeCandidate,
    next: &'f Frame,
    over: &'f [Frame; 3],
) -> &'f Frame {
    match candidate.image {
        CandidateImage::Next => next,
        CandidateImage::Over(k) => &over[k],
    }
}

fn push_candidates(
    candidates: &mut Vec<EncodeCandidate>,
    diff: Diff,
    dispose_op: DisposeOp,
    over_index: usize,
) {
    candidates.push(EncodeCandidate::new(
        diff.rect,
        dispose_op,
        BlendOp::Source,
        CandidateImage::Next,
    ));
    if diff.over_possible {
        candidates.push(EncodeCandidate::new(
            diff.rect,
            dispose_op,
            BlendOp::Over,
            CandidateImage::Over(over_index),
        ));
    }
}

/// Every (dispose, blend) pair that can take `current` to `next`, each with
/// its trial size, in the order none, background, previous.
fn transition_candidates(
    current: &Frame,
    next: &Frame,
    current_rect: Rect,
    allow_previous: bool,
    rules: &DiffRules,
    even_offsets: bool,
    scratch: &mut EncoderScratch,
) -> Result<Vec<EncodeCandidate>> {
    let mut candidates = Vec::with_capacity(6);

    let diff = diff_frames(current, next, &mut scratch.over[0], rules, even_offsets);
    push_candidates(&mut candidates, diff, DisposeOp::None, 0);

    if let Some(transparent) = rules.transparent_sample() {
        scratch.cleared.copy_from(current);
        scratch.cleared.fill_rect(current_rect, transparent);
        let diff = diff_frames(
            &scratch.cleared,
            next,
            &mut scratch.over[1],
            rules,
            even_offsets,
        );
        push_candidates(&mut candidates, diff, DisposeOp::Background, 1);
    }

    if allow_previous {
        let diff = diff_frames(&scratch.rest, next, &mut scratch.over[2], rules, even_offsets);
        push_candidates(&mut candidates, diff, DisposeOp::Previous, 2);
    }

    run_trials(&mut candidates, next, &scratch.over)?;
    Ok(candidates)
}

#[cfg(feature = "parallel")]
fn run_trials(candidates: &mut [EncodeCandidate], next: &Frame, over: &[Frame; 3]) -> Result<()> {
    candidates
        .par_iter_mut()
        .try_for_each_init(TrialScratch::default, |scratch, candidate| {
            let image = candidate_image(candidate, next, over);
            run_trial(candidate, image, scratch)
        })
}

#[cfg(not(feature = "parallel"))]
fn run_trials(candidates: &mut [EncodeCandidate], next: &Frame, over: &[Frame; 3]) -> Result<()> {
    let mut scratch = TrialScratch::default();
    candidates.iter_mut().try_for_each(|candidate| {
        let image = candidate_image(candidate, next, over);
        run_trial(candidate, image, &mut scratch)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::Delay, pixel::Pixel, Target};

    fn frame(pixels: &[(u32, u32, Pixel)]) -> Frame {
        let mut frame = Frame::rgba(8, 8).unwrap();
        frame.fill_rect(frame.bounds(), &Pixel::opaque(20, 40, 60).to_bytes());
        for &(x, y, p) in pixels {
            frame.set(x, y, p);
        }
        frame.with_delay(Delay::new(1, 10))
    }

    #[test]
    fn still_images_have_no_frame_control() {
        let sequence = AnimationSequence::new(8, 8, vec![frame(&[])], 0, false).unwrap();
        let encoded = encode_sequence(&sequence, Target::Apng.capabilities()).unwrap();
        assert_eq!(encoded.frames.len(), 1);
        assert!(encoded.frames[0].control.is_none());
        assert!(!encoded.is_animated());
    }

    #[test]
    fn later_frames_only_cover_what_changed() {
        let frames = vec![
            frame(&[]),
            frame(&[(7, 5, Pixel::opaque(255, 0, 0))]),
            frame(&[(7, 5, Pixel::opaque(255, 0, 0)), (2, 2, Pixel::opaque(0, 0, 0))]),
        ];
        let sequence = AnimationSequence::new(8, 8, frames, 0, false).unwrap();
        let encoded = encode_sequence(&sequence, Target::WebP.capabilities()).unwrap();
        assert_eq!(encoded.num_frames(), 3);

        let controls: Vec<_> = encoded
            .frames
            .iter()
            .map(|f| f.control.unwrap())
            .collect();
        assert_eq!(controls[0].rect, Rect::canvas(8, 8));
        assert_eq!(controls[0].blend_op, BlendOp::Source);
        assert_eq!(controls[1].rect, Rect::new(6, 4, 2, 2));
        assert_eq!(controls[2].rect, Rect::new(2, 2, 1, 1));
        assert_eq!(controls[2].dispose_op, DisposeOp::None);
        assert!(controls
            .iter()
            .all(|c| c.dispose_op != DisposeOp::Previous));
    }

    #[test]
    fn default_image_is_encoded_without_control() {
        let frames = vec![frame(&[]), frame(&[(1, 1, Pixel::TRANSPARENT)]), frame(&[])];
        let sequence = AnimationSequence::new(8, 8, frames, 2, true).unwrap();
        let encoded = encode_sequence(&sequence, Target::Apng.capabilities()).unwrap();
        assert_eq!(encoded.frames.len(), 3);
        assert!(encoded.frames[0].control.is_none());
        assert_eq!(encoded.num_frames(), 2);
        assert_eq!(
            encoded.frames[1].control.unwrap().rect,
            Rect::canvas(8, 8)
        );
        assert_eq!(encoded.loop_count, 2);
    }
}
