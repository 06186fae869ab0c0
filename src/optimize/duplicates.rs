use crate::animation::AnimationSequence;

/// Folds runs of identical displayed frames into one frame whose delay is
/// the sum of theirs. The default image is left alone. Returns the number of
/// frames removed.
pub(crate) fn coalesce_duplicates(sequence: &mut AnimationSequence) -> usize {
    let first = sequence.first_displayed();
    let frames = sequence.frames_mut();
    let before = frames.len();

    let mut displayed = frames.split_off(first);
    displayed.dedup_by(|next, kept| {
        if next.same_pixels(kept) {
            kept.delay = kept.delay.merge(next.delay);
            true
        } else {
            false
        }
    });
    frames.append(&mut displayed);

    before - frames.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frame::{Delay, Frame},
        pixel::Pixel,
    };

    fn frame(value: u8, delay: Delay) -> Frame {
        let mut frame = Frame::rgba(2, 2).unwrap();
        frame.set(1, 1, Pixel::opaque(value, value, value));
        frame.with_delay(delay)
    }

    #[test]
    fn identical_neighbours_merge_their_delays() {
        let frames = vec![
            frame(1, Delay::new(3, 10)),
            frame(1, Delay::new(2, 10)),
            frame(2, Delay::new(1, 10)),
        ];
        let mut sequence = AnimationSequence::new(2, 2, frames, 0, false).unwrap();
        let total = sequence.duration_millis();

        assert_eq!(coalesce_duplicates(&mut sequence), 1);
        let delays: Vec<_> = sequence.frames().iter().map(|f| f.delay).collect();
        assert_eq!(delays, vec![Delay::new(5, 10), Delay::new(1, 10)]);
        assert_eq!(sequence.duration_millis(), total);
    }

    #[test]
    fn runs_collapse_with_reduced_fractions() {
        let frames = vec![
            frame(1, Delay::new(1, 10)),
            frame(1, Delay::new(3, 20)),
            frame(1, Delay::new(1, 4)),
        ];
        let mut sequence = AnimationSequence::new(2, 2, frames, 0, false).unwrap();
        assert_eq!(coalesce_duplicates(&mut sequence), 2);
        // 1/10 + 3/20 reduces to 1/4; equal denominators just add.
        assert_eq!(sequence.frames()[0].delay, Delay::new(2, 4));
    }

    #[test]
    fn default_image_is_never_merged() {
        let frames = vec![
            frame(1, Delay::DEFAULT_IMAGE),
            frame(1, Delay::new(1, 10)),
            frame(2, Delay::new(1, 10)),
        ];
        let mut sequence = AnimationSequence::new(2, 2, frames, 0, true).unwrap();
        assert_eq!(coalesce_duplicates(&mut sequence), 0);
        assert_eq!(sequence.frames().len(), 3);
    }
}
