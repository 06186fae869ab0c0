use crate::animation::AnimationSequence;

/// Zeroes the color of every fully transparent RGBA pixel, returning how
/// many pixels changed.
pub(crate) fn clean_dirty_pixels(sequence: &mut AnimationSequence) -> usize {
    let mut cleaned = 0;
    for frame in sequence.frames_mut() {
        if frame.bytes_per_pixel() != 4 {
            continue;
        }
        for pixel in frame.as_bytes_mut().chunks_exact_mut(4) {
            if pixel[3] == 0 && pixel[..3] != [0, 0, 0] {
                pixel[..3].fill(0);
                cleaned += 1;
            }
        }
    }
    cleaned
}
