use log::info;

use crate::{animation::AnimationSequence, error::Result};

mod dirty;
mod downconvert;
mod duplicates;

pub(crate) use dirty::clean_dirty_pixels;
pub(crate) use downconvert::downconvert;
pub(crate) use duplicates::coalesce_duplicates;

/// Lossless clean-up passes run before encoding, in order: invisible color
/// is zeroed, repeated frames are merged, then the color model is reduced.
pub fn optimize_sequence(sequence: &mut AnimationSequence) -> Result<()> {
    let cleaned = clean_dirty_pixels(sequence);
    let merged = coalesce_duplicates(sequence);
    downconvert(sequence)?;
    info!(
        "cleaned {cleaned} pixels, merged {merged} duplicate frames, color type {:?}",
        sequence.color_model().color_type()
    );
    Ok(())
}
