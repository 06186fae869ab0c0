use crate::{
    color::ColorModel,
    decoder::AncillaryChunk,
    error::{Error, Result},
    frame::{Delay, Frame},
};

/// Fully composed canvas frames plus what's needed to write them back out.
#[derive(Debug, Clone)]
pub struct AnimationSequence {
    width: u32,
    height: u32,
    frames: Vec<Frame>,
    /// 0 plays forever.
    pub loop_count: u32,
    first_frame_is_default_image: bool,
    color_model: ColorModel,
    pub(crate) ancillary: Vec<AncillaryChunk>,
}
impl AnimationSequence {
    pub fn new(
        width: u32,
        height: u32,
        frames: Vec<Frame>,
        loop_count: u32,
        first_frame_is_default_image: bool,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::malformed("an animation needs at least one frame"));
        }
        if first_frame_is_default_image && frames.len() < 2 {
            return Err(Error::malformed(
                "an animation with a default image needs another frame",
            ));
        }
        if let Some(frame) = frames
            .iter()
            .find(|f| f.width() != width || f.height() != height || f.bytes_per_pixel() != 4)
        {
            return Err(Error::geometry(format!(
                "{}x{} frame in a {width}x{height} RGBA animation",
                frame.width(),
                frame.height()
            )));
        }
        Ok(Self {
            width,
            height,
            frames,
            loop_count,
            first_frame_is_default_image,
            color_model: ColorModel::Rgba,
            ancillary: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn frames_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    pub fn first_frame_is_default_image(&self) -> bool {
        self.first_frame_is_default_image
    }

    /// Index of the first frame that is part of the animation.
    pub fn first_displayed(&self) -> usize {
        self.first_frame_is_default_image as usize
    }

    pub fn displayed_frames(&self) -> &[Frame] {
        &self.frames[self.first_displayed()..]
    }

    pub fn color_model(&self) -> &ColorModel {
        &self.color_model
    }

    pub(crate) fn set_color_model(&mut self, color_model: ColorModel) {
        self.color_model = color_model;
    }

    pub fn ancillary_chunks(&self) -> &[AncillaryChunk] {
        &self.ancillary
    }

    /// Total display time of the animated frames, in milliseconds.
    pub fn duration_millis(&self) -> u64 {
        self.displayed_frames()
            .iter()
            .map(|f| f.delay.numerator as u64 * 1000 / f.delay.effective_denominator() as u64)
            .sum()
    }

    /// Sum of the displayed delays as an exact fraction.
    pub fn duration(&self) -> Delay {
        self.displayed_frames()
            .iter()
            .map(|f| f.delay)
            .reduce(Delay::merge)
            .unwrap_or(Delay::new(0, 1))
    }

    /// Copy of the frames expanded back to RGBA8.
    pub fn to_rgba_frames(&self) -> Result<Vec<Frame>> {
        self.frames
            .iter()
            .map(|f| self.color_model.to_rgba(f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_reject_mismatched_frames() {
        let frames = vec![Frame::rgba(2, 2).unwrap(), Frame::rgba(2, 3).unwrap()];
        assert!(matches!(
            AnimationSequence::new(2, 2, frames, 0, false),
            Err(Error::UnsupportedGeometry(_))
        ));
        assert!(AnimationSequence::new(2, 2, vec![], 0, false).is_err());
    }

    #[test]
    fn default_image_is_not_displayed() {
        let frames = vec![
            Frame::rgba(1, 1).unwrap(),
            Frame::rgba(1, 1).unwrap().with_delay(Delay::new(1, 4)),
            Frame::rgba(1, 1).unwrap().with_delay(Delay::new(1, 4)),
        ];
        let seq = AnimationSequence::new(1, 1, frames, 0, true).unwrap();
        assert_eq!(seq.displayed_frames().len(), 2);
        assert_eq!(seq.duration(), Delay::new(2, 4));
        assert_eq!(seq.duration_millis(), 500);
    }
}
