use log::debug;

use crate::{
    animation::AnimationSequence,
    decoder::DecodedStream,
    error::{Error, Result},
    frame::{BlendOp, DisposeOp, Frame, FrameControl, RawFrame},
    pixel::blend_row_over,
};

/// Replays frame controls on a canvas the way an APNG viewer does.
pub struct Compositor {
    canvas: Frame,
    /// Canvas before the last blend, kept for `DisposeOp::Previous`.
    saved: Option<Frame>,
    seen_displayed: bool,
}
impl Compositor {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            canvas: Frame::rgba(width, height)?,
            saved: None,
            seen_displayed: false,
        })
    }

    pub fn canvas(&self) -> &Frame {
        &self.canvas
    }

    /// Draws the default image, which stays on the canvas underneath the
    /// first animated frame.
    pub fn apply_default_image(&mut self, raw: &RawFrame) -> Result<Frame> {
        let control = FrameControl {
            delay: raw.control.delay,
            ..FrameControl::full_canvas(self.canvas.width(), self.canvas.height())
        };
        self.compose(&control, &raw.image)
    }

    /// Draws one animated frame and returns the canvas as displayed.
    pub fn apply(&mut self, raw: &RawFrame) -> Result<Frame> {
        let mut control = raw.control;
        if !self.seen_displayed {
            self.seen_displayed = true;
            control.blend_op = BlendOp::Source;
            if control.dispose_op == DisposeOp::Previous {
                control.dispose_op = DisposeOp::Background;
            }
        }
        self.compose(&control, &raw.image)
    }

    fn compose(&mut self, control: &FrameControl, image: &Frame) -> Result<Frame> {
        let rect = control.rect;
        rect.validate(self.canvas.width(), self.canvas.height())?;
        if (image.width(), image.height()) != (rect.width, rect.height)
            || image.bytes_per_pixel() != 4
        {
            return Err(Error::geometry(format!(
                "{}x{} sub-image for a {}x{} rectangle",
                image.width(),
                image.height(),
                rect.width,
                rect.height
            )));
        }

        if control.dispose_op == DisposeOp::Previous {
            match self.saved.as_mut() {
                Some(saved) => saved.copy_from(&self.canvas),
                None => self.saved = Some(self.canvas.clone()),
            }
        }

        let rows = image.rect_rows(image.bounds());
        match control.blend_op {
            BlendOp::Source => {
                for (dst, src) in self.canvas.rect_rows_mut(rect).zip(rows) {
                    dst.copy_from_slice(src);
                }
            }
            BlendOp::Over => {
                for (dst, src) in self.canvas.rect_rows_mut(rect).zip(rows) {
                    blend_row_over(src, dst);
                }
            }
        }

        let displayed = self.canvas.clone().with_delay(control.delay);

        match control.dispose_op {
            DisposeOp::None => {}
            DisposeOp::Background => self.canvas.fill_rect(rect, &[0; 4]),
            DisposeOp::Previous => {
                if let Some(saved) = &self.saved {
                    self.canvas.copy_rect_from(saved, rect);
                }
            }
        }
        Ok(displayed)
    }
}

/// Composes every raw frame of a decoded stream into canvas frames.
pub fn compose_sequence(stream: DecodedStream) -> Result<AnimationSequence> {
    let mut compositor = Compositor::new(stream.width, stream.height)?;
    let mut frames = Vec::new();
    frames.try_reserve_exact(stream.frames.len())?;
    for (i, raw) in stream.frames.iter().enumerate() {
        let frame = if i == 0 && stream.first_frame_is_default_image {
            compositor.apply_default_image(raw)?
        } else {
            compositor.apply(raw)?
        };
        frames.push(frame);
    }
    debug!(
        "composed {} frames on a {}x{} canvas",
        frames.len(),
        stream.width,
        stream.height
    );
    let mut sequence = AnimationSequence::new(
        stream.width,
        stream.height,
        frames,
        stream.loop_count,
        stream.first_frame_is_default_image,
    )?;
    sequence.ancillary = stream.ancillary;
    Ok(sequence)
}
