use log::info;
use serde_json::{json, Value};

use crate::{
    decoder::decode_stream,
    error::{Error, Result},
    frame::{BlendOp, Frame, FrameControl, RawFrame},
    pixel::blend_row_over,
    writer::encode_png,
    Options,
};

/// One displayed frame extracted as a standalone PNG.
#[derive(Debug, Clone)]
pub struct DisassembledFrame {
    pub file_name: String,
    pub png: Vec<u8>,
    pub control: FrameControl,
}
impl DisassembledFrame {
    /// Display time in milliseconds; zero is shown as 10ms by viewers.
    pub fn delay_millis(&self) -> u32 {
        match self.control.delay.as_millis() {
            0 => 10,
            millis => millis,
        }
    }

    fn metadata(&self) -> Value {
        let control = &self.control;
        json!({
            "src": self.file_name,
            "delay_num": control.delay.numerator,
            "delay_den": control.delay.denominator,
            "delay_ms": self.delay_millis(),
            "x": control.rect.x,
            "y": control.rect.y,
            "dispose_op": control.dispose_op as u8,
            "blend_op": control.blend_op as u8,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Disassembly {
    pub prefix: String,
    pub frames: Vec<DisassembledFrame>,
}
impl Disassembly {
    pub fn metadata_file_name(&self) -> String {
        format!("{}_metadata.json", self.prefix)
    }

    /// `{"frames": [...]}`, one record per extracted frame.
    pub fn metadata(&self) -> Value {
        json!({
            "frames": self.frames.iter().map(DisassembledFrame::metadata).collect::<Vec<_>>(),
        })
    }

    pub fn metadata_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.metadata())
            .map_err(|e| Error::codec(format!("failed to serialize metadata: {e}")))
    }
}

/// The sub-image as a viewer would draw it on an empty canvas of its own
/// size.
fn isolate(raw: &RawFrame) -> Result<Frame> {
    match raw.control.blend_op {
        BlendOp::Source => Ok(raw.image.clone()),
        BlendOp::Over => {
            let mut frame = Frame::rgba(raw.image.width(), raw.image.height())?;
            let bounds = frame.bounds();
            for (dst, src) in frame.rect_rows_mut(bounds).zip(raw.image.rect_rows(bounds)) {
                blend_row_over(src, dst);
            }
            Ok(frame)
        }
    }
}

/// Splits an APNG into its raw frames. File names are `<prefix><n>.png`,
/// counting from 1 and padded to the width of the frame count.
pub fn disassemble(data: &[u8], options: &Options, prefix: &str) -> Result<Disassembly> {
    let stream = decode_stream(data, options)?;
    let skip = stream.first_frame_is_default_image as usize;
    let count = stream.frames.len() - skip;
    let digits = count.to_string().len();

    let mut frames = Vec::new();
    frames.try_reserve_exact(count)?;
    for (i, raw) in stream.frames.iter().skip(skip).enumerate() {
        info!("extracting frame {} of {count}", i + 1);
        let png = encode_png(&isolate(raw)?)?;
        frames.push(DisassembledFrame {
            file_name: format!("{prefix}{:0digits$}.png", i + 1),
            png,
            control: raw.control,
        });
    }
    Ok(Disassembly {
        prefix: prefix.to_string(),
        frames,
    })
}
