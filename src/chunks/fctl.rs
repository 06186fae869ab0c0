use super::{serialize, ParseableChunk};
use crate::{
    error::Result,
    frame::{BlendOp, Delay, DisposeOp, FrameControl, Rect},
};
use nom::{
    number::complete::{be_u16, be_u32, be_u8},
    sequence::tuple,
    IResult,
};

/// Frame control: placement, timing and compositing of the next sub-image.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct fcTLChunk {
    pub sequence_number: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: u8,
    pub blend_op: u8,
}
impl fcTLChunk {
    pub(crate) fn from_control(sequence_number: u32, control: &FrameControl) -> Self {
        let (delay_num, delay_den) = control.delay.to_fctl_fields();
        Self {
            sequence_number,
            width: control.rect.width,
            height: control.rect.height,
            x_offset: control.rect.x,
            y_offset: control.rect.y,
            delay_num,
            delay_den,
            dispose_op: control.dispose_op as u8,
            blend_op: control.blend_op as u8,
        }
    }

    /// Typed view, failing on unknown dispose or blend codes.
    pub fn control(&self) -> Result<FrameControl> {
        Ok(FrameControl {
            rect: Rect::new(self.x_offset, self.y_offset, self.width, self.height),
            delay: Delay::new(self.delay_num as u32, self.delay_den as u32),
            dispose_op: DisposeOp::try_from(self.dispose_op)?,
            blend_op: BlendOp::try_from(self.blend_op)?,
        })
    }
}
impl<'a> ParseableChunk<'a> for fcTLChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"fcTL";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (
            rest,
            (
                sequence_number,
                width,
                height,
                x_offset,
                y_offset,
                delay_num,
                delay_den,
                dispose_op,
                blend_op,
            ),
        ) = tuple((
            be_u32, be_u32, be_u32, be_u32, be_u32, be_u16, be_u16, be_u8, be_u8,
        ))(chunk_data)?;
        Ok((
            rest,
            fcTLChunk {
                sequence_number,
                width,
                height,
                x_offset,
                y_offset,
                delay_num,
                delay_den,
                dispose_op,
                blend_op,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(26);
        for v in [
            self.sequence_number,
            self.width,
            self.height,
            self.x_offset,
            self.y_offset,
        ] {
            data.extend(v.to_be_bytes());
        }
        data.extend(self.delay_num.to_be_bytes());
        data.extend(self.delay_den.to_be_bytes());
        data.extend([self.dispose_op, self.blend_op]);
        serialize(Self::HEADER, &data)
    }
}
