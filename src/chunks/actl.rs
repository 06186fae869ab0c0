use super::{serialize, ParseableChunk};
use nom::{number::complete::be_u32, sequence::tuple, IResult};

/// Animation control: frame count and how often the animation plays.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct acTLChunk {
    pub num_frames: u32,
    /// 0 means forever.
    pub num_plays: u32,
}
impl<'a> ParseableChunk<'a> for acTLChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"acTL";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (rest, (num_frames, num_plays)) = tuple((be_u32, be_u32))(chunk_data)?;
        Ok((
            rest,
            acTLChunk {
                num_frames,
                num_plays,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = self.num_frames.to_be_bytes().to_vec();
        data.extend(self.num_plays.to_be_bytes());
        serialize(Self::HEADER, &data)
    }
}
