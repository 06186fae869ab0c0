use super::{serialize, ParseableChunk};
use nom::{number::complete::be_u32, IResult};

/// Frame data: an IDAT payload prefixed with a sequence number.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy)]
pub struct fdATChunk<'a> {
    pub sequence_number: u32,
    pub(crate) data: &'a [u8],
}
impl<'a> ParseableChunk<'a> for fdATChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"fdAT";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (data, sequence_number) = be_u32(chunk_data)?;
        Ok((
            &data[data.len()..],
            fdATChunk {
                sequence_number,
                data,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut payload = Vec::with_capacity(self.data.len() + 4);
        payload.extend(self.sequence_number.to_be_bytes());
        payload.extend(self.data);
        serialize(Self::HEADER, &payload)
    }
}
