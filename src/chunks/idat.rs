use super::{serialize, ParseableChunk};
use nom::IResult;

#[derive(Debug, Clone, Copy)]
pub struct IDATChunk<'a> {
    pub(crate) data: &'a [u8],
}
impl<'a> ParseableChunk<'a> for IDATChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"IDAT";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&[u8], Self> {
        Ok((&chunk_data[0..0], IDATChunk { data: chunk_data }))
    }

    fn to_bytes(&self) -> Self::Output {
        serialize(Self::HEADER, self.data)
    }
}
