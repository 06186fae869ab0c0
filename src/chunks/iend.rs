use crate::crc::chunk_crc;

use super::ParseableChunk;

pub(crate) struct IENDChunk;
impl<'a> ParseableChunk<'a> for IENDChunk {
    type Output = [u8; 12];

    const HEADER: &'static [u8; 4] = b"IEND";

    fn from_bytes(chunk_data: &[u8]) -> nom::IResult<&[u8], Self> {
        Ok((chunk_data, Self))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0, 0, 0, 0];
        let crc = chunk_crc(Self::HEADER, &[]).to_be_bytes();
        data[8..].copy_from_slice(&crc);
        data
    }
}
