use super::{serialize, ParseableChunk};
use nom::IResult;

/// Transparency data; how to read it depends on the image's color type.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy)]
pub struct tRNSChunk<'a> {
    inner: &'a [u8],
}
impl<'a> tRNSChunk<'a> {
    pub(crate) fn new(inner: &'a [u8]) -> Self {
        Self { inner }
    }

    pub(crate) fn as_greyscale(&self) -> Option<u16> {
        Some(u16::from_be_bytes(self.inner.get(0..2)?.try_into().ok()?))
    }

    pub(crate) fn as_truecolor(&self) -> Option<(u16, u16, u16)> {
        let sample = |i: usize| -> Option<u16> {
            Some(u16::from_be_bytes(self.inner.get(i..i + 2)?.try_into().ok()?))
        };
        Some((sample(0)?, sample(2)?, sample(4)?))
    }

    /// Alpha of a palette entry; entries past the table are opaque.
    pub(crate) fn as_palette(&self, index: u8) -> u8 {
        *self.inner.get(index as usize).unwrap_or(&255)
    }
}
impl<'a> ParseableChunk<'a> for tRNSChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"tRNS";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        Ok((&chunk_data[0..0], tRNSChunk { inner: chunk_data }))
    }

    fn to_bytes(&self) -> Self::Output {
        serialize(Self::HEADER, self.inner)
    }
}
