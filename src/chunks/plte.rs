use super::{serialize, ParseableChunk};
use nom::{
    bytes::complete::take,
    combinator::{map, verify},
    multi::count,
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PLTEChunk {
    colors: Vec<Entry>,
}
impl PLTEChunk {
    pub(crate) fn new(colors: Vec<Entry>) -> Self {
        Self { colors }
    }

    pub fn get_color(&self, index: u8) -> Option<&Entry> {
        self.colors.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
impl<'a> ParseableChunk<'a> for PLTEChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"PLTE";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (_, chunk_data) = verify(take(chunk_data.len()), |d: &[u8]| {
            !d.is_empty() && d.len() % 3 == 0 && d.len() <= 256 * 3
        })(chunk_data)?;
        let entry_count = chunk_data.len() / 3;
        let (rest, entries) = count(
            map(take(3usize), |i: &[u8]| Entry(i[0], i[1], i[2])),
            entry_count,
        )(chunk_data)?;
        Ok((rest, PLTEChunk { colors: entries }))
    }

    fn to_bytes(&self) -> Self::Output {
        let data: Vec<u8> = self
            .colors
            .iter()
            .flat_map(|&Entry(r, g, b)| [r, g, b])
            .collect();
        serialize(Self::HEADER, &data)
    }
}
