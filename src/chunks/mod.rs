use log::{debug, warn};
use nom::{
    bytes::complete::take,
    combinator::{map_res, verify},
    error::ErrorKind,
    number::complete::be_u32,
    sequence::tuple,
    IResult,
};

use crate::{
    crc::chunk_crc,
    error::{Error, Result},
};

pub mod actl;
pub mod fctl;
pub mod fdat;
pub mod idat;
pub mod iend;
pub mod ihdr;
pub mod plte;
pub mod trns;

pub const SIGNATURE: &[u8; 8] = b"\x89PNG\x0d\x0a\x1a\x0a";

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug)]
pub enum Chunk<'a> {
    IHDR(ihdr::IHDRChunk),
    PLTE(plte::PLTEChunk),
    tRNS(trns::tRNSChunk<'a>),
    acTL(actl::acTLChunk),
    fcTL(fctl::fcTLChunk),
    IDAT(idat::IDATChunk<'a>),
    fdAT(fdat::fdATChunk<'a>),
    IEND,
    Unknown(RawChunk<'a>),
}

/// Iterates over the chunks following the signature, stopping after IEND
/// or the first error.
pub fn iter_chunks(source: &[u8]) -> ChunkIter {
    ChunkIter {
        source,
        finished: false,
        strict_crc: false,
    }
}

pub struct ChunkIter<'a> {
    source: &'a [u8],
    finished: bool,
    strict_crc: bool,
}
impl<'a> ChunkIter<'a> {
    /// Makes CRC mismatches fatal instead of logging them.
    pub fn strict_crc(mut self, strict: bool) -> Self {
        self.strict_crc = strict;
        self
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        self.source
    }

    fn next_chunk(&mut self) -> Result<Chunk<'a>> {
        let (rest, (raw, stored_crc)) = framed_chunk(self.source).map_err(|e| match e {
            nom::Err::Error(e) | nom::Err::Failure(e) if e.code == ErrorKind::Verify => {
                Error::malformed(format!(
                    "invalid chunk type {:?}",
                    String::from_utf8_lossy(e.input.get(..4).unwrap_or(e.input))
                ))
            }
            _ => Error::malformed(format!(
                "truncated chunk with {} bytes left",
                self.source.len()
            )),
        })?;
        self.source = rest;

        let computed = chunk_crc(raw.chunk_type, raw.data);
        if computed != stored_crc {
            let msg = format!(
                "CRC mismatch in {} chunk: stored {stored_crc:#010x}, computed {computed:#010x}",
                raw.name()
            );
            if self.strict_crc {
                return Err(Error::malformed(msg));
            }
            warn!("{msg}");
        }
        debug!("{} chunk, {} bytes", raw.name(), raw.data.len());
        raw.parse()
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.source.is_empty() {
            return None;
        }
        let chunk = self.next_chunk();
        if matches!(chunk, Ok(Chunk::IEND) | Err(_)) {
            self.finished = true;
        }
        Some(chunk)
    }
}

fn is_chunk_name(name: &[u8]) -> bool {
    name.iter().all(u8::is_ascii_alphabetic)
}

fn framed_chunk(input: &[u8]) -> IResult<&[u8], (RawChunk<'_>, u32)> {
    let (input, length) = be_u32(input)?;
    let (input, (chunk_type, data, crc)) = tuple((
        map_res(verify(take(4usize), is_chunk_name), <&[u8; 4]>::try_from),
        take(length),
        be_u32,
    ))(input)?;
    Ok((input, (RawChunk { chunk_type, data }, crc)))
}

/// A chunk as it appears on the wire, minus length and CRC.
#[derive(Debug, Clone, Copy)]
pub struct RawChunk<'a> {
    pub chunk_type: &'a [u8; 4],
    pub data: &'a [u8],
}
impl<'a> RawChunk<'a> {
    pub fn name(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.chunk_type)
    }

    /// Critical chunks have an uppercase first letter.
    pub fn is_critical(&self) -> bool {
        self.chunk_type[0].is_ascii_uppercase()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serialize(self.chunk_type, self.data)
    }

    fn parse(self) -> Result<Chunk<'a>> {
        match self.chunk_type {
            b"IHDR" => self.parse_as(Chunk::IHDR),
            b"PLTE" => self.parse_as(Chunk::PLTE),
            b"tRNS" => self.parse_as(Chunk::tRNS),
            b"acTL" => self.parse_as(Chunk::acTL),
            b"fcTL" => self.parse_as(Chunk::fcTL),
            b"IDAT" => self.parse_as(Chunk::IDAT),
            b"fdAT" => self.parse_as(Chunk::fdAT),
            b"IEND" => Ok(Chunk::IEND),
            _ => Ok(Chunk::Unknown(self)),
        }
    }

    fn parse_as<C: ParseableChunk<'a>>(self, wrap: fn(C) -> Chunk<'a>) -> Result<Chunk<'a>> {
        match C::from_bytes(self.data) {
            Ok((rest, chunk)) if rest.is_empty() => Ok(wrap(chunk)),
            Ok((rest, _)) => Err(Error::malformed(format!(
                "{} chunk has {} unexpected trailing bytes",
                self.name(),
                rest.len()
            ))),
            Err(_) => Err(Error::malformed(format!("invalid {} chunk", self.name()))),
        }
    }
}

/// Length, type, payload and CRC of one chunk.
pub(crate) fn serialize(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() + 12);
    bytes.extend((data.len() as u32).to_be_bytes());
    bytes.extend(chunk_type);
    bytes.extend(data);
    bytes.extend(chunk_crc(chunk_type, data).to_be_bytes());
    bytes
}

pub(crate) trait ParseableChunk<'a>: Sized {
    type Output: AsRef<[u8]>;
    const HEADER: &'static [u8; 4];

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self>;
    fn to_bytes(&self) -> Self::Output;
}
