use crate::{
    error::{Error, Result},
    frame::MAX_DIMENSION,
};
use nom::{
    combinator::map_res,
    number::complete::{be_u32, be_u8},
    sequence::tuple,
    IResult,
};

use super::{serialize, ParseableChunk};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IHDRChunk {
    pub width: u32,
    pub height: u32,
    pub(crate) bit_depth: u8,
    pub(crate) color_type: ColorType,
    pub(crate) compression_method: u8,
    pub(crate) filter_method: u8,
    pub(crate) interlace_method: Interlacing,
}
impl IHDRChunk {
    /// Header for 8-bit, non-interlaced output.
    pub(crate) fn new(width: u32, height: u32, color_type: ColorType) -> Self {
        Self {
            width,
            height,
            bit_depth: 8,
            color_type,
            compression_method: 0,
            filter_method: 0,
            interlace_method: Interlacing::None,
        }
    }

    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    pub fn interlace_method(&self) -> Interlacing {
        self.interlace_method
    }

    /// Rejects headers no decoder could make sense of.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::geometry(format!(
                "empty image {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(Error::geometry(format!(
                "image {}x{} exceeds the {MAX_DIMENSION} pixel ceiling",
                self.width, self.height
            )));
        }
        let allowed: &[u8] = match self.color_type {
            ColorType::Greyscale => &[1, 2, 4, 8, 16],
            ColorType::IndexedColor => &[1, 2, 4, 8],
            _ => &[8, 16],
        };
        if !allowed.contains(&self.bit_depth) {
            return Err(Error::malformed(format!(
                "bit depth {} isn't allowed for {:?}",
                self.bit_depth, self.color_type
            )));
        }
        if self.compression_method != 0 || self.filter_method != 0 {
            return Err(Error::malformed(format!(
                "unknown compression/filter method {}/{}",
                self.compression_method, self.filter_method
            )));
        }
        Ok(())
    }

    /// Bytes between a pixel and the one to its left, as used by filters.
    pub(crate) fn filter_width(&self) -> u8 {
        let channel_count = self.color_type.channel_count();
        let sample_width = u8::max(self.bit_depth / 8, 1);
        channel_count * sample_width
    }

    /// Bits per pixel.
    pub(crate) fn pixel_width(&self) -> u8 {
        self.color_type.channel_count() * self.bit_depth
    }

    /// Packed bytes in one row of `width` pixels, without the filter byte.
    pub(crate) fn row_bytes(&self, width: u32) -> usize {
        (width as usize * self.pixel_width() as usize).div_ceil(8)
    }
}
impl<'a> ParseableChunk<'a> for IHDRChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"IHDR";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (
            rest,
            (width, height, bit_depth, color_type, compression_method, filter_method, interlace),
        ) = tuple((
            be_u32,
            be_u32,
            be_u8,
            map_res(be_u8, ColorType::try_from),
            be_u8,
            be_u8,
            map_res(be_u8, Interlacing::try_from),
        ))(chunk_data)?;
        Ok((
            rest,
            IHDRChunk {
                width,
                height,
                bit_depth,
                color_type,
                compression_method,
                filter_method,
                interlace_method: interlace,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(13);
        data.extend(self.width.to_be_bytes());
        data.extend(self.height.to_be_bytes());
        data.extend([
            self.bit_depth,
            self.color_type as u8,
            self.compression_method,
            self.filter_method,
            self.interlace_method as u8,
        ]);
        serialize(Self::HEADER, &data)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    #[default]
    Greyscale = 0,
    Truecolor = 2,
    IndexedColor = 3,
    GreyscaleWithAlpha = 4,
    TruecolorWithAlpha = 6,
}
impl TryFrom<u8> for ColorType {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Greyscale),
            2 => Ok(Self::Truecolor),
            3 => Ok(Self::IndexedColor),
            4 => Ok(Self::GreyscaleWithAlpha),
            6 => Ok(Self::TruecolorWithAlpha),
            i => Err(Error::malformed(format!("unknown color type {i}"))),
        }
    }
}
impl ColorType {
    pub(crate) fn channel_count(&self) -> u8 {
        match self {
            Self::Greyscale => 1,
            Self::IndexedColor => 1,
            Self::GreyscaleWithAlpha => 2,
            Self::Truecolor => 3,
            Self::TruecolorWithAlpha => 4,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Interlacing {
    #[default]
    None,
    Adam7,
}
impl TryFrom<u8> for Interlacing {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Adam7),
            i => Err(Error::malformed(format!("unknown interlace method {i}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_survives_serialization() {
        let header = IHDRChunk::new(640, 480, ColorType::IndexedColor);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 25);
        assert_eq!(&bytes[4..8], b"IHDR");
        let (rest, parsed) = IHDRChunk::from_bytes(&bytes[8..21]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, header);
    }

    #[test]
    fn unknown_color_types_fail_to_parse() {
        let data = [0, 0, 0, 1, 0, 0, 0, 1, 8, 5, 0, 0, 0];
        assert!(IHDRChunk::from_bytes(&data).is_err());
    }

    #[test]
    fn row_sizes_follow_bit_depth() {
        let mut header = IHDRChunk::new(10, 1, ColorType::Greyscale);
        header.bit_depth = 1;
        assert_eq!(header.row_bytes(10), 2);
        assert_eq!(header.filter_width(), 1);

        let mut header = IHDRChunk::new(10, 1, ColorType::TruecolorWithAlpha);
        header.bit_depth = 16;
        assert_eq!(header.row_bytes(10), 80);
        assert_eq!(header.filter_width(), 8);
    }

    #[test]
    fn validation_rejects_bad_depths_and_sizes() {
        let mut header = IHDRChunk::new(1, 1, ColorType::Truecolor);
        header.bit_depth = 4;
        assert!(header.validate().is_err());

        let header = IHDRChunk::new(0, 1, ColorType::Truecolor);
        assert!(matches!(
            header.validate(),
            Err(Error::UnsupportedGeometry(_))
        ));
        assert!(IHDRChunk::new(3, 3, ColorType::Greyscale).validate().is_ok());
    }
}
