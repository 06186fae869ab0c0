use crate::{
    chunks::ihdr::ColorType,
    error::{Error, Result},
    frame::Frame,
    pixel::Pixel,
};

/// Up to 256 RGBA entries, stored as PLTE + tRNS when written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<Pixel>);
impl Palette {
    pub const MAX_ENTRIES: usize = 256;

    pub fn new(entries: Vec<Pixel>) -> Result<Self> {
        if entries.is_empty() || entries.len() > Self::MAX_ENTRIES {
            return Err(Error::codec(format!(
                "a palette holds 1 to {} entries, got {}",
                Self::MAX_ENTRIES,
                entries.len()
            )));
        }
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[Pixel] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<Pixel> {
        self.0.get(index as usize).copied()
    }

    /// PLTE payload.
    pub fn rgb_bytes(&self) -> Vec<u8> {
        self.0
            .iter()
            .flat_map(|p| [p.red, p.green, p.blue])
            .collect()
    }

    /// tRNS payload: alphas up to the last entry that isn't opaque.
    pub fn alpha_table(&self) -> Vec<u8> {
        let len = self
            .0
            .iter()
            .rposition(|p| p.alpha != u8::MAX)
            .map_or(0, |i| i + 1);
        self.0[..len].iter().map(|p| p.alpha).collect()
    }

    /// First index whose alpha is zero.
    pub fn transparent_index(&self) -> Option<u8> {
        self.0.iter().position(|p| p.alpha == 0).map(|i| i as u8)
    }
}

/// Sample layout of the frames in a sequence. All variants are 8 bits per
/// channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColorModel {
    #[default]
    Rgba,
    GreyAlpha,
    Rgb {
        key: Option<[u8; 3]>,
    },
    Grey {
        key: Option<u8>,
    },
    Indexed(Palette),
}
impl ColorModel {
    pub fn color_type(&self) -> ColorType {
        match self {
            Self::Rgba => ColorType::TruecolorWithAlpha,
            Self::GreyAlpha => ColorType::GreyscaleWithAlpha,
            Self::Rgb { .. } => ColorType::Truecolor,
            Self::Grey { .. } => ColorType::Greyscale,
            Self::Indexed(_) => ColorType::IndexedColor,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.color_type().channel_count() as usize
    }

    pub fn has_alpha_channel(&self) -> bool {
        matches!(self, Self::Rgba | Self::GreyAlpha)
    }

    /// The sample that renders as fully transparent, if this model has one.
    pub fn transparent_sample(&self) -> Option<Vec<u8>> {
        match self {
            Self::Rgba => Some(vec![0; 4]),
            Self::GreyAlpha => Some(vec![0; 2]),
            Self::Rgb { key } => key.map(|k| k.to_vec()),
            Self::Grey { key } => key.map(|k| vec![k]),
            Self::Indexed(palette) => palette.transparent_index().map(|i| vec![i]),
        }
    }

    pub fn palette(&self) -> Option<&Palette> {
        match self {
            Self::Indexed(palette) => Some(palette),
            _ => None,
        }
    }

    /// tRNS payload for the models that carry one.
    pub fn transparency_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Rgb { key: Some([r, g, b]) } => Some(vec![0, *r, 0, *g, 0, *b]),
            Self::Grey { key: Some(k) } => Some(vec![0, *k]),
            Self::Indexed(palette) => {
                let table = palette.alpha_table();
                (!table.is_empty()).then_some(table)
            }
            _ => None,
        }
    }

    /// RGBA value a single sample renders as.
    pub fn expand(&self, sample: &[u8]) -> Pixel {
        match self {
            Self::Rgba => Pixel::from_slice(sample),
            Self::GreyAlpha => Pixel::new(sample[0], sample[0], sample[0], sample[1]),
            Self::Rgb { key } => {
                let rgb = [sample[0], sample[1], sample[2]];
                if *key == Some(rgb) {
                    Pixel::TRANSPARENT
                } else {
                    Pixel::opaque(rgb[0], rgb[1], rgb[2])
                }
            }
            Self::Grey { key } => {
                if *key == Some(sample[0]) {
                    Pixel::TRANSPARENT
                } else {
                    Pixel::opaque(sample[0], sample[0], sample[0])
                }
            }
            Self::Indexed(palette) => palette
                .get(sample[0])
                .unwrap_or(Pixel::opaque(0, 0, 0)),
        }
    }

    /// Expands a frame stored in this model back to RGBA8.
    pub fn to_rgba(&self, frame: &Frame) -> Result<Frame> {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(frame.width() as usize * frame.height() as usize * 4)?;
        for sample in frame.as_bytes().chunks_exact(frame.bytes_per_pixel()) {
            pixels.extend_from_slice(&self.expand(sample).to_bytes());
        }
        Ok(Frame::from_rgba(frame.width(), frame.height(), pixels)?.with_delay(frame.delay))
    }
}
