use log::warn;
use miniz_oxide::{
    deflate::core::{
        compress, create_comp_flags_from_zip_params, CompressionStrategy, CompressorOxide,
        TDEFLFlush, TDEFLStatus,
    },
    inflate::decompress_to_vec_zlib_with_limit,
};

use crate::{
    chunks::{
        ihdr::{ColorType, IHDRChunk},
        plte::PLTEChunk,
        trns::tRNSChunk,
    },
    error::{Error, Result},
    frame::Frame,
    pixel::Pixel,
    scanlines::{image_data_len, reconstruct, scanlines},
};

/// Inflates a zlib stream expected to produce at most `limit` bytes.
pub(crate) fn decompress_data(compressed_data: &[u8], limit: usize) -> Result<Vec<u8>> {
    decompress_to_vec_zlib_with_limit(compressed_data, limit).map_err(|e| {
        Error::codec(format!(
            "failed to decompress image data: {:?} after {} bytes",
            e.status,
            e.output.len()
        ))
    })
}

/// Compresses `data` into `out` as a zlib stream.
pub(crate) fn compress_data(
    data: &[u8],
    level: u8,
    strategy: CompressionStrategy,
    out: &mut Vec<u8>,
) -> Result<()> {
    let flags = create_comp_flags_from_zip_params(level as i32, 1, strategy as i32);
    let mut compressor = CompressorOxide::new(flags);
    out.clear();
    let initial = usize::max(data.len() / 2, 64);
    out.try_reserve(initial)?;
    out.resize(initial, 0);

    let mut in_pos = 0;
    let mut out_pos = 0;
    loop {
        let (status, bytes_in, bytes_out) = compress(
            &mut compressor,
            &data[in_pos..],
            &mut out[out_pos..],
            TDEFLFlush::Finish,
        );
        in_pos += bytes_in;
        out_pos += bytes_out;
        match status {
            TDEFLStatus::Done => {
                out.truncate(out_pos);
                return Ok(());
            }
            TDEFLStatus::Okay => {
                if out.len() - out_pos < 64 {
                    let grow = out.len();
                    out.try_reserve(grow)?;
                    out.resize(out.len() + grow, 0);
                }
            }
            status => {
                return Err(Error::codec(format!("compression failed with {status:?}")));
            }
        }
    }
}

/// Turns the concatenated IDAT or fdAT payloads of one image into an RGBA8
/// frame of `width` x `height`.
pub(crate) fn decode_image(
    compressed_data: &[u8],
    header: &IHDRChunk,
    width: u32,
    height: u32,
    palette: Option<&PLTEChunk>,
    transparency: Option<&tRNSChunk>,
) -> Result<Frame> {
    let expected = image_data_len(header, width, height);
    let mut data = decompress_data(compressed_data, expected)?;
    reconstruct(&mut data, header, width, height)?;

    let reader = SampleReader::new(header, palette, transparency)?;
    let mut frame = Frame::rgba(width, height)?;
    let pixels = frame.as_bytes_mut();
    for (row, indices) in scanlines(&data, header, width, height) {
        for (i, index) in indices.into_iter().enumerate() {
            let pixel = reader.pixel(row, i);
            pixels[index * 4..index * 4 + 4].copy_from_slice(&pixel.to_bytes());
        }
    }
    if reader.bad_indices.get() > 0 {
        warn!(
            "{} pixels referenced palette entries that don't exist, drawn as black",
            reader.bad_indices.get()
        );
    }
    Ok(frame)
}

/// Converts packed samples of any supported depth to RGBA8.
struct SampleReader<'a> {
    header: &'a IHDRChunk,
    palette: Option<&'a PLTEChunk>,
    grey_key: Option<u16>,
    rgb_key: Option<(u16, u16, u16)>,
    palette_alpha: Option<&'a tRNSChunk<'a>>,
    bad_indices: std::cell::Cell<usize>,
}
impl<'a> SampleReader<'a> {
    fn new(
        header: &'a IHDRChunk,
        palette: Option<&'a PLTEChunk>,
        transparency: Option<&'a tRNSChunk<'a>>,
    ) -> Result<Self> {
        if header.color_type == ColorType::IndexedColor && palette.is_none() {
            return Err(Error::malformed("indexed image without a PLTE chunk"));
        }
        let (grey_key, rgb_key, palette_alpha) = match header.color_type {
            ColorType::Greyscale => (transparency.and_then(|t| t.as_greyscale()), None, None),
            ColorType::Truecolor => (None, transparency.and_then(|t| t.as_truecolor()), None),
            ColorType::IndexedColor => (None, None, transparency),
            _ => (None, None, None),
        };
        Ok(Self {
            header,
            palette,
            grey_key,
            rgb_key,
            palette_alpha,
            bad_indices: std::cell::Cell::new(0),
        })
    }

    /// Value of sample `channel` of pixel `i`, at the image's bit depth.
    fn sample(&self, row: &[u8], i: usize, channel: usize) -> u16 {
        let depth = self.header.bit_depth as usize;
        let channels = self.header.color_type.channel_count() as usize;
        let position = i * channels + channel;
        match depth {
            16 => u16::from_be_bytes([row[position * 2], row[position * 2 + 1]]),
            8 => row[position] as u16,
            _ => {
                let bit = position * depth;
                let shift = 8 - depth - bit % 8;
                ((row[bit / 8] >> shift) & ((1 << depth) - 1)) as u16
            }
        }
    }

    /// A sample reduced to 8 bits: scaled up for low depths, high byte for 16.
    fn sample8(&self, row: &[u8], i: usize, channel: usize) -> u8 {
        let value = self.sample(row, i, channel);
        match self.header.bit_depth {
            16 => (value >> 8) as u8,
            8 => value as u8,
            depth => (value * 255 / ((1 << depth) - 1)) as u8,
        }
    }

    fn pixel(&self, row: &[u8], i: usize) -> Pixel {
        match self.header.color_type {
            ColorType::Greyscale => {
                if self.grey_key == Some(self.sample(row, i, 0)) {
                    return Pixel::TRANSPARENT;
                }
                let v = self.sample8(row, i, 0);
                Pixel::opaque(v, v, v)
            }
            ColorType::Truecolor => {
                let raw = (
                    self.sample(row, i, 0),
                    self.sample(row, i, 1),
                    self.sample(row, i, 2),
                );
                if self.rgb_key == Some(raw) {
                    return Pixel::TRANSPARENT;
                }
                Pixel::opaque(
                    self.sample8(row, i, 0),
                    self.sample8(row, i, 1),
                    self.sample8(row, i, 2),
                )
            }
            ColorType::IndexedColor => {
                let index = self.sample(row, i, 0) as u8;
                let alpha = self.palette_alpha.map_or(255, |t| t.as_palette(index));
                match self.palette.and_then(|p| p.get_color(index)) {
                    Some(entry) => Pixel::new(entry.0, entry.1, entry.2, alpha),
                    None => {
                        self.bad_indices.set(self.bad_indices.get() + 1);
                        Pixel::opaque(0, 0, 0)
                    }
                }
            }
            ColorType::GreyscaleWithAlpha => {
                let v = self.sample8(row, i, 0);
                Pixel::new(v, v, v, self.sample8(row, i, 1))
            }
            ColorType::TruecolorWithAlpha => Pixel::new(
                self.sample8(row, i, 0),
                self.sample8(row, i, 1),
                self.sample8(row, i, 2),
                self.sample8(row, i, 3),
            ),
        }
    }
}
