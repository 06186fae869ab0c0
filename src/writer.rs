use log::debug;
use miniz_oxide::deflate::core::CompressionStrategy;

use crate::{
    chunks::{
        actl::acTLChunk,
        fctl::fcTLChunk,
        fdat::fdATChunk,
        idat::IDATChunk,
        iend::IENDChunk,
        ihdr::{ColorType, IHDRChunk},
        plte::{Entry, PLTEChunk},
        trns::tRNSChunk,
        serialize, ParseableChunk, SIGNATURE,
    },
    encoder::EncodedAnimation,
    error::{Error, Result},
    filters::filter_adaptive,
    frame::{Frame, FrameControl},
    image_data::compress_data,
};

/// Largest IDAT or fdAT payload written.
pub const MAX_IMAGE_CHUNK: usize = 32768;

/// Assembles a PNG stream chunk by chunk. fcTL and fdAT chunks share one
/// sequence counter.
pub struct ChunkWriter {
    out: Vec<u8>,
    next_sequence: u32,
}
impl ChunkWriter {
    pub fn new() -> Self {
        Self {
            out: SIGNATURE.to_vec(),
            next_sequence: 0,
        }
    }

    pub(crate) fn write<'a, C: ParseableChunk<'a>>(&mut self, chunk: &C) {
        self.out.extend_from_slice(chunk.to_bytes().as_ref());
    }

    /// Appends a chunk of any type, computing its length and CRC.
    pub fn write_chunk(&mut self, chunk_type: &[u8; 4], data: &[u8]) {
        self.out.extend_from_slice(&serialize(chunk_type, data));
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence_number = self.next_sequence;
        self.next_sequence += 1;
        sequence_number
    }

    pub fn write_frame_control(&mut self, control: &FrameControl) {
        let sequence_number = self.next_sequence();
        self.write(&fcTLChunk::from_control(sequence_number, control));
    }

    /// Writes one zlib stream as IDAT chunks, or as fdAT chunks when
    /// `as_idat` is false.
    pub fn write_image_data(&mut self, data: &[u8], as_idat: bool) {
        for part in data.chunks(MAX_IMAGE_CHUNK) {
            if as_idat {
                self.write(&IDATChunk { data: part });
            } else {
                let sequence_number = self.next_sequence();
                self.write(&fdATChunk {
                    sequence_number,
                    data: part,
                });
            }
        }
    }

    /// Appends IEND and hands back the stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.write(&IENDChunk);
        self.out
    }
}
impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowers the window size in a zlib header to the smallest one covering
/// `raw_size` bytes and recomputes the header check bits.
pub(crate) fn shrink_zlib_window(data: &mut [u8], raw_size: usize) {
    if data.len() < 2 {
        return;
    }
    let cmf = data[0];
    if cmf & 0x0f != 8 || cmf & 0xf0 > 0x70 {
        return;
    }
    let mut cinfo = cmf >> 4;
    let mut half_window = 1usize << (cinfo + 7);
    while raw_size <= half_window && half_window >= 256 {
        cinfo -= 1;
        half_window >>= 1;
    }
    let cmf = (cmf & 0x0f) | (cinfo << 4);
    if data[0] != cmf {
        data[0] = cmf;
        let flags = data[1] & 0xe0;
        let check = 0x1f - ((cmf as u16) << 8 | flags as u16) % 0x1f;
        data[1] = flags + check as u8;
    }
}

/// Serializes an encoded animation. With `keep_metadata`, ancillary chunks
/// that don't depend on the color type are copied after acTL.
pub fn write_animation(animation: EncodedAnimation, keep_metadata: bool) -> Result<Vec<u8>> {
    let EncodedAnimation {
        width,
        height,
        color_model,
        loop_count,
        frames,
        ancillary,
    } = animation;
    if frames.is_empty() {
        return Err(Error::codec("nothing to write"));
    }
    let num_frames = frames.iter().filter(|f| f.control.is_some()).count() as u32;

    let header = IHDRChunk::new(width, height, color_model.color_type());
    let raw_size = (header.row_bytes(width) + 1).saturating_mul(height as usize);
    let mut writer = ChunkWriter::new();
    writer.write(&header);
    if frames.len() > 1 {
        writer.write(&acTLChunk {
            num_frames,
            num_plays: loop_count,
        });
    }
    if keep_metadata {
        for chunk in ancillary.iter().filter(|c| c.is_color_independent()) {
            debug!("keeping {} chunk", String::from_utf8_lossy(&chunk.chunk_type));
            writer.write_chunk(&chunk.chunk_type, &chunk.data);
        }
    }
    if let Some(palette) = color_model.palette() {
        let entries = palette
            .entries()
            .iter()
            .map(|p| Entry(p.red, p.green, p.blue))
            .collect();
        writer.write(&PLTEChunk::new(entries));
    }
    if let Some(transparency) = color_model.transparency_bytes() {
        writer.write(&tRNSChunk::new(&transparency));
    }

    for (i, mut frame) in frames.into_iter().enumerate() {
        if let Some(control) = &frame.control {
            writer.write_frame_control(control);
        }
        shrink_zlib_window(&mut frame.data, raw_size);
        writer.write_image_data(&frame.data, i == 0);
    }
    Ok(writer.finish())
}

/// Encodes a single RGBA8 frame as a still PNG.
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>> {
    if frame.bytes_per_pixel() != 4 {
        return Err(Error::codec(format!(
            "expected an RGBA frame, got {} bytes per pixel",
            frame.bytes_per_pixel()
        )));
    }
    let mut rows = Vec::new();
    rows.try_reserve_exact((frame.stride() + 1) * frame.height() as usize)?;
    let mut row_buffer = Vec::new();
    filter_adaptive(frame.rect_rows(frame.bounds()), 4, &mut rows, &mut row_buffer);
    let mut data = Vec::new();
    compress_data(&rows, 9, CompressionStrategy::Filtered, &mut data)?;
    shrink_zlib_window(&mut data, rows.len());

    let mut writer = ChunkWriter::new();
    writer.write(&IHDRChunk::new(
        frame.width(),
        frame.height(),
        ColorType::TruecolorWithAlpha,
    ));
    writer.write_image_data(&data, true);
    Ok(writer.finish())
}
