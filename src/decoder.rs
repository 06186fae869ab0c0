use std::marker::PhantomData;

use log::{debug, warn};
use nom::{bytes::complete::tag, IResult};

use crate::{
    chunks::{
        actl::acTLChunk, ihdr::IHDRChunk, iter_chunks, plte::PLTEChunk, trns::tRNSChunk, Chunk,
        SIGNATURE,
    },
    error::{Error, Result},
    frame::{FrameControl, RawFrame},
    image_data::decode_image,
    options::Options,
};

pub struct PNGDecoder<'a, State>(&'a [u8], PhantomData<State>);

pub struct Start;
pub struct Chunks;

impl<'a> PNGDecoder<'a, Start> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let (rest, _) = parse_signature(data)
            .map_err(|_| Error::malformed("input doesn't start with the PNG signature"))?;
        Ok(Self(rest, PhantomData))
    }

    pub fn parse_ihdr(self, options: &Options) -> Result<(PNGDecoder<'a, Chunks>, IHDRChunk)> {
        let mut chunks = iter_chunks(self.0).strict_crc(options.strict_crc);
        let header = match chunks.next() {
            Some(Ok(Chunk::IHDR(header))) => header,
            Some(Err(e)) => return Err(e),
            _ => return Err(Error::malformed("IHDR must be the first chunk")),
        };
        header.validate()?;
        debug!(
            "{}x{} image, {:?} at {} bits, {:?}",
            header.width, header.height, header.color_type, header.bit_depth, header.interlace_method
        );
        Ok((PNGDecoder(chunks.remaining(), PhantomData), header))
    }
}

impl<'a> PNGDecoder<'a, Chunks> {
    /// Reads every remaining chunk and decodes the sub-images they describe.
    pub fn read_frames(self, header: IHDRChunk, options: &Options) -> Result<DecodedStream> {
        let mut state = StreamState::new(&header);
        let mut ended = false;
        for chunk in iter_chunks(self.0).strict_crc(options.strict_crc) {
            match chunk? {
                Chunk::IHDR(_) => return Err(Error::malformed("second IHDR chunk")),
                Chunk::PLTE(plte) => {
                    if state.seen_idat {
                        warn!("PLTE after image data ignored");
                    } else {
                        state.palette = Some(plte);
                    }
                }
                Chunk::tRNS(trns) => {
                    if state.seen_idat {
                        warn!("tRNS after image data ignored");
                    } else {
                        state.transparency = Some(trns);
                    }
                }
                Chunk::acTL(actl) => {
                    if state.seen_idat || state.animation.is_some() {
                        warn!("acTL after image data or repeated, ignored");
                    } else {
                        debug!("{} frames, {} plays", actl.num_frames, actl.num_plays);
                        state.animation = Some(actl);
                    }
                }
                Chunk::fcTL(fctl) => {
                    if state.animation.is_none() {
                        warn!("fcTL without acTL ignored");
                        continue;
                    }
                    state.check_sequence(fctl.sequence_number);
                    let control = fctl.control()?;
                    control.rect.validate(header.width, header.height)?;
                    state.finish_frame()?;
                    if !state.seen_idat {
                        state.first_frame_is_default_image = false;
                    }
                    state.pending = Some(PendingFrame::new(control, true));
                }
                Chunk::IDAT(idat) => {
                    if !state.seen_idat {
                        state.seen_idat = true;
                        if state.pending.is_none() {
                            state.pending = Some(PendingFrame::new(
                                FrameControl::full_canvas(header.width, header.height),
                                false,
                            ));
                        }
                    }
                    match state.pending.as_mut() {
                        Some(pending) if !state.finished_idat => pending.extend(idat.data)?,
                        _ => warn!("IDAT chunk out of sequence ignored"),
                    }
                }
                Chunk::fdAT(fdat) => {
                    if state.animation.is_none() {
                        warn!("fdAT without acTL ignored");
                        continue;
                    }
                    state.check_sequence(fdat.sequence_number);
                    // Only frames announced by an fcTL after the IDAT run take fdAT data.
                    match state.pending.as_mut() {
                        Some(pending) if pending.from_fctl && state.finished_idat => {
                            pending.extend(fdat.data)?
                        }
                        _ => return Err(Error::malformed("fdAT without a preceding fcTL")),
                    }
                }
                Chunk::IEND => {
                    ended = true;
                    break;
                }
                Chunk::Unknown(raw) => {
                    if raw.is_critical() {
                        return Err(Error::malformed(format!(
                            "unknown critical chunk {}",
                            raw.name()
                        )));
                    }
                    if state.seen_idat {
                        debug!("dropping {} chunk after image data", raw.name());
                    } else {
                        state.ancillary.push(AncillaryChunk {
                            chunk_type: *raw.chunk_type,
                            data: raw.data.to_vec(),
                        });
                    }
                }
            }
        }
        if !ended {
            warn!("stream ended without IEND");
        }
        state.finish_frame()?;
        state.into_stream()
    }
}

pub fn parse_signature(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(SIGNATURE)(input)
}

/// An ancillary chunk of the default image, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncillaryChunk {
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}
impl AncillaryChunk {
    /// Chunks whose meaning survives a change of color type.
    pub fn is_color_independent(&self) -> bool {
        matches!(
            &self.chunk_type,
            b"gAMA" | b"cHRM" | b"sRGB" | b"pHYs" | b"tEXt" | b"zTXt" | b"iTXt" | b"tIME"
        )
    }
}

/// Everything a file holds, with sub-images decoded but not yet composed.
#[derive(Debug)]
pub struct DecodedStream {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<RawFrame>,
    /// The IDAT image is not part of the animation.
    pub first_frame_is_default_image: bool,
    pub loop_count: u32,
    pub ancillary: Vec<AncillaryChunk>,
}

struct PendingFrame {
    control: FrameControl,
    data: Vec<u8>,
    from_fctl: bool,
}
impl PendingFrame {
    fn new(control: FrameControl, from_fctl: bool) -> Self {
        Self {
            control,
            data: Vec::new(),
            from_fctl,
        }
    }

    fn extend(&mut self, data: &[u8]) -> Result<()> {
        self.data.try_reserve(data.len())?;
        self.data.extend_from_slice(data);
        Ok(())
    }
}

struct StreamState<'h, 'a> {
    header: &'h IHDRChunk,
    palette: Option<PLTEChunk>,
    transparency: Option<tRNSChunk<'a>>,
    animation: Option<acTLChunk>,
    seen_idat: bool,
    /// The IDAT run is over and frame data now comes from fdAT.
    finished_idat: bool,
    first_frame_is_default_image: bool,
    next_sequence: u32,
    pending: Option<PendingFrame>,
    frames: Vec<RawFrame>,
    ancillary: Vec<AncillaryChunk>,
}
impl<'h, 'a> StreamState<'h, 'a> {
    fn new(header: &'h IHDRChunk) -> Self {
        Self {
            header,
            palette: None,
            transparency: None,
            animation: None,
            seen_idat: false,
            finished_idat: false,
            first_frame_is_default_image: true,
            next_sequence: 0,
            pending: None,
            frames: Vec::new(),
            ancillary: Vec::new(),
        }
    }

    fn check_sequence(&mut self, sequence_number: u32) {
        if sequence_number != self.next_sequence {
            warn!(
                "sequence number {sequence_number}, expected {}",
                self.next_sequence
            );
        }
        self.next_sequence = sequence_number.wrapping_add(1);
    }

    /// Decodes the frame being collected, if it has any data.
    fn finish_frame(&mut self) -> Result<()> {
        if self.seen_idat {
            self.finished_idat = true;
        }
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if pending.data.is_empty() {
            return Err(Error::malformed(format!(
                "frame {} has a control chunk but no image data",
                self.frames.len()
            )));
        }
        let rect = pending.control.rect;
        let image = decode_image(
            &pending.data,
            self.header,
            rect.width,
            rect.height,
            self.palette.as_ref(),
            self.transparency.as_ref(),
        )?
        .with_delay(pending.control.delay);
        debug!(
            "frame {}: {}x{} at ({}, {})",
            self.frames.len(),
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        self.frames.push(RawFrame {
            control: pending.control,
            image,
        });
        Ok(())
    }

    fn into_stream(self) -> Result<DecodedStream> {
        if self.frames.is_empty() {
            return Err(Error::malformed("no image data"));
        }
        let mut first_frame_is_default_image =
            self.animation.is_some() && self.first_frame_is_default_image;
        if first_frame_is_default_image && self.frames.len() == 1 {
            warn!("animation has no frames besides the default image, treating it as static");
            first_frame_is_default_image = false;
        }
        if let Some(actl) = self.animation {
            let displayed = self.frames.len() - first_frame_is_default_image as usize;
            if actl.num_frames as usize != displayed {
                warn!(
                    "acTL announces {} frames, found {displayed}",
                    actl.num_frames
                );
            }
        }
        Ok(DecodedStream {
            width: self.header.width,
            height: self.header.height,
            frames: self.frames,
            first_frame_is_default_image,
            loop_count: self.animation.map_or(0, |a| a.num_plays),
            ancillary: self.ancillary,
        })
    }
}

/// Decodes `data` into raw frames.
pub fn decode_stream(data: &[u8], options: &Options) -> Result<DecodedStream> {
    let decoder = PNGDecoder::new(data)?;
    let (decoder, header) = decoder.parse_ihdr(options)?;
    decoder.read_frames(header, options)
}
