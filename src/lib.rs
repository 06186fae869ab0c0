mod animation;
mod apng;
pub mod chunks;
mod color;
mod compose;
mod crc;
pub mod decoder;
mod disassemble;
mod encoder;
mod error;
mod filters;
mod frame;
mod image_data;
mod interlacing;
mod optimize;
mod options;
mod pixel;
mod scanlines;
pub mod writer;

pub use animation::AnimationSequence;
pub use apng::{optimize, OptimizedAPNG, APNG};
pub use color::{ColorModel, Palette};
pub use compose::{compose_sequence, Compositor};
pub use decoder::{decode_stream, AncillaryChunk, DecodedStream};
pub use disassemble::{disassemble, DisassembledFrame, Disassembly};
pub use encoder::{encode_sequence, EncodeCandidate, EncodedAnimation, EncodedFrame};
pub use error::{Error, Result};
pub use frame::{BlendOp, Delay, DisposeOp, Frame, FrameControl, RawFrame, Rect, MAX_DIMENSION};
pub use optimize::optimize_sequence;
pub use options::{Capabilities, Options, Target};
pub use pixel::Pixel;
