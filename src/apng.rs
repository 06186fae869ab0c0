use log::info;

use crate::{
    animation::AnimationSequence,
    compose::compose_sequence,
    decoder::decode_stream,
    encoder::encode_sequence,
    error::Result,
    optimize::optimize_sequence,
    writer::write_animation,
    Options,
};

/// A decoded animation: every frame composed onto the full canvas.
#[derive(Debug, Clone)]
pub struct APNG {
    sequence: AnimationSequence,
    options: Options,
}

impl APNG {
    pub fn decode(bytes: &[u8], options: &Options) -> Result<Self> {
        let stream = decode_stream(bytes, options)?;
        let sequence = compose_sequence(stream)?;
        info!(
            "decoded {}x{} animation with {} frames",
            sequence.width(),
            sequence.height(),
            sequence.displayed_frames().len()
        );
        Ok(Self {
            sequence,
            options: options.clone(),
        })
    }

    pub fn sequence(&self) -> &AnimationSequence {
        &self.sequence
    }

    pub fn into_sequence(self) -> AnimationSequence {
        self.sequence
    }

    pub fn optimize(mut self) -> Result<OptimizedAPNG> {
        optimize_sequence(&mut self.sequence)?;
        Ok(OptimizedAPNG {
            sequence: self.sequence,
            options: self.options,
        })
    }
}

/// An animation whose frames went through the optimization passes and are
/// ready to be encoded.
#[derive(Debug, Clone)]
pub struct OptimizedAPNG {
    sequence: AnimationSequence,
    options: Options,
}

impl OptimizedAPNG {
    pub fn sequence(&self) -> &AnimationSequence {
        &self.sequence
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let encoded = encode_sequence(&self.sequence, self.options.target.capabilities())?;
        write_animation(encoded, self.options.keep_metadata)
    }
}

/// Decodes, optimizes and re-encodes an APNG in one go.
pub fn optimize(bytes: &[u8], options: &Options) -> Result<Vec<u8>> {
    APNG::decode(bytes, options)?.optimize()?.encode()
}
