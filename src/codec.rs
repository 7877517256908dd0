// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use opus::{Application, Channels, Encoder};

use crate::audio::format::{PACKET_SAMPLES, SAMPLE_RATE};

/// The size of the reusable encode buffer. Bounds the worst-case Opus
/// payload for one 10ms mono frame at VoIP bitrates.
pub const MAX_PAYLOAD_BYTES: usize = 1024;

/// Errors produced by the voice codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("opus error: {0}")]
    Opus(#[from] opus::Error),

    #[error("expected a frame of {PACKET_SAMPLES} samples, got {0}")]
    BadFrameSize(usize),
}

/// A stateful Opus encoder bound to a single stream.
///
/// Opus carries inter-frame prediction state, so an encoder must never be
/// shared between streams. The compressed payload lands in a reusable
/// buffer owned by the encoder.
pub struct VoiceEncoder {
    encoder: Encoder,
    payload: Box<[u8; MAX_PAYLOAD_BYTES]>,
}

impl VoiceEncoder {
    /// Creates an encoder in VoIP mode at the canonical rate.
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            encoder: Encoder::new(SAMPLE_RATE, Channels::Mono, Application::Voip)?,
            payload: Box::new([0; MAX_PAYLOAD_BYTES]),
        })
    }

    /// Encodes one packet frame, returning the compressed payload.
    pub fn encode(&mut self, frame: &[f32]) -> Result<&[u8], CodecError> {
        if frame.len() != PACKET_SAMPLES {
            return Err(CodecError::BadFrameSize(frame.len()));
        }
        let written = self.encoder.encode_float(frame, &mut self.payload[..])?;
        Ok(&self.payload[..written])
    }

    /// Drops all inter-frame prediction state, as if freshly constructed.
    pub fn reset(&mut self) -> Result<(), CodecError> {
        self.encoder.reset_state()?;
        Ok(())
    }
}
