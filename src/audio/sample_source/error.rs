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
use crate::audio::format::AudioFormat;

/// Error types for sample graph operations
#[derive(Debug, thiserror::Error)]
pub enum SampleSourceError {
    #[error("source format {actual} does not match {expected}")]
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },

    #[error("resampling failed: {0}Hz -> {1}Hz")]
    ResamplingFailed(u32, u32),

    #[error("position {0} is out of range (length {1})")]
    PositionOutOfRange(usize, usize),

    #[error("no decoder backend registered for extension {0:?}")]
    UnsupportedExtension(String),

    #[error("audio decode error: {0}")]
    DecodeError(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
