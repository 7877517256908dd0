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
use crate::audio::ring_buffer::PlaybackBuffer;

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A source fed externally by pushing samples into a ring buffer.
///
/// Useful for live input: a producer writes whenever samples arrive and the
/// stream drains at its own cadence. With `read_fully` set, short reads are
/// zero-filled to the requested count, turning this into an endless source
/// that streams silence while the producer is idle.
pub struct PlaybackBufferSource {
    buffer: PlaybackBuffer,
    read_fully: bool,
}

impl PlaybackBufferSource {
    /// Creates a source holding up to `capacity` samples.
    pub fn new(capacity: usize, endless: bool) -> Self {
        Self {
            buffer: PlaybackBuffer::new(capacity, endless),
            read_fully: false,
        }
    }

    /// Creates a source with the capacity expressed in seconds of audio.
    pub fn with_seconds(seconds: f64, endless: bool) -> Self {
        Self::new(AudioFormat::CANONICAL.sample_count(seconds), endless)
    }

    /// The number of unread samples.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether there are no unread samples.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether short reads are zero-filled to the requested count.
    pub fn read_fully(&self) -> bool {
        self.read_fully
    }

    /// Sets whether short reads are zero-filled to the requested count.
    pub fn set_read_fully(&mut self, read_fully: bool) {
        self.read_fully = read_fully;
    }

    /// Appends samples, returning the number actually stored.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        self.buffer.write(samples)
    }

    /// Drops all unread samples.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl SampleSource for PlaybackBufferSource {
    fn format(&self) -> AudioFormat {
        AudioFormat::CANONICAL
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        let read = self.buffer.read_to(buf);
        if !self.read_fully {
            return Ok(read);
        }
        buf[read..].fill(0.0);
        Ok(buf.len())
    }

    fn clear_readahead(&mut self) {
        self.clear();
    }
}
