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
// Ring-buffer read-ahead wrapper. Decouples cheap, deterministic per-tick
// reads from a potentially expensive inner source (e.g. decode-on-read).
//
use crate::audio::format::{AudioFormat, PACKET_SAMPLES};
use crate::audio::ring_buffer::PlaybackBuffer;

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// Prefetches an inner source into a ring buffer and serves reads from it.
///
/// Each read first tops the buffer up to the configured look-ahead, pulling
/// the inner source one packet at a time, then drains from the buffer.
/// [`clear_readahead`](SampleSource::clear_readahead) drops the buffered
/// content without touching the inner source's position. The buffer is
/// released when the wrapper is dropped.
pub struct BufferedSource {
    inner: Box<dyn SampleSource>,
    buffer: PlaybackBuffer,
    lookahead: usize,
    scratch: Box<[f32; PACKET_SAMPLES]>,
}

impl BufferedSource {
    /// Creates a wrapper that keeps `lookahead_samples` of audio prefetched.
    pub fn new(inner: Box<dyn SampleSource>, lookahead_samples: usize) -> Self {
        Self {
            inner,
            // One packet of headroom so a prefetch chunk never truncates.
            buffer: PlaybackBuffer::new(lookahead_samples + PACKET_SAMPLES, false),
            lookahead: lookahead_samples,
            scratch: Box::new([0.0; PACKET_SAMPLES]),
        }
    }

    /// Creates a wrapper with the look-ahead expressed in seconds of audio.
    pub fn with_seconds(inner: Box<dyn SampleSource>, seconds: f64) -> Self {
        let lookahead = inner.format().sample_count(seconds);
        Self::new(inner, lookahead)
    }

    /// The number of samples currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drops the buffered content without affecting the inner source.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl SampleSource for BufferedSource {
    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        while self.buffer.len() < self.lookahead {
            let read = self.inner.read(&mut self.scratch[..])?;
            if read == 0 {
                break;
            }
            self.buffer.write(&self.scratch[..read]);
        }
        Ok(self.buffer.read_to(buf))
    }

    fn clear_readahead(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sample_source::raw::RawSource;

    #[test]
    fn test_serves_from_prefetch() {
        let samples: Vec<f32> = (0..2000).map(|i| i as f32 / 2000.0).collect();
        let mut buffered = BufferedSource::new(Box::new(RawSource::new(samples.clone())), 960);
        let mut buf = [0.0; 480];
        assert_eq!(buffered.read(&mut buf).unwrap(), 480);
        assert_eq!(buf[0], samples[0]);
        assert_eq!(buf[479], samples[479]);
        assert!(buffered.buffered_len() >= 480);
    }

    #[test]
    fn test_clear_drops_buffered_content_only() {
        let samples: Vec<f32> = (0..2000).map(|i| i as f32).collect();
        let mut buffered = BufferedSource::new(Box::new(RawSource::new(samples)), 960);
        let mut buf = [0.0; 100];
        buffered.read(&mut buf).unwrap();
        buffered.clear_readahead();
        assert_eq!(buffered.buffered_len(), 0);
        // The inner cursor is unaffected: the next read resumes where the
        // prefetch left off, not where the consumer left off.
        assert_eq!(buffered.read(&mut buf).unwrap(), 100);
        assert!(buf[0] > 100.0);
    }

    #[test]
    fn test_exhaustion_reaches_consumer() {
        let mut buffered = BufferedSource::new(Box::new(RawSource::new(vec![0.5; 300])), 960);
        let mut buf = [0.0; 480];
        assert_eq!(buffered.read(&mut buf).unwrap(), 300);
        assert_eq!(buffered.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_with_seconds() {
        let buffered =
            BufferedSource::with_seconds(Box::new(RawSource::new(vec![0.0; 48000])), 0.02);
        assert_eq!(buffered.lookahead, 960);
    }
}
