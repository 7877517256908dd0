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
use std::sync::Arc;
use std::time::Duration;

use crate::audio::format::AudioFormat;

use super::error::SampleSourceError;
use super::traits::{RewindableSource, SampleSource};

/// A sample source reading from a shared in-memory sample buffer.
///
/// Duplicates share the backing storage but keep independent cursors, which
/// makes cached short clips cheap to hand out repeatedly.
pub struct RawSource {
    samples: Arc<[f32]>,
    length: usize,
    position: usize,
    format: AudioFormat,
    clip_name: Option<String>,
}

impl RawSource {
    /// Creates a canonical-format source over the full sample buffer.
    pub fn new(samples: impl Into<Arc<[f32]>>) -> Self {
        let samples = samples.into();
        let length = samples.len();
        Self {
            samples,
            length,
            position: 0,
            format: AudioFormat::CANONICAL,
            clip_name: None,
        }
    }

    /// Creates a source over the full buffer with a custom format descriptor.
    pub fn with_format(samples: impl Into<Arc<[f32]>>, format: AudioFormat) -> Self {
        let mut source = Self::new(samples);
        source.format = format;
        source
    }

    /// Creates a source reading only the first `length` samples.
    pub fn with_length(
        samples: impl Into<Arc<[f32]>>,
        length: usize,
    ) -> Result<Self, SampleSourceError> {
        let samples = samples.into();
        if length > samples.len() {
            return Err(SampleSourceError::PositionOutOfRange(length, samples.len()));
        }
        Ok(Self {
            samples,
            length,
            position: 0,
            format: AudioFormat::CANONICAL,
            clip_name: None,
        })
    }

    /// The count of readable samples.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the source holds no readable samples.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The duration of the readable samples.
    pub fn total_time(&self) -> Duration {
        self.format.duration_of(self.length)
    }

    /// The current cursor position in samples.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to the given sample position.
    pub fn seek(&mut self, position: usize) -> Result<(), SampleSourceError> {
        if position > self.length {
            return Err(SampleSourceError::PositionOutOfRange(position, self.length));
        }
        self.position = position;
        Ok(())
    }

    /// The current cursor position as a duration.
    pub fn current_time(&self) -> Duration {
        self.format.duration_of(self.position)
    }

    /// Moves the cursor to the given time offset.
    pub fn seek_time(&mut self, time: Duration) -> Result<(), SampleSourceError> {
        self.seek(self.format.sample_count(time.as_secs_f64()))
    }

    /// A custom identifier for the source, used by the short clip cache.
    pub fn clip_name(&self) -> Option<&str> {
        self.clip_name.as_deref()
    }

    /// Sets the custom identifier for the source.
    pub fn set_clip_name(&mut self, name: impl Into<String>) {
        self.clip_name = Some(name.into());
    }

    /// Creates a copy sharing the same buffer with an independent cursor.
    pub fn duplicate(&self, reset_position: bool) -> RawSource {
        Self {
            samples: self.samples.clone(),
            length: self.length,
            position: if reset_position { 0 } else { self.position },
            format: self.format,
            clip_name: self.clip_name.clone(),
        }
    }
}

impl SampleSource for RawSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        let target = (self.length - self.position).min(buf.len());
        if target == 0 {
            return Ok(0);
        }
        buf[..target].copy_from_slice(&self.samples[self.position..self.position + target]);
        self.position += target;
        Ok(target)
    }
}

impl RewindableSource for RawSource {
    fn rewind(&mut self) {
        self.position = 0;
    }
}
