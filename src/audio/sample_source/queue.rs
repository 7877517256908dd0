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
use std::collections::VecDeque;

use crate::audio::format::AudioFormat;

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// Plays a sequence of format-matching sources back to back.
///
/// A single read spans source boundaries: when the current source runs
/// short, the queue advances and keeps filling the same call, so
/// concatenation is gapless.
pub struct SourceQueue {
    queue: VecDeque<Box<dyn SampleSource>>,
    current: Option<Box<dyn SampleSource>>,
    format: AudioFormat,
}

impl SourceQueue {
    /// Creates an empty queue accepting canonical-format sources.
    pub fn new() -> Self {
        Self::with_format(AudioFormat::CANONICAL)
    }

    /// Creates an empty queue accepting sources of the given format.
    pub fn with_format(format: AudioFormat) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            format,
        }
    }

    /// Queues a source to be read after all previously queued sources.
    pub fn enqueue(&mut self, source: Box<dyn SampleSource>) -> Result<(), SampleSourceError> {
        let format = source.format();
        if format != self.format {
            return Err(SampleSourceError::FormatMismatch {
                expected: self.format,
                actual: format,
            });
        }
        self.queue.push_back(source);
        Ok(())
    }

    /// Drops the current source and dequeues the next one.
    /// Returns false if the queue was already empty.
    pub fn advance(&mut self) -> bool {
        self.current = self.queue.pop_front();
        self.current.is_some()
    }

    /// Drops all queued sources. The current source keeps playing.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// The number of sources waiting behind the current one.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no sources are waiting behind the current one.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for SourceQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SourceQueue {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        if self.current.is_none() && !self.advance() {
            return Ok(0);
        }
        let mut total = 0;
        while total < buf.len() {
            let target = buf.len() - total;
            let read = match self.current.as_mut() {
                Some(current) => current.read(&mut buf[total..])?,
                None => 0,
            };
            total += read;
            if read < target && !self.advance() {
                break;
            }
        }
        Ok(total)
    }
}
