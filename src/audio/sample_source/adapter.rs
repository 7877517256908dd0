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
// Explicit conversion of foreign-format float sources into the canonical
// streaming format: downmix to mono first, then resample to 48000Hz. The
// graph's own combinators never perform this conversion implicitly.
//
use rubato::{
    SincFixedIn, SincInterpolationParameters, SincInterpolationType, VecResampler, WindowFunction,
};

use crate::audio::format::{AudioFormat, SampleFormat, SAMPLE_RATE};

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Converts a float source of any channel count and rate into the canonical
/// mono/48000Hz format. Returns the source unchanged if it already matches.
///
/// Non-float descriptors are rejected: integer-encoded sources must be
/// normalized by their decoder backend before entering the graph.
pub fn to_canonical(
    source: Box<dyn SampleSource>,
) -> Result<Box<dyn SampleSource>, SampleSourceError> {
    let format = source.format();
    if format.sample_format != SampleFormat::Float {
        return Err(SampleSourceError::FormatMismatch {
            expected: AudioFormat::CANONICAL,
            actual: format,
        });
    }
    let mut source = source;
    if format.channels != 1 {
        source = Box::new(MonoMixSource::new(source));
    }
    if format.sample_rate != SAMPLE_RATE {
        source = Box::new(ResamplingSource::new(source)?);
    }
    Ok(source)
}

/// Downmixes an interleaved multi-channel source to mono by channel average.
pub struct MonoMixSource {
    inner: Box<dyn SampleSource>,
    channels: usize,
    format: AudioFormat,
    scratch: Vec<f32>,
}

impl MonoMixSource {
    /// Creates a mono downmix of the given source.
    pub fn new(inner: Box<dyn SampleSource>) -> Self {
        let inner_format = inner.format();
        Self {
            channels: inner_format.channels.max(1) as usize,
            format: AudioFormat::new(inner_format.sample_rate, 1, inner_format.sample_format),
            scratch: Vec::new(),
            inner,
        }
    }
}

impl SampleSource for MonoMixSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        let wanted = buf.len() * self.channels;
        self.scratch.resize(wanted, 0.0);

        // Fill whole frames; an incomplete trailing frame at EOF is dropped.
        let mut filled = 0;
        while filled < wanted {
            let read = self.inner.read(&mut self.scratch[filled..wanted])?;
            if read == 0 {
                break;
            }
            filled += read;
        }

        let frames = filled / self.channels;
        for (frame, slot) in buf.iter_mut().enumerate().take(frames) {
            let base = frame * self.channels;
            let sum: f32 = self.scratch[base..base + self.channels].iter().sum();
            *slot = sum / self.channels as f32;
        }
        Ok(frames)
    }
}

/// Resamples a mono float source to 48000Hz with a streaming sinc resampler.
pub struct ResamplingSource {
    inner: Box<dyn SampleSource>,
    resampler: SincFixedIn<f32>,
    source_rate: u32,
    /// Single-channel input block handed to the resampler.
    input: Vec<Vec<f32>>,
    /// Resampler output scratch, reused between blocks.
    output_scratch: Vec<Vec<f32>>,
    /// Output samples ready for consumption.
    ready: Vec<f32>,
    read_pos: usize,
    finished: bool,
}

impl ResamplingSource {
    /// Creates a resampler bringing the given mono source to 48000Hz.
    pub fn new(inner: Box<dyn SampleSource>) -> Result<Self, SampleSourceError> {
        let source_rate = inner.format().sample_rate;
        let sinc_params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 128,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::BlackmanHarris2,
        };
        let resampler = SincFixedIn::<f32>::new(
            SAMPLE_RATE as f64 / source_rate as f64,
            1.0,
            sinc_params,
            INPUT_BLOCK_SIZE,
            1,
        )
        .map_err(|_e| SampleSourceError::ResamplingFailed(source_rate, SAMPLE_RATE))?;

        let output_scratch = resampler.output_buffer_allocate(true);

        Ok(Self {
            inner,
            resampler,
            source_rate,
            input: vec![Vec::with_capacity(INPUT_BLOCK_SIZE)],
            output_scratch,
            ready: Vec::new(),
            read_pos: 0,
            finished: false,
        })
    }

    fn available(&self) -> usize {
        self.ready.len().saturating_sub(self.read_pos)
    }

    /// Pulls one input block through the resampler, marking the source
    /// finished once the inner source is exhausted.
    fn fill_ready(&mut self) -> Result<(), SampleSourceError> {
        let needed = self.resampler.input_frames_next();
        self.input[0].resize(needed, 0.0);
        let mut filled = 0;
        while filled < needed {
            let read = self.inner.read(&mut self.input[0][filled..needed])?;
            if read == 0 {
                break;
            }
            filled += read;
        }

        if filled == 0 {
            self.finished = true;
            return Ok(());
        }

        let out_frames = if filled == needed {
            let (_nbr_in, nbr_out) = self
                .resampler
                .process_into_buffer(&self.input, &mut self.output_scratch, None)
                .map_err(|_e| SampleSourceError::ResamplingFailed(self.source_rate, SAMPLE_RATE))?;
            nbr_out
        } else {
            // Final short block: flush what remains and stop.
            self.input[0].truncate(filled);
            self.finished = true;
            let (_nbr_in, nbr_out) = self
                .resampler
                .process_partial_into_buffer(
                    Some(&self.input as &[Vec<f32>]),
                    &mut self.output_scratch,
                    None,
                )
                .map_err(|_e| SampleSourceError::ResamplingFailed(self.source_rate, SAMPLE_RATE))?;
            nbr_out
        };

        self.ready.extend_from_slice(&self.output_scratch[0][..out_frames]);
        Ok(())
    }
}

impl SampleSource for ResamplingSource {
    fn format(&self) -> AudioFormat {
        AudioFormat::CANONICAL
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        let mut total = 0;
        while total < buf.len() {
            while self.available() == 0 && !self.finished {
                self.fill_ready()?;
            }
            if self.available() == 0 {
                break;
            }
            let take = self.available().min(buf.len() - total);
            buf[total..total + take]
                .copy_from_slice(&self.ready[self.read_pos..self.read_pos + take]);
            self.read_pos += take;
            total += take;

            // Compact the FIFO once a fair amount has been consumed.
            if self.read_pos > 4096 {
                self.ready.drain(..self.read_pos);
                self.read_pos = 0;
            }
        }
        Ok(total)
    }
}
