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
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::warn;

use crate::audio::format::{AudioFormat, SampleFormat};

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A decode-on-read sample source over an audio file.
///
/// Decoding happens lazily, one container packet at a time, so long files
/// never sit fully decoded in memory. Samples come out interleaved in the
/// file's native channel layout and rate; run the result through
/// [`to_canonical`](super::adapter::to_canonical) before streaming it.
/// Wrap in a [`BufferedSource`](super::buffered::BufferedSource) to keep
/// decode work off the packet cadence.
pub struct FileSource {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: AudioFormat,
    pending: Vec<f32>,
    pending_pos: usize,
    finished: bool,
}

impl FileSource {
    /// Opens an audio file, probing its container and codec.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SampleSourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SampleSourceError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                SampleSourceError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}: no audio track found", path.display()),
                ))
            })?;
        let track_id = track.id;
        let params = &track.codec_params;

        let sample_rate = params.sample_rate.ok_or_else(|| {
            SampleSourceError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: sample rate not specified", path.display()),
            ))
        })?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(1) as u16;

        let decoder = get_codecs().make(params, &DecoderOptions::default())?;

        Ok(Self {
            reader,
            decoder,
            track_id,
            // The decoder normalizes every codec to float samples.
            format: AudioFormat::new(sample_rate, channels, SampleFormat::Float),
            pending: Vec::new(),
            pending_pos: 0,
            finished: false,
        })
    }

    /// Decodes packets until samples are pending or the file ends.
    fn refill(&mut self) -> Result<(), SampleSourceError> {
        self.pending.clear();
        self.pending_pos = 0;

        while self.pending.is_empty() {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return Ok(());
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finished = true;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);
                    self.pending.extend_from_slice(samples.samples());
                }
                // A corrupt packet is skippable; move on to the next one.
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("skipping undecodable packet: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl SampleSource for FileSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        let mut total = 0;
        while total < buf.len() {
            if self.pending_pos >= self.pending.len() {
                if self.finished {
                    break;
                }
                self.refill()?;
                if self.pending.is_empty() {
                    break;
                }
            }
            let available = self.pending.len() - self.pending_pos;
            let take = available.min(buf.len() - total);
            buf[total..total + take]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + take]);
            self.pending_pos += take;
            total += take;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample(((i % 100) as i16) * 300).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_open_reports_native_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_test_wav(&path, 2, 44100, 1000);

        let source = FileSource::from_file(&path).unwrap();
        assert_eq!(source.format(), AudioFormat::new(44100, 2, SampleFormat::Float));
    }

    #[test]
    fn test_reads_all_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_test_wav(&path, 1, 48000, 480);

        let mut source = FileSource::from_file(&path).unwrap();
        let mut total = 0;
        let mut buf = [0.0; 128];
        loop {
            let read = source.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            total += read;
        }
        assert_eq!(total, 480);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(FileSource::from_file("/nonexistent/file.wav").is_err());
    }
}
