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

//! File-type decoder registration and short-clip caching.
//!
//! Both are plain constructible objects injected where needed, not
//! process-wide globals, so hosts can scope backends and cached clips as
//! they see fit.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::audio::format::{AudioFormat, PACKET_SAMPLES};
use crate::audio::sample_source::{to_canonical, FileSource, RawSource, SampleSource, SampleSourceError};

/// Creates sample sources from files of one registered type.
pub trait DecoderBackend: Send + Sync {
    /// Opens the file as a sample source in its native format.
    fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, SampleSourceError>;
}

/// The symphonia-backed default backend.
pub struct SymphoniaBackend;

impl DecoderBackend for SymphoniaBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, SampleSourceError> {
        Ok(Box::new(FileSource::from_file(path)?))
    }
}

/// Maps file extensions to decoder backends. Extensions are matched
/// case-insensitively, with or without the leading period.
pub struct DecoderRegistry {
    backends: HashMap<String, Arc<dyn DecoderBackend>>,
}

impl DecoderRegistry {
    /// Creates a registry with no backends.
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Creates a registry with the symphonia backend registered for the
    /// common container types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let backend = Arc::new(SymphoniaBackend);
        for extension in ["wav", "wave", "aiff", "aif", "flac", "mp3", "ogg"] {
            registry.register(extension, backend.clone());
        }
        registry
    }

    /// Registers a backend for a file type, replacing any previous one.
    pub fn register(&mut self, file_type: &str, backend: Arc<dyn DecoderBackend>) {
        self.backends.insert(sanitize(file_type), backend);
    }

    /// The backend registered for the given file type, if any.
    pub fn backend_for(&self, file_type: &str) -> Option<Arc<dyn DecoderBackend>> {
        self.backends.get(&sanitize(file_type)).cloned()
    }

    /// Opens a file through the backend registered for its extension.
    pub fn open(&self, path: &Path) -> Result<Box<dyn SampleSource>, SampleSourceError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();
        let backend = self
            .backend_for(extension)
            .ok_or_else(|| SampleSourceError::UnsupportedExtension(extension.to_string()))?;
        backend.open(path)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn sanitize(file_type: &str) -> String {
    file_type.trim_start_matches('.').to_lowercase()
}

/// A cache of short, fully-decoded clips stored as canonical raw sources.
///
/// Do not cache lengthy audio; stream long files through a decode-on-read
/// source instead. Lookups hand out duplicates sharing the decoded buffer,
/// each with its own cursor. Names are case-insensitive.
pub struct ShortClipCache {
    clips: HashMap<String, RawSource>,
}

impl ShortClipCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            clips: HashMap::new(),
        }
    }

    /// Stores a canonical-format clip under the given name.
    pub fn insert(&mut self, name: &str, clip: RawSource) -> Result<(), SampleSourceError> {
        let format = clip.format();
        if !format.is_canonical() {
            return Err(SampleSourceError::FormatMismatch {
                expected: AudioFormat::CANONICAL,
                actual: format,
            });
        }
        self.clips.insert(name.to_lowercase(), clip);
        Ok(())
    }

    /// Removes a clip by name, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<RawSource> {
        self.clips.remove(&name.to_lowercase())
    }

    /// A duplicate of the named clip with a fresh cursor, if cached.
    pub fn get(&self, name: &str) -> Option<RawSource> {
        self.clips
            .get(&name.to_lowercase())
            .map(|clip| clip.duplicate(true))
    }

    /// Decodes a file through the registry, converts it to the canonical
    /// format, caches it under the file stem and returns a duplicate.
    pub fn load(
        &mut self,
        registry: &DecoderRegistry,
        path: &Path,
    ) -> Result<RawSource, SampleSourceError> {
        let mut source = to_canonical(registry.open(path)?)?;

        let mut samples = Vec::new();
        let mut chunk = [0.0f32; PACKET_SAMPLES];
        loop {
            let read = source.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            samples.extend_from_slice(&chunk[..read]);
        }

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
        debug!(clip = %name, samples = samples.len(), "cached short clip");

        let mut clip = RawSource::new(samples);
        clip.set_clip_name(&name);
        let duplicate = clip.duplicate(true);
        self.insert(&name, clip)?;
        Ok(duplicate)
    }

    /// The number of cached clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether the cache holds no clips.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Drops every cached clip.
    pub fn clear(&mut self) {
        self.clips.clear();
    }
}

impl Default for ShortClipCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(8192i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        let registry = DecoderRegistry::with_defaults();
        assert!(registry.backend_for("WAV").is_some());
        assert!(registry.backend_for(".wav").is_some());
        assert!(registry.backend_for("xyz").is_none());
    }

    #[test]
    fn test_open_unknown_extension_errors() {
        let registry = DecoderRegistry::with_defaults();
        let Err(err) = registry.open(Path::new("music.xyz")) else {
            panic!("expected open to fail for unknown extension");
        };
        assert!(matches!(err, SampleSourceError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_load_caches_canonical_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Blip.wav");
        write_test_wav(&path, 48000, 960);

        let registry = DecoderRegistry::with_defaults();
        let mut cache = ShortClipCache::new();
        let clip = cache.load(&registry, &path).unwrap();
        assert_eq!(clip.format(), AudioFormat::CANONICAL);
        assert_eq!(clip.len(), 960);
        assert_eq!(cache.len(), 1);

        // Case-insensitive lookup by file stem.
        assert!(cache.get("blip").is_some());
        assert!(cache.get("BLIP").is_some());
    }

    #[test]
    fn test_get_hands_out_independent_cursors() {
        let mut cache = ShortClipCache::new();
        cache.insert("clip", RawSource::new(vec![0.5; 100])).unwrap();

        let mut first = cache.get("clip").unwrap();
        let mut buf = [0.0; 100];
        assert_eq!(first.read(&mut buf).unwrap(), 100);

        let mut second = cache.get("clip").unwrap();
        assert_eq!(second.position(), 0);
        assert_eq!(second.read(&mut buf).unwrap(), 100);
    }

    #[test]
    fn test_insert_rejects_foreign_format() {
        use crate::audio::format::SampleFormat;
        let mut cache = ShortClipCache::new();
        let foreign = RawSource::with_format(
            vec![0.0; 4],
            AudioFormat::new(44100, 1, SampleFormat::Float),
        );
        assert!(cache.insert("bad", foreign).is_err());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = ShortClipCache::new();
        cache.insert("a", RawSource::new(vec![0.0; 4])).unwrap();
        cache.insert("b", RawSource::new(vec![0.0; 4])).unwrap();
        assert!(cache.remove("A").is_some());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
