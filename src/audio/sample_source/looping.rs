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

use super::error::SampleSourceError;
use super::traits::{RewindableSource, SampleSource};

/// Restarts a finite source at the beginning whenever it runs out, so a
/// read always returns exactly the requested number of samples.
///
/// Two consecutive empty reads across a rewind terminate the fill, so an
/// empty inner source cannot spin the loop.
pub struct LoopingSource<S: RewindableSource> {
    inner: S,
}

impl<S: RewindableSource> LoopingSource<S> {
    /// Creates a looping wrapper around the given source.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The wrapped source, mutably.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwraps the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RewindableSource> SampleSource for LoopingSource<S> {
    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        let mut total = 0;
        let mut starved = false;
        while total < buf.len() {
            let read = self.inner.read(&mut buf[total..])?;
            total += read;
            if total == buf.len() {
                break;
            }
            if read == 0 {
                if starved {
                    break;
                }
                starved = true;
            } else {
                starved = false;
            }
            self.inner.rewind();
        }
        Ok(total)
    }
}
