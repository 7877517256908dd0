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

use crate::recipient::{AudioPacket, Recipient};

use super::Sink;

/// Restricts a wrapped sink to recipients matching a predicate.
///
/// Recipients failing the predicate are silently skipped, never retried.
pub struct FilteredSink<S> {
    inner: S,
    filter: Box<dyn FnMut(&dyn Recipient) -> bool + Send>,
}

impl<S: Sink> FilteredSink<S> {
    /// Creates a filter in front of the given sink.
    pub fn new(inner: S, filter: impl FnMut(&dyn Recipient) -> bool + Send + 'static) -> Self {
        Self {
            inner,
            filter: Box::new(filter),
        }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sink> Sink for FilteredSink<S> {
    fn deliver(&mut self, recipient: &Arc<dyn Recipient>, packet: &AudioPacket<'_>) -> bool {
        if !(self.filter)(recipient.as_ref()) {
            return false;
        }
        self.inner.deliver(recipient, packet)
    }
}
