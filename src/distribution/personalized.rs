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

use crate::personalization::{SharedPersonalization, SpeakerSettings};
use crate::recipient::{AudioPacket, Recipient};

use super::Sink;

/// Per-recipient settings transform evaluated on every delivery. Receives
/// the recipient and their current override (`None` if the defaults
/// apply); returning `None` clears the override.
pub type SettingsTransform =
    Box<dyn FnMut(&dyn Recipient, Option<SpeakerSettings>) -> Option<SpeakerSettings> + Send>;

/// Decorates any sink with a per-recipient personalization pass.
///
/// After the wrapped sink reports a successful delivery, the recipient's
/// override is recomputed through the transform; the store unicasts any
/// resulting diff. Deliveries the wrapped sink skipped or failed are not
/// personalized.
pub struct PersonalizedSink<S> {
    inner: S,
    store: SharedPersonalization,
    transform: SettingsTransform,
}

impl<S: Sink> PersonalizedSink<S> {
    /// Wraps a sink, personalizing through the given shared store.
    pub fn new(
        inner: S,
        store: SharedPersonalization,
        transform: impl FnMut(&dyn Recipient, Option<SpeakerSettings>) -> Option<SpeakerSettings>
            + Send
            + 'static,
    ) -> Self {
        Self {
            inner,
            store,
            transform: Box::new(transform),
        }
    }

    /// The shared personalization store.
    pub fn store(&self) -> &SharedPersonalization {
        &self.store
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Sink> Sink for PersonalizedSink<S> {
    fn deliver(&mut self, recipient: &Arc<dyn Recipient>, packet: &AudioPacket<'_>) -> bool {
        if !self.inner.deliver(recipient, packet) {
            return false;
        }
        let transform = &mut self.transform;
        self.store
            .lock()
            .modify(recipient, |current| transform(recipient.as_ref(), current));
        true
    }
}
