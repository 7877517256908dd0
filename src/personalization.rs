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

//! Per-recipient spatial-settings overrides for a single speaker entity.
//!
//! Every recipient inherits the speaker's authoritative settings unless an
//! override is stored for them. Transitions compute a field-level diff
//! between the previous and new effective settings and unicast only the
//! changed fields as a fake state update, so the authoritative value and
//! its normal replication are never touched. Reconnecting recipients are
//! not handled.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::recipient::{OutboundMessage, Recipient, RecipientId};
use crate::wire::{encode_settings_diff, SettingsDiff};

/// Spatial-audio parameters a recipient perceives for one speaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakerSettings {
    /// Whether the speaker is spatial (has 3D sound).
    pub is_spatial: bool,
    /// The volume of the speaker (range 0-1).
    pub volume: f32,
    /// Up to this distance the audio is heard at full volume.
    pub min_distance: f32,
    /// Beyond this distance the audio is inaudible.
    pub max_distance: f32,
}

impl Default for SpeakerSettings {
    fn default() -> Self {
        Self {
            is_spatial: true,
            volume: 1.0,
            min_distance: 1.0,
            max_distance: 15.0,
        }
    }
}

impl SpeakerSettings {
    /// Returns a copy with the given volume.
    pub fn with_volume(self, volume: f32) -> Self {
        Self { volume, ..self }
    }

    /// Returns a copy with the given spatial flag.
    pub fn with_spatial(self, is_spatial: bool) -> Self {
        Self { is_spatial, ..self }
    }

    /// Returns a copy with the given minimum distance.
    pub fn with_min_distance(self, min_distance: f32) -> Self {
        Self {
            min_distance,
            ..self
        }
    }

    /// Returns a copy with the given maximum distance.
    pub fn with_max_distance(self, max_distance: f32) -> Self {
        Self {
            max_distance,
            ..self
        }
    }

    /// Computes the per-field diff from `previous` to `next`. Booleans
    /// compare exactly, floats with a small relative tolerance.
    pub(crate) fn diff(previous: &Self, next: &Self) -> SettingsDiff {
        SettingsDiff {
            is_spatial: (previous.is_spatial != next.is_spatial).then_some(next.is_spatial),
            volume: (!approximately(previous.volume, next.volume)).then_some(next.volume),
            min_distance: (!approximately(previous.min_distance, next.min_distance))
                .then_some(next.min_distance),
            max_distance: (!approximately(previous.max_distance, next.max_distance))
                .then_some(next.max_distance),
        }
    }
}

/// Approximate float equality with a tolerance relative to the magnitudes.
fn approximately(a: f32, b: f32) -> bool {
    (b - a).abs() < (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}

/// Network identity of the speaker entity a stream drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakerIdentity {
    /// The networked entity carrying the speaker component.
    pub entity_id: u64,
    /// Position of the speaker component in the entity's component list.
    pub component_index: usize,
}

struct OverrideEntry {
    recipient: Arc<dyn Recipient>,
    settings: SpeakerSettings,
}

/// The per-recipient override table and its diff-unicast logic.
pub struct Personalization {
    identity: SpeakerIdentity,
    defaults: SpeakerSettings,
    overrides: HashMap<RecipientId, OverrideEntry>,
}

/// A personalization store shared between host code and a personalized
/// sink. The lock is uncontended under the single-threaded tick model; it
/// exists for shared ownership.
pub type SharedPersonalization = Arc<Mutex<Personalization>>;

impl Personalization {
    /// Creates an empty override table for the given speaker.
    pub fn new(identity: SpeakerIdentity, defaults: SpeakerSettings) -> Self {
        Self {
            identity,
            defaults,
            overrides: HashMap::new(),
        }
    }

    /// Wraps a store for sharing with a personalized sink.
    pub fn into_shared(self) -> SharedPersonalization {
        Arc::new(Mutex::new(self))
    }

    /// The speaker identity this store addresses on the wire.
    pub fn identity(&self) -> SpeakerIdentity {
        self.identity
    }

    /// The authoritative settings recipients inherit without an override.
    pub fn defaults(&self) -> SpeakerSettings {
        self.defaults
    }

    /// The stored override for the given recipient, if any.
    pub fn get(&self, recipient: RecipientId) -> Option<SpeakerSettings> {
        self.overrides.get(&recipient).map(|entry| entry.settings)
    }

    /// The number of recipients with an override.
    pub fn overridden_count(&self) -> usize {
        self.overrides.len()
    }

    /// Overrides the settings the given recipient perceives.
    pub fn override_settings(&mut self, recipient: &Arc<dyn Recipient>, settings: SpeakerSettings) {
        self.sync(recipient, Some(settings));
    }

    /// Transforms the recipient's current override. The transform receives
    /// `None` if no override is stored; returning `None` clears it.
    pub fn modify<F>(&mut self, recipient: &Arc<dyn Recipient>, transform: F)
    where
        F: FnOnce(Option<SpeakerSettings>) -> Option<SpeakerSettings>,
    {
        let next = transform(self.get(recipient.id()));
        self.sync(recipient, next);
    }

    /// Removes the recipient's override, restoring the default settings.
    pub fn clear_override(&mut self, recipient: &Arc<dyn Recipient>) {
        self.sync(recipient, None);
    }

    /// Replaces the authoritative default settings.
    ///
    /// Every connected recipient holding an override is resynced: the
    /// fields of their override that differ from the previous defaults are
    /// re-sent, countering the authoritative change they are about to
    /// receive through normal replication.
    pub fn set_defaults(&mut self, defaults: SpeakerSettings) {
        if self.defaults == defaults {
            return;
        }
        let previous = std::mem::replace(&mut self.defaults, defaults);
        for entry in self.overrides.values() {
            if !entry.recipient.is_connected() {
                continue;
            }
            Self::send_diff(self.identity, &entry.recipient, &previous, &entry.settings);
        }
    }

    /// Drops every override without sending anything.
    pub fn clear(&mut self) {
        self.overrides.clear();
    }

    fn sync(&mut self, recipient: &Arc<dyn Recipient>, next: Option<SpeakerSettings>) {
        let previous_effective = self.get(recipient.id()).unwrap_or(self.defaults);
        let next_effective = next.unwrap_or(self.defaults);
        if SpeakerSettings::diff(&previous_effective, &next_effective).is_empty() {
            // Nothing changed: no message, no redundant store write.
            return;
        }
        match next {
            Some(settings) => {
                self.overrides.insert(
                    recipient.id(),
                    OverrideEntry {
                        recipient: recipient.clone(),
                        settings,
                    },
                );
            }
            None => {
                self.overrides.remove(&recipient.id());
            }
        }
        Self::send_diff(
            self.identity,
            recipient,
            &previous_effective,
            &next_effective,
        );
    }

    fn send_diff(
        identity: SpeakerIdentity,
        recipient: &Arc<dyn Recipient>,
        previous: &SpeakerSettings,
        current: &SpeakerSettings,
    ) {
        let diff = SpeakerSettings::diff(previous, current);
        if diff.is_empty() {
            return;
        }
        let payload = encode_settings_diff(identity.component_index, &diff);
        let delivered = recipient.send(&OutboundMessage::EntityState {
            entity_id: identity.entity_id,
            payload: &payload,
        });
        if !delivered {
            trace!(recipient = recipient.id(), "settings diff was not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{recorded_entity_states, MockRecipient};

    fn store() -> Personalization {
        Personalization::new(
            SpeakerIdentity {
                entity_id: 77,
                component_index: 0,
            },
            SpeakerSettings::default(),
        )
    }

    #[test]
    fn test_override_stores_and_unicasts() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        let recipient = mock.as_recipient();
        store.override_settings(&recipient, SpeakerSettings::default().with_volume(0.0));

        assert_eq!(
            store.get(1),
            Some(SpeakerSettings::default().with_volume(0.0))
        );
        let sent = recorded_entity_states(&mock);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 77);
    }

    #[test]
    fn test_identical_override_is_complete_noop() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        let recipient = mock.as_recipient();
        store.override_settings(&recipient, SpeakerSettings::default());

        assert_eq!(store.get(1), None);
        assert_eq!(store.overridden_count(), 0);
        assert!(recorded_entity_states(&mock).is_empty());
    }

    #[test]
    fn test_diff_minimality() {
        let previous = SpeakerSettings {
            is_spatial: true,
            volume: 1.0,
            min_distance: 1.0,
            max_distance: 15.0,
        };
        let next = previous.with_volume(0.0);
        let diff = SpeakerSettings::diff(&previous, &next);
        assert_eq!(diff.is_spatial, None);
        assert_eq!(diff.volume, Some(0.0));
        assert_eq!(diff.min_distance, None);
        assert_eq!(diff.max_distance, None);
    }

    #[test]
    fn test_clear_override_restores_defaults() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        let recipient = mock.as_recipient();
        store.override_settings(&recipient, SpeakerSettings::default().with_volume(0.25));
        store.clear_override(&recipient);

        assert_eq!(store.get(1), None);
        // One message for the override, one restoring the default volume.
        assert_eq!(recorded_entity_states(&mock).len(), 2);
    }

    #[test]
    fn test_clear_override_without_override_is_noop() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        store.clear_override(&mock.as_recipient());
        assert!(recorded_entity_states(&mock).is_empty());
    }

    #[test]
    fn test_modify_transform() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        let recipient = mock.as_recipient();
        store.modify(&recipient, |current| {
            assert!(current.is_none());
            Some(SpeakerSettings::default().with_max_distance(50.0))
        });
        assert_eq!(store.get(1).map(|s| s.max_distance), Some(50.0));
        store.modify(&recipient, |current| {
            assert!(current.is_some());
            None
        });
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn test_set_defaults_resyncs_overridden_recipients() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        store.override_settings(&mock.as_recipient(), SpeakerSettings::default().with_volume(0.0));
        let before = recorded_entity_states(&mock).len();

        store.set_defaults(SpeakerSettings::default().with_volume(0.5));
        assert_eq!(recorded_entity_states(&mock).len(), before + 1);
    }

    #[test]
    fn test_set_defaults_skips_disconnected() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        store.override_settings(&mock.as_recipient(), SpeakerSettings::default().with_volume(0.0));
        let before = recorded_entity_states(&mock).len();

        mock.disconnect();
        store.set_defaults(SpeakerSettings::default().with_volume(0.5));
        assert_eq!(recorded_entity_states(&mock).len(), before);
    }

    #[test]
    fn test_clear_drops_table_silently() {
        let mut store = store();
        let mock = MockRecipient::new(1);
        store.override_settings(&mock.as_recipient(), SpeakerSettings::default().with_volume(0.0));
        let before = recorded_entity_states(&mock).len();

        store.clear();
        assert_eq!(store.overridden_count(), 0);
        assert_eq!(recorded_entity_states(&mock).len(), before);
    }
}
