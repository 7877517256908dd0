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

use crate::recipient::{AudioPacket, OutboundMessage, Recipient, RecipientRoster};

use super::Sink;

/// Redirects the whole-group broadcast into a single targeted delivery.
///
/// Prefer [`FilteredSink`](super::FilteredSink) when the same output may go
/// to more than one recipient. Once the target disconnects, the sink
/// latches into a permanent no-op and never revalidates.
pub struct SpecificSink {
    target: Arc<dyn Recipient>,
    latched: bool,
}

impl SpecificSink {
    /// Creates a sink targeting the given recipient.
    pub fn new(target: Arc<dyn Recipient>) -> Self {
        Self {
            target,
            latched: false,
        }
    }

    /// The targeted recipient.
    pub fn target(&self) -> &Arc<dyn Recipient> {
        &self.target
    }

    /// Whether the sink has permanently latched inert.
    pub fn is_latched(&self) -> bool {
        self.latched
    }
}

impl Sink for SpecificSink {
    fn deliver(&mut self, recipient: &Arc<dyn Recipient>, packet: &AudioPacket<'_>) -> bool {
        if self.latched {
            return false;
        }
        if !recipient.is_connected() {
            if recipient.id() == self.target.id() {
                self.latched = true;
            }
            return false;
        }
        recipient.send(&OutboundMessage::Audio(*packet))
    }

    fn broadcast(&mut self, _roster: &dyn RecipientRoster, packet: &AudioPacket<'_>) {
        let target = self.target.clone();
        self.deliver(&target, packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockRecipient, MockRoster};

    #[test]
    fn test_broadcast_targets_only_the_recipient() {
        let target = MockRecipient::new(1);
        let bystander = MockRecipient::new(2);
        let roster = MockRoster::new(vec![target.clone(), bystander.clone()]);

        let mut sink = SpecificSink::new(target.as_recipient());
        let packet = AudioPacket {
            controller_id: 4,
            payload: &[9],
        };
        sink.broadcast(roster.as_ref(), &packet);

        assert_eq!(target.sent_audio().len(), 1);
        assert!(bystander.sent_audio().is_empty());
    }

    #[test]
    fn test_latches_permanently_after_disconnect() {
        let target = MockRecipient::new(1);
        let roster = MockRoster::new(vec![target.clone()]);
        let mut sink = SpecificSink::new(target.as_recipient());
        let packet = AudioPacket {
            controller_id: 0,
            payload: &[],
        };

        sink.broadcast(roster.as_ref(), &packet);
        assert_eq!(target.sent_audio().len(), 1);

        target.disconnect();
        sink.broadcast(roster.as_ref(), &packet);
        assert!(sink.is_latched());

        // Reconnecting does not revive the sink.
        let reconnected = MockRecipient::new(1);
        assert!(!sink.deliver(&reconnected.as_recipient(), &packet));
        assert!(reconnected.sent_audio().is_empty());
    }
}
