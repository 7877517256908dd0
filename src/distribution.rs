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

//! Routing of finished audio packets to recipients.
//!
//! Sinks compose by wrapping: `PersonalizedSink(FilteredSink(BroadcastSink))`
//! filters first, then personalizes each successful delivery. Delivery
//! failures are boolean outcomes, never errors; a sink whose target becomes
//! invalid latches inert instead of failing loudly.

use std::sync::Arc;

use crate::recipient::{AudioPacket, Recipient, RecipientRoster};

pub mod broadcast;
pub mod filtered;
pub mod personalized;
pub mod specific;
pub mod voice;

pub use broadcast::BroadcastSink;
pub use filtered::FilteredSink;
pub use personalized::PersonalizedSink;
pub use specific::SpecificSink;
pub use voice::VoiceSink;

/// Routes encoded audio packets to zero or more recipients.
pub trait Sink: Send {
    /// Attempts to deliver the packet to a single recipient.
    /// Returns true if the message was handed to a connection.
    fn deliver(&mut self, recipient: &Arc<dyn Recipient>, packet: &AudioPacket<'_>) -> bool;

    /// Delivers the packet to every ready recipient.
    fn broadcast(&mut self, roster: &dyn RecipientRoster, packet: &AudioPacket<'_>) {
        for recipient in roster.ready() {
            self.deliver(&recipient, packet);
        }
    }
}
