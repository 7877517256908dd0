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

use crate::recipient::{AudioPacket, OutboundMessage, Recipient, VoiceChannel, VoicePacket};

use super::Sink;

/// Decides per recipient whether an impersonated voice packet should be
/// heard. Receives the source actor, the candidate recipient and the
/// channel.
pub type ReceiveValidator = Box<dyn FnMut(&dyn Recipient, &dyn Recipient, VoiceChannel) -> bool + Send>;

/// Repackages stream audio so it appears to originate from a speaking
/// actor on a voice channel instead of from the stream's own identity.
///
/// Distance and voice checks are not performed unless a validator is set.
/// The sink latches permanently inert once the source actor disconnects,
/// exactly like [`SpecificSink`](super::SpecificSink).
pub struct VoiceSink {
    source: Arc<dyn Recipient>,
    channel: VoiceChannel,
    validator: Option<ReceiveValidator>,
    inert: bool,
}

impl VoiceSink {
    /// Creates a sink impersonating the given actor on the given channel.
    pub fn new(source: Arc<dyn Recipient>, channel: VoiceChannel) -> Self {
        Self {
            source,
            channel,
            validator: None,
            inert: false,
        }
    }

    /// Adds a per-recipient receive check.
    pub fn with_validator(
        mut self,
        validator: impl FnMut(&dyn Recipient, &dyn Recipient, VoiceChannel) -> bool + Send + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// The actor the audio appears to originate from.
    pub fn source(&self) -> &Arc<dyn Recipient> {
        &self.source
    }

    /// The voice channel the audio is heard on.
    pub fn channel(&self) -> VoiceChannel {
        self.channel
    }

    /// Changes the voice channel for subsequent packets.
    pub fn set_channel(&mut self, channel: VoiceChannel) {
        self.channel = channel;
    }

    /// Whether the sink has permanently latched inert.
    pub fn is_inert(&self) -> bool {
        self.inert
    }
}

impl Sink for VoiceSink {
    fn deliver(&mut self, recipient: &Arc<dyn Recipient>, packet: &AudioPacket<'_>) -> bool {
        if self.inert {
            return false;
        }
        if !self.source.is_connected() {
            self.inert = true;
            return false;
        }
        let should_receive = match self.validator.as_mut() {
            Some(validator) => validator(self.source.as_ref(), recipient.as_ref(), self.channel),
            None => true,
        };
        if should_receive {
            recipient.send(&OutboundMessage::Voice(VoicePacket {
                speaker: self.source.id(),
                channel: self.channel,
                payload: packet.payload,
            }));
        }
        // The packet was handled even when the receive check filtered it.
        true
    }
}
