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

use crate::recipient::{AudioPacket, OutboundMessage, Recipient};

use super::Sink;

/// The default sink: delivers to every ready recipient unconditionally.
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastSink;

impl Sink for BroadcastSink {
    fn deliver(&mut self, recipient: &Arc<dyn Recipient>, packet: &AudioPacket<'_>) -> bool {
        recipient.send(&OutboundMessage::Audio(*packet))
    }
}
