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
// Test doubles for the host boundary: recording recipients, a fixed
// roster, simple sources and a recording packet monitor.
//
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::format::AudioFormat;
use crate::audio::sample_source::{SampleSource, SampleSourceError};
use crate::recipient::{OutboundMessage, Recipient, RecipientId, RecipientRoster, VoiceChannel};
use crate::stream::PacketMonitor;

/// An owned record of a message handed to a mock recipient.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedMessage {
    Audio {
        controller_id: u8,
        payload: Vec<u8>,
    },
    Voice {
        speaker: RecipientId,
        channel: VoiceChannel,
        payload: Vec<u8>,
    },
    EntityState {
        entity_id: u64,
        payload: Vec<u8>,
    },
}

/// A recipient that records every message handed to its connection.
pub struct MockRecipient {
    id: RecipientId,
    connected: AtomicBool,
    sent: Mutex<Vec<RecordedMessage>>,
}

impl MockRecipient {
    pub fn new(id: RecipientId) -> Arc<Self> {
        Arc::new(Self {
            id,
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// The same mock upcast to the recipient trait object.
    pub fn as_recipient(self: &Arc<Self>) -> Arc<dyn Recipient> {
        self.clone()
    }

    /// Marks the endpoint as no longer valid.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Everything sent to this recipient so far.
    pub fn sent(&self) -> Vec<RecordedMessage> {
        self.sent.lock().clone()
    }

    /// The audio packets sent to this recipient so far.
    pub fn sent_audio(&self) -> Vec<(u8, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                RecordedMessage::Audio {
                    controller_id,
                    payload,
                } => Some((controller_id, payload)),
                _ => None,
            })
            .collect()
    }
}

impl Recipient for MockRecipient {
    fn id(&self) -> RecipientId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&self, message: &OutboundMessage<'_>) -> bool {
        if !self.is_connected() {
            return false;
        }
        let recorded = match message {
            OutboundMessage::Audio(packet) => RecordedMessage::Audio {
                controller_id: packet.controller_id,
                payload: packet.payload.to_vec(),
            },
            OutboundMessage::Voice(packet) => RecordedMessage::Voice {
                speaker: packet.speaker,
                channel: packet.channel,
                payload: packet.payload.to_vec(),
            },
            OutboundMessage::EntityState { entity_id, payload } => RecordedMessage::EntityState {
                entity_id: *entity_id,
                payload: payload.to_vec(),
            },
        };
        self.sent.lock().push(recorded);
        true
    }
}

/// The entity-state messages recorded by a mock recipient.
pub fn recorded_entity_states(recipient: &Arc<MockRecipient>) -> Vec<(u64, Vec<u8>)> {
    recipient
        .sent()
        .into_iter()
        .filter_map(|message| match message {
            RecordedMessage::EntityState { entity_id, payload } => Some((entity_id, payload)),
            _ => None,
        })
        .collect()
}

/// A roster over a fixed, mutable set of mock recipients.
pub struct MockRoster {
    recipients: Mutex<Vec<Arc<MockRecipient>>>,
}

impl MockRoster {
    pub fn new(recipients: Vec<Arc<MockRecipient>>) -> Arc<Self> {
        Arc::new(Self {
            recipients: Mutex::new(recipients),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

impl RecipientRoster for MockRoster {
    fn ready(&self) -> Vec<Arc<dyn Recipient>> {
        self.recipients
            .lock()
            .iter()
            .map(|recipient| recipient.clone() as Arc<dyn Recipient>)
            .collect()
    }
}

/// A canonical-format source emitting a constant value forever.
pub struct ConstantSource {
    value: f32,
}

impl ConstantSource {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl SampleSource for ConstantSource {
    fn format(&self) -> AudioFormat {
        AudioFormat::CANONICAL
    }

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        buf.fill(self.value);
        Ok(buf.len())
    }
}

/// A source that fails every read.
pub struct FailingSource;

impl SampleSource for FailingSource {
    fn format(&self) -> AudioFormat {
        AudioFormat::CANONICAL
    }

    fn read(&mut self, _buf: &mut [f32]) -> Result<usize, SampleSourceError> {
        Err(SampleSourceError::IoError(std::io::Error::other(
            "injected read failure",
        )))
    }
}

/// What a recording monitor observed.
#[derive(Debug, Default)]
pub struct MonitorLog {
    /// Raw PCM frames, in delivery order.
    pub frames: Vec<Vec<f32>>,
    /// How many times the source produced no samples.
    pub empties: usize,
}

/// A packet monitor appending everything it observes to a shared log.
pub struct RecordingMonitor {
    log: Arc<Mutex<MonitorLog>>,
}

impl RecordingMonitor {
    pub fn new() -> (Self, Arc<Mutex<MonitorLog>>) {
        let log = Arc::new(Mutex::new(MonitorLog::default()));
        (Self { log: log.clone() }, log)
    }
}

impl PacketMonitor for RecordingMonitor {
    fn on_read(&mut self, frame: &[f32]) {
        self.log.lock().frames.push(frame.to_vec());
    }

    fn on_empty(&mut self) {
        self.log.lock().empties += 1;
    }
}
