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

//! The fixed-cadence packetizer driving a sample graph into the wire.
//!
//! A stream is driven once per host tick with the elapsed time. Elapsed
//! time accumulates, and one 480-sample packet is produced per 10ms of
//! accumulated time, so a stalled host catches up by emitting several
//! packets in a single tick instead of dropping audio.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::format::{FormatError, PACKET_DURATION, PACKET_SAMPLES};
use crate::audio::sample_source::SampleSource;
use crate::codec::{CodecError, VoiceEncoder};
use crate::distribution::Sink;
use crate::personalization::{SharedPersonalization, SpeakerSettings};
use crate::recipient::{AudioPacket, RecipientRoster};

/// Observes a stream's raw PCM output, before encoding.
///
/// Callbacks run inside the tick loop and must not panic; tearing the
/// stream down from within a callback is allowed.
pub trait PacketMonitor: Send {
    /// Called with each packet frame read from the graph.
    fn on_read(&mut self, frame: &[f32]);

    /// Called when the graph produced no samples.
    fn on_empty(&mut self);
}

/// A long-lived audio stream: one sample graph root, one private encoder,
/// cadence state and a distribution sink.
///
/// All mutation is expected on the thread driving [`tick`](Self::tick);
/// nothing here locks. Dropping the graph root halts reads, dropping the
/// sink halts sends; both are idempotent.
pub struct AudioStream {
    controller_id: u8,
    roster: Arc<dyn RecipientRoster>,
    source: Option<Box<dyn SampleSource>>,
    sink: Option<Box<dyn Sink>>,
    monitor: Option<Box<dyn PacketMonitor>>,
    personalization: Option<SharedPersonalization>,
    settings: SpeakerSettings,
    encoder: VoiceEncoder,
    frame: Box<[f32; PACKET_SAMPLES]>,
    remaining_time: f64,
    paused: bool,
    ended: bool,
}

impl AudioStream {
    /// Creates a stream tagged with the given correlation id, delivering
    /// through the given roster.
    pub fn new(
        controller_id: u8,
        roster: Arc<dyn RecipientRoster>,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            controller_id,
            roster,
            source: None,
            sink: None,
            monitor: None,
            personalization: None,
            settings: SpeakerSettings::default(),
            encoder: VoiceEncoder::new()?,
            frame: Box::new([0.0; PACKET_SAMPLES]),
            remaining_time: 0.0,
            paused: false,
            ended: false,
        })
    }

    /// The correlation id tagging this stream's packets.
    pub fn controller_id(&self) -> u8 {
        self.controller_id
    }

    /// Retags this stream's packets with a new correlation id.
    pub fn set_controller_id(&mut self, controller_id: u8) {
        self.controller_id = controller_id;
    }

    /// Whether ticking is currently suspended.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspends or resumes ticking.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// True iff the previous read returned fewer samples than requested.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// The accumulated time not yet turned into packets, in seconds.
    pub fn remaining_time(&self) -> f64 {
        self.remaining_time
    }

    /// The authoritative spatial settings recipients see by default.
    pub fn settings(&self) -> SpeakerSettings {
        self.settings
    }

    /// Attaches a new graph root, or detaches it with `None`.
    ///
    /// The source must be in the canonical format; anything else is
    /// rejected here rather than coerced. Assigning a source resets the
    /// cadence accumulator, so playback starts clean instead of burning
    /// through time accumulated against the previous source.
    pub fn set_source(&mut self, source: Option<Box<dyn SampleSource>>) -> Result<(), FormatError> {
        if let Some(source) = &source {
            let format = source.format();
            if !format.is_canonical() {
                return Err(FormatError { actual: format });
            }
        }
        self.source = source;
        self.remaining_time = 0.0;
        Ok(())
    }

    /// The current graph root.
    pub fn source(&self) -> Option<&dyn SampleSource> {
        self.source.as_deref()
    }

    /// Detaches and returns the graph root, resetting the accumulator.
    pub fn take_source(&mut self) -> Option<Box<dyn SampleSource>> {
        self.remaining_time = 0.0;
        self.source.take()
    }

    /// Attaches the distribution sink, or detaches it with `None`.
    /// Without a sink, ticking still drains the graph but skips encoding.
    pub fn set_sink(&mut self, sink: Option<Box<dyn Sink>>) {
        self.sink = sink;
    }

    /// Attaches the raw-PCM output monitor, or detaches it with `None`.
    pub fn set_monitor(&mut self, monitor: Option<Box<dyn PacketMonitor>>) {
        self.monitor = monitor;
    }

    /// Attaches a personalization store, adopting this stream's settings
    /// as its defaults.
    pub fn attach_personalization(&mut self, store: SharedPersonalization) {
        store.lock().set_defaults(self.settings);
        self.personalization = Some(store);
    }

    /// The attached personalization store, if any.
    pub fn personalization(&self) -> Option<&SharedPersonalization> {
        self.personalization.as_ref()
    }

    /// Replaces the authoritative spatial settings. An attached
    /// personalization store is resynced against the change.
    pub fn apply_settings(&mut self, settings: SpeakerSettings) {
        self.settings = settings;
        if let Some(store) = &self.personalization {
            store.lock().set_defaults(settings);
        }
    }

    /// Sets the authoritative volume.
    pub fn set_volume(&mut self, volume: f32) {
        self.apply_settings(self.settings.with_volume(volume));
    }

    /// Sets the authoritative spatial flag.
    pub fn set_spatial(&mut self, is_spatial: bool) {
        self.apply_settings(self.settings.with_spatial(is_spatial));
    }

    /// Sets the authoritative minimum distance.
    pub fn set_min_distance(&mut self, min_distance: f32) {
        self.apply_settings(self.settings.with_min_distance(min_distance));
    }

    /// Sets the authoritative maximum distance.
    pub fn set_max_distance(&mut self, max_distance: f32) {
        self.apply_settings(self.settings.with_max_distance(max_distance));
    }

    /// Drives the stream by `dt` elapsed seconds, emitting one packet per
    /// accumulated packet duration. No-op while paused or without a graph
    /// root.
    pub fn tick(&mut self, dt: f64) {
        if self.paused || self.source.is_none() {
            return;
        }
        self.remaining_time += dt;
        while self.remaining_time > 0.0 {
            if !self.produce_packet() {
                break;
            }
            self.remaining_time -= PACKET_DURATION;
        }
    }

    /// Resets the cadence accumulator and drops the root's read-ahead.
    pub fn clear_buffer(&mut self) {
        self.remaining_time = 0.0;
        if let Some(source) = self.source.as_mut() {
            source.clear_readahead();
        }
    }

    /// Tears the stream down to its freshly-constructed state.
    ///
    /// Required for pooled reuse: the next owner must not inherit the
    /// previous graph, sink, monitor, pause state, codec state or
    /// personalization table.
    pub fn reset(&mut self) {
        self.source = None;
        self.sink = None;
        self.monitor = None;
        self.paused = false;
        self.ended = false;
        self.remaining_time = 0.0;
        self.settings = SpeakerSettings::default();
        if let Err(e) = self.encoder.reset() {
            warn!("encoder reset failed: {e}");
        }
        if let Some(store) = self.personalization.take() {
            store.lock().clear();
        }
    }

    /// Produces one packet. Returns false when the cadence loop must stop
    /// for this tick.
    fn produce_packet(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        let read = match source.read(&mut self.frame[..]) {
            Ok(read) => read,
            Err(e) => {
                warn!("sample source read failed: {e}");
                0
            }
        };

        if read == 0 {
            self.ended = true;
            source.clear_readahead();
            if let Some(monitor) = self.monitor.as_mut() {
                monitor.on_empty();
            }
            // Stop the catch-up loop instead of spinning on a dead source.
            self.remaining_time = 0.0;
            return false;
        }

        if read < PACKET_SAMPLES {
            self.frame[read..].fill(0.0);
            self.ended = true;
            // Emit exactly this padded packet; residual accumulated time
            // must not synthesize extra empty packets.
            self.remaining_time = PACKET_DURATION;
        } else {
            self.ended = false;
        }

        if let Some(monitor) = self.monitor.as_mut() {
            monitor.on_read(&self.frame[..]);
        }

        let Some(sink) = self.sink.as_mut() else {
            return true;
        };
        let payload = match self.encoder.encode(&self.frame[..]) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("voice encode failed, dropping packet: {e}");
                return true;
            }
        };
        sink.broadcast(
            self.roster.as_ref(),
            &AudioPacket {
                controller_id: self.controller_id,
                payload,
            },
        );
        true
    }
}
