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

//! voicecast streams PCM audio to many remote recipients as Opus voice
//! packets, while letting each recipient perceive different spatial-audio
//! parameters through minimal binary state diffs.
//!
//! The pieces, from the bottom up:
//!
//! - [`audio`]: the canonical format, the ring buffer and the composable
//!   sample-source graph (raw clips, mixing, queuing, looping, read-ahead
//!   buffering, format adaptation, file decoding).
//! - [`codec`]: the per-stream Opus encoder.
//! - [`stream`]: the fixed-cadence packetizer binding a graph root to a
//!   distribution sink.
//! - [`distribution`]: composable sinks routing packets to recipients.
//! - [`personalization`] and [`wire`]: per-recipient settings overrides
//!   and their bit-exact diff encoding.
//! - [`registry`]: decoder-backend registration and short-clip caching.
//!
//! Recipients, rosters and connections are host-owned; see [`recipient`].

pub mod audio;
pub mod codec;
pub mod distribution;
pub mod personalization;
pub mod recipient;
pub mod registry;
pub mod stream;
pub mod wire;

#[cfg(test)]
pub(crate) mod testutil;

pub use audio::format::{AudioFormat, FormatError, SampleFormat};
pub use audio::sample_source::{SampleSource, SampleSourceError};
pub use codec::{CodecError, VoiceEncoder};
pub use distribution::{
    BroadcastSink, FilteredSink, PersonalizedSink, Sink, SpecificSink, VoiceSink,
};
pub use personalization::{
    Personalization, SharedPersonalization, SpeakerIdentity, SpeakerSettings,
};
pub use recipient::{
    AudioPacket, OutboundMessage, Recipient, RecipientId, RecipientRoster, VoiceChannel,
    VoicePacket,
};
pub use registry::{DecoderBackend, DecoderRegistry, ShortClipCache};
pub use stream::{AudioStream, PacketMonitor};
