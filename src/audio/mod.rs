// mod.rs - Audio subsystem: fallback chain, assets, synthesis

//! Sound production for the boot sequence.
//!
//! The public surface is [`AudioBackendChain`]: a fire-and-forget cue
//! player backed by three tiers tried in order (decoded buffer, streaming
//! element, synthesized tone). Failures degrade fidelity, never feature
//! availability; nothing in this module surfaces an error to callers.

pub mod assets;
pub mod chain;
pub mod synth;

pub use assets::AssetSet;
pub use chain::AudioBackendChain;

use thiserror::Error;

/// Logical names of the optional audio assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Startup,
    Run,
    Shutdown,
    Work,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Startup,
        AssetKind::Run,
        AssetKind::Shutdown,
        AssetKind::Work,
    ];

    /// File stem used when probing an asset directory.
    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Startup => "startup",
            AssetKind::Run => "run",
            AssetKind::Shutdown => "shutdown",
            AssetKind::Work => "work",
        }
    }
}

/// Character of a cue, selecting synthesis parameters and layering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueVariant {
    /// Confirmation beep (status OK).
    Soft,
    /// Percussive click (power events, line starts).
    Hard,
    /// Short head-seek tick (dot reveals).
    Seek,
    /// Low mechanical rumble (ambient layer).
    Motor,
}

/// Lifecycle of the audio backend.
///
/// `Uninitialized` exists only before construction; a freshly built chain
/// is `Suspended` until the first user gesture unlocks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChainState {
    Uninitialized = 0,
    Suspended = 1,
    Running = 2,
    Disposed = 3,
}

impl ChainState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ChainState::Suspended,
            2 => ChainState::Running,
            3 => ChainState::Disposed,
            _ => ChainState::Uninitialized,
        }
    }
}

/// One logical sound request, independent of which tier renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub asset: AssetKind,
    /// Sub-range offset into the asset, seconds.
    pub time_offset: f64,
    pub duration: f64,
    pub volume: f32,
    pub variant: CueVariant,
}

/// Why a tier declined a cue. Internal to the chain; recovered by falling
/// through to the next tier and never surfaced to callers.
#[derive(Debug, Error)]
pub(crate) enum CueError {
    #[error("no decoded buffer for {0:?}")]
    NoBuffer(AssetKind),
    #[error("empty sample range for {0:?}")]
    EmptyRange(AssetKind),
    #[error("no raw bytes for {0:?}")]
    NoElement(AssetKind),
    #[error("decode failed: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("playback rejected: {0}")]
    Rejected(#[from] rodio::PlayError),
    #[error("no output device")]
    NoDevice,
}
