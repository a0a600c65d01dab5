// chain.rs - Three-tier audio fallback chain

//! Cue playback with layered fallback: decoded buffer, then streaming
//! element, then synthesis. The chain owns a dedicated audio thread (the
//! rodio `OutputStream` is not `Send`) and is driven by a command
//! channel; teardown stops every active source and joins the thread.
//!
//! `play_cue` is fire-and-forget and never returns an error to the
//! caller; any internal failure degrades to the next tier or drops the
//! cue with a debug log.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::audio::{synth, AssetKind, AssetSet, ChainState, Cue, CueError, CueVariant};

/// Gain applied to the staggered second source of a motor cue.
const LAYER_GAIN: f32 = 0.6;

/// Floor for cue durations handed to streaming and synthesis sources.
const MIN_CUE_SECS: f64 = 0.01;

/// Reply timeout for queries into the audio thread.
const QUERY_TIMEOUT: Duration = Duration::from_millis(200);

enum AudioCmd {
    PlayCue(Cue),
    StopAll,
    ActiveSources(Sender<usize>),
    Shutdown,
}

/// An asset decoded exactly once at activation, shared read-only by every
/// cue rendered from it.
#[derive(Debug, Clone)]
pub(crate) struct DecodedBuffer {
    pub(crate) channels: u16,
    pub(crate) sample_rate: u32,
    pub(crate) samples: Arc<Vec<i16>>,
}

impl DecodedBuffer {
    /// Copy out the `(offset, duration)` sub-range, clamped to the asset.
    /// `None` when the range falls entirely outside the sample data.
    pub(crate) fn slice(&self, offset: f64, duration: f64) -> Option<Vec<i16>> {
        let to_index = |secs: f64| {
            (secs.max(0.0) * self.sample_rate as f64) as usize * self.channels as usize
        };
        let start = to_index(offset);
        if start >= self.samples.len() {
            return None;
        }
        let end = if duration > 0.0 {
            (start + to_index(duration)).min(self.samples.len())
        } else {
            self.samples.len()
        };
        if end <= start {
            return None;
        }
        Some(self.samples[start..end].to_vec())
    }
}

/// State owned by the audio thread.
struct Backend {
    stream_handle: Option<OutputStreamHandle>,
    decoded: HashMap<AssetKind, DecodedBuffer>,
    raw: HashMap<AssetKind, Arc<[u8]>>,
    sinks: Vec<Sink>,
    master_volume: f32,
    layer_stagger: f64,
    synth_invocation: u32,
}

impl Backend {
    fn cue_volume(&self, cue: &Cue) -> f32 {
        (cue.volume * self.master_volume).clamp(0.0, 1.0)
    }

    fn render_cue(&mut self, cue: &Cue) {
        self.sinks.retain(|s| !s.empty());

        let result = self.buffer_tier(cue).or_else(|err| {
            log::debug!("buffer tier declined {:?}: {}", cue.asset, err);
            self.element_tier(cue).or_else(|err| {
                log::debug!("element tier declined {:?}: {}", cue.asset, err);
                self.synthesis_tier(cue)
            })
        });

        if let Err(err) = result {
            log::debug!("cue {:?} dropped: {}", cue.asset, err);
        }
    }

    /// Tier 1: fresh source over the shared pre-decoded buffer, with an
    /// optional sub-range and, for motor cues, a second staggered layer.
    fn buffer_tier(&mut self, cue: &Cue) -> Result<(), CueError> {
        let handle = self.stream_handle.as_ref().ok_or(CueError::NoDevice)?;
        let buf = self
            .decoded
            .get(&cue.asset)
            .ok_or(CueError::NoBuffer(cue.asset))?;
        let span = buf
            .slice(cue.time_offset, cue.duration)
            .ok_or(CueError::EmptyRange(cue.asset))?;
        let volume = self.cue_volume(cue);

        let sink = Sink::try_new(handle)?;
        sink.set_volume(volume);
        sink.append(SamplesBuffer::new(
            buf.channels,
            buf.sample_rate,
            span.clone(),
        ));

        let layered = if cue.variant == CueVariant::Motor {
            let layered = Sink::try_new(handle)?;
            layered.set_volume(volume * LAYER_GAIN);
            layered.append(
                SamplesBuffer::new(buf.channels, buf.sample_rate, span)
                    .delay(Duration::from_secs_f64(self.layer_stagger)),
            );
            Some(layered)
        } else {
            None
        };

        self.sinks.push(sink);
        self.sinks.extend(layered);
        Ok(())
    }

    /// Tier 2: streaming element over the raw bytes, seeked and truncated.
    fn element_tier(&mut self, cue: &Cue) -> Result<(), CueError> {
        let handle = self.stream_handle.as_ref().ok_or(CueError::NoDevice)?;
        let bytes = self
            .raw
            .get(&cue.asset)
            .cloned()
            .ok_or(CueError::NoElement(cue.asset))?;

        let mut source = Decoder::new(Cursor::new(bytes))?;
        if cue.time_offset > 0.0 {
            if let Err(err) = source.try_seek(Duration::from_secs_f64(cue.time_offset)) {
                // Unseekable containers play from the start instead.
                log::debug!("seek rejected for {:?}: {}", cue.asset, err);
            }
        }

        let sink = Sink::try_new(handle)?;
        sink.set_volume(self.cue_volume(cue));
        sink.append(source.take_duration(Duration::from_secs_f64(cue.duration.max(MIN_CUE_SECS))));
        self.sinks.push(sink);
        Ok(())
    }

    /// Tier 3: asset-free synthesis; only an absent device can decline.
    fn synthesis_tier(&mut self, cue: &Cue) -> Result<(), CueError> {
        let handle = self.stream_handle.as_ref().ok_or(CueError::NoDevice)?;
        let invocation = self.synth_invocation;
        self.synth_invocation = self.synth_invocation.wrapping_add(1);
        let samples = synth::render(cue.variant, cue.duration.max(MIN_CUE_SECS), 1.0, invocation);

        let sink = Sink::try_new(handle)?;
        sink.set_volume(self.cue_volume(cue));
        sink.append(SamplesBuffer::new(1, synth::SAMPLE_RATE, samples));
        self.sinks.push(sink);
        Ok(())
    }

    fn stop_all(&mut self) {
        for sink in self.sinks.drain(..) {
            sink.stop();
        }
    }
}

/// Decode each named asset exactly once. Decode failures are recovered:
/// the raw bytes stay available for the streaming tier.
fn decode_assets(assets: &AssetSet) -> HashMap<AssetKind, DecodedBuffer> {
    let mut decoded = HashMap::new();
    for (kind, bytes) in assets.iter() {
        match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => {
                let channels = source.channels();
                let sample_rate = source.sample_rate();
                let samples: Vec<i16> = source.collect();
                if samples.is_empty() || channels == 0 || sample_rate == 0 {
                    log::warn!("asset {:?} decoded to no samples", kind);
                    continue;
                }
                decoded.insert(
                    kind,
                    DecodedBuffer {
                        channels,
                        sample_rate,
                        samples: Arc::new(samples),
                    },
                );
            }
            Err(err) => {
                log::warn!("asset {:?} failed to decode: {}", kind, err);
            }
        }
    }
    decoded
}

fn audio_thread_main(
    rx: Receiver<AudioCmd>,
    assets: AssetSet,
    master_volume: f32,
    layer_stagger: f64,
) {
    // The stream must be constructed and kept alive on this thread.
    let (stream, stream_handle) = match OutputStream::try_default() {
        Ok((stream, handle)) => (Some(stream), Some(handle)),
        Err(err) => {
            log::warn!("audio device unavailable: {}", err);
            (None, None)
        }
    };
    let _stream = stream;

    let mut backend = Backend {
        stream_handle,
        decoded: decode_assets(&assets),
        raw: assets.iter().collect(),
        sinks: Vec::new(),
        master_volume,
        layer_stagger,
        synth_invocation: 0,
    };

    loop {
        match rx.recv() {
            Ok(AudioCmd::PlayCue(cue)) => backend.render_cue(&cue),
            Ok(AudioCmd::StopAll) => backend.stop_all(),
            Ok(AudioCmd::ActiveSources(reply)) => {
                backend.sinks.retain(|s| !s.empty());
                let _ = reply.send(backend.sinks.len());
            }
            Ok(AudioCmd::Shutdown) | Err(_) => {
                backend.stop_all();
                break;
            }
        }
    }
}

/// Scoped handle over the tiered sound service for one activation.
pub struct AudioBackendChain {
    state: AtomicU8,
    sender: Mutex<Option<Sender<AudioCmd>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    muted: bool,
}

impl AudioBackendChain {
    /// Construct the chain in the `Suspended` state. The device context
    /// is created immediately but sound production waits for `unlock`.
    ///
    /// A muted chain never opens the device and drops every cue.
    pub fn new(assets: AssetSet, master_volume: f32, muted: bool, layer_stagger: f64) -> Self {
        let (sender, worker) = if muted {
            (None, None)
        } else {
            let (tx, rx) = mpsc::channel();
            let handle =
                thread::spawn(move || audio_thread_main(rx, assets, master_volume, layer_stagger));
            (Some(tx), Some(handle))
        };

        AudioBackendChain {
            state: AtomicU8::new(ChainState::Suspended as u8),
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
            muted,
        }
    }

    pub fn state(&self) -> ChainState {
        ChainState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// One-shot unlock on the first user gesture; a no-op in any state
    /// other than `Suspended`.
    pub fn unlock(&self) {
        let _ = self.state.compare_exchange(
            ChainState::Suspended as u8,
            ChainState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Request a sound effect. Fire-and-forget: cues before unlock or
    /// after dispose are accepted and produce no effect.
    pub fn play_cue(
        &self,
        asset: AssetKind,
        time_offset: f64,
        duration: f64,
        volume: f32,
        variant: CueVariant,
    ) {
        if self.muted {
            return;
        }
        match self.state() {
            ChainState::Running => {}
            ChainState::Suspended => {
                log::debug!("cue {:?} withheld before unlock gesture", asset);
                return;
            }
            _ => return,
        }

        let guard = self.sender.lock();
        if let Some(sender) = guard.as_ref() {
            let _ = sender.send(AudioCmd::PlayCue(Cue {
                asset,
                time_offset,
                duration,
                volume,
                variant,
            }));
        }
    }

    /// Stop every active source without releasing the device.
    pub fn stop_all(&self) {
        let guard = self.sender.lock();
        if let Some(sender) = guard.as_ref() {
            let _ = sender.send(AudioCmd::StopAll);
        }
    }

    /// Number of sources still playing. Zero once disposed.
    pub fn active_sources(&self) -> usize {
        let (tx, rx) = mpsc::channel();
        {
            let guard = self.sender.lock();
            match guard.as_ref() {
                Some(sender) => {
                    if sender.send(AudioCmd::ActiveSources(tx)).is_err() {
                        return 0;
                    }
                }
                None => return 0,
            }
        }
        rx.recv_timeout(QUERY_TIMEOUT).unwrap_or(0)
    }

    /// Stop all sources, release the device, and join the audio thread.
    /// Idempotent; `play_cue` afterwards is accepted and silent.
    pub fn dispose(&self) {
        self.state
            .store(ChainState::Disposed as u8, Ordering::SeqCst);

        let sender = self.sender.lock().take();
        if let Some(sender) = sender {
            let _ = sender.send(AudioCmd::Shutdown);
        }

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioBackendChain {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn muted_chain() -> AudioBackendChain {
        AudioBackendChain::new(AssetSet::new(), 0.8, true, 0.05)
    }

    #[test]
    fn test_slice_full_range() {
        let buf = DecodedBuffer {
            channels: 2,
            sample_rate: 10,
            samples: Arc::new((0..100).collect()),
        };
        let span = buf.slice(0.0, 0.0).unwrap();
        assert_eq!(span.len(), 100);
    }

    #[test]
    fn test_slice_sub_range() {
        let buf = DecodedBuffer {
            channels: 2,
            sample_rate: 10,
            samples: Arc::new((0..100).collect()),
        };
        // 1s at 10 Hz stereo = 20 values, starting at frame 10.
        let span = buf.slice(1.0, 1.0).unwrap();
        assert_eq!(span.len(), 20);
        assert_eq!(span[0], 20);
    }

    #[test]
    fn test_slice_clamps_to_end() {
        let buf = DecodedBuffer {
            channels: 1,
            sample_rate: 10,
            samples: Arc::new((0..30).collect()),
        };
        let span = buf.slice(2.0, 5.0).unwrap();
        assert_eq!(span.len(), 10);
    }

    #[test]
    fn test_slice_out_of_range() {
        let buf = DecodedBuffer {
            channels: 1,
            sample_rate: 10,
            samples: Arc::new((0..30).collect()),
        };
        assert!(buf.slice(10.0, 1.0).is_none());
    }

    #[test]
    fn test_muted_chain_state_machine() {
        let chain = muted_chain();
        assert_eq!(chain.state(), ChainState::Suspended);

        chain.unlock();
        assert_eq!(chain.state(), ChainState::Running);

        chain.play_cue(AssetKind::Work, 0.0, 0.05, 1.0, CueVariant::Seek);
        assert_eq!(chain.active_sources(), 0);

        chain.dispose();
        assert_eq!(chain.state(), ChainState::Disposed);
    }

    #[test]
    fn test_unlock_is_one_shot() {
        let chain = muted_chain();
        chain.dispose();
        chain.unlock();
        // Unlock after dispose must not resurrect the chain.
        assert_eq!(chain.state(), ChainState::Disposed);
    }

    #[test]
    fn test_double_dispose_is_noop() {
        let chain = muted_chain();
        chain.dispose();
        chain.dispose();
        assert_eq!(chain.state(), ChainState::Disposed);
    }

    #[test]
    #[serial]
    fn test_play_cue_never_errors_without_assets() {
        // Real chain: opens (or fails to open) the device, then renders
        // every variant through whatever tier is reachable.
        let chain = AudioBackendChain::new(AssetSet::new(), 0.5, false, 0.05);
        assert_eq!(chain.state(), ChainState::Suspended);

        // Withheld before the unlock gesture.
        chain.play_cue(AssetKind::Startup, 0.0, 0.1, 1.0, CueVariant::Hard);

        chain.unlock();
        for variant in [
            CueVariant::Soft,
            CueVariant::Hard,
            CueVariant::Seek,
            CueVariant::Motor,
        ] {
            chain.play_cue(AssetKind::Work, 0.0, 0.05, 1.0, variant);
        }

        chain.stop_all();
        chain.dispose();
        assert_eq!(chain.active_sources(), 0);

        // Accepted and silent after dispose.
        chain.play_cue(AssetKind::Work, 0.0, 0.05, 1.0, CueVariant::Soft);
    }

    #[test]
    #[serial]
    fn test_undecodable_asset_degrades() {
        let mut assets = AssetSet::new();
        assets.insert_bytes(AssetKind::Work, vec![0u8; 64]);

        let chain = AudioBackendChain::new(assets, 0.5, false, 0.05);
        chain.unlock();
        chain.play_cue(AssetKind::Work, 0.0, 0.05, 1.0, CueVariant::Seek);
        chain.dispose();
    }
}
