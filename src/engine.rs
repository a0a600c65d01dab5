// engine.rs - Boot sequence activation glue

//! Ties the compiled timeline to the scheduler, the reveal state, and the
//! audio chain for one activation at a time.
//!
//! Activation materializes every command before any timer is armed;
//! deactivation cancels all timers and stops all audio synchronously, and
//! is safe to call at any time, any number of times.

use std::sync::Arc;

use crate::audio::{AssetKind, AssetSet, AudioBackendChain, ChainState, CueVariant};
use crate::config::Options;
use crate::jitter::pseudo_random;
use crate::reveal::RevealState;
use crate::sched::{Command, Dispatch, EventScheduler};
use crate::timeline::{self, BootLine, EventKind, Timeline};

/// The fixed boot script of the easter egg.
pub const DEFAULT_BOOT_LINES: [&str; 10] = [
    "BOOT SEQUENCE INIT",
    "CHECKING MEMORY..................OK",
    "LOADING AUDIO STACK..............OK",
    "INIT SENSOR BUS..................OK",
    "SYNC CLOCK.......................OK",
    "MOUNTING FILESYSTEM..............OK",
    "STARTING SERVICES................OK",
    "GRAPHICS PIPELINE................OK",
    "NETWORK HANDSHAKE................OK",
    "SYSTEM READY",
];

const SHUTDOWN_CUE_SECS: f64 = 1.8;
const STARTUP_CUE_SECS: f64 = 2.2;
const MAIN_CUE_SECS: f64 = 0.045;
const DOT_CUE_SECS: f64 = 0.03;

const POWER_VOLUME: f32 = 1.0;
const MAIN_VOLUME: f32 = 0.9;
const DOT_VOLUME: f32 = 0.7;
const STATUS_VOLUME: f32 = 0.85;
const AMBIENT_VOLUME: f32 = 0.5;

/// Jitter index for a line's ambient seek position; outside the dot index
/// range so it never collides with step draws.
const AMBIENT_SEEK_INDEX: u32 = 1_000;
/// How deep into the `run` asset an ambient layer may start, seconds.
const AMBIENT_SEEK_SPAN_SECS: f64 = 4.0;

fn play(
    asset: AssetKind,
    time_offset: f64,
    duration: f64,
    volume: f32,
    variant: CueVariant,
) -> Command {
    Command::PlayCue {
        asset,
        time_offset,
        duration,
        volume,
        variant,
    }
}

/// Routes fired commands to the reveal state and the audio chain.
struct SequenceDispatch {
    reveal: Arc<RevealState>,
    audio: Arc<AudioBackendChain>,
}

impl Dispatch for SequenceDispatch {
    fn dispatch(&self, command: &Command) {
        match command {
            Command::RevealMain { line } => self.reveal.reveal_main(*line),
            Command::RevealDot { line, dot } => self.reveal.reveal_dot(*line, *dot),
            Command::RevealStatus { line } => self.reveal.reveal_status(*line),
            Command::PlayCue {
                asset,
                time_offset,
                duration,
                volume,
                variant,
            } => self
                .audio
                .play_cue(*asset, *time_offset, *duration, *volume, *variant),
            Command::RevealPrompt => self.reveal.reveal_prompt(),
            Command::ReturnReady => self.reveal.set_return_ready(),
        }
    }
}

/// One boot-sequence feature instance.
///
/// The timeline is compiled once at construction and reused verbatim by
/// every activation, so remounting the feature reproduces identical
/// timing.
pub struct BootSequence {
    options: Options,
    lines: Vec<BootLine>,
    timeline: Timeline,
    reveal: Arc<RevealState>,
    audio: Option<Arc<AudioBackendChain>>,
    scheduler: Option<EventScheduler>,
}

impl BootSequence {
    pub fn new(raw_lines: &[&str], options: Options) -> Self {
        let lines: Vec<BootLine> = raw_lines.iter().map(|l| BootLine::parse(l)).collect();
        let timeline = timeline::compile(&lines, &options);
        let dots: Vec<usize> = lines.iter().map(|l| l.dots_count).collect();

        BootSequence {
            options,
            lines,
            timeline,
            reveal: Arc::new(RevealState::new(&dots)),
            audio: None,
            scheduler: None,
        }
    }

    pub fn with_default_lines(options: Options) -> Self {
        Self::new(&DEFAULT_BOOT_LINES, options)
    }

    pub fn lines(&self) -> &[BootLine] {
        &self.lines
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn reveal(&self) -> Arc<RevealState> {
        Arc::clone(&self.reveal)
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Arm the full schedule against a fresh epoch. A second activation
    /// while armed is a no-op.
    pub fn activate(&mut self, assets: AssetSet) {
        if self.is_active() {
            log::debug!("activate ignored: sequence already armed");
            return;
        }

        self.reveal.reset();

        let audio = Arc::new(AudioBackendChain::new(
            assets,
            self.options.master_volume,
            self.options.muted,
            self.options.layer_stagger,
        ));
        let dispatch: Arc<dyn Dispatch> = Arc::new(SequenceDispatch {
            reveal: Arc::clone(&self.reveal),
            audio: Arc::clone(&audio),
        });

        let commands = self.build_commands();
        log::info!(
            "boot sequence armed: {} commands over {:.1}s",
            commands.len(),
            self.timeline.total
        );
        self.scheduler = Some(EventScheduler::schedule_all(commands, dispatch));
        self.audio = Some(audio);
    }

    /// Cancel every armed timer and stop every audio source. Synchronous,
    /// idempotent, and safe when nothing was ever armed.
    pub fn deactivate(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.cancel_all();
        }
        if let Some(audio) = self.audio.take() {
            audio.stop_all();
            audio.dispose();
        }
    }

    /// Forward the first user gesture to the audio chain.
    pub fn unlock(&self) {
        if let Some(audio) = &self.audio {
            audio.unlock();
        }
    }

    /// True once the navigate-back affordance is actionable.
    pub fn return_ready(&self) -> bool {
        self.reveal.return_ready()
    }

    pub fn audio_state(&self) -> Option<ChainState> {
        self.audio.as_ref().map(|a| a.state())
    }

    pub fn active_audio_sources(&self) -> usize {
        self.audio.as_ref().map_or(0, |a| a.active_sources())
    }

    /// Materialize every `(offset, Command)` pair for one activation.
    /// Visual commands are registered before their paired cue at the same
    /// offset, so both fire in one dispatch tick in that order.
    fn build_commands(&self) -> Vec<(f64, Command)> {
        let mut commands = Vec::with_capacity(self.timeline.events.len() * 2 + 4);

        commands.push((
            0.0,
            play(
                AssetKind::Shutdown,
                0.0,
                SHUTDOWN_CUE_SECS,
                POWER_VOLUME,
                CueVariant::Hard,
            ),
        ));
        commands.push((
            self.options.lead_in,
            play(
                AssetKind::Startup,
                0.0,
                STARTUP_CUE_SECS,
                POWER_VOLUME,
                CueVariant::Hard,
            ),
        ));

        for event in &self.timeline.events {
            match event.kind {
                EventKind::Main => {
                    commands.push((
                        event.offset,
                        Command::RevealMain {
                            line: event.line_index,
                        },
                    ));
                    commands.push((
                        event.offset,
                        play(
                            AssetKind::Work,
                            0.0,
                            MAIN_CUE_SECS,
                            MAIN_VOLUME,
                            CueVariant::Hard,
                        ),
                    ));
                }
                EventKind::Ambient => {
                    let line = &self.lines[event.line_index];
                    let seek =
                        pseudo_random(&line.raw_text, AMBIENT_SEEK_INDEX) * AMBIENT_SEEK_SPAN_SECS;
                    let duration = self.timeline.timings[event.line_index].dots_duration;
                    commands.push((
                        event.offset,
                        play(
                            AssetKind::Run,
                            seek,
                            duration,
                            AMBIENT_VOLUME,
                            CueVariant::Motor,
                        ),
                    ));
                }
                EventKind::Dot => {
                    commands.push((
                        event.offset,
                        Command::RevealDot {
                            line: event.line_index,
                            dot: event.dot_index.unwrap_or(0),
                        },
                    ));
                    commands.push((
                        event.offset,
                        play(
                            AssetKind::Work,
                            0.0,
                            DOT_CUE_SECS,
                            DOT_VOLUME,
                            CueVariant::Seek,
                        ),
                    ));
                }
                EventKind::Status => {
                    commands.push((
                        event.offset,
                        Command::RevealStatus {
                            line: event.line_index,
                        },
                    ));
                    commands.push((
                        event.offset,
                        play(
                            AssetKind::Work,
                            0.0,
                            self.options.ok_duration,
                            STATUS_VOLUME,
                            CueVariant::Soft,
                        ),
                    ));
                }
            }
        }

        commands.push((self.timeline.prompt_offset, Command::RevealPrompt));
        commands.push((self.timeline.return_offset, Command::ReturnReady));

        commands
    }
}

impl Drop for BootSequence {
    fn drop(&mut self) {
        self.deactivate();
    }
}
