// timeline.rs - Boot-line grammar and the timeline compiler

//! Turns the fixed boot-line text into a fully time-stamped schedule.
//!
//! Compilation is pure: the same line list always produces bit-identical
//! offsets, because all variance comes from [`crate::jitter`] keyed on the
//! line text itself. The compiler materializes every scheduled event up
//! front; nothing is computed while timers run.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::Options;
use crate::jitter::pseudo_random;

/// One literal row of the simulated BIOS output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootLine {
    /// The source text, used as the jitter seed for this line.
    pub raw_text: String,
    /// Label text in front of the dot run (or the whole line).
    pub main_text: String,
    /// Length of the trailing dot run; zero for plain lines.
    pub dots_count: usize,
    /// Whether the line ends in a `<dots>OK` status token.
    pub has_status_token: bool,
}

fn status_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)(\.+)OK$").unwrap())
}

impl BootLine {
    /// Classify a raw line against the grammar
    /// `plain text | "<label><dots>OK" | "SYSTEM READY"`.
    ///
    /// A line without a recognizable status token is plain text with zero
    /// dot events; malformed input is never an error.
    pub fn parse(raw: &str) -> Self {
        if let Some(caps) = status_line_re().captures(raw) {
            let main_text = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let dots_count = caps.get(2).map_or(0, |m| m.as_str().len());
            return BootLine {
                raw_text: raw.to_string(),
                main_text,
                dots_count,
                has_status_token: true,
            };
        }

        BootLine {
            raw_text: raw.to_string(),
            main_text: raw.to_string(),
            dots_count: 0,
            has_status_token: false,
        }
    }
}

/// What a scheduled event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Reveal the line's label text.
    Main,
    /// Start the mechanical-motion layer under the line's dot run.
    Ambient,
    /// Reveal one dot of the line's filler run.
    Dot,
    /// Flash the line's OK token.
    Status,
}

/// One materialized timeline event.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub line_index: usize,
    pub kind: EventKind,
    /// Set for `Dot` events only.
    pub dot_index: Option<usize>,
    /// Seconds from the activation epoch.
    pub offset: f64,
}

/// Per-line timing record.
#[derive(Debug, Clone, PartialEq)]
pub struct LineTiming {
    pub start: f64,
    pub main_duration: f64,
    pub dots_duration: f64,
    pub ok_delay: f64,
    pub ok_duration: f64,
    /// Total occupied time of this line, excluding the inter-line pause.
    pub duration: f64,
    pub end: f64,
}

/// The full compiled schedule for one activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub timings: Vec<LineTiming>,
    /// Events in chronological order.
    pub events: Vec<ScheduledEvent>,
    /// End of the last line's occupied time.
    pub last_line_end: f64,
    /// When the shell prompt becomes visible.
    pub prompt_offset: f64,
    /// Earliest instant the navigate-back affordance is actionable.
    pub return_offset: f64,
    /// Lead-in plus the sum of all line durations and inter-line pauses.
    pub total: f64,
}

/// Compile the line list into a timeline.
pub fn compile(lines: &[BootLine], opts: &Options) -> Timeline {
    let base_dots_count = lines
        .iter()
        .find(|l| l.has_status_token)
        .map(|l| l.dots_count)
        .unwrap_or(opts.fallback_dots_count)
        .max(1);
    let base_step = opts.dots_window / base_dots_count as f64;

    let mut timings = Vec::with_capacity(lines.len());
    let mut events = Vec::new();
    let mut running = opts.lead_in;

    for (line_index, line) in lines.iter().enumerate() {
        let main_duration = opts.main_duration_cap.min(
            opts.main_duration_base
                + opts.main_duration_per_char * line.main_text.chars().count() as f64,
        );

        events.push(ScheduledEvent {
            line_index,
            kind: EventKind::Main,
            dot_index: None,
            offset: running,
        });

        let (dots_duration, ok_delay, ok_duration) = if line.has_status_token {
            events.push(ScheduledEvent {
                line_index,
                kind: EventKind::Ambient,
                dot_index: None,
                offset: running + main_duration,
            });

            let mut at = running + main_duration;
            let mut dots_duration = 0.0;
            for dot_index in 0..line.dots_count {
                let step = if pseudo_random(&line.raw_text, dot_index as u32)
                    < opts.stutter_probability
                {
                    base_step * opts.stutter_multiplier
                } else {
                    base_step
                };
                at += step;
                dots_duration += step;
                events.push(ScheduledEvent {
                    line_index,
                    kind: EventKind::Dot,
                    dot_index: Some(dot_index),
                    offset: at,
                });
            }

            events.push(ScheduledEvent {
                line_index,
                kind: EventKind::Status,
                dot_index: None,
                offset: running + main_duration + dots_duration + opts.ok_delay,
            });

            (dots_duration, opts.ok_delay, opts.ok_duration)
        } else {
            (0.0, 0.0, 0.0)
        };

        let duration = main_duration + dots_duration + ok_delay + ok_duration;
        let end = running + duration;
        timings.push(LineTiming {
            start: running,
            main_duration,
            dots_duration,
            ok_delay,
            ok_duration,
            duration,
            end,
        });
        running = end + opts.inter_line_pause;
    }

    let last_line_end = timings.last().map_or(opts.lead_in, |t| t.end);

    Timeline {
        timings,
        events,
        last_line_end,
        prompt_offset: last_line_end + opts.prompt_delay,
        return_offset: last_line_end + opts.return_delay,
        total: running,
    }
}
