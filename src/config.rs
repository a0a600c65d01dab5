// config.rs - Engine options and the canonical timing parameter set

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Engine options that can be set via CLI or by an embedding application.
///
/// The timing constants form the one canonical parameter set for the
/// feature; the source material carried several near-duplicate revisions
/// and these values are not blended across them.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Simulated power-on delay before the first line appears, seconds.
    pub lead_in: f64,
    /// Pause between consecutive boot lines, seconds.
    pub inter_line_pause: f64,
    /// Nominal duration of a full dot run, seconds. The per-dot base step
    /// is this window divided by the reference dot count.
    pub dots_window: f64,
    /// Probability that a dot step stutters.
    pub stutter_probability: f64,
    /// Step multiplier applied on a stutter.
    pub stutter_multiplier: f64,
    /// Delay between the last dot and the OK flash, seconds.
    pub ok_delay: f64,
    /// Duration of the OK flash, seconds.
    pub ok_duration: f64,
    /// Base component of the label reveal duration, seconds.
    pub main_duration_base: f64,
    /// Per-character component of the label reveal duration, seconds.
    pub main_duration_per_char: f64,
    /// Upper bound on the label reveal duration, seconds.
    pub main_duration_cap: f64,
    /// Reference dot count used when no status-terminated line exists.
    pub fallback_dots_count: usize,
    /// Offset from the last line's end to the prompt reveal, seconds.
    pub prompt_delay: f64,
    /// Offset from the last line's end to the return affordance, seconds.
    pub return_delay: f64,

    /// Master gain applied to every cue (0.0 - 1.0).
    pub master_volume: f32,
    /// Stagger between the two layered buffer-tier sources, seconds.
    pub layer_stagger: f64,
    /// Suppress all audio output.
    pub muted: bool,
    /// Directory probed for the optional named audio assets.
    pub asset_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            lead_in: 6.0,
            inter_line_pause: 0.25,
            dots_window: 0.9,
            stutter_probability: 0.18,
            stutter_multiplier: 10.0,
            ok_delay: 0.45,
            ok_duration: 0.18,
            main_duration_base: 0.06,
            main_duration_per_char: 0.006,
            main_duration_cap: 0.2,
            fallback_dots_count: 16,
            prompt_delay: 1.6,
            return_delay: 4.1,
            master_volume: 0.8,
            layer_stagger: 0.05,
            muted: false,
            asset_dir: None,
        }
    }
}

/// Parse a volume value (0-100) to a float (0.0-1.0).
pub fn parse_volume(vol: i32) -> f32 {
    if vol < 0 {
        return 0.0;
    }
    if vol > 100 {
        return 1.0;
    }
    vol as f32 / 100.0
}

/// Parse a lead-in override in seconds.
pub fn parse_lead_in(s: &str) -> Result<f64> {
    let lead_in: f64 = s.parse().context("Invalid lead-in value")?;
    if !(0.0..=60.0).contains(&lead_in) {
        anyhow::bail!("Lead-in out of range (0 to 60 seconds)");
    }
    Ok(lead_in)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_defaults() {
        let opts = Options::default();
        assert_eq!(opts.lead_in, 6.0);
        assert_eq!(opts.inter_line_pause, 0.25);
        assert_eq!(opts.dots_window, 0.9);
        assert_eq!(opts.stutter_probability, 0.18);
        assert_eq!(opts.stutter_multiplier, 10.0);
        assert_eq!(opts.ok_delay, 0.45);
        assert_eq!(opts.ok_duration, 0.18);
        assert_eq!(opts.prompt_delay, 1.6);
        assert_eq!(opts.return_delay, 4.1);
        assert!(!opts.muted);
        assert!(opts.asset_dir.is_none());
    }

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume(0), 0.0);
        assert_eq!(parse_volume(50), 0.5);
        assert_eq!(parse_volume(100), 1.0);
        assert_eq!(parse_volume(-10), 0.0);
        assert_eq!(parse_volume(150), 1.0);
    }

    #[test]
    fn test_parse_lead_in() {
        assert_eq!(parse_lead_in("6.0").unwrap(), 6.0);
        assert_eq!(parse_lead_in("0").unwrap(), 0.0);
        assert!(parse_lead_in("-1").is_err());
        assert!(parse_lead_in("61").is_err());
        assert!(parse_lead_in("abc").is_err());
    }
}
