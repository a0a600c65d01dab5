// synth.rs - Guaranteed-success percussive synthesis (tier 3)

//! Asset-free sound generation: a square or triangle oscillator layered
//! with an amplitude-enveloped, filtered noise burst. Frequency and gain
//! carry a small per-invocation jitter drawn from the deterministic
//! seeded source, so repeated cues vary naturally without any global
//! random state.

use crate::audio::CueVariant;
use crate::jitter::pseudo_random;

/// Output sample rate for synthesized cues.
pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy)]
enum Wave {
    Square,
    Triangle,
}

#[derive(Debug, Clone, Copy)]
enum NoiseShape {
    Lowpass,
    Highpass,
    Bandpass,
}

struct VariantSpec {
    wave: Wave,
    /// Center frequency, Hz.
    freq: f32,
    /// Full span of the per-invocation frequency jitter, Hz.
    freq_span: f32,
    tone_mix: f32,
    noise_mix: f32,
    noise: NoiseShape,
    /// Exponential amplitude decay rate, 1/s.
    decay: f32,
    /// Minimum envelope level; nonzero keeps motor rumble sustained.
    floor: f32,
}

fn profile(variant: CueVariant) -> VariantSpec {
    match variant {
        CueVariant::Soft => VariantSpec {
            wave: Wave::Triangle,
            freq: 960.0,
            freq_span: 60.0,
            tone_mix: 0.7,
            noise_mix: 0.2,
            noise: NoiseShape::Lowpass,
            decay: 18.0,
            floor: 0.0,
        },
        CueVariant::Hard => VariantSpec {
            wave: Wave::Square,
            freq: 220.0,
            freq_span: 18.0,
            tone_mix: 0.6,
            noise_mix: 0.5,
            noise: NoiseShape::Bandpass,
            decay: 14.0,
            floor: 0.0,
        },
        CueVariant::Seek => VariantSpec {
            wave: Wave::Square,
            freq: 1_800.0,
            freq_span: 240.0,
            tone_mix: 0.35,
            noise_mix: 0.6,
            noise: NoiseShape::Highpass,
            decay: 60.0,
            floor: 0.0,
        },
        CueVariant::Motor => VariantSpec {
            wave: Wave::Square,
            freq: 96.0,
            freq_span: 10.0,
            tone_mix: 0.5,
            noise_mix: 0.45,
            noise: NoiseShape::Lowpass,
            decay: 3.0,
            floor: 0.22,
        },
    }
}

/// Render one mono cue at [`SAMPLE_RATE`]. `invocation` indexes the
/// deterministic jitter sequence; the same `(variant, duration, volume,
/// invocation)` always yields identical samples.
pub fn render(variant: CueVariant, duration: f64, volume: f32, invocation: u32) -> Vec<f32> {
    let p = profile(variant);
    let count = ((duration * SAMPLE_RATE as f64) as usize).max(1);

    let freq_jitter = (pseudo_random("synth-freq", invocation) as f32 - 0.5) * p.freq_span;
    let gain_jitter = 0.85 + 0.3 * pseudo_random("synth-gain", invocation) as f32;
    let freq = (p.freq + freq_jitter).max(1.0);
    let phase_step = freq / SAMPLE_RATE as f32;

    // Noise generator state; seeded from the invocation so the burst is
    // reproducible per cue.
    let mut noise_state: u32 = invocation.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut lp = 0.0f32;
    let mut hp_lp = 0.0f32;
    let mut bp = 0.0f32;

    let mut phase = 0.0f32;
    let mut samples = Vec::with_capacity(count);
    let release_len = (count as f32 * 0.05).max(1.0);

    for i in 0..count {
        let tone = match p.wave {
            Wave::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Wave::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        };
        phase += phase_step;
        if phase >= 1.0 {
            phase -= 1.0;
        }

        noise_state = noise_state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let white = (noise_state >> 8) as f32 / 8_388_608.0 - 1.0;
        lp += 0.12 * (white - lp);
        hp_lp += 0.25 * (white - hp_lp);
        let high = white - hp_lp;
        bp += 0.30 * (high - bp);
        let noise = match p.noise {
            NoiseShape::Lowpass => lp,
            NoiseShape::Highpass => high,
            NoiseShape::Bandpass => bp,
        };

        let t = i as f32 / SAMPLE_RATE as f32;
        let env = p.floor + (1.0 - p.floor) * (-t * p.decay).exp();
        let tail = ((count - i) as f32 / release_len).min(1.0);

        let sample =
            (tone * p.tone_mix + noise * p.noise_mix) * env * tail * volume * gain_jitter;
        samples.push(sample.clamp(-1.0, 1.0));
    }

    samples
}
