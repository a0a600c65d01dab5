// reveal.rs - Monotonic visual reveal state

//! Per-line reveal counters mutated exclusively by scheduler commands.
//!
//! Every mutation is monotonic, so a duplicate command (timer coalescing,
//! replayed dispatch) can never produce a visible double-increment or an
//! out-of-order reveal.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
struct LineReveal {
    dots_count: usize,
    main: AtomicBool,
    dots: AtomicUsize,
    status: AtomicBool,
}

/// Observable reveal state for one activation.
#[derive(Debug)]
pub struct RevealState {
    lines: Vec<LineReveal>,
    prompt: AtomicBool,
    return_ready: AtomicBool,
}

impl RevealState {
    /// Build a zeroed state with the given per-line dot counts.
    pub fn new(dots_per_line: &[usize]) -> Self {
        RevealState {
            lines: dots_per_line
                .iter()
                .map(|&dots_count| LineReveal {
                    dots_count,
                    main: AtomicBool::new(false),
                    dots: AtomicUsize::new(0),
                    status: AtomicBool::new(false),
                })
                .collect(),
            prompt: AtomicBool::new(false),
            return_ready: AtomicBool::new(false),
        }
    }

    /// Zero every counter and flag.
    pub fn reset(&self) {
        for line in &self.lines {
            line.main.store(false, Ordering::SeqCst);
            line.dots.store(0, Ordering::SeqCst);
            line.status.store(false, Ordering::SeqCst);
        }
        self.prompt.store(false, Ordering::SeqCst);
        self.return_ready.store(false, Ordering::SeqCst);
    }

    pub fn reveal_main(&self, line: usize) {
        if let Some(l) = self.lines.get(line) {
            l.main.store(true, Ordering::SeqCst);
        }
    }

    /// Raise the line's dot counter to `dot + 1`, bounded by the line's
    /// dot count. Idempotent and monotonic.
    pub fn reveal_dot(&self, line: usize, dot: usize) {
        if let Some(l) = self.lines.get(line) {
            let target = (dot + 1).min(l.dots_count);
            l.dots.fetch_max(target, Ordering::SeqCst);
        }
    }

    pub fn reveal_status(&self, line: usize) {
        if let Some(l) = self.lines.get(line) {
            l.status.store(true, Ordering::SeqCst);
        }
    }

    pub fn reveal_prompt(&self) {
        self.prompt.store(true, Ordering::SeqCst);
    }

    pub fn set_return_ready(&self) {
        self.return_ready.store(true, Ordering::SeqCst);
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn dots_count(&self, line: usize) -> usize {
        self.lines.get(line).map_or(0, |l| l.dots_count)
    }

    pub fn main_revealed(&self, line: usize) -> bool {
        self.lines
            .get(line)
            .is_some_and(|l| l.main.load(Ordering::SeqCst))
    }

    pub fn dots_revealed(&self, line: usize) -> usize {
        self.lines.get(line).map_or(0, |l| l.dots.load(Ordering::SeqCst))
    }

    pub fn status_revealed(&self, line: usize) -> bool {
        self.lines
            .get(line)
            .is_some_and(|l| l.status.load(Ordering::SeqCst))
    }

    pub fn prompt_visible(&self) -> bool {
        self.prompt.load(Ordering::SeqCst)
    }

    pub fn return_ready(&self) -> bool {
        self.return_ready.load(Ordering::SeqCst)
    }

    /// True when no reveal has happened yet.
    pub fn is_blank(&self) -> bool {
        !self.prompt_visible()
            && !self.return_ready()
            && self.lines.iter().all(|l| {
                !l.main.load(Ordering::SeqCst)
                    && l.dots.load(Ordering::SeqCst) == 0
                    && !l.status.load(Ordering::SeqCst)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_blank() {
        let state = RevealState::new(&[0, 18, 0]);
        assert!(state.is_blank());
        assert_eq!(state.line_count(), 3);
        assert_eq!(state.dots_count(1), 18);
    }

    #[test]
    fn test_reveal_dot_monotonic() {
        let state = RevealState::new(&[4]);
        state.reveal_dot(0, 2);
        assert_eq!(state.dots_revealed(0), 3);
        // An earlier dot arriving late must not move the counter back.
        state.reveal_dot(0, 0);
        assert_eq!(state.dots_revealed(0), 3);
    }

    #[test]
    fn test_reveal_dot_idempotent() {
        let state = RevealState::new(&[4]);
        state.reveal_dot(0, 1);
        state.reveal_dot(0, 1);
        assert_eq!(state.dots_revealed(0), 2);
    }

    #[test]
    fn test_reveal_dot_bounded() {
        let state = RevealState::new(&[4]);
        state.reveal_dot(0, 99);
        assert_eq!(state.dots_revealed(0), 4);
    }

    #[test]
    fn test_out_of_range_line_ignored() {
        let state = RevealState::new(&[2]);
        state.reveal_main(7);
        state.reveal_dot(7, 0);
        state.reveal_status(7);
        assert!(state.is_blank());
        assert!(!state.main_revealed(7));
        assert_eq!(state.dots_revealed(7), 0);
    }

    #[test]
    fn test_reset() {
        let state = RevealState::new(&[3, 3]);
        state.reveal_main(0);
        state.reveal_dot(0, 2);
        state.reveal_status(0);
        state.reveal_prompt();
        state.set_return_ready();
        assert!(!state.is_blank());

        state.reset();
        assert!(state.is_blank());
        assert_eq!(state.dots_revealed(0), 0);
    }

    #[test]
    fn test_prompt_and_return_flags() {
        let state = RevealState::new(&[]);
        assert!(!state.prompt_visible());
        assert!(!state.return_ready());
        state.reveal_prompt();
        state.set_return_ready();
        assert!(state.prompt_visible());
        assert!(state.return_ready());
    }

    proptest! {
        #[test]
        fn prop_counter_bounded_and_monotonic(
            dots_count in 1usize..32,
            reveals in proptest::collection::vec(0usize..40, 0..64),
        ) {
            let state = RevealState::new(&[dots_count]);
            let mut last = 0;
            for dot in reveals {
                state.reveal_dot(0, dot);
                let now = state.dots_revealed(0);
                prop_assert!(now >= last);
                prop_assert!(now <= dots_count);
                last = now;
            }
        }
    }
}
