//! Observer-side reveal presentation.
//!
//! Purely presentational: this state machine decides which candidate
//! name a dashboard should display at any moment during a reveal, and
//! when to play the one-shot cue. It holds no authoritative state — the
//! winner always comes from the [`Reveal`] message, regardless of where
//! the cycling animation happened to land.
//!
//! Time is supplied by the caller in milliseconds, so the machine is
//! deterministic under test and agnostic to how a frontend schedules its
//! frames.
//!
//! # Phases
//!
//! - **Cycling** — the displayed name hops through the candidate list at
//!   a decelerating cadence keyed to elapsed fraction of a fixed window:
//!   every 250 ms for the first 60 %, every 500 ms with a coin-flip
//!   advance for 60–80 %, every 1000 ms with a one-in-four advance for
//!   the final stretch. Closing reveals skip this phase entirely.
//! - **Reveal** — the authoritative winner is shown, the cue fires once
//!   ([`RevealCue::Begins`] or [`RevealCue::Ends`]), and the result holds
//!   for a fixed display duration before returning to idle.
//!
//! Starting a new presentation while one is active forces the old one to
//! its terminal state first — two presentations never overlap.

use rand::Rng;
use tracing::debug;

use scepter_types::Reveal;

/// Where the presentation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationPhase {
    /// Nothing on screen.
    Idle,
    /// Hopping through candidate names.
    Cycling,
    /// Holding on the winner.
    Reveal,
}

/// The one-shot cue fired when the winner is first shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealCue {
    /// A new reign begins (celebratory cue).
    Begins,
    /// A reign has ended (somber cue).
    Ends,
}

/// Wall-clock timing for the presentation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationTiming {
    /// Length of the name-cycling window in milliseconds.
    pub cycling_window_ms: u64,
    /// How long the winner stays on screen in milliseconds.
    pub result_display_ms: u64,
}

impl Default for PresentationTiming {
    fn default() -> Self {
        Self {
            cycling_window_ms: 5_000,
            result_display_ms: 5_000,
        }
    }
}

/// Cadence: milliseconds between name changes in the fast stage.
const FAST_STAGE_DELAY_MS: u64 = 250;

/// Cadence: milliseconds between name-change opportunities mid-stage.
const MEDIUM_STAGE_DELAY_MS: u64 = 500;

/// Cadence: milliseconds between name-change opportunities at the end.
const SLOW_STAGE_DELAY_MS: u64 = 1_000;

/// Elapsed-percent boundary between the fast and medium stages.
const MEDIUM_STAGE_PERCENT: u64 = 60;

/// Elapsed-percent boundary between the medium and slow stages.
const SLOW_STAGE_PERCENT: u64 = 80;

/// The reveal presentation state machine.
///
/// Drive it with [`begin`](Self::begin) when a [`Reveal`] arrives and
/// [`tick`](Self::tick) on every frame; read
/// [`displayed_name`](Self::displayed_name) to render.
#[derive(Debug)]
pub struct RevealPresentation {
    /// Phase timing.
    timing: PresentationTiming,

    /// Current phase.
    phase: PresentationPhase,

    /// Candidate names being cycled, in server order.
    candidates: Vec<String>,

    /// The authoritative winner from the reveal message.
    winner: String,

    /// Whether this reveal opens a cycle (`Begins` cue) or closes one.
    is_beginning: bool,

    /// The name currently on screen.
    displayed: Option<String>,

    /// Index of the displayed name within `candidates`.
    name_index: usize,

    /// When the cycling window opened.
    started_at_ms: u64,

    /// When the displayed name last had a change opportunity.
    last_advance_ms: u64,

    /// When the reveal phase was entered, once it has been.
    reveal_entered_at_ms: Option<u64>,
}

impl RevealPresentation {
    /// Create an idle presentation with the given timing.
    pub const fn new(timing: PresentationTiming) -> Self {
        Self {
            timing,
            phase: PresentationPhase::Idle,
            candidates: Vec::new(),
            winner: String::new(),
            is_beginning: true,
            displayed: None,
            name_index: 0,
            started_at_ms: 0,
            last_advance_ms: 0,
            reveal_entered_at_ms: None,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> PresentationPhase {
        self.phase
    }

    /// The name a dashboard should display right now, if any.
    pub fn displayed_name(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    /// Start presenting a reveal.
    ///
    /// If a presentation is already in progress it is forced to its
    /// terminal state first; the new one then starts from clean state.
    /// Beginning reveals start the cycling phase at a random position in
    /// the candidate list; closing reveals (and reveals with no
    /// candidates) jump straight to the result.
    pub fn begin<R: Rng + ?Sized>(&mut self, reveal: &Reveal, now_ms: u64, rng: &mut R) {
        if self.phase != PresentationPhase::Idle {
            debug!("Forcing active presentation to completion before starting a new one");
            self.finish();
        }

        self.candidates = reveal.candidates.clone();
        self.winner = reveal.winner.clone();
        self.is_beginning = reveal.is_beginning;
        self.started_at_ms = now_ms;
        self.last_advance_ms = now_ms;
        self.reveal_entered_at_ms = None;

        if reveal.is_beginning && !self.candidates.is_empty() {
            self.name_index = rng.random_range(0..self.candidates.len());
            self.displayed = self.candidates.get(self.name_index).cloned();
            self.phase = PresentationPhase::Cycling;
        } else {
            self.phase = PresentationPhase::Reveal;
        }
    }

    /// Advance the presentation to `now_ms`.
    ///
    /// Returns the one-shot cue exactly once, at the moment the winner
    /// first appears.
    pub fn tick<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> Option<RevealCue> {
        match self.phase {
            PresentationPhase::Idle => None,
            PresentationPhase::Cycling => {
                let elapsed = now_ms.saturating_sub(self.started_at_ms);
                if elapsed >= self.timing.cycling_window_ms {
                    self.phase = PresentationPhase::Reveal;
                    return self.enter_reveal(now_ms);
                }
                self.advance_cycling(now_ms, elapsed, rng);
                None
            }
            PresentationPhase::Reveal => match self.reveal_entered_at_ms {
                Some(entered) => {
                    if now_ms.saturating_sub(entered) >= self.timing.result_display_ms {
                        self.finish();
                    }
                    None
                }
                None => self.enter_reveal(now_ms),
            },
        }
    }

    /// One cycling step: maybe swap the displayed name, at the cadence
    /// for the current elapsed fraction.
    fn advance_cycling<R: Rng + ?Sized>(&mut self, now_ms: u64, elapsed: u64, rng: &mut R) {
        let progress = elapsed
            .saturating_mul(100)
            .checked_div(self.timing.cycling_window_ms)
            .unwrap_or(100);

        let delay = if progress > SLOW_STAGE_PERCENT {
            SLOW_STAGE_DELAY_MS
        } else if progress > MEDIUM_STAGE_PERCENT {
            MEDIUM_STAGE_DELAY_MS
        } else {
            FAST_STAGE_DELAY_MS
        };

        if now_ms.saturating_sub(self.last_advance_ms) < delay {
            return;
        }
        self.last_advance_ms = now_ms;

        // The slowdown is probabilistic near the end: names keep their
        // slot more often, heightening the stop-motion feel.
        let advance = if progress > SLOW_STAGE_PERCENT {
            rng.random_range(0..4u8) == 0
        } else if progress > MEDIUM_STAGE_PERCENT {
            rng.random_range(0..2u8) == 0
        } else {
            true
        };

        if advance && !self.candidates.is_empty() {
            self.name_index = self
                .name_index
                .wrapping_add(1)
                .checked_rem(self.candidates.len())
                .unwrap_or(0);
            self.displayed = self.candidates.get(self.name_index).cloned();
        }
    }

    /// Enter the reveal phase: show the authoritative winner and fire
    /// the cue.
    fn enter_reveal(&mut self, now_ms: u64) -> Option<RevealCue> {
        self.reveal_entered_at_ms = Some(now_ms);
        self.displayed = Some(self.winner.clone());
        Some(if self.is_beginning {
            RevealCue::Begins
        } else {
            RevealCue::Ends
        })
    }

    /// Return to idle, clearing the display.
    fn finish(&mut self) {
        self.phase = PresentationPhase::Idle;
        self.displayed = None;
        self.reveal_entered_at_ms = None;
    }
}
