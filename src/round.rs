use std::fmt;

use thiserror::Error;

use crate::input::InputTracker;
use crate::matcher::Matcher;
use crate::throttle::{Millis, ThrottleInputs, ThrottlePolicy};

pub const DEFAULT_ROUND_SECS: u32 = 20;

/// Identity of a round, unique across sessions.
///
/// Every tick and async completion carries the id of the round it was issued
/// for; anything that does not match the live round is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Outcome {
    Correct,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    Loading,
    Active,
    Resolved(Outcome),
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Idle => f.write_str("Idle"),
            RoundState::Loading => f.write_str("Loading"),
            RoundState::Active => f.write_str("Active"),
            RoundState::Resolved(outcome) => write!(f, "Resolved({outcome})"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("round {round} cannot go from {from} to {to}")]
pub struct TransitionError {
    pub round: RoundId,
    pub from: RoundState,
    pub to: &'static str,
}

/// Result of one clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStep {
    /// Round not active; the tick changed nothing
    Ignored,
    /// Countdown moved; `predict` means a classification call was just
    /// marked in flight and must be issued
    Counted { countdown: u32, predict: bool },
    TimedOut,
}

/// Result of feeding a classifier answer into the round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionStep {
    /// Round is no longer active; the answer was discarded
    Stale,
    Failed,
    Missed { label: String },
    Correct { label: String },
}

/// One round of the game: `Idle -> Loading -> Active -> Resolved`.
///
/// Transitions only go forward, and a round resolves exactly once.
#[derive(Debug, Clone)]
pub struct Round {
    id: RoundId,
    index: usize,
    target: Option<String>,
    countdown: u32,
    state: RoundState,
    input: InputTracker,
    last_prediction: Millis,
    prediction_in_flight: bool,
}

impl Round {
    pub fn new(id: RoundId, index: usize) -> Self {
        Self {
            id,
            index,
            target: None,
            countdown: 0,
            state: RoundState::Idle,
            input: InputTracker::new(),
            last_prediction: 0,
            prediction_in_flight: false,
        }
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == RoundState::Active
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            RoundState::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn input(&self) -> &InputTracker {
        &self.input
    }

    pub fn prediction_in_flight(&self) -> bool {
        self.prediction_in_flight
    }

    pub fn last_prediction(&self) -> Millis {
        self.last_prediction
    }

    pub fn begin_loading(&mut self) -> Result<(), TransitionError> {
        self.expect(RoundState::Idle, "Loading")?;
        self.state = RoundState::Loading;
        Ok(())
    }

    pub fn activate(&mut self, target: String, countdown: u32) -> Result<(), TransitionError> {
        self.expect(RoundState::Loading, "Active")?;
        self.target = Some(target);
        self.countdown = countdown;
        self.input.reset();
        self.last_prediction = 0;
        self.prediction_in_flight = false;
        self.state = RoundState::Active;
        tracing::info!(round = %self.id, index = self.index, countdown, "round active");
        Ok(())
    }

    /// Advances the countdown by one second.
    ///
    /// Reaching zero resolves the round as a timeout even with a prediction
    /// outstanding. Otherwise the throttle is consulted and, if it allows,
    /// the round is marked in flight before returning.
    pub fn tick(&mut self, now: Millis, policy: &ThrottlePolicy) -> TickStep {
        if !self.is_active() {
            return TickStep::Ignored;
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.resolve(Outcome::Timeout);
            return TickStep::TimedOut;
        }

        let predict = policy.should_predict(&ThrottleInputs {
            now,
            last_draw: self.input.last_draw(),
            last_prediction: self.last_prediction,
            has_drawn: self.input.has_drawn(),
            in_flight: self.prediction_in_flight,
        });
        if predict {
            self.prediction_in_flight = true;
        }

        TickStep::Counted {
            countdown: self.countdown,
            predict,
        }
    }

    /// Applies a finished classification; a successful `result` holds the cleaned label.
    pub fn complete_prediction<E>(
        &mut self,
        result: Result<String, E>,
        now: Millis,
        matcher: &Matcher,
    ) -> PredictionStep {
        if !self.is_active() {
            return PredictionStep::Stale;
        }

        self.prediction_in_flight = false;

        // failures leave the throttle window open so the next tick may retry
        let label = match result {
            Ok(label) => label,
            Err(_) => return PredictionStep::Failed,
        };
        self.last_prediction = now;

        let hit = self
            .target
            .as_deref()
            .is_some_and(|target| matcher.is_match(&label, target));
        if hit {
            self.resolve(Outcome::Correct);
            PredictionStep::Correct { label }
        } else {
            PredictionStep::Missed { label }
        }
    }

    pub fn pen_down(&mut self, now: Millis) {
        if self.is_active() {
            self.input.pen_down(now);
        }
    }

    pub fn pen_move(&mut self, now: Millis) {
        if self.is_active() {
            self.input.pen_move(now);
        }
    }

    pub fn pen_up(&mut self, now: Millis) {
        if self.is_active() {
            self.input.pen_up(now);
        }
    }

    pub fn clear_drawing(&mut self) {
        if self.is_active() {
            self.input.clear();
        }
    }

    fn resolve(&mut self, outcome: Outcome) {
        self.state = RoundState::Resolved(outcome);
        self.prediction_in_flight = false;
        tracing::info!(round = %self.id, index = self.index, %outcome, "round resolved");
    }

    fn expect(&self, from: RoundState, to: &'static str) -> Result<(), TransitionError> {
        if self.state == from {
            Ok(())
        } else {
            Err(TransitionError {
                round: self.id,
                from: self.state,
                to,
            })
        }
    }
}
