use std::time::Duration;

use crate::error::{ClassifierError, GameError, WordSourceError};
use crate::matcher::Matcher;
use crate::round::{Outcome, PredictionStep, Round, RoundId, TickStep, DEFAULT_ROUND_SECS};
use crate::throttle::{Millis, ThrottlePolicy};

pub const DEFAULT_MAX_ROUNDS: usize = 6;
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_rounds: usize,
    pub round_secs: u32,
    pub advance_delay: Duration,
    pub throttle: ThrottlePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            round_secs: DEFAULT_ROUND_SECS,
            advance_delay: DEFAULT_ADVANCE_DELAY,
            throttle: ThrottlePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    NotStarted,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Success,
    Error,
}

/// Something the presentation layer should show
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    RoundLoading {
        index: usize,
        max_rounds: usize,
    },
    RoundStarted {
        index: usize,
        max_rounds: usize,
        target: String,
    },
    Timer(u32),
    Prediction {
        text: String,
        tone: Tone,
    },
    GameOver(Summary),
    Fatal(String),
}

impl Notice {
    fn prediction(text: impl Into<String>, tone: Tone) -> Self {
        Notice::Prediction {
            text: text.into(),
            tone,
        }
    }
}

/// Side effects requested by the session; the driver carries them out
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchWord { round: RoundId },
    StartClock { round: RoundId },
    StopClock,
    ClearCanvas,
    /// Snapshot the canvas and classify it
    Predict { round: RoundId },
    ScheduleAdvance { round: RoundId, after: Duration },
    Show(Notice),
    Narrate(String),
    CancelNarration,
    RecordResult(Summary),
}

/// Final result of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub score: usize,
    pub max_rounds: usize,
}

impl Summary {
    pub fn percentage(&self) -> u32 {
        if self.max_rounds == 0 {
            return 0;
        }
        (self.score as f64 / self.max_rounds as f64 * 100.0).round() as u32
    }

    pub fn performance(&self) -> &'static str {
        match self.percentage() {
            p if p >= 80 => "Excellent!",
            p if p >= 60 => "Good job!",
            p if p >= 40 => "Keep practicing!",
            _ => "Try again!",
        }
    }

    pub fn headline(&self) -> String {
        format!(
            "Final Score: {}/{} ({}%) - {}",
            self.score,
            self.max_rounds,
            self.percentage(),
            self.performance()
        )
    }

    pub fn spoken(&self) -> String {
        format!(
            "Game complete! You scored {} out of {}. {}",
            self.score,
            self.max_rounds,
            self.performance().trim_end_matches('!')
        )
    }
}

/// Sequences rounds, keeps score and owns the single live round.
///
/// Every handler first checks that the event belongs to the live round of a
/// running session; anything else is dropped without effect.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    matcher: Matcher,
    state: SessionState,
    score: usize,
    round: Option<Round>,
    next_round_id: u64,
    summary: Option<Summary>,
}

impl Session {
    pub fn new(config: SessionConfig, matcher: Matcher) -> Self {
        Self {
            config,
            matcher,
            state: SessionState::NotStarted,
            score: 0,
            round: None,
            next_round_id: 0,
            summary: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn round_index(&self) -> usize {
        self.round.as_ref().map_or(0, Round::index)
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn summary(&self) -> Option<Summary> {
        self.summary
    }

    /// Begins a session unless one is already running
    pub fn start(&mut self) -> Vec<Command> {
        if self.is_running() {
            return Vec::new();
        }
        self.reset_and_begin()
    }

    /// Abandons whatever is running and begins again from round one
    pub fn restart(&mut self) -> Vec<Command> {
        if let Some(round) = &self.round {
            tracing::info!(round = %round.id(), state = %round.state(), "abandoning round");
        }
        self.reset_and_begin()
    }

    fn reset_and_begin(&mut self) -> Vec<Command> {
        tracing::info!(max_rounds = self.config.max_rounds, "session starting");
        self.state = SessionState::Running;
        self.score = 0;
        self.round = None;
        self.summary = None;

        let mut cmds = vec![Command::StopClock, Command::CancelNarration];
        cmds.extend(self.begin_round(1));
        cmds
    }

    fn begin_round(&mut self, index: usize) -> Vec<Command> {
        self.next_round_id += 1;
        let id = RoundId(self.next_round_id);
        let mut round = Round::new(id, index);
        if let Err(err) = round.begin_loading() {
            tracing::error!(%err, "fresh round refused to load");
            return Vec::new();
        }
        self.round = Some(round);

        vec![
            Command::StopClock,
            Command::ClearCanvas,
            Command::Show(Notice::RoundLoading {
                index,
                max_rounds: self.config.max_rounds,
            }),
            Command::Show(Notice::prediction("Loading word...", Tone::Neutral)),
            Command::FetchWord { round: id },
        ]
    }

    /// The live round, if `id` still names it and the session is running
    fn live_round(&mut self, id: RoundId) -> Option<&mut Round> {
        if !self.is_running() {
            return None;
        }
        self.round.as_mut().filter(|round| round.id() == id)
    }

    pub fn word_fetched(
        &mut self,
        id: RoundId,
        result: Result<String, WordSourceError>,
    ) -> Vec<Command> {
        let round_secs = self.config.round_secs;
        let max_rounds = self.config.max_rounds;
        let Some(round) = self.live_round(id) else {
            tracing::debug!(round = %id, "discarding stale word");
            return Vec::new();
        };

        let target = match result.map_err(GameError::from) {
            Ok(word) => word.trim().to_string(),
            Err(err) => {
                tracing::error!(round = %id, %err, "ending session");
                return self.abort(&err);
            }
        };

        if let Err(err) = round.activate(target.clone(), round_secs) {
            tracing::debug!(%err, "word arrived for a round that is not loading");
            return Vec::new();
        }
        let index = round.index();

        vec![
            Command::Show(Notice::RoundStarted {
                index,
                max_rounds,
                target,
            }),
            Command::Show(Notice::Timer(round_secs)),
            Command::Show(Notice::prediction("Start drawing...", Tone::Neutral)),
            Command::StartClock { round: id },
        ]
    }

    pub fn tick(&mut self, id: RoundId, now: Millis) -> Vec<Command> {
        let policy = self.config.throttle;
        let Some(round) = self.live_round(id) else {
            return Vec::new();
        };

        match round.tick(now, &policy) {
            TickStep::Ignored => Vec::new(),
            TickStep::Counted { countdown, predict } => {
                let mut cmds = vec![Command::Show(Notice::Timer(countdown))];
                if predict {
                    tracing::debug!(round = %id, now, "requesting prediction");
                    cmds.push(Command::Show(Notice::prediction(
                        "Analyzing drawing...",
                        Tone::Neutral,
                    )));
                    cmds.push(Command::Predict { round: id });
                }
                cmds
            }
            TickStep::TimedOut => {
                let mut cmds = vec![Command::Show(Notice::Timer(0))];
                cmds.extend(self.finish_round(Outcome::Timeout));
                cmds
            }
        }
    }

    pub fn prediction_done(
        &mut self,
        id: RoundId,
        result: Result<String, ClassifierError>,
        now: Millis,
    ) -> Vec<Command> {
        let Some(round) = self.round.as_mut().filter(|r| r.id() == id) else {
            tracing::debug!(round = %id, "discarding prediction for a replaced round");
            return Vec::new();
        };

        let result = result.map_err(|err| {
            let err = GameError::from(err);
            tracing::warn!(round = %id, %err, "classification error");
            err
        });
        match round.complete_prediction(result, now, &self.matcher) {
            PredictionStep::Stale => {
                tracing::debug!(round = %id, "discarding prediction for a resolved round");
                Vec::new()
            }
            PredictionStep::Failed => vec![Command::Show(Notice::prediction(
                "Prediction failed - keep drawing!",
                Tone::Error,
            ))],
            PredictionStep::Missed { label } => vec![Command::Show(Notice::prediction(
                format!("Prediction: {label}"),
                Tone::Neutral,
            ))],
            PredictionStep::Correct { label } => {
                tracing::info!(round = %id, %label, "correct guess");
                self.finish_round(Outcome::Correct)
            }
        }
    }

    fn finish_round(&mut self, outcome: Outcome) -> Vec<Command> {
        let Some(round) = &self.round else {
            return Vec::new();
        };
        let id = round.id();
        let target = round.target().unwrap_or_default().to_string();

        let (text, spoken, tone) = match outcome {
            Outcome::Correct => {
                self.score += 1;
                (
                    format!("Correct! It was a {target}"),
                    format!("Correct! It's a {target}"),
                    Tone::Success,
                )
            }
            Outcome::Timeout => (
                format!("Time's up! It was a {target}"),
                format!("Time's up! It was a {target}"),
                Tone::Error,
            ),
        };

        vec![
            Command::StopClock,
            Command::CancelNarration,
            Command::Show(Notice::prediction(text, tone)),
            Command::Narrate(spoken),
            Command::ScheduleAdvance {
                round: id,
                after: self.config.advance_delay,
            },
        ]
    }

    /// Moves on after a resolved round: next round, or the final summary
    pub fn advance(&mut self, id: RoundId) -> Vec<Command> {
        let max_rounds = self.config.max_rounds;
        let Some(round) = self.live_round(id) else {
            tracing::debug!(round = %id, "discarding stale advance");
            return Vec::new();
        };
        if round.outcome().is_none() {
            return Vec::new();
        }

        let index = round.index();
        if index < max_rounds {
            return self.begin_round(index + 1);
        }

        let summary = Summary {
            score: self.score,
            max_rounds,
        };
        tracing::info!(score = summary.score, percentage = summary.percentage(), "session finished");
        self.state = SessionState::Finished;
        self.summary = Some(summary);

        vec![
            Command::StopClock,
            Command::CancelNarration,
            Command::Show(Notice::GameOver(summary)),
            Command::Narrate(summary.spoken()),
            Command::RecordResult(summary),
        ]
    }

    fn abort(&mut self, err: &GameError) -> Vec<Command> {
        self.state = SessionState::Finished;
        vec![
            Command::StopClock,
            Command::CancelNarration,
            Command::Show(Notice::Fatal(err.to_string())),
        ]
    }

    pub fn pen_down(&mut self, now: Millis) {
        if let Some(round) = self.active_round() {
            round.pen_down(now);
        }
    }

    pub fn pen_move(&mut self, now: Millis) {
        if let Some(round) = self.active_round() {
            round.pen_move(now);
        }
    }

    pub fn pen_up(&mut self, now: Millis) {
        if let Some(round) = self.active_round() {
            round.pen_up(now);
        }
    }

    pub fn clear_drawing(&mut self) -> Vec<Command> {
        let Some(round) = self.active_round() else {
            return Vec::new();
        };
        round.clear_drawing();
        vec![
            Command::ClearCanvas,
            Command::Show(Notice::prediction("Start drawing...", Tone::Neutral)),
        ]
    }

    /// Whether drawing input is accepted right now
    pub fn accepts_drawing(&self) -> bool {
        self.is_running() && self.round.as_ref().is_some_and(Round::is_active)
    }

    fn active_round(&mut self) -> Option<&mut Round> {
        if !self.is_running() {
            return None;
        }
        self.round.as_mut().filter(|round| round.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::SynonymTable;
    use crate::round::RoundState;
    use assert_matches::assert_matches;

    fn session(max_rounds: usize) -> Session {
        let config = SessionConfig {
            max_rounds,
            round_secs: 5,
            advance_delay: Duration::from_millis(10),
            throttle: ThrottlePolicy::new(0, 0),
        };
        Session::new(
            config,
            Matcher::new(SynonymTable::from_entries([("dog", vec!["puppy"])])),
        )
    }

    fn fetch_id(cmds: &[Command]) -> RoundId {
        cmds.iter()
            .find_map(|c| match c {
                Command::FetchWord { round } => Some(*round),
                _ => None,
            })
            .expect("no FetchWord command")
    }

    fn advance_id(cmds: &[Command]) -> RoundId {
        cmds.iter()
            .find_map(|c| match c {
                Command::ScheduleAdvance { round, .. } => Some(*round),
                _ => None,
            })
            .expect("no ScheduleAdvance command")
    }

    /// Starts the round and returns its id once active
    fn activate(session: &mut Session, cmds: &[Command], word: &str) -> RoundId {
        let id = fetch_id(cmds);
        let cmds = session.word_fetched(id, Ok(word.to_string()));
        assert!(cmds.contains(&Command::StartClock { round: id }));
        id
    }

    fn win(session: &mut Session, id: RoundId, now: Millis) -> Vec<Command> {
        session.pen_down(now);
        session.pen_up(now);
        let cmds = session.tick(id, now + 1);
        assert!(cmds.contains(&Command::Predict { round: id }));
        session.prediction_done(id, Ok("dog".into()), now + 2)
    }

    fn lose(session: &mut Session, id: RoundId) -> Vec<Command> {
        let mut last = Vec::new();
        for _ in 0..5 {
            last = session.tick(id, 0);
        }
        last
    }

    #[test]
    fn start_loads_first_round() {
        let mut s = session(6);
        assert_eq!(s.state(), SessionState::NotStarted);

        let cmds = s.start();
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.round_index(), 1);
        assert_eq!(s.round().map(Round::state), Some(RoundState::Loading));
        assert!(cmds.contains(&Command::ClearCanvas));
        assert!(cmds.contains(&Command::Show(Notice::RoundLoading {
            index: 1,
            max_rounds: 6
        })));

        // already running: start is a no-op
        assert!(s.start().is_empty());
    }

    #[test]
    fn six_round_scenario_scores_half() {
        let mut s = session(6);
        let mut cmds = s.start();
        let mut final_cmds = Vec::new();

        for index in 1..=6 {
            let id = activate(&mut s, &cmds, "dog");
            assert_eq!(s.round_index(), index);
            let done = if [1, 2, 4].contains(&index) {
                win(&mut s, id, 1_000)
            } else {
                lose(&mut s, id)
            };
            cmds = s.advance(advance_id(&done));
            if index == 6 {
                final_cmds = cmds.clone();
            }
        }

        assert_eq!(s.state(), SessionState::Finished);
        assert_eq!(s.score(), 3);
        let summary = s.summary().unwrap();
        assert_eq!(summary.percentage(), 50);
        assert!(final_cmds.contains(&Command::Show(Notice::GameOver(summary))));
        assert!(final_cmds.contains(&Command::RecordResult(summary)));
        assert_eq!(summary.headline(), "Final Score: 3/6 (50%) - Keep practicing!");
    }

    #[test]
    fn timeout_is_reported_once() {
        let mut s = session(2);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "cat");

        let last = lose(&mut s, id);
        assert_matches!(last.first(), Some(Command::Show(Notice::Timer(0))));
        assert!(last.contains(&Command::Narrate("Time's up! It was a cat".into())));

        assert!(s.tick(id, 0).is_empty());
        assert!(s.tick(id, 0).is_empty());
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn late_prediction_after_timeout_is_ignored() {
        let mut s = session(2);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");

        s.pen_down(0);
        let cmds = s.tick(id, 1);
        assert!(cmds.contains(&Command::Predict { round: id }));
        lose(&mut s, id);

        let cmds = s.prediction_done(id, Ok("dog".into()), 10_000);
        assert!(cmds.is_empty());
        assert_eq!(s.score(), 0);
        assert_eq!(
            s.round().map(Round::state),
            Some(RoundState::Resolved(Outcome::Timeout))
        );
    }

    #[test]
    fn second_answer_after_correct_is_ignored() {
        let mut s = session(2);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");
        win(&mut s, id, 0);
        assert_eq!(s.score(), 1);

        assert!(s.prediction_done(id, Ok("dog".into()), 50).is_empty());
        assert!(s.tick(id, 60).is_empty());
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn failed_prediction_keeps_round_going() {
        let mut s = session(1);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");
        s.pen_down(0);
        s.tick(id, 1);

        let cmds = s.prediction_done(id, Err(ClassifierError::Status(502)), 2);
        assert_eq!(
            cmds,
            vec![Command::Show(Notice::Prediction {
                text: "Prediction failed - keep drawing!".into(),
                tone: Tone::Error,
            })]
        );
        assert!(s.round().unwrap().is_active());

        // next eligible tick retries
        assert!(s.tick(id, 3).contains(&Command::Predict { round: id }));
    }

    #[test]
    fn wrong_guess_shows_label() {
        let mut s = session(1);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");
        s.pen_down(0);
        s.tick(id, 1);
        let cmds = s.prediction_done(id, Ok("cat".into()), 2);
        assert_eq!(
            cmds,
            vec![Command::Show(Notice::Prediction {
                text: "Prediction: cat".into(),
                tone: Tone::Neutral,
            })]
        );
    }

    #[test]
    fn no_prediction_before_drawing() {
        let mut s = session(1);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");
        for now in 0..4 {
            let cmds = s.tick(id, now * 1000);
            assert!(!cmds.iter().any(|c| matches!(c, Command::Predict { .. })));
        }
    }

    #[test]
    fn word_fetch_failure_ends_session() {
        let mut s = session(6);
        let cmds = s.start();
        let id = fetch_id(&cmds);

        let cmds = s.word_fetched(id, Err(WordSourceError::Status(500)));
        assert_eq!(s.state(), SessionState::Finished);
        assert!(cmds.contains(&Command::StopClock));
        assert_matches!(cmds.last(), Some(Command::Show(Notice::Fatal(msg))) if msg.contains("500"));
        assert!(s.summary().is_none());

        // nothing else can move the dead session
        assert!(s.tick(id, 0).is_empty());
        assert!(s.advance(id).is_empty());
    }

    #[test]
    fn restart_mid_round_invalidates_old_work() {
        let mut s = session(3);
        let cmds = s.start();
        let old = activate(&mut s, &cmds, "dog");
        s.pen_down(0);
        assert!(s.tick(old, 1).contains(&Command::Predict { round: old }));

        let cmds = s.restart();
        assert_eq!(cmds[0], Command::StopClock);
        assert!(cmds.contains(&Command::CancelNarration));
        let new = fetch_id(&cmds);
        assert_ne!(old, new);
        assert_eq!(s.round_index(), 1);
        assert_eq!(s.score(), 0);

        // the abandoned round's clock and prediction have no effect
        assert!(s.tick(old, 2).is_empty());
        assert!(s.prediction_done(old, Ok("dog".into()), 3).is_empty());
        assert!(s.advance(old).is_empty());
        assert!(s.word_fetched(old, Ok("cat".into())).is_empty());
        assert_eq!(s.score(), 0);

        let id = activate(&mut s, &cmds, "cat");
        assert_eq!(id, new);
        assert_eq!(s.round().and_then(Round::target), Some("cat"));
    }

    #[test]
    fn advance_requires_resolved_round() {
        let mut s = session(3);
        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");
        assert!(s.advance(id).is_empty());
        assert_eq!(s.round_index(), 1);
    }

    #[test]
    fn clear_resets_drawing() {
        let mut s = session(1);
        assert!(s.clear_drawing().is_empty());

        let cmds = s.start();
        let id = activate(&mut s, &cmds, "dog");
        s.pen_down(0);
        let cmds = s.clear_drawing();
        assert!(cmds.contains(&Command::ClearCanvas));
        assert!(!s.tick(id, 5_000).contains(&Command::Predict { round: id }));
    }

    #[test]
    fn summary_messages() {
        let summary = Summary {
            score: 5,
            max_rounds: 6,
        };
        assert_eq!(summary.percentage(), 83);
        assert_eq!(summary.performance(), "Excellent!");
        assert_eq!(
            summary.spoken(),
            "Game complete! You scored 5 out of 6. Excellent"
        );
        assert_eq!(
            Summary {
                score: 0,
                max_rounds: 6
            }
            .performance(),
            "Try again!"
        );
        assert_eq!(
            Summary {
                score: 0,
                max_rounds: 0
            }
            .percentage(),
            0
        );
    }
}
