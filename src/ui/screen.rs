use crate::session::{Notice, Summary, Tone};

/// Receives what the game wants shown. Fire-and-forget.
pub trait PresentationSink {
    fn show(&mut self, notice: Notice);
}

/// Everything the terminal front end displays, folded from notices
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub round: Option<(usize, usize)>,
    pub target: Option<String>,
    pub timer: Option<u32>,
    pub message: String,
    pub tone: Tone,
    pub game_over: Option<Summary>,
    pub fatal: Option<String>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            round: None,
            target: None,
            timer: None,
            message: "Press Space to start".to_string(),
            tone: Tone::Neutral,
            game_over: None,
            fatal: None,
        }
    }
}

impl PresentationSink for Screen {
    fn show(&mut self, notice: Notice) {
        match notice {
            Notice::RoundLoading { index, max_rounds } => {
                self.round = Some((index, max_rounds));
                self.target = None;
                self.timer = None;
                self.game_over = None;
                self.fatal = None;
            }
            Notice::RoundStarted {
                index,
                max_rounds,
                target,
            } => {
                self.round = Some((index, max_rounds));
                self.target = Some(target);
            }
            Notice::Timer(secs) => self.timer = Some(secs),
            Notice::Prediction { text, tone } => {
                self.message = text;
                self.tone = tone;
            }
            Notice::GameOver(summary) => {
                self.timer = None;
                self.game_over = Some(summary);
            }
            Notice::Fatal(reason) => {
                self.timer = None;
                self.fatal = Some(reason);
            }
        }
    }
}
