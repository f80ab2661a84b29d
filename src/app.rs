use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;

use crate::history::ResultsLog;
use crate::narration::Narrator;
use crate::prediction::{Classifier, PredictionInvoker};
use crate::round::RoundId;
use crate::runtime::{schedule_advance, Clock, GameEvent};
use crate::session::{Command, Session, Summary};
use crate::surface::{Canvas, Point, Viewport};
use crate::throttle::Millis;
use crate::ui::{self, PresentationSink, Screen};
use crate::words::{fetch_in_background, WordSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The outside world the game talks to
pub struct Collaborators {
    pub words: Arc<dyn WordSource>,
    pub classifier: Arc<dyn Classifier>,
    pub narrator: Box<dyn Narrator>,
}

/// Event-loop owner: feeds events into the session and carries out the
/// commands it returns. Only this type mutates game state.
pub struct App {
    session: Session,
    canvas: Canvas,
    viewport: Viewport,
    screen: Screen,
    words: Arc<dyn WordSource>,
    predictor: PredictionInvoker,
    narrator: Box<dyn Narrator>,
    events: Sender<GameEvent>,
    clock: Option<Clock>,
    tick_interval: Duration,
    epoch: Instant,
    results: Option<ResultsLog>,
}

impl App {
    pub fn new(
        session: Session,
        canvas: Canvas,
        collaborators: Collaborators,
        events: Sender<GameEvent>,
        tick_interval: Duration,
    ) -> Self {
        let Collaborators {
            words,
            classifier,
            narrator,
        } = collaborators;
        Self {
            session,
            canvas,
            viewport: Viewport::default(),
            screen: Screen::default(),
            words,
            predictor: PredictionInvoker::new(classifier, events.clone()),
            narrator,
            events,
            clock: None,
            tick_interval,
            epoch: Instant::now(),
            results: None,
        }
    }

    pub fn with_results_log(mut self, log: ResultsLog) -> Self {
        self.results = Some(log);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Round the running clock is ticking for, if any
    pub fn clock_round(&self) -> Option<RoundId> {
        self.clock.as_ref().map(Clock::round)
    }

    fn now(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }

    /// Terminal area changed; recompute where the canvas sits
    pub fn resize(&mut self, area: Rect) {
        self.viewport = ui::canvas_viewport(area);
    }

    pub fn handle(&mut self, event: GameEvent) -> Flow {
        let cmds = match event {
            GameEvent::Key(key) => return self.on_key(key),
            GameEvent::Mouse(mouse) => {
                self.on_mouse(mouse);
                Vec::new()
            }
            GameEvent::Resize(width, height) => {
                self.resize(Rect::new(0, 0, width, height));
                Vec::new()
            }
            GameEvent::Idle => Vec::new(),
            GameEvent::Tick { round } => {
                let now = self.now();
                self.session.tick(round, now)
            }
            GameEvent::WordFetched { round, result } => self.session.word_fetched(round, result),
            GameEvent::PredictionDone { round, result } => {
                let now = self.now();
                self.session.prediction_done(round, result, now)
            }
            GameEvent::AdvanceDue { round } => self.session.advance(round),
        };
        self.dispatch(cmds);
        Flow::Continue
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }
        let cmds = match key.code {
            KeyCode::Esc => return self.quit(),
            // ctrl+c to quit
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return self.quit()
            }
            KeyCode::Char(' ') => self.session.start(),
            KeyCode::Char('r') => self.session.restart(),
            KeyCode::Char('c') => self.session.clear_drawing(),
            _ => Vec::new(),
        };
        self.dispatch(cmds);
        Flow::Continue
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let local = self
            .canvas
            .to_local(self.viewport, mouse.column, mouse.row);
        match (mouse.kind, local) {
            (MouseEventKind::Down(MouseButton::Left), Some(at)) => self.pen_down(at),
            (MouseEventKind::Drag(MouseButton::Left), Some(at)) => self.pen_move(at),
            // dragged off the canvas
            (MouseEventKind::Drag(MouseButton::Left), None) => self.pen_up(),
            (MouseEventKind::Up(MouseButton::Left), _) => self.pen_up(),
            _ => {}
        }
    }

    pub fn pen_down(&mut self, at: Point) {
        if !self.session.accepts_drawing() {
            return;
        }
        let now = self.now();
        self.canvas.begin_stroke(at);
        self.session.pen_down(now);
    }

    pub fn pen_move(&mut self, at: Point) {
        if !self.session.accepts_drawing() {
            return;
        }
        let now = self.now();
        self.canvas.stroke_to(at);
        self.session.pen_move(now);
    }

    pub fn pen_up(&mut self) {
        let now = self.now();
        self.canvas.end_stroke();
        self.session.pen_up(now);
    }

    fn quit(&mut self) -> Flow {
        self.clock = None;
        self.narrator.cancel();
        Flow::Quit
    }

    fn dispatch(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            match cmd {
                Command::FetchWord { round } => {
                    fetch_in_background(Arc::clone(&self.words), self.events.clone(), round)
                }
                Command::StartClock { round } => {
                    // replacing the clock cancels the previous one
                    self.clock = Some(Clock::start(
                        self.events.clone(),
                        self.tick_interval,
                        round,
                    ));
                }
                Command::StopClock => {
                    if let Some(clock) = self.clock.take() {
                        clock.cancel();
                    }
                }
                Command::ClearCanvas => self.canvas.clear(),
                Command::Predict { round } => self.predictor.invoke(round, self.canvas.snapshot()),
                Command::ScheduleAdvance { round, after } => {
                    schedule_advance(self.events.clone(), round, after)
                }
                Command::Show(notice) => self.screen.show(notice),
                Command::Narrate(text) => self.narrator.speak(&text),
                Command::CancelNarration => self.narrator.cancel(),
                Command::RecordResult(summary) => self.record(summary),
            }
        }
    }

    fn record(&self, summary: Summary) {
        let Some(log) = &self.results else {
            return;
        };
        if let Err(err) = log.append(&summary, Local::now()) {
            tracing::warn!(path = %log.path().display(), %err, "could not save results");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifierError, WordSourceError};
    use crate::matcher::Matcher;
    use crate::narration::SilentNarrator;
    use crate::session::{SessionConfig, SessionState, Tone};
    use crate::surface::Snapshot;
    use std::sync::mpsc::{self, Receiver};

    struct FixedWord(&'static str);

    impl WordSource for FixedWord {
        fn fetch_target_word(&self) -> Result<String, WordSourceError> {
            Ok(self.0.to_string())
        }
    }

    struct FixedLabel(&'static str);

    impl Classifier for FixedLabel {
        fn classify(&self, _image: &Snapshot) -> Result<String, ClassifierError> {
            Ok(self.0.to_string())
        }
    }

    fn key(code: KeyCode) -> GameEvent {
        GameEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> GameEvent {
        GameEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn test_app() -> (App, Receiver<GameEvent>) {
        let (tx, rx) = mpsc::channel();
        let session = Session::new(SessionConfig::default(), Matcher::builtin().unwrap());
        let mut app = App::new(
            session,
            Canvas::new(64, 48),
            Collaborators {
                words: Arc::new(FixedWord("dog")),
                classifier: Arc::new(FixedLabel("a cat")),
                narrator: Box::new(SilentNarrator),
            },
            tx,
            Duration::from_secs(60),
        );
        app.resize(Rect::new(0, 0, 80, 24));
        (app, rx)
    }

    fn next_event(rx: &Receiver<GameEvent>) -> GameEvent {
        rx.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    fn centre(app: &App) -> (u16, u16) {
        let vp = app.viewport();
        (vp.x + vp.width / 2, vp.y + vp.height / 2)
    }

    #[test]
    fn space_starts_and_word_activates_round() {
        let (mut app, rx) = test_app();
        assert_eq!(app.handle(key(KeyCode::Char(' '))), Flow::Continue);
        assert_eq!(app.session().state(), SessionState::Running);
        assert_eq!(app.screen().message, "Loading word...");

        let fetched = next_event(&rx);
        assert!(matches!(fetched, GameEvent::WordFetched { .. }));
        app.handle(fetched);

        assert!(app.session().accepts_drawing());
        assert_eq!(app.screen().target.as_deref(), Some("dog"));
        assert_eq!(app.screen().timer, Some(20));
        assert_eq!(app.clock_round(), app.session().round().map(|r| r.id()));
    }

    #[test]
    fn drawing_ignored_until_round_active() {
        let (mut app, rx) = test_app();
        let (col, row) = centre(&app);

        app.handle(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
        assert!(!app.canvas().has_drawn());

        app.handle(key(KeyCode::Char(' ')));
        app.handle(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
        assert!(!app.canvas().has_drawn(), "still loading");

        app.handle(next_event(&rx));
        app.handle(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
        app.handle(mouse(MouseEventKind::Drag(MouseButton::Left), col + 3, row + 1));
        app.handle(mouse(MouseEventKind::Up(MouseButton::Left), col + 3, row + 1));

        assert!(app.canvas().has_drawn());
        assert!(app.session().round().unwrap().input().has_drawn());
    }

    #[test]
    fn clear_key_wipes_canvas() {
        let (mut app, rx) = test_app();
        app.handle(key(KeyCode::Char(' ')));
        app.handle(next_event(&rx));

        let (col, row) = centre(&app);
        app.handle(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
        app.handle(mouse(MouseEventKind::Up(MouseButton::Left), col, row));
        assert!(app.canvas().has_drawn());

        app.handle(key(KeyCode::Char('c')));
        assert!(!app.canvas().has_drawn());
        assert!(!app.session().round().unwrap().input().has_drawn());
        assert_eq!(app.screen().message, "Start drawing...");
    }

    #[test]
    fn clicks_outside_canvas_do_nothing() {
        let (mut app, rx) = test_app();
        app.handle(key(KeyCode::Char(' ')));
        app.handle(next_event(&rx));

        app.handle(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0));
        assert!(!app.canvas().has_drawn());
    }

    #[test]
    fn restart_replaces_live_round() {
        let (mut app, rx) = test_app();
        app.handle(key(KeyCode::Char(' ')));
        let first = next_event(&rx);
        let first_round = app.session().round().unwrap().id();

        app.handle(key(KeyCode::Char('r')));
        let second_round = app.session().round().unwrap().id();
        assert_ne!(first_round, second_round);

        // the first fetch arrives late and is ignored
        app.handle(first);
        assert!(!app.session().accepts_drawing());
        assert_eq!(app.clock_round(), None);

        app.handle(next_event(&rx));
        assert!(app.session().accepts_drawing());
        assert_eq!(app.clock_round(), Some(second_round));
    }

    #[test]
    fn missed_prediction_is_shown() {
        let (mut app, rx) = test_app();
        app.handle(key(KeyCode::Char(' ')));
        app.handle(next_event(&rx));
        let round = app.session().round().unwrap().id();

        app.handle(GameEvent::PredictionDone {
            round,
            result: Ok("cat".to_string()),
        });
        assert_eq!(app.screen().message, "Prediction: cat");
        assert_eq!(app.screen().tone, Tone::Neutral);
    }

    #[test]
    fn esc_and_ctrl_c_quit() {
        let (mut app, _rx) = test_app();
        assert_eq!(app.handle(key(KeyCode::Esc)), Flow::Quit);

        let (mut app, _rx) = test_app();
        let ctrl_c = GameEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(app.handle(ctrl_c), Flow::Quit);
    }

    #[test]
    fn resize_moves_viewport() {
        let (mut app, _rx) = test_app();
        let before = app.viewport();
        app.handle(GameEvent::Resize(120, 40));
        assert_ne!(app.viewport(), before);
        assert!(app.viewport().width > before.width);
    }
}
