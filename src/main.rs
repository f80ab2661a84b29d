use std::{
    error::Error,
    io::{self, stdin},
    sync::{mpsc::Sender, Arc},
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};

use doodle::{
    app::{App, Collaborators, Flow},
    app_dirs::AppDirs,
    classifier::HttpClassifier,
    cli::Cli,
    config::{Config, ConfigStore, FileConfigStore, WordSourceKind},
    history::ResultsLog,
    logging,
    matcher::Matcher,
    narration::{CommandNarrator, Narrator, SilentNarrator},
    prediction::Classifier,
    runtime::{spawn_terminal_reader, ChannelEventSource, FixedTicker, GameEvent, Runner},
    session::Session,
    surface::Canvas,
    words::{BuiltinWordSource, HttpWordSource, WordSource},
};

const FRAME_MS: u64 = 50;

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::from(&cli);

    if cli.save_config {
        let store = match &cli.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        store.save(&config)?;
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        // logging is optional, the game is not
        if let Err(err) = logging::init(&path) {
            eprintln!("doodle: logging disabled ({err})");
        }
    }
    tracing::info!(?config, "starting");

    let (event_source, tx) = ChannelEventSource::channel();
    let mut app = build_app(&config, tx.clone())?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    app.resize(Rect::new(0, 0, size.width, size.height));
    spawn_terminal_reader(tx);

    let runner = Runner::new(
        event_source,
        FixedTicker::new(Duration::from_millis(FRAME_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    tracing::info!("exiting");
    result
}

fn build_app(config: &Config, tx: Sender<GameEvent>) -> Result<App, Box<dyn Error>> {
    let timeout = config.request_timeout();
    let words: Arc<dyn WordSource> = match config.word_source {
        WordSourceKind::Builtin => Arc::new(BuiltinWordSource::from_vocabulary()?),
        WordSourceKind::Remote => Arc::new(HttpWordSource::new(&config.service_url, timeout)?),
    };
    let classifier: Arc<dyn Classifier> =
        Arc::new(HttpClassifier::new(&config.service_url, timeout)?);
    let narrator: Box<dyn Narrator> = match config
        .narration_command
        .as_deref()
        .and_then(CommandNarrator::from_command_line)
    {
        Some(narrator) => Box::new(narrator),
        None => Box::new(SilentNarrator),
    };

    let session = Session::new(config.session_config(), Matcher::builtin()?);
    let canvas = Canvas::new(config.canvas_width.max(1), config.canvas_height.max(1));
    let app = App::new(
        session,
        canvas,
        Collaborators {
            words,
            classifier,
            narrator,
        },
        tx,
        config.tick_interval(),
    );

    Ok(match AppDirs::history_path() {
        Some(path) => app.with_results_log(ResultsLog::new(path)),
        None => app,
    })
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<ChannelEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        if app.handle(runner.step()) == Flow::Quit {
            return Ok(());
        }
    }
}
