pub mod screen;

pub use screen::{PresentationSink, Screen};

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas as BrailleCanvas, Points},
        Block, Borders, Clear, Paragraph, Widget, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::session::Tone;
use crate::surface::Viewport;

const HORIZONTAL_MARGIN: u16 = 2;
const ORANGE: Color = Color::Rgb(255, 165, 0);
const HELP: &str = "(space) start / (r)estart / (c)lear / (esc)ape";

struct Regions {
    header: Rect,
    status: Rect,
    canvas: Rect,
    footer: Rect,
}

fn regions(area: Rect) -> Regions {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1), // round + target
            Constraint::Length(1), // timer + prediction
            Constraint::Min(3),    // drawing area
            Constraint::Length(1), // help
        ])
        .split(area);
    Regions {
        header: chunks[0],
        status: chunks[1],
        canvas: chunks[2],
        footer: chunks[3],
    }
}

fn canvas_block() -> Block<'static> {
    Block::default().borders(Borders::ALL).title(" draw here ")
}

/// Terminal cells the player can draw in for a frame of size `area`
pub fn canvas_viewport(area: Rect) -> Viewport {
    let inner = canvas_block().inner(regions(area).canvas);
    Viewport {
        x: inner.x,
        y: inner.y,
        width: inner.width,
        height: inner.height,
    }
}

pub fn timer_style(secs: u32) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match secs {
        0..=5 => bold.fg(Color::Red),
        6..=10 => Style::default().fg(ORANGE),
        _ => Style::default().fg(Color::Green),
    }
}

pub fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Neutral => Style::default(),
        Tone::Success => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        Tone::Error => Style::default().fg(Color::Red),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_banner(lines: &[(&str, Style)], border: Style, area: Rect, buf: &mut Buffer) {
    let width = lines.iter().map(|(text, _)| text.width()).max().unwrap_or(0) as u16 + 4;
    let banner = centered(area, width, lines.len() as u16 + 2);
    Clear.render(banner, buf);
    let text: Vec<Line> = lines
        .iter()
        .map(|(text, style)| Line::from(Span::styled(*text, *style)))
        .collect();
    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).border_style(border))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(banner, buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let screen = self.screen();
        let regions = regions(area);
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let header = match (&screen.round, &screen.target) {
            (Some((index, max)), Some(target)) => Line::from(vec![
                Span::styled(format!("Round {index}/{max}"), bold_style),
                Span::raw("   Draw: "),
                Span::styled(target.clone(), bold_style.fg(Color::Cyan)),
            ]),
            (Some((index, max)), None) => Line::from(vec![
                Span::styled(format!("Round {index}/{max}"), bold_style),
                Span::styled("   Get ready...", dim_style),
            ]),
            _ => Line::from(Span::styled("doodle", bold_style.fg(Color::Magenta))),
        };
        Paragraph::new(header).render(regions.header, buf);

        let mut status = Vec::new();
        if let Some(secs) = screen.timer {
            status.push(Span::styled(format!("Time: {secs}s"), timer_style(secs)));
            status.push(Span::raw("   "));
        }
        status.push(Span::styled(screen.message.as_str(), tone_style(screen.tone)));
        Paragraph::new(Line::from(status)).render(regions.status, buf);

        let canvas = self.canvas();
        let (width, height) = (canvas.width() as f64, canvas.height() as f64);
        // braille canvas has y growing upwards
        let coords: Vec<(f64, f64)> = canvas
            .inked()
            .map(|(x, y)| (x as f64 + 0.5, height - y as f64 - 0.5))
            .collect();
        BrailleCanvas::default()
            .block(canvas_block())
            .marker(Marker::Braille)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(|ctx| {
                ctx.draw(&Points {
                    coords: &coords,
                    color: Color::White,
                })
            })
            .render(regions.canvas, buf);

        Paragraph::new(Span::styled(HELP, dim_style.add_modifier(Modifier::ITALIC)))
            .render(regions.footer, buf);

        if let Some(reason) = &screen.fatal {
            let red = Style::default().fg(Color::Red);
            let message = format!("Error: {reason}");
            render_banner(
                &[(message.as_str(), red), ("(space) to try again", dim_style)],
                red,
                regions.canvas,
                buf,
            );
        } else if let Some(summary) = &screen.game_over {
            let yellow = bold_style.fg(Color::Yellow);
            let headline = summary.headline();
            render_banner(
                &[(headline.as_str(), yellow), ("(space) play again / (esc)ape", dim_style)],
                yellow,
                regions.canvas,
                buf,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Collaborators;
    use crate::error::{ClassifierError, WordSourceError};
    use crate::matcher::Matcher;
    use crate::narration::SilentNarrator;
    use crate::prediction::Classifier;
    use crate::session::{Session, SessionConfig};
    use crate::surface::{Canvas, Snapshot};
    use crate::words::WordSource;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    struct NoWords;

    impl WordSource for NoWords {
        fn fetch_target_word(&self) -> Result<String, WordSourceError> {
            Err(WordSourceError::Exhausted)
        }
    }

    struct NoLabel;

    impl Classifier for NoLabel {
        fn classify(&self, _image: &Snapshot) -> Result<String, ClassifierError> {
            Err(ClassifierError::Status(500))
        }
    }

    fn create_test_app() -> App {
        let (tx, _rx) = mpsc::channel();
        App::new(
            Session::new(SessionConfig::default(), Matcher::builtin().unwrap()),
            Canvas::new(64, 48),
            Collaborators {
                words: Arc::new(NoWords),
                classifier: Arc::new(NoLabel),
                narrator: Box::new(SilentNarrator),
            },
            tx,
            Duration::from_secs(1),
        )
    }

    fn rendered(app: &App, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_ui_idle_screen() {
        let app = create_test_app();
        let text = rendered(&app, Rect::new(0, 0, 80, 24));
        assert!(text.contains("Press Space to start"));
        assert!(text.contains("(r)estart"));
    }

    #[test]
    fn test_ui_small_area() {
        let app = create_test_app();
        let area = Rect::new(0, 0, 20, 5);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert_eq!(*buffer.area(), area);
    }

    #[test]
    fn test_viewport_inside_frame() {
        let area = Rect::new(0, 0, 80, 24);
        let vp = canvas_viewport(area);
        assert_eq!(vp.x, HORIZONTAL_MARGIN + 1);
        assert_eq!(vp.y, 3);
        assert_eq!(vp.width, 80 - 2 * HORIZONTAL_MARGIN - 2);
        assert_eq!(vp.height, 24 - 3 - 2);
    }

    #[test]
    fn test_timer_colours() {
        assert_eq!(timer_style(5).fg, Some(Color::Red));
        assert!(timer_style(3).add_modifier.contains(Modifier::BOLD));
        assert_eq!(timer_style(10).fg, Some(ORANGE));
        assert_eq!(timer_style(11).fg, Some(Color::Green));
    }

    #[test]
    fn test_centered_clamps() {
        let area = Rect::new(2, 2, 10, 4);
        let inner = centered(area, 40, 10);
        assert_eq!(inner, area);
    }
}
