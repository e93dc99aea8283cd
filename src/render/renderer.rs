use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, Paragraph,
        canvas::{Canvas, Context, Line as CanvasLine, Rectangle},
    },
};

use crate::evolve::FrameView;
use crate::game::{Base, Bird, GameConfig, GameState, MenuChoice, Pipe};

/// Horizontal spacing of the strokes that fill solid shapes
const FILL_STEP: f64 = 6.0;
/// Length of the heading stroke drawn from the bird's center
const HEADING_LENGTH: f64 = 40.0;

/// Everything drawn inside the play area
pub struct Scene<'a> {
    pub birds: Vec<&'a Bird>,
    pub pipes: &'a [Pipe],
    pub base: &'a Base,
}

impl<'a> Scene<'a> {
    /// The single bird of a human or replay game
    pub fn from_state(state: &'a GameState) -> Self {
        Self {
            birds: vec![&state.bird],
            pipes: &state.pipes,
            base: &state.base,
        }
    }

    /// Every bird still flying in a training generation
    pub fn from_frame(view: &FrameView<'a>) -> Self {
        Self {
            birds: view
                .contestants
                .iter()
                .filter(|c| c.alive)
                .map(|c| &c.bird)
                .collect(),
            pipes: view.pipes,
            base: view.base,
        }
    }
}

/// Dialog drawn over the play area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    GameOver { score: u32 },
    Menu { selected: MenuChoice, score: u32 },
    Paused,
}

/// Draws the world on a braille canvas with world y flipped upward
pub struct Renderer {
    width: f64,
    height: f64,
    floor_y: f64,
}

impl Renderer {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            width: config.window_width,
            height: config.window_height,
            floor_y: config.floor_y,
        }
    }

    pub fn render(
        &self,
        frame: &mut Frame,
        scene: &Scene<'_>,
        hud: &[(&str, String)],
        overlay: Overlay,
        controls: &[(&str, &str)],
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // HUD
                Constraint::Min(0),    // Play area
                Constraint::Length(1), // Controls
            ])
            .split(frame.area());

        frame.render_widget(self.render_hud(hud), chunks[0]);

        let play_area = self.play_area(chunks[1]);
        frame.render_widget(self.render_world(scene), play_area);

        match overlay {
            Overlay::None => {}
            Overlay::GameOver { score } => {
                self.render_dialog(frame, play_area, self.game_over_lines(score), Color::Red)
            }
            Overlay::Menu { selected, score } => self.render_dialog(
                frame,
                play_area,
                self.menu_lines(selected, score),
                Color::Yellow,
            ),
            Overlay::Paused => {
                let lines = vec![Line::from(Span::styled(
                    "PAUSED",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))];
                self.render_dialog(frame, play_area, lines, Color::Yellow)
            }
        }

        frame.render_widget(self.render_controls(controls), chunks[2]);
    }

    /// Keep the play area close to the world's aspect ratio.
    /// Terminal cells are about twice as tall as they are wide.
    fn play_area(&self, area: Rect) -> Rect {
        let wanted = (f64::from(area.height) * 2.0 * self.width / self.height).round() as u16;
        let width = wanted.clamp(1, area.width.max(1));
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        Rect::new(x, area.y, width, area.height)
    }

    fn render_world<'a>(&'a self, scene: &'a Scene<'a>) -> impl ratatui::widgets::Widget + 'a {
        Canvas::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(Color::White))
                    .title(" Flappy Bird "),
            )
            .marker(Marker::Braille)
            .x_bounds([0.0, self.width])
            .y_bounds([0.0, self.height])
            .paint(move |ctx| {
                for pipe in scene.pipes {
                    self.draw_pipe(ctx, pipe);
                }
                self.draw_base(ctx, scene.base);
                for bird in &scene.birds {
                    self.draw_bird(ctx, bird);
                }
            })
    }

    /// World y grows downward, the canvas grows upward
    fn flip(&self, y: f64) -> f64 {
        self.height - y
    }

    /// Fill the world-space box spanning `[x0, x1] x [top, bottom]`, clipped to the window
    fn fill_box(&self, ctx: &mut Context, x0: f64, x1: f64, top: f64, bottom: f64, color: Color) {
        let left = x0.max(0.0);
        let right = x1.min(self.width);
        let top = top.max(0.0);
        let bottom = bottom.min(self.height);
        if right <= left || bottom <= top {
            return;
        }

        ctx.draw(&Rectangle {
            x: left,
            y: self.flip(bottom),
            width: right - left,
            height: bottom - top,
            color,
        });

        let mut x = left + FILL_STEP;
        while x < right {
            ctx.draw(&CanvasLine {
                x1: x,
                y1: self.flip(bottom),
                x2: x,
                y2: self.flip(top),
                color,
            });
            x += FILL_STEP;
        }
    }

    fn draw_pipe(&self, ctx: &mut Context, pipe: &Pipe) {
        let right = pipe.right_edge();
        self.fill_box(ctx, pipe.x, right, 0.0, pipe.height, Color::Green);
        self.fill_box(ctx, pipe.x, right, pipe.bottom, self.floor_y, Color::Green);
    }

    fn draw_base(&self, ctx: &mut Context, base: &Base) {
        for tile in base.tiles() {
            let right = tile + base.tile_width();
            self.fill_box(ctx, tile, right, base.y, self.height, Color::LightYellow);
        }
    }

    fn draw_bird(&self, ctx: &mut Context, bird: &Bird) {
        self.fill_box(ctx, bird.x, bird.x + bird.width(), bird.y, bird.bottom(), Color::Yellow);

        let cx = bird.x + bird.width() / 2.0;
        let cy = bird.y + bird.height() / 2.0;
        let angle = bird.tilt.to_radians();
        ctx.draw(&CanvasLine {
            x1: cx,
            y1: self.flip(cy),
            x2: cx + HEADING_LENGTH * angle.cos(),
            y2: self.flip(cy) + HEADING_LENGTH * angle.sin(),
            color: Color::Red,
        });
    }

    fn render_hud(&self, hud: &[(&str, String)]) -> Paragraph<'_> {
        let mut spans = Vec::with_capacity(hud.len() * 3);
        for (i, (label, value)) in hud.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("    "));
            }
            spans.push(Span::styled(
                format!("{}: ", label),
                Style::default().fg(Color::Yellow),
            ));
            spans.push(Span::styled(
                value.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
    }

    fn render_controls(&self, controls: &[(&str, &str)]) -> Paragraph<'_> {
        let mut spans = Vec::with_capacity(controls.len() * 3);
        for (i, (key, action)) in controls.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" | "));
            }
            spans.push(Span::styled(key.to_string(), Style::default().fg(Color::Cyan)));
            spans.push(Span::raw(format!(" {}", action)));
        }

        Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
    }

    fn game_over_lines(&self, score: u32) -> Vec<Line<'static>> {
        vec![
            Line::from(Span::styled(
                "GAME OVER",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("Final Score: ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    score.to_string(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
        ]
    }

    fn menu_lines(&self, selected: MenuChoice, score: u32) -> Vec<Line<'static>> {
        let entry = |choice: MenuChoice, label: &'static str| {
            if choice == selected {
                Line::from(Span::styled(
                    format!("> {} <", label),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(label, Style::default().fg(Color::Gray)))
            }
        };

        vec![
            Line::from(vec![
                Span::styled("Score: ", Style::default().fg(Color::Yellow)),
                Span::styled(score.to_string(), Style::default().fg(Color::White)),
            ]),
            Line::from(""),
            entry(MenuChoice::Restart, "Restart"),
            entry(MenuChoice::Exit, "Exit"),
            Line::from(""),
            Line::from(vec![
                Span::styled("R", Style::default().fg(Color::Green)),
                Span::styled(" restart  ", Style::default().fg(Color::Gray)),
                Span::styled("Q", Style::default().fg(Color::Red)),
                Span::styled(" exit", Style::default().fg(Color::Gray)),
            ]),
        ]
    }

    fn render_dialog(&self, frame: &mut Frame, area: Rect, lines: Vec<Line<'static>>, color: Color) {
        let height = (lines.len() as u16 + 2).min(area.height);
        let width = 30.min(area.width);
        let dialog = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, dialog);
        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            ),
            dialog,
        );
    }
}
