//! Presentation snapshot
//!
//! The simulation never draws. Each frame the driver builds a [`Frame`] from
//! the game state and hands it to a [`RenderSink`]: a canvas backend in the
//! browser, the text renderer in the headless binary, or a recorder in tests.

pub mod shapes;

use std::io::Write;

use glam::Vec2;
use serde::Serialize;

use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH, MAX_LIVES};
use crate::level::TrapKind;
use crate::sim::geometry::Rect;
use crate::sim::state::{DeathCause, GameState, LifeState, Trap};
use shapes::Debris;

/// RGBA, 0..1 per channel
pub type Color = [f32; 4];

/// Drawable primitive in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Shape {
    Rect { rect: Rect, color: Color },
    /// Stroked rectangle (empty life slots)
    Outline { rect: Rect, color: Color },
    Triangle { points: [Vec2; 3], color: Color },
}

impl Shape {
    /// Axis-aligned bounds
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rect { rect, .. } | Shape::Outline { rect, .. } => *rect,
            Shape::Triangle { points, .. } => {
                let min = points[0].min(points[1]).min(points[2]);
                let max = points[0].max(points[1]).max(points[2]);
                Rect::from_pos_size(min, max - min)
            }
        }
    }
}

/// What a shape depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpriteKind {
    Platform,
    Trap(TrapKind),
    Goal,
    Door,
    Elevator,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sprite {
    pub kind: SpriteKind,
    pub shape: Shape,
}

/// How the player is shown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlayerView {
    Normal {
        rect: Rect,
        moving: bool,
        on_ground: bool,
    },
    /// Bursting apart after a death
    Exploding {
        ticks: u32,
        #[serde(skip)]
        debris: Vec<Debris>,
    },
    /// Controls still locked after a respawn
    Respawning { rect: Rect },
    /// Explosion over
    Hidden,
}

/// Modal messages over the playfield
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Overlay {
    /// "Tap or press any key"
    RestartPrompt,
    /// Out of lives; only reset helps
    ResetPopup,
    /// The player left the playfield
    FallOut,
    Paused,
    Victory,
    /// A level failed to load; retry is offered
    LoadError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub level: u32,
    pub seconds: u64,
    pub lives: u8,
    pub lives_panel: Rect,
    /// One per life slot; filled while the life remains
    pub lives_boxes: Vec<(Rect, bool)>,
    pub life_color: Color,
    pub pause_button: Rect,
    pub pause_icon: [Rect; 2],
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub background: Color,
    /// Level geometry in draw order
    pub sprites: Vec<Sprite>,
    pub player: PlayerView,
    pub player_color: Color,
    /// Door closing progress, when the door is animating
    pub door_progress: Option<f32>,
    /// Elevator ride progress, when riding
    pub elevator_progress: Option<f32>,
    pub hud: Hud,
    pub overlays: Vec<Overlay>,
}

impl Frame {
    /// Snapshot the state for drawing
    pub fn build(state: &GameState) -> Self {
        let mut sprites = Vec::new();

        for platform in state.platforms.iter().filter(|p| p.is_present()) {
            sprites.push(Sprite {
                kind: SpriteKind::Platform,
                shape: Shape::Rect {
                    rect: platform.rect,
                    color: shapes::parse_color(platform.color.as_deref(), shapes::PLATFORM_COLOR),
                },
            });
        }

        for trap in state.traps.iter().filter(|t| t.is_visible()) {
            trap_sprites(trap, &mut sprites);
        }

        sprites.push(Sprite {
            kind: SpriteKind::Goal,
            shape: Shape::Rect {
                rect: state.goal.rect,
                color: shapes::parse_color(state.goal.color.as_deref(), shapes::GOAL_COLOR),
            },
        });

        let transition = state.transition;
        let door_progress = transition.and_then(|t| t.door_progress());
        if let Some(progress) = door_progress {
            for rect in shapes::door_panels(&state.goal.rect, progress) {
                sprites.push(Sprite {
                    kind: SpriteKind::Door,
                    shape: Shape::Rect {
                        rect,
                        color: shapes::DOOR_COLOR,
                    },
                });
            }
        }

        let elevator_progress = transition.and_then(|t| t.elevator_progress());
        if let Some(progress) = elevator_progress {
            sprites.extend(shapes::elevator_layers(progress).into_iter().map(|shape| Sprite {
                kind: SpriteKind::Elevator,
                shape,
            }));
        }

        Self {
            background: shapes::parse_color(
                state.descriptor.background.color.as_deref(),
                shapes::BACKGROUND_COLOR,
            ),
            sprites,
            player: player_view(state),
            player_color: shapes::parse_color(
                state.descriptor.player.color.as_deref(),
                shapes::PLAYER_COLOR,
            ),
            door_progress,
            elevator_progress,
            hud: hud(state),
            overlays: overlays(state),
        }
    }

    pub fn has_overlay(&self, overlay: &Overlay) -> bool {
        self.overlays.contains(overlay)
    }
}

fn trap_sprites(trap: &Trap, sprites: &mut Vec<Sprite>) {
    let kind = SpriteKind::Trap(trap.kind);
    match trap.kind {
        TrapKind::Spikes | TrapKind::MovingSpikes => {
            let color = shapes::parse_color(trap.color.as_deref(), shapes::SPIKE_COLOR);
            sprites.extend(
                shapes::spike_teeth(&trap.rect, color)
                    .into_iter()
                    .map(|shape| Sprite { kind, shape }),
            );
        }
        TrapKind::MovingHole => sprites.push(Sprite {
            kind,
            shape: Shape::Rect {
                rect: trap.rect,
                color: shapes::parse_color(trap.color.as_deref(), shapes::HOLE_COLOR),
            },
        }),
        TrapKind::MovingDot | TrapKind::Generic => sprites.push(Sprite {
            kind,
            shape: Shape::Rect {
                rect: trap.rect,
                color: shapes::parse_color(trap.color.as_deref(), shapes::TRAP_COLOR),
            },
        }),
    }
}

/// Seed for the debris of the current death
fn debris_seed(state: &GameState) -> u64 {
    state
        .seed
        .wrapping_add((state.deaths as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn player_view(state: &GameState) -> PlayerView {
    let player = &state.player;
    match state.life {
        LifeState::Dead { .. } => PlayerView::Exploding {
            ticks: state.explosion_ticks,
            debris: shapes::debris(player, debris_seed(state), state.explosion_ticks),
        },
        LifeState::AwaitingRestart { .. } | LifeState::Exhausted { .. } => PlayerView::Hidden,
        LifeState::Respawning => PlayerView::Respawning {
            rect: player.rect(),
        },
        LifeState::Alive | LifeState::GoalReached => PlayerView::Normal {
            rect: player.rect(),
            moving: player.vel.x != 0.0,
            on_ground: player.on_ground,
        },
    }
}

fn hud(state: &GameState) -> Hud {
    let (lives_panel, boxes) = shapes::lives_boxes();
    let lives = state.lives.min(MAX_LIVES);
    let life_color = shapes::parse_color(
        state.platforms.first().and_then(|p| p.color.as_deref()),
        shapes::PLATFORM_COLOR,
    );
    let pause_button = shapes::pause_button();
    Hud {
        level: state.level,
        seconds: state.elapsed_seconds(),
        lives,
        lives_panel,
        lives_boxes: boxes
            .into_iter()
            .enumerate()
            .map(|(i, rect)| (rect, i < lives as usize))
            .collect(),
        life_color,
        pause_button,
        pause_icon: shapes::pause_icon(&pause_button),
    }
}

fn overlays(state: &GameState) -> Vec<Overlay> {
    let mut overlays = Vec::new();
    if let Some(error) = &state.load_error {
        overlays.push(Overlay::LoadError(error.clone()));
    }
    if state.is_complete() {
        overlays.push(Overlay::Victory);
    }
    if state.fall_out_popup_ticks > 0
        && state.life.death_cause() == Some(DeathCause::FellOut)
    {
        overlays.push(Overlay::FallOut);
    }
    match state.life {
        LifeState::AwaitingRestart { .. } => overlays.push(Overlay::RestartPrompt),
        LifeState::Exhausted { .. } => overlays.push(Overlay::ResetPopup),
        _ => {}
    }
    if state.paused {
        overlays.push(Overlay::Paused);
    }
    overlays
}

/// Anything that can present frames
pub trait RenderSink {
    fn present(&mut self, frame: &Frame);
}

/// Character-cell renderer for terminals and logs
pub struct TextRenderer<W: Write> {
    out: W,
    cols: usize,
    rows: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self::with_size(out, 91, 28)
    }

    pub fn with_size(out: W, cols: usize, rows: usize) -> Self {
        Self {
            out,
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderSink for TextRenderer<W> {
    fn present(&mut self, frame: &Frame) {
        let text = render_text(frame, self.cols, self.rows);
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            log::warn!("Failed to write frame: {}", e);
        }
    }
}

fn glyph(kind: SpriteKind) -> char {
    match kind {
        SpriteKind::Platform => '=',
        SpriteKind::Trap(TrapKind::Spikes | TrapKind::MovingSpikes) => '^',
        SpriteKind::Trap(TrapKind::MovingHole) => ' ',
        SpriteKind::Trap(TrapKind::MovingDot) => 'o',
        SpriteKind::Trap(TrapKind::Generic) => 'x',
        SpriteKind::Goal => 'D',
        SpriteKind::Door => '|',
        SpriteKind::Elevator => '%',
    }
}

/// Rasterize a frame into `rows` lines of `cols` characters, headed by a
/// status line and followed by any overlays
pub fn render_text(frame: &Frame, cols: usize, rows: usize) -> String {
    let mut grid = vec![vec!['.'; cols]; rows];
    let sx = cols as f32 / CANVAS_WIDTH;
    let sy = rows as f32 / CANVAS_HEIGHT;

    let mut fill = |rect: Rect, ch: char| {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let x0 = (rect.left() * sx).floor().max(0.0) as usize;
        let x1 = ((rect.right() * sx).ceil().max(0.0) as usize).min(cols);
        let y0 = (rect.top() * sy).floor().max(0.0) as usize;
        let y1 = ((rect.bottom() * sy).ceil().max(0.0) as usize).min(rows);
        for row in grid.iter_mut().take(y1).skip(y0) {
            for cell in row.iter_mut().take(x1).skip(x0) {
                *cell = ch;
            }
        }
    };

    for sprite in &frame.sprites {
        fill(sprite.shape.bounds(), glyph(sprite.kind));
    }
    match &frame.player {
        PlayerView::Normal { rect, .. } => fill(*rect, '@'),
        PlayerView::Respawning { rect } => fill(*rect, '&'),
        PlayerView::Exploding { debris, .. } => {
            for piece in debris.iter().filter(|d| d.opacity > 0.0) {
                fill(piece.rect, '*');
            }
        }
        PlayerView::Hidden => {}
    }

    let hud = &frame.hud;
    let lives: String = hud
        .lives_boxes
        .iter()
        .map(|(_, filled)| if *filled { '#' } else { '-' })
        .collect();
    let mut text = format!("Level: {}  Time: {}s  Lives: [{}]\n", hud.level, hud.seconds, lives);
    for row in grid {
        text.extend(row);
        text.push('\n');
    }
    for overlay in &frame.overlays {
        let line = match overlay {
            Overlay::RestartPrompt => "Tap or press any key".to_string(),
            Overlay::ResetPopup => "Out of lives! Press RESET".to_string(),
            Overlay::FallOut => "You fell out!".to_string(),
            Overlay::Paused => "Paused".to_string(),
            Overlay::Victory => "You beat every level!".to_string(),
            Overlay::LoadError(e) => format!("Failed to load level: {}", e),
        };
        text.push_str(&line);
        text.push('\n');
    }
    text
}
