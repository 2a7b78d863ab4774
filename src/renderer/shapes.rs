//! Shape generation for 2D primitives

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{Color, Shape};
use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH, ELEVATOR_LAYERS, MAX_LIVES};
use crate::sim::geometry::Rect;
use crate::sim::state::Player;

pub const PLAYER_COLOR: Color = rgb(0xF5, 0xF5, 0xDC);
pub const PLATFORM_COLOR: Color = rgb(0xF4, 0xA4, 0x60);
pub const SPIKE_COLOR: Color = rgb(0x8B, 0x45, 0x13);
pub const HOLE_COLOR: Color = rgb(0x00, 0x00, 0x00);
pub const TRAP_COLOR: Color = rgb(0xFF, 0x45, 0x00);
pub const GOAL_COLOR: Color = rgb(0xC0, 0xC0, 0xC0);
pub const BACKGROUND_COLOR: Color = rgb(0x00, 0x00, 0x00);
pub const DOOR_COLOR: Color = rgb(0x70, 0x70, 0x70);

/// Elevator layer colors, bottom to top
const ELEVATOR_COLORS: [Color; 3] = [
    rgb(0x44, 0x44, 0x44),
    rgb(0x66, 0x66, 0x66),
    rgb(0x88, 0x88, 0x88),
];

/// Spike teeth are this wide
const SPIKE_TOOTH_WIDTH: f32 = 10.0;

pub const DEBRIS_PIECES: usize = 30;
/// Debris fades out over 40 ticks
const DEBRIS_FADE_PER_TICK: f32 = 0.025;

const LIVES_BOX_SIZE: f32 = 18.0;
const LIVES_BOX_GAP: f32 = 6.0;
const LIVES_BOX_Y: f32 = 8.0;

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`, falling back on anything else
pub fn parse_color(hex: Option<&str>, fallback: Color) -> Color {
    let Some(digits) = hex.and_then(|h| h.strip_prefix('#')) else {
        return fallback;
    };
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);

    let parsed = match digits.len() {
        3 => {
            let mut c = [1.0; 4];
            for (i, ch) in digits.chars().enumerate() {
                let double: String = [ch, ch].iter().collect();
                c[i] = match channel(&double) {
                    Some(v) => v,
                    None => return fallback,
                };
            }
            Some(c)
        }
        6 | 8 => {
            let mut c = [1.0; 4];
            for i in 0..digits.len() / 2 {
                c[i] = match digits.get(i * 2..i * 2 + 2).and_then(channel) {
                    Some(v) => v,
                    None => return fallback,
                };
            }
            Some(c)
        }
        _ => None,
    };
    parsed.unwrap_or(fallback)
}

/// Spikes as a row of triangles rising from the anchor line, one per 10px
pub fn spike_teeth(rect: &Rect, color: Color) -> Vec<Shape> {
    let count = (rect.width / SPIKE_TOOTH_WIDTH).floor().max(0.0) as usize;
    (0..count)
        .map(|i| {
            let x = rect.x + i as f32 * SPIKE_TOOTH_WIDTH;
            Shape::Triangle {
                points: [
                    Vec2::new(x, rect.y),
                    Vec2::new(x + SPIKE_TOOTH_WIDTH / 2.0, rect.y - rect.height),
                    Vec2::new(x + SPIKE_TOOTH_WIDTH, rect.y),
                ],
                color,
            }
        })
        .collect()
}

/// Two panels sliding in from the goal's edges; they meet at progress 1
pub fn door_panels(goal: &Rect, progress: f32) -> [Rect; 2] {
    let half = goal.width / 2.0 * progress.clamp(0.0, 1.0);
    [
        Rect::new(goal.x, goal.y, half, goal.height),
        Rect::new(goal.right() - half, goal.y, half, goal.height),
    ]
}

/// Elevator layers scrolling up through the canvas
pub fn elevator_layers(progress: f32) -> Vec<Shape> {
    let layer_height = CANVAS_HEIGHT / ELEVATOR_LAYERS as f32;
    let offset = progress.clamp(0.0, 1.0) * (CANVAS_HEIGHT + layer_height);
    (0..ELEVATOR_LAYERS as usize)
        .map(|i| Shape::Rect {
            rect: Rect::new(
                0.0,
                CANVAS_HEIGHT - offset + i as f32 * layer_height,
                CANVAS_WIDTH,
                layer_height,
            ),
            color: ELEVATOR_COLORS[i % ELEVATOR_COLORS.len()],
        })
        .collect()
}

/// Backing panel and one box per life slot, centered at the top
pub fn lives_boxes() -> (Rect, Vec<Rect>) {
    let slots = MAX_LIVES as f32;
    let total = slots * LIVES_BOX_SIZE + (slots - 1.0) * LIVES_BOX_GAP;
    let start_x = (CANVAS_WIDTH - total) / 2.0;
    let panel = Rect::new(
        start_x - 8.0,
        LIVES_BOX_Y - 4.0,
        total + 16.0,
        LIVES_BOX_SIZE + 8.0,
    );
    let boxes = (0..MAX_LIVES)
        .map(|i| {
            Rect::new(
                start_x + i as f32 * (LIVES_BOX_SIZE + LIVES_BOX_GAP),
                LIVES_BOX_Y,
                LIVES_BOX_SIZE,
                LIVES_BOX_SIZE,
            )
        })
        .collect();
    (panel, boxes)
}

/// Pause button in the top-right corner
pub fn pause_button() -> Rect {
    Rect::new(CANVAS_WIDTH - 60.0, 16.0, 40.0, 40.0)
}

/// The two bars of the pause icon
pub fn pause_icon(button: &Rect) -> [Rect; 2] {
    [
        Rect::new(button.x + 10.0, button.y + 8.0, 6.0, 24.0),
        Rect::new(button.x + 24.0, button.y + 8.0, 6.0, 24.0),
    ]
}

/// One fragment of the death explosion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Debris {
    pub rect: Rect,
    pub opacity: f32,
}

/// Explosion fragments `ticks` into the animation. The same seed always
/// produces the same burst, so a frame can be rebuilt at any time.
pub fn debris(player: &Player, seed: u64, ticks: u32) -> Vec<Debris> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let size = (player.size.x / 7.0).floor().max(4.0);
    let t = ticks as f32;
    let opacity = (1.0 - DEBRIS_FADE_PER_TICK * t).max(0.0);

    (0..DEBRIS_PIECES)
        .map(|_| {
            let start = player.pos + Vec2::new(rng.random::<f32>(), rng.random::<f32>()) * player.size;
            let vel = Vec2::new(
                (rng.random::<f32>() - 0.5) * 8.0,
                (rng.random::<f32>() - 0.5) * 8.0 - 2.0,
            );
            let pos = start + vel * t;
            Debris {
                rect: Rect::new(pos.x, pos.y, size, size),
                opacity,
            }
        })
        .collect()
}
