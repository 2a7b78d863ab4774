//! Player kinematics and platform collision
//!
//! Velocities are in pixels per tick; there is no dt. One call of each
//! function below corresponds to one 60 Hz tick.

use super::state::{Platform, Player, Trap};
use super::tick::TickInput;
use crate::consts::{GRAVITY, JUMP_VELOCITY, MOVE_SPEED};
use crate::level::TrapKind;

/// Turn held directions into velocity. Left wins when both are held.
/// Returns true if a jump started this tick.
pub fn apply_input(player: &mut Player, input: &TickInput) -> bool {
    player.vel.x = if input.left {
        -MOVE_SPEED
    } else if input.right {
        MOVE_SPEED
    } else {
        0.0
    };

    if input.jump && player.on_ground {
        player.vel.y = JUMP_VELOCITY;
        player.on_ground = false;
        return true;
    }
    false
}

/// Apply gravity, then move
pub fn integrate(player: &mut Player) {
    player.vel.y += GRAVITY;
    player.pos += player.vel;
}

/// Whether the player currently stands inside a revealed hole's footprint.
/// Holes cut through whatever platform lies beneath them.
pub fn over_hole(player: &Player, traps: &[Trap]) -> bool {
    let p = player.rect();
    traps.iter().any(|t| {
        t.kind == TrapKind::MovingHole
            && !t.hidden
            && p.right() > t.rect.left()
            && p.left() < t.rect.right()
            && p.bottom() >= t.rect.top()
            && p.top() < t.rect.bottom()
    })
}

/// Land on platform tops and bump heads on platform bottoms.
///
/// Runs after integration. Landing requires that the player's bottom edge
/// crossed the platform top during this tick while falling; head bumps
/// require rising with the top edge inside the platform.
pub fn resolve_platforms(player: &mut Player, platforms: &[Platform], traps: &[Trap]) {
    player.on_ground = false;
    if over_hole(player, traps) {
        return;
    }

    for platform in platforms.iter().filter(|p| p.is_present()) {
        let r = platform.rect;

        let p = player.rect();
        if p.overlaps_x(&r)
            && p.bottom() > r.top()
            && p.bottom() - player.vel.y <= r.top()
            && player.vel.y > 0.0
        {
            player.pos.y = r.top() - player.size.y;
            player.vel.y = 0.0;
            player.on_ground = true;
        }

        let p = player.rect();
        if p.overlaps_x(&r) && p.top() < r.bottom() && p.top() > r.top() && player.vel.y < 0.0 {
            player.pos.y = r.bottom();
            player.vel.y = 0.0;
        }
    }
}

/// First lethal trap the player is touching, if any
pub fn touching_trap(player: &Player, traps: &[Trap]) -> Option<usize> {
    let p = player.rect();
    traps.iter().position(|t| t.hits(&p))
}
