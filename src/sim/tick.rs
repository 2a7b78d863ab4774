//! Fixed timestep simulation tick
//!
//! Core game loop that advances the simulation deterministically. Order
//! within a tick: due timers, hazard triggers and trap motion, player input
//! and physics, out-of-bounds, platforms, trap contact, death animation,
//! goal. Hazards therefore act before physics and physics before contact.

use serde::{Deserialize, Serialize};

use super::hazards;
use super::lifecycle;
use super::physics;
use super::scheduler::TimerAction;
use super::state::{DeathCause, GameEvent, GameState};
use super::transition;
use crate::audio::SoundCue;
use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH};

/// Held controls for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    /// Up arrow or jump button
    pub jump: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    if state.paused {
        return;
    }

    // Goal reached: the orchestrator owns the session until the next load
    if state.transition.is_some() {
        transition::advance(state);
        return;
    }

    state.timer += 1;

    for action in state.scheduler.advance() {
        match action {
            TimerAction::ReleaseInputLock => lifecycle::release_input_lock(state),
            action => hazards::apply_timer(state, action),
        }
    }
    hazards::update_triggers(state);
    hazards::update_traps(state);
    lifecycle::tick_popups(state);

    if state.life.is_alive() {
        step_player(state, input);
    }

    lifecycle::advance_death(state);

    if state.life.is_alive() && state.player.rect().overlaps(&state.goal.rect) {
        lifecycle::reach_goal(state);
    }
}

fn step_player(state: &mut GameState, input: &TickInput) {
    let input = if state.input_locked {
        TickInput::default()
    } else {
        *input
    };

    if physics::apply_input(&mut state.player, &input) {
        state.emit(GameEvent::Sound(SoundCue::Jump));
    }
    physics::integrate(&mut state.player);

    if state.player.rect().outside_field(CANVAS_WIDTH, CANVAS_HEIGHT) {
        lifecycle::kill(state, DeathCause::FellOut);
        return;
    }

    physics::resolve_platforms(&mut state.player, &state.platforms, &state.traps);

    if let Some(index) = physics::touching_trap(&state.player, &state.traps) {
        log::debug!("Player touched trap {} ({:?})", index, state.traps[index].kind);
        lifecycle::kill(state, DeathCause::Trap);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::consts::{EXPLOSION_TICKS, MAX_LIVES, RESPAWN_LOCK_MS};
    use crate::level::{LevelDescriptor, TrapKind};
    use crate::ms_to_ticks;
    use crate::sim::lifecycle::Command;
    use crate::sim::state::LifeState;
    use crate::sim::state::fixtures::{flat_level, level_from};
    use crate::sim::transition::Transition;

    const IDLE: TickInput = TickInput {
        left: false,
        right: false,
        jump: false,
    };
    const RIGHT: TickInput = TickInput {
        left: false,
        right: true,
        jump: false,
    };
    const JUMP: TickInput = TickInput {
        left: false,
        right: false,
        jump: true,
    };

    fn run(state: &mut GameState, input: &TickInput, ticks: u32) {
        for _ in 0..ticks {
            tick(state, input);
        }
    }

    fn die_and_wait(state: &mut GameState) {
        lifecycle::kill(state, DeathCause::Trap);
        run(state, &IDLE, EXPLOSION_TICKS + 1);
    }

    /// Ground at y=520..540 across x 0..900, player resting at x=50
    fn ground_level() -> GameState {
        let desc = level_from(
            1,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [ { "x": 0, "y": 520, "width": 900, "height": 20 } ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(1, desc, 0).unwrap();
        tick(&mut state, &IDLE); // settle onto the ground
        state
    }

    fn spike_level() -> LevelDescriptor {
        level_from(
            2,
            r#"{
                "player": { "startX": 100, "startY": 420 },
                "platforms": [ { "x": 0, "y": 450, "width": 900, "height": 20 } ],
                "traps": [
                    { "x": 90, "y": 450, "width": 60, "height": 20, "type": "spikes" },
                    { "x": 95, "y": 450, "width": 60, "height": 20, "type": "spikes" }
                ],
                "goal": { "x": 850, "y": 400, "width": 40, "height": 50 }
            }"#,
        )
    }

    #[test]
    fn test_jump_arc_lands_again() {
        let mut state = ground_level();
        assert!(state.player.on_ground);
        assert_eq!(state.player.pos, Vec2::new(50.0, 490.0));

        tick(&mut state, &JUMP);
        // -10 from the jump plus one tick of gravity
        assert_eq!(state.player.vel.y, -9.5);
        assert!(!state.player.on_ground);
        assert!(state.drain_events().contains(&GameEvent::Sound(SoundCue::Jump)));

        run(&mut state, &IDLE, 20);
        assert!(state.player.vel.y > 0.0);

        run(&mut state, &IDLE, 40);
        assert!(state.player.on_ground);
        assert_eq!(state.player.vel.y, 0.0);
        assert_eq!(state.player.pos.y, 490.0);
    }

    #[test]
    fn test_walk_right() {
        let mut state = ground_level();
        run(&mut state, &RIGHT, 10);
        assert_eq!(state.player.pos.x, 80.0);
        assert!(state.player.on_ground);
    }

    #[test]
    fn test_spike_death_counts_once() {
        let mut state = GameState::new(2, spike_level(), 0).unwrap();
        // Player bottom at 450, spike region [430, 450] overlaps
        for _ in 0..10 {
            tick(&mut state, &IDLE);
        }
        assert_eq!(state.lives, MAX_LIVES - 1);
        assert_eq!(
            state.life,
            LifeState::Dead {
                cause: DeathCause::Trap
            }
        );
        let deaths = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::PlayerDied { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_fall_out_left_edge() {
        let mut state = ground_level();
        state.player.pos.x = -29.0;
        state.drain_events();
        run(&mut state, &TickInput { left: true, ..IDLE }, 1);
        assert_eq!(
            state.life,
            LifeState::Dead {
                cause: DeathCause::FellOut
            }
        );
        assert_eq!(state.lives, MAX_LIVES - 1);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::Sound(SoundCue::FallOutDeath)));
        assert!(!events.contains(&GameEvent::Sound(SoundCue::TrapDeath)));
        assert!(state.fall_out_popup_ticks > 0);
    }

    fn assert_fell_out(state: &mut GameState) {
        assert_eq!(
            state.life,
            LifeState::Dead {
                cause: DeathCause::FellOut
            }
        );
        assert_eq!(state.lives, MAX_LIVES - 1);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::Sound(SoundCue::FallOutDeath)));
        assert!(events.contains(&GameEvent::PlayerDied {
            cause: DeathCause::FellOut,
            lives: MAX_LIVES - 1
        }));
    }

    #[test]
    fn test_fall_out_bottom_through_gap() {
        let desc = level_from(
            1,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [ { "x": 400, "y": 520, "width": 500, "height": 20 } ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(1, desc, 0).unwrap();
        state.drain_events();
        let mut ticks = 0;
        while state.life.is_alive() && ticks < 120 {
            tick(&mut state, &IDLE);
            ticks += 1;
        }
        assert!(state.player.pos.y > CANVAS_HEIGHT);
        assert_fell_out(&mut state);
    }

    #[test]
    fn test_fall_out_right_edge() {
        let mut state = ground_level();
        state.player.pos.x = CANVAS_WIDTH - 1.0;
        state.drain_events();
        tick(&mut state, &RIGHT);
        assert_fell_out(&mut state);
    }

    #[test]
    fn test_fall_out_top_edge() {
        let mut state = ground_level();
        state.player.pos.y = -25.0;
        state.player.vel.y = -10.0;
        state.player.on_ground = false;
        state.drain_events();
        tick(&mut state, &IDLE);
        assert_fell_out(&mut state);
    }

    #[test]
    fn test_hole_scenario() {
        let desc = level_from(
            6,
            r#"{
                "player": { "startX": 650, "startY": 420 },
                "platforms": [ { "x": 0, "y": 450, "width": 910, "height": 50 } ],
                "traps": [ { "x": 700, "y": 450, "width": 80, "height": 50, "type": "moving_hole",
                             "hidden": true,
                             "movement": { "direction": "left", "triggerDistance": 90, "speed": 3 } } ],
                "goal": { "x": 850, "y": 400, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(6, desc, 0).unwrap();
        state.player.pos.x = 600.0;

        // 100 px away: hidden and still
        tick(&mut state, &RIGHT);
        assert!(state.traps[0].hidden);
        assert_eq!(state.traps[0].rect.x, 700.0);

        // x=603 now; 97 away, then 94, then 91: still out of range
        run(&mut state, &RIGHT, 3);
        assert!(state.traps[0].hidden);

        // 612 -> 88 away: revealed and creeping left
        tick(&mut state, &RIGHT);
        assert!(!state.traps[0].hidden);
        assert_eq!(state.traps[0].rect.x, 697.0);
        tick(&mut state, &RIGHT);
        assert_eq!(state.traps[0].rect.x, 694.0);
    }

    #[test]
    fn test_goal_scenario_mid_game() {
        let mut state = GameState::new(3, flat_level(), 0).unwrap();
        state.drain_events();
        state.player.pos = Vec2::new(830.0, 490.0);
        tick(&mut state, &IDLE);

        assert!(state.goal_reached);
        assert_eq!(state.life, LifeState::GoalReached);
        assert_eq!(state.player.pos, Vec2::new(855.0, 480.0));
        assert!(!state.is_simulating());
        assert_eq!(state.transition, Some(Transition::DoorClosing { ticks: 0 }));

        let events = state.drain_events();
        assert!(events.contains(&GameEvent::ProgressUnlocked { level: 4 }));
        assert!(events.contains(&GameEvent::Sound(SoundCue::GoalReached)));

        // The run timer stops while the door closes
        let timer = state.timer;
        run(&mut state, &IDLE, 5);
        assert_eq!(state.timer, timer);
    }

    #[test]
    fn test_goal_scenario_final_level() {
        let mut state = GameState::new(10, flat_level(), 0).unwrap();
        state.drain_events();
        state.player.pos = Vec2::new(830.0, 490.0);
        tick(&mut state, &IDLE);
        tick(&mut state, &IDLE);

        assert!(state.is_complete());
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::GameCompleted));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::ProgressUnlocked { .. })));
        let goal_events = events
            .iter()
            .filter(|e| matches!(e, GameEvent::GoalReached { .. }))
            .count();
        assert_eq!(goal_events, 1);
    }

    #[test]
    fn test_play_again_requests_new_run() {
        let mut state = GameState::new(10, flat_level(), 0).unwrap();
        state.player.pos = Vec2::new(830.0, 490.0);
        tick(&mut state, &IDLE);
        state.lives = 2;
        state.drain_events();

        lifecycle::apply_command(&mut state, Command::PlayAgain);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::ProgressReset));
        assert!(events.contains(&GameEvent::LevelRequested { level: 1 }));

        state.load_level(1, flat_level()).unwrap();
        assert_eq!(state.level, 1);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.timer, 0);
        assert!(state.transition.is_none());
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut state = ground_level();
        let before = state.player;
        let timer = state.timer;
        let now = state.scheduler.now();
        lifecycle::apply_command(&mut state, Command::Pause);
        run(&mut state, &RIGHT, 30);
        assert_eq!(state.player, before);
        assert_eq!(state.timer, timer);
        assert_eq!(state.scheduler.now(), now);

        lifecycle::apply_command(&mut state, Command::Resume);
        tick(&mut state, &RIGHT);
        assert_eq!(state.player.pos.x, before.pos.x + 3.0);
    }

    #[test]
    fn test_respawn_restores_level_and_releases_lock() {
        let mut state = GameState::new(2, spike_level(), 0).unwrap();
        run(&mut state, &IDLE, EXPLOSION_TICKS + 2);
        assert!(matches!(state.life, LifeState::AwaitingRestart { .. }));

        lifecycle::apply_command(&mut state, Command::AdvanceFromRestartPrompt);
        assert_eq!(state.life, LifeState::Respawning);
        assert_eq!(state.player.pos, Vec2::new(100.0, 420.0));
        assert_eq!(state.lives, MAX_LIVES - 1);
    }

    #[test]
    fn test_input_ignored_while_locked() {
        let mut state = ground_level();
        die_and_wait(&mut state);
        lifecycle::apply_command(&mut state, Command::AdvanceFromRestartPrompt);
        tick(&mut state, &IDLE);
        let x = state.player.pos.x;

        run(&mut state, &RIGHT, 10);
        assert_eq!(state.player.pos.x, x);

        let lock = ms_to_ticks(RESPAWN_LOCK_MS) as u32;
        run(&mut state, &IDLE, lock);
        assert_eq!(state.life, LifeState::Alive);
        assert!(!state.input_locked);
        tick(&mut state, &RIGHT);
        assert_eq!(state.player.pos.x, x + 3.0);
    }

    /// Mid floor that disappears and a hidden hole that wakes up on sight
    fn shifting_level() -> LevelDescriptor {
        level_from(
            9,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [
                    { "x": 0, "y": 520, "width": 300, "height": 20 },
                    { "x": 300, "y": 520, "width": 300, "height": 20, "disappearing": true, "disappearDelay": 500 }
                ],
                "traps": [
                    { "x": 700, "y": 520, "width": 60, "height": 20, "type": "moving_hole",
                      "hidden": true, "movement": { "triggerDistance": 900, "speed": 2 } }
                ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        )
    }

    #[test]
    fn test_reload_restores_descriptor_values() {
        let desc = shifting_level();
        let mut state = GameState::new(9, desc, 0).unwrap();
        let pristine_platforms = state.platforms.clone();
        let pristine_traps = state.traps.clone();

        run(&mut state, &RIGHT, 60);
        assert!(state.platforms[1].disappeared);
        assert!(!state.traps[0].hidden);
        assert_ne!(state.traps[0].rect.x, 700.0);

        lifecycle::apply_command(&mut state, Command::RestartLevel);
        assert_eq!(state.platforms, pristine_platforms);
        assert_eq!(state.traps, pristine_traps);
        assert!(!state.hazards.is_started(0));
    }

    #[test]
    fn test_disappear_timer_does_not_leak_into_reload() {
        let desc = level_from(
            9,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [
                    { "x": 0, "y": 520, "width": 900, "height": 20, "disappearing": true, "disappearDelay": 200 }
                ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(9, desc, 0).unwrap();
        run(&mut state, &RIGHT, 3);
        assert!(state.hazards.is_started(0));

        // Restart before the floor goes; the old timer must not fire
        lifecycle::apply_command(&mut state, Command::RestartLevel);
        run(&mut state, &IDLE, 30);
        assert!(!state.platforms[0].disappeared);
    }

    #[test]
    fn test_appear_after_move_reveals_then_reverses() {
        let desc = level_from(
            7,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [ { "x": 0, "y": 520, "width": 900, "height": 20 } ],
                "traps": [ { "x": 600, "y": 520, "width": 40, "height": 20, "type": "moving_spikes",
                             "appearAfterMove": true,
                             "movement": { "direction": "right", "speed": 1, "triggerDelay": 100 } } ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(7, desc, 0).unwrap();
        tick(&mut state, &IDLE);
        assert!(!state.hazards.is_started(0));

        // Triggers see the velocity carried out of the previous tick
        tick(&mut state, &RIGHT);
        tick(&mut state, &IDLE);
        assert!(state.hazards.is_started(0));
        assert!(state.traps[0].hidden);

        run(&mut state, &IDLE, ms_to_ticks(100) as u32);
        assert!(!state.traps[0].hidden);
        let x = state.traps[0].rect.x;
        tick(&mut state, &IDLE);
        assert_eq!(state.traps[0].rect.x, x + 1.0);

        run(&mut state, &IDLE, ms_to_ticks(6000) as u32);
        let x = state.traps[0].rect.x;
        tick(&mut state, &IDLE);
        assert_eq!(state.traps[0].rect.x, x - 1.0);
    }

    #[test]
    fn test_unbounded_trigger_delay_never_reveals() {
        let desc = level_from(
            7,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [ { "x": 0, "y": 520, "width": 900, "height": 20 } ],
                "traps": [ { "x": 600, "y": 520, "width": 40, "height": 20, "type": "moving_spikes",
                             "appearAfterMove": true,
                             "movement": { "direction": "right", "speed": 1,
                                           "triggerDelay": 18446744073709551615 } } ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(7, desc, 0).unwrap();
        tick(&mut state, &IDLE);
        run(&mut state, &RIGHT, 3);
        assert!(state.hazards.is_started(0));

        run(&mut state, &IDLE, 600);
        assert!(state.traps[0].hidden);
        assert_eq!(state.traps[0].rect.x, 600.0);
    }

    #[test]
    fn test_timed_spike_spawning() {
        let desc = level_from(
            5,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [
                    { "x": 0, "y": 520, "width": 100, "height": 20 },
                    { "x": 200, "y": 500, "width": 100, "height": 20 },
                    { "x": 400, "y": 480, "width": 100, "height": 20 }
                ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(5, desc, 0).unwrap();
        run(&mut state, &IDLE, ms_to_ticks(3000) as u32);
        assert!(state.traps.is_empty());

        run(&mut state, &IDLE, ms_to_ticks(1000) as u32);
        assert_eq!(state.traps.len(), 1);
        assert_eq!(state.traps[0].kind, TrapKind::Spikes);
        assert_eq!(state.traps[0].rect.x, 30.0);
        assert_eq!(state.traps[0].rect.y, 500.0);

        run(&mut state, &IDLE, ms_to_ticks(2000) as u32);
        assert_eq!(state.traps.len(), 3);
        assert_eq!(state.traps[2].rect.x, 430.0);
    }

    #[test]
    fn test_dots_start_after_delay() {
        let desc = level_from(
            10,
            r#"{
                "player": { "startX": 50, "startY": 490 },
                "platforms": [ { "x": 0, "y": 520, "width": 900, "height": 20 } ],
                "traps": [ { "x": 400, "y": 100, "width": 10, "height": 10,
                             "type": "movingDot", "direction": "left", "speed": 2 } ],
                "goal": { "x": 850, "y": 470, "width": 40, "height": 50 }
            }"#,
        );
        let mut state = GameState::new(10, desc, 0).unwrap();
        run(&mut state, &IDLE, ms_to_ticks(4000) as u32 - 1);
        assert_eq!(state.traps[0].rect.x, 400.0);
        assert!(!state.traps[0].moving);

        tick(&mut state, &IDLE);
        assert!(state.traps[0].moving);
        assert_eq!(state.traps[0].rect.x, 398.0);
        run(&mut state, &IDLE, 10);
        assert_eq!(state.traps[0].rect.x, 378.0);
    }

    #[test]
    fn test_timer_counts_while_dead() {
        let mut state = ground_level();
        let timer = state.timer;
        lifecycle::kill(&mut state, DeathCause::Trap);
        run(&mut state, &IDLE, 5);
        assert_eq!(state.timer, timer + 5);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(2, spike_level(), 42).unwrap();
        let mut b = GameState::new(2, spike_level(), 42).unwrap();
        let inputs = [RIGHT, JUMP, IDLE, RIGHT];
        for input in inputs.iter().cycle().take(200) {
            tick(&mut a, input);
            tick(&mut b, input);
        }
        assert_eq!(a.player, b.player);
        assert_eq!(a.lives, b.lives);
        assert_eq!(a.traps, b.traps);
    }

    fn input_strategy() -> impl Strategy<Value = TickInput> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(left, right, jump)| TickInput {
            left,
            right,
            jump,
        })
    }

    proptest! {
        #[test]
        fn prop_lives_never_increase_without_reset(
            inputs in proptest::collection::vec(input_strategy(), 1..400),
            restart_every in 30usize..120,
        ) {
            let mut state = GameState::new(2, spike_level(), 0).unwrap();
            let mut last = state.lives;
            for (i, input) in inputs.iter().enumerate() {
                if i % restart_every == 0 {
                    lifecycle::apply_command(&mut state, Command::AdvanceFromRestartPrompt);
                }
                tick(&mut state, input);
                prop_assert!(state.lives <= last);
                prop_assert!(state.lives <= MAX_LIVES);
                last = state.lives;
            }
        }

        #[test]
        fn prop_restart_restores_pristine_level(
            inputs in proptest::collection::vec(input_strategy(), 0..300),
        ) {
            let pristine = GameState::new(9, shifting_level(), 0).unwrap();
            let mut state = GameState::new(9, shifting_level(), 0).unwrap();
            for input in &inputs {
                tick(&mut state, input);
            }
            prop_assume!(state.transition.is_none());

            lifecycle::apply_command(&mut state, Command::RestartLevel);
            prop_assert_eq!(&state.platforms, &pristine.platforms);
            prop_assert_eq!(&state.traps, &pristine.traps);
            prop_assert_eq!(state.player.pos, pristine.player.pos);
        }

        #[test]
        fn prop_falling_player_comes_to_rest(start_y in 300.0f32..480.0, start_x in 10.0f32..800.0) {
            let mut state = GameState::new(1, flat_level(), 0).unwrap();
            state.player.pos = Vec2::new(start_x, start_y);
            run(&mut state, &IDLE, 120);
            prop_assert!(state.player.on_ground);
            prop_assert_eq!(state.player.vel.y, 0.0);
            prop_assert_eq!(state.player.pos.y, 490.0);
        }
    }
}
