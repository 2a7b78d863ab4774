//! Sound cues and playback
//!
//! The simulation only names cues; an [`AudioManager`] forwards them to a
//! [`SoundSink`]. In the browser the sink synthesizes each cue with Web Audio
//! oscillators, so no sound files are needed. Natively cues are logged.

use serde::{Deserialize, Serialize};

/// Sound cue identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Jump started
    Jump,
    /// Killed by a trap
    TrapDeath,
    /// Left the playfield
    FallOutDeath,
    /// Touched the goal door
    GoalReached,
    /// Final level cleared
    Victory,
}

/// Something that can play cues
pub trait SoundSink {
    fn play(&mut self, cue: SoundCue);

    /// Silence anything still sounding
    fn stop_all(&mut self) {}
}

/// Sink that only logs; the native default
#[derive(Debug, Default)]
pub struct LogSink;

impl SoundSink for LogSink {
    fn play(&mut self, cue: SoundCue) {
        log::debug!("Sound cue: {:?}", cue);
    }
}

/// Audio manager for the game
pub struct AudioManager {
    sink: Box<dyn SoundSink>,
    enabled: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(default_sink())
    }
}

impl AudioManager {
    pub fn new(sink: Box<dyn SoundSink>) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    /// Mute/unmute all audio
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.sink.stop_all();
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Play a cue. Victory cuts off whatever else is playing.
    pub fn play(&mut self, cue: SoundCue) {
        if !self.enabled {
            return;
        }
        if cue == SoundCue::Victory {
            self.sink.stop_all();
        }
        self.sink.play(cue);
    }
}

/// Platform default sink
pub fn default_sink() -> Box<dyn SoundSink> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(web::WebAudioSink::new())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(LogSink)
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudioSink;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{SoundCue, SoundSink};

    /// Procedural Web Audio sink
    pub struct WebAudioSink {
        ctx: Option<AudioContext>,
        volume: f32,
        /// Oscillators that may still be sounding, with their stop time
        active: Vec<(OscillatorNode, f64)>,
    }

    impl Default for WebAudioSink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudioSink {
        pub fn new() -> Self {
            // Try to create audio context (may fail if not in secure context)
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                volume: 0.8,
                active: Vec::new(),
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// One enveloped note starting `delay` seconds from now
        fn note(
            &mut self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
            delay: f64,
            level: f32,
            length: f64,
        ) -> Option<OscillatorNode> {
            let (osc, gain) = Self::create_osc(ctx, freq, osc_type)?;
            let t = ctx.current_time() + delay;
            gain.gain().set_value_at_time(self.volume * level, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + length)
                .ok();
            osc.start_with_when(t).ok();
            osc.stop_with_when(t + length + 0.05).ok();
            self.active.push((osc.clone(), t + length + 0.05));
            Some(osc)
        }

        /// Jump - short rising chirp
        fn play_jump(&mut self, ctx: &AudioContext) {
            let Some(osc) = self.note(ctx, 300.0, OscillatorType::Square, 0.0, 0.2, 0.12) else {
                return;
            };
            let t = ctx.current_time();
            osc.frequency().set_value_at_time(300.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(600.0, t + 0.1)
                .ok();
        }

        /// Trap death - crunchy burst
        fn play_trap_death(&mut self, ctx: &AudioContext) {
            let t = ctx.current_time();
            if let Some(osc) = self.note(ctx, 100.0, OscillatorType::Sawtooth, 0.0, 0.5, 0.4) {
                osc.frequency().set_value_at_time(100.0, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(30.0, t + 0.4)
                    .ok();
            }
            // High crack on top
            self.note(ctx, 1500.0, OscillatorType::Square, 0.0, 0.2, 0.1);
        }

        /// Fall out - long descending whistle
        fn play_fall_out(&mut self, ctx: &AudioContext) {
            let Some(osc) = self.note(ctx, 800.0, OscillatorType::Sine, 0.0, 0.35, 0.7) else {
                return;
            };
            let t = ctx.current_time();
            osc.frequency().set_value_at_time(800.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(80.0, t + 0.7)
                .ok();
        }

        /// Goal - happy ding
        fn play_goal(&mut self, ctx: &AudioContext) {
            for (i, freq) in [600.0, 800.0, 1000.0].iter().enumerate() {
                self.note(ctx, *freq, OscillatorType::Sine, i as f64 * 0.08, 0.25, 0.15);
            }
        }

        /// Victory - triumphant fanfare
        fn play_victory(&mut self, ctx: &AudioContext) {
            for (i, freq) in [400.0, 500.0, 600.0, 800.0, 1000.0].iter().enumerate() {
                self.note(ctx, *freq, OscillatorType::Triangle, i as f64 * 0.12, 0.3, 0.4);
            }
        }
    }

    impl SoundSink for WebAudioSink {
        fn play(&mut self, cue: SoundCue) {
            let Some(ctx) = self.ctx.clone() else { return };

            // Resume context if suspended (browsers require user gesture)
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            let now = ctx.current_time();
            self.active.retain(|(_, end)| *end > now);

            match cue {
                SoundCue::Jump => self.play_jump(&ctx),
                SoundCue::TrapDeath => self.play_trap_death(&ctx),
                SoundCue::FallOutDeath => self.play_fall_out(&ctx),
                SoundCue::GoalReached => self.play_goal(&ctx),
                SoundCue::Victory => self.play_victory(&ctx),
            }
        }

        fn stop_all(&mut self) {
            for (osc, _) in self.active.drain(..) {
                osc.stop().ok();
            }
        }
    }
}
