//! Browser front end: canvas drawing, keyboard/mouse input and the
//! requestAnimationFrame loop

use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent};

use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::game::Game;
use crate::renderer::{Color, Frame, Overlay, PlayerView, RenderSink, Shape, shapes};
use crate::settings::Settings;
use crate::sim::geometry::Rect;
use crate::sim::lifecycle::Command;
use crate::sim::state::LifeState;
use crate::sim::tick::TickInput;

fn css(color: Color) -> String {
    format!(
        "rgba({}, {}, {}, {})",
        (color[0] * 255.0).round() as u8,
        (color[1] * 255.0).round() as u8,
        (color[2] * 255.0).round() as u8,
        color[3]
    )
}

/// Canvas 2D render sink
pub struct CanvasRenderer {
    ctx: CanvasRenderingContext2d,
}

impl CanvasRenderer {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        canvas.set_width(CANVAS_WIDTH as u32);
        canvas.set_height(CANVAS_HEIGHT as u32);
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { ctx })
    }

    fn fill_rect(&self, rect: &Rect, color: Color) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx.fill_rect(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        );
    }

    fn shape(&self, shape: &Shape) {
        match shape {
            Shape::Rect { rect, color } => self.fill_rect(rect, *color),
            Shape::Outline { rect, color } => {
                self.ctx.set_stroke_style_str(&css(*color));
                self.ctx.set_line_width(2.0);
                self.ctx.stroke_rect(
                    rect.x as f64,
                    rect.y as f64,
                    rect.width as f64,
                    rect.height as f64,
                );
            }
            Shape::Triangle { points, color } => {
                self.ctx.set_fill_style_str(&css(*color));
                self.ctx.begin_path();
                self.ctx.move_to(points[0].x as f64, points[0].y as f64);
                self.ctx.line_to(points[1].x as f64, points[1].y as f64);
                self.ctx.line_to(points[2].x as f64, points[2].y as f64);
                self.ctx.close_path();
                self.ctx.fill();
            }
        }
    }

    /// Stick figure inside the player's box
    fn stick_figure(&self, rect: &Rect, color: Color, moving: bool) {
        let (x, y, w, h) = (
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        );
        let cx = x + w / 2.0;
        let style = css(color);

        self.ctx.set_fill_style_str(&style);
        self.ctx.begin_path();
        self.ctx.arc(cx, y + h * 0.2, w * 0.2, 0.0, PI * 2.0).ok();
        self.ctx.fill();

        self.ctx.set_stroke_style_str(&style);
        self.ctx.set_line_width(2.0);
        self.ctx.begin_path();
        // Body
        self.ctx.move_to(cx, y + h * 0.4);
        self.ctx.line_to(cx, y + h * 0.8);
        // Arms
        let reach = if moving { w * 0.4 } else { w * 0.3 };
        self.ctx.move_to(cx, y + h * 0.5);
        self.ctx.line_to(cx - reach, y + h * 0.6);
        self.ctx.move_to(cx, y + h * 0.5);
        self.ctx.line_to(cx + reach, y + h * 0.6);
        // Legs
        self.ctx.move_to(cx, y + h * 0.8);
        self.ctx.line_to(cx - w * 0.2, y + h);
        self.ctx.move_to(cx, y + h * 0.8);
        self.ctx.line_to(cx + w * 0.2, y + h);
        self.ctx.stroke();
    }

    fn centered_text(&self, text: &str, y: f64, font: &str) {
        self.ctx.save();
        self.ctx.set_font(font);
        self.ctx.set_fill_style_str("#F5F5DC");
        self.ctx.set_text_align("center");
        self.ctx.fill_text(text, CANVAS_WIDTH as f64 / 2.0, y).ok();
        self.ctx.restore();
    }
}

impl RenderSink for CanvasRenderer {
    fn present(&mut self, frame: &Frame) {
        self.fill_rect(
            &Rect::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
            frame.background,
        );
        for sprite in &frame.sprites {
            self.shape(&sprite.shape);
        }

        match &frame.player {
            PlayerView::Normal { rect, moving, .. } => {
                self.stick_figure(rect, frame.player_color, *moving)
            }
            PlayerView::Respawning { rect } => {
                self.ctx.set_global_alpha(0.5);
                self.stick_figure(rect, frame.player_color, false);
                self.ctx.set_global_alpha(1.0);
            }
            PlayerView::Exploding { debris, .. } => {
                for piece in debris {
                    self.ctx.set_global_alpha(piece.opacity as f64);
                    self.fill_rect(&piece.rect, frame.player_color);
                }
                self.ctx.set_global_alpha(1.0);
            }
            PlayerView::Hidden => {}
        }

        // HUD
        let hud = &frame.hud;
        self.ctx.set_fill_style_str("#F5F5DC");
        self.ctx.set_font("20px Arial");
        self.ctx.set_text_align("left");
        self.ctx.fill_text(&format!("Level: {}", hud.level), 10.0, 20.0).ok();
        self.ctx.fill_text(&format!("Time: {}s", hud.seconds), 10.0, 60.0).ok();

        self.fill_rect(&hud.pause_button, [0.0, 0.0, 0.0, 1.0]);
        for bar in &hud.pause_icon {
            self.fill_rect(bar, frame.player_color);
        }

        self.fill_rect(&hud.lives_panel, [0.0, 0.0, 0.0, 1.0]);
        for (rect, filled) in &hud.lives_boxes {
            let shape = if *filled {
                Shape::Rect {
                    rect: *rect,
                    color: hud.life_color,
                }
            } else {
                Shape::Outline {
                    rect: *rect,
                    color: hud.life_color,
                }
            };
            self.shape(&shape);
        }

        for overlay in &frame.overlays {
            match overlay {
                Overlay::RestartPrompt => {
                    self.centered_text("Tap or press any key", 100.0, "bold 40px Arial")
                }
                Overlay::ResetPopup => self.centered_text(
                    "Out of lives! Press Enter to reset",
                    CANVAS_HEIGHT as f64 / 2.0,
                    "bold 32px Arial",
                ),
                Overlay::FallOut => self.centered_text("You fell out!", 160.0, "bold 32px Arial"),
                Overlay::Paused => self.centered_text(
                    "Paused - Esc to resume, R to replay",
                    CANVAS_HEIGHT as f64 / 2.0,
                    "bold 32px Arial",
                ),
                Overlay::Victory => {
                    self.centered_text("You made it!", 200.0, "bold 48px Arial");
                    self.centered_text("Press Enter to play again", 260.0, "24px Arial");
                }
                Overlay::LoadError(error) => {
                    self.centered_text(error, 200.0, "20px Arial");
                    self.centered_text("Press Enter to retry", 240.0, "20px Arial");
                }
            }
        }
    }
}

struct App {
    game: Game,
    renderer: CanvasRenderer,
    input: TickInput,
    last_time: Option<f64>,
}

impl App {
    fn command(&mut self, command: Command) {
        if let Err(e) = self.game.command(command) {
            log::warn!("{:?} failed: {}", command, e);
        }
    }

    fn on_key(&mut self, code: &str, down: bool) {
        match code {
            "ArrowLeft" | "KeyA" => self.input.left = down,
            "ArrowRight" | "KeyD" => self.input.right = down,
            "ArrowUp" | "KeyW" | "Space" => self.input.jump = down,
            _ => {}
        }
        if down {
            self.on_press(code);
        }
    }

    /// Discrete actions for a fresh key press
    fn on_press(&mut self, code: &str) {
        let Some(state) = self.game.state() else {
            return;
        };
        let (life, paused) = (state.life, state.paused);
        let (complete, load_failed) = (state.is_complete(), state.load_error.is_some());
        let enter = code == "Enter" || code == "Space";

        if load_failed {
            if enter {
                if let Err(e) = self.game.retry_load() {
                    log::warn!("Retry failed: {}", e);
                }
            }
            return;
        }
        if complete {
            if enter {
                self.command(Command::PlayAgain);
            }
            return;
        }
        match life {
            LifeState::Exhausted { .. } => {
                if enter {
                    self.command(Command::ResetRun);
                }
            }
            LifeState::AwaitingRestart { .. } => {
                self.input = TickInput::default();
                self.command(Command::AdvanceFromRestartPrompt);
            }
            _ => match code {
                "Escape" | "KeyP" => self.command(Command::TogglePause),
                "KeyR" if paused => self.command(Command::RestartLevel),
                _ => {}
            },
        }
    }

    fn on_click(&mut self, x: f32, y: f32) {
        let Some(state) = self.game.state() else {
            return;
        };
        let life = state.life;
        let pausable = state.is_simulating() || state.paused;
        let button = shapes::pause_button();
        let on_button =
            x >= button.left() && x <= button.right() && y >= button.top() && y <= button.bottom();

        if matches!(life, LifeState::AwaitingRestart { .. }) {
            self.input = TickInput::default();
            self.command(Command::AdvanceFromRestartPrompt);
        } else if on_button && pausable {
            self.command(Command::TogglePause);
        }
    }

    fn frame(&mut self, time: f64) {
        let dt = self
            .last_time
            .map(|last| ((time - last) / 1000.0) as f32)
            .unwrap_or(0.0);
        self.last_time = Some(time);

        if self.game.state().is_some() {
            if let Err(e) = self.game.update(dt, &self.input) {
                log::warn!("Update failed: {}", e);
            }
            if let Err(e) = self.game.render(&mut self.renderer) {
                log::warn!("Render failed: {}", e);
            }
        }
    }
}

fn request_animation_frame(callback: &Closure<dyn FnMut(f64)>) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            log::error!("requestAnimationFrame failed: {:?}", e);
        }
    }
}

fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    for (kind, down) in [("keydown", true), ("keyup", false)] {
        let app = app.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if event.repeat() && down {
                return;
            }
            let code = event.code();
            if matches!(code.as_str(), "ArrowUp" | "ArrowLeft" | "ArrowRight" | "Space") {
                event.prevent_default();
            }
            app.borrow_mut().on_key(&code, down);
        });
        document.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    {
        let app = app.clone();
        let target = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            // Map CSS pixels to canvas coordinates
            let scale_x = CANVAS_WIDTH / target.client_width().max(1) as f32;
            let scale_y = CANVAS_HEIGHT / target.client_height().max(1) as f32;
            app.borrow_mut().on_click(
                event.offset_x() as f32 * scale_x,
                event.offset_y() as f32 * scale_y,
            );
        });
        canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Auto-pause when the tab is hidden
    {
        let doc = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if doc.visibility_state() != web_sys::VisibilityState::Hidden {
                return;
            }
            let mut app = app.borrow_mut();
            if app.game.state().is_some_and(|s| s.is_simulating()) {
                app.command(Command::Pause);
                log::info!("Auto-paused (tab hidden)");
            }
        });
        document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    Ok(())
}

/// Boot the browser game on the `#canvas` element
pub fn run() -> Result<(), JsValue> {
    super::init_logging();
    log::info!("Trust Issues starting...");

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id("canvas")
        .ok_or_else(|| JsValue::from_str("no #canvas element"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("#canvas is not a canvas"))?;

    let seed = rand::random::<u64>();
    let mut game = super::default_game(Settings::load(), seed);
    if let Err(e) = game.continue_game() {
        log::error!("Failed to start: {}", e);
    }
    log::info!("Game initialized with seed: {}", seed);

    let app = Rc::new(RefCell::new(App {
        game,
        renderer: CanvasRenderer::new(&canvas)?,
        input: TickInput::default(),
        last_time: None,
    }));

    setup_input_handlers(&canvas, app.clone())?;

    let slot: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = slot.clone();
    *slot.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(move |time: f64| {
        app.borrow_mut().frame(time);
        if let Some(callback) = next.borrow().as_ref() {
            request_animation_frame(callback);
        }
    }));
    if let Some(callback) = slot.borrow().as_ref() {
        request_animation_frame(callback);
    }

    log::info!("Trust Issues running!");
    Ok(())
}
