use glam::Vec2;
use log::debug;

use crate::camera::Camera;
use crate::input::{InputState, KeyBindings, KeyCode, MouseButton};

/// Mutable application state handed to every window event handler.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub camera: Camera,
    pub input: InputState,
    bindings: KeyBindings,
    last_cursor: Option<Vec2>,
    // set once raw device motion arrives; cursor positions are then ignored
    raw_motion: bool,
    focused: bool,
    viewport: (u32, u32),
    should_close: bool,
}

impl AppContext {
    pub fn new(camera: Camera, bindings: KeyBindings, width: u32, height: u32) -> Self {
        Self {
            camera,
            input: InputState::new(),
            bindings,
            last_cursor: None,
            raw_motion: false,
            focused: true,
            viewport: (width.max(1), height.max(1)),
            should_close: false,
        }
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1 as f32
    }

    /// Mouse look from raw device deltas, which keep arriving while the
    /// cursor is locked or pinned to the window edge. Ignored without focus.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        if !self.focused {
            return;
        }
        self.raw_motion = true;
        // screen Y grows downwards
        self.camera.process_mouse_movement(dx as f32, -dy as f32);
    }

    /// Mouse look from cursor positions, used until raw motion is seen.
    /// The first event only records the cursor so the camera does not jump
    /// when the pointer enters the window.
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        if self.raw_motion {
            return;
        }
        let position = Vec2::new(x as f32, y as f32);
        if let Some(last) = self.last_cursor.replace(position) {
            // screen Y grows downwards
            self.camera
                .process_mouse_movement(position.x - last.x, last.y - position.y);
        }
    }

    /// Losing focus releases held keys and pauses raw mouse look.
    pub fn on_focus(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.input = InputState::new();
            self.last_cursor = None;
        }
    }

    pub fn on_scroll(&mut self, yoffset: f32) {
        self.camera.process_mouse_scroll(yoffset);
    }

    pub fn on_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.input.set_key_down(key);
        } else {
            self.input.set_key_up(key);
        }
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            debug!("{button} mouse button pressed");
            self.input.set_mouse_button_down(button);
        } else {
            debug!("{button} mouse button released");
            self.input.set_mouse_button_up(button);
        }
    }

    /// Applies held keys for one frame.
    pub fn process_input(&mut self, delta_time: f32) {
        if self.input.is_key_down(self.bindings.close) {
            self.request_close();
        }
        for (key, movement) in self.bindings.movements() {
            if self.input.is_key_down(key) {
                self.camera.process_keyboard(movement, delta_time);
            }
        }
    }

    pub fn request_close(&mut self) {
        self.should_close = true;
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }
}
