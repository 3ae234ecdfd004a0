/// Platform-agnostic input handling system
use std::collections::HashSet;

use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Input events the frame loop reacts to, already stripped of winit details
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key { code: KeyCode, pressed: bool, repeat: bool },
    Modifiers { shift: bool, alt: bool },
    MouseButton { button: MouseButton, pressed: bool },
    /// Relative pointer motion straight from the device
    RawMotion { dx: f32, dy: f32 },
    /// Absolute cursor position inside the window
    CursorMoved { x: f64, y: f64 },
    /// +1 for a notch away from the user, -1 towards
    Wheel { dir: f32 },
    /// Smooth scrolling in pixels, e.g. from a touchpad
    PixelScroll { dy: f32 },
    Resized { width: u32, height: u32 },
}

impl InputEvent {
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { physical_key: PhysicalKey::Code(code), state, repeat, .. }, .. } => {
                Some(InputEvent::Key { code: *code, pressed: *state == ElementState::Pressed, repeat: *repeat })
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                Some(InputEvent::Modifiers { shift: state.shift_key(), alt: state.alt_key() })
            }
            WindowEvent::MouseInput { state, button, .. } => {
                Some(InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed })
            }
            WindowEvent::CursorMoved { position, .. } => {
                Some(InputEvent::CursorMoved { x: position.x, y: position.y })
            }
            WindowEvent::MouseWheel { delta, .. } => match delta {
                MouseScrollDelta::LineDelta(_, y) => (*y != 0.0).then(|| InputEvent::Wheel { dir: y.signum() }),
                MouseScrollDelta::PixelDelta(p) => (p.y != 0.0).then(|| InputEvent::PixelScroll { dy: p.y as f32 }),
            },
            WindowEvent::Resized(size) => {
                Some(InputEvent::Resized { width: size.width, height: size.height })
            }
            _ => None,
        }
    }

    pub fn from_device_event(event: &DeviceEvent) -> Option<Self> {
        match event {
            DeviceEvent::MouseMotion { delta } => {
                Some(InputEvent::RawMotion { dx: delta.0 as f32, dy: delta.1 as f32 })
            }
            _ => None,
        }
    }
}

/// Direction of travel. Signs are those of the translation applied to the world
/// in camera space, so `Forward` is +Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl Motion {
    pub fn axis(self) -> usize {
        match self {
            Motion::Left | Motion::Right => 0,
            Motion::Up | Motion::Down => 1,
            Motion::Forward | Motion::Backward => 2,
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Motion::Forward | Motion::Left | Motion::Down => 1.0,
            Motion::Backward | Motion::Right | Motion::Up => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Move(Motion),
    Quit,
    ToggleFullscreen,
    Boost,
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: [KeyCode; 2],
    pub backward: [KeyCode; 2],
    pub left: [KeyCode; 2],
    pub right: [KeyCode; 2],
    pub up: [KeyCode; 2],
    pub down: [KeyCode; 2],
    pub quit: KeyCode,
    pub fullscreen: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: [KeyCode::KeyW, KeyCode::ArrowUp],
            backward: [KeyCode::KeyS, KeyCode::ArrowDown],
            left: [KeyCode::KeyA, KeyCode::ArrowLeft],
            right: [KeyCode::KeyD, KeyCode::ArrowRight],
            up: [KeyCode::KeyQ, KeyCode::PageUp],
            down: [KeyCode::KeyE, KeyCode::PageDown],
            quit: KeyCode::F4,
            fullscreen: KeyCode::F11,
        }
    }
}

/// High-level input processor
#[derive(Debug, Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn action(&self, code: KeyCode) -> Option<KeyAction> {
        let b = &self.bindings;
        let motion = [
            (&b.forward, Motion::Forward),
            (&b.backward, Motion::Backward),
            (&b.left, Motion::Left),
            (&b.right, Motion::Right),
            (&b.up, Motion::Up),
            (&b.down, Motion::Down),
        ]
        .into_iter()
        .find(|(keys, _)| keys.contains(&code))
        .map(|(_, m)| m);

        if let Some(m) = motion {
            return Some(KeyAction::Move(m));
        }
        match code {
            c if c == b.quit => Some(KeyAction::Quit),
            c if c == b.fullscreen => Some(KeyAction::ToggleFullscreen),
            KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(KeyAction::Boost),
            _ => None,
        }
    }

    /// Non-character keys. Each transition of one of these re-reads the shift state.
    pub fn is_special(&self, code: KeyCode) -> bool {
        matches!(
            code,
            KeyCode::ArrowUp
                | KeyCode::ArrowDown
                | KeyCode::ArrowLeft
                | KeyCode::ArrowRight
                | KeyCode::PageUp
                | KeyCode::PageDown
                | KeyCode::Home
                | KeyCode::End
                | KeyCode::Insert
                | KeyCode::ShiftLeft
                | KeyCode::ShiftRight
                | KeyCode::F1
                | KeyCode::F2
                | KeyCode::F3
                | KeyCode::F4
                | KeyCode::F5
                | KeyCode::F6
                | KeyCode::F7
                | KeyCode::F8
                | KeyCode::F9
                | KeyCode::F10
                | KeyCode::F11
                | KeyCode::F12
        )
    }
}

/// Pixel scroll distance that counts as one wheel notch
pub const PIXELS_PER_NOTCH: f32 = 50.0;

/// Modifier and pointer state between events
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub shift_held: bool,
    pub alt_held: bool,
    pub buttons_held: HashSet<MouseButton>,
    /// Set once the platform has delivered relative device motion.
    pub raw_motion: bool,
    /// Pixel scroll not yet turned into a whole notch
    scroll_pixels: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        !self.buttons_held.is_empty()
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons_held.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons_held.remove(&button);
    }

    /// Add a pixel scroll and return the whole notches it completes, signed like `Wheel::dir`.
    /// Reversing direction drops the partial distance.
    pub fn scroll_notches(&mut self, dy: f32) -> i32 {
        if self.scroll_pixels * dy < 0.0 {
            self.scroll_pixels = 0.0;
        }
        self.scroll_pixels += dy;
        let notches = (self.scroll_pixels / PIXELS_PER_NOTCH).trunc();
        self.scroll_pixels -= notches * PIXELS_PER_NOTCH;
        notches as i32
    }

    /// Forget held buttons and modifiers, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.buttons_held.clear();
        self.shift_held = false;
        self.alt_held = false;
        self.scroll_pixels = 0.0;
    }
}
