//! Pointer and keyboard events delivered by the host's event source.

use glam::DVec3;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Key that cancels an in-flight gesture.
pub const CANCEL_KEY: &str = "Escape";

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Primary button; the only one that starts an edit gesture.
    Left,
    Right,
    Middle,
}

/// Position of a pointer event in both coordinate systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventPoints {
    pub canvas: Point,
    pub world: DVec3,
}

impl EventPoints {
    pub fn new(canvas: Point, world: DVec3) -> Self {
        Self { canvas, world }
    }
}

/// Pointer event, tagged with the view it originated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        view_id: String,
        button: MouseButton,
        points: EventPoints,
    },
    Drag {
        view_id: String,
        points: EventPoints,
    },
    Up {
        view_id: String,
        button: MouseButton,
        points: EventPoints,
    },
    /// A press and release without movement; confirms a drawn shape.
    Click {
        view_id: String,
        button: MouseButton,
        points: EventPoints,
    },
}

impl PointerEvent {
    pub fn view_id(&self) -> &str {
        match self {
            PointerEvent::Down { view_id, .. }
            | PointerEvent::Drag { view_id, .. }
            | PointerEvent::Up { view_id, .. }
            | PointerEvent::Click { view_id, .. } => view_id,
        }
    }

    pub fn points(&self) -> &EventPoints {
        match self {
            PointerEvent::Down { points, .. }
            | PointerEvent::Drag { points, .. }
            | PointerEvent::Up { points, .. }
            | PointerEvent::Click { points, .. } => points,
        }
    }
}

/// Keyboard event, tagged with the view that had focus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed { view_id: String, key: String },
    Released { view_id: String, key: String },
}

impl KeyEvent {
    pub fn view_id(&self) -> &str {
        match self {
            KeyEvent::Pressed { view_id, .. } | KeyEvent::Released { view_id, .. } => view_id,
        }
    }

    /// Whether this is a press of the cancel key.
    pub fn is_cancel(&self) -> bool {
        matches!(self, KeyEvent::Pressed { key, .. } if key == CANCEL_KEY)
    }
}
