//! Scripted input: canvas-space steps turned into core pointer and key events.

use kurbo::Point;
use segflow_core::View;
use segflow_core::input::{EventPoints, KeyEvent, MouseButton, PointerEvent};
use serde::{Deserialize, Serialize};

/// One recorded input step, in canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScriptStep {
    Down { x: f64, y: f64 },
    Drag { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
    },
}

/// A step translated for delivery to the session.
#[derive(Debug, Clone)]
pub enum ScriptInput {
    Pointer(PointerEvent),
    /// A key press; `shift` is kept for shortcut lookup.
    Key { event: KeyEvent, shift: bool },
}

impl ScriptStep {
    /// Translate into an event from `view`, resolving world coordinates
    /// through the view's projection.
    pub fn to_input(&self, view: &dyn View) -> ScriptInput {
        let view_id = view.id().to_string();
        let points = |x: f64, y: f64| {
            let canvas = Point::new(x, y);
            EventPoints::new(canvas, view.canvas_to_world(canvas))
        };
        match *self {
            ScriptStep::Down { x, y } => ScriptInput::Pointer(PointerEvent::Down {
                view_id,
                button: MouseButton::Left,
                points: points(x, y),
            }),
            ScriptStep::Drag { x, y } => ScriptInput::Pointer(PointerEvent::Drag {
                view_id,
                points: points(x, y),
            }),
            ScriptStep::Up { x, y } => ScriptInput::Pointer(PointerEvent::Up {
                view_id,
                button: MouseButton::Left,
                points: points(x, y),
            }),
            ScriptStep::Click { x, y } => ScriptInput::Pointer(PointerEvent::Click {
                view_id,
                button: MouseButton::Left,
                points: points(x, y),
            }),
            ScriptStep::Key { ref key, shift } => ScriptInput::Key {
                event: KeyEvent::Pressed {
                    view_id,
                    key: key.clone(),
                },
                shift,
            },
        }
    }
}

/// A drag from `from` to `to` in `steps` increments, pressed and released.
pub fn drag_gesture(from: Point, to: Point, steps: usize) -> Vec<ScriptStep> {
    let steps = steps.max(1);
    let mut script = vec![ScriptStep::Down { x: from.x, y: from.y }];
    for i in 1..=steps {
        let p = from.lerp(to, i as f64 / steps as f64);
        script.push(ScriptStep::Drag { x: p.x, y: p.y });
    }
    script.push(ScriptStep::Up { x: to.x, y: to.y });
    script
}
