//! Keyboard shortcut registry and documentation.

use segflow_core::tools::{ERASE_INSIDE, FILL_INSIDE};

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    ActivateTool(&'static str),
    SetStrategy(&'static str),
    NextSegment,
    PreviousSegment,
    ToggleSegmentLock,
    CancelGesture,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Shift+L").
    pub fn format(&self) -> String {
        if self.shift {
            format!("Shift+{}", self.key)
        } else {
            self.key.to_string()
        }
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new(
                "C",
                false,
                ShortcutAction::ActivateTool("CircleScissor"),
                "Circle scissors",
            ),
            Shortcut::new(
                "R",
                false,
                ShortcutAction::ActivateTool("RectangleScissor"),
                "Rectangle scissors",
            ),
            Shortcut::new(
                "F",
                false,
                ShortcutAction::SetStrategy(FILL_INSIDE),
                "Fill inside the shape",
            ),
            Shortcut::new(
                "E",
                false,
                ShortcutAction::SetStrategy(ERASE_INSIDE),
                "Erase inside the shape",
            ),
            Shortcut::new("]", false, ShortcutAction::NextSegment, "Next segment"),
            Shortcut::new("[", false, ShortcutAction::PreviousSegment, "Previous segment"),
            Shortcut::new(
                "L",
                true,
                ShortcutAction::ToggleSegmentLock,
                "Lock or unlock the active segment",
            ),
            Shortcut::new(
                "Escape",
                false,
                ShortcutAction::CancelGesture,
                "Cancel current gesture",
            ),
        ]
    }

    /// Look up the action bound to a key.
    pub fn action_for(key: &str, shift: bool) -> Option<ShortcutAction> {
        Self::all()
            .into_iter()
            .find(|s| s.shift == shift && s.key.eq_ignore_ascii_case(key))
            .map(|s| s.action)
    }

    /// Print all shortcuts to console.
    pub fn print_all() {
        println!("\n=== Keyboard Shortcuts ===");
        for shortcut in Self::all() {
            println!("  {:20} {}", shortcut.format(), shortcut.description);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            ShortcutRegistry::action_for("e", false),
            Some(ShortcutAction::SetStrategy(ERASE_INSIDE))
        );
        assert_eq!(
            ShortcutRegistry::action_for("Escape", false),
            Some(ShortcutAction::CancelGesture)
        );
        assert_eq!(ShortcutRegistry::action_for("L", false), None);
        assert_eq!(
            ShortcutRegistry::action_for("L", true),
            Some(ShortcutAction::ToggleSegmentLock)
        );
    }

    #[test]
    fn test_format() {
        let shortcut = Shortcut::new("L", true, ShortcutAction::ToggleSegmentLock, "");
        assert_eq!(shortcut.format(), "Shift+L");
    }
}
