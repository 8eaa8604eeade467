//! Key-to-choice bindings for one interactive stimulus set.

use hashbrown::HashMap;

use crate::state::Side;

/// A single key assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub choice: Side,
}

/// Handle operation and controls for each stimulus set.
///
/// Bindings resolve only while bound; the orchestrator keeps at most one
/// controller bound at a time.
#[derive(Debug, Clone, Default)]
pub struct Controller {
    keybindings: HashMap<String, Binding>,
    bound: bool,
}

impl Controller {
    pub fn new(keybindings: HashMap<String, Binding>) -> Self {
        Self {
            keybindings,
            bound: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Activate every binding.
    pub fn bind(&mut self) {
        self.bound = true;
    }

    /// Deactivate the bindings. Safe to call when never bound, and safe to
    /// call twice in a row.
    pub fn unbind(&mut self) {
        self.bound = false;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Resolve a key identifier to a choice, if the key is bound and the
    /// controller is active.
    pub fn resolve(&self, key: &str) -> Option<Side> {
        if !self.bound {
            return None;
        }
        self.keybindings.get(key).map(|binding| binding.choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_controller() -> Controller {
        let mut keybindings = HashMap::new();
        keybindings.insert("f".to_string(), Binding { choice: Side::Left });
        keybindings.insert("j".to_string(), Binding { choice: Side::Right });
        Controller::new(keybindings)
    }

    #[test]
    fn resolves_only_while_bound() {
        let mut controller = binary_controller();
        assert_eq!(controller.resolve("f"), None);

        controller.bind();
        assert_eq!(controller.resolve("f"), Some(Side::Left));
        assert_eq!(controller.resolve("j"), Some(Side::Right));
        assert_eq!(controller.resolve("q"), None);

        controller.unbind();
        assert_eq!(controller.resolve("f"), None);
    }

    #[test]
    fn unbind_is_idempotent() {
        let mut controller = binary_controller();
        controller.unbind();
        assert!(!controller.is_bound());

        controller.bind();
        controller.unbind();
        controller.unbind();
        assert!(!controller.is_bound());
        assert_eq!(controller.resolve("f"), None);
    }
}
