//! Per-route transform switch, read fresh on every dispatch.

use dashmap::DashMap;

/// Decides whether a dispatch on a main route passes through its transform
/// sub-route.
///
/// Flags are keyed by main route id, so toggling one service never changes
/// another. An unset flag reads as `false`.
#[derive(Debug, Default)]
pub struct TransformGate {
    flags: DashMap<String, bool>,
}

impl TransformGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, route_id: &str, enabled: bool) {
        self.flags.insert(route_id.to_string(), enabled);
    }

    #[must_use]
    pub fn is_enabled(&self, route_id: &str) -> bool {
        self.flags.get(route_id).is_some_and(|flag| *flag)
    }

    /// Forgets the flag of a deleted route.
    pub fn clear(&self, route_id: &str) {
        self.flags.remove(route_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flag_is_closed() {
        let gate = TransformGate::new();
        assert!(!gate.is_enabled("billing"));
    }

    #[test]
    fn flags_are_independent_per_route() {
        let gate = TransformGate::new();
        gate.set("billing", true);
        assert!(gate.is_enabled("billing"));
        assert!(!gate.is_enabled("orders"));

        gate.set("orders", true);
        gate.set("billing", false);
        assert!(!gate.is_enabled("billing"));
        assert!(gate.is_enabled("orders"));
    }

    #[test]
    fn clear_resets_to_closed() {
        let gate = TransformGate::new();
        gate.set("billing", true);
        gate.clear("billing");
        assert!(!gate.is_enabled("billing"));
    }
}
