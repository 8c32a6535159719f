/// Marker type for machines that never emit commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoCommand;

/// Reducer output: effect list to execute and an optional command to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<E, C> {
    pub effects: Vec<E>,
    pub command: Option<C>,
}

impl<E, C> Default for Transition<E, C> {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
            command: None,
        }
    }
}

impl<E, C> Transition<E, C> {
    pub fn with_effect(effect: E) -> Self {
        Self {
            effects: vec![effect],
            command: None,
        }
    }

    pub fn with_effects(effects: Vec<E>) -> Self {
        Self {
            effects,
            command: None,
        }
    }

    pub fn with_command(command: C) -> Self {
        Self {
            effects: Vec::new(),
            command: Some(command),
        }
    }

    pub fn push_effect(&mut self, effect: E) {
        self.effects.push(effect);
    }

    pub fn set_command(&mut self, command: C) {
        self.command = Some(command);
    }

    /// Append `other`'s effects; its command wins when present.
    pub fn merge(&mut self, other: Self) {
        self.effects.extend(other.effects);
        if other.command.is_some() {
            self.command = other.command;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.command.is_none()
    }
}

/// Generic reducer contract for state machines that emit effects and commands.
pub trait Machine {
    type Event;
    type Effect;
    type Command;

    fn reduce(&mut self, event: Self::Event) -> Transition<Self::Effect, Self::Command>;
}

/// Apply one event to a machine.
pub fn apply_event<M>(machine: &mut M, event: M::Event) -> Transition<M::Effect, M::Command>
where
    M: Machine,
{
    machine.reduce(event)
}

#[cfg(test)]
mod tests {
    use super::{NoCommand, Transition};
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_keeps_effect_order_and_latest_command() {
        let mut first: Transition<u8, u8> = Transition::with_effect(1);
        first.set_command(7);
        let mut second = Transition::with_effects(vec![2, 3]);
        second.set_command(9);
        first.merge(second);
        assert_eq!(first.effects, vec![1, 2, 3]);
        assert_eq!(first.command, Some(9));
    }

    #[test]
    fn merge_without_command_keeps_existing_command() {
        let mut first: Transition<u8, u8> = Transition::with_command(4);
        first.merge(Transition::with_effect(5));
        assert_eq!(first.command, Some(4));
        assert_eq!(first.effects, vec![5]);
    }

    #[test]
    fn default_transition_is_empty() {
        let transition: Transition<u8, NoCommand> = Transition::default();
        assert!(transition.is_empty());
    }
}
