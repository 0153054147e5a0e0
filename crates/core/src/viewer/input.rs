//! Host-neutral keyboard input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Where keyboard focus was when the key went down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyTarget {
    /// The filter text input.
    FilterInput,
    #[default]
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
    pub target: KeyTarget,
}

/// What the host should do with the native key event afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The viewer handled the key; suppress the default action.
    PreventDefault,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Previous,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
            target: KeyTarget::Elsewhere,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn in_filter_input(mut self) -> Self {
        self.target = KeyTarget::FilterInput;
        self
    }

    /// Match navigation requested by this key: `Enter` steps forward,
    /// `Shift+Enter` steps back. Other modifiers disqualify the key.
    pub fn match_step(&self) -> Option<Step> {
        let m = self.modifiers;
        if self.key != Key::Enter || m.ctrl || m.alt || m.meta {
            return None;
        }
        Some(if m.shift { Step::Previous } else { Step::Next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_steps_in_both_directions() {
        assert_eq!(KeyPress::new(Key::Enter).match_step(), Some(Step::Next));
        assert_eq!(
            KeyPress::new(Key::Enter).with_shift().match_step(),
            Some(Step::Previous)
        );
        assert_eq!(
            KeyPress::new(Key::Enter).in_filter_input().match_step(),
            Some(Step::Next)
        );
    }

    #[test]
    fn other_keys_and_modifiers_are_not_navigation() {
        let mut ctrl_enter = KeyPress::new(Key::Enter);
        ctrl_enter.modifiers.ctrl = true;
        assert_eq!(ctrl_enter.match_step(), None);
        assert_eq!(KeyPress::new(Key::Char('n')).match_step(), None);
        assert_eq!(KeyPress::new(Key::Escape).match_step(), None);
    }
}
