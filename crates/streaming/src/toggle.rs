/// Whether the loading pipeline runs at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ToggleState {
    #[default]
    Enabled,
    Disabled,
}

/// Monotonic stamp for fetch tasks. A task whose generation is older than the
/// toggle's current one belongs to discarded state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Enabled,
    Disabled,
}

/// Runtime on/off switch for loading, plus the generation counter.
#[derive(Debug, Clone, Default)]
pub struct LoadingToggle {
    state: ToggleState,
    generation: Generation,
}

impl LoadingToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ToggleState::Enabled
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Switch loading on or off. Setting the current state again is a no-op
    /// and returns `None`. Disabling bumps the generation.
    pub fn set(&mut self, enabled: bool) -> Option<Transition> {
        match (self.state, enabled) {
            (ToggleState::Enabled, false) => {
                self.state = ToggleState::Disabled;
                self.bump();
                Some(Transition::Disabled)
            }
            (ToggleState::Disabled, true) => {
                self.state = ToggleState::Enabled;
                Some(Transition::Enabled)
            }
            _ => None,
        }
    }

    pub fn bump(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }
}
