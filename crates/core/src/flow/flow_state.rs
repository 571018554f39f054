use std::fmt;

/// Position in the preview → review → approve flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowState {
    /// Not started yet, or the last start attempt failed.
    #[default]
    Idle,
    /// Live preview running; captures are accepted.
    Previewing,
    /// A still image is cached and awaiting approve/recapture.
    Reviewing,
    /// Image handed to the host. Terminal.
    Approved,
    /// Flow exited without approval. Terminal.
    Closed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Approved | FlowState::Closed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => write!(f, "idle"),
            FlowState::Previewing => write!(f, "previewing"),
            FlowState::Reviewing => write!(f, "reviewing"),
            FlowState::Approved => write!(f, "approved"),
            FlowState::Closed => write!(f, "closed"),
        }
    }
}
