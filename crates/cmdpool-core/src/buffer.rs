use std::fmt;

/// Stable identifier of a command buffer inside its owning pool.
/// It is the buffer's index in the pool's arena and never changes or gets
/// reused while the pool is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmdbuf#{}", self.0)
    }
}

/// Where a command buffer sits in its lifecycle.
///
/// ```text
/// Free -> Recording -> InFlight -> Free   (transfer, recycled after fence signals)
/// Free -> Recording -> Free               (general, blocking submit)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferState {
    /// In the free queue, available to `begin`.
    #[default]
    Free,
    /// Handed out to a caller and accepting commands.
    Recording,
    /// Submitted to a queue; its fence has not been observed signaled.
    InFlight,
}

impl BufferState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: BufferState) -> bool {
        matches!(
            (self, next),
            (BufferState::Free, BufferState::Recording)
                | (BufferState::Recording, BufferState::InFlight)
                | (BufferState::Recording, BufferState::Free)
                | (BufferState::InFlight, BufferState::Free)
        )
    }
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BufferState::Free => "free",
            BufferState::Recording => "recording",
            BufferState::InFlight => "in-flight",
        };
        f.write_str(name)
    }
}

/// What a recording is for. Decides how the buffer is tracked after submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandUsage {
    /// Graphics or compute work. Submitted and waited on synchronously.
    #[default]
    General,
    /// One-shot data transfer. Submitted with a fence the caller polls.
    Transfer,
}

impl CommandUsage {
    pub fn is_transfer(self) -> bool {
        self == CommandUsage::Transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_id_is_its_arena_index() {
        let id = BufferId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "cmdbuf#7");
    }

    #[test]
    fn legal_transitions() {
        use BufferState::*;
        assert!(Free.can_transition_to(Recording));
        assert!(Recording.can_transition_to(InFlight));
        assert!(Recording.can_transition_to(Free));
        assert!(InFlight.can_transition_to(Free));
    }

    #[test]
    fn illegal_transitions() {
        use BufferState::*;
        assert!(!Free.can_transition_to(InFlight));
        assert!(!Free.can_transition_to(Free));
        assert!(!InFlight.can_transition_to(Recording));
        assert!(!Recording.can_transition_to(Recording));
    }

    #[test]
    fn default_usage_is_general() {
        assert_eq!(CommandUsage::default(), CommandUsage::General);
        assert!(!CommandUsage::General.is_transfer());
        assert!(CommandUsage::Transfer.is_transfer());
    }
}
