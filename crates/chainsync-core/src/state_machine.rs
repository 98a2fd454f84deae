use crate::ports::PortError;

/// Progress of a chain switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchState {
    #[default]
    Idle,
    Switching,
    AddingChain,
}

impl SwitchState {
    pub fn in_flight(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchAction {
    Begin,
    Switched,
    UnrecognizedChain,
    SwitchFailed,
    Added,
    AddFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SwitchState,
    pub to: SwitchState,
    pub reason: &'static str,
}

pub fn switch_transition(
    from: SwitchState,
    action: SwitchAction,
) -> Result<(SwitchState, StateTransition), PortError> {
    use SwitchAction as A;
    use SwitchState as S;

    let (to, reason) = match (from, action) {
        (S::Idle, A::Begin) => (S::Switching, "switch requested"),
        (S::Switching, A::Switched) => (S::Idle, "provider switched chain"),
        (S::Switching, A::UnrecognizedChain) => (S::AddingChain, "chain unknown to wallet"),
        (S::Switching, A::SwitchFailed) => (S::Idle, "switch rejected"),
        (S::AddingChain, A::Added) => (S::Idle, "provider added chain"),
        (S::AddingChain, A::AddFailed) => (S::Idle, "add chain rejected"),
        _ => {
            return Err(PortError::Validation(format!(
                "illegal switch transition: {from:?} --{action:?}-->"
            )))
        }
    };
    Ok((to, StateTransition { from, to, reason }))
}
