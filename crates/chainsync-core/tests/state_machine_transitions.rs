use chainsync_core::{switch_transition, SwitchAction, SwitchState};

#[test]
fn direct_switch_path_transitions() {
    let (s1, t1) = switch_transition(SwitchState::Idle, SwitchAction::Begin).expect("idle -> begin");
    assert_eq!(s1, SwitchState::Switching);
    assert_eq!(t1.from, SwitchState::Idle);
    assert!(s1.in_flight());
    let (s2, t2) = switch_transition(s1, SwitchAction::Switched).expect("switching -> idle");
    assert_eq!(s2, SwitchState::Idle);
    assert_eq!(t2.to, SwitchState::Idle);
    assert!(!s2.in_flight());
}

#[test]
fn add_chain_path_transitions() {
    let (s1, _) = switch_transition(SwitchState::Idle, SwitchAction::Begin).expect("begin");
    let (s2, _) =
        switch_transition(s1, SwitchAction::UnrecognizedChain).expect("switching -> adding");
    assert_eq!(s2, SwitchState::AddingChain);
    assert!(s2.in_flight());
    let (s3, _) = switch_transition(s2, SwitchAction::Added).expect("adding -> idle");
    assert_eq!(s3, SwitchState::Idle);
}

#[test]
fn failures_return_to_idle() {
    let (s, _) =
        switch_transition(SwitchState::Switching, SwitchAction::SwitchFailed).expect("switch fail");
    assert_eq!(s, SwitchState::Idle);
    let (s, _) =
        switch_transition(SwitchState::AddingChain, SwitchAction::AddFailed).expect("add fail");
    assert_eq!(s, SwitchState::Idle);
}

#[test]
fn begin_while_in_flight_is_rejected() {
    for state in [SwitchState::Switching, SwitchState::AddingChain] {
        let err = switch_transition(state, SwitchAction::Begin).expect_err("must fail");
        assert!(err.to_string().contains("illegal switch transition"));
    }
}

#[test]
fn completion_without_request_is_rejected() {
    let err = switch_transition(SwitchState::Idle, SwitchAction::Switched).expect_err("must fail");
    assert!(err.to_string().contains("illegal switch transition"));
    let err = switch_transition(SwitchState::Switching, SwitchAction::Added).expect_err("must fail");
    assert!(err.to_string().contains("illegal switch transition"));
}
