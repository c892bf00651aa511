use proptest::prelude::*;
use sheetsmith_core::{allowed_transitions, validate_transition, RequestState};

#[test]
fn test_pending_transitions() {
    assert!(validate_transition(RequestState::Pending, RequestState::Trying { index: 0 }).is_ok());
    assert!(validate_transition(RequestState::Pending, RequestState::FallbackAccepted).is_ok());

    // Invalid
    assert!(validate_transition(RequestState::Pending, RequestState::Accepted).is_err());
    assert!(validate_transition(RequestState::Pending, RequestState::Trying { index: 1 }).is_err());
    assert!(validate_transition(RequestState::Pending, RequestState::Validating { index: 0 }).is_err());
}

#[test]
fn test_terminal_states_are_final() {
    for terminal in [RequestState::Accepted, RequestState::FallbackAccepted] {
        assert!(terminal.is_terminal());
        assert!(allowed_transitions(terminal).is_empty());
        assert!(validate_transition(terminal, RequestState::Pending).is_err());
    }
}

#[test]
fn test_validating_cannot_repeat() {
    let validating = RequestState::Validating { index: 2 };
    assert!(validate_transition(validating, validating).is_err());
    assert!(validate_transition(validating, RequestState::Trying { index: 3 }).is_ok());
    assert!(validate_transition(validating, RequestState::Trying { index: 2 }).is_err());
}

fn arb_state() -> impl Strategy<Value = RequestState> {
    prop_oneof![
        Just(RequestState::Pending),
        (0usize..4).prop_map(|index| RequestState::Trying { index }),
        (0usize..4).prop_map(|index| RequestState::Validating { index }),
        Just(RequestState::Accepted),
        Just(RequestState::FallbackAccepted),
    ]
}

proptest! {
    #[test]
    fn prop_validate_agrees_with_allowed(from in arb_state(), to in arb_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);
        prop_assert_eq!(res.is_ok(), allowed.contains(&to));
    }

    #[test]
    fn prop_every_nonterminal_state_can_fall_back(from in arb_state()) {
        prop_assume!(!from.is_terminal());
        prop_assert!(validate_transition(from, RequestState::FallbackAccepted).is_ok());
    }
}
