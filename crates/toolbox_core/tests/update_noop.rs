use toolbox_core::{update, Msg, ToolSession};

#[test]
fn update_is_noop() {
    let session = ToolSession::new();
    let (next, effects) = update(session.clone(), Msg::NoOp);

    assert_eq!(session, next);
    assert!(effects.is_empty());
}

#[test]
fn tick_does_not_mark_dirty() {
    let (mut next, effects) = update(ToolSession::new(), Msg::Tick);
    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
}
