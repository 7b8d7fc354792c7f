//! Custom assertion helpers for integration tests.

use gk_protocol::stage_models::{Stage, StageStatus};

/// Assert the status of every stage, in order.
pub fn assert_statuses(stages: &[Stage], expected: &[StageStatus]) {
    let actual: Vec<StageStatus> = stages.iter().map(|stage| stage.status).collect();
    assert_eq!(actual, expected, "unexpected stage statuses");
}

/// Assert that `messages` contains `needle` as one complete message.
#[allow(dead_code)]
pub fn assert_published(messages: &[String], needle: &str) {
    assert!(
        messages.iter().any(|message| message == needle),
        "Expected message '{}' in {:?}",
        needle,
        messages
    );
}

/// Assert that no message contains `needle`.
#[allow(dead_code)]
pub fn assert_not_published(messages: &[String], needle: &str) {
    assert!(
        !messages.iter().any(|message| message.contains(needle)),
        "Did not expect '{}' in {:?}",
        needle,
        messages
    );
}
