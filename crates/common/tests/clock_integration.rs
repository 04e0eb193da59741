//! Integration tests for the clock abstraction in `crmchat_common::time`.
//!
//! Token expiry math is done in whole Unix seconds; these tests check that
//! the mock and system clocks agree on that unit.

use std::sync::Arc;
use std::time::Duration;

use crmchat_common::time::{Clock, MockClock, SystemClock};

/// Validates that a mock clock behind a trait object moves when the test
/// advances the concrete handle.
///
/// Assertions:
/// - Confirms `unix_seconds` reflects the advance.
/// - Confirms the monotonic reading moves by the same amount.
#[test]
fn test_shared_mock_clock_moves_through_trait_object() {
    let mock = MockClock::at_unix_seconds(1_700_000_000);
    let clock: Arc<dyn Clock> = Arc::new(mock.clone());
    let before = clock.now();

    mock.advance(Duration::from_secs(3_600));

    assert_eq!(clock.unix_seconds(), 1_700_003_600);
    assert_eq!(clock.now().duration_since(before), Duration::from_secs(3_600));
}

/// Validates that seconds and milliseconds readings come from the same wall
/// clock.
///
/// Assertions:
/// - Confirms `millis_since_epoch / 1000` equals `unix_seconds` on a mock.
/// - Confirms the system clock readings are within one second of each other.
#[test]
fn test_seconds_and_millis_agree() {
    let mock = MockClock::at_unix_seconds(42);
    mock.advance(Duration::from_millis(1_500));
    assert_eq!(mock.unix_seconds(), 43);
    assert_eq!(mock.millis_since_epoch() / 1_000, 43);

    let secs = SystemClock.unix_seconds();
    let millis = SystemClock.millis_since_epoch();
    let delta = i64::try_from(millis / 1_000).unwrap() - secs;
    assert!((0..=1).contains(&delta));
}
