use std::time::Duration;

/// Delay before the next reconnect attempt.
///
/// Starts at `base` after the first failure and doubles on each consecutive
/// failure, never exceeding `cap`. A successful connect resets the caller's
/// current delay to zero, so the next failure starts over at `base`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sluice_wire::next_retry_delay;
///
/// let base = Duration::from_millis(1000);
/// let cap = Duration::from_secs(30);
///
/// let first = next_retry_delay(Duration::ZERO, base, cap);
/// assert_eq!(first, Duration::from_millis(1000));
///
/// let second = next_retry_delay(first, base, cap);
/// assert_eq!(second, Duration::from_millis(2000));
/// ```
pub fn next_retry_delay(current: Duration, base: Duration, cap: Duration) -> Duration {
    let next = if current.is_zero() { base } else { current.saturating_mul(2) };
    next.min(cap)
}
