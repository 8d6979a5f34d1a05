//! Dual-window throttle gate for outbound API calls.
//!
//! Every call passes through a [`ThrottleGate`]: admission enforces the
//! per-second and per-minute call limits plus any cooldown deadline in
//! force, and the post-dispatch adjustment derives new cooldowns from the
//! observed response status.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::config::{CooldownConfig, RateLimitConfig};
use crate::error::{Error, Result};

const SECOND_WINDOW: Duration = Duration::from_secs(1);
const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Upper bound on server-driven cooldowns: parsed `Retry-After` values
/// clamp to this, and an overflowing deadline addition saturates at it.
const MAX_COOLDOWN: Duration = Duration::from_secs(3600);

/// Snapshot of the gate's counters, for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApiStats {
    /// Lifetime dispatched calls
    pub total_calls: u64,
    /// Lifetime non-200 responses
    pub total_errors: u64,
    /// Lifetime 429 responses
    pub total_overflows: u64,
    /// Calls dispatched in the current 1-second window
    pub calls_in_second: u32,
    /// Calls dispatched in the current 60-second window
    pub calls_in_minute: u32,
}

/// Cooldown durations applied by the post-dispatch adjustment.
#[derive(Debug, Clone, Copy)]
struct CooldownPolicy {
    /// After any non-200, non-429 response
    upstream_error: Duration,
    /// After a 429 without a usable `Retry-After` header
    overflow_fallback: Duration,
    /// Once the per-second limit is reached
    second_limit: Duration,
    /// Once the per-minute limit is reached
    minute_limit: Duration,
}

/// Why the gate refused a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// A cooldown deadline is in force
    Cooldown,
    /// The per-second window has no capacity left
    SecondLimit,
    /// The per-minute window has no capacity left
    MinuteLimit,
}

/// Mutable throttling state, guarded by the gate's mutex.
#[derive(Debug)]
struct ThrottleState {
    /// No call may be dispatched before this instant
    next_eligible: Instant,
    /// Start of the current 60-second accounting window
    window_start: Option<Instant>,
    /// Most recent permitted dispatch
    last_dispatch: Option<Instant>,
    calls_in_second: u32,
    calls_in_minute: u32,
    total_calls: u64,
    total_errors: u64,
    total_overflows: u64,
}

impl ThrottleState {
    fn new(now: Instant) -> Self {
        Self {
            next_eligible: now,
            window_start: None,
            last_dispatch: None,
            calls_in_second: 0,
            calls_in_minute: 0,
            total_calls: 0,
            total_errors: 0,
            total_overflows: 0,
        }
    }

    /// Reset any window that has fully elapsed. Boundaries are inclusive:
    /// a caller waking exactly at a window's edge lands in a fresh window.
    fn roll_windows(&mut self, now: Instant) {
        if let Some(last) = self.last_dispatch {
            if now.duration_since(last) >= SECOND_WINDOW {
                self.calls_in_second = 0;
            }
        }
        if let Some(start) = self.window_start {
            if now.duration_since(start) >= MINUTE_WINDOW {
                self.calls_in_minute = 0;
                self.window_start = None;
            }
        }
    }

    fn commit_dispatch(&mut self, now: Instant) {
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
        self.total_calls += 1;
        self.calls_in_second += 1;
        self.calls_in_minute += 1;
        self.last_dispatch = Some(now);
    }
}

/// The throttling checkpoint every outbound call passes through.
///
/// One gate guards one credential/endpoint-root pair and serializes all
/// dispatches through it.
#[derive(Debug)]
pub struct ThrottleGate {
    /// Maximum calls per second
    per_second: u32,
    /// Maximum calls per minute
    per_minute: u32,
    cooldown: CooldownPolicy,
    state: Mutex<ThrottleState>,
}

impl ThrottleGate {
    /// Create a gate from rate-limit and cooldown settings.
    pub fn new(rate: &RateLimitConfig, cooldown: &CooldownConfig) -> Self {
        Self {
            // a zero limit would close the gate forever
            per_second: rate.calls_per_second.max(1),
            per_minute: rate.calls_per_minute.max(1),
            cooldown: CooldownPolicy {
                upstream_error: Duration::from_secs(cooldown.upstream_error_secs),
                overflow_fallback: Duration::from_secs(cooldown.overflow_fallback_secs),
                second_limit: Duration::from_secs(cooldown.second_limit_secs),
                minute_limit: Duration::from_secs(cooldown.minute_limit_secs),
            },
            state: Mutex::new(ThrottleState::new(Instant::now())),
        }
    }

    /// Wait until the gate opens, then commit a dispatch.
    ///
    /// Blocks through any cooldown deadline and through capacity-exhausted
    /// windows. The lock is released while waiting and eligibility is
    /// re-checked on wake, since the deadline may have moved in between.
    pub async fn admit(&self, operation: &str) -> DispatchPermit<'_> {
        loop {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            match self.check(&mut state, now) {
                Ok(()) => {
                    state.commit_dispatch(now);
                    debug!(
                        operation,
                        calls_in_second = state.calls_in_second,
                        calls_in_minute = state.calls_in_minute,
                        "dispatch admitted"
                    );
                    return DispatchPermit { gate: self, state };
                }
                Err((reopen, reason)) => {
                    let wait = reopen.duration_since(now);
                    if reason == CloseReason::Cooldown {
                        debug!(
                            operation,
                            wait_ms = wait.as_millis(),
                            "gate closed, waiting out cooldown"
                        );
                    } else {
                        warn!(
                            operation,
                            calls_in_second = state.calls_in_second,
                            calls_in_minute = state.calls_in_minute,
                            wait_ms = wait.as_millis(),
                            "API call limit reached, throttling"
                        );
                    }
                    drop(state);
                    sleep_until(reopen).await;
                }
            }
        }
    }

    /// Commit a dispatch only if the gate is open right now.
    ///
    /// Returns [`Error::Throttled`] carrying the remaining wait otherwise;
    /// no network call is to be made in that case.
    pub async fn try_admit(&self, operation: &str) -> Result<DispatchPermit<'_>> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        match self.check(&mut state, now) {
            Ok(()) => {
                state.commit_dispatch(now);
                debug!(
                    operation,
                    calls_in_second = state.calls_in_second,
                    calls_in_minute = state.calls_in_minute,
                    "dispatch admitted"
                );
                Ok(DispatchPermit { gate: self, state })
            }
            Err((reopen, _)) => {
                let retry_in = reopen.duration_since(now);
                debug!(
                    operation,
                    retry_in_ms = retry_in.as_millis(),
                    "gate closed, rejecting non-blocking call"
                );
                Err(Error::Throttled { retry_in })
            }
        }
    }

    /// Snapshot the lifetime and window counters.
    ///
    /// Read-only: windows are not rolled, so the window counters reflect
    /// the state as of the last dispatch attempt.
    pub async fn stats(&self) -> ApiStats {
        let state = self.state.lock().await;
        ApiStats {
            total_calls: state.total_calls,
            total_errors: state.total_errors,
            total_overflows: state.total_overflows,
            calls_in_second: state.calls_in_second,
            calls_in_minute: state.calls_in_minute,
        }
    }

    /// Decide whether a dispatch may proceed at `now`.
    ///
    /// The deadline is checked first, then windows are rolled and the
    /// capacity of each live window is checked. A refusal carries the
    /// instant at which the gate frees.
    fn check(
        &self,
        state: &mut ThrottleState,
        now: Instant,
    ) -> Result<(), (Instant, CloseReason)> {
        if now < state.next_eligible {
            return Err((state.next_eligible, CloseReason::Cooldown));
        }

        state.roll_windows(now);

        if state.calls_in_second >= self.per_second {
            let reopen = state
                .last_dispatch
                .map_or(now, |last| last + SECOND_WINDOW);
            return Err((reopen, CloseReason::SecondLimit));
        }
        if state.calls_in_minute >= self.per_minute {
            let reopen = state
                .window_start
                .map_or(now, |start| start + MINUTE_WINDOW);
            return Err((reopen, CloseReason::MinuteLimit));
        }

        Ok(())
    }
}

/// Proof of an admitted dispatch.
///
/// The permit holds the gate lock for the duration of the HTTP call, so
/// concurrent callers are serialized through the gate. Consume it with
/// [`DispatchPermit::record`] once a status was obtained; dropping it
/// without recording (transport failure, cancellation) releases the lock
/// and leaves the deadline untouched.
#[derive(Debug)]
pub struct DispatchPermit<'a> {
    gate: &'a ThrottleGate,
    state: MutexGuard<'a, ThrottleState>,
}

impl DispatchPermit<'_> {
    /// Apply the post-dispatch adjustment for the observed status.
    ///
    /// Non-200 statuses apply the upstream-error cooldown; a 429 counts as
    /// an overflow and uses `retry_after` when given, the fallback cooldown
    /// otherwise. A 200 that reaches a window limit applies that limit's
    /// cooldown, the minute limit overriding the second when both trip.
    pub fn record(mut self, status: StatusCode, retry_after: Option<Duration>) {
        let now = Instant::now();

        let cooldown = if status != StatusCode::OK {
            self.state.total_errors += 1;
            if status == StatusCode::TOO_MANY_REQUESTS {
                self.state.total_overflows += 1;
                Some(retry_after.unwrap_or(self.gate.cooldown.overflow_fallback))
            } else {
                Some(self.gate.cooldown.upstream_error)
            }
        } else {
            let mut cooldown = None;
            if self.state.calls_in_second >= self.gate.per_second {
                cooldown = Some(self.gate.cooldown.second_limit);
            }
            if self.state.calls_in_minute >= self.gate.per_minute {
                cooldown = Some(self.gate.cooldown.minute_limit);
            }
            cooldown
        };

        if let Some(cooldown) = cooldown {
            // the deadline never moves backwards; an overflowing addition
            // saturates to the cooldown ceiling
            let target = now
                .checked_add(cooldown)
                .unwrap_or_else(|| now + MAX_COOLDOWN);
            self.state.next_eligible = self.state.next_eligible.max(target);
            debug!(
                status = status.as_u16(),
                cooldown_ms = cooldown.as_millis(),
                "cooldown applied"
            );
        }
    }
}

/// Parse a `Retry-After` header per RFC 7231: delta-seconds first, then an
/// HTTP-date converted to a delta against the current wall clock, with past
/// dates clamping to zero. `None` when the header is missing or unusable.
/// Parsed values cap at [`MAX_COOLDOWN`].
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs).min(MAX_COOLDOWN));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.signed_duration_since(Utc::now());
    Some(delta.to_std().unwrap_or(Duration::ZERO).min(MAX_COOLDOWN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::time::advance;

    fn make_gate(per_second: u32, per_minute: u32) -> ThrottleGate {
        ThrottleGate::new(
            &RateLimitConfig {
                calls_per_second: per_second,
                calls_per_minute: per_minute,
            },
            &CooldownConfig::default(),
        )
    }

    async fn dispatch_ok(gate: &ThrottleGate) {
        let permit = gate.admit("test_call").await;
        permit.record(StatusCode::OK, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_track_dispatches() {
        let gate = make_gate(20, 100);

        for _ in 0..3 {
            dispatch_ok(&gate).await;
        }

        let stats = gate.stats().await;
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.calls_in_second, 3);
        assert_eq!(stats.calls_in_minute, 3);
        assert_eq!(stats.total_errors, 0);
        assert_eq!(stats.total_overflows, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_window_rolls_over() {
        let gate = make_gate(20, 100);

        dispatch_ok(&gate).await;
        dispatch_ok(&gate).await;
        advance(Duration::from_secs(1)).await;
        dispatch_ok(&gate).await;

        let stats = gate.stats().await;
        assert_eq!(stats.calls_in_second, 1);
        assert_eq!(stats.calls_in_minute, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_limit_applies_short_cooldown() {
        let gate = make_gate(2, 100);

        dispatch_ok(&gate).await;
        dispatch_ok(&gate).await;

        let start = Instant::now();
        dispatch_ok(&gate).await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        let stats = gate.stats().await;
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.calls_in_second, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_limit_holds_until_window_expires() {
        let gate = make_gate(100, 2);

        dispatch_ok(&gate).await;
        dispatch_ok(&gate).await;

        // the minute-limit cooldown is on the deadline first
        let err = gate.try_admit("test_call").await.unwrap_err();
        match err {
            Error::Throttled { retry_in } => assert_eq!(retry_in, Duration::from_secs(20)),
            other => panic!("unexpected error: {other:?}"),
        }

        // past the deadline the window itself still has no capacity
        advance(Duration::from_secs(21)).await;
        let err = gate.try_admit("test_call").await.unwrap_err();
        match err {
            Error::Throttled { retry_in } => assert_eq!(retry_in, Duration::from_secs(39)),
            other => panic!("unexpected error: {other:?}"),
        }

        // a blocking caller is held until the window expires
        let start = Instant::now();
        dispatch_ok(&gate).await;
        assert_eq!(start.elapsed(), Duration::from_secs(39));

        let stats = gate.stats().await;
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.calls_in_minute, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_respects_retry_after() {
        let gate = make_gate(20, 100);

        let permit = gate.admit("test_call").await;
        permit.record(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(5)),
        );

        let start = Instant::now();
        dispatch_ok(&gate).await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        let stats = gate.stats().await;
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.total_overflows, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_without_retry_after_uses_fallback() {
        let gate = make_gate(20, 100);

        let permit = gate.admit("test_call").await;
        permit.record(StatusCode::TOO_MANY_REQUESTS, None);

        let err = gate.try_admit("test_call").await.unwrap_err();
        match err {
            Error::Throttled { retry_in } => assert_eq!(retry_in, Duration::from_secs(10)),
            other => panic!("unexpected error: {other:?}"),
        }

        let start = Instant::now();
        dispatch_ok(&gate).await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_retry_after_is_clamped() {
        let gate = make_gate(20, 100);

        // a server may send any delta-seconds value it likes
        let permit = gate.admit("test_call").await;
        permit.record(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(u64::MAX)),
        );

        let err = gate.try_admit("test_call").await.unwrap_err();
        match err {
            Error::Throttled { retry_in } => assert_eq!(retry_in, MAX_COOLDOWN),
            other => panic!("unexpected error: {other:?}"),
        }

        let stats = gate.stats().await;
        assert_eq!(stats.total_overflows, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_error_overrides_threshold_cooldown() {
        // per-second limit of 1 would apply a 1s cooldown on success; the
        // 30s upstream-error cooldown must win instead
        let gate = make_gate(1, 100);

        let permit = gate.admit("test_call").await;
        permit.record(StatusCode::INTERNAL_SERVER_ERROR, None);

        let start = Instant::now();
        dispatch_ok(&gate).await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));

        let stats = gate.stats().await;
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.total_overflows, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_permit_leaves_deadline_open() {
        let gate = make_gate(20, 100);

        let permit = gate.admit("test_call").await;
        drop(permit);

        // counters were committed at dispatch, but no cooldown was applied
        let permit = gate.try_admit("test_call").await.unwrap();
        permit.record(StatusCode::OK, None);

        let stats = gate.stats().await;
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.total_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_releases_the_gate() {
        let gate = Arc::new(make_gate(1, 100));
        dispatch_ok(&gate).await;

        // park a second caller in the timed wait of the closed gate
        let waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move {
                let permit = gate.admit("test_call").await;
                permit.record(StatusCode::OK, None);
            }
        });
        tokio::task::yield_now().await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        // the mutex is free and the waiter committed nothing
        let stats = gate.stats().await;
        assert_eq!(stats.total_calls, 1);
        let err = gate.try_admit("test_call").await.unwrap_err();
        match err {
            Error::Throttled { retry_in } => assert_eq!(retry_in, Duration::from_secs(1)),
            other => panic!("unexpected error: {other:?}"),
        }

        // the next caller dispatches on schedule
        advance(Duration::from_secs(1)).await;
        dispatch_ok(&gate).await;
        assert_eq!(gate.stats().await.total_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_over_dispatch() {
        let gate = Arc::new(make_gate(1, 100));
        let dispatched = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = Arc::clone(&gate);
            let dispatched = Arc::clone(&dispatched);
            handles.push(tokio::spawn(async move {
                let permit = gate.admit("test_call").await;
                dispatched.lock().unwrap().push(Instant::now());
                permit.record(StatusCode::OK, None);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut times = dispatched.lock().unwrap().clone();
        times.sort();
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }

        let stats = gate.stats().await;
        assert_eq!(stats.total_calls, 4);
        assert!(stats.calls_in_second <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_snapshot_serializes_for_monitoring() {
        let gate = make_gate(20, 100);
        dispatch_ok(&gate).await;

        let stats = gate.stats().await;
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["total_calls"], 1);
        assert_eq!(json["calls_in_minute"], 1);
        assert_eq!(json["total_errors"], 0);
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_retry_after_delta_seconds() {
        assert_eq!(
            parse_retry_after(&headers_with("5")),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            parse_retry_after(&headers_with("0")),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_retry_after_http_date() {
        let when = Utc::now() + chrono::Duration::seconds(90);
        let parsed = parse_retry_after(&headers_with(&when.to_rfc2822())).unwrap();
        assert!(parsed <= Duration::from_secs(90));
        assert!(parsed >= Duration::from_secs(80));
    }

    #[test]
    fn test_retry_after_past_date_clamps_to_zero() {
        let when = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(
            parse_retry_after(&headers_with(&when.to_rfc2822())),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_retry_after_clamps_oversized_values() {
        let huge = u64::MAX.to_string();
        assert_eq!(parse_retry_after(&headers_with(&huge)), Some(MAX_COOLDOWN));

        let when = Utc::now() + chrono::Duration::days(36500);
        assert_eq!(
            parse_retry_after(&headers_with(&when.to_rfc2822())),
            Some(MAX_COOLDOWN)
        );
    }

    #[test]
    fn test_retry_after_unusable_values() {
        assert_eq!(parse_retry_after(&headers_with("soon")), None);
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }
}
