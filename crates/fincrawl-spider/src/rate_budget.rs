use crate::{FetchError, Provider};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// How many calls a provider allows per fixed window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_calls: NonZeroU32,
    pub window: Duration,
}

impl RatePolicy {
    pub fn new(max_calls: NonZeroU32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    pub fn per_second(max_calls: NonZeroU32) -> Self {
        Self::new(max_calls, Duration::from_secs(1))
    }

    pub fn per_minute(max_calls: NonZeroU32) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }
}

/// What to do when a budget is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RateLimitMode {
    /// Sleep until the window resets, then issue the call.
    #[default]
    Block,

    /// Return [`FetchError::RateLimit`] immediately.
    FailFast,
}

impl FromStr for RateLimitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "block" => Ok(Self::Block),
            "fail-fast" | "failfast" => Ok(Self::FailFast),
            other => Err(format!("expected `block` or `fail-fast`, found `{other}`")),
        }
    }
}

/// Snapshot of a budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetStatus {
    Available { remaining: u32 },
    Exhausted { resets_in: Duration },
}

#[derive(Debug)]
struct Window {
    started: Instant,
    remaining: u32,
}

/// Fixed-window call counter for one provider.
///
/// Every attempted call takes one unit via [`RateBudget::acquire`], whether or not the request
/// that follows succeeds. When the window has elapsed, the next check replenishes the budget to
/// the policy's maximum. All access goes through one mutex, so callers sharing a budget can never
/// collectively exceed the policy.
#[derive(Debug)]
pub struct RateBudget {
    provider: Provider,
    policy: RatePolicy,
    mode: RateLimitMode,
    state: Mutex<Window>,
}

impl RateBudget {
    pub fn new(provider: Provider, policy: RatePolicy, mode: RateLimitMode) -> Self {
        Self {
            provider,
            policy,
            mode,
            state: Mutex::new(Window {
                started: Instant::now(),
                remaining: policy.max_calls.get(),
            }),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn mode(&self) -> RateLimitMode {
        self.mode
    }

    /// Take one call from the budget, blocking or failing per the configured mode.
    pub async fn acquire(&self) -> Result<(), FetchError> {
        loop {
            let wait = {
                let mut window = self.state.lock().await;
                self.replenish(&mut window);

                if window.remaining > 0 {
                    window.remaining -= 1;
                    trace!(
                        "{} budget: {} calls left in window",
                        self.provider,
                        window.remaining
                    );
                    return Ok(());
                }

                self.resets_in(&window)
            };

            match self.mode {
                RateLimitMode::FailFast => {
                    warn!("{} budget exhausted, resets in {wait:?}", self.provider);
                    return Err(FetchError::RateLimit {
                        provider: self.provider,
                        retry_after: wait,
                    });
                }
                RateLimitMode::Block => {
                    debug!(
                        "{} budget exhausted, waiting {wait:?} for the window to reset",
                        self.provider
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Current state of the budget, replenishing it first if the window has elapsed.
    pub async fn status(&self) -> BudgetStatus {
        let mut window = self.state.lock().await;
        self.replenish(&mut window);
        match window.remaining {
            0 => BudgetStatus::Exhausted {
                resets_in: self.resets_in(&window),
            },
            remaining => BudgetStatus::Available { remaining },
        }
    }

    fn replenish(&self, window: &mut Window) {
        let now = Instant::now();
        if now.duration_since(window.started) >= self.policy.window {
            if window.remaining < self.policy.max_calls.get() {
                debug!("{} budget replenished", self.provider);
            }
            window.started = now;
            window.remaining = self.policy.max_calls.get();
        }
    }

    fn resets_in(&self, window: &Window) -> Duration {
        self.policy
            .window
            .saturating_sub(Instant::now().duration_since(window.started))
    }
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
fn budget(max: u32, mode: RateLimitMode) -> RateBudget {
    RateBudget::new(
        Provider::Sec,
        RatePolicy::per_second(NonZeroU32::new(max).unwrap()),
        mode,
    )
}

#[tokio::test(start_paused = true)]
async fn exactly_the_limit_succeeds_per_window() {
    let budget = budget(3, RateLimitMode::FailFast);
    for _ in 0..3 {
        budget.acquire().await.unwrap();
    }
    for _ in 0..5 {
        assert!(matches!(
            budget.acquire().await,
            Err(FetchError::RateLimit {
                provider: Provider::Sec,
                ..
            })
        ));
    }
    assert!(matches!(
        budget.status().await,
        BudgetStatus::Exhausted { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn window_elapsing_replenishes_to_max() {
    let budget = budget(2, RateLimitMode::FailFast);
    budget.acquire().await.unwrap();
    budget.acquire().await.unwrap();
    assert!(budget.acquire().await.is_err());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(
        budget.status().await,
        BudgetStatus::Available { remaining: 2 }
    );
    budget.acquire().await.unwrap();
    budget.acquire().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn blocking_mode_waits_for_the_window() {
    let budget = budget(2, RateLimitMode::Block);
    let start = Instant::now();
    for _ in 0..5 {
        budget.acquire().await.unwrap();
    }
    // calls 3 & 4 wait one window, call 5 a second
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[test]
fn mode_parsing() {
    assert_eq!("block".parse::<RateLimitMode>(), Ok(RateLimitMode::Block));
    assert_eq!("FAIL_FAST".parse::<RateLimitMode>(), Ok(RateLimitMode::FailFast));
    assert!("sometimes".parse::<RateLimitMode>().is_err());
}
