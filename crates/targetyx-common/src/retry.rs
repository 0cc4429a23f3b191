//! Bounded retry policy for fallible requests.
//!
//! A [`Retryer`] invokes an operation up to `max_tries` times with a fixed
//! blocking sleep between attempts. Attempts `1..max_tries` are guarded:
//! a failure accepted by the retry predicate is logged and retried, any
//! other failure propagates immediately. The last attempt is unguarded and
//! its error, if any, is returned to the caller as-is.
//!
//! ```
//! use targetyx_common::{RetryConfig, Retryer};
//!
//! let mut retryer = Retryer::new(RetryConfig::new(3, 0.0).unwrap()).unwrap();
//! let mut calls = 0;
//! let value: Result<u32, String> = retryer.run(|| {
//!     calls += 1;
//!     if calls < 2 { Err("flaky".to_string()) } else { Ok(7) }
//! });
//! assert_eq!(value, Ok(7));
//! assert_eq!(retryer.tries(), 2);
//! ```

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TargetyxError};

/// Retry parameters. Callers may override these per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the final unguarded one.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Fixed delay between attempts.
    #[serde(default = "default_seconds_to_wait")]
    pub seconds_to_wait: f64,
}

fn default_max_tries() -> u32 { 3 }
fn default_seconds_to_wait() -> f64 { 10.0 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
            seconds_to_wait: default_seconds_to_wait(),
        }
    }
}

impl RetryConfig {
    pub fn new(max_tries: u32, seconds_to_wait: f64) -> Result<Self> {
        let config = Self { max_tries, seconds_to_wait };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tries < 1 {
            return Err(TargetyxError::InvalidQueryParameter(format!(
                "max_tries must be at least 1, got {}",
                self.max_tries
            )));
        }
        self.try_delay().map(|_| ())
    }

    /// Fixed delay between attempts; fails when `seconds_to_wait` is
    /// negative, not finite or too large for a `Duration`.
    pub fn try_delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.seconds_to_wait).map_err(|_| {
            TargetyxError::InvalidQueryParameter(format!(
                "seconds_to_wait must be a non-negative number of seconds, got {}",
                self.seconds_to_wait
            ))
        })
    }
}

/// Stateful retry runner. `tries()` reports the attempt count of the most
/// recent `run`.
#[derive(Debug, Clone)]
pub struct Retryer {
    max_tries: u32,
    delay: Duration,
    tries: u32,
}

impl Retryer {
    pub fn new(config: RetryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_tries: config.max_tries,
            delay: config.try_delay()?,
            tries: 1,
        })
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Retry on every error.
    pub fn run<T, E, F>(&mut self, op: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> std::result::Result<T, E>,
        E: Display,
    {
        self.run_if(op, |_| true)
    }

    /// Retry only errors accepted by `should_retry`; others propagate on the
    /// attempt that raised them.
    pub fn run_if<T, E, F, P>(&mut self, mut op: F, should_retry: P) -> std::result::Result<T, E>
    where
        F: FnMut() -> std::result::Result<T, E>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        self.tries = 1;
        while self.tries < self.max_tries {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if should_retry(&e) => {
                    warn!(
                        "Exception caught: {}. Failed attempt {} / {}. Retrying...",
                        e, self.tries, self.max_tries
                    );
                    thread::sleep(self.delay);
                }
                Err(e) => return Err(e),
            }
            self.tries += 1;
        }
        info!("Last attempt {} / {}.", self.tries, self.max_tries);
        op()
    }
}
