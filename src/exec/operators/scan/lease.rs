// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum LeaseError {
    #[error("lease renewal threshold {threshold:?} must be shorter than lease duration {duration:?}")]
    InvalidThreshold {
        threshold: Duration,
        duration: Duration,
    },
    #[error("lease already released")]
    Released,
}

/// Client-side view of the time-bound grant keeping a server cursor open.
#[derive(Clone, Debug)]
pub struct Lease {
    expiry: Instant,
    renewal_threshold: Duration,
    duration: Duration,
    released: bool,
}

impl Lease {
    pub fn new(expiry: Instant, renewal_threshold: Duration, now: Instant) -> Result<Self, LeaseError> {
        let duration = expiry.saturating_duration_since(now);
        if renewal_threshold >= duration {
            return Err(LeaseError::InvalidThreshold {
                threshold: renewal_threshold,
                duration,
            });
        }
        Ok(Self {
            expiry,
            renewal_threshold,
            duration,
            released: false,
        })
    }

    pub fn expiry(&self) -> Instant {
        self.expiry
    }

    pub fn renewal_threshold(&self) -> Duration {
        self.renewal_threshold
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expiry
    }

    pub fn should_renew(&self, now: Instant) -> bool {
        self.remaining(now) <= self.renewal_threshold
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.expiry.saturating_duration_since(now)
    }

    /// Never moves the expiry backwards.
    pub fn renew(&mut self, new_expiry: Instant) -> Result<(), LeaseError> {
        if self.released {
            return Err(LeaseError::Released);
        }
        self.expiry = self.expiry.max(new_expiry);
        Ok(())
    }

    /// Returns true only on the first call.
    pub fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn threshold_must_be_shorter_than_duration() {
        let now = Instant::now();
        let err = Lease::new(now + 10 * SECOND, 10 * SECOND, now).unwrap_err();
        assert!(matches!(err, LeaseError::InvalidThreshold { .. }));
        assert!(Lease::new(now + 10 * SECOND, 11 * SECOND, now).is_err());
        assert!(Lease::new(now, Duration::ZERO, now).is_err());
        let lease = Lease::new(now + 10 * SECOND, 3 * SECOND, now).expect("lease");
        assert_eq!(lease.duration(), 10 * SECOND);
    }

    #[test]
    fn renewal_window_and_expiry() {
        let now = Instant::now();
        let lease = Lease::new(now + 10 * SECOND, 3 * SECOND, now).expect("lease");
        assert!(!lease.should_renew(now));
        assert!(!lease.should_renew(now + 6 * SECOND));
        assert!(lease.should_renew(now + 7 * SECOND));
        assert!(!lease.is_expired(now + 9 * SECOND));
        assert!(lease.is_expired(now + 10 * SECOND));
        assert!(lease.should_renew(now + 20 * SECOND));
        assert_eq!(lease.remaining(now + 20 * SECOND), Duration::ZERO);
    }

    #[test]
    fn renew_only_extends() {
        let now = Instant::now();
        let mut lease = Lease::new(now + 10 * SECOND, 3 * SECOND, now).expect("lease");
        lease.renew(now + 20 * SECOND).expect("renew");
        assert_eq!(lease.expiry(), now + 20 * SECOND);
        lease.renew(now + 5 * SECOND).expect("renew");
        assert_eq!(lease.expiry(), now + 20 * SECOND);
    }

    #[test]
    fn release_is_idempotent_and_blocks_renewal() {
        let now = Instant::now();
        let mut lease = Lease::new(now + 10 * SECOND, 3 * SECOND, now).expect("lease");
        assert!(lease.release());
        assert!(!lease.release());
        assert_eq!(lease.renew(now + 30 * SECOND), Err(LeaseError::Released));
    }
}
