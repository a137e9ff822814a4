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
//! Lease-renewing iterator over one partition scan.
//!
//! Responsibilities:
//! - Drives `ScanTransport` cursors for a `ScanDescriptor` and hands rows to a single owner.
//! - Renews the cursor lease ahead of expiry, overlapping the renewal with row fetches.
//! - Restarts the scan strictly after the last delivered key when the cursor is lost.
//!
//! Key exported interfaces:
//! - Types: `ResultIterator`, `ResultIteratorOptions`, `IteratorState`, `ScanError`.
//!
//! At most one recovery action (renewal or restart) is in flight per iterator. A restart
//! cancels the pending renewal by dropping its receiver; a renewal result that still
//! arrives is discarded by its cursor generation.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::common::config;
use crate::connector::{CursorId, ScanDescriptor, ScanTransport, TransportError};
use crate::exec::operators::scan::lease::{Lease, LeaseError};
use crate::exec::row::Row;
use crate::pushdown_logging::{debug, error, info, warn};
use crate::runtime::global_async_runtime::spawn_data_blocking;
use crate::runtime::scan_metrics::ScanMetrics;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ScanError {
    #[error("invalid scan descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("invalid lease: {0}")]
    InvalidLease(#[from] LeaseError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("scan lost its cursor {restarts} times in a row without progress")]
    RestartLimitExceeded { restarts: usize },
    #[error("result iterator is closed")]
    Closed,
    #[error("result iterator failed: {0}")]
    Failed(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IteratorState {
    NotStarted,
    Scanning,
    Renewing,
    RetryingAfterExpiry,
    Exhausted,
    Closed,
    Failed,
}

impl IteratorState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IteratorState::Exhausted | IteratorState::Closed | IteratorState::Failed
        )
    }
}

#[derive(Clone, Debug)]
pub struct ResultIteratorOptions {
    pub renew_lease_threshold: Duration,
    /// Consecutive restarts allowed without delivering a row.
    pub max_lease_restarts: usize,
    pub background_renewal: bool,
}

impl ResultIteratorOptions {
    pub fn with_threshold(renew_lease_threshold: Duration) -> Self {
        Self {
            renew_lease_threshold,
            ..Self::default()
        }
    }
}

impl Default for ResultIteratorOptions {
    fn default() -> Self {
        Self {
            renew_lease_threshold: config::lease_renewal_threshold(),
            max_lease_restarts: config::max_lease_restarts(),
            background_renewal: config::background_lease_renewal(),
        }
    }
}

struct ActiveCursor {
    id: CursorId,
    lease: Lease,
    generation: u64,
}

struct PendingRenewal {
    cursor: CursorId,
    generation: u64,
    rx: oneshot::Receiver<Result<Instant, TransportError>>,
}

pub struct ResultIterator {
    descriptor: ScanDescriptor,
    transport: Arc<dyn ScanTransport>,
    metrics: ScanMetrics,
    options: ResultIteratorOptions,
    state: IteratorState,
    cursor: Option<ActiveCursor>,
    pending_renewal: Option<PendingRenewal>,
    generation: u64,
    last_key: Option<Bytes>,
    restarts_without_progress: usize,
    failure: Option<String>,
}

impl ResultIterator {
    pub fn new(
        descriptor: ScanDescriptor,
        transport: Arc<dyn ScanTransport>,
        metrics: ScanMetrics,
        options: ResultIteratorOptions,
    ) -> Self {
        Self {
            descriptor,
            transport,
            metrics,
            options,
            state: IteratorState::NotStarted,
            cursor: None,
            pending_renewal: None,
            generation: 0,
            last_key: None,
            restarts_without_progress: 0,
            failure: None,
        }
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    pub fn descriptor(&self) -> &ScanDescriptor {
        &self.descriptor
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    pub fn last_key(&self) -> Option<&Bytes> {
        self.last_key.as_ref()
    }

    /// Next row of the range, `Ok(None)` once the range is exhausted.
    pub fn next(&mut self) -> Result<Option<Row>, ScanError> {
        match self.state {
            IteratorState::Exhausted => return Ok(None),
            IteratorState::Closed => return Err(ScanError::Closed),
            IteratorState::Failed => {
                return Err(ScanError::Failed(self.failure.clone().unwrap_or_default()));
            }
            _ => {}
        }
        let _timer = self.metrics.scan_timer();
        let result = self.step();
        if let Err(err) = &result {
            self.fail(err);
        }
        result
    }

    /// Rows until exhaustion or the first error.
    pub fn rows(&mut self) -> impl Iterator<Item = Result<Row, ScanError>> + '_ {
        let mut done = false;
        std::iter::from_fn(move || {
            if done {
                return None;
            }
            match self.next() {
                Ok(Some(row)) => Some(Ok(row)),
                Ok(None) => {
                    done = true;
                    None
                }
                Err(err) => {
                    done = true;
                    Some(Err(err))
                }
            }
        })
    }

    /// Releases the lease and server cursor. Safe to call repeatedly; a failed
    /// iterator keeps reporting its failure.
    pub fn close(&mut self) {
        if self.state == IteratorState::Closed {
            return;
        }
        self.pending_renewal = None;
        self.release_cursor();
        if self.state != IteratorState::Failed {
            debug!(
                transport = self.transport.name(),
                from = ?self.state,
                "result iterator closed"
            );
            self.state = IteratorState::Closed;
        }
    }

    fn step(&mut self) -> Result<Option<Row>, ScanError> {
        if self.state == IteratorState::NotStarted {
            self.descriptor
                .validate()
                .map_err(ScanError::InvalidDescriptor)?;
            let descriptor = self.descriptor.clone();
            self.metrics.record_scan_range(&descriptor);
            self.open_cursor(&descriptor)?;
            info!(
                transport = self.transport.name(),
                start = ?self.descriptor.start,
                stop = ?self.descriptor.stop,
                estimated_cost = self.descriptor.estimated_cost,
                "partition scan started"
            );
        }
        loop {
            self.harvest_renewal();
            if self.state == IteratorState::RetryingAfterExpiry {
                self.restart()?;
            }
            let now = Instant::now();
            let Some(active) = self.cursor.as_ref() else {
                return Err(ScanError::Failed(format!(
                    "no open cursor in state {:?}",
                    self.state
                )));
            };
            let cursor = active.id;
            if active.lease.is_expired(now) {
                self.begin_retry("lease expired locally", true);
                continue;
            }
            if active.lease.should_renew(now) && self.pending_renewal.is_none() {
                self.renew(cursor);
                if self.state == IteratorState::RetryingAfterExpiry {
                    continue;
                }
            }

            self.metrics.record_fetch();
            match self.transport.fetch_next(cursor) {
                Ok(Some(row)) => {
                    self.last_key = Some(row.key().clone());
                    self.restarts_without_progress = 0;
                    self.metrics.record_row();
                    return Ok(Some(row));
                }
                Ok(None) => {
                    self.pending_renewal = None;
                    self.release_cursor();
                    self.state = IteratorState::Exhausted;
                    info!(
                        transport = self.transport.name(),
                        rows = self.metrics.rows_returned(),
                        restarts = self.metrics.lease_restarts(),
                        "partition scan exhausted"
                    );
                    return Ok(None);
                }
                Err(err) if err.is_cursor_lost() => {
                    self.begin_retry(&err.to_string(), false);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn open_cursor(&mut self, descriptor: &ScanDescriptor) -> Result<(), ScanError> {
        let grant = self.transport.issue_scan(descriptor)?;
        self.metrics.record_scan_issued();
        let lease = match Lease::new(grant.expiry, self.options.renew_lease_threshold, Instant::now())
        {
            Ok(lease) => lease,
            Err(err) => {
                self.transport.close_cursor(grant.cursor);
                self.metrics.record_cursor_closed();
                return Err(err.into());
            }
        };
        self.generation += 1;
        self.cursor = Some(ActiveCursor {
            id: grant.cursor,
            lease,
            generation: self.generation,
        });
        self.state = IteratorState::Scanning;
        Ok(())
    }

    /// Drops the cursor and any in-flight renewal. A cursor the server already
    /// reclaimed is not closed again.
    fn begin_retry(&mut self, reason: &str, close_cursor: bool) {
        self.pending_renewal = None;
        if close_cursor {
            self.release_cursor();
        } else if let Some(mut active) = self.cursor.take() {
            active.lease.release();
        }
        warn!(
            transport = self.transport.name(),
            last_key = ?self.last_key,
            reason,
            "scan cursor lost, restarting after last delivered key"
        );
        self.state = IteratorState::RetryingAfterExpiry;
    }

    fn restart(&mut self) -> Result<(), ScanError> {
        if self.restarts_without_progress >= self.options.max_lease_restarts {
            return Err(ScanError::RestartLimitExceeded {
                restarts: self.restarts_without_progress,
            });
        }
        self.restarts_without_progress += 1;
        self.metrics.record_restart();
        let descriptor = match &self.last_key {
            Some(key) => {
                self.metrics.record_resume_key(key);
                self.descriptor.resume_after(key)
            }
            None => self.descriptor.clone(),
        };
        self.open_cursor(&descriptor)?;
        info!(
            transport = self.transport.name(),
            attempt = self.restarts_without_progress,
            start = ?descriptor.start,
            "partition scan restarted"
        );
        Ok(())
    }

    fn renew(&mut self, cursor: CursorId) {
        if self.options.background_renewal {
            let (tx, rx) = oneshot::channel();
            let transport = Arc::clone(&self.transport);
            let spawned = spawn_data_blocking(move || {
                let _ = tx.send(transport.renew_lease(cursor));
            });
            match spawned {
                Ok(_detached) => {
                    self.pending_renewal = Some(PendingRenewal {
                        cursor,
                        generation: self.generation,
                        rx,
                    });
                    self.state = IteratorState::Renewing;
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "background lease renewal unavailable, renewing inline");
                }
            }
        }
        let outcome = self.transport.renew_lease(cursor);
        self.apply_renewal(cursor, outcome);
    }

    fn harvest_renewal(&mut self) {
        let Some(pending) = self.pending_renewal.as_mut() else {
            return;
        };
        let outcome = match pending.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => None,
        };
        let Some(pending) = self.pending_renewal.take() else {
            return;
        };
        if self.state == IteratorState::Renewing {
            self.state = IteratorState::Scanning;
        }
        let current = self.cursor.as_ref().map(|c| c.generation);
        if current != Some(pending.generation) {
            debug!(
                cursor = %pending.cursor,
                generation = pending.generation,
                "discarding renewal for a replaced cursor"
            );
            return;
        }
        match outcome {
            Some(outcome) => self.apply_renewal(pending.cursor, outcome),
            None => warn!(cursor = %pending.cursor, "lease renewal task dropped without a result"),
        }
    }

    fn apply_renewal(&mut self, cursor: CursorId, outcome: Result<Instant, TransportError>) {
        match outcome {
            Ok(expiry) => {
                let Some(active) = self.cursor.as_mut() else {
                    return;
                };
                if let Err(err) = active.lease.renew(expiry) {
                    warn!(cursor = %cursor, error = %err, "lease renewal not applied");
                    return;
                }
                self.metrics.record_renewal();
                debug!(
                    cursor = %cursor,
                    remaining_ms = active.lease.remaining(Instant::now()).as_millis() as u64,
                    "scan lease renewed"
                );
            }
            Err(err) if err.is_cursor_lost() => self.begin_retry(&err.to_string(), false),
            // Renewal is advisory; the next step retries while the lease is still live.
            Err(err) => warn!(cursor = %cursor, error = %err, "scan lease renewal failed"),
        }
    }

    fn release_cursor(&mut self) {
        if let Some(mut active) = self.cursor.take() {
            if active.lease.release() {
                self.transport.close_cursor(active.id);
                self.metrics.record_cursor_closed();
            }
        }
    }

    fn fail(&mut self, err: &ScanError) {
        self.pending_renewal = None;
        self.release_cursor();
        self.state = IteratorState::Failed;
        self.failure = Some(err.to_string());
        error!(
            transport = self.transport.name(),
            last_key = ?self.last_key,
            error = %err,
            "partition scan failed"
        );
    }
}

impl Drop for ResultIterator {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ResultIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultIterator")
            .field("transport", &self.transport.name())
            .field("state", &self.state)
            .field("cursor", &self.cursor.as_ref().map(|c| c.id))
            .field("last_key", &self.last_key)
            .field("restarts_without_progress", &self.restarts_without_progress)
            .finish()
    }
}
