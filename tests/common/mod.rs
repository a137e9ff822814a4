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
//! Shared helpers for integration tests: an in-memory scan transport with
//! injectable cursor faults, and bitmap payload builders.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use roaring::RoaringTreemap;

use novapush::exec::expr::function::object::bitmap_common::encode_bitmap;
use novapush::pushdown_logging;
use novapush::{CursorId, Row, ScanDescriptor, ScanGrant, ScanTransport, TransportError};

pub const TEST_LEASE: Duration = Duration::from_secs(60);

pub fn init_test_logging() {
    pushdown_logging::init_with_level("novapush=debug");
}

pub fn bitmap_payload(values: &[u64]) -> Vec<u8> {
    let bitmap: RoaringTreemap = values.iter().copied().collect();
    encode_bitmap(&bitmap).expect("encode bitmap")
}

pub fn key(i: usize) -> Bytes {
    Bytes::from(format!("k{i}"))
}

struct OpenCursor {
    descriptor: ScanDescriptor,
    last_key: Option<Bytes>,
    delivered: usize,
}

/// Sorted in-memory partition served through `ScanTransport`.
pub struct InMemoryTransport {
    rows: BTreeMap<Bytes, Row>,
    lease: Duration,
    next_cursor: AtomicU64,
    cursors: Mutex<HashMap<CursorId, OpenCursor>>,
    /// One-shot: the next cursor to deliver this many rows expires on its following fetch.
    expire_after_rows: Mutex<Option<usize>>,
    expire_every_fetch: AtomicBool,
    /// One-shot: the next renewal reports `UnknownCursor` and drops the cursor.
    forget_on_renew: AtomicBool,
    renew_delay: Mutex<Duration>,
    fetch_fault: Mutex<Option<TransportError>>,
    issue_fault: Mutex<Option<TransportError>>,
    issued: Mutex<Vec<ScanDescriptor>>,
    closed: Mutex<Vec<CursorId>>,
    renewals: AtomicUsize,
}

impl InMemoryTransport {
    pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
        Self::with_lease(rows, TEST_LEASE)
    }

    pub fn with_lease(rows: impl IntoIterator<Item = Row>, lease: Duration) -> Self {
        Self {
            rows: rows.into_iter().map(|r| (r.key().clone(), r)).collect(),
            lease,
            next_cursor: AtomicU64::new(1),
            cursors: Mutex::new(HashMap::new()),
            expire_after_rows: Mutex::new(None),
            expire_every_fetch: AtomicBool::new(false),
            forget_on_renew: AtomicBool::new(false),
            renew_delay: Mutex::new(Duration::ZERO),
            fetch_fault: Mutex::new(None),
            issue_fault: Mutex::new(None),
            issued: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            renewals: AtomicUsize::new(0),
        }
    }

    /// Rows `k0..k{n}` whose single column holds the bitmap `{i}`.
    pub fn with_bitmap_rows(n: usize) -> Self {
        Self::new((0..n).map(|i| {
            Row::new(key(i), vec![Some(Bytes::from(bitmap_payload(&[i as u64])))])
        }))
    }

    pub fn expire_after_rows(&self, rows: usize) {
        *self.expire_after_rows.lock().unwrap() = Some(rows);
    }

    pub fn expire_every_fetch(&self, enabled: bool) {
        self.expire_every_fetch.store(enabled, Ordering::SeqCst);
    }

    pub fn forget_cursor_on_next_renewal(&self) {
        self.forget_on_renew.store(true, Ordering::SeqCst);
    }

    pub fn set_renew_delay(&self, delay: Duration) {
        *self.renew_delay.lock().unwrap() = delay;
    }

    pub fn fail_next_fetch(&self, err: TransportError) {
        *self.fetch_fault.lock().unwrap() = Some(err);
    }

    pub fn fail_next_issue(&self, err: TransportError) {
        *self.issue_fault.lock().unwrap() = Some(err);
    }

    pub fn issued(&self) -> Vec<ScanDescriptor> {
        self.issued.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<CursorId> {
        self.closed.lock().unwrap().clone()
    }

    pub fn renewals(&self) -> usize {
        self.renewals.load(Ordering::SeqCst)
    }

    pub fn open_cursors(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }
}

impl ScanTransport for InMemoryTransport {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn issue_scan(&self, descriptor: &ScanDescriptor) -> Result<ScanGrant, TransportError> {
        if let Some(err) = self.issue_fault.lock().unwrap().take() {
            return Err(err);
        }
        let cursor = CursorId(self.next_cursor.fetch_add(1, Ordering::SeqCst));
        self.issued.lock().unwrap().push(descriptor.clone());
        self.cursors.lock().unwrap().insert(
            cursor,
            OpenCursor {
                descriptor: descriptor.clone(),
                last_key: None,
                delivered: 0,
            },
        );
        Ok(ScanGrant {
            cursor,
            expiry: Instant::now() + self.lease,
        })
    }

    fn fetch_next(&self, cursor: CursorId) -> Result<Option<Row>, TransportError> {
        if let Some(err) = self.fetch_fault.lock().unwrap().take() {
            return Err(err);
        }
        let mut cursors = self.cursors.lock().unwrap();
        if self.expire_every_fetch.load(Ordering::SeqCst) {
            cursors.remove(&cursor);
            return Err(TransportError::ExpiredCursor(cursor));
        }
        let Some(delivered) = cursors.get(&cursor).map(|open| open.delivered) else {
            return Err(TransportError::ExpiredCursor(cursor));
        };
        {
            let mut expire_after = self.expire_after_rows.lock().unwrap();
            if *expire_after == Some(delivered) {
                *expire_after = None;
                cursors.remove(&cursor);
                return Err(TransportError::ExpiredCursor(cursor));
            }
        }
        let Some(open) = cursors.get_mut(&cursor) else {
            return Err(TransportError::ExpiredCursor(cursor));
        };
        let next = self.rows.iter().find(|&(k, _)| {
            open.descriptor.contains(k) && open.last_key.as_ref().is_none_or(|last| k > last)
        });
        let Some((k, row)) = next else {
            return Ok(None);
        };
        open.last_key = Some(k.clone());
        open.delivered += 1;
        if open.descriptor.columns.is_empty() {
            Ok(Some(row.clone()))
        } else {
            Ok(Some(row.project(&open.descriptor.columns)))
        }
    }

    fn renew_lease(&self, cursor: CursorId) -> Result<Instant, TransportError> {
        let delay = *self.renew_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut cursors = self.cursors.lock().unwrap();
        if self.forget_on_renew.swap(false, Ordering::SeqCst) {
            cursors.remove(&cursor);
        }
        if !cursors.contains_key(&cursor) {
            return Err(TransportError::UnknownCursor(cursor));
        }
        self.renewals.fetch_add(1, Ordering::SeqCst);
        Ok(Instant::now() + self.lease)
    }

    fn close_cursor(&self, cursor: CursorId) {
        self.cursors.lock().unwrap().remove(&cursor);
        self.closed.lock().unwrap().push(cursor);
    }
}
