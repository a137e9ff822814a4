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
//! Metrics sink of a partition scan.

use bytes::Bytes;

use crate::connector::ScanDescriptor;
use crate::runtime::profile::{CounterRef, CounterUnit, RuntimeProfile, ScopedTimer};

/// Counters reported by one result iterator. Sinks of parallel partitions
/// can be combined into one query-level sink in any order.
#[derive(Clone, Debug)]
pub struct ScanMetrics {
    profile: RuntimeProfile,
    rows_returned: CounterRef,
    fetch_calls: CounterRef,
    scans_issued: CounterRef,
    lease_renewals: CounterRef,
    lease_restarts: CounterRef,
    cursors_closed: CounterRef,
}

impl ScanMetrics {
    pub const ROWS_RETURNED: &'static str = "RowsReturned";
    pub const FETCH_CALLS: &'static str = "FetchCalls";
    pub const SCANS_ISSUED: &'static str = "ScansIssued";
    pub const LEASE_RENEWALS: &'static str = "LeaseRenewals";
    pub const LEASE_RESTARTS: &'static str = "LeaseRestarts";
    pub const CURSORS_CLOSED: &'static str = "CursorsClosed";
    pub const SCAN_TIME: &'static str = "ScanTime";
    pub const SCAN_RANGE: &'static str = "ScanRange";
    pub const RESUME_KEY: &'static str = "ResumeKey";

    pub fn new(profile: RuntimeProfile) -> Self {
        Self {
            rows_returned: profile.add_counter(Self::ROWS_RETURNED, CounterUnit::Unit),
            fetch_calls: profile.add_counter(Self::FETCH_CALLS, CounterUnit::Unit),
            scans_issued: profile.add_counter(Self::SCANS_ISSUED, CounterUnit::Unit),
            lease_renewals: profile.add_counter(Self::LEASE_RENEWALS, CounterUnit::Unit),
            lease_restarts: profile.add_counter(Self::LEASE_RESTARTS, CounterUnit::Unit),
            cursors_closed: profile.add_counter(Self::CURSORS_CLOSED, CounterUnit::Unit),
            profile,
        }
    }

    pub fn profile(&self) -> &RuntimeProfile {
        &self.profile
    }

    pub fn combine(&self, other: &ScanMetrics) {
        self.profile.combine(&other.profile);
    }

    pub(crate) fn scan_timer(&self) -> ScopedTimer {
        self.profile.scoped_timer(Self::SCAN_TIME)
    }

    pub(crate) fn record_scan_range(&self, descriptor: &ScanDescriptor) {
        self.profile.add_info_string(
            Self::SCAN_RANGE,
            format!("{:?}..{:?}", descriptor.start, descriptor.stop),
        );
    }

    pub(crate) fn record_resume_key(&self, key: &Bytes) {
        self.profile
            .add_info_string(Self::RESUME_KEY, format!("{key:?}"));
    }

    pub(crate) fn record_row(&self) {
        self.rows_returned.add(1);
    }

    pub(crate) fn record_fetch(&self) {
        self.fetch_calls.add(1);
    }

    pub(crate) fn record_scan_issued(&self) {
        self.scans_issued.add(1);
    }

    pub(crate) fn record_renewal(&self) {
        self.lease_renewals.add(1);
    }

    pub(crate) fn record_restart(&self) {
        self.lease_restarts.add(1);
    }

    pub(crate) fn record_cursor_closed(&self) {
        self.cursors_closed.add(1);
    }

    pub fn rows_returned(&self) -> i64 {
        self.rows_returned.value()
    }

    pub fn fetch_calls(&self) -> i64 {
        self.fetch_calls.value()
    }

    pub fn scans_issued(&self) -> i64 {
        self.scans_issued.value()
    }

    pub fn lease_renewals(&self) -> i64 {
        self.lease_renewals.value()
    }

    pub fn lease_restarts(&self) -> i64 {
        self.lease_restarts.value()
    }

    pub fn cursors_closed(&self) -> i64 {
        self.cursors_closed.value()
    }

    pub fn scan_range(&self) -> Option<String> {
        self.profile.get_info_string(Self::SCAN_RANGE)
    }

    /// Last key a restarted scan resumed after.
    pub fn resume_key(&self) -> Option<String> {
        self.profile.get_info_string(Self::RESUME_KEY)
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new(RuntimeProfile::new("ResultIterator"))
    }
}
