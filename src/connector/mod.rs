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
//! Seam between the result iterator and the partitioned store's scan
//! service. Implementations own the wire protocol; the iterator only sees
//! cursors, rows and lease expiries.

pub mod scan_range;

use std::fmt;
use std::time::Instant;

use thiserror::Error;

use crate::exec::row::Row;

pub use scan_range::ScanDescriptor;

/// Server-side cursor handle returned by `issue_scan`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CursorId(pub u64);

impl fmt::Display for CursorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cursor#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScanGrant {
    pub cursor: CursorId,
    /// Instant at which the server reclaims the cursor unless renewed.
    pub expiry: Instant,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TransportError {
    #[error("{0} expired on the server")]
    ExpiredCursor(CursorId),
    #[error("{0} is unknown to the server")]
    UnknownCursor(CursorId),
    #[error("invalid scan request: {0}")]
    InvalidScan(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("transport io error: {0}")]
    Io(String),
}

impl TransportError {
    /// The cursor is gone; only a fresh scan can continue the range.
    pub fn is_cursor_lost(&self) -> bool {
        matches!(
            self,
            TransportError::ExpiredCursor(_) | TransportError::UnknownCursor(_)
        )
    }
}

/// Blocking scan transport. Calls may come from the iterator's owner thread
/// and, for lease renewal, from the data runtime's blocking pool.
pub trait ScanTransport: Send + Sync {
    fn name(&self) -> &'static str {
        "scan-transport"
    }

    fn issue_scan(&self, descriptor: &ScanDescriptor) -> Result<ScanGrant, TransportError>;

    /// `Ok(None)` means the range is exhausted.
    fn fetch_next(&self, cursor: CursorId) -> Result<Option<Row>, TransportError>;

    /// Returns the new server-side expiry of `cursor`.
    fn renew_lease(&self, cursor: CursorId) -> Result<Instant, TransportError>;

    fn close_cursor(&self, cursor: CursorId);
}
