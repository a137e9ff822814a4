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
use std::ops::Bound;

use bytes::Bytes;

/// Key range plus projection handed to `ScanTransport::issue_scan`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanDescriptor {
    pub start: Bound<Bytes>,
    pub stop: Bound<Bytes>,
    /// Column indexes to return; empty means all columns.
    pub columns: Vec<usize>,
    pub estimated_cost: u64,
}

impl ScanDescriptor {
    pub fn new(start: Bound<Bytes>, stop: Bound<Bytes>) -> Self {
        Self {
            start,
            stop,
            columns: Vec::new(),
            estimated_cost: 0,
        }
    }

    pub fn full_range() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// `[start, stop)`
    pub fn half_open(start: impl Into<Bytes>, stop: impl Into<Bytes>) -> Self {
        Self::new(Bound::Included(start.into()), Bound::Excluded(stop.into()))
    }

    pub fn with_columns(mut self, columns: Vec<usize>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_estimated_cost(mut self, cost: u64) -> Self {
        self.estimated_cost = cost;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let (Some(start), Some(stop)) = (bound_key(&self.start), bound_key(&self.stop)) else {
            return Ok(());
        };
        if start > stop {
            return Err(format!(
                "scan start key {:?} sorts after stop key {:?}",
                start, stop
            ));
        }
        Ok(())
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = match &self.start {
            Bound::Unbounded => true,
            Bound::Included(start) => key >= start.as_ref(),
            Bound::Excluded(start) => key > start.as_ref(),
        };
        let before_stop = match &self.stop {
            Bound::Unbounded => true,
            Bound::Included(stop) => key <= stop.as_ref(),
            Bound::Excluded(stop) => key < stop.as_ref(),
        };
        after_start && before_stop
    }

    /// Same range and projection, starting strictly after `last_key`.
    pub fn resume_after(&self, last_key: &Bytes) -> ScanDescriptor {
        ScanDescriptor {
            start: Bound::Excluded(last_key.clone()),
            stop: self.stop.clone(),
            columns: self.columns.clone(),
            estimated_cost: self.estimated_cost,
        }
    }
}

fn bound_key(bound: &Bound<Bytes>) -> Option<&[u8]> {
    match bound {
        Bound::Included(key) | Bound::Excluded(key) => Some(key.as_ref()),
        Bound::Unbounded => None,
    }
}
