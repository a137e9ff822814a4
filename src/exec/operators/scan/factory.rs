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
use std::sync::Arc;
use std::time::Duration;

use crate::connector::{ScanDescriptor, ScanTransport};
use crate::exec::operators::scan::result_iterator::{ResultIterator, ResultIteratorOptions};
use crate::runtime::scan_metrics::ScanMetrics;

/// Builds the iterator that scans one partition.
pub trait ResultIteratorFactory: Send + Sync {
    fn new_iterator(
        &self,
        descriptor: ScanDescriptor,
        metrics: ScanMetrics,
        renew_lease_threshold: Duration,
    ) -> ResultIterator;
}

/// Factory over a single transport. Restart limit and background renewal
/// come from `[scan]` config unless overridden.
#[derive(Clone)]
pub struct DefaultResultIteratorFactory {
    transport: Arc<dyn ScanTransport>,
    max_lease_restarts: Option<usize>,
    background_renewal: Option<bool>,
}

impl DefaultResultIteratorFactory {
    pub fn new(transport: Arc<dyn ScanTransport>) -> Self {
        Self {
            transport,
            max_lease_restarts: None,
            background_renewal: None,
        }
    }

    pub fn with_max_lease_restarts(mut self, restarts: usize) -> Self {
        self.max_lease_restarts = Some(restarts);
        self
    }

    pub fn with_background_renewal(mut self, enabled: bool) -> Self {
        self.background_renewal = Some(enabled);
        self
    }

    pub fn transport(&self) -> &Arc<dyn ScanTransport> {
        &self.transport
    }
}

impl ResultIteratorFactory for DefaultResultIteratorFactory {
    fn new_iterator(
        &self,
        descriptor: ScanDescriptor,
        metrics: ScanMetrics,
        renew_lease_threshold: Duration,
    ) -> ResultIterator {
        let mut options = ResultIteratorOptions::with_threshold(renew_lease_threshold);
        if let Some(restarts) = self.max_lease_restarts {
            options.max_lease_restarts = restarts;
        }
        if let Some(enabled) = self.background_renewal {
            options.background_renewal = enabled;
        }
        ResultIterator::new(descriptor, Arc::clone(&self.transport), metrics, options)
    }
}

impl std::fmt::Debug for DefaultResultIteratorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultResultIteratorFactory")
            .field("transport", &self.transport.name())
            .field("max_lease_restarts", &self.max_lease_restarts)
            .field("background_renewal", &self.background_renewal)
            .finish()
    }
}
