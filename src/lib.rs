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
//! Push-down aggregation and lease-renewing partition scans.
//!
//! `exec::expr::agg` holds the two-phase aggregate function framework with
//! `BITMAP_MERGE`; `exec::operators::scan` holds the result iterator that feeds
//! per-partition server aggregators from a `connector::ScanTransport`.

pub mod common;
pub mod connector;
pub mod exec;
pub mod runtime;

pub use common::app_config as pushdown_config;
pub use common::logging as pushdown_logging;

pub use common::types::{EncodedValue, SortOrder, UniqueId};
pub use connector::{CursorId, ScanDescriptor, ScanGrant, ScanTransport, TransportError};
pub use exec::expr::agg::{
    AggError, AggFunctionRegistry, AggPhase, AggregateFunction, AggregatorState, ServerAggContext,
};
pub use exec::operators::scan::{
    DefaultResultIteratorFactory, IteratorState, ResultIterator, ResultIteratorFactory, ScanError,
};
pub use exec::row::Row;
pub use runtime::scan_metrics::ScanMetrics;
