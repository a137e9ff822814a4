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
//! Two-phase aggregate functions.
//!
//! A function hands out either a client aggregator (folds already-merged
//! partial states at the coordinator) or a server aggregator (runs per
//! partition over raw column bytes). Both are `AggregatorState`s and share
//! one merge contract: merges commute and associate, and a finalized value
//! can be merged again elsewhere.

mod error;
pub use error::AggError;
mod spec;
pub use spec::AggSignature;
mod state;
pub use state::{AggPhase, Aggregator, AggregatorState, build_intermediate_array};
mod functions;
pub use functions::{
    AggFunctionBuilder, AggFunctionRegistry, AggregateFunction, BitmapMergeAggregator,
    BitmapMergeFunction, ConstantFolded, ServerAggContext,
};
