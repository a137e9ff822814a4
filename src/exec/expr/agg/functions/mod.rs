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
mod bitmap_merge;
mod constant;

pub use bitmap_merge::{BitmapMergeAggregator, BitmapMergeFunction};
pub use constant::ConstantFolded;

use std::collections::HashMap;
use std::fmt;

use arrow::datatypes::DataType;

use super::{AggError, AggPhase, AggSignature, AggregatorState};
use crate::common::types::{SortOrder, UniqueId};
use crate::exec::expr::ExprRef;
use crate::exec::row::Row;
use crate::pushdown_logging::debug;

/// Per-partition context handed to server aggregator construction.
#[derive(Clone, Debug)]
pub struct ServerAggContext {
    pub query_id: UniqueId,
    pub partition: String,
}

impl ServerAggContext {
    pub fn new(query_id: UniqueId, partition: impl Into<String>) -> Self {
        Self {
            query_id,
            partition: partition.into(),
        }
    }
}

pub trait AggregateFunction: Send + Sync + fmt::Debug {
    fn signature(&self) -> &AggSignature;

    fn children(&self) -> &[ExprRef];

    fn data_type(&self) -> &DataType {
        &self.signature().output_type
    }

    fn name(&self) -> &'static str {
        self.signature().name
    }

    /// True iff every child is a literal.
    fn is_constant(&self) -> bool {
        self.children().iter().all(|c| c.is_constant())
    }

    /// Builds an aggregator that accepts `data_type` bytes in `sort_order`.
    /// `scratch` is adopted as the aggregator's decode buffer when given.
    fn new_aggregator(
        &self,
        phase: AggPhase,
        data_type: &DataType,
        sort_order: SortOrder,
        scratch: Option<Vec<u8>>,
    ) -> Result<AggregatorState, AggError>;

    /// Evaluates the aggregated expression for one row. `false` means the
    /// row has no value and must be skipped.
    fn evaluate(&self, row: &Row, out: &mut Vec<u8>) -> bool;

    /// The child whose per-row bytes feed the server aggregator.
    fn aggregator_expression(&self) -> Result<&ExprRef, AggError> {
        self.children().first().ok_or_else(|| AggError::Signature {
            function: self.name(),
            message: "missing aggregated argument".to_string(),
        })
    }

    /// Coordinator values were normalized by the server phase, so the
    /// client always reads ascending bytes of the declared type.
    fn new_client_aggregator(&self) -> Result<AggregatorState, AggError> {
        self.new_aggregator(
            AggPhase::Client,
            &self.signature().intermediate_type,
            SortOrder::default(),
            None,
        )
    }

    /// Raw stored bytes keep the child's own type and sort order.
    fn new_server_aggregator(&self, ctx: &ServerAggContext) -> Result<AggregatorState, AggError> {
        let child = self.aggregator_expression()?;
        debug!(
            function = self.name(),
            query_id = %ctx.query_id,
            partition = %ctx.partition,
            sort_order = %child.sort_order(),
            "create server aggregator"
        );
        self.new_aggregator(AggPhase::Server, child.data_type(), child.sort_order(), None)
    }

    fn new_server_aggregator_with_buffer(
        &self,
        ctx: &ServerAggContext,
        scratch: Vec<u8>,
    ) -> Result<AggregatorState, AggError> {
        let child = self.aggregator_expression()?;
        debug!(
            function = self.name(),
            query_id = %ctx.query_id,
            partition = %ctx.partition,
            scratch_capacity = scratch.capacity(),
            "create server aggregator with caller buffer"
        );
        self.new_aggregator(
            AggPhase::Server,
            child.data_type(),
            child.sort_order(),
            Some(scratch),
        )
    }
}

pub type AggFunctionBuilder = fn(Vec<ExprRef>) -> Result<Box<dyn AggregateFunction>, AggError>;

struct RegisteredFunction {
    signature: AggSignature,
    builder: AggFunctionBuilder,
}

/// Name → aggregate function lookup used by plan lowering.
pub struct AggFunctionRegistry {
    functions: HashMap<&'static str, RegisteredFunction>,
}

fn canonical_agg_name(name: &str) -> String {
    name.split_once('|')
        .map(|(base, _)| base)
        .unwrap_or(name)
        .trim()
        .to_ascii_uppercase()
}

impl AggFunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, signature: AggSignature, builder: AggFunctionBuilder) {
        self.functions.insert(
            signature.name,
            RegisteredFunction { signature, builder },
        );
    }

    pub fn signature(&self, name: &str) -> Option<&AggSignature> {
        self.functions
            .get(canonical_agg_name(name).as_str())
            .map(|f| &f.signature)
    }

    /// Checks the arguments against the registered signature and builds the
    /// function. All-literal calls come back wrapped in `ConstantFolded`.
    pub fn create(
        &self,
        name: &str,
        children: Vec<ExprRef>,
    ) -> Result<Box<dyn AggregateFunction>, AggError> {
        let canonical = canonical_agg_name(name);
        let Some(registered) = self.functions.get(canonical.as_str()) else {
            return Err(AggError::UnknownFunction(name.to_string()));
        };
        registered.signature.check(&children)?;
        let func = (registered.builder)(children)?;
        if func.is_constant() {
            debug!(function = func.name(), "fold constant aggregate argument");
            return Ok(Box::new(ConstantFolded::new(func)?));
        }
        Ok(func)
    }
}

impl Default for AggFunctionRegistry {
    fn default() -> Self {
        let mut reg = AggFunctionRegistry::new();
        reg.register(BitmapMergeFunction::signature_def(), |children| {
            Ok(Box::new(BitmapMergeFunction::try_new(children)?))
        });
        reg
    }
}

impl fmt::Debug for AggFunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort();
        f.debug_struct("AggFunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
