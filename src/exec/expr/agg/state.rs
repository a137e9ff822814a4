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
use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BinaryArray, BinaryBuilder, LargeBinaryArray};
use arrow::datatypes::DataType;

use super::AggError;
use crate::common::types::{EncodedValue, SortOrder};
use crate::exec::expr::codec;

/// Accumulator behind an `AggregatorState`.
///
/// `merge` must be commutative and associative. `value` finalizes the
/// state; later merges fail with `AggError::Finalized` until `reset`.
pub trait Aggregator: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Declared type of the bytes accepted by `merge`.
    fn data_type(&self) -> &DataType;

    /// Byte order of the bytes accepted by `merge`.
    fn sort_order(&self) -> SortOrder;

    fn merge(&mut self, bytes: &[u8]) -> Result<(), AggError>;

    /// Encoded accumulated state, always in ascending order so it can be
    /// merged by any client aggregator of the same function.
    fn value(&mut self) -> Result<EncodedValue, AggError>;

    fn reset(&mut self);

    fn is_finalized(&self) -> bool;

    fn estimated_size(&self) -> usize;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AggPhase {
    /// Coordinator side: merges partial states produced by servers.
    Client,
    /// Partition side: merges raw column values.
    Server,
}

/// An aggregator tagged with the phase it was built for.
#[derive(Debug)]
pub struct AggregatorState {
    phase: AggPhase,
    inner: Box<dyn Aggregator>,
}

impl AggregatorState {
    pub fn new(phase: AggPhase, inner: Box<dyn Aggregator>) -> Self {
        Self { phase, inner }
    }

    pub fn phase(&self) -> AggPhase {
        self.phase
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn data_type(&self) -> &DataType {
        self.inner.data_type()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.inner.sort_order()
    }

    /// Merges bytes encoded in this aggregator's own sort order.
    pub fn merge(&mut self, bytes: &[u8]) -> Result<(), AggError> {
        self.inner.merge(bytes)
    }

    /// Merges a value that carries its own sort order, converting it when it
    /// differs from the aggregator's.
    pub fn merge_value(&mut self, value: &EncodedValue) -> Result<(), AggError> {
        if value.sort_order == self.sort_order() {
            return self.inner.merge(&value.bytes);
        }
        let ascending = codec::decode(value);
        let converted = codec::encode(&ascending, self.sort_order());
        self.inner.merge(&converted)
    }

    /// Merges every non-null entry of a binary column of partial states.
    /// Stops at the first undecodable entry.
    pub fn merge_array(&mut self, array: &dyn Array) -> Result<(), AggError> {
        if let Some(binary) = array.as_any().downcast_ref::<BinaryArray>() {
            for bytes in binary.iter().flatten() {
                self.inner.merge(bytes)?;
            }
            return Ok(());
        }
        if let Some(binary) = array.as_any().downcast_ref::<LargeBinaryArray>() {
            for bytes in binary.iter().flatten() {
                self.inner.merge(bytes)?;
            }
            return Ok(());
        }
        Err(AggError::Signature {
            function: self.inner.name(),
            message: format!("expected a binary column, got {:?}", array.data_type()),
        })
    }

    pub fn value(&mut self) -> Result<EncodedValue, AggError> {
        self.inner.value()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.is_finalized()
    }

    pub fn estimated_size(&self) -> usize {
        self.inner.estimated_size()
    }
}

/// Finalizes each state into one row of a binary column, the shape in
/// which partition results are shipped to the coordinator.
pub fn build_intermediate_array(states: &mut [AggregatorState]) -> Result<ArrayRef, AggError> {
    let mut builder = BinaryBuilder::with_capacity(states.len(), 0);
    for state in states.iter_mut() {
        let value = state.value()?;
        builder.append_value(&value.bytes);
    }
    Ok(Arc::new(builder.finish()))
}
