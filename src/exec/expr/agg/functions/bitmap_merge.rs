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
use arrow::datatypes::DataType;
use roaring::RoaringTreemap;

use super::super::spec::is_variable_binary;
use super::super::{AggError, AggPhase, AggSignature, Aggregator, AggregatorState};
use super::AggregateFunction;
use crate::common::types::{EncodedValue, SortOrder};
use crate::exec::expr::ExprRef;
use crate::exec::expr::codec;
use crate::exec::expr::function::object::bitmap_common::{decode_bitmap, encode_bitmap};
use crate::exec::row::Row;

pub(super) const NAME: &str = "BITMAP_MERGE";

/// `BITMAP_MERGE(varbinary)`: union of bitmap payloads.
#[derive(Debug)]
pub struct BitmapMergeFunction {
    signature: AggSignature,
    children: Vec<ExprRef>,
}

impl BitmapMergeFunction {
    pub fn signature_def() -> AggSignature {
        AggSignature {
            name: NAME,
            output_type: DataType::Binary,
            intermediate_type: DataType::Binary,
            arg_count: 1,
            accepts_arg: is_variable_binary,
        }
    }

    pub fn try_new(children: Vec<ExprRef>) -> Result<Self, AggError> {
        let signature = Self::signature_def();
        signature.check(&children)?;
        Ok(Self {
            signature,
            children,
        })
    }
}

impl AggregateFunction for BitmapMergeFunction {
    fn signature(&self) -> &AggSignature {
        &self.signature
    }

    fn children(&self) -> &[ExprRef] {
        &self.children
    }

    fn new_aggregator(
        &self,
        phase: AggPhase,
        data_type: &DataType,
        sort_order: SortOrder,
        scratch: Option<Vec<u8>>,
    ) -> Result<AggregatorState, AggError> {
        if !is_variable_binary(data_type) {
            return Err(AggError::Signature {
                function: NAME,
                message: format!("aggregator input must be variable binary, got {data_type:?}"),
            });
        }
        let aggregator =
            BitmapMergeAggregator::new(data_type.clone(), sort_order, scratch.unwrap_or_default());
        Ok(AggregatorState::new(phase, Box::new(aggregator)))
    }

    fn evaluate(&self, row: &Row, out: &mut Vec<u8>) -> bool {
        match self.children.first() {
            Some(child) => child.evaluate(row, out),
            None => false,
        }
    }
}

/// Accumulates the union of bitmap payloads.
#[derive(Debug)]
pub struct BitmapMergeAggregator {
    data_type: DataType,
    sort_order: SortOrder,
    bitmap: RoaringTreemap,
    scratch: Vec<u8>,
    finalized: bool,
}

impl BitmapMergeAggregator {
    pub fn new(data_type: DataType, sort_order: SortOrder, mut scratch: Vec<u8>) -> Self {
        scratch.clear();
        Self {
            data_type,
            sort_order,
            bitmap: RoaringTreemap::new(),
            scratch,
            finalized: false,
        }
    }

    pub fn cardinality(&self) -> u64 {
        self.bitmap.len()
    }
}

impl Aggregator for BitmapMergeAggregator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    fn merge(&mut self, bytes: &[u8]) -> Result<(), AggError> {
        if self.finalized {
            return Err(AggError::Finalized { function: NAME });
        }
        let ascending = codec::normalize(bytes, self.sort_order, &mut self.scratch);
        let decoded = decode_bitmap(ascending).map_err(|message| AggError::Decode {
            function: NAME,
            data_type: self.data_type.clone(),
            message,
        })?;
        self.bitmap |= decoded;
        Ok(())
    }

    fn value(&mut self) -> Result<EncodedValue, AggError> {
        let bytes = encode_bitmap(&self.bitmap).map_err(|message| AggError::Encode {
            function: NAME,
            message,
        })?;
        self.finalized = true;
        Ok(EncodedValue::new(
            bytes,
            self.data_type.clone(),
            SortOrder::Ascending,
        ))
    }

    fn reset(&mut self) {
        self.bitmap.clear();
        self.scratch.clear();
        self.finalized = false;
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn estimated_size(&self) -> usize {
        self.bitmap.serialized_size() + self.scratch.capacity()
    }
}
