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

use super::super::{AggError, AggPhase, AggSignature, AggregatorState};
use super::{AggregateFunction, ServerAggContext};
use crate::common::types::{EncodedValue, SortOrder};
use crate::exec::expr::ExprRef;
use crate::exec::expr::codec;
use crate::exec::row::Row;
use crate::pushdown_logging::debug;

/// Wraps a function whose arguments are all literals.
///
/// Per-row evaluation yields the literal's ascending bytes once the wrapped
/// function reports a value for the row, so server aggregators built here
/// read ascending input regardless of the literal's own sort order.
#[derive(Debug)]
pub struct ConstantFolded {
    inner: Box<dyn AggregateFunction>,
    literal: Vec<u8>,
}

impl ConstantFolded {
    pub fn new(inner: Box<dyn AggregateFunction>) -> Result<Self, AggError> {
        let child = inner.aggregator_expression()?;
        let Some(bytes) = child.literal() else {
            return Err(AggError::Signature {
                function: inner.name(),
                message: "constant folding requires a literal argument".to_string(),
            });
        };
        if !inner.is_constant() {
            return Err(AggError::Signature {
                function: inner.name(),
                message: "constant folding requires every argument to be literal".to_string(),
            });
        }
        let literal = codec::decode(&EncodedValue::new(
            bytes.to_vec(),
            child.data_type().clone(),
            child.sort_order(),
        ));
        Ok(Self { inner, literal })
    }

    pub fn literal_bytes(&self) -> &[u8] {
        &self.literal
    }

    pub fn inner(&self) -> &dyn AggregateFunction {
        self.inner.as_ref()
    }
}

impl AggregateFunction for ConstantFolded {
    fn signature(&self) -> &AggSignature {
        self.inner.signature()
    }

    fn children(&self) -> &[ExprRef] {
        self.inner.children()
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn new_aggregator(
        &self,
        phase: AggPhase,
        data_type: &DataType,
        sort_order: SortOrder,
        scratch: Option<Vec<u8>>,
    ) -> Result<AggregatorState, AggError> {
        self.inner
            .new_aggregator(phase, data_type, sort_order, scratch)
    }

    fn evaluate(&self, row: &Row, out: &mut Vec<u8>) -> bool {
        if !self.inner.evaluate(row, out) {
            return false;
        }
        out.clear();
        out.extend_from_slice(&self.literal);
        true
    }

    fn new_server_aggregator(&self, ctx: &ServerAggContext) -> Result<AggregatorState, AggError> {
        let child = self.aggregator_expression()?;
        debug!(
            function = self.name(),
            query_id = %ctx.query_id,
            partition = %ctx.partition,
            "create server aggregator for folded constant"
        );
        self.new_aggregator(AggPhase::Server, child.data_type(), SortOrder::Ascending, None)
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
            "create server aggregator for folded constant with caller buffer"
        );
        self.new_aggregator(
            AggPhase::Server,
            child.data_type(),
            SortOrder::Ascending,
            Some(scratch),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::common::types::UniqueId;
    use crate::exec::expr::agg::BitmapMergeFunction;
    use crate::exec::expr::function::object::bitmap_common::{decode_bitmap, encode_bitmap};
    use crate::exec::expr::{Expr, LiteralExpr, SlotRef};

    fn payload(values: &[u64]) -> Vec<u8> {
        encode_bitmap(&values.iter().copied().collect()).expect("encode bitmap")
    }

    /// A literal-typed child whose per-row evaluation can be switched off,
    /// standing in for a constant expression that reports no value.
    #[derive(Debug)]
    struct SilentLiteral(LiteralExpr);

    impl Expr for SilentLiteral {
        fn evaluate(&self, _row: &Row, out: &mut Vec<u8>) -> bool {
            out.clear();
            out.extend_from_slice(b"stale");
            false
        }

        fn data_type(&self) -> &DataType {
            self.0.data_type()
        }

        fn sort_order(&self) -> SortOrder {
            self.0.sort_order()
        }

        fn literal(&self) -> Option<&[u8]> {
            self.0.literal()
        }
    }

    fn folded(child: ExprRef) -> ConstantFolded {
        let inner = BitmapMergeFunction::try_new(vec![child]).expect("build");
        ConstantFolded::new(Box::new(inner)).expect("fold")
    }

    #[test]
    fn evaluate_returns_literal_bytes_for_any_row() {
        let lit = payload(&[0, 1, 2, 3]);
        let func = folded(Arc::new(LiteralExpr::binary(lit.clone())));
        let rows = [
            Row::new(Bytes::from_static(b"a"), vec![]),
            Row::new(Bytes::from_static(b"b"), vec![Some(Bytes::from_static(b"junk"))]),
        ];
        for row in &rows {
            let mut out = vec![0xee; 3];
            assert!(func.evaluate(row, &mut out));
            assert_eq!(out, lit);
        }
    }

    #[test]
    fn descending_literal_is_normalized() {
        let lit = payload(&[6]);
        let desc = LiteralExpr::new(
            codec::encode(&lit, SortOrder::Descending),
            DataType::Binary,
            SortOrder::Descending,
        );
        let func = folded(Arc::new(desc));
        assert_eq!(func.literal_bytes(), lit.as_slice());

        let ctx = ServerAggContext::new(UniqueId { hi: 0, lo: 7 }, "p1");
        let mut server = func.new_server_aggregator(&ctx).expect("server");
        assert_eq!(server.sort_order(), SortOrder::Ascending);
        let mut out = Vec::new();
        assert!(func.evaluate(&Row::new(Bytes::new(), vec![]), &mut out));
        server.merge(&out).expect("merge folded bytes");
        let value = server.value().expect("value");
        assert_eq!(
            decode_bitmap(&value.bytes).expect("decode").iter().collect::<Vec<_>>(),
            vec![6]
        );
    }

    #[test]
    fn no_value_is_not_replaced_by_literal() {
        let lit = LiteralExpr::binary(payload(&[1]));
        let func = folded(Arc::new(SilentLiteral(lit)));
        let mut out = Vec::new();
        assert!(!func.evaluate(&Row::new(Bytes::new(), vec![]), &mut out));
        assert_ne!(out, payload(&[1]));
    }

    #[test]
    fn folding_requires_literal_argument() {
        let slot: ExprRef = Arc::new(SlotRef::new(0, DataType::Binary, SortOrder::Ascending));
        let inner = BitmapMergeFunction::try_new(vec![slot]).expect("build");
        let err = ConstantFolded::new(Box::new(inner)).expect_err("slot is not literal");
        assert!(matches!(err, AggError::Signature { .. }));
    }
}
