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
//! Integration tests for BITMAP_MERGE through the aggregate function registry.

use std::sync::Arc;

use arrow::array::{Array, BinaryArray};
use arrow::datatypes::DataType;
use bytes::Bytes;
use roaring::RoaringTreemap;

use crate::common::bitmap_payload;
use novapush::exec::expr::agg::{AggFunctionRegistry, AggPhase, build_intermediate_array};
use novapush::exec::expr::codec;
use novapush::exec::expr::function::object::bitmap_common::decode_bitmap;
use novapush::exec::expr::{ExprRef, LiteralExpr, SlotRef};
use novapush::{AggError, Row, ServerAggContext, SortOrder, UniqueId};

mod common;

fn slot(sort_order: SortOrder) -> ExprRef {
    Arc::new(SlotRef::new(0, DataType::Binary, sort_order))
}

fn ctx() -> ServerAggContext {
    ServerAggContext::new(UniqueId { hi: 7, lo: 11 }, "p0")
}

fn values_of(bytes: &[u8]) -> Vec<u64> {
    decode_bitmap(bytes).expect("decode bitmap").iter().collect()
}

#[test]
fn test_union_example_from_three_partials() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("bitmap_merge", vec![slot(SortOrder::Ascending)]).expect("create");
    let mut client = func.new_client_aggregator().expect("client aggregator");
    assert_eq!(client.phase(), AggPhase::Client);
    // 0b0011, 0b0100 and 0b1000 as bit positions.
    client.merge(&bitmap_payload(&[0, 1])).expect("merge");
    client.merge(&bitmap_payload(&[2])).expect("merge");
    client.merge(&bitmap_payload(&[3])).expect("merge");
    let value = client.value().expect("value");
    assert_eq!(value.sort_order, SortOrder::Ascending);
    assert_eq!(value.data_type, DataType::Binary);
    assert_eq!(values_of(&value.bytes), vec![0, 1, 2, 3]);
}

#[test]
fn test_merge_order_does_not_change_result() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    let partials = [
        bitmap_payload(&[1, 5, 9]),
        bitmap_payload(&[u32::MAX as u64 + 3]),
        bitmap_payload(&[]),
        bitmap_payload(&(0..100).collect::<Vec<_>>()),
    ];
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
    let mut results = Vec::new();
    for order in orders {
        let mut agg = func.new_client_aggregator().expect("client");
        for idx in order {
            agg.merge(&partials[idx]).expect("merge");
        }
        results.push(agg.value().expect("value").bytes);
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    let values = values_of(&results[0]);
    assert_eq!(values.len(), 101);
    assert_eq!(values.last(), Some(&(u32::MAX as u64 + 3)));
}

#[test]
fn test_tree_aggregation_is_a_fixed_point() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    let mut left = func.new_server_aggregator(&ctx()).expect("server");
    let mut right = func.new_server_aggregator(&ctx()).expect("server");
    left.merge(&bitmap_payload(&[1, 2])).expect("merge");
    right.merge(&bitmap_payload(&[2, 3])).expect("merge");

    let mut root = func.new_client_aggregator().expect("client");
    root.merge_value(&left.value().expect("left")).expect("merge left");
    root.merge_value(&right.value().expect("right")).expect("merge right");
    let once = root.value().expect("root");
    assert_eq!(root.value().expect("re-read"), once);

    let mut again = func.new_client_aggregator().expect("client");
    again.merge(&once.bytes).expect("merge finalized output");
    assert_eq!(again.value().expect("value"), once);
}

#[test]
fn test_descending_server_input_matches_ascending() {
    let registry = AggFunctionRegistry::default();
    let asc_func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("asc");
    let desc_func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Descending)]).expect("desc");
    let mut asc = asc_func.new_server_aggregator(&ctx()).expect("asc server");
    let mut desc = desc_func
        .new_server_aggregator_with_buffer(&ctx(), Vec::with_capacity(64))
        .expect("desc server");
    assert_eq!(desc.sort_order(), SortOrder::Descending);
    for values in [&[4_u64, 8][..], &[15], &[1 << 40]] {
        let payload = bitmap_payload(values);
        asc.merge(&payload).expect("asc merge");
        desc.merge(&codec::encode(&payload, SortOrder::Descending)).expect("desc merge");
    }
    assert_eq!(asc.value().expect("asc"), desc.value().expect("desc"));
}

#[test]
fn test_decode_failure_leaves_state_unchanged() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    let mut agg = func.new_client_aggregator().expect("client");
    agg.merge(&bitmap_payload(&[3])).expect("merge");
    for bad in [&[1_u8, 0xAA][..], &[99], &[2, 0x3A, 0x30]] {
        let err = agg.merge(bad).unwrap_err();
        assert!(matches!(err, AggError::Decode { function: "BITMAP_MERGE", .. }));
    }
    assert_eq!(values_of(&agg.value().expect("value").bytes), vec![3]);
}

#[test]
fn test_merge_after_value_requires_reset() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    let mut agg = func.new_client_aggregator().expect("client");
    agg.merge(&bitmap_payload(&[1])).expect("merge");
    let _ = agg.value().expect("value");
    assert!(agg.is_finalized());
    assert_eq!(
        agg.merge(&bitmap_payload(&[2])),
        Err(AggError::Finalized { function: "BITMAP_MERGE" })
    );
    agg.reset();
    agg.merge(&bitmap_payload(&[2])).expect("merge after reset");
    assert_eq!(values_of(&agg.value().expect("value").bytes), vec![2]);
}

#[test]
fn test_intermediate_column_round_trips_through_client() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    let mut servers = (0..3)
        .map(|i| {
            let mut agg = func.new_server_aggregator(&ctx()).expect("server");
            agg.merge(&bitmap_payload(&[i, i + 10])).expect("merge");
            agg
        })
        .collect::<Vec<_>>();
    let column = build_intermediate_array(&mut servers).expect("intermediate column");
    let column = column.as_any().downcast_ref::<BinaryArray>().expect("binary column");
    assert_eq!(column.len(), 3);

    let mut with_null: Vec<Option<&[u8]>> = column.iter().collect();
    with_null.push(None);
    let with_null = BinaryArray::from_opt_vec(with_null);
    let mut client = func.new_client_aggregator().expect("client");
    client.merge_array(&with_null).expect("merge array");
    assert_eq!(values_of(&client.value().expect("value").bytes), vec![0, 1, 2, 10, 11, 12]);
}

#[test]
fn test_registry_rejects_bad_arguments() {
    let registry = AggFunctionRegistry::default();
    assert!(matches!(
        registry.create("BITMAP_MERGE", vec![]),
        Err(AggError::Signature { .. })
    ));
    let int_slot: ExprRef = Arc::new(SlotRef::new(0, DataType::Int64, SortOrder::Ascending));
    assert!(matches!(
        registry.create("BITMAP_MERGE", vec![int_slot]),
        Err(AggError::Signature { .. })
    ));
    assert!(matches!(
        registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending), slot(SortOrder::Ascending)]),
        Err(AggError::Signature { .. })
    ));
    assert_eq!(
        registry.create("BITMAP_UNION", vec![slot(SortOrder::Ascending)]).unwrap_err(),
        AggError::UnknownFunction("BITMAP_UNION".to_string())
    );
    assert!(registry.signature("bitmap_merge").is_some());
}

#[test]
fn test_constant_argument_overwrites_row_value() {
    let registry = AggFunctionRegistry::default();
    let literal = bitmap_payload(&[42]);
    let child: ExprRef = Arc::new(LiteralExpr::binary(literal.clone()));
    let func = registry.create("BITMAP_MERGE", vec![child]).expect("create");
    assert!(func.is_constant());

    let row = Row::new(Bytes::from_static(b"k1"), vec![Some(Bytes::from(bitmap_payload(&[1])))]);
    let mut out = b"stale".to_vec();
    assert!(func.evaluate(&row, &mut out));
    assert_eq!(out, literal);

    let mut server = func.new_server_aggregator(&ctx()).expect("server");
    server.merge(&out).expect("merge literal");
    assert_eq!(values_of(&server.value().expect("value").bytes), vec![42]);
}

#[test]
fn test_non_constant_evaluate_reads_row_column() {
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    assert!(!func.is_constant());
    let payload = bitmap_payload(&[5]);
    let row = Row::new(Bytes::from_static(b"k1"), vec![Some(Bytes::from(payload.clone()))]);
    let mut out = Vec::new();
    assert!(func.evaluate(&row, &mut out));
    assert_eq!(out, payload);

    let empty = Row::new(Bytes::from_static(b"k2"), vec![None]);
    out.clear();
    assert!(!func.evaluate(&empty, &mut out));
}

#[test]
fn test_large_union_is_canonical() {
    let expected: RoaringTreemap = (0..5_000_u64).map(|v| v * 3).collect();
    let registry = AggFunctionRegistry::default();
    let func = registry.create("BITMAP_MERGE", vec![slot(SortOrder::Ascending)]).expect("create");
    let mut agg = func.new_client_aggregator().expect("client");
    for chunk in expected.iter().collect::<Vec<_>>().chunks(700) {
        agg.merge(&bitmap_payload(chunk)).expect("merge");
    }
    let bytes = agg.value().expect("value").bytes;
    assert_eq!(decode_bitmap(&bytes).expect("decode"), expected);
    assert!(agg.estimated_size() > 0);
}
