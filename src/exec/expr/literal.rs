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

use super::Expr;
use crate::common::types::SortOrder;
use crate::exec::row::Row;

/// A constant with fixed encoded bytes.
#[derive(Clone, Debug)]
pub struct LiteralExpr {
    bytes: Vec<u8>,
    data_type: DataType,
    sort_order: SortOrder,
}

impl LiteralExpr {
    pub fn new(bytes: Vec<u8>, data_type: DataType, sort_order: SortOrder) -> Self {
        Self {
            bytes,
            data_type,
            sort_order,
        }
    }

    pub fn binary(bytes: Vec<u8>) -> Self {
        Self::new(bytes, DataType::Binary, SortOrder::Ascending)
    }
}

impl Expr for LiteralExpr {
    fn evaluate(&self, _row: &Row, out: &mut Vec<u8>) -> bool {
        out.clear();
        out.extend_from_slice(&self.bytes);
        true
    }

    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    fn literal(&self) -> Option<&[u8]> {
        Some(&self.bytes)
    }
}
