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

/// Reads one column of the scanned row as stored.
#[derive(Clone, Debug)]
pub struct SlotRef {
    column: usize,
    data_type: DataType,
    sort_order: SortOrder,
}

impl SlotRef {
    pub fn new(column: usize, data_type: DataType, sort_order: SortOrder) -> Self {
        Self {
            column,
            data_type,
            sort_order,
        }
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl Expr for SlotRef {
    fn evaluate(&self, row: &Row, out: &mut Vec<u8>) -> bool {
        let Some(value) = row.value(self.column) else {
            return false;
        };
        out.clear();
        out.extend_from_slice(value);
        true
    }

    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn sort_order(&self) -> SortOrder {
        self.sort_order
    }
}
