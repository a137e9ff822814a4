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
pub mod agg;
pub mod codec;
pub mod function;
mod literal;
mod slot;

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::DataType;

use crate::common::types::SortOrder;
use crate::exec::row::Row;

pub use literal::LiteralExpr;
pub use slot::SlotRef;

/// Row-at-a-time scalar expression evaluated on the scan path.
pub trait Expr: Send + Sync + fmt::Debug {
    /// Writes the encoded result into `out`. Returns `false` when the
    /// expression has no value for this row (missing or null input);
    /// `out` is unspecified in that case.
    fn evaluate(&self, row: &Row, out: &mut Vec<u8>) -> bool;

    fn data_type(&self) -> &DataType;

    fn sort_order(&self) -> SortOrder;

    /// The literal's encoded bytes when this expression is a compile-time
    /// constant.
    fn literal(&self) -> Option<&[u8]> {
        None
    }

    fn is_constant(&self) -> bool {
        self.literal().is_some()
    }
}

pub type ExprRef = Arc<dyn Expr>;
