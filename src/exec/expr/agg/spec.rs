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

use super::AggError;
use crate::exec::expr::ExprRef;

/// Registration contract of an aggregate function: its name, output type
/// and the argument types it accepts.
#[derive(Clone, Debug)]
pub struct AggSignature {
    pub name: &'static str,
    pub output_type: DataType,
    /// Declared type of partial states exchanged between phases.
    pub intermediate_type: DataType,
    pub arg_count: usize,
    pub accepts_arg: fn(&DataType) -> bool,
}

impl AggSignature {
    pub fn check(&self, children: &[ExprRef]) -> Result<(), AggError> {
        if children.len() != self.arg_count {
            return Err(AggError::Signature {
                function: self.name,
                message: format!(
                    "expected {} argument(s), got {}",
                    self.arg_count,
                    children.len()
                ),
            });
        }
        for (idx, child) in children.iter().enumerate() {
            let dt = child.data_type();
            if !(self.accepts_arg)(dt) {
                return Err(AggError::Signature {
                    function: self.name,
                    message: format!("argument {idx} has unsupported type {dt:?}"),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn is_variable_binary(dt: &DataType) -> bool {
    matches!(dt, DataType::Binary | DataType::LargeBinary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::common::types::SortOrder;
    use crate::exec::expr::SlotRef;

    fn signature() -> AggSignature {
        AggSignature {
            name: "TEST",
            output_type: DataType::Binary,
            intermediate_type: DataType::Binary,
            arg_count: 1,
            accepts_arg: is_variable_binary,
        }
    }

    #[test]
    fn accepts_single_binary_argument() {
        let child: ExprRef = Arc::new(SlotRef::new(0, DataType::LargeBinary, SortOrder::Ascending));
        signature().check(&[child]).expect("large binary is variable length");
    }

    #[test]
    fn rejects_wrong_arity_and_type() {
        let err = signature().check(&[]).expect_err("no arguments");
        assert!(err.to_string().contains("expected 1 argument(s), got 0"));

        let child: ExprRef = Arc::new(SlotRef::new(0, DataType::Int64, SortOrder::Ascending));
        let err = signature().check(&[child]).expect_err("int64 argument");
        assert!(matches!(err, AggError::Signature { function: "TEST", .. }));
    }
}
