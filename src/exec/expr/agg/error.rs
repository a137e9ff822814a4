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
use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AggError {
    /// Input bytes are not a valid encoding for the aggregator's type.
    /// Fatal to the aggregation step; nothing was merged.
    #[error("{function} cannot decode {data_type:?} input: {message}")]
    Decode {
        function: &'static str,
        data_type: DataType,
        message: String,
    },
    #[error("{function} cannot encode accumulated state: {message}")]
    Encode {
        function: &'static str,
        message: String,
    },
    #[error("{function} aggregator is finalized; reset it before merging again")]
    Finalized { function: &'static str },
    #[error("invalid arguments for {function}: {message}")]
    Signature {
        function: &'static str,
        message: String,
    },
    #[error("unsupported aggregate function: {0}")]
    UnknownFunction(String),
}
