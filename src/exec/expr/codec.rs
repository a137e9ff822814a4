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
//! Sort-order aware byte normalization for encoded values.

use crate::common::types::{EncodedValue, SortOrder};

/// Flips every bit, mapping between ascending and descending encodings.
pub fn invert_into(bytes: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.extend(bytes.iter().map(|b| !b));
}

/// Returns the ascending form of `bytes`. Descending input is inverted into
/// `scratch`, which keeps its allocation across calls.
pub fn normalize<'a>(bytes: &'a [u8], sort_order: SortOrder, scratch: &'a mut Vec<u8>) -> &'a [u8] {
    match sort_order {
        SortOrder::Ascending => bytes,
        SortOrder::Descending => {
            invert_into(bytes, scratch);
            scratch.as_slice()
        }
    }
}

/// Re-encodes ascending `bytes` under `sort_order`.
pub fn encode(bytes: &[u8], sort_order: SortOrder) -> Vec<u8> {
    match sort_order {
        SortOrder::Ascending => bytes.to_vec(),
        SortOrder::Descending => bytes.iter().map(|b| !b).collect(),
    }
}

/// Ascending bytes of an encoded value.
pub fn decode(value: &EncodedValue) -> Vec<u8> {
    encode(&value.bytes, value.sort_order)
}
