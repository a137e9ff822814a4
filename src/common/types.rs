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

use arrow::datatypes::DataType;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct UniqueId {
    pub hi: i64,
    pub lo: i64,
}

pub fn format_uuid(hi: i64, lo: i64) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        ((hi as u64) >> 32) as u32,
        ((hi as u64) >> 16) as u16,
        (hi as u64) as u16,
        ((lo as u64) >> 48) as u16,
        (lo as u64) & 0x0000_FFFF_FFFF_FFFF
    )
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_uuid(self.hi, self.lo))
    }
}

/// Byte order of an encoded value. Descending values are stored as the
/// bitwise inversion of their ascending encoding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn is_descending(self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ASC"),
            SortOrder::Descending => f.write_str("DESC"),
        }
    }
}

/// Opaque bytes tagged with the semantic type and sort order they were
/// encoded under. The buffer is owned; aggregators never share one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedValue {
    pub bytes: Vec<u8>,
    pub data_type: DataType,
    pub sort_order: SortOrder,
}

impl EncodedValue {
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
