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
use bytes::Bytes;

/// One scanned row: its range key plus column values in projection order.
/// `None` marks a missing or null column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    key: Bytes,
    values: Vec<Option<Bytes>>,
}

impl Row {
    pub fn new(key: impl Into<Bytes>, values: Vec<Option<Bytes>>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self, idx: usize) -> Option<&Bytes> {
        self.values.get(idx).and_then(|v| v.as_ref())
    }

    pub fn values(&self) -> &[Option<Bytes>] {
        &self.values
    }

    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Keeps only the listed columns, in the listed order.
    pub fn project(&self, columns: &[usize]) -> Row {
        Row {
            key: self.key.clone(),
            values: columns
                .iter()
                .map(|&idx| self.values.get(idx).cloned().flatten())
                .collect(),
        }
    }
}
