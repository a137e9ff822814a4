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
//! Process-wide tokio runtime for transport I/O issued off the row path.

use std::sync::{Arc, OnceLock};

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::common::config::{data_runtime_max_blocking_threads, data_runtime_worker_threads};
use crate::pushdown_logging::info;

const DATA_RUNTIME_THREAD_NAME: &str = "pushdown-data-io";
static DATA_RUNTIME: OnceLock<Result<Arc<Runtime>, String>> = OnceLock::new();

pub fn data_runtime() -> Result<&'static Arc<Runtime>, String> {
    let slot = DATA_RUNTIME.get_or_init(|| {
        let worker_threads = data_runtime_worker_threads().max(1);
        let max_blocking_threads = data_runtime_max_blocking_threads().max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(worker_threads)
            .max_blocking_threads(max_blocking_threads)
            .thread_name(DATA_RUNTIME_THREAD_NAME)
            .build()
            .map_err(|e| format!("init data io runtime failed: {e}"))?;
        info!(
            worker_threads,
            max_blocking_threads, "data io runtime initialized"
        );
        Ok(Arc::new(runtime))
    });
    slot.as_ref().map_err(Clone::clone)
}

pub fn data_runtime_handle() -> Result<Handle, String> {
    Ok(data_runtime()?.handle().clone())
}

/// Runs a blocking transport call on the data runtime's blocking pool.
/// Dropping the returned handle detaches the call; its result is then lost.
pub fn spawn_data_blocking<F, R>(f: F) -> Result<JoinHandle<R>, String>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    Ok(data_runtime_handle()?.spawn_blocking(f))
}
