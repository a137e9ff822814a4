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
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::pushdown_config::{self, PushdownConfig};
use crate::pushdown_logging::{debug, warn};

// Outcome of the one-time config file probe used when nothing was installed.
static PROBED: OnceLock<Option<&'static PushdownConfig>> = OnceLock::new();

fn pushdown_app_config() -> Option<&'static PushdownConfig> {
    if let Some(cfg) = pushdown_config::loaded() {
        return Some(cfg);
    }
    *PROBED.get_or_init(|| probe_config_file(pushdown_config::locate_config_file()))
}

fn probe_config_file(path: Option<PathBuf>) -> Option<&'static PushdownConfig> {
    let Some(path) = path else {
        debug!("no pushdown config file found, using built-in defaults");
        return None;
    };
    parse_or_warn(&path).map(pushdown_config::install)
}

fn parse_or_warn(path: &Path) -> Option<PushdownConfig> {
    match PushdownConfig::load_from_file(path) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "ignoring invalid pushdown config, using built-in defaults"
            );
            None
        }
    }
}

pub(crate) fn lease_renewal_threshold() -> Duration {
    let ms = pushdown_app_config()
        .map(|c| c.scan.lease_renewal_threshold_ms)
        .unwrap_or(30_000);
    Duration::from_millis(ms)
}

pub(crate) fn max_lease_restarts() -> usize {
    pushdown_app_config()
        .map(|c| c.scan.max_lease_restarts)
        .unwrap_or(3)
}

pub(crate) fn background_lease_renewal() -> bool {
    pushdown_app_config()
        .map(|c| c.scan.background_lease_renewal)
        .unwrap_or(true)
}

pub(crate) fn data_runtime_worker_threads() -> usize {
    pushdown_app_config()
        .map(|c| c.runtime.data_runtime_worker_threads)
        .unwrap_or(2)
}

pub(crate) fn data_runtime_max_blocking_threads() -> usize {
    pushdown_app_config()
        .map(|c| c.runtime.data_runtime_max_blocking_threads)
        .unwrap_or(64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        assert!(probe_config_file(None).is_none());
    }

    #[test]
    fn malformed_config_file_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pushdown.toml");
        std::fs::write(&path, "[scan\nlease_renewal_threshold_ms = ").expect("write");
        assert!(parse_or_warn(&path).is_none());

        std::fs::write(&path, "[scan]\nmax_lease_restarts = 5\n").expect("write");
        let cfg = parse_or_warn(&path).expect("valid config");
        assert_eq!(cfg.scan.max_lease_restarts, 5);
    }

    #[test]
    fn accessors_reuse_one_probe() {
        let first = max_lease_restarts();
        assert!(PROBED.get().is_some() || pushdown_config::loaded().is_some());
        assert_eq!(max_lease_restarts(), first);
        assert!(lease_renewal_threshold() > Duration::ZERO);
    }
}
