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
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CONFIG: OnceLock<PushdownConfig> = OnceLock::new();

fn default_log_level() -> String {
    "info".to_string()
}

pub fn init_from_path(path: impl AsRef<Path>) -> Result<&'static PushdownConfig> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }
    let cfg = PushdownConfig::load_from_file(path.as_ref())?;
    Ok(install(cfg))
}

pub fn init_from_env_or_default() -> Result<&'static PushdownConfig> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }
    let path = locate_config_file().ok_or_else(|| {
        anyhow!("missing config file: set $PUSHDOWN_CONFIG or create ./pushdown.toml")
    })?;
    init_from_path(path)
}

pub fn config() -> Result<&'static PushdownConfig> {
    init_from_env_or_default()
}

/// Installs `cfg` unless a config is already installed; returns the winner.
pub fn install(cfg: PushdownConfig) -> &'static PushdownConfig {
    CONFIG.get_or_init(|| cfg)
}

/// Config installed so far, without probing the filesystem.
pub fn loaded() -> Option<&'static PushdownConfig> {
    CONFIG.get()
}

/// `$PUSHDOWN_CONFIG` when set, else `./pushdown.toml` when it exists.
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("PUSHDOWN_CONFIG") {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    let default_path = PathBuf::from("pushdown.toml");
    default_path.exists().then_some(default_path)
}

#[derive(Clone, Debug, Deserialize)]
pub struct PushdownConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional full tracing EnvFilter expression.
    /// If set, this takes precedence over `log_level`.
    /// Example: "novapush=debug,tokio=off"
    #[serde(default)]
    pub log_filter: Option<String>,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl PushdownConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config file: {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("parse toml: {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PushdownConfig = toml::from_str(s)?;
        cfg.scan.validate()?;
        Ok(cfg)
    }

    pub fn effective_log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(self.log_level.as_str())
    }
}

impl Default for PushdownConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_filter: None,
            scan: ScanConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScanConfig {
    /// Remaining lease time at which a proactive renewal is issued.
    #[serde(default = "default_lease_renewal_threshold_ms")]
    pub lease_renewal_threshold_ms: u64,
    /// Consecutive restarts allowed without delivering a row.
    #[serde(default = "default_max_lease_restarts")]
    pub max_lease_restarts: usize,
    #[serde(default = "default_background_lease_renewal")]
    pub background_lease_renewal: bool,
}

fn default_lease_renewal_threshold_ms() -> u64 {
    30_000
}
fn default_max_lease_restarts() -> usize {
    3
}
fn default_background_lease_renewal() -> bool {
    true
}

impl ScanConfig {
    fn validate(&self) -> Result<()> {
        if self.lease_renewal_threshold_ms == 0 {
            return Err(anyhow!("scan.lease_renewal_threshold_ms must be positive"));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lease_renewal_threshold_ms: default_lease_renewal_threshold_ms(),
            max_lease_restarts: default_max_lease_restarts(),
            background_lease_renewal: default_background_lease_renewal(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_data_runtime_worker_threads")]
    pub data_runtime_worker_threads: usize,
    #[serde(default = "default_data_runtime_max_blocking_threads")]
    pub data_runtime_max_blocking_threads: usize,
}

fn default_data_runtime_worker_threads() -> usize {
    2
}
fn default_data_runtime_max_blocking_threads() -> usize {
    64
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_runtime_worker_threads: default_data_runtime_worker_threads(),
            data_runtime_max_blocking_threads: default_data_runtime_max_blocking_threads(),
        }
    }
}
