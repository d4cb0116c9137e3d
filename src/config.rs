// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading application settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::{PeerType, Security, ServiceProfile, DEFAULT_READ_BUFFER, DEFAULT_SERVICE_NAME};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Software stack expected on the peer; selects the service UUID.
    pub peer: PeerType,

    /// Whether channels require authentication.
    pub security: Security,

    /// SDP record name used while listening.
    pub service_name: String,

    /// How long a discovery scan runs before reporting its results.
    pub discovery_timeout_secs: u64,

    /// Session read buffer size in bytes.
    pub read_buffer_size: usize,

    /// Append CR LF to lines sent from the command line.
    pub append_terminator: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            peer: PeerType::default(),
            security: Security::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            discovery_timeout_secs: 12,
            read_buffer_size: DEFAULT_READ_BUFFER,
            append_terminator: false,
        }
    }
}

impl BluetoothConfig {
    pub fn profile(&self) -> ServiceProfile {
        ServiceProfile::new(self.peer, self.security)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }
}

impl Config {
    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smooth-bluetooth")
            .join("config.toml")
    }

    /// Load configuration from the default location or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            return Ok(config);
        }

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let config = Self::default();
        let content = toml::to_string_pretty(&config)?;
        std::fs::write(path, content)?;
        Ok(config)
    }
}
