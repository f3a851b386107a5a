/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_API_PORT: u16 = 50084;
const DEFAULT_PATH_PREFIX: &str = "/ipxe";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    #[serde(default = "Defaults::bind_address")]
    pub bind_address: IpAddr,
    /// Address machines use to reach this service. Empty means "use the local interface address".
    #[serde(default)]
    pub api_advertise_address: String,
    #[serde(default = "Defaults::api_port")]
    pub api_port: u16,
    #[serde(default = "Defaults::path_prefix")]
    pub path_prefix: String,
    /// Empty means "ask the image factory for the latest stable version at startup".
    #[serde(default)]
    pub talos_version: String,
    /// Whitespace separated kernel arguments added to every schematic
    #[serde(default)]
    pub extra_kernel_args: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Pre-resolved schematic. Mutually exclusive with `extensions` and `extra_kernel_args`.
    #[serde(default)]
    pub schematic_id: String,
    /// Whether a machine config server is reachable at `api_advertise_address:api_port`
    #[serde(default)]
    pub config_server_enabled: bool,
    #[serde(default)]
    pub image_factory: ImageFactoryConfig,
    #[serde(default)]
    pub ipxe_binaries: IpxeBinariesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageFactoryConfig {
    #[serde(default = "Defaults::factory_base_url")]
    pub base_url: String,
    #[serde(default = "Defaults::factory_pxe_base_url")]
    pub pxe_base_url: String,
    #[serde(default)]
    pub secure_boot: bool,
    #[serde(default = "Defaults::factory_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpxeBinariesConfig {
    #[serde(default = "Defaults::patch_binaries")]
    pub enabled: bool,
    /// Holds `<arch>/<binary>` templates carrying the embedded script placeholder
    #[serde(default = "Defaults::templates_dir")]
    pub templates_dir: PathBuf,
    /// Patched binaries land here as `<arch>/<binary>`, usually the TFTP root
    #[serde(default = "Defaults::output_dir")]
    pub output_dir: PathBuf,
}

pub struct Defaults;

impl Defaults {
    pub fn bind_address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
    pub fn api_port() -> u16 {
        DEFAULT_API_PORT
    }
    pub fn path_prefix() -> String {
        DEFAULT_PATH_PREFIX.to_string()
    }
    pub fn factory_base_url() -> String {
        "https://factory.talos.dev".to_string()
    }
    pub fn factory_pxe_base_url() -> String {
        "https://pxe.factory.talos.dev".to_string()
    }
    pub fn factory_request_timeout() -> Duration {
        image_factory::DEFAULT_REQUEST_TIMEOUT
    }
    pub fn patch_binaries() -> bool {
        true
    }
    pub fn templates_dir() -> PathBuf {
        "/usr/share/ipxe-booter/templates".into()
    }
    pub fn output_dir() -> PathBuf {
        "/var/lib/ipxe-booter/tftp".into()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("Invalid TOML in config file: {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
    #[error("Could not determine an advertise address: {0}")]
    NoAdvertiseAddress(String),
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: Defaults::bind_address(),
            api_advertise_address: String::new(),
            api_port: Defaults::api_port(),
            path_prefix: Defaults::path_prefix(),
            talos_version: String::new(),
            extra_kernel_args: String::new(),
            extensions: Vec::new(),
            schematic_id: String::new(),
            config_server_enabled: false,
            image_factory: ImageFactoryConfig::default(),
            ipxe_binaries: IpxeBinariesConfig::default(),
        }
    }
}

impl Default for ImageFactoryConfig {
    fn default() -> Self {
        Self {
            base_url: Defaults::factory_base_url(),
            pxe_base_url: Defaults::factory_pxe_base_url(),
            secure_boot: false,
            request_timeout: Defaults::factory_request_timeout(),
        }
    }
}

impl Default for IpxeBinariesConfig {
    fn default() -> Self {
        Self {
            enabled: Defaults::patch_binaries(),
            templates_dir: Defaults::templates_dir(),
            output_dir: Defaults::output_dir(),
        }
    }
}

impl ImageFactoryConfig {
    pub fn client_config(&self) -> image_factory::Config {
        image_factory::Config {
            base_url: self.base_url.clone(),
            pxe_base_url: self.pxe_base_url.trim_end_matches('/').to_string(),
            secure_boot: self.secure_boot,
            request_timeout: self.request_timeout,
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })
    }

    /// Path prefix in the form `/segment[/segment]`, or empty when served from the root.
    pub fn normalized_path_prefix(&self) -> String {
        let trimmed = self.path_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Falls back to the address of the local interface when nothing was advertised.
    pub fn resolve_advertise_address(&mut self) -> Result<(), ConfigError> {
        if !self.api_advertise_address.is_empty() {
            return Ok(());
        }

        let address = local_ip_address::local_ip()
            .map_err(|err| ConfigError::NoAdvertiseAddress(err.to_string()))?;
        tracing::debug!(
            "api_advertise_address not specified, defaulting to local interface: {}",
            address
        );
        self.api_advertise_address = address.to_string();

        Ok(())
    }

    pub fn kernel_args(&self) -> Vec<String> {
        self.extra_kernel_args
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_advertise_address = \"10.0.0.5\"").unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.api_advertise_address, "10.0.0.5");
        assert_eq!(config.api_port, DEFAULT_API_PORT);
        assert_eq!(config.path_prefix, "/ipxe");
        assert_eq!(config.image_factory, ImageFactoryConfig::default());
        assert!(config.ipxe_binaries.enabled);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
bind_address = "::"
api_advertise_address = "fd00::5"
api_port = 8081
talos_version = "v1.9.5"
extra_kernel_args = "net.ifnames=0  console=tty1"
extensions = ["siderolabs/iscsi-tools"]
config_server_enabled = true

[image_factory]
base_url = "https://factory.example.com"
secure_boot = true
request_timeout = "3s"

[ipxe_binaries]
enabled = false
templates_dir = "/srv/templates"
output_dir = "/srv/tftp"
"#
        )
        .unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.bind_address, "::".parse::<IpAddr>().unwrap());
        assert_eq!(config.api_port, 8081);
        assert_eq!(config.kernel_args(), vec!["net.ifnames=0", "console=tty1"]);
        assert_eq!(config.extensions, vec!["siderolabs/iscsi-tools"]);
        assert!(config.config_server_enabled);
        assert!(config.image_factory.secure_boot);
        assert_eq!(config.image_factory.request_timeout, Duration::from_secs(3));
        assert_eq!(
            config.image_factory.pxe_base_url,
            "https://pxe.factory.talos.dev"
        );
        assert!(!config.ipxe_binaries.enabled);
        assert_eq!(config.ipxe_binaries.output_dir, PathBuf::from("/srv/tftp"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_port = \"not a port\"").unwrap();

        assert!(matches!(
            RuntimeConfig::load(file.path()),
            Err(ConfigError::InvalidToml { .. })
        ));
        assert!(matches!(
            RuntimeConfig::load(Path::new("/nonexistent/booter.toml")),
            Err(ConfigError::CouldNotRead { .. })
        ));
    }

    #[test]
    fn test_normalized_path_prefix() {
        let mut config = RuntimeConfig::default();
        assert_eq!(config.normalized_path_prefix(), "/ipxe");

        config.path_prefix = "api/v0/ipxe/".to_string();
        assert_eq!(config.normalized_path_prefix(), "/api/v0/ipxe");

        config.path_prefix = "/".to_string();
        assert_eq!(config.normalized_path_prefix(), "");
    }
}
