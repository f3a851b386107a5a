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
use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, RuntimeConfig};

#[derive(Parser, Debug, Default)]
#[clap(name = "ipxe-booter")]
pub struct Args {
    #[clap(long, default_value = "false", help = "Print version number and exit")]
    pub version: bool,

    #[clap(long, default_value = "false", help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[clap(long, short = 'f', env = "BOOTER_CONFIG_FILE", help = "Path to TOML configuration file")]
    pub config_file: Option<PathBuf>,

    #[clap(long, env = "BOOTER_BIND_ADDRESS", help = "Address to listen on")]
    pub bind_address: Option<IpAddr>,

    #[clap(long, env = "BOOTER_API_ADVERTISE_ADDRESS", help = "Address booting machines use to reach this service")]
    pub api_advertise_address: Option<String>,

    #[clap(long, env = "BOOTER_API_PORT", help = "HTTP port to listen on and advertise")]
    pub api_port: Option<u16>,

    #[clap(long, env = "BOOTER_TALOS_VERSION", help = "Talos version to boot, latest stable if unset")]
    pub talos_version: Option<String>,

    #[clap(long, env = "BOOTER_SCHEMATIC_ID", help = "Use this schematic instead of creating one per request")]
    pub schematic_id: Option<String>,

    #[clap(
        long,
        env = "BOOTER_EXTENSIONS",
        value_delimiter = ',',
        help = "Official system extensions to include in the schematic"
    )]
    pub extensions: Option<Vec<String>>,

    #[clap(long, env = "BOOTER_EXTRA_KERNEL_ARGS", help = "Extra kernel args to include in the schematic")]
    pub extra_kernel_args: Option<String>,

    #[clap(long, env = "BOOTER_CONFIG_SERVER_ENABLED", help = "Point machines at the config server on the advertised address")]
    pub config_server_enabled: Option<bool>,

    #[clap(long, env = "BOOTER_IMAGE_FACTORY_URL", help = "Base URL of the image factory API")]
    pub image_factory_url: Option<String>,

    #[clap(long, env = "BOOTER_IMAGE_FACTORY_PXE_URL", help = "Base URL of the image factory PXE endpoint")]
    pub image_factory_pxe_url: Option<String>,

    #[clap(long, env = "BOOTER_SECURE_BOOT", help = "Boot secure boot image variants")]
    pub secure_boot: Option<bool>,

    #[clap(long, env = "BOOTER_IPXE_TEMPLATES_DIR", help = "Directory holding <arch>/<binary> iPXE templates")]
    pub ipxe_templates_dir: Option<PathBuf>,

    #[clap(long, env = "BOOTER_IPXE_OUTPUT_DIR", help = "Directory patched iPXE binaries are written to")]
    pub ipxe_output_dir: Option<PathBuf>,

    #[clap(long, default_value = "false", help = "Do not patch iPXE binaries at startup")]
    pub skip_ipxe_patching: bool,
}

impl TryFrom<Args> for RuntimeConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut config = if let Some(config_path) = args.config_file {
            RuntimeConfig::load(&config_path)?
        } else {
            RuntimeConfig::default()
        };

        if let Some(bind_address) = args.bind_address {
            config.bind_address = bind_address;
        }
        if let Some(api_advertise_address) = args.api_advertise_address {
            config.api_advertise_address = api_advertise_address;
        }
        if let Some(api_port) = args.api_port {
            config.api_port = api_port;
        }
        if let Some(talos_version) = args.talos_version {
            config.talos_version = talos_version;
        }
        if let Some(schematic_id) = args.schematic_id {
            config.schematic_id = schematic_id;
        }
        if let Some(extensions) = args.extensions {
            config.extensions = extensions.into_iter().filter(|e| !e.is_empty()).collect();
        }
        if let Some(extra_kernel_args) = args.extra_kernel_args {
            config.extra_kernel_args = extra_kernel_args;
        }
        if let Some(config_server_enabled) = args.config_server_enabled {
            config.config_server_enabled = config_server_enabled;
        }
        if let Some(image_factory_url) = args.image_factory_url {
            config.image_factory.base_url = image_factory_url;
        }
        if let Some(image_factory_pxe_url) = args.image_factory_pxe_url {
            config.image_factory.pxe_base_url = image_factory_pxe_url;
        }
        if let Some(secure_boot) = args.secure_boot {
            config.image_factory.secure_boot = secure_boot;
        }
        if let Some(templates_dir) = args.ipxe_templates_dir {
            config.ipxe_binaries.templates_dir = templates_dir;
        }
        if let Some(output_dir) = args.ipxe_output_dir {
            config.ipxe_binaries.output_dir = output_dir;
        }
        if args.skip_ipxe_patching {
            config.ipxe_binaries.enabled = false;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_advertise_address = \"10.0.0.5\"\ntalos_version = \"v1.8.0\"\nextensions = [\"siderolabs/gvisor\"]"
        )
        .unwrap();

        let args = Args::try_parse_from([
            "ipxe-booter",
            "--config-file",
            file.path().to_str().unwrap(),
            "--talos-version",
            "v1.9.5",
            "--extensions",
            "siderolabs/iscsi-tools,siderolabs/amd-ucode",
            "--secure-boot",
            "true",
            "--skip-ipxe-patching",
        ])
        .unwrap();
        let config = RuntimeConfig::try_from(args).unwrap();

        assert_eq!(config.api_advertise_address, "10.0.0.5");
        assert_eq!(config.talos_version, "v1.9.5");
        assert_eq!(
            config.extensions,
            vec!["siderolabs/iscsi-tools", "siderolabs/amd-ucode"]
        );
        assert!(config.image_factory.secure_boot);
        assert!(!config.ipxe_binaries.enabled);
    }

    #[test]
    fn test_no_file_uses_defaults() {
        let config = RuntimeConfig::try_from(Args::default()).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }
}
