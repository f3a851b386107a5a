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

//! Classifies iPXE script requests and answers them.

use std::sync::Arc;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use image_factory::ImageFactoryClient;

use crate::config::RuntimeConfig;
use crate::extractors::boot_query::BootQuery;

pub mod composer;
pub mod init_script;

use composer::BootScriptComposer;
use init_script::join_host_port;

// Some UEFIs with a built-in iPXE only accept script URLs that end in `.ipxe`
pub const INIT_SCRIPT_NAME: &str = "init.ipxe";
pub const BOOT_SCRIPT_NAME: &str = "boot.ipxe";

/// Kernel parameter Talos reads its machine config URL from
const KERNEL_PARAM_CONFIG: &str = "talos.config";

#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    #[error("schematic ID cannot be used with extensions or extra kernel args")]
    SchematicWithCustomization,
    #[error("failed to build init script: {0}")]
    InitScript(#[from] tera::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptResponse {
    Init(Bytes),
    Boot(String),
    NotFound,
    Failed(String),
}

impl ScriptResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            ScriptResponse::Init(_) | ScriptResponse::Boot(_) => StatusCode::OK,
            ScriptResponse::NotFound => StatusCode::NOT_FOUND,
            ScriptResponse::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ScriptResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let text_plain = [(header::CONTENT_TYPE, mime::TEXT_PLAIN.to_string())];
        match self {
            ScriptResponse::Init(body) => (status, text_plain, body).into_response(),
            ScriptResponse::Boot(body) | ScriptResponse::Failed(body) => {
                (status, text_plain, body).into_response()
            }
            ScriptResponse::NotFound => status.into_response(),
        }
    }
}

#[derive(Debug)]
pub struct IpxeHandler {
    composer: BootScriptComposer,
    kernel_args: Vec<String>,
    init_script: Bytes,
}

impl IpxeHandler {
    /// Validates the customization settings, renders the init script and
    /// computes the kernel args shared by every boot request.
    pub fn new(
        config: &RuntimeConfig,
        factory: Arc<dyn ImageFactoryClient>,
    ) -> Result<Self, HandlerError> {
        let api_host_port = join_host_port(&config.api_advertise_address, config.api_port);
        let talos_config_kernel_arg =
            format!("{KERNEL_PARAM_CONFIG}=http://{api_host_port}/config?u=${{uuid}}");

        let schematic_id = if config.schematic_id.is_empty() {
            None
        } else {
            if !config.extensions.is_empty() || !config.extra_kernel_args.trim().is_empty() {
                return Err(HandlerError::SchematicWithCustomization);
            }

            if config.config_server_enabled {
                tracing::warn!(
                    schematic_id = %config.schematic_id,
                    kernel_arg = %talos_config_kernel_arg,
                    "schematic ID is set explicitly while the config server is enabled, machines will not reach the config server unless the schematic carries the kernel arg"
                );
            }

            Some(config.schematic_id.clone())
        };

        let init_script = init_script::build_init_script(
            &config.api_advertise_address,
            config.api_port,
            &config.normalized_path_prefix(),
        )?;

        let mut kernel_args = config.kernel_args();
        if config.config_server_enabled {
            tracing::debug!(arg = %talos_config_kernel_arg, "injected talos config kernel arg to the iPXE requests");
            kernel_args.push(talos_config_kernel_arg);
        }

        Ok(Self {
            composer: BootScriptComposer::new(
                factory,
                schematic_id,
                config.extensions.clone(),
                config.talos_version.clone(),
            ),
            kernel_args,
            init_script: Bytes::from(init_script),
        })
    }

    pub fn init_script(&self) -> &[u8] {
        &self.init_script
    }

    /// Answers a request for `<prefix>/<script>`.
    pub async fn handle(&self, script: &str, query: &BootQuery) -> ScriptResponse {
        match script {
            INIT_SCRIPT_NAME => {
                metrics::counter!("ipxe_requests_total", "script" => INIT_SCRIPT_NAME).increment(1);
                return ScriptResponse::Init(self.init_script.clone());
            }
            BOOT_SCRIPT_NAME => {
                metrics::counter!("ipxe_requests_total", "script" => BOOT_SCRIPT_NAME).increment(1);
            }
            _ => {
                tracing::error!(script, "invalid iPXE script");
                metrics::counter!("ipxe_requests_total", "script" => "unknown").increment(1);
                return ScriptResponse::NotFound;
            }
        }

        self.boot_script(query).await
    }

    #[tracing::instrument(skip_all, fields(uuid = %query.uuid, mac = %query.mac, arch = %query.arch))]
    async fn boot_script(&self, query: &BootQuery) -> ScriptResponse {
        let arch = query.architecture();

        tracing::info!(normalized_arch = %arch, "handle iPXE boot request");

        // TODO: per-machine kernel args and system extensions keyed on uuid/mac
        let console_kernel_args = arch.console_kernel_args();
        let kernel_args: Vec<String> = self
            .kernel_args
            .iter()
            .cloned()
            .chain(console_kernel_args.iter().map(|arg| arg.to_string()))
            .collect();

        tracing::debug!(
            console_kernel_args = ?console_kernel_args,
            "injected console kernel args to the iPXE request"
        );

        let started = std::time::Instant::now();
        let result = self.composer.compose(arch, &kernel_args).await;
        metrics::histogram!("ipxe_boot_script_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(body) => {
                metrics::counter!("ipxe_boot_scripts_total", "arch" => arch.as_str(), "outcome" => "success")
                    .increment(1);
                ScriptResponse::Boot(body)
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to get iPXE script");
                metrics::counter!("ipxe_boot_scripts_total", "arch" => arch.as_str(), "outcome" => "failure")
                    .increment(1);
                // Error detail goes back to the (unauthenticated) machine so operators can see it on the console
                ScriptResponse::Failed(format!("failed to get iPXE script: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::composer::tests::{FakeFactory, PXE_BASE};
    use super::*;

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            api_advertise_address: "10.0.0.1".to_string(),
            api_port: 50084,
            talos_version: "v1.2.3".to_string(),
            ..Default::default()
        }
    }

    fn query(arch: &str) -> BootQuery {
        BootQuery {
            uuid: "4c4c4544-0034-3510-8051-b2c04f4b4e32".to_string(),
            mac: "0c-42-a1-b2-c3-d4".to_string(),
            arch: arch.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_init_script_is_fixed() {
        let handler = IpxeHandler::new(&config(), Arc::new(FakeFactory::default())).unwrap();

        let first = handler.handle(INIT_SCRIPT_NAME, &BootQuery::default()).await;
        let second = handler.handle(INIT_SCRIPT_NAME, &query("arm64")).await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first, ScriptResponse::Init(Bytes::copy_from_slice(handler.init_script())));
    }

    #[tokio::test]
    async fn test_unknown_script_is_not_found() {
        let handler = IpxeHandler::new(&config(), Arc::new(FakeFactory::default())).unwrap();

        let response = handler.handle("foo.ipxe", &query("arm64")).await;

        assert_eq!(response, ScriptResponse::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_boot_script_with_fixed_schematic() {
        let config = RuntimeConfig {
            schematic_id: "img-1".to_string(),
            ..config()
        };
        let handler = IpxeHandler::new(&config, Arc::new(FakeFactory::default())).unwrap();

        let response = handler.handle(BOOT_SCRIPT_NAME, &query("arm64")).await;

        assert_eq!(
            response,
            ScriptResponse::Boot(format!(
                "#!ipxe\nchain --replace {PXE_BASE}/pxe/img-1/v1.2.3/metal-arm64\n"
            ))
        );
    }

    #[tokio::test]
    async fn test_boot_script_normalizes_arch() {
        let config = RuntimeConfig {
            schematic_id: "img-1".to_string(),
            ..config()
        };
        let handler = IpxeHandler::new(&config, Arc::new(FakeFactory::default())).unwrap();

        for arch in ["i386", "x86_64", ""] {
            let response = handler.handle(BOOT_SCRIPT_NAME, &query(arch)).await;
            assert_eq!(
                response,
                ScriptResponse::Boot(format!(
                    "#!ipxe\nchain --replace {PXE_BASE}/pxe/img-1/v1.2.3/metal-amd64\n"
                )),
                "{arch}"
            );
        }
    }

    #[tokio::test]
    async fn test_kernel_args_are_base_then_console() {
        let config = RuntimeConfig {
            extra_kernel_args: "net.ifnames=0 talos.platform=metal".to_string(),
            extensions: vec!["siderolabs/iscsi-tools".to_string()],
            config_server_enabled: true,
            ..config()
        };
        let factory = Arc::new(FakeFactory::default());
        let handler = IpxeHandler::new(&config, factory.clone()).unwrap();

        let response = handler.handle(BOOT_SCRIPT_NAME, &query("arm64")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let calls = factory.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (extensions, kernel_args) = &calls[0];
        assert_eq!(extensions, &vec!["siderolabs/iscsi-tools".to_string()]);
        assert_eq!(
            kernel_args,
            &vec![
                "net.ifnames=0".to_string(),
                "talos.platform=metal".to_string(),
                "talos.config=http://10.0.0.1:50084/config?u=${uuid}".to_string(),
                "console=tty0".to_string(),
                "console=ttyAMA0".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_factory_failure_is_500_with_detail() {
        let factory = Arc::new(FakeFactory {
            fail_schematic: true,
            ..Default::default()
        });
        let handler = IpxeHandler::new(&config(), factory).unwrap();

        let response = handler.handle(BOOT_SCRIPT_NAME, &query("amd64")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response,
            ScriptResponse::Failed(
                "failed to get iPXE script: failed to ensure schematic: Error talking to the image factory: connection refused"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_schematic_id_excludes_customization() {
        let with_extensions = RuntimeConfig {
            schematic_id: "img-1".to_string(),
            extensions: vec!["siderolabs/gvisor".to_string()],
            ..config()
        };
        assert!(matches!(
            IpxeHandler::new(&with_extensions, Arc::new(FakeFactory::default())),
            Err(HandlerError::SchematicWithCustomization)
        ));

        let with_kernel_args = RuntimeConfig {
            schematic_id: "img-1".to_string(),
            extra_kernel_args: "console=tty1".to_string(),
            ..config()
        };
        assert!(matches!(
            IpxeHandler::new(&with_kernel_args, Arc::new(FakeFactory::default())),
            Err(HandlerError::SchematicWithCustomization)
        ));

        let with_config_server = RuntimeConfig {
            schematic_id: "img-1".to_string(),
            config_server_enabled: true,
            ..config()
        };
        assert!(IpxeHandler::new(&with_config_server, Arc::new(FakeFactory::default())).is_ok());
    }
}
