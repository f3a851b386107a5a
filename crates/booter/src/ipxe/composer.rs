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

use std::sync::Arc;

use image_factory::{FactoryError, ImageFactoryClient};

use crate::extractors::machine_architecture::MachineArchitecture;

#[derive(thiserror::Error, Debug)]
pub enum BootScriptError {
    #[error("failed to ensure schematic: {0}")]
    Schematic(#[source] FactoryError),
    #[error("failed to get schematic iPXE URL: {0}")]
    IpxeUrl(#[source] FactoryError),
}

pub fn chain_script(ipxe_url: &str) -> String {
    format!("#!ipxe\nchain --replace {ipxe_url}\n")
}

/// Builds the script that sends iPXE on to the image factory's PXE assets.
///
/// There is no cache in front of the factory: every boot request without a
/// configured schematic asks it again, relying on schematic IDs being content
/// addressed. No retries either, a failure goes back to the booting machine.
#[derive(Debug)]
pub struct BootScriptComposer {
    factory: Arc<dyn ImageFactoryClient>,
    schematic_id: Option<String>,
    extensions: Vec<String>,
    talos_version: String,
}

impl BootScriptComposer {
    pub fn new(
        factory: Arc<dyn ImageFactoryClient>,
        schematic_id: Option<String>,
        extensions: Vec<String>,
        talos_version: String,
    ) -> Self {
        Self {
            factory,
            schematic_id,
            extensions,
            talos_version,
        }
    }

    pub async fn compose(
        &self,
        arch: MachineArchitecture,
        kernel_args: &[String],
    ) -> Result<String, BootScriptError> {
        let schematic_id = match &self.schematic_id {
            Some(schematic_id) => schematic_id.clone(),
            None => self
                .factory
                .ensure_schematic(&self.extensions, kernel_args)
                .await
                .map_err(BootScriptError::Schematic)?,
        };

        let ipxe_url = self
            .factory
            .ipxe_url(&schematic_id, &self.talos_version, arch.as_str())
            .map_err(BootScriptError::IpxeUrl)?;

        Ok(chain_script(&ipxe_url))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    pub(crate) const PXE_BASE: &str = "https://pxe.factory.test";

    /// Deterministic factory: schematic IDs are content addressed like the real one.
    #[derive(Debug, Default)]
    pub(crate) struct FakeFactory {
        pub fail_schematic: bool,
        pub secure_boot: bool,
        pub calls: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    }

    #[async_trait]
    impl ImageFactoryClient for FakeFactory {
        async fn ensure_schematic(
            &self,
            extensions: &[String],
            extra_kernel_args: &[String],
        ) -> Result<String, FactoryError> {
            self.calls
                .lock()
                .unwrap()
                .push((extensions.to_vec(), extra_kernel_args.to_vec()));
            if self.fail_schematic {
                return Err(FactoryError::Communication("connection refused".to_string()));
            }
            image_factory::Schematic::new(extensions, extra_kernel_args).content_id()
        }

        fn ipxe_url(
            &self,
            schematic_id: &str,
            talos_version: &str,
            arch: &str,
        ) -> Result<String, FactoryError> {
            image_factory::pxe_url(PXE_BASE, schematic_id, talos_version, arch, self.secure_boot)
        }

        async fn latest_stable_version(&self) -> Result<String, FactoryError> {
            Ok("v1.9.5".to_string())
        }
    }

    #[tokio::test]
    async fn test_fixed_schematic_skips_factory() {
        let factory = Arc::new(FakeFactory::default());
        let composer = BootScriptComposer::new(
            factory.clone(),
            Some("img-1".to_string()),
            vec![],
            "v1.2.3".to_string(),
        );

        let script = composer
            .compose(MachineArchitecture::Arm64, &["console=tty0".to_string()])
            .await
            .unwrap();

        assert_eq!(
            script,
            "#!ipxe\nchain --replace https://pxe.factory.test/pxe/img-1/v1.2.3/metal-arm64\n"
        );
        assert!(factory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolves_schematic_every_time() {
        let factory = Arc::new(FakeFactory::default());
        let composer = BootScriptComposer::new(
            factory.clone(),
            None,
            vec!["siderolabs/iscsi-tools".to_string()],
            "v1.9.5".to_string(),
        );
        let kernel_args = vec!["console=tty0".to_string(), "console=ttyS0".to_string()];

        let first = composer
            .compose(MachineArchitecture::Amd64, &kernel_args)
            .await
            .unwrap();
        let second = composer
            .compose(MachineArchitecture::Amd64, &kernel_args)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(factory.calls.lock().unwrap().len(), 2);
        assert!(first.ends_with("/v1.9.5/metal-amd64\n"));
    }

    #[tokio::test]
    async fn test_factory_failure_is_wrapped() {
        let factory = Arc::new(FakeFactory {
            fail_schematic: true,
            ..Default::default()
        });
        let composer = BootScriptComposer::new(factory, None, vec![], "v1.9.5".to_string());

        let err = composer
            .compose(MachineArchitecture::Amd64, &[])
            .await
            .expect_err("schematic failure should surface");

        assert!(matches!(err, BootScriptError::Schematic(_)));
        assert_eq!(
            err.to_string(),
            "failed to ensure schematic: Error talking to the image factory: connection refused"
        );
    }

    #[tokio::test]
    async fn test_missing_version_fails_without_script() {
        let composer = BootScriptComposer::new(
            Arc::new(FakeFactory::default()),
            Some("img-1".to_string()),
            vec![],
            String::new(),
        );

        let err = composer
            .compose(MachineArchitecture::Amd64, &[])
            .await
            .expect_err("empty version should fail");

        assert!(matches!(
            err,
            BootScriptError::IpxeUrl(FactoryError::MissingTalosVersion)
        ));
    }
}
