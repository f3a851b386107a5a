/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Config, FactoryError, ImageFactoryClient, Schematic};

#[derive(Debug, Deserialize)]
struct SchematicCreated {
    id: String,
}

/// [`ImageFactoryClient`] backed by the factory's HTTP API.
#[derive(Debug)]
pub struct FactoryClient {
    config: Config,
    base_url: String,
    http_client: reqwest::Client,
}

impl FactoryClient {
    pub fn new_with_config(config: &Config) -> Result<FactoryClient, FactoryError> {
        url::Url::parse(&config.base_url).map_err(|error| FactoryError::InvalidUrl {
            url: config.base_url.clone(),
            error,
        })?;

        Ok(FactoryClient {
            config: config.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        })
    }

    async fn read_success_body(response: reqwest::Response) -> Result<String, FactoryError> {
        let status_code = response.status();
        let response_text = response.text().await?;

        if !status_code.is_success() {
            return Err(FactoryError::UnexpectedStatus {
                status: status_code.as_u16(),
                body: response_text,
            });
        }

        Ok(response_text)
    }
}

#[async_trait]
impl ImageFactoryClient for FactoryClient {
    async fn ensure_schematic(
        &self,
        extensions: &[String],
        extra_kernel_args: &[String],
    ) -> Result<String, FactoryError> {
        tracing::debug!(?extensions, ?extra_kernel_args, "ensure schematic");

        let schematic = Schematic::new(extensions, extra_kernel_args);
        let marshaled = schematic.marshal()?;

        tracing::debug!(schematic = %marshaled, "generated schematic");

        let response = self
            .http_client
            .post(format!("{}/schematics", self.base_url))
            .header("Content-Type", "application/yaml")
            .timeout(self.config.request_timeout)
            .body(marshaled)
            .send()
            .await?;

        let response_text = Self::read_success_body(response).await?;
        let created: SchematicCreated = serde_json::from_str(&response_text).map_err(|e| {
            FactoryError::Serde(format!("Error parsing schematic create response: {e}"))
        })?;

        if created.id.is_empty() {
            return Err(FactoryError::Serde(
                "image factory returned an empty schematic ID".to_string(),
            ));
        }

        Ok(created.id)
    }

    fn ipxe_url(
        &self,
        schematic_id: &str,
        talos_version: &str,
        arch: &str,
    ) -> Result<String, FactoryError> {
        crate::pxe_url(
            &self.config.pxe_base_url,
            schematic_id,
            talos_version,
            arch,
            self.config.secure_boot,
        )
    }

    async fn latest_stable_version(&self) -> Result<String, FactoryError> {
        let response = self
            .http_client
            .get(format!("{}/versions", self.base_url))
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let response_text = Self::read_success_body(response).await?;
        let versions: Vec<String> = serde_json::from_str(&response_text)
            .map_err(|e| FactoryError::Serde(format!("Error parsing versions response: {e}")))?;

        crate::latest_stable(&versions).ok_or(FactoryError::NoStableVersion)
    }
}
