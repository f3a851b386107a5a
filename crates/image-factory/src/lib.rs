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

//! image-factory talks to a Talos image factory: it registers schematics
//! (a set of OS customizations) and builds the PXE URLs that iPXE chains to.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

mod client;
pub mod schematic;
mod version;

pub use client::FactoryClient;
pub use schematic::Schematic;
pub use version::latest_stable;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the factory API, e.g. `https://factory.talos.dev`
    pub base_url: String,
    /// Base URL the PXE assets are served from, e.g. `https://pxe.factory.talos.dev`
    pub pxe_base_url: String,
    pub secure_boot: bool,
    /// Upper bound for a single factory API call
    pub request_timeout: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum FactoryError {
    #[error("schematic ID is required")]
    MissingSchematicId,
    #[error("talos version is required")]
    MissingTalosVersion,
    #[error("arch is required")]
    MissingArch,
    #[error("invalid image factory URL {url}: {error}")]
    InvalidUrl {
        url: String,
        error: url::ParseError,
    },
    #[error("Error talking to the image factory: {0}")]
    Communication(String),
    #[error("image factory request timed out: {0}")]
    Timeout(String),
    #[error("image factory returned status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Error Serialising/Deserialising: {0}")]
    Serde(String),
    #[error("no stable versions found")]
    NoStableVersion,
}

impl From<reqwest::Error> for FactoryError {
    fn from(value: reqwest::Error) -> FactoryError {
        if value.is_timeout() {
            FactoryError::Timeout(value.to_string())
        } else {
            FactoryError::Communication(format!("Communication error: {value}"))
        }
    }
}

/// The operations the iPXE service needs from an image factory.
///
/// `ensure_schematic` must be deterministic for a given customization set:
/// nothing caches its result, so every unresolved boot request calls it again.
#[async_trait]
pub trait ImageFactoryClient: Debug + Send + Sync + 'static {
    /// Makes sure a schematic with the given customizations exists and returns its ID.
    async fn ensure_schematic(
        &self,
        extensions: &[String],
        extra_kernel_args: &[String],
    ) -> Result<String, FactoryError>;

    /// Returns the iPXE URL for the given schematic ID, Talos version and architecture.
    fn ipxe_url(
        &self,
        schematic_id: &str,
        talos_version: &str,
        arch: &str,
    ) -> Result<String, FactoryError>;

    /// Returns the newest non pre-release Talos version the factory knows about.
    async fn latest_stable_version(&self) -> Result<String, FactoryError>;
}

/// Builds `<pxe_base_url>/pxe/<schematic>/<version>/metal-<arch>[-secureboot]`.
///
/// Purely local, fails fast if any component is empty.
pub fn pxe_url(
    pxe_base_url: &str,
    schematic_id: &str,
    talos_version: &str,
    arch: &str,
    secure_boot: bool,
) -> Result<String, FactoryError> {
    if schematic_id.is_empty() {
        return Err(FactoryError::MissingSchematicId);
    }
    if talos_version.is_empty() {
        return Err(FactoryError::MissingTalosVersion);
    }
    if arch.is_empty() {
        return Err(FactoryError::MissingArch);
    }

    let mut url = format!("{pxe_base_url}/pxe/{schematic_id}/{talos_version}/metal-{arch}");
    if secure_boot {
        url.push_str("-secureboot");
    }

    Ok(url)
}
