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

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::FactoryError;

/// A schematic as understood by the image factory.
///
/// The factory identifies a schematic by the SHA-256 of its YAML form, so two
/// schematics with the same customizations must marshal to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schematic {
    #[serde(default)]
    pub customization: Customization,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_kernel_args: Vec<String>,
    #[serde(default, skip_serializing_if = "SystemExtensions::is_empty")]
    pub system_extensions: SystemExtensions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemExtensions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub official_extensions: Vec<String>,
}

impl SystemExtensions {
    pub fn is_empty(&self) -> bool {
        self.official_extensions.is_empty()
    }
}

impl Schematic {
    /// Extensions are a set: they get sorted and deduplicated. Kernel argument
    /// order is meaningful to the kernel and is kept as given.
    pub fn new(extensions: &[String], extra_kernel_args: &[String]) -> Self {
        let mut official_extensions = extensions.to_vec();
        official_extensions.sort();
        official_extensions.dedup();

        Schematic {
            customization: Customization {
                extra_kernel_args: extra_kernel_args.to_vec(),
                system_extensions: SystemExtensions {
                    official_extensions,
                },
            },
        }
    }

    pub fn marshal(&self) -> Result<String, FactoryError> {
        serde_yaml::to_string(self)
            .map_err(|e| FactoryError::Serde(format!("Error marshaling schematic: {e}")))
    }

    /// Content address of the marshaled schematic, the same way the factory derives IDs.
    pub fn content_id(&self) -> Result<String, FactoryError> {
        let marshaled = self.marshal()?;
        Ok(hex::encode(Sha256::digest(marshaled.as_bytes())))
    }
}
