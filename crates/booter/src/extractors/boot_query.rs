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

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::extractors::machine_architecture::MachineArchitecture;

/// Query parameters iPXE fills in from the init script:
/// `?uuid=${uuid}&mac=${net${idx}/mac:hexhyp}&domain=${domain}&hostname=${hostname}&serial=${serial}&arch=${buildarch}`
///
/// Every parameter is optional, absent ones are empty strings. When a key is
/// repeated the first value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootQuery {
    pub uuid: String,
    pub mac: String,
    pub domain: String,
    pub hostname: String,
    pub serial: String,
    pub arch: String,
}

impl BootQuery {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut boot_query = BootQuery::default();
        let mut seen = [false; 6];

        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            let (idx, field) = match key.as_ref() {
                "uuid" => (0, &mut boot_query.uuid),
                "mac" => (1, &mut boot_query.mac),
                "domain" => (2, &mut boot_query.domain),
                "hostname" => (3, &mut boot_query.hostname),
                "serial" => (4, &mut boot_query.serial),
                "arch" => (5, &mut boot_query.arch),
                _ => continue,
            };
            if !seen[idx] {
                seen[idx] = true;
                *field = value.into_owned();
            }
        }

        boot_query
    }

    pub fn architecture(&self) -> MachineArchitecture {
        MachineArchitecture::from(self.arch.as_str())
    }
}

impl<S> FromRequestParts<S> for BootQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BootQuery::from_query(parts.uri.query()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let query = BootQuery::from_query(Some(
            "uuid=4c4c4544-0034-3510-8051-b2c04f4b4e32&mac=0c-42-a1-b2-c3-d4&domain=&hostname=node%201&serial=ABC123&arch=arm64&unknown=1",
        ));

        assert_eq!(query.uuid, "4c4c4544-0034-3510-8051-b2c04f4b4e32");
        assert_eq!(query.mac, "0c-42-a1-b2-c3-d4");
        assert_eq!(query.domain, "");
        assert_eq!(query.hostname, "node 1");
        assert_eq!(query.serial, "ABC123");
        assert_eq!(query.arch, "arm64");
        assert_eq!(query.architecture(), MachineArchitecture::Arm64);
    }

    #[test]
    fn test_missing_parameters_are_empty() {
        assert_eq!(BootQuery::from_query(None), BootQuery::default());

        let query = BootQuery::from_query(Some("mac=aa-bb"));
        assert_eq!(query.uuid, "");
        assert_eq!(query.arch, "");
        assert_eq!(query.architecture(), MachineArchitecture::Amd64);
    }

    #[test]
    fn test_first_value_wins() {
        let query = BootQuery::from_query(Some("arch=i386&arch=arm64"));
        assert_eq!(query.arch, "i386");
        assert_eq!(query.architecture(), MachineArchitecture::Amd64);
    }
}
