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

use tera::{Context, Tera};

use crate::ipxe::BOOT_SCRIPT_NAME;

// Retries DHCP on every interface in turn and chains to the boot script on the
// first one that gets a lease. Reboots after ten full rounds.
const INIT_SCRIPT_TEMPLATE: &str = r#"#!ipxe
prompt --key 0x02 --timeout 2000 Press Ctrl-B for the iPXE command line... && shell ||

ifstat

set attempts:int32 10
set x:int32 0

:retry_loop

	set idx:int32 0

	:loop
		isset ${net${idx}/mac} || goto exhausted

		ifclose
		iflinkwait --timeout 5000 net${idx} || goto next_iface
		dhcp net${idx} || goto next_iface
		goto boot

	:next_iface
		inc idx && goto loop

	:boot
		route

		chain --replace {{ boot_script_url }} || goto next_iface

:exhausted
	echo
	echo Failed to iPXE boot successfully via all interfaces

	iseq ${x} ${attempts} && goto fail ||

	echo Retrying...
	echo

	inc x
	goto retry_loop

:fail
	echo
	echo Failed to get a valid response after ${attempts} attempts
	echo

	echo Rebooting in 5 seconds...
	sleep 5
	reboot
"#;

// Placeholders in here are expanded by iPXE on the booting machine
const BOOT_SCRIPT_QUERY: &str = "uuid=${uuid}&mac=${net${idx}/mac:hexhyp}&domain=${domain}&hostname=${hostname}&serial=${serial}&arch=${buildarch}";

/// `host:port`, with IPv6 literals in brackets.
pub fn join_host_port(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("[{host}]:{port}"),
        _ => format!("{host}:{port}"),
    }
}

pub fn boot_script_url(advertise_address: &str, port: u16, path_prefix: &str) -> String {
    format!(
        "http://{}{path_prefix}/{BOOT_SCRIPT_NAME}?{BOOT_SCRIPT_QUERY}",
        join_host_port(advertise_address, port)
    )
}

/// Renders the script iPXE runs first, either embedded in the binary or
/// fetched as `init.ipxe`.
pub fn build_init_script(
    advertise_address: &str,
    port: u16,
    path_prefix: &str,
) -> Result<Vec<u8>, tera::Error> {
    let mut context = Context::new();
    context.insert(
        "boot_script_url",
        &boot_script_url(advertise_address, port, path_prefix),
    );

    Tera::one_off(INIT_SCRIPT_TEMPLATE, &context, false).map(String::into_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("10.0.0.1", 50084), "10.0.0.1:50084");
        assert_eq!(join_host_port("fd00::1", 50084), "[fd00::1]:50084");
        assert_eq!(join_host_port("booter.local", 80), "booter.local:80");
    }

    #[test]
    fn test_init_script_chains_to_boot_script() {
        let script = String::from_utf8(build_init_script("10.0.0.1", 50084, "/ipxe").unwrap()).unwrap();

        assert!(script.starts_with("#!ipxe\n"));
        assert!(script.contains(
            "chain --replace http://10.0.0.1:50084/ipxe/boot.ipxe?uuid=${uuid}&mac=${net${idx}/mac:hexhyp}&domain=${domain}&hostname=${hostname}&serial=${serial}&arch=${buildarch} || goto next_iface"
        ));
        assert!(script.contains("isset ${net${idx}/mac} || goto exhausted"));
        assert!(!script.contains("{{"));
    }

    #[test]
    fn test_init_script_is_deterministic() {
        assert_eq!(
            build_init_script("fd00::1", 8080, "").unwrap(),
            build_init_script("fd00::1", 8080, "").unwrap()
        );
        let script = String::from_utf8(build_init_script("fd00::1", 8080, "").unwrap()).unwrap();
        assert!(script.contains("http://[fd00::1]:8080/boot.ipxe?"));
    }
}
