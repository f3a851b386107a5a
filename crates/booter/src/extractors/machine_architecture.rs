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

use std::fmt::Display;

/// The two image flavors we boot. iPXE reports `${buildarch}`, which is
/// `arm64` on ARM and anything from `x86_64` to `i386` (qemu) elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineArchitecture {
    Amd64,
    Arm64,
}

impl From<&str> for MachineArchitecture {
    fn from(value: &str) -> Self {
        match value {
            "arm64" => MachineArchitecture::Arm64,
            // https://ipxe.org/cfg/buildarch
            _ => MachineArchitecture::Amd64,
        }
    }
}

impl MachineArchitecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineArchitecture::Amd64 => "amd64",
            MachineArchitecture::Arm64 => "arm64",
        }
    }

    pub fn console_kernel_args(&self) -> [&'static str; 2] {
        match self {
            MachineArchitecture::Arm64 => ["console=tty0", "console=ttyAMA0"],
            MachineArchitecture::Amd64 => ["console=tty0", "console=ttyS0"],
        }
    }
}

impl Display for MachineArchitecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
