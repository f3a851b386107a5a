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

use version_compare::Cmp;

enum ParsedVersion<'a> {
    Stable(&'a str),
    PreRelease,
}

// Accepts `v1.2.3`, `1.2` and `1.2.3+build`. Missing minor/patch compare as zero.
fn parse_tolerant(raw: &str) -> Option<ParsedVersion<'_>> {
    let trimmed = raw.trim();
    let without_prefix = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    let without_build = without_prefix
        .split_once('+')
        .map_or(without_prefix, |(core, _)| core);

    let (core, pre_release) = match without_build.split_once('-') {
        Some((core, pre)) => (core, !pre.is_empty()),
        None => (without_build, false),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    if pre_release {
        Some(ParsedVersion::PreRelease)
    } else {
        Some(ParsedVersion::Stable(core))
    }
}

/// Picks the highest stable version out of the list.
///
/// Pre-releases are skipped, entries that are not versions at all are logged
/// and skipped. The winning entry is returned as it appeared in the list.
pub fn latest_stable<S: AsRef<str>>(versions: &[S]) -> Option<String> {
    let mut latest: Option<(&str, &str)> = None;

    for raw in versions {
        let raw = raw.as_ref();
        let core = match parse_tolerant(raw) {
            Some(ParsedVersion::Stable(core)) => core,
            Some(ParsedVersion::PreRelease) => continue,
            None => {
                tracing::warn!(version = raw, "failed to parse version");
                continue;
            }
        };

        let newer = match latest {
            None => true,
            Some((_, best)) => version_compare::compare(core, best) == Ok(Cmp::Gt),
        };
        if newer {
            latest = Some((raw.trim(), core));
        }
    }

    latest.map(|(raw, _)| raw.to_string())
}
