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

//! ipxe-booter serves the two scripts iPXE needs to network boot Talos:
//! `init.ipxe`, which finds a working interface and calls back, and
//! `boot.ipxe`, which chains to an image factory PXE URL. At startup it also
//! embeds `init.ipxe` into prebuilt iPXE binaries for the TFTP server.

use std::sync::Once;

use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub mod command_line;
pub mod common;
pub mod config;
pub mod extractors;
pub mod ipxe;
pub mod metrics;
pub mod middleware;
pub mod patch;
pub mod routes;

static LOG_SETUP: Once = Once::new();

/// Initialize global logging output to STDOUT.
/// Use `export RUST_LOG=trace|debug|info|warn|error` to change log level.
pub fn init_logging(json: bool) -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("tower=warn".parse()?)
        .add_directive("rustls=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?)
        .add_directive("reqwest=info".parse()?)
        .add_directive("h2=warn".parse()?);

    let mut result = Ok(());
    LOG_SETUP.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter);
        result = if json {
            registry.with(fmt::layer().json()).try_init()
        } else {
            registry.with(fmt::layer()).try_init()
        };
    });

    Ok(result?)
}
