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
use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::map_request;
use axum::{Router, ServiceExt};
use clap::Parser;
use eyre::WrapErr;
use image_factory::{FactoryClient, ImageFactoryClient};
use ipxe_booter::command_line::Args;
use ipxe_booter::common::AppState;
use ipxe_booter::config::RuntimeConfig;
use ipxe_booter::ipxe::IpxeHandler;
use ipxe_booter::{metrics, middleware, patch, routes};
use tower_layer::Layer;

#[tokio::main]
async fn main() -> Result<(), eyre::Report> {
    let args = Args::parse();
    if args.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    ipxe_booter::init_logging(args.json_logs)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Start ipxe-booter");

    let mut runtime_config = RuntimeConfig::try_from(args).wrap_err("invalid configuration")?;
    runtime_config.resolve_advertise_address()?;

    let factory = Arc::new(
        FactoryClient::new_with_config(&runtime_config.image_factory.client_config())
            .wrap_err("unable to build image factory client")?,
    );

    if runtime_config.talos_version.is_empty() {
        runtime_config.talos_version = factory
            .latest_stable_version()
            .await
            .wrap_err("no talos version configured and the latest stable one could not be determined")?;
        tracing::info!(
            talos_version = %runtime_config.talos_version,
            "using latest stable talos version"
        );
    }

    let prometheus_handle = metrics::setup_prometheus()?;

    let ipxe_handler = IpxeHandler::new(&runtime_config, factory)?;

    // The TFTP side must never hand out stale binaries, so nothing is served until all are patched
    if runtime_config.ipxe_binaries.enabled {
        tracing::info!("patch iPXE binaries");
        let written = patch::patch_binaries(
            ipxe_handler.init_script(),
            &runtime_config.ipxe_binaries.templates_dir,
            &runtime_config.ipxe_binaries.output_dir,
        )
        .wrap_err("failed to patch iPXE binaries")?;
        tracing::info!(count = written.len(), "successfully patched iPXE binaries");
    } else {
        tracing::warn!("iPXE binary patching is disabled, only HTTP boot scripts are served");
    }

    let app_state = AppState {
        ipxe: Arc::new(ipxe_handler),
        prometheus_handle,
    };

    let app = Router::new()
        .merge(routes::ipxe::get_router(
            &runtime_config.normalized_path_prefix(),
        ))
        .route_layer(axum::middleware::from_fn(middleware::logging::logger))
        // merged after the logger so scrapes stay out of the request log
        .merge(routes::metrics::get_router("/metrics"))
        .with_state(app_state);

    let request_normalizing_middleware = map_request(middleware::normalize_url);
    let final_app = request_normalizing_middleware.layer(app); // this one has to wrap all the others for the map_request to be able to affect routing

    let socket_addr = SocketAddr::new(runtime_config.bind_address, runtime_config.api_port);
    let listener = tokio::net::TcpListener::bind(socket_addr)
        .await
        .wrap_err_with(|| format!("unable to bind to {socket_addr}"))?;

    tracing::info!(
        %socket_addr,
        advertise_address = %runtime_config.api_advertise_address,
        "serving iPXE scripts"
    );

    axum::serve(
        listener,
        final_app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
