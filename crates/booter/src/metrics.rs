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
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const TIME_BUCKETS: &[f64; 11] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

pub fn describe() {
    metrics::describe_counter!(
        "ipxe_requests_total",
        "iPXE script requests, labeled by requested script"
    );
    metrics::describe_counter!(
        "ipxe_boot_scripts_total",
        "Composed boot scripts, labeled by architecture and outcome"
    );
    metrics::describe_histogram!(
        "ipxe_boot_script_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent resolving the image factory URL for a boot script"
    );
}

pub fn setup_prometheus() -> Result<PrometheusHandle, BuildError> {
    let prometheus_handle = PrometheusBuilder::new()
        .add_global_label("system", "ipxe-booter")
        .add_global_label("build_version", env!("CARGO_PKG_VERSION"))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            TIME_BUCKETS,
        )?
        .install_recorder()?;

    describe();

    let handle_clone = prometheus_handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            handle_clone.run_upkeep();
        }
    });

    Ok(prometheus_handle)
}
