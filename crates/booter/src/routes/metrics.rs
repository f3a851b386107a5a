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
use axum::Router;
use axum::extract::{FromRef, State};
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;

async fn metrics(State(prometheus_handle): State<PrometheusHandle>) -> impl IntoResponse {
    // Make sure the metrics are fully updated prior to rendering them
    prometheus_handle.run_upkeep();

    prometheus_handle.render()
}

pub fn get_router<S>(path: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    PrometheusHandle: FromRef<S>,
{
    Router::new().route(path, get(metrics))
}
