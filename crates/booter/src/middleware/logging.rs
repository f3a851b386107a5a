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

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;

fn header_value<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
}

/// Emits one `request` event per HTTP request once the response is ready.
pub async fn logger(
    ConnectInfo(socket_addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let user_agent = header_value(request.headers(), "User-Agent").to_string();
    let x_forwarded_for = header_value(request.headers(), "X-Forwarded-For").to_string();

    let started = std::time::Instant::now();
    let response = next.run(request).await;

    tracing::info!(
        request_method = %method,
        request_path = %path,
        request_query = %query,
        request_headers_user_agent = %user_agent,
        request_headers_x_forwarded_for = %x_forwarded_for,
        response_status = response.status().as_u16(),
        response_headers_content_length = header_value(response.headers(), "Content-Length"),
        remote_ip = %socket_addr.ip(),
        remote_port = socket_addr.port(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}
