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
use std::str::FromStr;

use axum::http::uri::PathAndQuery;
use axum::http::{Request, Uri};

pub mod logging;

fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

// iPXE scripts are often templated with a trailing slash on the base URL, so
// `//boot.ipxe` has to route like `/boot.ipxe`. Only the path is touched, query
// values may legitimately contain `//`.
pub async fn normalize_url<B>(mut request: Request<B>) -> Request<B> {
    let uri = request.uri_mut();
    if let Some(p_q) = uri.path_and_query() {
        if !p_q.path().contains("//") {
            return request;
        }

        let mut normalized = collapse_slashes(p_q.path());
        if let Some(query) = p_q.query() {
            normalized.push('?');
            normalized.push_str(query);
        }

        if let Ok(path_and_query) = PathAndQuery::from_str(&normalized) {
            *uri = Uri::from(path_and_query);
        }
    }
    request
}
