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

use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRef, Path, State};
use axum::routing::get;

use crate::extractors::boot_query::BootQuery;
use crate::ipxe::{IpxeHandler, ScriptResponse};

/// URL pattern: `<prefix>/boot.ipxe?uuid=${uuid}&mac=${net${idx}/mac:hexhyp}&domain=${domain}&hostname=${hostname}&serial=${serial}&arch=${buildarch}`
pub async fn script(
    State(handler): State<Arc<IpxeHandler>>,
    Path(script): Path<String>,
    query: BootQuery,
) -> ScriptResponse {
    handler.handle(&script, &query).await
}

pub fn get_router<S>(path_prefix: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<IpxeHandler>: FromRef<S>,
{
    Router::new().route(format!("{path_prefix}/{{script}}").as_str(), get(script))
}
