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


use std::time::Duration;

pub fn config(server: &mockito::ServerGuard, secure_boot: bool) -> image_factory::Config {
    image_factory::Config {
        base_url: server.url(),
        pxe_base_url: "https://pxe.factory.test".to_string(),
        secure_boot,
        request_timeout: Duration::from_secs(5),
    }
}

pub async fn create_mock_http_server() -> mockito::ServerGuard {
    // Request a new server from the pool
    mockito::Server::new_async().await
}
