// ABOUTME: Shared test helpers for integration tests
// ABOUTME: Exports the HTTP harness used to exercise the router without a listener
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod http;
