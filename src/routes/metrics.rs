// ABOUTME: Metric route handlers for one-shot snapshots and the live SSE stream
// ABOUTME: Streams periodic JSON snapshots with keepalive comments between ticks
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 Vigil Agent Contributors

//! Metric routes.
//!
//! `/api/metrics` measures and answers once. `/api/metrics/stream` holds
//! the connection open and pushes a fresh snapshot every tick as an SSE
//! event; the bearer gate checks the token once at connection time, so a
//! stream can outlive the access token that opened it.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::Stream;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::collect::{MetricsCollector, MetricsSnapshot};

/// Interval between stream snapshots.
const STREAM_INTERVAL: Duration = Duration::from_secs(2);

/// Handle `GET /api/metrics`.
pub async fn metrics() -> Json<MetricsSnapshot> {
    let mut collector = MetricsCollector::new();
    Json(collector.snapshot().await)
}

/// Handle `GET /api/metrics/stream`.
///
/// The first event goes out as soon as the first measurement completes;
/// subsequent events follow every tick. The collector lives for the whole
/// stream so CPU deltas accumulate between ticks instead of restarting
/// from a cold sample.
pub async fn metrics_stream() -> impl IntoResponse {
    let stream = snapshot_stream();
    (
        [(axum::http::header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keepalive"),
        ),
    )
}

fn snapshot_stream() -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut collector = MetricsCollector::new();
        let mut ticker = tokio::time::interval(STREAM_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let snapshot = collector.snapshot().await;
            match Event::default().json_data(&snapshot) {
                Ok(event) => yield Ok::<_, Infallible>(event),
                Err(e) => {
                    debug!("metric snapshot serialization failed, closing stream: {e}");
                    break;
                }
            }
        }
    }
}
