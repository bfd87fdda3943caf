// /////////////////////////////////////////////////////////////////////////////
// Music Library Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scheduler Metrics
//!
//! [`SchedulerMetrics`] is the Prometheus registry backing the ambient
//! metrics requirement: counters for tasks run/skipped/failed by name, a
//! gauge for in-flight invocations per concurrency kind, and a histogram of
//! task duration.

use std::sync::Arc;

use musiclib_domain::CoreError;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const NAMESPACE: &str = "musiclib_scheduler";

#[derive(Clone)]
pub struct SchedulerMetrics {
    registry: Arc<Registry>,
    tasks_run_total: IntCounterVec,
    tasks_skipped_total: IntCounterVec,
    tasks_failed_total: IntCounterVec,
    in_flight: IntGaugeVec,
    task_duration_seconds: Histogram,
}

impl SchedulerMetrics {
    pub fn new() -> Result<Self, CoreError> {
        let registry = Registry::new();

        let tasks_run_total = IntCounterVec::new(
            Opts::new("tasks_run_total", "Total task invocations that ran to completion").namespace(NAMESPACE),
            &["task_name"],
        )
        .map_err(|error| CoreError::internal(format!("failed to create tasks_run_total: {error}")))?;

        let tasks_skipped_total = IntCounterVec::new(
            Opts::new("tasks_skipped_total", "Total task invocations skipped by cooldown or load shedding")
                .namespace(NAMESPACE),
            &["task_name"],
        )
        .map_err(|error| CoreError::internal(format!("failed to create tasks_skipped_total: {error}")))?;

        let tasks_failed_total = IntCounterVec::new(
            Opts::new("tasks_failed_total", "Total task invocations whose body returned an error")
                .namespace(NAMESPACE),
            &["task_name"],
        )
        .map_err(|error| CoreError::internal(format!("failed to create tasks_failed_total: {error}")))?;

        let in_flight = IntGaugeVec::new(
            Opts::new("in_flight_invocations", "Invocations currently holding a concurrency permit")
                .namespace(NAMESPACE),
            &["kind"],
        )
        .map_err(|error| CoreError::internal(format!("failed to create in_flight_invocations: {error}")))?;

        let task_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("task_duration_seconds", "Wall-clock time of a single task/processor invocation")
                .namespace(NAMESPACE)
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0]),
        )
        .map_err(|error| CoreError::internal(format!("failed to create task_duration_seconds: {error}")))?;

        registry
            .register(Box::new(tasks_run_total.clone()))
            .map_err(|error| CoreError::internal(format!("failed to register tasks_run_total: {error}")))?;
        registry
            .register(Box::new(tasks_skipped_total.clone()))
            .map_err(|error| CoreError::internal(format!("failed to register tasks_skipped_total: {error}")))?;
        registry
            .register(Box::new(tasks_failed_total.clone()))
            .map_err(|error| CoreError::internal(format!("failed to register tasks_failed_total: {error}")))?;
        registry
            .register(Box::new(in_flight.clone()))
            .map_err(|error| CoreError::internal(format!("failed to register in_flight_invocations: {error}")))?;
        registry
            .register(Box::new(task_duration_seconds.clone()))
            .map_err(|error| CoreError::internal(format!("failed to register task_duration_seconds: {error}")))?;

        Ok(Self {
            registry: Arc::new(registry),
            tasks_run_total,
            tasks_skipped_total,
            tasks_failed_total,
            in_flight,
            task_duration_seconds,
        })
    }

    pub fn record_run(&self, task_name: &str, duration_seconds: f64) {
        self.tasks_run_total.with_label_values(&[task_name]).inc();
        self.task_duration_seconds.observe(duration_seconds);
    }

    pub fn record_skipped(&self, task_name: &str) {
        self.tasks_skipped_total.with_label_values(&[task_name]).inc();
    }

    pub fn record_failed(&self, task_name: &str) {
        self.tasks_failed_total.with_label_values(&[task_name]).inc();
    }

    pub fn in_flight_inc(&self, kind: &str) {
        self.in_flight.with_label_values(&[kind]).inc();
    }

    pub fn in_flight_dec(&self, kind: &str) {
        self.in_flight.with_label_values(&[kind]).dec();
    }

    /// Renders the registry in Prometheus text exposition format, for a
    /// `/metrics` scrape endpoint.
    pub fn render(&self) -> Result<String, CoreError> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|error| CoreError::internal(format!("failed to encode metrics: {error}")))
    }
}

/// Serves `/metrics` (Prometheus text exposition) and `/health` on
/// `127.0.0.1:{port}` until the connection loop itself errors. Runs
/// alongside the `serve` subcommand's `ProcessorLoop`; there is no
/// external HTTP framework in this workspace's stack, so requests are
/// parsed by hand the way a minimal scrape target needs to be.
pub async fn serve_metrics(metrics: Arc<SchedulerMetrics>, port: u16) -> Result<(), CoreError> {
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|error| CoreError::internal(format!("failed to bind metrics endpoint on {addr}: {error}")))?;
    tracing::info!(%addr, "metrics endpoint listening");
    accept_loop(listener, metrics).await;
    Ok(())
}

async fn accept_loop(listener: TcpListener, metrics: Arc<SchedulerMetrics>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    if let Err(error) = handle_metrics_request(stream, metrics).await {
                        tracing::warn!(%error, "error handling metrics request");
                    }
                });
            }
            Err(error) => tracing::warn!(%error, "error accepting metrics connection"),
        }
    }
}

async fn handle_metrics_request(
    mut stream: tokio::net::TcpStream,
    metrics: Arc<SchedulerMetrics>,
) -> std::io::Result<()> {
    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);

    if request.starts_with("GET /metrics") {
        match metrics.render() {
            Ok(body) => {
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await?;
            }
            Err(error) => {
                let body = error.to_string();
                let response = format!(
                    "HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await?;
            }
        }
    } else if request.starts_with("GET /health") {
        stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK").await?;
    } else {
        stream
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\nNot Found")
            .await?;
    }
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_renders_a_task_run() {
        let metrics = SchedulerMetrics::new().unwrap();
        metrics.record_run("parser", 0.25);
        metrics.record_skipped("parser");
        metrics.record_failed("fingerprinter");
        metrics.in_flight_inc("heavy_io");

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("musiclib_scheduler_tasks_run_total"));
        assert!(rendered.contains("musiclib_scheduler_tasks_skipped_total"));
        assert!(rendered.contains("musiclib_scheduler_tasks_failed_total"));
        assert!(rendered.contains("musiclib_scheduler_in_flight_invocations"));
        assert!(rendered.contains("musiclib_scheduler_task_duration_seconds"));
    }

    #[tokio::test]
    async fn health_and_metrics_endpoints_respond() {
        let metrics = Arc::new(SchedulerMetrics::new().unwrap());
        metrics.record_run("parser", 0.1);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(accept_loop(listener, metrics));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /health HTTP/1.1\r\n\r\n").await.unwrap();
        let mut buffer = [0u8; 256];
        let n = stream.read(&mut buffer).await.unwrap();
        let response = String::from_utf8_lossy(&buffer[..n]);
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("OK"));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /metrics HTTP/1.1\r\n\r\n").await.unwrap();
        let n = stream.read(&mut buffer).await.unwrap();
        let response = String::from_utf8_lossy(&buffer[..n]);
        assert!(response.contains("musiclib_scheduler_tasks_run_total"));

        server.abort();
    }
}
