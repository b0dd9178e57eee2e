//! Tekton Results MCP Server - Exposes archived PipelineRuns and TaskRuns via Model Context Protocol.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::doc_markdown)]

mod rpc;
mod tools;
mod transport;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tekton_results::{ResultsConfig, Service};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::rpc::McpServer;
use crate::tools::Tools;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

/// Tekton Results MCP server.
#[derive(Parser)]
#[command(name = "results-mcp")]
#[command(about = "Read-only MCP tools for PipelineRuns and TaskRuns archived by Tekton Results")]
#[command(version)]
struct Cli {
    /// Transport to serve the protocol on.
    #[arg(long, value_enum, default_value = "http")]
    transport: Transport,

    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    address: SocketAddr,

    /// Default namespace for tools (defaults to the kubeconfig namespace, then `default`).
    #[arg(long)]
    namespace: Option<String>,
}

fn init_tracing(transport: Transport) {
    // stdout carries the protocol in stdio mode, keep logs on stderr and quiet
    let level = match transport {
        Transport::Stdio => Level::WARN,
        Transport::Http => Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
        .with_writer(std::io::stderr)
        .init();
}

/// Namespace from the kubeconfig context, if one can be loaded.
async fn kubeconfig_namespace() -> Option<String> {
    kube::Config::infer()
        .await
        .ok()
        .map(|config| config.default_namespace)
        .filter(|ns| !ns.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.transport);

    let namespace = match cli.namespace.filter(|ns| !ns.trim().is_empty()) {
        Some(ns) => ns,
        None => kubeconfig_namespace()
            .await
            .unwrap_or_else(|| tekton_results::service::DEFAULT_NAMESPACE.to_string()),
    };

    let client = ResultsConfig::from_env()
        .build_client()
        .await
        .context("Failed to initialize Tekton Results client")?;
    let service = Service::new(client).with_default_namespace(namespace.clone());
    let server = McpServer::new(Tools::new(Arc::new(service), namespace.clone()));
    info!(namespace = %namespace, transport = ?cli.transport, "Starting Tekton Results MCP server");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully");
            shutdown.cancel();
        }
    });

    match cli.transport {
        Transport::Stdio => transport::serve_stdio(server, cancel).await,
        Transport::Http => transport::serve_http(server, cli.address, cancel).await,
    }
}
