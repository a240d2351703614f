mod backup;
mod config;
mod db;
mod generation;
mod grading;
mod ipc;
mod model;
mod performance;
mod publisher;
mod store;

use std::io::{self, BufRead, Write};

use tracing::{info, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

use crate::config::DaemonConfig;
use crate::generation::{GenerationError, HttpGenerator, TextGenerator};

fn main() {
    let config = DaemonConfig::from_env();

    // stdout carries the protocol, so logs go to stderr.
    let fmt = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false);
    let filter_layer = LevelFilter::from_level(config.log_level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let generator: Option<Box<dyn TextGenerator>> = match HttpGenerator::from_config(&config.llm) {
        Ok(g) => Some(Box::new(g)),
        Err(GenerationError::NotConfigured) => {
            info!("no API key configured; assistant methods are disabled");
            None
        }
        Err(e) => {
            warn!(error = %e, "text generation client unavailable");
            None
        }
    };

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        config,
        generator,
    };
    info!(version = env!("CARGO_PKG_VERSION"), "campusd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => ipc::bad_json(e.to_string()),
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
