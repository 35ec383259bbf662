mod calc;
mod cli;
mod config;
mod error;
mod ipc;
mod pdf;
mod portal;
mod report;
mod sheet;
mod store;
mod web;
mod xlsx;

use anyhow::Context;
use cli::Args;
use config::Config;
use portal::Portal;
use std::io::{self, BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse_args();
    init_logging(&args);

    let result = if args.stdio {
        run_stdio(&args)
    } else {
        run_server(&args)
    };
    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs always go to stderr; stdout belongs to the stdio channel.
fn init_logging(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run_server(args: &Args) -> anyhow::Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    info!("resultd v{}", env!("CARGO_PKG_VERSION"));

    let portal = Portal::open(&config.storage.root).with_context(|| {
        format!(
            "failed to open storage root {}",
            config.storage.root.to_string_lossy()
        )
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(web::serve(&config, portal))
}

fn run_stdio(args: &Args) -> anyhow::Result<()> {
    let mut state = ipc::AppState {
        workspace: None,
        portal: None,
    };
    if let Some(root) = &args.root {
        state.portal = Some(Portal::open(root)?);
        state.workspace = Some(root.clone());
    }

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

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
