mod backup;
mod db;
mod error;
mod grading;
mod ipc;
mod marksheet;
mod model;
mod pipeline;
mod rank;
mod registry;
mod settings;
mod store;
mod summary;
#[cfg(test)]
mod test_support;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "resultsd")]
#[command(version)]
#[command(about = "School results engine speaking JSON lines over stdio", long_about = None)]
struct Cli {
    /// Workspace directory holding resultsd.sqlite3
    #[arg(long, global = true, env = "RESULTSD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log level written to stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RESULTSD_LOG", default_value = "warn")]
    log_level: tracing::Level,

    /// SQLite busy timeout in milliseconds
    #[arg(long, global = true, default_value_t = 5000)]
    busy_timeout_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-line requests on stdin (default)
    Serve,
    /// Recompute and rank every standard of one exam, then print the counts
    Pipeline {
        #[arg(long)]
        exam: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let busy_timeout = Duration::from_millis(cli.busy_timeout_ms);
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.workspace, busy_timeout),
        Commands::Pipeline { exam } => {
            let workspace = cli
                .workspace
                .ok_or_else(|| anyhow!("--workspace (or RESULTSD_WORKSPACE) is required"))?;
            run_pipeline(&workspace, &exam, busy_timeout)
        }
    }
}

fn run_pipeline(workspace: &std::path::Path, exam: &str, busy_timeout: Duration) -> anyhow::Result<()> {
    let conn = db::open_db(workspace, busy_timeout)
        .with_context(|| format!("failed to open workspace {}", workspace.to_string_lossy()))?;
    let processed = pipeline::run_full_exam_pipeline(&conn, exam)?;
    let out = serde_json::json!({ "examId": exam, "processed": processed });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn serve(workspace: Option<PathBuf>, busy_timeout: Duration) -> anyhow::Result<()> {
    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        busy_timeout,
    };
    if let Some(path) = workspace {
        let conn = db::open_db(&path, busy_timeout)
            .with_context(|| format!("failed to open workspace {}", path.to_string_lossy()))?;
        state.workspace = Some(path);
        state.db = Some(conn);
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resultsd serving on stdio");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
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
