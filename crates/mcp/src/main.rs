#![forbid(unsafe_code)]

mod entry;
mod handlers;
mod server;
mod support;
mod tools;

pub(crate) use support::*;

use rl_storage::SqliteStore;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Baseline protocol revision; widely deployed clients negotiate down to it.
const MCP_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "reagent-ledger-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const CRASH_REPORT_FILE: &str = "rl_mcp_last_crash.txt";

pub(crate) struct McpServer {
    initialized: bool,
    store: SqliteStore,
}

fn write_last_crash(storage_dir: &Path, kind: &str, detail: &str) {
    // Best-effort; never includes request bodies.
    let _ = std::fs::create_dir_all(storage_dir);
    let path = storage_dir.join(CRASH_REPORT_FILE);

    let mut out = String::new();
    let _ = writeln!(out, "ts={}", ts_ms_to_rfc3339(now_ms_i64()));
    let _ = writeln!(out, "pid={}", std::process::id());
    let _ = writeln!(out, "kind={kind}");
    let _ = writeln!(out, "build={}", build_fingerprint());
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let _ = writeln!(out, "cwd={}", cwd.to_string_lossy());
    let _ = writeln!(out, "args={:?}", std::env::args().collect::<Vec<_>>());
    let _ = writeln!(out, "detail={detail}");

    let _ = std::fs::write(path, out);
}

fn install_crash_reporter(storage_dir: PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let mut detail = info.to_string();
        let backtrace = std::backtrace::Backtrace::force_capture();
        let _ = write!(&mut detail, "\nbacktrace:\n{backtrace}");
        write_last_crash(&storage_dir, "panic", &detail);
        default_hook(info);
    }));
}

/// Diagnostics go to stderr; stdout carries the protocol.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn usage() -> &'static str {
    "rl_mcp — reagent ledger MCP server (stdio)\n\n\
USAGE:\n\
  rl_mcp [--storage-dir DIR] [--config FILE] [--log FILTER]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version/build and exit\n\
\n\
ENVIRONMENT:\n\
  RL_STORAGE_DIR   Store directory (default: .reagent_ledger)\n\
  RL_CONFIG        YAML config file with optional `storage_dir` and `log` keys\n\
  RL_LOG           tracing filter for stderr diagnostics (default: warn)\n\
\n\
Command-line flags override environment variables, which override the config file.\n"
}

fn version_line() -> String {
    format!("rl_mcp {SERVER_VERSION} build={}", build_fingerprint())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("{}", version_line());
        return Ok(());
    }

    let config = match RuntimeConfig::from_process() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("rl_mcp: {err}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.log_filter);
    install_crash_reporter(config.storage_dir.clone());
    let mut session = SessionLog::new(&config.storage_dir);
    tracing::info!(
        storage_dir = %config.storage_dir.display(),
        config = ?config.config_path,
        build = %build_fingerprint(),
        "starting rl_mcp"
    );

    let store = match SqliteStore::open(&config.storage_dir) {
        Ok(store) => store,
        Err(err) => {
            let detail = format_store_error(&err);
            session.note_error(&detail);
            session.note_exit("store open failed");
            write_last_crash(&config.storage_dir, "error", &detail);
            return Err(err.into());
        }
    };

    let mut server = McpServer::new(store);
    let result = entry::run_stdio(&mut server, &mut session);
    if let Err(err) = &result {
        tracing::error!(error = %err, "stdio loop failed");
        write_last_crash(&config.storage_dir, "error", &format!("{err:?}"));
    }
    result
}
