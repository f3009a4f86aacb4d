use std::path::PathBuf;

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::fmt::{self, format::DefaultFields, format::Format};

use llm_bridge::config::{UserConfig, bridge_home, expand_home, load_user_config};
use llm_bridge::mapping::{MappingTable, default_mappings_path};
use llm_bridge::{MappingStore, ResolvedConfig};

type StderrWriter = fn() -> std::io::Stderr;

fn stderr_layer<S>() -> fmt::Layer<S, DefaultFields, Format, StderrWriter> {
    fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr as StderrWriter)
}

fn file_layer<S>(writer: NonBlocking) -> fmt::Layer<S, DefaultFields, Format, NonBlocking> {
    fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
}

fn init_tracing(sb_home: &std::path::Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <LLM_BRIDGE_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory (absolute). Defaults to <LLM_BRIDGE_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, prelude::*};

    let env_set = |k: &str| std::env::var_os(k).is_some();

    // TRACING_FILTER first, then RUST_LOG, then user config.
    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let mut dir_error = None;
    let file_writer = if log_to_file {
        let dir = log_dir.unwrap_or_else(|| sb_home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "llm-bridge.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                Some(nb)
            }
            Err(e) => {
                dir_error = Some((dir, e));
                None
            }
        }
    } else {
        None
    };

    let reg = tracing_subscriber::registry().with(filter);
    let result = if tracing_json {
        reg.with(stderr_layer().json())
            .with(file_writer.map(|nb| file_layer(nb).json()))
            .try_init()
    } else if tracing_compact {
        reg.with(stderr_layer().compact())
            .with(file_writer.map(|nb| file_layer(nb).compact()))
            .try_init()
    } else if tracing_pretty {
        reg.with(stderr_layer().pretty())
            .with(file_writer.map(|nb| file_layer(nb).pretty()))
            .try_init()
    } else {
        reg.with(stderr_layer())
            .with(file_writer.map(file_layer))
            .try_init()
    };
    if let Err(e) = result {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

fn log_routes(table: &MappingTable, resolved: &ResolvedConfig) {
    for (i, m) in table.iter().enumerate() {
        tracing::info!(
            "route[{}] {} : {} -> {} via {}/{}",
            i,
            m.proxy_path_prefix,
            m.source_api,
            m.target_api,
            m.request_transform,
            m.response_transform
        );
    }
    let active = table
        .iter()
        .any(|m| m.source_api == resolved.source_api && m.target_api == resolved.target_api);
    if !active {
        tracing::warn!(
            "no mapping converts {} to {}; requests for the active pair will not be routed",
            resolved.source_api,
            resolved.target_api
        );
    }
}

#[cfg(unix)]
async fn wait_for_signals(store: &MappingStore) -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    tracing::info!(
        "watching {} (SIGHUP reloads, Ctrl-C exits)",
        store.path().display()
    );
    loop {
        tokio::select! {
            _ = hangup.recv() => {
                // Failures are logged by the loader; the previous table stays active.
                let _ = store.reload();
            }
            res = tokio::signal::ctrl_c() => {
                res?;
                return Ok(());
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_store: &MappingStore) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

async fn run(user_cfg: Option<&UserConfig>) -> anyhow::Result<()> {
    env_flags! {
        /// Mapping file path. If empty: user config, then api-mappings.yaml beside the executable.
        API_MAPPINGS_FILE: &str = "";
        /// Stay running and reload the mapping file on SIGHUP.
        WATCH_RELOAD: bool = false;
    }

    let env_set = |k: &str| std::env::var_os(k).is_some();
    let mappings_cfg = user_cfg.and_then(|c| c.mappings.as_ref());

    let mappings_path = if !(*API_MAPPINGS_FILE).is_empty() {
        PathBuf::from((*API_MAPPINGS_FILE).to_string())
    } else {
        mappings_cfg
            .and_then(|m| m.file.as_deref())
            .map(expand_home)
            .unwrap_or_else(default_mappings_path)
    };
    let watch = if env_set("WATCH_RELOAD") {
        *WATCH_RELOAD
    } else {
        mappings_cfg
            .and_then(|m| m.watch)
            .unwrap_or(*WATCH_RELOAD)
    };

    let resolved = llm_bridge::resolve()?;
    tracing::info!(
        "active pair {} -> {} (port={})",
        resolved.source_api,
        resolved.target_api,
        resolved.port
    );

    let store = MappingStore::open(mappings_path)?;
    log_routes(&store.current(), &resolved);

    if watch {
        wait_for_signals(&store).await?;
    }
    tracing::info!("llm-bridge stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Process variables win over .env entries.
    let dotenv = dotenvy::dotenv();

    env_flags! {
        /// Home directory (absolute). Defaults to $HOME/.llm-bridge
        LLM_BRIDGE_HOME: &str = "";
    }
    let home = bridge_home(*LLM_BRIDGE_HOME);
    let user_cfg = load_user_config(&home).ok().flatten();
    init_tracing(&home, user_cfg.as_ref());

    match dotenv {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring .env: {}", e),
    }

    if let Err(e) = run(user_cfg.as_ref()).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
