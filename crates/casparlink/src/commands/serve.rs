//! `casparlink serve`: run the device session and the HTTP surface until
//! interrupted.

use std::sync::Arc;

use casparlink_config::Config;
use casparlink_core::{ConfigStore, JsonFileStore, Manager, MemoryStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{GlobalOpts, ServeArgs};
use crate::error::CliError;
use crate::{config, http};

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load(global)?;
    apply_overrides(&mut cfg, &args);

    let manager_config = cfg.to_manager_config()?;
    let bind = cfg.bind_addr()?;

    let store: Arc<dyn ConfigStore> = if args.ephemeral {
        info!("routing config is in-memory only");
        Arc::new(MemoryStore::new())
    } else {
        let path = cfg.store_path();
        let store = JsonFileStore::open(&path)?;
        info!(path = %path.display(), "routing config loaded");
        Arc::new(store)
    };

    let listener = TcpListener::bind(bind).await.map_err(|source| CliError::Bind {
        addr: bind.to_string(),
        source,
    })?;

    let manager = Manager::new(manager_config, store);
    manager.start().await;

    let shutdown = CancellationToken::new();
    let app = http::router(manager.clone(), shutdown.clone());

    info!(%bind, device = %manager.health().device, "casparlink ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    manager.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

fn apply_overrides(cfg: &mut Config, args: &ServeArgs) {
    if let Some(ref bind) = args.bind {
        cfg.server.bind.clone_from(bind);
    }
    if let Some(ref host) = args.device_host {
        cfg.device.host.clone_from(host);
    }
    if let Some(port) = args.device_port {
        cfg.device.port = port;
    }
    if let Some(ref path) = args.store {
        cfg.store.path = Some(path.clone());
    }
}

/// Resolve on SIGINT or SIGTERM. Cancels `token` first so open event
/// streams end and the server can drain.
async fn shutdown_signal(token: CancellationToken) {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
    token.cancel();
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn flags_override_the_file() {
        let mut cfg = Config::default();
        let args = ServeArgs {
            bind: Some("127.0.0.1:9000".into()),
            device_host: Some("playout-2".into()),
            device_port: Some(5251),
            store: Some(PathBuf::from("/tmp/routing.json")),
            ephemeral: false,
        };

        apply_overrides(&mut cfg, &args);

        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.device.host, "playout-2");
        assert_eq!(cfg.device.port, 5251);
        assert_eq!(cfg.store_path(), PathBuf::from("/tmp/routing.json"));
    }

    #[test]
    fn absent_flags_leave_the_file_alone() {
        let mut cfg = Config::default();
        let args = ServeArgs {
            bind: None,
            device_host: None,
            device_port: None,
            store: None,
            ephemeral: true,
        };

        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg, Config::default());
    }
}
