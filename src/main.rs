mod api;
mod app_state;
mod core;
mod debug;
mod domain;
mod errors;
mod routes;
mod scheduler;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app_state::build_app_state;
use crate::core::client::kube_client::build_kube_client;
use crate::core::client::pods::KubePodLister;
use crate::core::client::proxy_admin_client::build_admin_client;
use crate::core::crd::cluster_maid::ControllingResource;
use crate::core::crd::controlling_resource::{
    ControllingResourceSource, KubeControllingResourceSource, StaticControllingResourceSource,
};
use crate::core::logging::init_tracing;
use crate::core::output::sink::StdoutSink;
use crate::core::settings::{RunMode, Settings};
use crate::core::state::runtime::reconcile::reconcile_runtime_state_repository::ReconcileRuntimeStateRepository;
use crate::core::state::runtime::reconcile::ReconcileStateManager;
use crate::routes::app_router;
use crate::scheduler::tasks::reconcile::controller::{run_controller, ControllerContext};
use crate::scheduler::tasks::reconcile::loop_runner::ReconciliationLoop;
use crate::scheduler::tasks::reconcile::task::PassContext;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, then settings
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    // 2. Logging
    let _log_guard = init_tracing(settings.log_dir.as_deref())?;
    info!("🚀 Starting clustermaid-core in {:?} mode", settings.mode);

    // 3. Offline debug render, no cluster needed
    if let Some(debug) = &settings.debug {
        return debug::run_debug(debug).await;
    }

    // 4. Capabilities shared by passes and the HTTP API
    let client = build_kube_client().await?;
    let admin = build_admin_client(
        client.clone(),
        settings.admin_transport,
        settings.admin_port,
        settings.admin_timeout,
    )?;
    let reconcile_state = Arc::new(ReconcileStateManager::new(
        ReconcileRuntimeStateRepository::new().shared(),
    ));
    let retry = settings.retry_policy();

    let pass = PassContext {
        pods: Arc::new(KubePodLister::new(client.clone(), settings.sidecar_container.clone())),
        admin: admin.clone(),
        sink: Arc::new(StdoutSink),
        max_concurrency: settings.max_concurrency,
        retry: retry.clone(),
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received, abandoning in-flight passes");
            cancel.cancel();
        }
    });

    // 5. Operator HTTP API
    let server = if settings.http_enabled {
        let listener = tokio::net::TcpListener::bind(settings.http_addr)
            .await
            .with_context(|| format!("cannot bind {}", settings.http_addr))?;
        info!("Listening on http://{}", settings.http_addr);

        let app = app_router().with_state(build_app_state(admin, reconcile_state.clone(), retry));
        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }))
    } else {
        None
    };

    // 6. Reconciliation
    match settings.mode {
        RunMode::Controller => {
            let ctx = Arc::new(ControllerContext {
                pass,
                state: reconcile_state,
                fallback_interval: settings.requeue_interval,
                cancel: cancel.clone(),
            });
            run_controller(client, ctx).await?;
        }
        RunMode::Standalone => {
            let (source, key): (Arc<dyn ControllingResourceSource>, String) = match &settings.resource_name {
                Some(name) => (
                    Arc::new(KubeControllingResourceSource::new(
                        client,
                        &settings.resource_namespace,
                        name,
                        settings.requeue_interval,
                    )),
                    format!("{}/{}", settings.resource_namespace, name),
                ),
                None => (
                    Arc::new(StaticControllingResourceSource::new(ControllingResource::fallback(
                        "standalone",
                        Some(settings.fallback_namespace()),
                        settings.requeue_interval,
                    ))),
                    "standalone".to_string(),
                ),
            };
            ReconciliationLoop::new(pass, source, reconcile_state, key, settings.requeue_interval)
                .run(cancel.clone())
                .await;
        }
    }

    cancel.cancel();
    if let Some(server) = server {
        if let Err(e) = server.await? {
            error!(error = %e, "HTTP server failed");
        }
    }

    info!("clustermaid-core stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
