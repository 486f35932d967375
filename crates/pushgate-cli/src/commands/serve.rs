// `pushgate serve`: wire options, store, push provider and router, then
// serve until Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use pushgate::AppContext;
use pushgate_axum::Pushgate;
use pushgate_core::env::init_logger;
use pushgate_core::options::PushgateOptions;
use pushgate_core::push::{DisabledPushProvider, PushProvider};
use pushgate_fcm::{FcmProvider, ServiceAccountKey};

pub async fn run() -> anyhow::Result<()> {
    init_logger();

    let options = PushgateOptions::from_env().context("loading configuration")?;
    let port = options.port;

    let adapter = super::open_adapter(&options).await?;
    let push = push_provider(&options);

    let ctx = AppContext::new(options, adapter, push);
    ctx.init().await.context("preparing the store")?;

    let pushgate = Pushgate::new(ctx);
    spawn_rate_limit_cleanup(pushgate.context().clone());

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!(%address, "pushgate listening");

    axum::serve(
        listener,
        pushgate.router().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("pushgate stopped");
    Ok(())
}

/// FCM when a service-account key is configured. A missing or unreadable
/// key leaves push disabled; the rest of the API keeps working.
fn push_provider(options: &PushgateOptions) -> Arc<dyn PushProvider> {
    let provider = ServiceAccountKey::load(&options.push)
        .and_then(|key| key.map(|key| FcmProvider::new(&key)).transpose());

    match provider {
        Ok(Some(fcm)) => {
            tracing::info!("push notifications enabled");
            Arc::new(fcm)
        }
        Ok(None) => {
            tracing::warn!("no Firebase service-account key configured; push notifications disabled");
            Arc::new(DisabledPushProvider)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize Firebase; push notifications disabled");
            Arc::new(DisabledPushProvider)
        }
    }
}

fn spawn_rate_limit_cleanup(ctx: Arc<AppContext>) {
    tokio::spawn(async move {
        let period = ctx.rate_limiter.window().max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            ctx.rate_limiter.cleanup();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl-C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
