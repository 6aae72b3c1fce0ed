use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::error::GatewayError;
use crate::gateway::Gateway;

/// How long in-flight requests may run after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Bind the configured listen address and serve until SIGINT or SIGTERM.
pub async fn serve(gateway: Gateway) -> Result<(), GatewayError> {
    let listen = gateway.config().listen().to_string();
    let listener = TcpListener::bind(&listen).await?;
    info!(address = %listen, "Starting server");
    serve_with_shutdown(gateway.router(), listener, shutdown_signal(), SHUTDOWN_GRACE).await
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// After the signal the listener stops accepting; connections still open
/// after `grace` are abandoned.
pub async fn serve_with_shutdown<F>(
    router: Router,
    listener: TcpListener,
    shutdown: F,
    grace: Duration,
) -> Result<(), GatewayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => return flatten(result),
        _ = shutdown => {}
    }

    info!("Shutdown signal received, starting graceful shutdown");
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => {
            flatten(result)?;
            info!("Server stopped");
            Ok(())
        }
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "Grace period elapsed, abandoning in-flight requests");
            server.abort();
            Ok(())
        }
    }
}

fn flatten(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), GatewayError> {
    match result {
        Ok(served) => served.map_err(GatewayError::Io),
        Err(join) => Err(GatewayError::Io(std::io::Error::other(join))),
    }
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
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
