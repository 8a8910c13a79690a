use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `cancellation` on Ctrl-C. Returns early when something else cancels it first, e.g. the
/// session loop finishing on its own.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => (),
    };
}
