use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancels `cancelation` on Ctrl-C. Returns early when the token is cancelled some other way so
/// the listener doesn't outlive the loop it guards.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            debug!("Received Ctrl-C");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
