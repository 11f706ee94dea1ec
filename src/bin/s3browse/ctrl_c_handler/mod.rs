// Waits for either request cancellation or a Ctrl+C signal.
//
// Ctrl+C cancels the request token. A request still waiting on the store
// ends as cancelled; a page already listed is printed with the content
// types fetched so far.

use s3browse_rs::RequestCancellationToken;
use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, warn};

pub fn spawn_ctrl_c_handler(cancellation_token: RequestCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancellation_token.cancelled() => {
                debug!("cancellation_token canceled.")
            }
            _ = signal::ctrl_c() => {
                warn!("ctrl-c received, cancelling the request.");
                cancellation_token.cancel();
            }
        }
    })
}
