use crate::appctl::{AppCtl, Response};
use crate::classy::Classy;
use crate::senti::Score;
use crate::RX_TIMEOUT;

use crossbeam_channel::RecvTimeoutError;
use scopeguard::defer_on_unwind;

use log::*;

/// Serves classification requests until the app stops.
pub fn start_analyzer<S: Score>(appctl: &AppCtl, classy: &Classy<S>) {
    defer_on_unwind! { appctl.stop() }
    let get_request = appctl.listen_requests();
    debug!("Analyzer: Ready");
    appctl.set_ready(true);

    while appctl.is_alive() {
        match get_request.recv_timeout(RX_TIMEOUT) {
            Ok(request) => {
                debug!(
                    "Analyzer: Request {} with {} input(s) at threshold {:.2}",
                    request.id,
                    request.inputs.len(),
                    request.threshold
                );
                let outcomes = classy.classify_all(&request.inputs, request.threshold);
                for outcome in outcomes.iter().filter_map(|i| i.as_ref().err()) {
                    warn!("Analyzer: {}", outcome);
                }
                appctl.broadcast_response(Response {
                    id: request.id,
                    outcomes,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                appctl.stop();
                error!("Request channel dropped.");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                continue;
            }
        }
    }

    appctl.set_ready(false);
    debug!("Analyzer: Shutting down");
}
