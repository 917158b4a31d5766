// ── Coordinator task ──
//
// Runs a Coordinator on its own task, fed by the transport's inbound
// queue. Frames are handled strictly one after another; read-only
// consumers observe the lot through published snapshots.

use std::sync::Arc;

use parklot_radio::{InboundFrame, Transport};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::snapshot::LotSnapshot;

/// Handle to a running coordinator task.
pub struct CoordinatorHandle {
    snapshots: watch::Receiver<Arc<LotSnapshot>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Start the coordinator. Shutdown uses the delivery layer's
    /// cancellation token, so it also aborts a send stuck in retries.
    pub fn spawn<T: Transport>(
        coordinator: Coordinator<T>,
        inbound: mpsc::Receiver<InboundFrame>,
    ) -> Self {
        let (tx, snapshots) = watch::channel(Arc::new(coordinator.snapshot()));
        let cancel = coordinator.delivery().cancel_token().clone();
        let task = tokio::spawn(run(coordinator, inbound, tx, cancel.clone()));
        Self {
            snapshots,
            cancel,
            task,
        }
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<LotSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LotSnapshot>> {
        self.snapshots.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the coordinator and wait for its task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "coordinator task ended abnormally");
        }
    }
}

async fn run<T: Transport>(
    mut coordinator: Coordinator<T>,
    mut inbound: mpsc::Receiver<InboundFrame>,
    snapshots: watch::Sender<Arc<LotSnapshot>>,
    cancel: CancellationToken,
) {
    info!(
        destinations = coordinator.registry().destination_count(),
        spaces = coordinator.registry().space_count(),
        "coordinator running"
    );

    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = inbound.recv() => frame,
        };
        let Some(frame) = frame else {
            debug!("inbound queue closed");
            break;
        };

        let publish = match coordinator.handle_frame(&frame).await {
            Ok(outcome) => outcome.changed_state(),
            Err(CoreError::Delivery(e)) => {
                // The arrival's state changes were applied before sending.
                warn!(error = %e, "arrival flow aborted");
                true
            }
            Err(e) => {
                warn!(source = %frame.source, error = %e, "frame dropped");
                false
            }
        };

        if publish {
            snapshots.send_replace(Arc::new(coordinator.snapshot()));
        }
    }

    snapshots.send_replace(Arc::new(coordinator.snapshot()));
    info!("coordinator stopped");
}
