//! Sync progress reporting

/// Handle of a sync event in the progress UI
pub type TransferId = u32;

/// How a reported transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Finished,
    Interrupted,
}

/// Progress UI showing running sync actions.
pub trait TransferReporter {
    /// Register a sync event for an account. `None` when the UI refused it.
    fn create_sync_event(&mut self, account_name: &str, icon: Option<&str>) -> Option<TransferId>;

    fn start_transfer(&mut self, id: TransferId);

    /// `progress` is a fraction in `0.0..=1.0`
    fn update_progress(&mut self, id: TransferId, progress: f64);

    fn finish_transfer(&mut self, id: TransferId, outcome: TransferOutcome, message: Option<&str>);
}

/// Reporter that writes transfers to the log
#[derive(Debug, Default)]
pub struct LogTransfers {
    next_id: TransferId,
}

impl LogTransfers {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferReporter for LogTransfers {
    fn create_sync_event(&mut self, account_name: &str, icon: Option<&str>) -> Option<TransferId> {
        self.next_id += 1;
        tracing::info!(
            transfer = self.next_id,
            account = %account_name,
            icon = icon.unwrap_or(""),
            "sync event created"
        );
        Some(self.next_id)
    }

    fn start_transfer(&mut self, id: TransferId) {
        tracing::info!(transfer = id, "sync started");
    }

    fn update_progress(&mut self, id: TransferId, progress: f64) {
        tracing::debug!(transfer = id, progress = progress * 100.0, "sync progress");
    }

    fn finish_transfer(&mut self, id: TransferId, outcome: TransferOutcome, message: Option<&str>) {
        match outcome {
            TransferOutcome::Finished => tracing::info!(transfer = id, "sync finished"),
            TransferOutcome::Interrupted => tracing::warn!(
                transfer = id,
                reason = message.unwrap_or(""),
                "sync interrupted"
            ),
        }
    }
}
