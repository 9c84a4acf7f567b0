use tokio::sync::watch;

/// Handle used to request cancellation of a run.
///
/// Cloning the handle shares the same cancellation state.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Creates a fresh, not-yet-aborted handle.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Requests cancellation.
    ///
    /// Runs observing the signal stop without yielding further snapshots and
    /// without an error. Calling this more than once is a no-op.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once `abort` has been called.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a signal observing this handle.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of an `AbortHandle`, passed into a run.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        AbortHandle::new().signal()
    }

    /// Returns true if cancellation was requested.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// Never resolves if every handle is dropped without aborting.
    pub async fn aborted(&mut self) {
        let fired = self.rx.wait_for(|aborted| *aborted).await.map(|_| ());
        if fired.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
