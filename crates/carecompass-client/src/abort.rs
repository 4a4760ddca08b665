use tokio::sync::watch;

/// Owner side of a cancellation pair
///
/// Dropping the handle without calling [`AbortHandle::abort`] leaves the
/// signals un-aborted forever.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Returns true if this call flipped the state
    pub fn abort(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side, cheap to clone and hand to transports
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the paired handle aborts. Stays pending otherwise.
    pub async fn aborted(&self) {
        let Some(rx) = &self.rx else {
            return futures::future::pending().await;
        };

        let mut rx = rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            // Handle dropped without aborting
            futures::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_abort_wakes_waiter() {
        let handle = AbortHandle::new();
        let signal = handle.signal();

        let waiter = tokio::spawn(async move { signal.aborted().await });
        assert!(handle.abort());

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_signal_taken_after_abort_is_already_aborted() {
        let handle = AbortHandle::new();
        handle.abort();

        let signal = handle.signal();
        assert!(signal.is_aborted());
        tokio::time::timeout(Duration::from_millis(100), signal.aborted())
            .await
            .expect("already aborted");
    }

    #[test]
    fn test_second_abort_reports_no_change() {
        let handle = AbortHandle::new();
        assert!(handle.abort());
        assert!(!handle.abort());
        assert!(handle.is_aborted());
    }

    #[tokio::test]
    async fn test_never_and_dropped_handle_stay_pending() {
        let never = AbortSignal::never();
        assert!(!never.is_aborted());
        assert!(tokio::time::timeout(Duration::from_millis(20), never.aborted())
            .await
            .is_err());

        let signal = AbortHandle::new().signal();
        assert!(tokio::time::timeout(Duration::from_millis(20), signal.aborted())
            .await
            .is_err());
    }
}
