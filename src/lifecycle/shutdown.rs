//! Shutdown coordination for the balancer.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Every long-running task (the listener and each health prober) holds its
/// own receiver; a single `trigger` reaches all of them.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Receivers subscribed later will not see it.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve once `trigger` has been called.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_reaches_every_waiter() {
        let shutdown = Shutdown::new();
        let first = tokio::spawn(shutdown.wait());
        let second = tokio::spawn(shutdown.wait());
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await
        .unwrap();
    }
}
