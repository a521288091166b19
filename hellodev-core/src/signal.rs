// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Session signals.
//!
//! A [`SignalSource`] is held by whoever may cancel a session (a Ctrl-C
//! handler, a supervisor, a test). Each session carries a cheap
//! [`SessionSignal`] clone, which the buffered channel races against its lock
//! wait. Waiting for the lock is the only point where a signal is observed.

use tokio::sync::watch;

/// Controller that raises the signal for every subscribed session.
#[derive(Debug)]
pub struct SignalSource {
    tx: watch::Sender<bool>,
}

impl SignalSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Hand out a signal handle for a session.
    pub fn signal(&self) -> SessionSignal {
        SessionSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Raise the signal. Sessions blocked on the buffer lock return
    /// `Interrupted`; later lock waits are interrupted as well.
    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for SignalSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session view of a [`SignalSource`].
#[derive(Debug, Clone)]
pub struct SessionSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl SessionSignal {
    /// A signal that is never raised.
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_raised(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once the signal is raised. Never resolves for [`Self::none`]
    /// or when the source is dropped without raising.
    pub async fn raised(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };

        let mut rx = rx.clone();
        let raised = rx.wait_for(|raised| *raised).await.is_ok();
        if !raised {
            // Source dropped without raising.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_raise_is_visible_to_all_sessions() {
        let source = SignalSource::new();
        let a = source.signal();
        let b = a.clone();
        assert!(!a.is_raised());

        source.raise();
        assert!(a.is_raised());
        assert!(b.is_raised());
        assert!(source.is_raised());
    }

    #[tokio::test]
    async fn test_raised_resolves_after_raise() {
        let source = SignalSource::new();
        let signal = source.signal();

        let waiter = tokio::spawn(async move { signal.raised().await });
        source.raise();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal not delivered")
            .unwrap();
    }

    #[tokio::test]
    async fn test_none_never_resolves() {
        let signal = SessionSignal::none();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.raised()).await;
        assert!(waited.is_err());
    }
}
