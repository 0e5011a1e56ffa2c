//! Identity provider seam
//!
//! Authentication itself is an external collaborator; the engine only
//! needs the current identity and a way to observe changes. Changing
//! identity resets the approval resolver.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Identity source abstraction
pub trait IdentityProvider: Send + Sync {
    /// Currently authenticated identity, if any
    fn current(&self) -> Option<Identity>;

    /// Watch channel pushed on every identity change
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}

/// Process-local identity provider (dev and tests)
pub struct StaticIdentity {
    tx: watch::Sender<Option<Identity>>,
}

impl StaticIdentity {
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current identity (None = signed out)
    pub fn set(&self, identity: Option<Identity>) {
        // send_replace never fails even with no active receivers
        self.tx.send_replace(identity);
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}
