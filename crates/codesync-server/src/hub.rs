//! The collaboration hub: session-keyed peer registries and broadcast.
//!
//! Sessions are created implicitly on first join and garbage-collected
//! when the last peer leaves. Each session carries its own lock, so
//! broadcasts in unrelated sessions never contend; the outer map is only
//! write-locked for the brief join/leave bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

pub type PeerId = Uuid;

/// Join refusal: the session already holds the maximum number of peers.
#[derive(Debug, Error)]
#[error("session '{session}' is full ({limit} peers)")]
pub struct SessionFull {
    session: String,
    limit: usize,
}

struct Peer {
    id: PeerId,
    sender: mpsc::UnboundedSender<String>,
}

struct SessionState {
    peers: Mutex<Vec<Peer>>,
}

pub struct CollaborationHub {
    sessions: RwLock<HashMap<String, Arc<SessionState>>>,
    max_peers_per_session: usize,
}

impl CollaborationHub {
    pub fn new(max_peers_per_session: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            // A cap below one would leak an empty session on every join.
            max_peers_per_session: max_peers_per_session.max(1),
        }
    }

    /// Register a connection under `session_key` and return its peer id.
    ///
    /// The sender is the peer's outbound channel; once joined, the peer
    /// receives every broadcast for the session until it leaves.
    pub async fn join(
        &self,
        session_key: &str,
        sender: mpsc::UnboundedSender<String>,
    ) -> std::result::Result<PeerId, SessionFull> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_key.to_string())
            .or_insert_with(|| {
                Arc::new(SessionState {
                    peers: Mutex::new(Vec::new()),
                })
            })
            .clone();

        // Registered under the outer write lock so a concurrent leave
        // cannot garbage-collect the session out from under this peer.
        let mut peers = session.peers.lock().await;
        if peers.len() >= self.max_peers_per_session {
            return Err(SessionFull {
                session: session_key.to_string(),
                limit: self.max_peers_per_session,
            });
        }
        let id = Uuid::new_v4();
        peers.push(Peer { id, sender });
        Ok(id)
    }

    /// Remove a peer from a session. Idempotent: removing an absent peer
    /// is a no-op. The session itself is dropped once empty.
    pub async fn leave(&self, session_key: &str, peer_id: PeerId) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(session_key) {
            let mut peers = session.peers.lock().await;
            peers.retain(|peer| peer.id != peer_id);
            let empty = peers.is_empty();
            drop(peers);
            if empty {
                sessions.remove(session_key);
            }
        }
    }

    /// Deliver `message` to every peer in the session except `from`.
    ///
    /// Delivery attempts are independent: a stale peer whose channel is
    /// gone is skipped, never aborting the rest of the fan-out.
    pub async fn broadcast(&self, session_key: &str, from: PeerId, message: &str) {
        let session = {
            let sessions = self.sessions.read().await;
            match sessions.get(session_key) {
                Some(session) => session.clone(),
                None => return,
            }
        };

        let recipients: Vec<mpsc::UnboundedSender<String>> = {
            let peers = session.peers.lock().await;
            peers
                .iter()
                .filter(|peer| peer.id != from)
                .map(|peer| peer.sender.clone())
                .collect()
        };

        for recipient in recipients {
            if recipient.send(message.to_string()).is_err() {
                log::debug!("dropping broadcast to a disconnected peer in '{}'", session_key);
            }
        }
    }

    /// Number of peers currently registered under `session_key`.
    pub async fn peer_count(&self, session_key: &str) -> usize {
        let sessions = self.sessions.read().await;
        match sessions.get(session_key) {
            Some(session) => session.peers.lock().await.len(),
            None => 0,
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
