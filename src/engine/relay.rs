//! Flood-fill relay engine
//!
//! Every accepted message is stored, delivered to the UI once, and
//! re-broadcast with one less hop of budget until the budget runs out. The
//! seen-set stops a node from processing the same id twice and the `via`
//! list stops a node from forwarding a message it already carried.

use crate::engine::error::{RelayError, RelayResult};
use crate::engine::identity::IdentityManager;
use crate::engine::peers::{PeerInfo, PeerTable};
use crate::engine::seen::SeenSet;
use crate::engine::types::{MeshConfig, MeshStatus, MessageCallback, RelayStats};
use crate::mesh::{
    alert_payload, location_payload, sos_payload, MeshMessage, MessageType, NodeIdentity,
};
use crate::metrics::recorder;
use crate::store::{LocalStore, MemoryStore};
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// What `receive` did with an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// New message, stored and delivered
    Accepted { relayed: bool },

    /// Id already processed
    Duplicate,

    /// Failed validation
    Malformed,
}

/// A mesh relay node
pub struct MeshRelay {
    core: Arc<RelayCore>,

    /// Inbound processing task, present while started
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

struct RelayCore {
    config: MeshConfig,
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn Transport>,
    identity: IdentityManager,
    state: Mutex<RelayState>,
    stats: RelayStatsInner,
    active: AtomicBool,
}

/// Engine state serialized behind one lock
struct RelayState {
    seen: SeenSet,
    peers: PeerTable,
    callback: Option<MessageCallback>,
}

#[derive(Default)]
struct RelayStatsInner {
    originated: AtomicU64,
    received: AtomicU64,
    relayed: AtomicU64,
    duplicates: AtomicU64,
    malformed: AtomicU64,
    delivered: AtomicU64,
}

impl RelayCore {
    async fn originate(
        &self,
        payload: String,
        message_type: MessageType,
        channel_id: &str,
    ) -> MeshMessage {
        let identity = self.identity.get_or_create().await;
        let message = MeshMessage::originate(
            &identity,
            payload,
            message_type,
            channel_id,
            self.config.max_ttl,
        );

        let mut state = self.state.lock().await;
        state.seen.insert(&message.id);

        self.store.append_message(&message).await;
        self.transport.broadcast(&message).await;
        self.deliver(&state, &message);
        drop(state);

        self.stats.originated.fetch_add(1, Ordering::Relaxed);
        recorder::record_originated(message_type);
        tracing::debug!(
            "Originated {} {} on {} (ttl {})",
            message_type,
            message.id,
            message.channel_id,
            message.ttl
        );

        message
    }

    async fn receive(&self, message: MeshMessage) -> ReceiveOutcome {
        if let Err(e) = message.validate() {
            self.stats.malformed.fetch_add(1, Ordering::Relaxed);
            recorder::record_malformed();
            tracing::debug!("Dropping malformed message {:?}: {}", message.id, e);
            return ReceiveOutcome::Malformed;
        }

        let identity = self.identity.get_or_create().await;
        let mut state = self.state.lock().await;

        if !state.seen.insert(&message.id) {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            recorder::record_duplicate();
            tracing::trace!("Discarding duplicate {}", message.id);
            return ReceiveOutcome::Duplicate;
        }

        self.stats.received.fetch_add(1, Ordering::Relaxed);
        recorder::record_received(message.message_type, message.hops);

        if message.sender_id != identity.node_id {
            state.peers.observe(&message, self.transport.name());
            recorder::set_peer_count(state.peers.active_count(self.config.peer_timeout));
        }

        let relayed = message.can_relay(&identity.node_id);
        if relayed {
            let copy = message.relay_copy(&identity.node_id);
            self.transport.broadcast(&copy).await;
            self.stats.relayed.fetch_add(1, Ordering::Relaxed);
            recorder::record_relayed();
            tracing::debug!(
                "Relayed {} from {} (ttl {}, hops {})",
                copy.id,
                copy.sender_id,
                copy.ttl,
                copy.hops
            );
        }

        self.store.append_message(&message).await;
        self.deliver(&state, &message);

        ReceiveOutcome::Accepted { relayed }
    }

    fn deliver(&self, state: &RelayState, message: &MeshMessage) {
        if let Some(callback) = state.callback.as_ref() {
            callback(message);
            self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            recorder::record_delivered();
        }
    }

    /// Join announcement with ttl 1; neighbours forward it one more hop with ttl 0
    async fn announce(&self, identity: &NodeIdentity) {
        let presence = MeshMessage::presence(identity, self.config.default_channel.as_str());
        self.state.lock().await.seen.insert(&presence.id);
        self.transport.broadcast(&presence).await;
        tracing::debug!("Announced presence of {}", identity.node_id);
    }

    fn stats(&self) -> RelayStats {
        RelayStats {
            originated: self.stats.originated.load(Ordering::Relaxed),
            received: self.stats.received.load(Ordering::Relaxed),
            relayed: self.stats.relayed.load(Ordering::Relaxed),
            duplicates: self.stats.duplicates.load(Ordering::Relaxed),
            malformed: self.stats.malformed.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
        }
    }
}

impl MeshRelay {
    pub fn builder() -> MeshRelayBuilder {
        MeshRelayBuilder::new()
    }

    /// Resolve the identity, replay the default channel's history through
    /// `on_message` and start processing inbound frames
    pub async fn start(&self, on_message: MessageCallback) -> RelayResult<MeshStatus> {
        let identity = self.core.identity.get_or_create().await;

        if self.is_active() {
            self.core.state.lock().await.callback = Some(on_message);
            return Ok(self.status().await);
        }

        let history = self
            .core
            .store
            .load_history(&self.core.config.default_channel)
            .await;
        {
            let mut state = self.core.state.lock().await;
            for message in &history {
                state.seen.insert(&message.id);
                on_message(message);
            }
            state.callback = Some(on_message);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Err(e) = self.core.transport.on_receive(tx).await {
            self.core.state.lock().await.callback = None;
            return Err(e.into());
        }

        let core = self.core.clone();
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                core.receive(message).await;
            }
            tracing::debug!("Inbound channel closed");
        });
        if let Some(previous) = self.worker.lock().replace(handle) {
            previous.abort();
        }

        self.core.active.store(true, Ordering::SeqCst);
        recorder::set_relay_active(true);

        if self.core.config.announce_presence {
            self.core.announce(&identity).await;
        }

        tracing::info!(
            "Mesh relay started as {} ({}) on {}, replayed {} messages",
            identity.node_id,
            identity.nickname,
            self.core.transport.name(),
            history.len()
        );

        Ok(self.status().await)
    }

    /// Detach from the transport and stop delivering. History and identity
    /// are kept; the relay can be started again.
    pub async fn stop(&self) {
        self.core.transport.detach().await;
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
        self.core.state.lock().await.callback = None;

        if self.core.active.swap(false, Ordering::SeqCst) {
            recorder::set_relay_active(false);
            tracing::info!("Mesh relay stopped");
        }
    }

    /// Originate a message on `channel_id`
    pub async fn originate(
        &self,
        payload: impl Into<String>,
        message_type: MessageType,
        channel_id: &str,
    ) -> MeshMessage {
        self.core
            .originate(payload.into(), message_type, channel_id)
            .await
    }

    /// Process one inbound message
    pub async fn receive(&self, message: MeshMessage) -> ReceiveOutcome {
        self.core.receive(message).await
    }

    pub async fn send_text(&self, text: &str) -> MeshMessage {
        self.originate(text, MessageType::Text, &self.core.config.default_channel)
            .await
    }

    pub async fn send_sos(&self, location: &str) -> MeshMessage {
        self.originate(
            sos_payload(location),
            MessageType::Sos,
            &self.core.config.default_channel,
        )
        .await
    }

    pub async fn send_alert(&self, text: &str) -> MeshMessage {
        self.originate(
            alert_payload(text),
            MessageType::Alert,
            &self.core.config.default_channel,
        )
        .await
    }

    pub async fn send_location(&self, lat: f64, lon: f64) -> RelayResult<MeshMessage> {
        let payload = location_payload(lat, lon)?;
        Ok(self
            .originate(payload, MessageType::Location, &self.core.config.default_channel)
            .await)
    }

    /// Stored messages of `channel_id`, oldest first
    pub async fn history(&self, channel_id: &str) -> Vec<MeshMessage> {
        self.core.store.load_history(channel_id).await
    }

    pub async fn status(&self) -> MeshStatus {
        let identity = self.core.identity.get_or_create().await;
        let peer_count = self
            .core
            .state
            .lock()
            .await
            .peers
            .active_count(self.core.config.peer_timeout);

        MeshStatus {
            node_id: identity.node_id,
            nickname: identity.nickname,
            active: self.is_active(),
            peer_count,
            messages_relayed: self.core.stats.relayed.load(Ordering::Relaxed),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.core.stats()
    }

    /// Known peers, most recently heard first
    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.core.state.lock().await.peers.list()
    }

    pub async fn identity(&self) -> NodeIdentity {
        self.core.identity.get_or_create().await
    }

    /// Rename this node; a running relay re-announces itself so peers
    /// pick up the new name
    pub async fn set_nickname(&self, name: &str) -> RelayResult<NodeIdentity> {
        let identity = self.core.identity.set_nickname(name).await?;
        tracing::info!("Nickname changed to {}", identity.nickname);

        if self.is_active() && self.core.config.announce_presence {
            self.core.announce(&identity).await;
        }
        Ok(identity)
    }

    pub fn is_active(&self) -> bool {
        self.core.active.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &MeshConfig {
        &self.core.config
    }
}

impl Drop for MeshRelay {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
    }
}

/// Builder for mesh relays
pub struct MeshRelayBuilder {
    config: MeshConfig,
    store: Option<Arc<dyn LocalStore>>,
    transport: Option<Arc<dyn Transport>>,
    identity: Option<NodeIdentity>,
}

impl MeshRelayBuilder {
    pub fn new() -> Self {
        Self {
            config: MeshConfig::default(),
            store: None,
            transport: None,
            identity: None,
        }
    }

    pub fn config(mut self, config: MeshConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to a [`MemoryStore`] bounded at `history_limit`
    pub fn store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Identity to use when the store has none
    pub fn identity(mut self, identity: NodeIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn max_ttl(mut self, ttl: u8) -> Self {
        self.config.max_ttl = ttl;
        self
    }

    pub fn default_channel(mut self, channel: impl Into<String>) -> Self {
        self.config.default_channel = channel.into();
        self
    }

    pub fn seen_capacity(mut self, capacity: usize) -> Self {
        self.config.seen_capacity = capacity;
        self
    }

    pub fn announce_presence(mut self, enabled: bool) -> Self {
        self.config.announce_presence = enabled;
        self
    }

    pub fn peer_timeout(mut self, timeout: Duration) -> Self {
        self.config.peer_timeout = timeout;
        self
    }

    pub fn build(self) -> RelayResult<MeshRelay> {
        let transport = self
            .transport
            .ok_or_else(|| RelayError::InvalidConfig("a transport is required".into()))?;

        if self.config.seen_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "seen_capacity must be positive".into(),
            ));
        }
        if self.config.default_channel.trim().is_empty() {
            return Err(RelayError::InvalidConfig(
                "default_channel must not be empty".into(),
            ));
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::with_limit(self.config.history_limit)));

        let identity = match self.identity {
            Some(preset) => IdentityManager::with_preset(store.clone(), preset),
            None => IdentityManager::new(store.clone()),
        };

        Ok(MeshRelay {
            core: Arc::new(RelayCore {
                state: Mutex::new(RelayState {
                    seen: SeenSet::new(self.config.seen_capacity),
                    peers: PeerTable::new(),
                    callback: None,
                }),
                config: self.config,
                store,
                transport,
                identity,
                stats: RelayStatsInner::default(),
                active: AtomicBool::new(false),
            }),
            worker: parking_lot::Mutex::new(None),
        })
    }
}

impl Default for MeshRelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
