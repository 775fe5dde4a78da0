use async_trait::async_trait;
use floodmesh::mesh::MeshMessage;
use floodmesh::transport::{InboundSink, LocalTransport, Transport, TransportResult};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drops each inbound frame independently with probability `loss_rate`
pub struct LossyTransport {
    inner: LocalTransport,
    loss_rate: f64,
    rng: Arc<Mutex<StdRng>>,
    dropped: Arc<AtomicU64>,
}

impl LossyTransport {
    pub fn new(inner: LocalTransport, loss_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            loss_rate: loss_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    #[allow(dead_code)]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for LossyTransport {
    fn name(&self) -> &'static str {
        "lossy"
    }

    async fn broadcast(&self, message: &MeshMessage) {
        self.inner.broadcast(message).await;
    }

    async fn on_receive(&self, sink: InboundSink) -> TransportResult<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.inner.on_receive(tx).await?;

        let loss_rate = self.loss_rate;
        let rng = self.rng.clone();
        let dropped = self.dropped.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if rng.lock().gen_bool(loss_rate) {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                if sink.send(message).is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn detach(&self) {
        self.inner.detach().await;
    }
}
