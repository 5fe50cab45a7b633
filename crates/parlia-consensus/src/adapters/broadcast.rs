//! Block broadcaster over a tokio channel

use crate::ports::BlockBroadcaster;
use async_trait::async_trait;
use shared_types::BlockHeader;
use tokio::sync::mpsc;

/// Hands sealed headers to whichever task owns the receiving end
/// (typically the block propagation service).
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: mpsc::Sender<BlockHeader>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BlockHeader>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl BlockBroadcaster for ChannelBroadcaster {
    async fn broadcast(&self, header: BlockHeader) -> Result<(), String> {
        self.tx
            .send(header)
            .await
            .map_err(|_| "broadcast channel closed".to_string())
    }
}
