//! Redis pub/sub change feed
//!
//! SUBSCRIBE requires a dedicated connection, so each `subscribe` call opens
//! a fresh pub/sub connection and pumps its messages into an in-process
//! channel. Health pings go over a separate managed connection that
//! reconnects on its own.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::error::BrokerError;
use crate::events::ChangeFeed;

/// Capacity of the in-process message channel per subscription
const FEED_BUFFER: usize = 64;

/// Change feed backed by a Redis pub/sub channel
pub struct RedisChangeFeed {
    client: redis::Client,
    ping_conn: Mutex<Option<ConnectionManager>>,
}

impl RedisChangeFeed {
    pub fn new(url: &str) -> Result<Self, BrokerError> {
        let client =
            redis::Client::open(url).map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            ping_conn: Mutex::new(None),
        })
    }
}

#[async_trait]
impl ChangeFeed for RedisChangeFeed {
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BrokerError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;

        info!(channel, "Subscribed to policy change channel");

        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let channel = channel.to_string();

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                match msg.get_payload::<String>() {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            debug!(channel = %channel, "Change feed receiver dropped, stopping pump");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "Failed to read change message payload");
                    }
                }
            }
            // Sender drops here; the receiver observes the subscription end.
            debug!(channel = %channel, "Redis pub/sub stream closed");
        });

        Ok(rx)
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let mut guard = self.ping_conn.lock().await;

        if guard.is_none() {
            let conn = ConnectionManager::new(self.client.clone())
                .await
                .map_err(|e| BrokerError::Connection(e.to_string()))?;
            *guard = Some(conn);
        }

        let Some(conn) = guard.as_mut() else {
            return Err(BrokerError::Ping("no broker connection".to_string()));
        };

        redis::cmd("PING")
            .query_async::<String>(conn)
            .await
            .map(|_| ())
            .map_err(|e| BrokerError::Ping(e.to_string()))
    }
}
