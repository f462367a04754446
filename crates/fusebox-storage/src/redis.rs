//! Networked backend speaking the Redis protocol.

use crate::resp::{encode_command, read_reply, Reply};
use crate::{effective_ttl, RedisSettings, Storage, StorageError, StorageFuture};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

type Connection = BufStream<TcpStream>;

/// A Redis-backed store, shareable across processes and machines.
///
/// The connection is opened lazily on first use and reopened on the next call
/// after any transport or framing failure. Commands are issued one at a time
/// over a single connection.
///
/// Every command is bounded by [`RedisSettings::timeout_ms`], measured from the
/// call: waiting behind other callers for the connection, connecting, and the
/// round trip all count against it. A command that runs out of time fails with
/// [`StorageError::Timeout`] and, if it was on the wire, the connection is
/// discarded, since a late reply would otherwise be read as the answer to the
/// next command.
///
/// Counters rely on the server's native `INCR`, which is atomic across every
/// client sharing the server.
pub struct RedisStorage {
    settings: RedisSettings,
    conn: Mutex<Option<Connection>>,
}

impl RedisStorage {
    /// Creates a client for `host:port` with the default timeout.
    ///
    /// No connection is made until the first operation.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_settings(RedisSettings::new(host, port))
    }

    /// Creates a client from full settings.
    pub fn from_settings(settings: RedisSettings) -> Self {
        Self {
            settings,
            conn: Mutex::new(None),
        }
    }

    /// Returns the settings this client was built with.
    pub fn settings(&self) -> &RedisSettings {
        &self.settings
    }

    async fn command(&self, args: &[&[u8]]) -> Result<Reply, StorageError> {
        let timeout = self.settings.timeout_duration();

        match tokio::time::timeout(timeout, self.exchange(args)).await {
            Ok(result) => result,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(?timeout, "redis command timed out");
                Err(StorageError::Timeout(timeout))
            }
        }
    }

    /// Waits for the connection, then sends one command and reads its reply.
    ///
    /// The connection is owned by this future while the exchange is in
    /// flight and only returned to the slot once a full reply has been read.
    /// Cancelling the future (on timeout) or any transport or framing error
    /// therefore discards it.
    async fn exchange(&self, args: &[&[u8]]) -> Result<Reply, StorageError> {
        let mut slot = self.conn.lock().await;
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => connect(&self.settings).await?,
        };

        match round_trip(&mut conn, args).await {
            Ok(reply) => {
                *slot = Some(conn);
                Ok(reply)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "dropping redis connection");
                Err(err)
            }
        }
    }
}

async fn round_trip(conn: &mut Connection, args: &[&[u8]]) -> Result<Reply, StorageError> {
    conn.write_all(&encode_command(args)).await?;
    conn.flush().await?;
    read_reply(conn).await
}

async fn connect(settings: &RedisSettings) -> Result<Connection, StorageError> {
    let addr = settings.addr();
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| StorageError::Connect {
            addr: addr.clone(),
            source,
        })?;
    stream.set_nodelay(true)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(addr = %addr, "connected to redis");

    Ok(BufStream::new(stream))
}

fn millis(ttl: Duration) -> String {
    ttl.as_millis().max(1).to_string()
}

impl std::fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStorage")
            .field("addr", &self.settings.addr())
            .field("timeout", &self.settings.timeout_duration())
            .finish()
    }
}

impl Storage for RedisStorage {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(async move { self.command(&[b"GET", key.as_bytes()]).await?.into_value() })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool> {
        Box::pin(async move {
            let reply = match effective_ttl(ttl) {
                Some(ttl) => {
                    let ms = millis(ttl);
                    self.command(&[
                        b"SET",
                        key.as_bytes(),
                        value.as_bytes(),
                        b"PX",
                        ms.as_bytes(),
                    ])
                    .await?
                }
                None => {
                    self.command(&[b"SET", key.as_bytes(), value.as_bytes()])
                        .await?
                }
            };
            reply.into_stored()
        })
    }

    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64> {
        Box::pin(async move { self.command(&[b"INCR", key.as_bytes()]).await?.into_integer() })
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool> {
        Box::pin(async move {
            let ms = if ttl.is_zero() {
                String::from("0")
            } else {
                millis(ttl)
            };
            self.command(&[b"PEXPIRE", key.as_bytes(), ms.as_bytes()])
                .await?
                .into_flag()
        })
    }
}
