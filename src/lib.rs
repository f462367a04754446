//! Shared fixtures for the fusebox integration tests, property tests and benches.
//!
//! - [`RecordingStorage`] wraps any backend and records every call, so tests
//!   can assert exactly which writes a breaker issued.
//! - [`FaultyStorage`] fails every call while switched on.
//! - [`FakeRedis`] is an in-process server speaking enough of the Redis
//!   protocol (`GET`, `SET .. [PX ms]`, `INCR`, `PEXPIRE`) to drive
//!   [`RedisStorage`](fusebox_storage::RedisStorage) end to end.

use fusebox_storage::{MemoryStorage, RedisSettings, Storage, StorageError, StorageFuture};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A storage call observed by [`RecordingStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Get(String),
    Set(String, String, Option<Duration>),
    Increment(String),
    Expire(String, Duration),
}

/// Forwards to an inner backend and records every call.
#[derive(Debug, Default)]
pub struct RecordingStorage<S = MemoryStorage> {
    inner: S,
    ops: Mutex<Vec<Op>>,
}

impl<S> RecordingStorage<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns every recorded call in order.
    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    /// Returns the `(key, value)` of every `set`, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Set(key, value, _) => Some((key, value)),
                _ => None,
            })
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

impl<S: Storage> Storage for RecordingStorage<S> {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        self.record(Op::Get(key.to_owned()));
        self.inner.get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool> {
        self.record(Op::Set(key.to_owned(), value.to_owned(), ttl));
        self.inner.set(key, value, ttl)
    }

    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64> {
        self.record(Op::Increment(key.to_owned()));
        self.inner.increment(key)
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool> {
        self.record(Op::Expire(key.to_owned(), ttl));
        self.inner.expire(key, ttl)
    }
}

/// Forwards to an inner backend, or fails every call while switched on.
#[derive(Debug, Default)]
pub struct FaultyStorage<S = MemoryStorage> {
    inner: S,
    failing: AtomicBool,
}

impl<S> FaultyStorage<S> {
    /// Wraps `inner`, initially healthy.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    /// Switches failure injection on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn outage<'a, T: Send + 'a>(&self) -> Option<StorageFuture<'a, T>> {
        self.failing.load(Ordering::SeqCst).then(|| {
            Box::pin(async {
                Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "injected outage",
                )))
            }) as StorageFuture<'a, T>
        })
    }
}

impl<S: Storage> Storage for FaultyStorage<S> {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        self.outage().unwrap_or_else(|| self.inner.get(key))
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StorageFuture<'a, bool> {
        self.outage()
            .unwrap_or_else(|| self.inner.set(key, value, ttl))
    }

    fn increment<'a>(&'a self, key: &'a str) -> StorageFuture<'a, i64> {
        self.outage().unwrap_or_else(|| self.inner.increment(key))
    }

    fn expire<'a>(&'a self, key: &'a str, ttl: Duration) -> StorageFuture<'a, bool> {
        self.outage().unwrap_or_else(|| self.inner.expire(key, ttl))
    }
}

/// An in-process Redis stand-in listening on an ephemeral local port.
///
/// Data lives in a [`MemoryStorage`], reachable through [`FakeRedis::store`].
/// Every received command is recorded. The server stops when dropped.
pub struct FakeRedis {
    addr: SocketAddr,
    store: MemoryStorage,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    accept_loop: JoinHandle<()>,
}

impl FakeRedis {
    /// Binds to `127.0.0.1:0` and starts serving.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let store = MemoryStorage::new();
        let commands = Arc::new(Mutex::new(Vec::new()));

        let accept_loop = {
            let store = store.clone();
            let commands = Arc::clone(&commands);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    tokio::spawn(serve(socket, store.clone(), Arc::clone(&commands)));
                }
            })
        };

        Ok(Self {
            addr,
            store,
            commands,
            accept_loop,
        })
    }

    /// Client settings pointing at this server.
    pub fn settings(&self) -> RedisSettings {
        RedisSettings::new(self.addr.ip().to_string(), self.addr.port())
            .timeout(Duration::from_secs(2))
    }

    /// The server's data.
    pub fn store(&self) -> &MemoryStorage {
        &self.store
    }

    /// Every command received so far, as argument lists.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn serve(socket: TcpStream, store: MemoryStorage, commands: Arc<Mutex<Vec<Vec<String>>>>) {
    let mut socket = BufReader::new(socket);
    while let Ok(Some(args)) = read_command(&mut socket).await {
        commands.lock().unwrap().push(args.clone());
        let reply = execute(&store, &args).await;
        if socket.get_mut().write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

async fn read_command(socket: &mut BufReader<TcpStream>) -> std::io::Result<Option<Vec<String>>> {
    let Some(argc) = read_header(socket, b'*').await? else {
        return Ok(None);
    };
    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        let Some(len) = read_header(socket, b'$').await? else {
            return Ok(None);
        };
        let mut arg = vec![0; len + 2];
        socket.read_exact(&mut arg).await?;
        arg.truncate(len);
        args.push(String::from_utf8_lossy(&arg).into_owned());
    }
    Ok(Some(args))
}

async fn read_header(socket: &mut BufReader<TcpStream>, kind: u8) -> std::io::Result<Option<usize>> {
    let mut line = Vec::new();
    if socket.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    let invalid = || std::io::Error::new(std::io::ErrorKind::InvalidData, "bad request header");
    if line.first() != Some(&kind) || !line.ends_with(b"\r\n") {
        return Err(invalid());
    }
    std::str::from_utf8(&line[1..line.len() - 2])
        .ok()
        .and_then(|n| n.parse().ok())
        .map(Some)
        .ok_or_else(invalid)
}

async fn execute(store: &MemoryStorage, args: &[String]) -> String {
    let name = args.first().map(|a| a.to_ascii_uppercase()).unwrap_or_default();
    let result = match (name.as_str(), args.len()) {
        ("GET", 2) => store.get(&args[1]).await.map(|value| match value {
            Some(value) => format!("${}\r\n{}\r\n", value.len(), value),
            None => "$-1\r\n".to_owned(),
        }),
        ("SET", 3) => store
            .set(&args[1], &args[2], None)
            .await
            .map(|_| "+OK\r\n".to_owned()),
        ("SET", 5) if args[3].eq_ignore_ascii_case("PX") => match args[4].parse::<u64>() {
            Ok(ms) => store
                .set(&args[1], &args[2], Some(Duration::from_millis(ms)))
                .await
                .map(|_| "+OK\r\n".to_owned()),
            Err(_) => Ok("-ERR value is not an integer or out of range\r\n".to_owned()),
        },
        ("INCR", 2) => store.increment(&args[1]).await.map(|n| format!(":{n}\r\n")),
        ("PEXPIRE", 3) => match args[2].parse::<u64>() {
            Ok(ms) => store
                .expire(&args[1], Duration::from_millis(ms))
                .await
                .map(|applied| format!(":{}\r\n", u8::from(applied))),
            Err(_) => Ok("-ERR value is not an integer or out of range\r\n".to_owned()),
        },
        _ => Ok(format!("-ERR unknown command '{name}'\r\n")),
    };
    match result {
        Ok(reply) => reply,
        Err(StorageError::NotAnInteger { .. }) => {
            "-ERR value is not an integer or out of range\r\n".to_owned()
        }
        Err(err) => format!("-ERR {err}\r\n"),
    }
}

/// Installs a fmt subscriber for test output; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
