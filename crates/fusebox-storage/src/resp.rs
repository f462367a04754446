//! Minimal RESP2 framing: enough to issue commands and decode scalar replies.

use crate::StorageError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest bulk reply accepted (matches the server's own 512 MiB limit).
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Initial buffer for a bulk payload; larger payloads grow as they arrive.
const READ_CHUNK: usize = 8 * 1024;

/// A decoded scalar reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
}

impl Reply {
    /// Interprets the reply of `GET`.
    pub(crate) fn into_value(self) -> Result<Option<String>, StorageError> {
        match self {
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::Protocol("value is not valid UTF-8".into())),
            other => Err(other.unexpected()),
        }
    }

    /// Interprets the reply of `INCR`.
    pub(crate) fn into_integer(self) -> Result<i64, StorageError> {
        match self {
            Reply::Integer(n) => Ok(n),
            other => Err(other.unexpected()),
        }
    }

    /// Interprets the reply of `SET`: `+OK` on success, null when not applied.
    pub(crate) fn into_stored(self) -> Result<bool, StorageError> {
        match self {
            Reply::Simple(status) => Ok(status == "OK"),
            Reply::Bulk(None) => Ok(false),
            other => Err(other.unexpected()),
        }
    }

    /// Interprets the integer flag returned by `PEXPIRE`.
    pub(crate) fn into_flag(self) -> Result<bool, StorageError> {
        self.into_integer().map(|n| n == 1)
    }

    fn unexpected(self) -> StorageError {
        match self {
            Reply::Error(message) => StorageError::Backend(message),
            other => StorageError::Protocol(format!("unexpected reply {other:?}")),
        }
    }
}

/// Encodes a command as a RESP array of bulk strings.
pub(crate) fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

/// Reads one reply from the stream.
pub(crate) async fn read_reply<R>(reader: &mut R) -> Result<Reply, StorageError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let (kind, rest) = line
        .split_first()
        .ok_or_else(|| StorageError::Protocol("empty reply line".into()))?;
    let rest = std::str::from_utf8(rest)
        .map_err(|_| StorageError::Protocol("reply header is not valid UTF-8".into()))?;

    match kind {
        b'+' => Ok(Reply::Simple(rest.to_owned())),
        b'-' => Ok(Reply::Error(rest.to_owned())),
        b':' => parse_int(rest).map(Reply::Integer),
        b'$' => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|len| *len <= MAX_BULK_LEN)
                .ok_or_else(|| StorageError::Protocol(format!("bulk length {len} too large")))?;
            // Grow with the bytes that actually arrive rather than trusting
            // the declared length up front.
            let mut payload = Vec::with_capacity((len + 2).min(READ_CHUNK));
            let expected = len as u64 + 2;
            (&mut *reader).take(expected).read_to_end(&mut payload).await?;
            if payload.len() as u64 != expected {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed mid bulk reply",
                )));
            }
            if !payload.ends_with(b"\r\n") {
                return Err(StorageError::Protocol("bulk reply not terminated".into()));
            }
            payload.truncate(len);
            Ok(Reply::Bulk(Some(payload)))
        }
        other => Err(StorageError::Protocol(format!(
            "unsupported reply type {:?}",
            char::from(*other)
        ))),
    }
}

async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, StorageError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line).await?;
    if read == 0 {
        return Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by storage backend",
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(StorageError::Protocol("reply line not terminated".into()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_int(s: &str) -> Result<i64, StorageError> {
    s.parse()
        .map_err(|_| StorageError::Protocol(format!("invalid integer {s:?}")))
}
