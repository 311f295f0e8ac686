use std::future::pending;
use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::effects::connector::BoxIo;

const READ_CHUNK: usize = 16 * 1024;

/// The engine's connection, split so reads and writes can be awaited side by
/// side in one `select!`.
///
/// Both halves are present or both are absent.
#[derive(Default)]
pub(crate) struct Socket {
    pub(crate) reader:      Option<ReadHalf<BoxIo>>,
    pub(crate) writer:      Option<WriteHalf<BoxIo>>,
    /// Cleared once a response said the connection will not be reused.
    pub(crate) reusable:    bool,
    pub(crate) needs_flush: bool,
}

impl Socket {
    pub(crate) fn attach(&mut self, io: BoxIo) {
        let (reader, writer) = tokio::io::split(io);
        self.reader = Some(reader);
        self.writer = Some(writer);
        self.reusable = true;
        self.needs_flush = false;
    }

    /// Drop both halves, closing the connection.
    pub(crate) fn detach(&mut self) -> bool {
        let attached = self.is_attached();
        self.reader = None;
        self.writer = None;
        self.reusable = false;
        self.needs_flush = false;
        attached
    }

    pub(crate) fn is_attached(&self) -> bool { self.reader.is_some() }

    pub(crate) fn is_reusable(&self) -> bool { self.is_attached() && self.reusable }
}

/// Outcome of one [`write_some`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Written {
    Bytes(usize),
    Flushed,
}

/// Read into `buf`. Pends forever without a reader.
pub(crate) async fn read_some(
    reader: Option<&mut ReadHalf<BoxIo>>,
    buf: &mut BytesMut,
) -> io::Result<usize> {
    match reader {
        Some(reader) => {
            buf.reserve(READ_CHUNK);
            reader.read_buf(buf).await
        }
        None => pending().await,
    }
}

/// Write part of `buf`, or flush once it is empty. Pends forever without a
/// writer.
pub(crate) async fn write_some(
    writer: Option<&mut WriteHalf<BoxIo>>,
    buf: &[u8],
) -> io::Result<Written> {
    let Some(writer) = writer else {
        return pending().await;
    };
    if buf.is_empty() {
        writer.flush().await?;
        return Ok(Written::Flushed);
    }
    match writer.write(buf).await? {
        0 => Err(io::ErrorKind::WriteZero.into()),
        n => Ok(Written::Bytes(n)),
    }
}
