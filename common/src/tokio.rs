use serde::Serialize;
use std::future::Future;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::bridge_err;
use crate::errors::{BridgeError, BridgeErrorKind};

/// Upper bound on a single frame. A notification event carries at most
/// a few icon blobs; anything past this is a corrupt length prefix.
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub struct SizedMessageObj {
    buffer: Vec<u8>,
}

impl SizedMessageObj {
    /// The ONLY way to create a message for the wire.
    /// This guarantees bincode is used every time.
    pub fn from_struct<T: Serialize>(data: &T) -> Result<Self, BridgeError> {
        let buffer = bincode::serialize(data)
            .map_err(|e| bridge_err!(BridgeErrorKind::Serialize, e.to_string()))?;
        Ok(Self { buffer })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }
}

/// Length-prefixed framing: a 4-byte big-endian `u32` length followed
/// by exactly that many payload bytes.
pub trait AsyncSizedMessage {
    fn write_sized<'a>(
        &'a mut self,
        what: SizedMessageObj,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + 'a;
    fn read_sized<'a>(
        &'a mut self,
    ) -> impl Future<Output = Result<Vec<u8>, BridgeError>> + Send + 'a;
}

async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    what: SizedMessageObj,
) -> Result<(), BridgeError> {
    let buf_len: u32 = what
        .bytes()
        .len()
        .try_into()
        .map_err(|_| bridge_err!(BridgeErrorKind::InvalidData, "message too long"))?;

    let len_bytes = buf_len.to_be_bytes();
    writer
        .write_all(&len_bytes)
        .await
        .map_err(|e| bridge_err!(BridgeErrorKind::StreamWrite, e.to_string()))?;

    writer
        .write_all(what.bytes())
        .await
        .map_err(|e| bridge_err!(BridgeErrorKind::StreamWrite, e.to_string()))?;

    Ok(())
}

async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, BridgeError> {
    let mut buf_len = [0u8; 4];
    reader
        .read_exact(&mut buf_len)
        .await
        .map_err(|e| bridge_err!(BridgeErrorKind::StreamRead, e.to_string()))?;
    let msg_len = u32::from_be_bytes(buf_len) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(bridge_err!(
            BridgeErrorKind::InvalidData,
            "frame length {} exceeds limit",
            msg_len
        ));
    }

    let mut buf = vec![0u8; msg_len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| bridge_err!(BridgeErrorKind::StreamRead, e.to_string()))?;

    Ok(buf)
}

impl AsyncSizedMessage for UnixStream {
    fn write_sized<'a>(
        &'a mut self,
        what: SizedMessageObj,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + 'a {
        write_frame(self, what)
    }
    fn read_sized<'a>(
        &'a mut self,
    ) -> impl Future<Output = Result<Vec<u8>, BridgeError>> + Send + 'a {
        read_frame(self)
    }
}

impl AsyncSizedMessage for OwnedReadHalf {
    fn write_sized<'a>(
        &'a mut self,
        _what: SizedMessageObj,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + 'a {
        async move {
            Err(bridge_err!(
                BridgeErrorKind::StreamWrite,
                "Cannot write from ReadHalf"
            ))
        }
    }
    fn read_sized<'a>(
        &'a mut self,
    ) -> impl Future<Output = Result<Vec<u8>, BridgeError>> + Send + 'a {
        read_frame(self)
    }
}

impl AsyncSizedMessage for OwnedWriteHalf {
    fn write_sized<'a>(
        &'a mut self,
        what: SizedMessageObj,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send + 'a {
        write_frame(self, what)
    }
    fn read_sized<'a>(
        &'a mut self,
    ) -> impl Future<Output = Result<Vec<u8>, BridgeError>> + Send + 'a {
        async move {
            Err(bridge_err!(
                BridgeErrorKind::StreamRead,
                "Cannot read to WriteHalf"
            ))
        }
    }
}
