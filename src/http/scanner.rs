//! Deadline-bounded reads of lines and fixed-size bodies.
//!
//! Every read races a timer. When the timer wins the read fails with
//! [`ParseError::Timeout`] no matter how much was already consumed, and
//! nothing is retried: a slow client costs at most one deadline per read.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::time::timeout;

use crate::http::error::{ParseError, ReadStage};

pub struct Scanner<R> {
    reader: R,
    max_line_length: usize,
}

impl<R> Scanner<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, max_line_length: usize) -> Self {
        Self {
            reader,
            max_line_length,
        }
    }

    /// Reads one line with the trailing CRLF (or bare LF) removed.
    ///
    /// A `\r` that is not followed by `\n` is kept together with the byte
    /// after it.
    pub async fn read_line(
        &mut self,
        deadline: Duration,
        stage: ReadStage,
    ) -> Result<String, ParseError> {
        let limit = self.max_line_length;
        let line = timeout(deadline, scan_line(&mut self.reader, limit, stage))
            .await
            .map_err(|_| ParseError::Timeout { stage })??;

        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Reads exactly `length` bytes.
    pub async fn read_body(
        &mut self,
        length: usize,
        deadline: Duration,
    ) -> Result<Bytes, ParseError> {
        let stage = ReadStage::Body;
        let mut buf = BytesMut::zeroed(length);

        timeout(deadline, self.reader.read_exact(&mut buf))
            .await
            .map_err(|_| ParseError::Timeout { stage })?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ParseError::UnexpectedEof { stage },
                _ => ParseError::Io { source: e },
            })?;

        Ok(buf.freeze())
    }
}

async fn scan_line<R>(reader: &mut R, limit: usize, stage: ReadStage) -> Result<Vec<u8>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let Some(byte) = next_byte(reader).await? else {
            return Err(ParseError::UnexpectedEof { stage });
        };

        match byte {
            b'\n' => return Ok(line),
            b'\r' => match next_byte(reader).await? {
                Some(b'\n') => return Ok(line),
                Some(other) => line.extend_from_slice(&[b'\r', other]),
                None => return Err(ParseError::UnexpectedEof { stage }),
            },
            _ => line.push(byte),
        }

        if line.len() > limit {
            return Err(ParseError::LineTooLong { limit });
        }
    }
}

async fn next_byte<R>(reader: &mut R) -> std::io::Result<Option<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let buf = reader.fill_buf().await?;
    let Some(&byte) = buf.first() else {
        return Ok(None);
    };
    reader.consume(1);
    Ok(Some(byte))
}
