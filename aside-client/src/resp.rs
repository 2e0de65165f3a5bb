//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies, keeping
//! allocations under control.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Fail Fast**: Invalid framing returns protocol errors immediately.

use std::io::BufRead;

use crate::client::{ClientError, ClientResult};

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays; a null array decodes as empty.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Turns an error reply into `ClientError::Server`, passing others through.
    pub fn into_result(self) -> ClientResult<RespValue> {
        match self {
            RespValue::Error(message) => Err(ClientError::Server { message }),
            other => Ok(other),
        }
    }
}

/// Appends one command as a RESP2 array of bulk strings.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    push_header(out, b'*', args.len());
    for arg in args {
        push_header(out, b'$', arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// Largest bulk string accepted, matching Redis' default `proto-max-bulk-len`.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Deepest array nesting accepted in one reply.
pub const MAX_NESTING: usize = 32;

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
) -> ClientResult<RespValue> {
    read_value(reader, line_buf, 0)
}

fn read_value<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<RespValue> {
    read_line(reader, line_buf)?;
    let (&tag, rest) = line_buf.split_first().ok_or(ClientError::Protocol)?;

    match tag {
        b'+' => Ok(RespValue::Simple(rest.to_vec())),
        b'-' => Ok(RespValue::Error(rest.to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
        b'$' => {
            let len = parse_i64(rest)?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_i64(rest)?;
            read_array(reader, len, line_buf, depth)
        }
        _ => Err(ClientError::Protocol),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> ClientResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    if len > MAX_BULK_LEN {
        return Err(ClientError::Protocol);
    }
    let len = len as usize;
    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data)?;
    if !data.ends_with(b"\r\n") {
        return Err(ClientError::Protocol);
    }
    data.truncate(len);
    Ok(RespValue::Bulk(Some(data)))
}

fn read_array<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<RespValue> {
    if len <= 0 {
        return Ok(RespValue::Array(Vec::new()));
    }
    if depth >= MAX_NESTING {
        return Err(ClientError::Protocol);
    }

    // Grow as items arrive; the announced length is not trusted for capacity.
    let mut items = Vec::new();
    for _ in 0..len {
        items.push(read_value(reader, line_buf, depth + 1)?);
    }
    Ok(RespValue::Array(items))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Err(ClientError::Protocol);
    }
    if !buf.ends_with(b"\r\n") {
        return Err(ClientError::Protocol);
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(ClientError::Protocol)
}

fn push_header(out: &mut Vec<u8>, tag: u8, len: usize) {
    out.push(tag);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}
