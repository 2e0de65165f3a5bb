//! Typed store commands on a checked-out connection.
//!
//! Each method sends one command and maps the reply onto a Rust type;
//! error replies become `ClientError::Server`.

use std::time::Duration;

use tracing::trace;

use crate::client::{ClientError, ClientResult, ClientTtl};
use crate::pool::PooledConnection;
use crate::resp::RespValue;

impl PooledConnection {
    fn command(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        trace!(command = %String::from_utf8_lossy(args[0]), "store command");
        self.exec(args)?.into_result()
    }

    pub fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.command(&[b"GET", key])? {
            RespValue::Bulk(data) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Plain SET; under Redis semantics this also clears any previous TTL.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        match self.command(&[b"SET", key, value])? {
            RespValue::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns true when the key existed and the timeout was applied.
    pub fn expire(&mut self, key: &[u8], seconds: u64) -> ClientResult<bool> {
        let seconds = seconds.to_string();
        match self.command(&[b"EXPIRE", key, seconds.as_bytes()])? {
            RespValue::Integer(value) => Ok(value == 1),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub fn ttl(&mut self, key: &[u8]) -> ClientResult<ClientTtl> {
        match self.command(&[b"TTL", key])? {
            RespValue::Integer(-2) => Ok(ClientTtl::Missing),
            RespValue::Integer(-1) => Ok(ClientTtl::NoExpiry),
            RespValue::Integer(value) if value >= 0 => {
                Ok(ClientTtl::ExpiresIn(Duration::from_secs(value as u64)))
            }
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns true when a key was removed.
    pub fn del(&mut self, key: &[u8]) -> ClientResult<bool> {
        match self.command(&[b"DEL", key])? {
            RespValue::Integer(count) => Ok(count > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub fn sadd<M: AsRef<[u8]>>(&mut self, key: &[u8], members: &[M]) -> ClientResult<u64> {
        let args = set_args(b"SADD", key, members);
        self.count_reply(&args)
    }

    pub fn srem<M: AsRef<[u8]>>(&mut self, key: &[u8], members: &[M]) -> ClientResult<u64> {
        let args = set_args(b"SREM", key, members);
        self.count_reply(&args)
    }

    /// Members of the set at `key`, in store order. A missing key yields an
    /// empty list.
    pub fn smembers(&mut self, key: &[u8]) -> ClientResult<Vec<Vec<u8>>> {
        match self.command(&[b"SMEMBERS", key])? {
            RespValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    RespValue::Bulk(Some(member)) => Ok(member),
                    _ => Err(ClientError::UnexpectedResponse),
                })
                .collect(),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub fn ping(&mut self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let response = match payload {
            Some(data) => self.command(&[b"PING", data])?,
            None => self.command(&[b"PING"])?,
        };
        match response {
            RespValue::Simple(text) => Ok(text),
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn count_reply(&mut self, args: &[&[u8]]) -> ClientResult<u64> {
        match self.command(args)? {
            RespValue::Integer(count) if count >= 0 => Ok(count as u64),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Builds `[name, key, member...]` borrowing every member.
pub(crate) fn set_args<'a, M: AsRef<[u8]>>(
    name: &'a [u8],
    key: &'a [u8],
    members: &'a [M],
) -> Vec<&'a [u8]> {
    let mut args = Vec::with_capacity(members.len() + 2);
    args.push(name);
    args.push(key);
    args.extend(members.iter().map(AsRef::as_ref));
    args
}
