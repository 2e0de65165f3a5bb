//! # Command Pipelining
//!
//! Purpose: Queue many commands and send them in a single write, then read
//! every reply in submission order.
//!
//! ## Notes
//! - The store executes queued commands in the order they were added; this is
//!   what lets callers put removals ahead of insertions for the same key.
//! - A pipeline is not a transaction. If any reply is an error the whole
//!   batch is reported as failed, but commands the store already ran stand.

use tracing::debug;

use crate::client::{ClientError, ClientResult};
use crate::commands::set_args;
use crate::pool::PooledConnection;
use crate::resp::{encode_command, RespValue};

/// A batch of encoded commands awaiting one round trip.
#[derive(Debug, Default, Clone)]
pub struct Pipeline {
    buf: Vec<u8>,
    commands: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an arbitrary command.
    pub fn cmd(&mut self, args: &[&[u8]]) -> &mut Self {
        encode_command(args, &mut self.buf);
        self.commands += 1;
        self
    }

    pub fn sadd<M: AsRef<[u8]>>(&mut self, key: &[u8], members: &[M]) -> &mut Self {
        self.cmd(&set_args(b"SADD", key, members))
    }

    pub fn srem<M: AsRef<[u8]>>(&mut self, key: &[u8], members: &[M]) -> &mut Self {
        self.cmd(&set_args(b"SREM", key, members))
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands == 0
    }

    /// Flushes the batch on `conn` and returns every reply in order.
    ///
    /// All replies are drained before the first error reply is returned, so
    /// the connection stays in sync and can go back to the pool.
    pub fn query(&self, conn: &mut PooledConnection) -> ClientResult<Vec<RespValue>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        debug!(commands = self.commands, bytes = self.buf.len(), "flushing pipeline");
        let replies = conn.exec_batch(&self.buf, self.commands)?;
        for reply in &replies {
            if let RespValue::Error(message) = reply {
                return Err(ClientError::Server {
                    message: message.clone(),
                });
            }
        }
        Ok(replies)
    }
}
