//! # Connection Pool
//!
//! Purpose: Reuse TCP connections across calls so every operation pays for a
//! checkout rather than a handshake.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Bounded Waiting**: Exhaustion waits up to `acquire_timeout`, then fails.
//! 4. **RAII Release**: `PooledConnection` hands its slot back on drop, on
//!    every exit path.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{trace, warn};

use crate::client::{ClientConfig, ClientError, ClientResult};
use crate::resp::{encode_command, read_response, RespValue};

struct PoolState {
    idle: VecDeque<Connection>,
    total: usize,
}

struct PoolInner {
    config: ClientConfig,
    state: Mutex<PoolState>,
    // Signalled whenever a slot or an idle connection frees up.
    available: Condvar,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Pool state is only counters and idle sockets, so it stays usable
        // after a panic elsewhere.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_slot(&self) {
        let mut state = self.lock();
        state.total = state.total.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }

    fn return_connection(&self, conn: Connection) {
        let mut state = self.lock();
        if state.idle.len() < self.config.max_idle {
            state.idle.push_back(conn);
        } else {
            state.total = state.total.saturating_sub(1);
        }
        drop(state);
        self.available.notify_one();
    }
}

/// Connection pool handle. Clones share the same pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool; connections are opened lazily.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        if config.max_total == 0 {
            return Err(ClientError::PoolExhausted);
        }
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
        };
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
                available: Condvar::new(),
            }),
        })
    }

    pub fn addr(&self) -> &str {
        &self.inner.config.addr
    }

    /// Acquires a connection, reusing an idle one when possible.
    ///
    /// When the pool is at `max_total`, waits up to `acquire_timeout` for a
    /// connection to come back before returning `PoolExhausted`.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        let deadline = self
            .inner
            .config
            .acquire_timeout
            .map(|timeout| Instant::now() + timeout);

        let mut state = self.inner.lock();
        loop {
            if let Some(conn) = state.idle.pop_front() {
                return Ok(PooledConnection::new(self.inner.clone(), conn));
            }
            if state.total < self.inner.config.max_total {
                state.total += 1;
                break;
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => return Err(ClientError::PoolExhausted),
            };
            if remaining.is_zero() {
                return Err(ClientError::PoolExhausted);
            }
            let (guard, _) = self
                .inner
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
        drop(state);

        match Connection::connect(&self.inner.config) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.inner.release_slot();
                Err(err)
            }
        }
    }

    /// Number of connections currently open (idle + in-use).
    pub fn open_connections(&self) -> usize {
        self.inner.lock().total
    }
}

/// RAII wrapper returning a connection to the pool on drop.
///
/// A connection that saw an IO or framing error is discarded instead, since
/// its reply stream can no longer be trusted.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    // `conn` is only taken in `Drop`, so it is always present here.
    fn connection(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }

    /// Executes one RESP command and returns the parsed response.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let response = self.connection().exec(args);
        if response.is_err() {
            self.valid = false;
        }
        response
    }

    /// Writes a pre-encoded batch in one flush and reads `replies` responses
    /// in submission order.
    pub(crate) fn exec_batch(
        &mut self,
        payload: &[u8],
        replies: usize,
    ) -> ClientResult<Vec<RespValue>> {
        let response = self.connection().exec_batch(payload, replies);
        if response.is_err() {
            self.valid = false;
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        if self.valid {
            self.pool.return_connection(conn);
        } else {
            warn!(addr = %self.pool.config.addr, "discarding broken connection");
            drop(conn);
            self.pool.release_slot();
        }
    }
}

/// Single TCP connection with reusable buffers.
struct Connection {
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        // Small request payloads; Nagle would only add latency.
        stream.set_nodelay(true)?;
        trace!(addr = %config.addr, "opened store connection");

        Ok(Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        })
    }

    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }

    fn exec_batch(&mut self, payload: &[u8], replies: usize) -> ClientResult<Vec<RespValue>> {
        let stream = self.reader.get_mut();
        stream.write_all(payload)?;
        stream.flush()?;

        let mut out = Vec::with_capacity(replies);
        for _ in 0..replies {
            out.push(read_response(&mut self.reader, &mut self.line_buf)?);
        }
        Ok(out)
    }
}

fn connect_stream(config: &ClientConfig) -> ClientResult<TcpStream> {
    let addrs = config
        .addr
        .to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress(config.addr.clone()))?;

    let mut last_err = None;
    for addr in addrs {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    match last_err {
        Some(err) => Err(ClientError::Io(err)),
        None => Err(ClientError::InvalidAddress(config.addr.clone())),
    }
}
