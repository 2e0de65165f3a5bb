//! In-process fake of a Redis-compatible store for integration tests.
//!
//! One thread per connection, shared state behind a mutex. Commands run in
//! the order they arrive on a connection, which is what pipelining relies on.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use aside_cache::{CacheClient, ClientConfig};

enum Value {
    Text(Vec<u8>),
    Set(BTreeSet<Vec<u8>>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    entries: HashMap<Vec<u8>, Entry>,
    log: Vec<Vec<Vec<u8>>>,
    failing: HashSet<Vec<u8>>,
}

impl State {
    fn live(&mut self, key: &[u8]) -> Option<&mut Entry> {
        let expired = self
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }
}

/// Handle to a running fake store.
#[derive(Clone)]
pub struct FakeStore {
    addr: String,
    state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let state = Arc::new(Mutex::new(State::default()));

        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let state = Arc::clone(&shared);
                thread::spawn(move || serve(stream, state));
            }
        });

        FakeStore { addr, state }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn client_config(&self, max_total: usize) -> ClientConfig {
        ClientConfig {
            addr: self.addr.clone(),
            max_idle: max_total,
            max_total,
            read_timeout: Some(Duration::from_secs(2)),
            write_timeout: Some(Duration::from_secs(2)),
            connect_timeout: Some(Duration::from_secs(2)),
            acquire_timeout: Some(Duration::from_secs(2)),
        }
    }

    pub fn client(&self) -> CacheClient {
        CacheClient::new(self.client_config(4)).expect("client")
    }

    /// Answers every later `command` with an error reply.
    pub fn fail_on(&self, command: &str) {
        self.lock().failing.insert(command.as_bytes().to_vec());
    }

    /// Names of every command received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .map(|args| String::from_utf8_lossy(&args[0]).into_owned())
            .collect()
    }

    /// Full argument lists of every received command.
    pub fn command_log(&self) -> Vec<Vec<Vec<u8>>> {
        self.lock().log.clone()
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        match self.lock().live(key.as_bytes()) {
            Some(Entry {
                value: Value::Text(data),
                ..
            }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn members(&self, key: &str) -> BTreeSet<String> {
        match self.lock().live(key.as_bytes()) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => members
                .iter()
                .map(|m| String::from_utf8_lossy(m).into_owned())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    pub fn has_expiry(&self, key: &str) -> bool {
        self.lock()
            .live(key.as_bytes())
            .is_some_and(|entry| entry.expires_at.is_some())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake store state")
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn serve(stream: TcpStream, state: Arc<Mutex<State>>) {
    let Ok(writer) = stream.try_clone() else { return };
    let mut writer = writer;
    let mut reader = BufReader::new(stream);
    while let Ok(Some(args)) = read_command(&mut reader) {
        let reply = {
            let mut state = state.lock().expect("fake store state");
            state.log.push(args.clone());
            dispatch(&mut state, &args)
        };
        if writer.write_all(&reply).and_then(|_| writer.flush()).is_err() {
            return;
        }
    }
}

fn dispatch(state: &mut State, args: &[Vec<u8>]) -> Vec<u8> {
    let name = args[0].to_ascii_uppercase();
    if state.failing.contains(&name) {
        return error("ERR injected failure");
    }
    let key = args.get(1).map(Vec::as_slice).unwrap_or_default();

    match name.as_slice() {
        b"PING" => b"+PONG\r\n".to_vec(),
        b"GET" => match state.live(key) {
            None => b"$-1\r\n".to_vec(),
            Some(Entry {
                value: Value::Text(data),
                ..
            }) => bulk(data),
            Some(_) => wrong_type(),
        },
        b"SET" => {
            state.entries.insert(
                key.to_vec(),
                Entry {
                    value: Value::Text(args[2].clone()),
                    expires_at: None,
                },
            );
            b"+OK\r\n".to_vec()
        }
        b"EXPIRE" => {
            let seconds = std::str::from_utf8(&args[2])
                .ok()
                .and_then(|s| s.parse::<i64>().ok());
            let Some(seconds) = seconds else {
                return error("ERR value is not an integer or out of range");
            };
            if state.live(key).is_none() {
                return integer(0);
            }
            if seconds <= 0 {
                state.entries.remove(key);
            } else if let Some(entry) = state.entries.get_mut(key) {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds as u64));
            }
            integer(1)
        }
        b"TTL" => match state.live(key) {
            None => integer(-2),
            Some(Entry { expires_at: None, .. }) => integer(-1),
            Some(Entry {
                expires_at: Some(at), ..
            }) => integer(at.saturating_duration_since(Instant::now()).as_secs() as i64),
        },
        b"DEL" => {
            let existed = state.live(key).is_some();
            state.entries.remove(key);
            integer(existed as i64)
        }
        b"SADD" => {
            if args.len() < 3 {
                return error("ERR wrong number of arguments for 'sadd' command");
            }
            // Drop an expired entry before reusing the slot.
            state.live(key);
            let entry = state.entries.entry(key.to_vec()).or_insert_with(|| Entry {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::Set(members) => {
                    let added = args[2..].iter().filter(|m| members.insert(m.to_vec())).count();
                    integer(added as i64)
                }
                Value::Text(_) => wrong_type(),
            }
        }
        b"SREM" => {
            let (removed, now_empty) = match state.live(key) {
                None => (0, false),
                Some(Entry {
                    value: Value::Set(members),
                    ..
                }) => {
                    let removed = args[2..].iter().filter(|m| members.remove(m.as_slice())).count();
                    (removed, members.is_empty())
                }
                Some(_) => return wrong_type(),
            };
            if now_empty {
                state.entries.remove(key);
            }
            integer(removed as i64)
        }
        b"SMEMBERS" => match state.live(key) {
            None => b"*0\r\n".to_vec(),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                let mut out = format!("*{}\r\n", members.len()).into_bytes();
                for member in members.iter() {
                    out.extend(bulk(member));
                }
                out
            }
            Some(_) => wrong_type(),
        },
        _ => error("ERR unknown command"),
    }
}

fn bulk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

fn integer(value: i64) -> Vec<u8> {
    format!(":{}\r\n", value).into_bytes()
}

fn error(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}

fn wrong_type() -> Vec<u8> {
    error("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<Vec<Vec<u8>>>> {
    let Some(header) = read_line(reader)? else {
        return Ok(None);
    };
    let count = parse_len(&header, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let line = read_line(reader)?.ok_or_else(|| invalid("eof inside command"))?;
        let len = parse_len(&line, b'$')?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data)?;
        data.truncate(len);
        args.push(data);
    }
    if args.is_empty() {
        return Err(invalid("empty command"));
    }
    Ok(Some(args))
}

fn read_line(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    if !buf.ends_with(b"\r\n") {
        return Err(invalid("invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(buf))
}

fn parse_len(line: &[u8], tag: u8) -> std::io::Result<usize> {
    match line.split_first() {
        Some((&first, digits)) if first == tag => std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| invalid("bad length")),
        _ => Err(invalid("unexpected tag")),
    }
}

fn invalid(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}
