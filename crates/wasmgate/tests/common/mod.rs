#![allow(dead_code)]

use std::{fmt::Write as _, sync::Arc};

use parking_lot::Mutex;
use wasmgate::{EngineConfig, GuestLog, GuestRecord, InvocationEngine};

/// Log double that keeps every record as `(module, line)`.
#[derive(Clone, Default)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryLog {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl GuestLog for MemoryLog {
    fn log(&self, module: &str, record: GuestRecord<'_>) {
        self.lines
            .lock()
            .push((module.to_string(), record.to_string()));
    }
}

pub fn engine() -> InvocationEngine {
    engine_with(EngineConfig::new())
}

pub fn engine_with(config: EngineConfig) -> InvocationEngine {
    InvocationEngine::new(config).expect("engine")
}

pub fn engine_logging_to(log: &MemoryLog) -> InvocationEngine {
    engine_with_log(EngineConfig::new(), log)
}

pub fn engine_with_log(config: EngineConfig, log: &MemoryLog) -> InvocationEngine {
    InvocationEngine::with_log(config, Arc::new(log.clone())).expect("engine")
}

pub fn wasm(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).expect("valid wat")
}

/// Encodes `bytes` as a WAT string literal body.
pub fn wat_string(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "\\{b:02x}");
        s
    })
}

/// Guest that writes `message` to stdout and returns from `_start`.
pub fn stdout_guest(message: &[u8]) -> Vec<u8> {
    wasm(&format!(
        r#"(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 64) "{data}")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const 64))
    (i32.store (i32.const 4) (i32.const {len}))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8)))))"#,
        data = wat_string(message),
        len = message.len(),
    ))
}

/// Guest that writes its raw `environ` block (`k=v\0` entries) to stdout.
pub fn env_echo_guest() -> Vec<u8> {
    wasm(
        r#"(module
  (import "wasi_snapshot_preview1" "environ_sizes_get"
    (func $environ_sizes_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "environ_get"
    (func $environ_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 2)
  (func (export "_start")
    (drop (call $environ_sizes_get (i32.const 0) (i32.const 4)))
    (drop (call $environ_get (i32.const 1024) (i32.const 4096)))
    (i32.store (i32.const 8) (i32.const 4096))
    (i32.store (i32.const 12) (i32.load (i32.const 4)))
    (drop (call $fd_write (i32.const 1) (i32.const 8) (i32.const 1) (i32.const 16)))))"#,
    )
}

/// Splits an `environ` block into sorted `(key, value)` pairs.
pub fn parse_environ(block: &[u8]) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = block
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let entry = String::from_utf8(entry.to_vec()).expect("utf-8 environ");
            let (k, v) = entry.split_once('=').expect("k=v entry");
            (k.to_string(), v.to_string())
        })
        .collect();
    pairs.sort();
    pairs
}

/// Guest that calls `proc_exit(code)` after writing `partial` to stdout.
pub fn exit_guest(partial: &[u8], code: i32) -> Vec<u8> {
    wasm(&format!(
        r#"(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
  (memory (export "memory") 1)
  (data (i32.const 64) "{data}")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const 64))
    (i32.store (i32.const 4) (i32.const {len}))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8)))
    (call $proc_exit (i32.const {code}))))"#,
        data = wat_string(partial),
        len = partial.len(),
    ))
}

/// Guest that never returns.
pub fn spin_guest() -> Vec<u8> {
    wasm(r#"(module (func (export "_start") (loop $spin (br $spin))))"#)
}
