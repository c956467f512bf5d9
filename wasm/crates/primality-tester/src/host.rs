//! Diagnostics through the gateway's `env` host module. No-ops off wasm.

#[cfg(target_family = "wasm")]
mod imports {
    #[link(wasm_import_module = "env")]
    unsafe extern "C" {
        pub fn log_i32(value: u32);
        pub fn log_string(ptr: *const u8, len: u32);
    }
}

#[cfg(target_family = "wasm")]
pub fn log_i32(value: u32) {
    // SAFETY: the host only reads its argument.
    unsafe { imports::log_i32(value) }
}

#[cfg(target_family = "wasm")]
pub fn log_string(msg: &str) {
    let len = u32::try_from(msg.len()).unwrap_or(u32::MAX);
    // SAFETY: the host reads at most `len` bytes starting at `ptr`, all of
    // which belong to `msg`.
    unsafe { imports::log_string(msg.as_ptr(), len) }
}

#[cfg(not(target_family = "wasm"))]
pub const fn log_i32(_value: u32) {}

#[cfg(not(target_family = "wasm"))]
pub const fn log_string(_msg: &str) {}
