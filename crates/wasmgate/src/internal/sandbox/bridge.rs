use std::borrow::Cow;

use wasmtime::{Caller, Extern, Linker};

use super::SandboxState;
use crate::{GuestRecord, HOST_MODULE};

pub fn add_to_linker(linker: &mut Linker<SandboxState>) -> anyhow::Result<()> {
    linker.func_wrap(HOST_MODULE, "log_i32", log_i32)?;
    linker.func_wrap(HOST_MODULE, "log_string", log_string)?;
    Ok(())
}

fn log_i32(caller: Caller<'_, SandboxState>, value: u32) {
    let state = caller.data();
    state.log().log(state.module(), GuestRecord::Int(value));
}

fn log_string(mut caller: Caller<'_, SandboxState>, ptr: u32, len: u32) {
    let Some(memory) = caller.get_export("memory").and_then(Extern::into_memory) else {
        let state = caller.data();
        state
            .log()
            .log(state.module(), GuestRecord::OutOfBounds { ptr, len });
        return;
    };

    let (data, state) = memory.data_and_store_mut(&mut caller);
    // Out-of-range reads are reported, never turned into a trap.
    match guest_bytes(data, ptr, len) {
        Some(bytes) => {
            let text: Cow<'_, str> = String::from_utf8_lossy(bytes);
            state.log().log(state.module(), GuestRecord::Text(&text));
        }
        None => state
            .log()
            .log(state.module(), GuestRecord::OutOfBounds { ptr, len }),
    }
}

/// Returns `len` bytes at `ptr`, or `None` if the range leaves `data`.
fn guest_bytes(data: &[u8], ptr: u32, len: u32) -> Option<&[u8]> {
    let start = usize::try_from(ptr).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    data.get(start..end)
}
