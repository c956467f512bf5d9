use wasmtime::Config;

pub fn configure_engine(cfg: &mut Config) {
    cfg.async_support(true);
    cfg.epoch_interruption(true);
    cfg.wasm_backtrace(false);
    cfg.native_unwind_info(false);
    cfg.cranelift_opt_level(wasmtime::OptLevel::Speed);
}
