use std::{
    collections::HashMap,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use wasmtime::Engine;

/// Interval between epoch increments. Deadlines and yields are counted in ticks.
pub const EPOCH_TICK: Duration = Duration::from_millis(10);

struct Engines {
    registered: Mutex<HashMap<u64, Engine>>,
    next_id: AtomicU64,
}

/// Background thread advancing the epoch of every registered engine.
pub struct EpochTicker {
    engines: Arc<Engines>,
}

/// Keeps an engine ticking until dropped.
pub struct EpochRegistration {
    id: u64,
    engines: Arc<Engines>,
}

impl EpochTicker {
    fn spawn() -> std::io::Result<Self> {
        let engines = Arc::new(Engines {
            registered: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        });

        let bg = Arc::clone(&engines);
        std::thread::Builder::new()
            .name("wasmgate-epoch-ticker".to_string())
            .spawn(move || {
                // Runs off the tokio scheduler so a busy guest cannot starve its own deadline.
                loop {
                    std::thread::park_timeout(EPOCH_TICK);
                    let engines: Vec<Engine> = bg.registered.lock().values().cloned().collect();
                    for engine in engines {
                        engine.increment_epoch();
                    }
                }
            })?;

        Ok(Self { engines })
    }

    pub fn register(&self, engine: Engine) -> EpochRegistration {
        let id = self.engines.next_id.fetch_add(1, Ordering::Relaxed);
        self.engines.registered.lock().insert(id, engine);
        EpochRegistration {
            id,
            engines: Arc::clone(&self.engines),
        }
    }
}

impl Drop for EpochRegistration {
    fn drop(&mut self) {
        self.engines.registered.lock().remove(&self.id);
    }
}

/// Process-wide ticker, started on first use.
pub fn global_epoch_ticker() -> std::io::Result<&'static EpochTicker> {
    static TICKER: OnceLock<core::result::Result<EpochTicker, (std::io::ErrorKind, String)>> =
        OnceLock::new();

    match TICKER.get_or_init(|| EpochTicker::spawn().map_err(|e| (e.kind(), e.to_string()))) {
        Ok(ticker) => Ok(ticker),
        Err((kind, message)) => Err(std::io::Error::new(*kind, message.clone())),
    }
}
