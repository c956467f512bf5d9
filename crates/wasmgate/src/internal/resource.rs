use wasmtime::ResourceLimiter;

/// Caps linear memory and table growth for one sandbox.
pub struct MemoryLimiter {
    max_memory: usize,
    max_table_elements: usize,
    current: usize,
}

impl MemoryLimiter {
    pub fn new(max_memory: usize) -> Self {
        const TABLE_ELEMENT_BUDGET_BYTES: usize = 64;
        const MIN_TABLE_ELEMENTS: usize = 1024;

        Self {
            max_memory,
            max_table_elements: core::cmp::max(
                max_memory / TABLE_ELEMENT_BUDGET_BYTES,
                MIN_TABLE_ELEMENTS,
            ),
            current: 0,
        }
    }

    /// Linear memory size most recently granted.
    pub const fn current(&self) -> usize {
        self.current
    }
}

impl ResourceLimiter for MemoryLimiter {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        if desired > self.max_memory {
            return Ok(false);
        }
        self.current = desired;
        Ok(true)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(desired <= self.max_table_elements)
    }
}
