// src/dev_utils.rs

use std::time::Instant;

/// A simple RAII timer for profiling blocks of code.
/// When created, it records the start time. When it goes out of scope (is dropped),
/// it logs the elapsed time at trace level.
#[derive(Debug)]
pub struct BlockTimer {
    name: String,
    start: Instant,
}

impl BlockTimer {
    /// Creates a new timer and starts it immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for BlockTimer {
    fn drop(&mut self) {
        log::trace!(
            "PROFILE [{}]: {} µs",
            self.name,
            self.start.elapsed().as_micros()
        );
    }
}
