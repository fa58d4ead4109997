use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEBUG_ENV: &str = "POSH_LINE_DEBUG";

static FORCED: AtomicBool = AtomicBool::new(false);

/// Turn debug output on regardless of the environment (`--debug`).
pub fn enable_debug() {
    FORCED.store(true, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    FORCED.load(Ordering::Relaxed) || env::var(DEBUG_ENV).is_ok()
}

pub fn debug(message: &str) {
    if debug_enabled() {
        eprintln!("[DEBUG] {}", message);
    }
}

pub fn debug_with_context(context: &str, message: &str) {
    if debug_enabled() {
        eprintln!("[DEBUG] {}: {}", context, message);
    }
}

/// Warnings are always printed to stderr; stdout carries only prompt text.
pub fn warn(message: &str) {
    eprintln!("Warning: {}", message);
}
