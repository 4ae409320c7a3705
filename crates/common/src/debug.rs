//! Debug logging with per-component loggers.
//!
//! Control via the DEBUG environment variable:
//! - `DEBUG=*` - enable all loggers
//! - `DEBUG=compile` - enable only the compiler
//! - `DEBUG=compile,parse` - enable several
//!
//! Verbosity via DEBUG_VERBOSITY (1 default, 2 adds detail lines).

use std::collections::HashSet;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

enum Filter {
    All,
    None,
    Named(HashSet<String>),
}

struct Config {
    filter: Filter,
    verbosity: u8,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let filter = match env::var("DEBUG").ok().as_deref() {
            None | Some("") => Filter::None,
            Some("*") | Some("1") | Some("true") => Filter::All,
            Some(spec) => {
                let names: HashSet<_> = spec
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if names.is_empty() {
                    Filter::None
                } else {
                    Filter::Named(names)
                }
            }
        };
        let verbosity = env::var("DEBUG_VERBOSITY")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(1)
            .min(3);
        Config { filter, verbosity }
    })
}

/// A named logger; cheap to hold, silent unless enabled by `DEBUG`.
pub struct Logger {
    name: &'static str,
    enabled: bool,
    indent: AtomicUsize,
}

impl Logger {
    pub const fn disabled() -> Self {
        Self {
            name: "",
            enabled: false,
            indent: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn emit(&self, prefix: &str, msg: &str) {
        let indent = self.indent.load(Ordering::Relaxed);
        eprintln!("{}[{}]{} {}", "  ".repeat(indent), self.name, prefix, msg);
    }

    #[inline]
    pub fn log(&self, msg: &str) {
        if self.enabled {
            self.emit("", msg);
        }
    }

    #[inline]
    pub fn detail(&self, msg: &str) {
        if self.enabled && config().verbosity >= 2 {
            self.emit("", msg);
        }
    }

    #[inline]
    pub fn success(&self, msg: &str) {
        if self.enabled {
            self.emit(" OK:", msg);
        }
    }

    #[inline]
    pub fn fail(&self, msg: &str) {
        if self.enabled {
            self.emit(" FAIL:", msg);
        }
    }

    #[inline]
    pub fn push_indent(&self) {
        if self.enabled {
            self.indent.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn pop_indent(&self) {
        if self.enabled {
            let _ = self
                .indent
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                    Some(v.saturating_sub(1))
                });
        }
    }
}

/// Create a logger. The name must be a static string.
pub fn create_logger(name: &'static str) -> Logger {
    let on = match &config().filter {
        Filter::None => false,
        Filter::All => true,
        Filter::Named(set) => set.contains(name),
    };
    Logger {
        name,
        enabled: on,
        indent: AtomicUsize::new(0),
    }
}

// Macros avoid the format! cost when the logger is disabled.

#[macro_export]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.log(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_detail {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.detail(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_success {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.success(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_fail {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.fail(&format!($($arg)*));
        }
    };
}
