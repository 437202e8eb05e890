//! Destination for `Print` node output.
//!
//! Native runs write to stdout; tests capture into a buffer so the output of
//! a specializing run can be compared with a generic-only run.

use std::sync::Arc;

use parking_lot::Mutex;

/// Print handler that captures lines in a buffer.
#[derive(Default)]
pub struct BufferPrintHandler {
    buffer: Mutex<String>,
}

impl BufferPrintHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn println(&self, msg: &str) {
        let mut buf = self.buffer.lock();
        buf.push_str(msg);
        buf.push('\n');
    }

    pub fn get_output(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Print handler implementation using enum dispatch.
pub enum PrintHandlerImpl {
    /// Writes to stdout (default).
    Stdout,
    /// Captures to a buffer.
    Buffer(BufferPrintHandler),
    /// Discards all output.
    Silent,
}

impl PrintHandlerImpl {
    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            Self::Stdout => println!("{msg}"),
            Self::Buffer(h) => h.println(msg),
            Self::Silent => {}
        }
    }

    /// Captured output. Empty for handlers that don't capture.
    pub fn get_output(&self) -> String {
        match self {
            Self::Buffer(h) => h.get_output(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(h) = self {
            h.clear();
        }
    }
}

/// Shared print handler, cloned into every interpreter that prints.
pub type SharedPrintHandler = Arc<PrintHandlerImpl>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandlerImpl::Stdout)
}

pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandlerImpl::Buffer(BufferPrintHandler::new()))
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandlerImpl::Silent)
}
