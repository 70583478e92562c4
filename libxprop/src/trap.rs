//! X11 reports protocol errors through a single handler per connection. `HandlerSlot` holds that
//! handler and `ErrorTrap` swaps in a recording handler for the duration of one guarded call,
//! putting the previous handler back when the guard is dropped.
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc, Mutex, MutexGuard,
};

use tracing::error;

use crate::XError;

/// Callback invoked with every protocol error the accessor does not turn into a return value
pub type ErrorHandler = Arc<dyn Fn(&XError) + Send + Sync>;

/// Handler installed until the caller sets its own, logs the error and carries on
pub fn default_handler() -> ErrorHandler {
    Arc::new(|err: &XError| error!("{}", err))
}

pub struct HandlerSlot {
    handler: Mutex<ErrorHandler>,
    section: Mutex<()>,
}

impl Default for HandlerSlot {
    fn default() -> Self {
        Self::new(default_handler())
    }
}

impl HandlerSlot {
    pub fn new(handler: ErrorHandler) -> Self {
        Self { handler: Mutex::new(handler), section: Mutex::new(()) }
    }

    /// Install `handler` and return the one it replaced
    pub fn install(&self, handler: ErrorHandler) -> ErrorHandler {
        let mut slot = self.handler.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, handler)
    }

    /// Hand the error to the active handler.
    ///
    /// The handler runs outside the slot lock so it may itself install a new handler.
    pub fn dispatch(&self, err: &XError) {
        let handler = Arc::clone(&self.handler.lock().unwrap_or_else(|e| e.into_inner()));
        handler(err);
    }

    /// Enter the critical section and trap errors until the returned guard is dropped.
    ///
    /// Only one trap may be active at a time; a second caller blocks until the first guard is
    /// dropped. Not reentrant: taking a trap while holding one on the same thread deadlocks.
    pub fn trap(&self) -> ErrorTrap<'_> {
        let section = self.section.lock().unwrap_or_else(|e| e.into_inner());
        let code = Arc::new(AtomicU8::new(0));
        let recorded = Arc::clone(&code);
        let previous = self.install(Arc::new(move |err: &XError| {
            // keep the first error, it's the one the guarded call raised
            let _ = recorded.compare_exchange(0, err.error_code, Ordering::SeqCst, Ordering::SeqCst);
        }));
        ErrorTrap { slot: self, previous: Some(previous), code, _section: section }
    }
}

/// Guard returned by [`HandlerSlot::trap`]
pub struct ErrorTrap<'a> {
    slot: &'a HandlerSlot,
    previous: Option<ErrorHandler>,
    code: Arc<AtomicU8>,
    _section: MutexGuard<'a, ()>,
}

impl ErrorTrap<'_> {
    /// Code of the first error trapped so far, zero if none
    pub fn error_code(&self) -> u8 {
        self.code.load(Ordering::SeqCst)
    }
}

impl Drop for ErrorTrap<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.slot.install(previous);
        }
    }
}
