//! Responsible for behaviour related to handling termination signals (e.g. `SIGINT`).
//!
//! The solver itself never reacts to signals directly; the search loop polls
//! [`signal_handler::should_terminate`] and returns control to the host, which prints its final
//! output and statistics before re-raising the recorded signal so that the process terminates
//! through the normal signal path.

pub mod signal_handler {
    use std::io::Error;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use once_cell::sync::Lazy;
    use signal_hook::consts::TERM_SIGNALS;

    static SIGNAL_RECEIVED: Lazy<Arc<AtomicBool>> = Lazy::new(|| Arc::new(AtomicBool::new(false)));
    static LAST_SIGNAL: AtomicUsize = AtomicUsize::new(0);

    /// Registers the appropriate signals in [`TERM_SIGNALS`]; note that if *any* of the signals
    /// is received twice then the application will shut down immediately.
    pub fn register_signals() -> Result<(), Error> {
        for &signal in TERM_SIGNALS {
            // If we received a signal twice (e.g. when the user presses CTRL+C twice) then the
            // application will be terminated
            let _ = signal_hook::flag::register_conditional_shutdown(
                signal,
                1,
                Arc::clone(&SIGNAL_RECEIVED),
            )?;

            // Record which signal arrived and raise the termination flag. Only atomics are
            // touched here, which is allowed inside a signal handler.
            let _ = unsafe {
                signal_hook::low_level::register(signal, move || {
                    LAST_SIGNAL.store(signal as usize, Ordering::Relaxed);
                    SIGNAL_RECEIVED.store(true, Ordering::Relaxed);
                })?
            };
        }

        Ok(())
    }

    /// Returns `true` if the application has received the signal to shut down and false
    /// otherwise.
    pub fn should_terminate() -> bool {
        SIGNAL_RECEIVED.load(Ordering::Relaxed)
    }

    /// The signal that triggered the shutdown, if any.
    pub fn received_signal() -> Option<i32> {
        if should_terminate() {
            Some(LAST_SIGNAL.load(Ordering::Relaxed) as i32)
        } else {
            None
        }
    }

    /// Runs the default handler of the given signal, terminating the process for the signals in
    /// [`TERM_SIGNALS`].
    pub fn reraise(signal: i32) -> Result<(), Error> {
        signal_hook::low_level::emulate_default_handler(signal)
    }
}
