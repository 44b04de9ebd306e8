use crate::qemu_trace;
use core::sync::atomic::{AtomicPtr, Ordering};
use kernel_sync::OnceSlot;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

fn no_clock() -> u64 {
    0
}

/// Source of the tick prefix; swapped in once the timer is running.
static CLOCK: AtomicPtr<()> = AtomicPtr::new(no_clock as *mut ());

pub struct QemuLogger {
    max_level: LevelFilter,
}

impl QemuLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install as the global logger. Call once, before anything logs.
    ///
    /// # Errors
    /// If a logger is already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        static LOGGER: OnceSlot<QemuLogger> = OnceSlot::new();

        let level = self.max_level;
        log::set_logger(LOGGER.get_or_init(move || self))?;
        log::set_max_level(level);
        Ok(())
    }

    /// Prefix every subsequent line with `clock()`.
    pub fn set_clock(clock: fn() -> u64) {
        CLOCK.store(clock as *mut (), Ordering::Release);
    }

    fn now() -> u64 {
        let raw = CLOCK.load(Ordering::Acquire);
        // SAFETY: CLOCK only ever holds a `fn() -> u64`.
        let clock: fn() -> u64 = unsafe { core::mem::transmute(raw) };
        clock()
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        qemu_trace!(
            "[{:>8} {:<5} {}] {}\n",
            Self::now(),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}
