//! Single-instance gate for management commands
//!
//! Commands that change shared install state run one at a time across all
//! launcher processes. Ordinary launches are never gated.
//!
//! Windows uses a named semaphore; a crashed holder cannot wedge the gate
//! because the kernel drops the object with its last handle. Other platforms
//! use an exclusive `flock` on a lock file, which the kernel also releases
//! when the holder exits.

use std::time::Duration;

use tracing::debug;

use crate::core::config::GateConfig;
use crate::core::error::LaunchError;

/// Printed once when the bounded wait runs out.
pub const WAITING_NOTICE: &str = "Waiting for other operations to complete. . .";

pub struct InstanceGate {
    name: String,
    notice_after: Duration,
}

/// Held while a gated operation runs; releases on drop.
pub struct GateGuard {
    lock: platform::Lock,
}

impl InstanceGate {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            name: config.name.clone(),
            notice_after: Duration::from_millis(u64::from(config.notice_after_ms)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the gate, printing the standard notice if it takes a while.
    pub fn acquire(&self) -> Result<GateGuard, LaunchError> {
        self.acquire_with_notice(|| eprintln!("{WAITING_NOTICE}"))
    }

    /// Acquire the gate. After the bounded wait expires `notice` runs once
    /// and the wait continues without a limit.
    pub fn acquire_with_notice(&self, notice: impl FnOnce()) -> Result<GateGuard, LaunchError> {
        let lock = platform::Lock::open(&self.name)?;
        if lock.needs_wait() {
            debug!("Gate {} is busy", self.name);
            if !lock.wait(Some(self.notice_after))? {
                notice();
                if !lock.wait(None)? {
                    return Err(LaunchError::Os {
                        context: "wait for gate",
                        code: crate::core::error::WAIT_TIMEOUT_CODE,
                    });
                }
            }
        }
        Ok(GateGuard { lock })
    }

    /// Run `op` while holding the gate.
    pub fn run<T>(&self, op: impl FnOnce() -> T) -> Result<T, LaunchError> {
        let _guard = self.acquire()?;
        Ok(op())
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(windows)]
mod platform {
    use std::time::Duration;

    use crate::core::error::LaunchError;
    use crate::windows::semaphore::NamedSemaphore;

    pub struct Lock(NamedSemaphore);

    impl Lock {
        pub fn open(name: &str) -> Result<Self, LaunchError> {
            NamedSemaphore::create(name).map(Lock)
        }

        /// A semaphore we created starts out owned.
        pub fn needs_wait(&self) -> bool {
            self.0.already_existed()
        }

        pub fn wait(&self, timeout: Option<Duration>) -> Result<bool, LaunchError> {
            self.0.wait(timeout)
        }

        pub fn release(&self) {
            self.0.release();
        }
    }
}

#[cfg(unix)]
mod platform {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::unix::io::AsRawFd;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use crate::core::error::LaunchError;

    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    pub struct Lock {
        file: File,
        held: std::cell::Cell<bool>,
    }

    fn lock_path(name: &str) -> PathBuf {
        let dir = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        let stem: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        dir.join(format!("{stem}.lock"))
    }

    fn flock(file: &File, operation: libc::c_int) -> io::Result<bool> {
        loop {
            // SAFETY: the descriptor is owned by `file` for the whole call
            let result = unsafe { libc::flock(file.as_raw_fd(), operation) };
            if result == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::EWOULDBLOCK) => return Ok(false),
                _ => return Err(err),
            }
        }
    }

    impl Lock {
        pub fn open(name: &str) -> Result<Self, LaunchError> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(lock_path(name))?;
            let held = flock(&file, libc::LOCK_EX | libc::LOCK_NB)?;
            Ok(Self { file, held: std::cell::Cell::new(held) })
        }

        pub fn needs_wait(&self) -> bool {
            !self.held.get()
        }

        pub fn wait(&self, timeout: Option<Duration>) -> Result<bool, LaunchError> {
            let Some(timeout) = timeout else {
                flock(&self.file, libc::LOCK_EX)?;
                self.held.set(true);
                return Ok(true);
            };
            let deadline = Instant::now() + timeout;
            loop {
                if flock(&self.file, libc::LOCK_EX | libc::LOCK_NB)? {
                    self.held.set(true);
                    return Ok(true);
                }
                let now = Instant::now();
                if now >= deadline {
                    return Ok(false);
                }
                std::thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
        }

        pub fn release(&self) {
            if self.held.replace(false) {
                let _ = flock(&self.file, libc::LOCK_UN);
            }
        }
    }
}
