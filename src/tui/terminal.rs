//! Terminal input and mode handling
//!
//! Stdin is read with raw `read(2)` calls rather than `std::io::stdin()`:
//! std buffers ahead, and buffered bytes would be invisible to `poll(2)`.

use std::io;
use std::time::Duration;
use tracing::debug;

/// A single input source that can be waited on with a timeout.
pub trait Console {
    /// Wait until a byte is readable or `timeout` elapses.
    /// `Ok(true)` means input is ready.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read one byte. `Ok(None)` at end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Stdin of the current process.
#[derive(Debug, Default)]
pub struct StdinConsole;

impl Console for StdinConsole {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut fds = [libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        }];
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `fds` is a live array of exactly one pollfd.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            // A signal cut the wait short; treat it as a plain timeout.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(rc > 0)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            // SAFETY: the buffer is one writable byte and the count is 1.
            let n = unsafe {
                libc::read(
                    libc::STDIN_FILENO,
                    &mut byte as *mut u8 as *mut libc::c_void,
                    1,
                )
            };
            match n {
                1 => return Ok(Some(byte)),
                0 => return Ok(None),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() != io::ErrorKind::Interrupted {
                        return Err(err);
                    }
                }
            }
        }
    }
}

/// Switches a terminal into per-keystroke input and back.
pub trait ModeControl {
    fn enter_raw(&mut self) -> io::Result<()>;
    fn restore(&mut self) -> io::Result<()>;
}

/// termios on stdin. Only `ICANON` is cleared: echo and output
/// processing stay as they were.
#[derive(Default)]
pub struct Termios {
    saved: Option<libc::termios>,
}

impl Termios {
    pub fn stdin() -> Self {
        Self::default()
    }
}

impl ModeControl for Termios {
    fn enter_raw(&mut self) -> io::Result<()> {
        // SAFETY: isatty only inspects the descriptor.
        if unsafe { libc::isatty(libc::STDIN_FILENO) } == 0 {
            debug!("stdin is not a terminal; leaving input mode unchanged");
            return Ok(());
        }

        let mut original = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr writes a full termios through a valid pointer.
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, original.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: tcgetattr succeeded and filled the struct.
        let original = unsafe { original.assume_init() };

        let mut raw = original;
        raw.c_lflag &= !libc::ICANON;
        // SAFETY: `raw` is an initialized termios that outlives the call.
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        self.saved = Some(original);
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        if let Some(original) = self.saved.take() {
            // SAFETY: `original` came from a successful tcgetattr.
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &original) } != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

/// Holds a terminal in raw mode; restores it exactly once, on `restore`
/// or on drop, whichever comes first.
pub struct ModeGuard<M: ModeControl> {
    mode: M,
    active: bool,
}

impl<M: ModeControl> ModeGuard<M> {
    pub fn enter(mut mode: M) -> io::Result<Self> {
        mode.enter_raw()?;
        Ok(Self { mode, active: true })
    }

    pub fn restore(mut self) -> io::Result<()> {
        self.restore_now()
    }

    fn restore_now(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.mode.restore()
    }
}

impl<M: ModeControl> Drop for ModeGuard<M> {
    fn drop(&mut self) {
        let _ = self.restore_now();
    }
}
