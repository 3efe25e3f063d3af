//! Interactive controller
//!
//! Drives the refresh loop: wait up to the current delay for a keystroke,
//! handle at most one command, then redraw. The wait is the only place the
//! loop blocks, so a quiet keyboard never holds back a refresh.

use super::terminal::{Console, ModeControl, ModeGuard};
use crate::config::{DashboardConfig, RefreshDelay};
use std::io::{self, Write};
use tracing::{debug, error, warn};

const DELAY_PROMPT: &str = "Enter num seconds to delay (1-10): ";
const MAX_DELAY_INPUT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Quitting,
}

pub struct InteractiveController {
    config: DashboardConfig,
    state: ControllerState,
}

impl InteractiveController {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            state: ControllerState::Running,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn delay(&self) -> RefreshDelay {
        self.config.delay
    }

    /// Run until quit, redrawing through `refresh` after every wait.
    ///
    /// The terminal is switched to per-keystroke input for the duration and
    /// restored on every way out: `q`, a stdin failure, or an error from
    /// `refresh`.
    pub fn run<C, M, W, F>(
        &mut self,
        console: &mut C,
        mode: M,
        out: &mut W,
        mut refresh: F,
    ) -> io::Result<()>
    where
        C: Console,
        M: ModeControl,
        W: Write,
        F: FnMut(&mut W, RefreshDelay) -> io::Result<()>,
    {
        let guard = ModeGuard::enter(mode)?;

        while self.state == ControllerState::Running {
            if self.step(console, out)? == ControllerState::Quitting {
                break;
            }
            refresh(out, self.config.delay)?;
        }

        guard.restore()
    }

    /// One wait plus at most one command.
    ///
    /// Input failures move the controller to `Quitting`; only errors
    /// writing to `out` are returned.
    pub fn step<C: Console, W: Write>(
        &mut self,
        console: &mut C,
        out: &mut W,
    ) -> io::Result<ControllerState> {
        let ready = match console.wait_readable(self.config.delay.as_duration()) {
            Ok(ready) => ready,
            Err(e) => return Ok(self.input_failed(&e)),
        };
        if !ready {
            return Ok(self.state);
        }

        let key = match console.read_byte() {
            Ok(Some(key)) => key,
            Ok(None) => {
                return Ok(self.input_failed(&io::Error::from(io::ErrorKind::UnexpectedEof)))
            }
            Err(e) => return Ok(self.input_failed(&e)),
        };

        // Erase the echoed key.
        write!(out, "\x08")?;

        match key {
            b'd' => self.prompt_delay(console, out)?,
            b'q' => self.state = ControllerState::Quitting,
            other => warn!("'{}' not recognized", other as char),
        }

        Ok(self.state)
    }

    fn prompt_delay<C: Console, W: Write>(&mut self, console: &mut C, out: &mut W) -> io::Result<()> {
        write!(out, "{}", DELAY_PROMPT)?;
        out.flush()?;

        let mut line = Vec::new();
        loop {
            match console.read_byte() {
                Ok(Some(b'\n' | b'\r')) | Ok(None) => break,
                Ok(Some(byte)) => {
                    if line.len() < MAX_DELAY_INPUT {
                        line.push(byte);
                    }
                }
                Err(e) => {
                    self.input_failed(&e);
                    return Ok(());
                }
            }
        }

        match parse_delay(&String::from_utf8_lossy(&line)) {
            Some(secs) => {
                self.config.delay = RefreshDelay::clamped(secs);
                debug!(requested = secs, delay = %self.config.delay, "refresh delay changed");
            }
            None => debug!(input = %String::from_utf8_lossy(&line), "delay left unchanged"),
        }
        Ok(())
    }

    fn input_failed(&mut self, err: &io::Error) -> ControllerState {
        error!("Read error on stdin: {}", err);
        self.state = ControllerState::Quitting;
        self.state
    }
}

/// Leading integer of `input`, after whitespace, with an optional sign.
/// Trailing text is ignored. Digits too large for `i64` saturate so they
/// still count as out of range.
pub fn parse_delay(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let digits = &rest[..digits_len];
    let value = match digits.parse::<i64>() {
        Ok(v) => v,
        Err(_) => i64::MAX,
    };
    Some(if negative { -value } else { value })
}
