//! Audio session lifecycle.
//!
//! The session stands for the process-wide output device. It is created once
//! by the engine builder, resumed before first playback and closed on
//! dispose.

use crate::{Error, Result};

pub trait AudioSession: Send {
    fn sample_rate(&self) -> f64;

    fn resume(&mut self) -> Result<()>;

    fn suspend(&mut self) -> Result<()>;

    /// Release the device. Further `resume` calls fail.
    fn close(&mut self);

    fn is_running(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Suspended,
    Running,
    Closed,
}

/// Session without a device, driven by explicit `process_block` calls.
#[derive(Debug)]
pub struct HeadlessSession {
    sample_rate: f64,
    state: SessionState,
}

impl HeadlessSession {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            state: SessionState::Suspended,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }
}

impl AudioSession for HeadlessSession {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn resume(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => Err(Error::NotInitialized),
            _ => {
                self.state = SessionState::Running;
                Ok(())
            }
        }
    }

    fn suspend(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => Err(Error::NotInitialized),
            _ => {
                self.state = SessionState::Suspended;
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}
