//! Inbound commands to the lifecycle controller.
//!
//! These represent actions requested through the host's command surface.
//! Unknown names parse to [`UnknownCommand`] and are reported as
//! failures, never raised.

use core::fmt;
use core::str::FromStr;

/// Commands accepted by [`DimLed::do_command`](super::service::DimLed::do_command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Start the control loop (no-op if already running).
    Start,
    /// Stop the control loop (no-op if not running).
    Stop,
    /// Run one flash sequence and wait for it to finish.
    Test,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Start, Command::Stop, Command::Test];

    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned for command names outside [`Command::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCommand(s.to_owned()))
    }
}
