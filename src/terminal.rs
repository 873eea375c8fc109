use std::io::IsTerminal;

/// Reports whether the standard streams are attached to a terminal.
pub trait TerminalClient {
    /// Returns `true` when stdout is interactive.
    fn stdout_is_terminal(&self) -> bool;

    /// Returns `true` when stderr is interactive.
    fn stderr_is_terminal(&self) -> bool;
}

/// Terminal client backed by the process's real streams.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SystemTerminalClient;

impl TerminalClient for SystemTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        std::io::stdout().is_terminal()
    }

    fn stderr_is_terminal(&self) -> bool {
        std::io::stderr().is_terminal()
    }
}
