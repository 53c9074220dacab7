/// OS-specific process plumbing. Each OS provides its own `NativePlatform` so the
/// generation pipeline stays free of `#[cfg]` blocks.
pub trait Platform {
    /// Shell used to run generation command templates.
    fn default_shell() -> &'static str;

    /// Build a **tokio** `Command` that runs an inline shell string.
    fn shell_inline(command: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(Self::default_shell());
        cmd.arg("-c").arg(command);
        cmd
    }

    /// Quote one value so the shell passes it through as a single argument.
    fn quote_arg(value: &str) -> String;
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
