use super::Platform;

pub struct NativePlatform;

impl Platform for NativePlatform {
    /// Git Bash or WSL `bash` on PATH.
    fn default_shell() -> &'static str {
        "bash"
    }

    fn quote_arg(value: &str) -> String {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
