use super::Platform;

pub struct NativePlatform;

impl Platform for NativePlatform {
    fn default_shell() -> &'static str {
        "sh"
    }

    fn quote_arg(value: &str) -> String {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_survives_embedded_quotes() {
        assert_eq!(NativePlatform::quote_arg("plain"), "'plain'");
        assert_eq!(NativePlatform::quote_arg("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn shell_inline_runs_through_sh() {
        let out = NativePlatform::shell_inline("printf %s hello")
            .output()
            .await
            .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout), "hello");
    }
}
