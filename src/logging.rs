use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

pub const LOG_FILE_NAME: &str = "agent.log";

/// Tees every formatted log line to stdout and to `logs/agent.log`.
#[derive(Clone)]
pub(crate) struct TeeMakeWriter {
    pub file: Option<Arc<Mutex<File>>>,
    pub suppress_stdout: bool,
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.clone(),
            suppress_stdout: self.suppress_stdout,
        }
    }
}

pub(crate) struct TeeWriter {
    file: Option<Arc<Mutex<File>>>,
    suppress_stdout: bool,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            // File errors are dropped; stdout still gets the line.
            let _ = file.write_all(buf);
        }
        if !self.suppress_stdout {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.flush();
        }
        if !self.suppress_stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}

fn open_log_file(logs_dir: &Path) -> Result<File> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("creating {}", logs_dir.display()))?;
    let path = logs_dir.join(LOG_FILE_NAME);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))
}

/// Installs the global subscriber. If the log file cannot be opened, logging continues
/// on stdout only and the reason is returned for the caller to report.
pub(crate) fn init(logs_dir: &Path, verbose: bool, quiet: bool) -> Option<String> {
    let (file, problem) = match open_log_file(logs_dir) {
        Ok(file) => (Some(Arc::new(Mutex::new(file))), None),
        Err(e) => (None, Some(format!("{:#}", e))),
    };
    let make_writer = TeeMakeWriter {
        file,
        suppress_stdout: quiet,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_ansi(false)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    problem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tee_writer_appends_to_file_when_stdout_suppressed() {
        let tmp = tempfile::tempdir().unwrap();
        let file = open_log_file(&tmp.path().join("logs")).unwrap();
        let make = TeeMakeWriter {
            file: Some(Arc::new(Mutex::new(file))),
            suppress_stdout: true,
        };

        let mut writer = make.make_writer();
        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();
        writer.flush().unwrap();

        let logged = std::fs::read_to_string(tmp.path().join("logs").join(LOG_FILE_NAME)).unwrap();
        assert_eq!(logged, "first line\nsecond line\n");
    }

    #[test]
    fn open_log_file_fails_under_a_regular_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(open_log_file(&blocker.join("logs")).is_err());
    }
}
