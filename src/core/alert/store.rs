use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::Alert;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only on-disk mirror of alerts and the communications rendered for them.
/// The in-memory history stays the source of truth; these files are a side-effect log.
#[derive(Debug, Clone)]
pub struct AlertStore {
    alerts_dir: PathBuf,
    logs_dir: PathBuf,
}

impl AlertStore {
    pub fn new(alerts_dir: impl Into<PathBuf>, logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            alerts_dir: alerts_dir.into(),
            logs_dir: logs_dir.into(),
        }
    }

    pub fn alerts_dir(&self) -> &Path {
        &self.alerts_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn alert_path(&self, alert_id: &str) -> PathBuf {
        self.alerts_dir.join(format!("{}.json", alert_id))
    }

    pub fn communication_path(&self, alert_id: &str) -> PathBuf {
        self.logs_dir
            .join(format!("{}_communication.json", alert_id))
    }

    pub fn email_path(&self, alert_id: &str) -> PathBuf {
        self.logs_dir.join(format!("{}_email.txt", alert_id))
    }

    pub async fn persist_alert(&self, alert: &Alert) -> Result<PathBuf, PersistError> {
        let path = self.alert_path(&alert.id);
        write_json(&self.alerts_dir, &path, alert, &format!("alert {}", alert.id)).await?;
        Ok(path)
    }

    /// Writes the structured communication log and the plain-text email body.
    pub async fn persist_communication<T: Serialize>(
        &self,
        alert_id: &str,
        record: &T,
        email_body: &str,
    ) -> Result<(PathBuf, PathBuf), PersistError> {
        let json_path = self.communication_path(alert_id);
        write_json(
            &self.logs_dir,
            &json_path,
            record,
            &format!("communication for {}", alert_id),
        )
        .await?;

        let email_path = self.email_path(alert_id);
        tokio::fs::write(&email_path, email_body)
            .await
            .map_err(|source| PersistError::Write {
                path: email_path.clone(),
                source,
            })?;
        Ok((json_path, email_path))
    }
}

async fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    path: &Path,
    value: &T,
    what: &str,
) -> Result<(), PersistError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| PersistError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    let body = serde_json::to_string_pretty(value).map_err(|source| PersistError::Serialize {
        what: what.to_string(),
        source,
    })?;
    tokio::fs::write(path, body)
        .await
        .map_err(|source| PersistError::Write {
            path: path.to_path_buf(),
            source,
        })
}
