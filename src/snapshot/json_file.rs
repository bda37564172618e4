use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ArenaError, Result};

use super::{ArenaSnapshot, SnapshotSink};

/// Pretty JSON file, replaced atomically on every write
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotSink for JsonFileSink {
    async fn write(&self, snapshot: &ArenaSnapshot) -> Result<()> {
        let body = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            ArenaError::Snapshot(format!(
                "failed to move snapshot into {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), cycle = snapshot.current_cycle, "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_readable_json() {
        let dir = std::env::temp_dir().join(format!("arena-snapshot-{}", uuid::Uuid::new_v4()));
        let path = dir.join("state.json");
        let sink = JsonFileSink::new(&path);

        sink.write(&ArenaSnapshot::new(4, 10, vec![])).await.unwrap();
        sink.write(&ArenaSnapshot::new(5, 10, vec![])).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ArenaSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.current_cycle, 5);
        assert!(!sink.temp_path().exists());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
