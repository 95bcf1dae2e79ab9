use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{info, warn};

use crate::config::UPLOAD_TEMP_DIR;

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(self.temp_root()).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    fn temp_root(&self) -> PathBuf {
        self.root.join(UPLOAD_TEMP_DIR)
    }

    /// 为新上传生成唯一的临时路径，保留原始扩展名。
    pub fn temp_path_for(&self, original_name: &str) -> PathBuf {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.temp_root().join(format!("{stamp}{extension}"))
    }

    pub async fn slot_occupied(&self, filename: &str) -> io::Result<bool> {
        match fs::metadata(self.slot_path(filename)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// 列出存储根目录下的文件名，临时目录不计入。
    pub async fn list_files(&self) -> io::Result<Vec<String>> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().to_string());
        }

        names.sort();
        Ok(names)
    }

    /// 清理超过 TTL 的临时上传文件。
    pub async fn cleanup_stale_temps(&self, ttl: Duration) -> io::Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        let temp_root = self.temp_root();
        if fs::metadata(&temp_root).await.is_err() {
            return Ok(());
        }

        let now = SystemTime::now();
        let mut dir = fs::read_dir(&temp_root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(value) => value,
                Err(_) => continue,
            };
            let age = match now.duration_since(modified) {
                Ok(value) => value,
                Err(_) => continue,
            };
            if age >= ttl {
                let path = entry.path();
                if let Err(err) = fs::remove_file(&path).await {
                    warn!(path = ?path, error = %err, "failed to remove stale upload temp file");
                } else {
                    info!(path = ?path, "removed stale upload temp file");
                }
            }
        }

        Ok(())
    }
}
