//! 上传临时文件清理的后台任务。

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::TEMP_CLEAN_INTERVAL_SECS;
use crate::storage::Storage;

/// 启动后台任务（过期上传临时文件清理）。
pub fn spawn_background_tasks(storage: Arc<Storage>, temp_ttl: Duration) {
    if temp_ttl.is_zero() {
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(TEMP_CLEAN_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(err) = storage.cleanup_stale_temps(temp_ttl).await {
                warn!(error = %err, "upload temp cleanup failed");
            }
        }
    });
}
