//! 文件列表处理器。

use axum::extract::Extension;
use axum::response::Json as JsonResponse;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::storage::Storage;

/// 列出存储目录中当前保存的文件名。
pub async fn list_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Vec<String>>, ApiError> {
    let names = storage
        .list_files()
        .await
        .map_err(|err| ApiError::ReadDir(err.to_string()))?;
    info!(count = names.len(), "list files");
    Ok(JsonResponse(names))
}
