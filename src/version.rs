//! 服务构建信息处理器。

use axum::response::Json as JsonResponse;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    name: &'static str,
    version: &'static str,
    build_time: &'static str,
    rust_version: &'static str,
}

/// 返回服务名称与构建信息。
pub async fn get_version_info() -> Result<JsonResponse<VersionInfo>, ApiError> {
    let version_info = VersionInfo {
        name: crate::build::PROJECT_NAME,
        version: crate::build::PKG_VERSION,
        build_time: crate::build::BUILD_TIME,
        rust_version: crate::build::RUST_VERSION,
    };
    Ok(JsonResponse(version_info))
}
