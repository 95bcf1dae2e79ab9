//! 上传处理器：摄取 multipart 文件、分配槽位并触发外部分析。

use axum::extract::{Extension, Multipart};
use axum::response::Json as JsonResponse;
use futures_util::stream::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::analyze::Analyzer;
use crate::config::UPLOAD_FIELD_NAME;
use crate::error::ApiError;
use crate::slots::{AllocError, SlotAllocator};
use crate::storage::Storage;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadedFile {
    original_name: String,
    filename: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    message: String,
    file: UploadedFile,
    ai_result: Value,
}

/// 处理单文件上传：写入临时文件 → 槽位分配 → 外部分析 → 组合响应。
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    Extension(allocator): Extension<Arc<SlotAllocator>>,
    Extension(analyzer): Extension<Arc<Analyzer>>,
    mut multipart: Multipart,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    // 其余字段跳过，只摄取第一个名为 file 的字段。
    let mut stored = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }
        let original_name = field.file_name().unwrap_or("upload.pdf").to_string();

        let temp_path = storage.temp_path_for(&original_name);
        let mut file = File::create(&temp_path).await?;

        let write_result: Result<u64, ApiError> = async {
            let mut total_written: u64 = 0;
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(|err| ApiError::Internal(err.to_string()))?;
                if chunk.is_empty() {
                    continue;
                }
                total_written += chunk.len() as u64;
                file.write_all(&chunk).await?;
            }
            file.sync_all().await?;
            Ok(total_written)
        }
        .await;
        let total_written = match write_result {
            Ok(value) => value,
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(err);
            }
        };
        drop(file);
        stored = Some((original_name, temp_path, total_written));
        break;
    }

    let Some((original_name, temp_path, total_written)) = stored else {
        return Err(ApiError::BadRequest("file field is required".into()));
    };
    debug!(
        original_name = %original_name,
        bytes = total_written,
        temp = ?temp_path,
        "upload ingested"
    );

    let (slot, target) = match allocator.allocate(&temp_path).await {
        Ok(value) => value,
        Err(AllocError::Capacity) => return Err(ApiError::Capacity),
        Err(AllocError::Io(err)) => return Err(ApiError::Internal(err.to_string())),
    };

    let ai_result = analyzer
        .analyze(&target)
        .await
        .map_err(|err| ApiError::Analysis(err.to_string()))?;

    info!(
        original_name = %original_name,
        filename = slot.canonical_filename(),
        "file uploaded"
    );
    Ok(JsonResponse(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file: UploadedFile {
            original_name,
            filename: slot.canonical_filename().to_string(),
        },
        ai_result,
    }))
}

#[cfg(test)]
mod tests {
    use super::upload_file;
    use axum::Json;
    use axum::body::Body;
    use axum::extract::Extension;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::routing::{get, post};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::fs;
    use tower::ServiceExt;

    use crate::analyze::Analyzer;
    use crate::files::list_files;
    use crate::slots::SlotAllocator;
    use crate::storage::Storage;

    async fn spawn_analyzer(status: StatusCode) -> String {
        let app = Router::new().route(
            "/analyze",
            post(move |Json(body): Json<Value>| async move {
                (
                    status,
                    Json(json!({ "receivedPath": body["path"].clone(), "summary": "ok" })),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind analyzer");
        let endpoint = format!("http://{}/analyze", listener.local_addr().expect("addr"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve analyzer");
        });
        endpoint
    }

    async fn make_app(analyzer_url: String) -> (tempfile::TempDir, Arc<Storage>, Router) {
        let temp = tempdir().expect("tempdir");
        let storage = Arc::new(Storage::new(temp.path().join("storage")));
        storage.ensure_root().await.expect("ensure root");
        let allocator = Arc::new(SlotAllocator::new(storage.clone()));
        let app = Router::new()
            .route("/upload", post(upload_file))
            .route("/files", get(list_files))
            .layer(Extension(storage.clone()))
            .layer(Extension(allocator))
            .layer(Extension(Arc::new(Analyzer::new(analyzer_url))));
        (temp, storage, app)
    }

    fn multipart_request(field_name: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "pdfpair-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"{field_name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn uploads_fill_slots_in_order_then_reject() {
        let endpoint = spawn_analyzer(StatusCode::OK).await;
        let (_temp, storage, app) = make_app(endpoint).await;

        let response = app
            .clone()
            .oneshot(multipart_request("file", "report.pdf", b"%PDF-1.4 first"))
            .await
            .expect("first upload");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], "File uploaded successfully");
        assert_eq!(body["file"]["originalName"], "report.pdf");
        assert_eq!(body["file"]["filename"], "pdf_a.pdf");
        assert!(
            body["aiResult"]["receivedPath"]
                .as_str()
                .expect("receivedPath")
                .ends_with("pdf_a.pdf")
        );

        let response = app
            .clone()
            .oneshot(multipart_request("file", "invoice.pdf", b"%PDF-1.4 second"))
            .await
            .expect("second upload");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["file"]["filename"], "pdf_b.pdf");

        let response = app
            .clone()
            .oneshot(multipart_request("file", "extra.pdf", b"%PDF-1.4 third"))
            .await
            .expect("third upload");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Only two PDFs allowed: pdf_a and pdf_b.");

        // 满载拒绝后已有槽位内容保持不变。
        assert_eq!(
            fs::read(storage.slot_path("pdf_a.pdf")).await.expect("read a"),
            b"%PDF-1.4 first"
        );
        assert_eq!(
            fs::read(storage.slot_path("pdf_b.pdf")).await.expect("read b"),
            b"%PDF-1.4 second"
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/files")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("list files");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body, json!(["pdf_a.pdf", "pdf_b.pdf"]));
    }

    #[tokio::test]
    async fn extra_fields_before_file_are_ignored() {
        let endpoint = spawn_analyzer(StatusCode::OK).await;
        let (_temp, storage, app) = make_app(endpoint).await;

        let boundary = "pdfpair-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"note\"\r\n\r\ncompare these\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"file\"; filename=\"report.pdf\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"%PDF-1.4 first");
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request");

        let response = app.oneshot(request).await.expect("upload");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["file"]["filename"], "pdf_a.pdf");
        assert_eq!(
            fs::read(storage.slot_path("pdf_a.pdf")).await.expect("read a"),
            b"%PDF-1.4 first"
        );
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let endpoint = spawn_analyzer(StatusCode::OK).await;
        let (_temp, _storage, app) = make_app(endpoint).await;

        let response = app
            .oneshot(multipart_request("attachment", "report.pdf", b"%PDF-1.4"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "file field is required");
    }

    #[tokio::test]
    async fn analyzer_failure_returns_generic_error_and_keeps_slot_file() {
        let endpoint = spawn_analyzer(StatusCode::INTERNAL_SERVER_ERROR).await;
        let (_temp, storage, app) = make_app(endpoint).await;

        let response = app
            .oneshot(multipart_request("file", "report.pdf", b"%PDF-1.4 first"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Upload failed");

        // 分析失败不回滚已写入的槽位文件。
        assert_eq!(
            fs::read(storage.slot_path("pdf_a.pdf")).await.expect("read a"),
            b"%PDF-1.4 first"
        );
    }

    #[tokio::test]
    async fn unreachable_analyzer_returns_generic_error() {
        let (_temp, _storage, app) =
            make_app("http://127.0.0.1:1/analyze".to_string()).await;

        let response = app
            .oneshot(multipart_request("file", "report.pdf", b"%PDF-1.4"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Upload failed");
    }
}
