//! 外部 PDF 分析服务的调用客户端。

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    path: &'a str,
}

#[derive(Debug)]
pub enum AnalyzeError {
    Transport(reqwest::Error),
    Status(StatusCode),
}

impl fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzeError::Transport(err) => write!(f, "analyzer request failed: {err}"),
            AnalyzeError::Status(status) => write!(f, "analyzer returned status {status}"),
        }
    }
}

/// 分析服务客户端。请求不设超时，与外部路由等长等待。
#[derive(Clone, Debug)]
pub struct Analyzer {
    client: Client,
    endpoint: String,
}

impl Analyzer {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    /// 以存储路径调用外部分析路由，原样返回其 JSON 结果。
    pub async fn analyze(&self, path: &Path) -> Result<Value, AnalyzeError> {
        let path_str = path.to_string_lossy();
        debug!(path = ?path, endpoint = %self.endpoint, "invoking analyzer");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { path: &path_str })
            .send()
            .await
            .map_err(AnalyzeError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzeError::Status(status));
        }

        let result = response
            .json::<Value>()
            .await
            .map_err(AnalyzeError::Transport)?;
        info!(path = ?path, "analysis complete");
        Ok(result)
    }
}
