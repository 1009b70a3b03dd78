// 异常记录模块
// 捕获失败时的上下文并写入独立的 JSON 文件，随后原样返回错误

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::future::Future;
use std::path::{Path, PathBuf};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl SystemInfo {
    fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

/// 单条异常记录，对应磁盘上的一个文件
#[derive(Debug, Serialize)]
pub struct ExceptionRecord {
    pub exception_id: String,
    pub exception_type: String,
    pub exception_message: String,
    pub source_chain: Vec<String>,
    pub function_category: String,
    pub function: String,
    pub backtrace: String,
    pub system_info: SystemInfo,
    pub timestamp: String,
    #[serde(skip)]
    created_at: DateTime<Local>,
}

impl ExceptionRecord {
    pub fn from_error<E: StdError>(category: &str, function: &str, err: &E) -> Self {
        let mut source_chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            source_chain.push(cause.to_string());
            source = cause.source();
        }

        Self::build(
            category,
            function,
            std::any::type_name::<E>().to_string(),
            err.to_string(),
            source_chain,
        )
    }

    pub fn from_panic(category: &str, function: &str, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Self::build(category, function, "panic".to_string(), message, Vec::new())
    }

    fn build(
        category: &str,
        function: &str,
        exception_type: String,
        exception_message: String,
        source_chain: Vec<String>,
    ) -> Self {
        let created_at = Local::now();
        Self {
            exception_id: Uuid::new_v4().to_string(),
            exception_type,
            exception_message,
            source_chain,
            function_category: category.to_string(),
            function: function.to_string(),
            backtrace: Backtrace::force_capture().to_string(),
            system_info: SystemInfo::current(),
            timestamp: created_at.to_rfc3339(),
            created_at,
        }
    }

    /// 文件名格式：`[<id> <dd.mm.YYYY HH.MM.SS>] <category> <function>.json`
    pub fn file_name(&self) -> String {
        let date = self.created_at.format("%d.%m.%Y %H.%M.%S");
        format!(
            "[{} {}] {} {}.json",
            self.exception_id, date, self.function_category, self.function
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExceptionRecorder {
    dir: PathBuf,
}

impl ExceptionRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 执行 future，失败时先写入异常记录，再把原始错误原样返回
    pub async fn observe<T, E, F>(&self, category: &str, function: &str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: StdError,
    {
        let result = fut.await;
        if let Err(err) = &result {
            let record = ExceptionRecord::from_error(category, function, err);
            if let Err(io_err) = self.write(&record).await {
                tracing::warn!("Failed to persist exception record: {}", io_err);
            }
        }
        result
    }

    pub async fn write(&self, record: &ExceptionRecord) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(record.file_name());
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }

    /// panic 钩子在同步上下文中运行，只能阻塞写入
    pub fn write_blocking(&self, record: &ExceptionRecord) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(record.file_name());
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// 供 `CatchPanicLayer` 使用：记录 panic 并返回 500
    pub fn handle_panic(&self, payload: Box<dyn Any + Send + 'static>) -> Response {
        let record = ExceptionRecord::from_panic("http", "handler", payload.as_ref());
        tracing::error!("Handler panicked: {}", record.exception_message);
        if let Err(io_err) = self.write_blocking(&record) {
            tracing::warn!("Failed to persist panic record: {}", io_err);
        }

        let body: Json<_> =
            error_to_api_response::<()>(error_codes::INTERNAL_ERROR, "内部服务器错误".to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct Boom;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rbac-diag-{}-{}", name, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn observe_passes_success_through_without_writing() {
        let dir = temp_dir("ok");
        let recorder = ExceptionRecorder::new(&dir);

        let value = recorder
            .observe("tests", "ok", async { Ok::<_, Boom>(7) })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn observe_records_and_returns_original_error() {
        let dir = temp_dir("err");
        let recorder = ExceptionRecorder::new(&dir);

        let err = recorder
            .observe("tests", "explode", async { Err::<(), _>(Boom) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with('['));
        assert!(name.ends_with("] tests explode.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["exception_message"], "disk on fire");
        assert_eq!(json["function_category"], "tests");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_name_uses_record_timestamp() {
        let record = ExceptionRecord::from_error("tests", "stamp", &Boom);
        let stamped = DateTime::parse_from_rfc3339(&record.timestamp).unwrap();
        let expected = format!(
            "[{} {}] tests stamp.json",
            record.exception_id,
            stamped.format("%d.%m.%Y %H.%M.%S")
        );

        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(record.file_name(), expected);
    }

    #[tokio::test]
    async fn catch_panic_layer_records_and_returns_500() {
        use axum::{Router, body::Body, http::Request, routing::get};
        use tower::ServiceExt;
        use tower_http::catch_panic::CatchPanicLayer;

        async fn explode() -> &'static str {
            panic!("handler exploded")
        }

        let dir = temp_dir("panic");
        let recorder = ExceptionRecorder::new(&dir);
        let app = Router::new().route("/boom", get(explode)).layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| recorder.handle_panic(payload),
        ));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["exception_type"], "panic");
        assert_eq!(json["exception_message"], "handler exploded");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn panic_payload_message_is_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("kaboom");
        let record = ExceptionRecord::from_panic("http", "handler", payload.as_ref());
        assert_eq!(record.exception_message, "kaboom");
        assert_eq!(record.exception_type, "panic");
    }
}
