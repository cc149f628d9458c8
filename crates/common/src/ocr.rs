//! OCR engine abstraction
//!
//! Wraps the cloud OCR task protocol: submit a scanned document, poll the
//! task until it completes, fetch the recognized docx from the result URL.
//! Responses from the service are small XML envelopes with a single `task`
//! element carrying the state as attributes.

use crate::config::OcrConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::time::Duration;

/// Kind of input the OCR service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Classify a file by its name. Anything that is not a PDF or a
    /// raster image is rejected before the upload leaves the gateway.
    pub fn detect(file_name: &str) -> Option<Self> {
        let mime = mime_guess::from_path(file_name).first()?;
        if mime.essence_str() == "application/pdf" {
            Some(Self::Pdf)
        } else if mime.type_() == mime_guess::mime::IMAGE {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// Lifecycle states reported by the OCR service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Submitted,
    Queued,
    InProgress,
    Completed,
    ProcessingFailed,
    Deleted,
    NotEnoughCredits,
    Unknown,
}

impl TaskStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "Submitted" => Self::Submitted,
            "Queued" => Self::Queued,
            "InProgress" => Self::InProgress,
            "Completed" => Self::Completed,
            "ProcessingFailed" => Self::ProcessingFailed,
            "Deleted" => Self::Deleted,
            "NotEnoughCredits" => Self::NotEnoughCredits,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::ProcessingFailed | Self::Deleted | Self::NotEnoughCredits
        )
    }
}

/// Parsed `task` element from an OCR service response
#[derive(Debug, Clone)]
pub struct OcrTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub result_url: Option<String>,
    pub estimated_processing_time: Option<String>,
}

/// Trait for OCR backends
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Submit a document for recognition, returning the created task
    async fn submit(&self, file_name: &str, bytes: Vec<u8>, language: &str) -> Result<OcrTask>;

    /// Poll the current state of a task
    async fn task_status(&self, task_id: &str) -> Result<OcrTask>;

    /// Download the recognized document from a completed task's result URL
    async fn fetch_result(&self, result_url: &str) -> Result<Vec<u8>>;
}

/// Client for the ABBYY-style cloud OCR HTTP API
pub struct CloudOcr {
    client: reqwest::Client,
    base_url: String,
    app_id: String,
    password: String,
}

impl CloudOcr {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create OCR HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone().unwrap_or_default(),
            password: config.password.clone().unwrap_or_default(),
        })
    }

    /// Replace the configured credentials with ones stored in settings
    pub fn with_credentials(mut self, app_id: String, password: String) -> Self {
        self.app_id = app_id;
        self.password = password;
        self
    }
}

#[async_trait]
impl OcrEngine for CloudOcr {
    async fn submit(&self, file_name: &str, bytes: Vec<u8>, language: &str) -> Result<OcrTask> {
        let url = format!("{}/processImage", self.base_url);

        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| AppError::Ocr {
                message: format!("Invalid upload mime type: {}", e),
            })?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("language", language.to_string())
            .text("exportFormat", "docx")
            .text("textType", "normal,handprinted,gothic,typewriter,cmc7")
            .text("correctSkew", "true")
            .text("correctOrientation", "true")
            .text("imageSource", "auto");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.app_id, Some(&self.password))
            .multipart(form)
            .send()
            .await?;

        let body = require_success(response).await?;
        parse_task_xml(&body)
    }

    async fn task_status(&self, task_id: &str) -> Result<OcrTask> {
        let url = format!("{}/getTaskStatus", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("taskId", task_id)])
            .basic_auth(&self.app_id, Some(&self.password))
            .send()
            .await?;

        let body = require_success(response).await?;
        parse_task_xml(&body)
    }

    async fn fetch_result(&self, result_url: &str) -> Result<Vec<u8>> {
        // The result URL is pre-signed, no auth header
        let response = self.client.get(result_url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Ocr {
                message: format!("Result download failed with status {}", response.status()),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

async fn require_success(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(AppError::Ocr {
            message: format!("OCR API error {}: {}", status, body),
        });
    }
    Ok(body)
}

/// Extract the `task` element attributes from a service response
pub fn parse_task_xml(body: &str) -> Result<OcrTask> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"task" => {
                let mut task_id = None;
                let mut status = TaskStatus::Unknown;
                let mut result_url = None;
                let mut estimated = None;

                for attr in e.attributes() {
                    let attr = attr.map_err(|e| AppError::Ocr {
                        message: format!("Malformed task attribute: {}", e),
                    })?;
                    let value = attr
                        .unescape_value()
                        .map_err(|e| AppError::Ocr {
                            message: format!("Malformed task attribute value: {}", e),
                        })?
                        .into_owned();
                    match attr.key.as_ref() {
                        b"id" => task_id = Some(value),
                        b"status" => status = TaskStatus::parse(&value),
                        b"resultUrl" => result_url = Some(value),
                        b"estimatedProcessingTime" => estimated = Some(value),
                        _ => {}
                    }
                }

                let task_id = task_id.ok_or_else(|| AppError::Ocr {
                    message: "Task element missing id attribute".to_string(),
                })?;

                return Ok(OcrTask {
                    task_id,
                    status,
                    result_url,
                    estimated_processing_time: estimated,
                });
            }
            Ok(Event::Eof) => {
                return Err(AppError::Ocr {
                    message: "No task element in OCR response".to_string(),
                });
            }
            Err(e) => {
                return Err(AppError::Ocr {
                    message: format!("Invalid OCR response XML: {}", e),
                });
            }
            _ => {}
        }
    }
}

/// Mock OCR engine for testing
pub struct MockOcr {
    result_bytes: Vec<u8>,
}

impl MockOcr {
    pub fn new(result_bytes: Vec<u8>) -> Self {
        Self { result_bytes }
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn submit(&self, _file_name: &str, _bytes: Vec<u8>, _language: &str) -> Result<OcrTask> {
        Ok(OcrTask {
            task_id: "mock-task".to_string(),
            status: TaskStatus::Queued,
            result_url: None,
            estimated_processing_time: Some("1".to_string()),
        })
    }

    async fn task_status(&self, task_id: &str) -> Result<OcrTask> {
        Ok(OcrTask {
            task_id: task_id.to_string(),
            status: TaskStatus::Completed,
            result_url: Some("mock://result".to_string()),
            estimated_processing_time: None,
        })
    }

    async fn fetch_result(&self, _result_url: &str) -> Result<Vec<u8>> {
        Ok(self.result_bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_file_kind() {
        assert_eq!(FileKind::detect("scan.pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::detect("page.PNG"), Some(FileKind::Image));
        assert_eq!(FileKind::detect("photo.jpeg"), Some(FileKind::Image));
        assert_eq!(FileKind::detect("report.docx"), None);
        assert_eq!(FileKind::detect("noextension"), None);
    }

    #[test]
    fn test_parse_submitted_task() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<response><task id="abc-123" status="Queued" estimatedProcessingTime="5000"/></response>"#;
        let task = parse_task_xml(body).unwrap();
        assert_eq!(task.task_id, "abc-123");
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.estimated_processing_time.as_deref(), Some("5000"));
        assert!(task.result_url.is_none());
    }

    #[test]
    fn test_parse_completed_task_unescapes_result_url() {
        let body = r#"<response><task id="abc" status="Completed" resultUrl="https://host/file?a=1&amp;b=2"/></response>"#;
        let task = parse_task_xml(body).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result_url.as_deref(), Some("https://host/file?a=1&b=2"));
    }

    #[test]
    fn test_parse_without_task_element() {
        let err = parse_task_xml("<response></response>").unwrap_err();
        assert!(err.to_string().contains("No task element"));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::ProcessingFailed.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
    }

    #[tokio::test]
    async fn test_mock_engine_flow() {
        let engine = MockOcr::new(b"docx-bytes".to_vec());
        let task = engine.submit("scan.pdf", vec![1, 2, 3], "English").await.unwrap();
        let task = engine.task_status(&task.task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let bytes = engine
            .fetch_result(task.result_url.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(bytes, b"docx-bytes");
    }
}
