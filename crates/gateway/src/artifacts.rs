//! Artifact storage for OCR results and rewritten documents
//!
//! Documents are kept on local disk under the configured artifact
//! directory, named by OCR task id. Task ids come from the upstream
//! service, so they are validated before ever touching a path.

use polydoc_common::errors::{AppError, Result};
use std::path::{Path, PathBuf};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Reject task ids that could escape the artifact directory
pub fn validate_task_id(task_id: &str) -> Result<()> {
    let ok = !task_id.is_empty()
        && task_id.len() <= 128
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation {
            message: format!("Invalid task id: {}", task_id),
        })
    }
}

/// Path of the recognized (original) docx for a task
pub fn original_path(dir: &Path, task_id: &str) -> PathBuf {
    dir.join(format!("{task_id}.docx"))
}

/// Path of the rewritten (translated) docx for a task
pub fn translated_path(dir: &Path, task_id: &str) -> PathBuf {
    dir.join(format!("{task_id}.translated.docx"))
}

pub async fn save(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Drop any stale artifact before writing the new one
    if tokio::fs::try_exists(path).await? {
        tokio::fs::remove_file(path).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

pub async fn load(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::ArtifactNotFound {
            path: path.display().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_validation() {
        assert!(validate_task_id("abc-123_DEF").is_ok());
        assert!(validate_task_id("").is_err());
        assert!(validate_task_id("../etc/passwd").is_err());
        assert!(validate_task_id("a/b").is_err());
    }

    #[test]
    fn paths_are_derived_from_task_id() {
        let dir = Path::new("artifacts");
        assert_eq!(original_path(dir, "t1"), Path::new("artifacts/t1.docx"));
        assert_eq!(
            translated_path(dir, "t1"),
            Path::new("artifacts/t1.translated.docx")
        );
    }

    #[tokio::test]
    async fn load_missing_is_artifact_not_found() {
        let err = load(Path::new("artifacts/definitely-missing.docx"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ArtifactNotFound { .. }));
    }
}
