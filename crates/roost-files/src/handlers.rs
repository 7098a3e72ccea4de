use std::path::Path;

use axum::{
    Json,
    body::Body,
    extract::{Extension, Multipart, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::FilesState;
use crate::SandboxRoot;
use crate::error::FileSurfaceError;
use crate::guard::resolve_and_verify;

/// One entry in a directory listing.
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
}

/// Aggregate sandbox usage reported with listings.
///
/// The limit is supplied by configuration; quota enforcement is the
/// responsibility of an external collaborator.
#[derive(Debug, Serialize)]
pub struct UsageInfo {
    pub used: u64,
    pub limit: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<FileEntry>,
    pub usage: UsageInfo,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub path: String,
    pub content: String,
}

/// Response for successful mutations.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_path() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Path relative to the sandbox root (defaults to ".")
    #[serde(default = "default_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// Path relative to the sandbox root
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Destination directory relative to the sandbox root (defaults to ".")
    #[serde(default = "default_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameQuery {
    /// Current path relative to the sandbox root
    pub old_path: String,
    /// New path relative to the sandbox root
    pub new_path: String,
}

/// Sanitize an uploaded filename, stripping path components and control
/// characters. Returns None if nothing usable remains.
fn sanitize_filename(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    let sanitized = sanitized.trim_matches(|c| c == '.' || c == ' ');

    if sanitized.is_empty() {
        return None;
    }

    if sanitized.len() > 255 {
        // Truncate at a char boundary; a byte-offset slice panics when a
        // multibyte character straddles the cut.
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        return Some(sanitized[..end].to_string());
    }

    Some(sanitized.to_string())
}

/// Sum file sizes under a sandbox root.
fn sandbox_usage(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// List a directory inside the sandbox, with aggregate usage.
pub async fn list_files(
    State(state): State<FilesState>,
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, FileSurfaceError> {
    let resolved = resolve_and_verify(&root, &query.path)?;

    if !resolved.exists() {
        return Err(FileSurfaceError::NotFound(query.path));
    }
    if !resolved.is_dir() {
        return Err(FileSurfaceError::NotADirectory);
    }

    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(&resolved).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let metadata = entry.metadata().await?;
        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            is_directory: metadata.is_dir(),
            size: if metadata.is_file() { metadata.len() } else { 0 },
        });
    }

    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.cmp(&b.name))
    });

    let used = sandbox_usage(&root);
    let limit = state.config.storage_limit_bytes;
    let percentage = if limit > 0 {
        (used as f64 / limit as f64) * 100.0
    } else {
        0.0
    };

    Ok(Json(ListResponse {
        entries,
        usage: UsageInfo {
            used,
            limit,
            percentage,
        },
    }))
}

/// Read a file's textual content.
pub async fn view_file(
    State(state): State<FilesState>,
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<FileQuery>,
) -> Result<Json<ViewResponse>, FileSurfaceError> {
    let resolved = resolve_and_verify(&root, &query.path)?;

    if !resolved.exists() {
        return Err(FileSurfaceError::NotFound(query.path));
    }
    if resolved.is_dir() {
        return Err(FileSurfaceError::NotAFile);
    }

    let size = fs::metadata(&resolved).await?.len();
    let limit = state.config.max_text_file_bytes;
    if size > limit {
        return Err(FileSurfaceError::FileTooLarge { size, limit });
    }

    let bytes = fs::read(&resolved).await?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    Ok(Json(ViewResponse {
        path: query.path,
        content,
    }))
}

/// Write a file's textual content, creating parent directories as needed.
pub async fn edit_file(
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<FileQuery>,
    body: String,
) -> Result<Json<SuccessResponse>, FileSurfaceError> {
    let resolved = resolve_and_verify(&root, &query.path)?;

    if resolved.is_dir() {
        return Err(FileSurfaceError::NotAFile);
    }

    if let Some(parent) = resolved.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(&resolved, body.as_bytes()).await?;
    debug!("wrote {} bytes to {:?}", body.len(), resolved);

    Ok(Json(SuccessResponse {
        success: true,
        message: format!("Saved {}", query.path),
        path: Some(query.path),
    }))
}

/// Upload one or more files via multipart into a sandbox directory.
pub async fn upload_file(
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<SuccessResponse>, FileSurfaceError> {
    let dest_dir = resolve_and_verify(&root, &query.path)?;
    fs::create_dir_all(&dest_dir).await?;

    let mut stored = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FileSurfaceError::Upload(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let Some(filename) = sanitize_filename(&filename) else {
            warn!("rejecting upload with unusable filename: {filename:?}");
            return Err(FileSurfaceError::InvalidPath(filename));
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| FileSurfaceError::Upload(e.to_string()))?;

        let dest = dest_dir.join(&filename);
        let mut file = fs::File::create(&dest).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        info!("stored upload {:?} ({} bytes)", dest, data.len());
        stored.push(filename);
    }

    if stored.is_empty() {
        return Err(FileSurfaceError::Upload("no files in request".to_string()));
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: format!("Uploaded {}", stored.join(", ")),
        path: Some(query.path),
    }))
}

/// Delete a file or directory.
pub async fn delete_file(
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<FileQuery>,
) -> Result<Json<SuccessResponse>, FileSurfaceError> {
    let resolved = resolve_and_verify(&root, &query.path)?;

    if !resolved.exists() {
        return Err(FileSurfaceError::NotFound(query.path));
    }

    if resolved.is_dir() {
        fs::remove_dir_all(&resolved).await?;
    } else {
        fs::remove_file(&resolved).await?;
    }

    Ok(Json(SuccessResponse {
        success: true,
        message: format!("Deleted {}", query.path),
        path: None,
    }))
}

/// Rename or move a file within the sandbox.
pub async fn rename_file(
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<RenameQuery>,
) -> Result<Json<SuccessResponse>, FileSurfaceError> {
    let old = resolve_and_verify(&root, &query.old_path)?;
    let new = resolve_and_verify(&root, &query.new_path)?;

    if !old.exists() {
        return Err(FileSurfaceError::NotFound(query.old_path));
    }

    if let Some(parent) = new.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::rename(&old, &new).await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: format!("Renamed {} to {}", query.old_path, query.new_path),
        path: Some(query.new_path),
    }))
}

/// Create a directory inside the sandbox.
pub async fn create_dir(
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<FileQuery>,
) -> Result<Json<SuccessResponse>, FileSurfaceError> {
    let resolved = resolve_and_verify(&root, &query.path)?;
    fs::create_dir_all(&resolved).await?;

    Ok(Json(SuccessResponse {
        success: true,
        message: format!("Created {}", query.path),
        path: Some(query.path),
    }))
}

/// Stream a file's bytes back to the caller.
pub async fn download(
    Extension(SandboxRoot(root)): Extension<SandboxRoot>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FileSurfaceError> {
    let resolved = resolve_and_verify(&root, &query.path)?;

    if !resolved.exists() {
        return Err(FileSurfaceError::NotFound(query.path));
    }
    if resolved.is_dir() {
        return Err(FileSurfaceError::NotAFile);
    }

    let filename = resolved
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());

    let mime = mime_guess::from_path(&resolved).first_or_octet_stream();

    let file = fs::File::open(&resolved).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(body)
        .map_err(|e| FileSurfaceError::Io(std::io::Error::other(e)))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators_and_control_chars() {
        assert_eq!(
            sanitize_filename("..\\..\\evil.sh").as_deref(),
            Some("_.._evil.sh")
        );
        assert_eq!(sanitize_filename("a/b/c.txt").as_deref(), Some("a_b_c.txt"));
        assert_eq!(sanitize_filename("ok.txt").as_deref(), Some("ok.txt"));
    }

    #[test]
    fn sanitize_rejects_empty_results() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename("  . "), None);
    }

    #[test]
    fn sanitize_truncates_long_names_on_char_boundaries() {
        // 300 two-byte chars; a byte-offset cut at 255 would split one.
        let long = "é".repeat(300);
        let sanitized = sanitize_filename(&long).unwrap();
        assert!(sanitized.len() <= 255);
        assert!(sanitized.chars().all(|c| c == 'é'));

        let long_ascii = "a".repeat(300);
        assert_eq!(sanitize_filename(&long_ascii).unwrap().len(), 255);
    }

    #[test]
    fn usage_sums_file_sizes() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), vec![0u8; 10]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), vec![0u8; 5]).unwrap();

        assert_eq!(sandbox_usage(dir.path()), 15);
    }
}
