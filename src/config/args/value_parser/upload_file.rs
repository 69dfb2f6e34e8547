use std::path::PathBuf;

use crate::types::UploadFile;

const ERROR_MESSAGE_INVALID_UPLOAD_ENTRY: &str = "upload entry must be PATH=KEY";

/// Parse a `PATH=KEY` upload entry. The path must name an existing regular file.
pub fn parse_upload_file(value: &str) -> Result<UploadFile, String> {
    let (file_path, key) = value
        .split_once('=')
        .ok_or_else(|| ERROR_MESSAGE_INVALID_UPLOAD_ENTRY.to_string())?;
    if file_path.is_empty() || key.is_empty() {
        return Err(ERROR_MESSAGE_INVALID_UPLOAD_ENTRY.to_string());
    }

    let file_path = PathBuf::from(file_path);
    if !(file_path.exists() && file_path.is_file()) {
        return Err(format!("file not found: {}", file_path.display()));
    }

    Ok(UploadFile::new(file_path, key))
}
