pub mod upload_file;
pub mod url;
