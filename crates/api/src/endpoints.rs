//! Server route constants.

pub const VIEW_CONTENT: &str = "/api/files/view";
pub const CREATE_DIRECTORY: &str = "/files/create-directory";
pub const CREATE_FILE: &str = "/files/create-file";
pub const DELETE: &str = "/files/delete";
pub const DOWNLOAD: &str = "/files/download";

pub const UPLOAD: &str = "/files/upload";
pub const UPLOAD_CHUNK_START: &str = "/files/upload/chunk/start";
pub const UPLOAD_CHUNK: &str = "/files/upload/chunk";
pub const UPLOAD_CHUNK_COMPLETE: &str = "/files/upload/chunk/complete";

pub const ROOT_PATH: &str = "/api/system/get-root-path";
pub const STORAGE: &str = "/api/system/storage";
