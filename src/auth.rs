use std::path::{Path, PathBuf};

/// Where a remembered bearer token is kept between runs.
pub fn token_file_path(dir: Option<&Path>) -> PathBuf {
    dir.map(Path::to_path_buf)
        .or_else(|| dirs_next::data_local_dir().map(|dir| dir.join("cbtquest")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("token")
}

/// Resolves the credential: an explicit token (flag or env) wins, then the
/// remembered token file. Blank values count as absent.
pub async fn load_token(explicit: Option<&str>, path: &Path) -> Option<String> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let token = contents.trim();
            if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            }
        }
        Err(err) => {
            log::debug!("no stored token at {}: {err}", path.display());
            None
        }
    }
}

pub async fn save_token(path: &Path, token: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create token directory: {}", e))?;
    }
    tokio::fs::write(path, token.trim())
        .await
        .map_err(|e| format!("Failed to write token file: {}", e))
}
