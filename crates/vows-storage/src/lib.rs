use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Media object store backing the invitation galleries and profile photos.
///
/// Objects live as flat files under `dir`, addressed by key, and are served
/// publicly under `public_base` (the HTTP layer mounts the directory there).
/// Swapping in a CDN or hosted bucket only requires changing `public_base`.
pub struct MediaStore {
    dir: PathBuf,
    public_base: String,
}

impl MediaStore {
    pub async fn new(dir: PathBuf, public_base: String) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    /// Collision-resistant object key: millisecond timestamp, a random
    /// suffix, and the sanitized original filename.
    pub fn object_key(original_name: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}-{}",
            millis,
            &suffix[..8],
            sanitize_filename(original_name)
        )
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    /// Write an object and return its public URL.
    pub async fn store(&self, key: &str, data: &[u8]) -> Result<String> {
        let path = self.dir.join(key);
        fs::write(&path, data).await?;
        Ok(self.public_url(key))
    }

    /// Delete an object. A missing object is not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = self.dir.join(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted media object {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media object {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keep only ASCII alphanumerics and dots; everything else becomes '_'.
/// Keys must stay URL- and path-safe across filesystems.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();

    if cleaned.trim_matches(['_', '.']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
