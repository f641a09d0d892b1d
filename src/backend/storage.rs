use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BackendError, Storage};

/// Rejects path traversal and special characters in bucket and object names.
fn is_safe_segment(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

fn public_url(base: &str, bucket: &str, path: &str) -> String {
    format!("{}/storage/{}/{}", base.trim_end_matches('/'), bucket, path)
}

/// Buckets as directories under a root; objects are served back by the
/// `/storage` static route.
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), BackendError> {
        if !is_safe_segment(bucket) || !is_safe_segment(path) {
            return Err(BackendError::Storage(format!("invalid object path {bucket}/{path}")));
        }

        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(path), bytes).await?;

        tracing::debug!(bucket = %bucket, path = %path, size = bytes.len(), "object stored");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_url(&self.public_base, bucket, path)
    }
}

/// Objects kept in memory; used by the in-process backend.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
    public_base: String,
}

impl MemoryStorage {
    pub fn new(public_base: &str) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            public_base: public_base.to_string(),
        }
    }

    pub async fn get(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), BackendError> {
        if !is_safe_segment(bucket) || !is_safe_segment(path) {
            return Err(BackendError::Storage(format!("invalid object path {bucket}/{path}")));
        }
        let mut objects = self.objects.write().await;
        let key = (bucket.to_string(), path.to_string());
        if objects.contains_key(&key) {
            return Err(BackendError::Storage("The resource already exists".to_string()));
        }
        objects.insert(key, bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_url(&self.public_base, bucket, path)
    }
}
