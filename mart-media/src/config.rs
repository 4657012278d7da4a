/// Configuration shared by all media uploaders
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Absolute max size allowed for a single asset (safety guard)
    pub max_asset_bytes: u64,

    /// Folder-like prefix every object key starts with
    pub key_prefix: String,

    /// Public origin the durable URLs are built on, without trailing slash
    pub public_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_asset_bytes: 10 * 1024 * 1024, // 10MB
            key_prefix: "avatars".to_string(),
            public_base_url: "http://localhost:9000/campus-mart".to_string(),
        }
    }
}

impl MediaConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max asset size
    pub fn with_max_asset_bytes(mut self, bytes: u64) -> Self {
        self.max_asset_bytes = bytes;
        self
    }

    /// Set the object key prefix
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    /// Set the public base URL
    pub fn with_public_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.public_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Object key for an asset id: `{prefix}/{asset_id}`
    pub fn object_key(&self, asset_id: &str) -> String {
        if self.key_prefix.is_empty() {
            asset_id.to_string()
        } else {
            format!("{}/{}", self.key_prefix, asset_id)
        }
    }

    /// Durable URL for an asset id
    pub fn public_url(&self, asset_id: &str) -> String {
        format!("{}/{}", self.public_base_url, self.object_key(asset_id))
    }
}
