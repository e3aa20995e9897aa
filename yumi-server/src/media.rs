//! Image storage on a hosted CDN
//!
//! Uploads are validated locally (type and size), then forwarded to
//! Cloudinary's signed upload API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Accepted image content types
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Largest accepted upload, 5 MB
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Root folder for every upload
pub const ROOT_FOLDER: &str = "yumi";

const CLOUDINARY_API: &str = "https://api.cloudinary.com";

/// Media failure
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("unsupported content type: {0}")]
    InvalidType(String),

    #[error("file too large: {size} bytes")]
    TooLarge { size: usize },

    #[error("image storage is not configured")]
    NotConfigured,

    #[error("image storage request failed: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

/// Image ready to be stored
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
    pub folder: String,
    pub public_id: String,
}

impl ImageUpload {
    /// Validate type and size and pick the destination.
    ///
    /// `folder` wins over `tipo`; both land under the root folder.
    pub fn new(
        bytes: Vec<u8>,
        content_type: &str,
        file_name: Option<String>,
        folder: Option<&str>,
        tipo: Option<&str>,
    ) -> Result<Self, MediaError> {
        if !ALLOWED_TYPES.contains(&content_type) {
            return Err(MediaError::InvalidType(content_type.to_owned()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(MediaError::TooLarge { size: bytes.len() });
        }
        Ok(Self {
            bytes,
            content_type: content_type.to_owned(),
            file_name,
            folder: upload_folder(folder, tipo),
            public_id: chrono::Utc::now().timestamp_millis().to_string(),
        })
    }
}

/// `yumi`, or `yumi/{folder}` (falling back to `yumi/{tipo}`).
pub fn upload_folder(folder: Option<&str>, tipo: Option<&str>) -> String {
    let sub = [folder, tipo]
        .into_iter()
        .flatten()
        .map(|s| s.trim().trim_matches('/'))
        .find(|s| !s.is_empty());
    match sub {
        Some(sub) => format!("{ROOT_FOLDER}/{sub}"),
        None => ROOT_FOLDER.to_owned(),
    }
}

/// Stored image as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub resource_type: Option<String>,
}

/// Image storage backend
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, MediaError>;

    /// Remove an image. Returns the provider's result string.
    async fn delete(&self, public_id: &str) -> Result<String, MediaError>;
}

/// Store used when no CDN credentials are configured
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _image: ImageUpload) -> Result<UploadedImage, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn delete(&self, _public_id: &str) -> Result<String, MediaError> {
        Err(MediaError::NotConfigured)
    }
}

/// Cloudinary credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryConfig {
    /// Read `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY` and
    /// `CLOUDINARY_API_SECRET`; `None` unless all three are set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            cloud_name: var("CLOUDINARY_CLOUD_NAME")?,
            api_key: var("CLOUDINARY_API_KEY")?,
            api_secret: var("CLOUDINARY_API_SECRET")?,
        })
    }
}

/// Sign request parameters: sorted `key=value` pairs joined by `&`, the API
/// secret appended, SHA-256, lowercase hex.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
    resource_type: Option<String>,
}

impl From<UploadResponse> for UploadedImage {
    fn from(r: UploadResponse) -> Self {
        Self {
            url: r.secure_url,
            public_id: r.public_id,
            width: r.width,
            height: r.height,
            format: r.format,
            resource_type: r.resource_type,
        }
    }
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct CloudinaryError {
    error: CloudinaryErrorBody,
}

#[derive(Deserialize)]
struct CloudinaryErrorBody {
    message: String,
}

/// Cloudinary signed upload client
pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
    base_url: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self::with_base_url(config, CLOUDINARY_API)
    }

    pub fn with_base_url(config: CloudinaryConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Signed form for `params`, with credentials attached.
    fn signed_form(&self, params: BTreeMap<&str, String>) -> Form {
        let signature = sign(&params, &self.config.api_secret);
        params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key.to_owned(), value))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    async fn send(&self, action: &str, form: Form) -> Result<reqwest::Response, MediaError> {
        let response = self.client.post(self.endpoint(action)).multipart(form).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<CloudinaryError>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("status {status}"),
        };
        tracing::warn!(%status, %message, action, "cloudinary request failed");
        Err(MediaError::Upstream(message))
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = BTreeMap::from([
            ("folder", image.folder.clone()),
            ("public_id", image.public_id.clone()),
            ("timestamp", timestamp),
        ]);

        let file = Part::bytes(image.bytes)
            .file_name(image.file_name.unwrap_or_else(|| image.public_id.clone()))
            .mime_str(&image.content_type)?;
        let form = self.signed_form(params).part("file", file);

        let response: UploadResponse = self.send("upload", form).await?.json().await?;
        let uploaded = UploadedImage::from(response);
        tracing::info!(public_id = %uploaded.public_id, "image uploaded");
        Ok(uploaded)
    }

    async fn delete(&self, public_id: &str) -> Result<String, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = BTreeMap::from([("public_id", public_id.to_owned()), ("timestamp", timestamp)]);

        let destroyed: DestroyResponse = self.send("destroy", self.signed_form(params)).await?.json().await?;
        tracing::info!(public_id, result = %destroyed.result, "image deleted");
        Ok(destroyed.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
        }
    }

    #[test]
    fn folder_selection() {
        assert_eq!(upload_folder(None, None), "yumi");
        assert_eq!(upload_folder(Some("recetas"), Some("perfil")), "yumi/recetas");
        assert_eq!(upload_folder(None, Some("perfil")), "yumi/perfil");
        assert_eq!(upload_folder(Some("  "), Some("evento")), "yumi/evento");
        assert_eq!(upload_folder(Some("/fotos/"), None), "yumi/fotos");
    }

    #[test]
    fn rejects_unsupported_types() {
        let err = ImageUpload::new(vec![0; 10], "application/pdf", None, None, None).unwrap_err();
        assert!(matches!(err, MediaError::InvalidType(t) if t == "application/pdf"));
    }

    #[test]
    fn rejects_oversized_files() {
        let err = ImageUpload::new(vec![0; MAX_UPLOAD_BYTES + 1], "image/png", None, None, None).unwrap_err();
        assert!(matches!(err, MediaError::TooLarge { .. }));
    }

    #[test]
    fn accepts_limit_sized_files() {
        let upload = ImageUpload::new(vec![0; MAX_UPLOAD_BYTES], "image/webp", None, None, Some("perfil")).unwrap();
        assert_eq!(upload.folder, "yumi/perfil");
        assert!(upload.public_id.parse::<i64>().is_ok());
    }

    #[test]
    fn signature_is_sorted_and_hex() {
        let params = BTreeMap::from([
            ("timestamp", "1700000000".to_string()),
            ("folder", "yumi".to_string()),
        ]);
        let signature = sign(&params, "secret");

        let mut hasher = Sha256::new();
        hasher.update(b"folder=yumi&timestamp=1700000000secret");
        assert_eq!(signature, hex::encode(hasher.finalize()));
        assert_eq!(signature.len(), 64);
    }

    #[tokio::test]
    async fn disabled_store_reports_not_configured() {
        assert!(matches!(
            DisabledImageStore.delete("x").await,
            Err(MediaError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn upload_returns_cdn_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "http://res.cloudinary.com/demo/image/upload/yumi/1.png",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/yumi/1.png",
                "public_id": "yumi/1",
                "width": 640,
                "height": 480,
                "format": "png",
                "resource_type": "image"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = CloudinaryStore::with_base_url(config(), server.uri());
        let image = ImageUpload::new(vec![1, 2, 3], "image/png", Some("a.png".into()), None, None).unwrap();
        let uploaded = store.upload(image).await.unwrap();

        assert_eq!(uploaded.public_id, "yumi/1");
        assert_eq!(uploaded.width, Some(640));
        assert!(uploaded.url.starts_with("https://"));
    }

    #[tokio::test]
    async fn upstream_errors_carry_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/destroy"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "Invalid Signature"}})),
            )
            .mount(&server)
            .await;

        let store = CloudinaryStore::with_base_url(config(), server.uri());
        match store.delete("yumi/1").await {
            Err(MediaError::Upstream(message)) => assert_eq!(message, "Invalid Signature"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_returns_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1_1/demo/image/destroy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
            .mount(&server)
            .await;

        let store = CloudinaryStore::with_base_url(config(), server.uri());
        assert_eq!(store.delete("yumi/1").await.unwrap(), "ok");
    }
}
