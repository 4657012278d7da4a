//! Multipart intake for listing forms.
//!
//! Text parts are collected into a map. Parts named `avatar` are streamed
//! chunk by chunk into the upload directory, never buffered whole, and the
//! resulting paths are handed to the catalog. Every spooled file is tracked by
//! a [`TempUploads`] guard that removes whatever is still on disk when the
//! request finishes, so nothing lingers after a rejected or failed request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderMap};
use mart_catalog::MAX_AVATARS;
use mart_core::{ConfigSnapshot, MartError, MartResult};
use serde_json::json;
use tokio::io::AsyncWriteExt;

/// Form field carrying image files.
pub const AVATAR_FIELD: &str = "avatar";

/// Limits and location for spooled uploads.
///
/// Keys: `upload.dir`, `upload.max_file_bytes`, `upload.max_text_bytes`,
/// `catalog.max_avatars`.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub upload_dir: PathBuf,
    pub max_file_bytes: u64,
    /// Cap on each text part
    pub max_text_bytes: u64,
    pub max_files: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir().join("campus-mart"),
            max_file_bytes: 10 * 1024 * 1024,
            max_text_bytes: 64 * 1024,
            max_files: MAX_AVATARS,
        }
    }
}

impl IntakeConfig {
    pub fn from_config(cfg: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            upload_dir: cfg
                .get_string("upload.dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_file_bytes: cfg
                .get_u64("upload.max_file_bytes")
                .unwrap_or(defaults.max_file_bytes),
            max_text_bytes: cfg
                .get_u64("upload.max_text_bytes")
                .unwrap_or(defaults.max_text_bytes),
            max_files: cfg
                .get_usize("catalog.max_avatars")
                .filter(|n| *n > 0)
                .map_or(defaults.max_files, |n| n.min(MAX_AVATARS)),
        }
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Upper bound on the whole body: every file at its limit plus room for
    /// the text parts and framing.
    fn max_body_bytes(&self) -> u64 {
        let files = self.max_file_bytes.saturating_mul(self.max_files as u64);
        files
            .saturating_add(self.max_text_bytes.saturating_mul(TEXT_PART_ALLOWANCE))
            .saturating_add(FRAMING_ALLOWANCE)
    }
}

/// Text parts budgeted for in the whole-body limit.
const TEXT_PART_ALLOWANCE: u64 = 16;
const FRAMING_ALLOWANCE: u64 = 64 * 1024;

/// Files spooled for one request; removed on drop unless already consumed.
#[derive(Debug, Default)]
pub struct TempUploads {
    paths: Vec<PathBuf>,
}

impl TempUploads {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for TempUploads {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "discarded unconsumed upload"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to discard upload")
                }
            }
        }
    }
}

/// A parsed listing form.
#[derive(Debug, Default)]
pub struct ListingForm {
    fields: HashMap<String, String>,
    pub files: TempUploads,
}

impl ListingForm {
    /// Value of the first of `names` that was submitted, or an empty string.
    pub fn text(&self, names: &[&str]) -> String {
        names
            .iter()
            .find_map(|name| self.fields.get(*name))
            .cloned()
            .unwrap_or_default()
    }
}

fn malformed(err: multer::Error) -> anyhow::Error {
    MartError::validation(format!("Malformed multipart body: {err}")).into_anyhow()
}

fn io_failure(err: std::io::Error) -> anyhow::Error {
    MartError::internal("Could not store the uploaded file")
        .with_source(err.into())
        .into_anyhow()
}

fn field_error(field: &str, message: String) -> anyhow::Error {
    MartError::validation("Missing or invalid fields")
        .with_errors(json!({ field: [message] }))
        .into_anyhow()
}

fn avatar_error(message: String) -> anyhow::Error {
    field_error(AVATAR_FIELD, message)
}

/// Local name for a spooled file: a fresh id plus the client's file name with
/// anything outside `[A-Za-z0-9._-]` replaced.
fn spool_name(client_name: Option<&str>) -> String {
    let base = client_name
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let clean = if clean.trim_matches('.').is_empty() {
        "avatar".to_string()
    } else {
        clean
    };
    format!("{}-{}", uuid::Uuid::new_v4().simple(), clean)
}

async fn spool(field: &mut multer::Field<'_>, path: &Path, max_bytes: u64) -> MartResult<u64> {
    let mut file = tokio::fs::File::create(path).await.map_err(io_failure)?;
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(avatar_error(format!("each image must be at most {max_bytes} bytes")));
        }
        file.write_all(&chunk).await.map_err(io_failure)?;
    }

    file.flush().await.map_err(io_failure)?;
    Ok(written)
}

async fn read_text(field: &mut multer::Field<'_>, name: &str, max_bytes: u64) -> MartResult<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        if (buf.len() + chunk.len()) as u64 > max_bytes {
            return Err(field_error(name, format!("must be at most {max_bytes} bytes")));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(|_| field_error(name, "must be valid UTF-8".to_string()))
}

/// Read a `multipart/form-data` body into a [`ListingForm`].
pub async fn read_listing_form(headers: &HeaderMap, body: Body, config: &IntakeConfig) -> MartResult<ListingForm> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| MartError::validation("Expected a multipart/form-data body").into_anyhow())?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(io_failure)?;

    let constraints = multer::Constraints::new()
        .size_limit(multer::SizeLimit::new().whole_stream(config.max_body_bytes()));
    let mut multipart = multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);
    let mut form = ListingForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if name == AVATAR_FIELD {
            if form.files.len() >= config.max_files {
                return Err(avatar_error(format!(
                    "at most {} images are allowed",
                    config.max_files
                )));
            }

            let path = config.upload_dir.join(spool_name(file_name.as_deref()));
            // Tracked before the write so a partial file is cleaned up too.
            form.files.paths.push(path.clone());
            let size = spool(&mut field, &path, config.max_file_bytes).await?;
            tracing::debug!(file = ?file_name, path = %path.display(), size, "avatar spooled");
        } else if file_name.is_none() {
            let value = read_text(&mut field, &name, config.max_text_bytes).await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const BOUNDARY: &str = "mart-test-boundary";

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={BOUNDARY}")).unwrap(),
        );
        headers
    }

    fn body(texts: &[(&str, &str)], files: &[(&str, &[u8])]) -> Body {
        let mut out = Vec::new();
        for (name, value) in texts {
            out.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        for (file_name, data) in files {
            out.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
                )
                .as_bytes(),
            );
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(out)
    }

    fn config(dir: &tempfile::TempDir) -> IntakeConfig {
        IntakeConfig {
            max_file_bytes: 16,
            ..IntakeConfig::default().with_upload_dir(dir.path())
        }
    }

    fn spooled(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn fields_and_files_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let form = read_listing_form(
            &headers(),
            body(&[("name", "Stall"), ("Address", "Main St")], &[("../a b.jpg", &b"jpeg"[..])]),
            &config(&dir),
        )
        .await
        .unwrap();

        assert_eq!(form.text(&["name"]), "Stall");
        assert_eq!(form.text(&["address", "Address"]), "Main St");
        assert_eq!(form.text(&["missing"]), "");
        assert_eq!(form.files.len(), 1);

        let path = &form.files.paths()[0];
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg");
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("-a_b.jpg"));

        drop(form);
        assert_eq!(spooled(&dir), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_listing_form(
            &headers(),
            body(&[], &[("ok.jpg", &b"small"[..]), ("big.jpg", &[7u8; 64][..])]),
            &config(&dir),
        )
        .await
        .unwrap_err();

        let mart = MartError::from_anyhow(&err).unwrap();
        assert_eq!(mart.code(), 400);
        assert!(mart.errors.as_ref().unwrap()["avatar"][0]
            .as_str()
            .unwrap()
            .contains("at most 16 bytes"));
        assert_eq!(spooled(&dir), 0);
    }

    #[tokio::test]
    async fn too_many_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(&str, &[u8])> = ["1.jpg", "2.jpg", "3.jpg", "4.jpg"]
            .into_iter()
            .map(|name| (name, &b"img"[..]))
            .collect();
        let err = read_listing_form(&headers(), body(&[], &files), &config(&dir))
            .await
            .unwrap_err();

        let mart = MartError::from_anyhow(&err).unwrap();
        assert_eq!(mart.errors.as_ref().unwrap()["avatar"][0], "at most 3 images are allowed");
        assert_eq!(spooled(&dir), 0);
    }

    #[tokio::test]
    async fn non_multipart_bodies_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let err = read_listing_form(&headers, Body::from("{}"), &config(&dir))
            .await
            .unwrap_err();
        assert_eq!(MartError::from_anyhow(&err).unwrap().code(), 400);
    }

    #[tokio::test]
    async fn oversized_text_parts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntakeConfig {
            max_text_bytes: 8,
            ..config(&dir)
        };
        let long = "x".repeat(64);
        let err = read_listing_form(
            &headers(),
            body(&[("name", "Stall"), ("description", long.as_str())], &[("a.jpg", &b"img"[..])]),
            &config,
        )
        .await
        .unwrap_err();

        let mart = MartError::from_anyhow(&err).unwrap();
        assert_eq!(mart.code(), 400);
        assert_eq!(mart.errors.as_ref().unwrap()["description"][0], "must be at most 8 bytes");
    }

    #[tokio::test]
    async fn bodies_over_the_total_limit_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntakeConfig {
            max_text_bytes: 1024,
            ..config(&dir)
        };
        // Each part fits its own limit; together they exceed the body cap.
        let value = "z".repeat(1000);
        let names: Vec<String> = (0..100).map(|i| format!("extra{i}")).collect();
        let texts: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), value.as_str())).collect();
        assert!(100 * 1000 > config.max_body_bytes());

        let err = read_listing_form(&headers(), body(&texts, &[]), &config)
            .await
            .unwrap_err();
        assert_eq!(MartError::from_anyhow(&err).unwrap().code(), 400);
    }

    #[test]
    fn configured_file_count_is_clamped() {
        let mut cfg = mart_core::MartConfig::new();
        cfg.set("catalog.max_avatars", "9");
        assert_eq!(IntakeConfig::from_config(&cfg.snapshot()).max_files, MAX_AVATARS);

        cfg.set("catalog.max_avatars", "2");
        assert_eq!(IntakeConfig::from_config(&cfg.snapshot()).max_files, 2);
    }

    #[test]
    fn spool_names_are_sanitized() {
        assert!(spool_name(Some("/etc/passwd")).ends_with("-passwd"));
        assert!(spool_name(Some("..")).ends_with("-avatar"));
        assert!(spool_name(None).ends_with("-avatar"));
        assert!(spool_name(Some("pic (1).png")).ends_with("-pic__1_.png"));
    }
}
