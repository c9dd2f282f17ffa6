//! Result downloads and `convert_zip` decoding.

use super::{check_status, Client};
use crate::context::Context;
use crate::error::Doc2xError;
use crate::types::Operation;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use reqwest::Url;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

impl Client {
    /// Download `url` into memory.
    pub async fn download_file(&self, ctx: &Context, url: &str) -> Result<Vec<u8>, Doc2xError> {
        let mut buf = Vec::new();
        self.download_file_to(ctx, url, &mut buf).await?;
        Ok(buf)
    }

    /// Stream `url` into `dst`, returning the number of bytes written.
    ///
    /// Result URLs sometimes arrive with JSON-escaped ampersands
    /// (`\u0026`); those are restored before the request. An empty body is
    /// an error.
    pub async fn download_file_to<W>(
        &self,
        ctx: &Context,
        url: &str,
        dst: &mut W,
    ) -> Result<u64, Doc2xError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if url.is_empty() {
            return Err(Doc2xError::EmptyDownloadUrl);
        }
        let operation = Operation::Download;
        let url = unescape_url(url);
        let request = self.transfer.get(&url);

        ctx.run(operation, async {
            let response = request
                .send()
                .await
                .map_err(|source| Doc2xError::Http { operation, source })?;
            let (mut response, _) = check_status(operation, response)?;

            let mut written: u64 = 0;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|source| Doc2xError::Http { operation, source })?
            {
                dst.write_all(&chunk)
                    .await
                    .map_err(|e| Doc2xError::io("writing downloaded file", e))?;
                written += chunk.len() as u64;
            }
            dst.flush()
                .await
                .map_err(|e| Doc2xError::io("writing downloaded file", e))?;

            if written == 0 {
                return Err(Doc2xError::EmptyPayload {
                    what: "downloaded file",
                });
            }
            debug!(bytes = written, "download finished");
            Ok(written)
        })
        .await
    }

    /// Download `url` to `path` atomically.
    ///
    /// Bytes go to a temporary file next to `path`, which is renamed over
    /// the target only after the whole body arrived. A failed or cancelled
    /// download leaves no partial file behind.
    pub async fn download_to_path(
        &self,
        ctx: &Context,
        url: &str,
        path: &Path,
    ) -> Result<u64, Doc2xError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Doc2xError::io(format!("create download dir '{}'", dir.display()), e))?;

        let write_err = |source: std::io::Error| Doc2xError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        let std_file = tmp.as_file().try_clone().map_err(write_err)?;
        let mut file = tokio::fs::File::from_std(std_file);

        let written = self.download_file_to(ctx, url, &mut file).await?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tmp.persist(path).map_err(|e| write_err(e.error))?;
        info!(path = %path.display(), bytes = written, "saved download");
        Ok(written)
    }

    /// Decode an image-layout `convert_zip` payload into zip bytes.
    pub fn fetch_convert_zip(&self, convert_zip: &str) -> Result<Vec<u8>, Doc2xError> {
        decode_convert_zip(convert_zip)
    }

    /// Decode a `convert_zip` payload straight into `dst`.
    pub async fn fetch_convert_zip_to<W>(
        &self,
        convert_zip: &str,
        dst: &mut W,
    ) -> Result<(), Doc2xError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let data = decode_convert_zip(convert_zip)?;
        dst.write_all(&data)
            .await
            .map_err(|e| Doc2xError::io("write convert_zip payload", e))?;
        dst.flush()
            .await
            .map_err(|e| Doc2xError::io("write convert_zip payload", e))
    }
}

fn unescape_url(url: &str) -> String {
    url.replace("\\u0026", "&")
}

/// Decode base64 with or without padding, optionally behind a
/// `data:...;base64,` prefix.
pub fn decode_convert_zip(convert_zip: &str) -> Result<Vec<u8>, Doc2xError> {
    let payload = strip_data_url(convert_zip.trim()).trim();
    if payload.is_empty() {
        return Err(Doc2xError::EmptyConvertZip);
    }

    let data = match STANDARD.decode(payload) {
        Ok(data) => data,
        Err(err) => STANDARD_NO_PAD
            .decode(payload)
            .map_err(|_| Doc2xError::Decode {
                what: "convert_zip",
                source: err,
            })?,
    };

    if data.is_empty() {
        return Err(Doc2xError::EmptyPayload {
            what: "convert_zip payload",
        });
    }
    Ok(data)
}

fn strip_data_url(value: &str) -> &str {
    if !value.starts_with("data:") {
        return value;
    }
    match value.find("base64,") {
        Some(idx) => &value[idx + "base64,".len()..],
        None => value,
    }
}

/// File name for a downloaded result: `<uid><ext>`, where the extension
/// comes from the URL path and defaults to `.zip`.
pub fn default_download_name(url: &str, uid: &str) -> String {
    let ext = Url::parse(&unescape_url(url))
        .ok()
        .and_then(|u| {
            let last = u.path_segments()?.next_back()?.to_string();
            Path::new(&last)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
        })
        .unwrap_or_else(|| ".zip".to_string());
    format!("{uid}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_unpadded_and_data_url() {
        assert_eq!(decode_convert_zip("UEsDBA==").unwrap(), b"PK\x03\x04");
        assert_eq!(decode_convert_zip("UEsDBA").unwrap(), b"PK\x03\x04");
        assert_eq!(
            decode_convert_zip("  data:application/zip;base64,UEsDBA==\n").unwrap(),
            b"PK\x03\x04"
        );
    }

    #[test]
    fn blank_payload_is_rejected() {
        assert!(matches!(
            decode_convert_zip("   "),
            Err(Doc2xError::EmptyConvertZip)
        ));
        assert!(matches!(
            decode_convert_zip("data:application/zip;base64,"),
            Err(Doc2xError::EmptyConvertZip)
        ));
    }

    #[test]
    fn invalid_base64_reports_decode_error() {
        let err = decode_convert_zip("not base64!").unwrap_err();
        assert!(matches!(err, Doc2xError::Decode { .. }));
        assert!(err.to_string().starts_with("decode convert_zip failed"));
    }

    #[test]
    fn download_name_uses_url_extension() {
        assert_eq!(
            default_download_name("https://oss.example/out/abc.docx?sig=1\\u0026x=2", "u1"),
            "u1.docx"
        );
        assert_eq!(default_download_name("https://oss.example/out/abc", "u1"), "u1.zip");
        assert_eq!(default_download_name("::not a url::", "u1"), "u1.zip");
    }

    #[test]
    fn escaped_ampersands_are_restored() {
        assert_eq!(
            unescape_url("https://x/y?a=1\\u0026b=2"),
            "https://x/y?a=1&b=2"
        );
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let client = Client::with_api_key("k").unwrap();
        let err = client
            .download_file(&Context::background(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2xError::EmptyDownloadUrl));
    }
}
