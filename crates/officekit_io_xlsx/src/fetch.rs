//! Remote asset fetching for embedded images.
//!
//! A fetch downloads the whole body into memory, stages it in a scoped temp
//! file named after the inferred extension, and loads the workbook image from
//! that file. The temp file is removed when the staging guard drops, on every
//! path. Callers treat every error from this module as non-fatal.

use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use rust_xlsxwriter::Image;
use tempfile::{Builder, NamedTempFile};

use crate::conf::C_IMAGE_TEMP_PREFIX;
use crate::spec::{ExportError, SpecCancelToken};
use crate::util::derive_image_extension;

const N_BYTES_READ_CHUNK: usize = 16 * 1024;

/// Downloaded image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFetchedAsset {
    /// Full response body.
    pub bytes: Vec<u8>,
    /// `Content-Type` header, when the server sent one.
    pub content_type: Option<String>,
}

/// Capability to download one remote asset.
pub trait AssetFetcher: Send + Sync {
    /// Fetch `url`, honoring `cancel` before and during the transfer.
    fn fetch(&self, url: &str, cancel: &SpecCancelToken)
    -> Result<SpecFetchedAsset, ExportError>;
}

/// Blocking HTTP fetcher with a timeout and a body size cap.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
    n_bytes_max: usize,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration, n_bytes_max: usize) -> Result<Self, ExportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ExportError::OperationFailed(format!("http client init: {err}")))?;
        Ok(Self {
            client,
            n_bytes_max,
        })
    }
}

impl AssetFetcher for HttpAssetFetcher {
    fn fetch(
        &self,
        url: &str,
        cancel: &SpecCancelToken,
    ) -> Result<SpecFetchedAsset, ExportError> {
        if cancel.is_cancelled() {
            return Err(ExportError::AssetFetchFailed(format!(
                "cancelled before fetching {url}"
            )));
        }

        let mut response = self.client.get(url).send().map_err(|err| {
            if err.is_timeout() {
                ExportError::AssetFetchFailed(format!("timed out fetching {url}"))
            } else {
                ExportError::AssetFetchFailed(format!("request to {url} failed: {err}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::AssetFetchFailed(format!(
                "{url} answered {status}"
            )));
        }
        if let Some(n_len) = response.content_length()
            && n_len as usize > self.n_bytes_max
        {
            return Err(ExportError::AssetFetchFailed(format!(
                "{url} body of {n_len} bytes exceeds {} bytes",
                self.n_bytes_max
            )));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .map(ToString::to_string);

        let mut v_body = Vec::new();
        let mut v_chunk = vec![0u8; N_BYTES_READ_CHUNK];
        loop {
            if cancel.is_cancelled() {
                return Err(ExportError::AssetFetchFailed(format!(
                    "cancelled while fetching {url}"
                )));
            }
            let n_read = response.read(&mut v_chunk).map_err(|err| {
                ExportError::AssetFetchFailed(format!("reading body of {url} failed: {err}"))
            })?;
            if n_read == 0 {
                break;
            }
            if v_body.len() + n_read > self.n_bytes_max {
                return Err(ExportError::AssetFetchFailed(format!(
                    "{url} body exceeds {} bytes",
                    self.n_bytes_max
                )));
            }
            v_body.extend_from_slice(&v_chunk[..n_read]);
        }

        debug!("fetched {} bytes from {url}", v_body.len());
        Ok(SpecFetchedAsset {
            bytes: v_body,
            content_type,
        })
    }
}

/// Write `asset` to a uniquely named temp file ending in the inferred extension.
///
/// The file lives as long as the returned guard.
pub fn stage_asset(
    url: &str,
    asset: &SpecFetchedAsset,
    path_dir_temp: Option<&Path>,
) -> Result<NamedTempFile, ExportError> {
    let c_ext = derive_image_extension(url, asset.content_type.as_deref());
    let c_suffix = format!(".{c_ext}");
    let mut builder = Builder::new();
    builder.prefix(C_IMAGE_TEMP_PREFIX).suffix(&c_suffix);
    let res_file = match path_dir_temp {
        Some(path_dir) => builder.tempfile_in(path_dir),
        None => builder.tempfile(),
    };
    let mut file = res_file
        .map_err(|err| ExportError::AssetFetchFailed(format!("creating temp file: {err}")))?;
    file.write_all(&asset.bytes)
        .and_then(|_| file.flush())
        .map_err(|err| ExportError::AssetFetchFailed(format!("writing temp file: {err}")))?;
    Ok(file)
}

/// Fetch, stage and decode one remote image.
pub fn load_remote_image(
    fetcher: &dyn AssetFetcher,
    url: &str,
    cancel: &SpecCancelToken,
    path_dir_temp: Option<&Path>,
) -> Result<Image, ExportError> {
    let asset = fetcher.fetch(url, cancel)?;
    let file_staged = stage_asset(url, &asset, path_dir_temp)?;
    let image = Image::new(file_staged.path())
        .map_err(|err| ExportError::AssetFetchFailed(format!("decoding image from {url}: {err}")))?;
    drop(file_staged);
    Ok(image)
}
