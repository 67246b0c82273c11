//! The three-phase multipart upload.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use md5::{Digest, Md5};
use speedycloud_core::{RequestParams, SpeedyCloudError, SpeedyCloudResult};
use speedycloud_http::RawResponse;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::client::ObjectStorageClient;
use crate::paths::object_path;
use crate::session::MultipartSession;

/// Bytes per part; only the last part may be shorter.
pub const PART_SIZE: u64 = 20 * 1024 * 1024;

/// Largest object accepted for upload.
pub const MAX_OBJECT_SIZE: u64 = 64 * 1024 * 1024 * 1024;

/// Where one part sits in the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    /// 1-based part number.
    pub part_number: u32,
    /// Byte offset of the part.
    pub offset: u64,
    /// Length of the part.
    pub len: u64,
}

/// Split `total_size` bytes into `ceil(total_size / part_size)` parts.
///
/// Every part but the last is `part_size` long; the last carries the
/// remainder. An empty object is sent as a single empty part.
#[must_use]
pub fn plan_parts(total_size: u64, part_size: u64) -> Vec<PartPlan> {
    let part_size = part_size.max(1);
    let count = total_size.div_ceil(part_size).max(1);
    (0..count)
        .map(|index| {
            let offset = index * part_size;
            PartPlan {
                part_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
                offset,
                len: part_size.min(total_size - offset),
            }
        })
        .collect()
}

/// Drives INITIATE, UPLOAD_PART and FINALIZE over an [`ObjectStorageClient`].
#[derive(Debug, Clone)]
pub struct MultipartCoordinator {
    client: ObjectStorageClient,
    part_size: u64,
}

impl MultipartCoordinator {
    /// A coordinator using [`PART_SIZE`] parts.
    #[must_use]
    pub fn new(client: ObjectStorageClient) -> Self {
        Self {
            client,
            part_size: PART_SIZE,
        }
    }

    /// Use a different part size.
    #[must_use]
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    /// The part size in use.
    #[must_use]
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Reject objects above [`MAX_OBJECT_SIZE`].
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::ResourceLimit`] when `total_size` is too large.
    pub fn check_size(total_size: u64) -> SpeedyCloudResult<()> {
        if total_size > MAX_OBJECT_SIZE {
            return Err(SpeedyCloudError::ResourceLimit {
                size: total_size,
                limit: MAX_OBJECT_SIZE,
            });
        }
        Ok(())
    }

    /// INITIATE: open a session for `bucket/key`.
    ///
    /// `params` (ACL, content type) are sent now and again on finalize.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::ProtocolFormat`] when the response carries no
    /// `UploadId`, plus any transport error from the executor.
    pub async fn initiate(
        &self,
        bucket: &str,
        key: &str,
        params: RequestParams,
    ) -> SpeedyCloudResult<MultipartSession> {
        let path = format!("{}?uploads", object_path(bucket, key));
        let initiate_params = RequestParams {
            content_length: None,
            content_md5: None,
            ..params.clone()
        };
        let response = self.client.post(&path, None, initiate_params).await?;
        if !response.is_success() {
            return Err(format_error(&response, "initiate multipart upload was rejected"));
        }

        let upload_id = speedycloud_xml::parse_upload_id(&response.body)
            .ok()
            .flatten()
            .ok_or_else(|| format_error(&response, "initiate response has no UploadId"))?;

        info!(bucket, key, upload_id = %upload_id, "initiated multipart upload");
        Ok(MultipartSession::new(bucket, key, upload_id, params))
    }

    /// UPLOAD_PART: send one part and return its ETag without recording it.
    ///
    /// Takes the session by shared reference so parts can be sent
    /// concurrently; record each ETag with [`MultipartSession::record_part`].
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::ProtocolFormat`] when the response has no `ETag`,
    /// [`SpeedyCloudError::InvalidInput`] for part number 0, plus any
    /// transport error from the executor.
    pub async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        data: Bytes,
    ) -> SpeedyCloudResult<String> {
        if part_number == 0 {
            return Err(SpeedyCloudError::InvalidInput(
                "part numbers start at 1".to_owned(),
            ));
        }

        let path = format!(
            "{}?partNumber={part_number}&uploadId={}",
            object_path(session.bucket(), session.key()),
            session.upload_id()
        );
        let params = RequestParams::new()
            .with_content_md5(BASE64.encode(Md5::digest(&data)))
            .with_content_length(data.len() as u64);

        let size = data.len();
        let response = self.client.put(&path, Some(data), params).await?;
        if !response.is_success() {
            return Err(format_error(
                &response,
                &format!("upload of part {part_number} was rejected"),
            ));
        }
        let etag = response
            .etag()
            .ok_or_else(|| {
                format_error(&response, &format!("part {part_number} response has no ETag"))
            })?
            .to_owned();

        debug!(
            upload_id = session.upload_id(),
            part_number,
            size,
            etag = %etag,
            "uploaded part"
        );
        Ok(etag)
    }

    /// Upload the next sequential part and record its ETag.
    ///
    /// # Errors
    ///
    /// See [`MultipartCoordinator::upload_part`].
    pub async fn upload_next_part(
        &self,
        session: &mut MultipartSession,
        data: Bytes,
    ) -> SpeedyCloudResult<u32> {
        let part_number = session.next_part_number();
        let etag = self.upload_part(session, part_number, data).await?;
        session.record_part(part_number, etag);
        Ok(part_number)
    }

    /// FINALIZE: send the manifest and consume the session.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::InvalidInput`] when parts are missing (nothing is
    /// sent), [`SpeedyCloudError::ProtocolFormat`] when the server rejects
    /// the manifest, plus any transport error from the executor.
    pub async fn complete(&self, session: MultipartSession) -> SpeedyCloudResult<RawResponse> {
        let manifest = session.manifest()?;
        let body = manifest.to_xml().map_err(|e| {
            SpeedyCloudError::InvalidInput(format!("cannot encode completion manifest: {e}"))
        })?;

        let path = format!(
            "{}?uploadId={}",
            object_path(session.bucket(), session.key()),
            session.upload_id()
        );
        let params = RequestParams {
            content_md5: None,
            content_length: None,
            ..session.params().clone()
        };
        let response = self.client.post(&path, Some(Bytes::from(body)), params).await?;

        // A 200 can still carry an <Error> body when assembly fails late.
        if !response.is_success() || speedycloud_xml::parse_server_error(&response.body).is_some() {
            return Err(format_error(&response, "complete multipart upload failed"));
        }

        info!(
            bucket = session.bucket(),
            key = session.key(),
            upload_id = session.upload_id(),
            parts = manifest.parts.len(),
            "completed multipart upload"
        );
        Ok(response)
    }

    /// Abandon the session and let the server discard its parts.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::ProtocolFormat`] when the server rejects the
    /// abort, plus any transport error from the executor.
    pub async fn abort(&self, session: MultipartSession) -> SpeedyCloudResult<()> {
        let path = format!(
            "{}?uploadId={}",
            object_path(session.bucket(), session.key()),
            session.upload_id()
        );
        let response = self.client.delete(&path, RequestParams::new()).await?;
        if !response.is_success() {
            return Err(format_error(&response, "abort multipart upload was rejected"));
        }
        info!(upload_id = session.upload_id(), "aborted multipart upload");
        Ok(())
    }

    /// Upload an in-memory object.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::ResourceLimit`] before any request when `data`
    /// exceeds [`MAX_OBJECT_SIZE`]; otherwise the first phase error.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        params: RequestParams,
    ) -> SpeedyCloudResult<RawResponse> {
        let total_size = data.len() as u64;
        Self::check_size(total_size)?;
        let plan = plan_parts(total_size, self.part_size);

        let mut session = self.initiate(bucket, key, params).await?;
        session.set_expected_parts(part_count(&plan));
        for part in &plan {
            let range = usize_range(part)?;
            if let Err(e) = self.upload_next_part(&mut session, data.slice(range)).await {
                return Err(self.abandon(session, e).await);
            }
        }
        self.complete(session).await
    }

    /// Upload `total_size` bytes read from `reader`, one part in memory at a time.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::ResourceLimit`] before any request when
    /// `total_size` exceeds [`MAX_OBJECT_SIZE`], [`SpeedyCloudError::Io`] when
    /// the reader fails or ends early, otherwise the first phase error.
    pub async fn upload_reader<R>(
        &self,
        bucket: &str,
        key: &str,
        mut reader: R,
        total_size: u64,
        params: RequestParams,
    ) -> SpeedyCloudResult<RawResponse>
    where
        R: AsyncRead + Unpin + Send,
    {
        Self::check_size(total_size)?;
        let plan = plan_parts(total_size, self.part_size);

        let mut session = self.initiate(bucket, key, params).await?;
        session.set_expected_parts(part_count(&plan));
        for part in &plan {
            let mut buf = vec![0; usize_range(part)?.len()];
            if let Err(e) = reader.read_exact(&mut buf).await {
                return Err(self.abandon(session, e.into()).await);
            }
            if let Err(e) = self.upload_next_part(&mut session, Bytes::from(buf)).await {
                return Err(self.abandon(session, e).await);
            }
        }
        self.complete(session).await
    }

    /// Upload a local file. The size check uses file metadata and runs
    /// before any connection is opened.
    ///
    /// # Errors
    ///
    /// See [`MultipartCoordinator::upload_reader`].
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        params: RequestParams,
    ) -> SpeedyCloudResult<RawResponse> {
        let path = path.as_ref();
        let total_size = tokio::fs::metadata(path).await?.len();
        Self::check_size(total_size)?;

        let file = tokio::fs::File::open(path).await?;
        self.upload_reader(bucket, key, file, total_size, params).await
    }

    /// Best-effort abort after a failed part; returns the part's error.
    async fn abandon(&self, session: MultipartSession, error: SpeedyCloudError) -> SpeedyCloudError {
        warn!(
            upload_id = session.upload_id(),
            part_number = session.next_part_number(),
            error = %error,
            "part upload failed, aborting multipart upload"
        );
        if let Err(abort_error) = self.abort(session).await {
            warn!(error = %abort_error, "failed to abort multipart upload");
        }
        error
    }
}

fn part_count(plan: &[PartPlan]) -> u32 {
    plan.last().map_or(0, |part| part.part_number)
}

fn usize_range(part: &PartPlan) -> SpeedyCloudResult<std::ops::Range<usize>> {
    let start = usize::try_from(part.offset);
    let end = usize::try_from(part.offset + part.len);
    match (start, end) {
        (Ok(start), Ok(end)) => Ok(start..end),
        _ => Err(SpeedyCloudError::InvalidInput(format!(
            "part {} does not fit in memory on this platform",
            part.part_number
        ))),
    }
}

/// A protocol-format error carrying the status and any server `<Error>` details.
fn format_error(response: &RawResponse, what: &str) -> SpeedyCloudError {
    let mut message = what.to_owned();
    if let Some(server) = speedycloud_xml::parse_server_error(&response.body) {
        if let Some(code) = server.code {
            message.push_str(&format!(": {code}"));
        }
        if let Some(detail) = server.message {
            message.push_str(&format!(" ({detail})"));
        }
    }
    SpeedyCloudError::ProtocolFormat {
        status: response.status.as_u16(),
        message,
    }
}
