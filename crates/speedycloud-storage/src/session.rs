//! Multipart upload session state.
//!
//! A [`MultipartSession`] is created by INITIATE, accumulates one ETag per
//! uploaded part, and is consumed by FINALIZE or abort.

use std::collections::BTreeMap;

use speedycloud_core::{RequestParams, SpeedyCloudError, SpeedyCloudResult};
use speedycloud_xml::{CompleteMultipartUpload, CompletedPart};

/// One in-progress multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartSession {
    bucket: String,
    key: String,
    upload_id: String,
    params: RequestParams,
    /// Uploaded parts, keyed by part number (1-based).
    parts: BTreeMap<u32, String>,
    expected_parts: Option<u32>,
}

impl MultipartSession {
    /// Create a session for an upload id the server has issued.
    #[must_use]
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
        params: RequestParams,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            params,
            parts: BTreeMap::new(),
            expected_parts: None,
        }
    }

    /// Target bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Target key, unencoded.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Server-issued upload id.
    #[must_use]
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Parameters given at initiation; replayed on finalize.
    #[must_use]
    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    /// Declare how many parts the object has, so finalize can insist on all of them.
    pub fn set_expected_parts(&mut self, count: u32) {
        self.expected_parts = Some(count);
    }

    /// The declared part count, if any.
    #[must_use]
    pub fn expected_parts(&self) -> Option<u32> {
        self.expected_parts
    }

    /// Record the ETag of an uploaded part. Re-recording a part replaces it.
    pub fn record_part(&mut self, part_number: u32, etag: impl Into<String>) {
        self.parts.insert(part_number, etag.into());
    }

    /// The ETag recorded for a part.
    #[must_use]
    pub fn etag(&self, part_number: u32) -> Option<&str> {
        self.parts.get(&part_number).map(String::as_str)
    }

    /// Number of parts recorded so far.
    #[must_use]
    pub fn parts_count(&self) -> usize {
        self.parts.len()
    }

    /// The number the next sequential part should carry.
    #[must_use]
    pub fn next_part_number(&self) -> u32 {
        self.parts.last_key_value().map_or(1, |(n, _)| n + 1)
    }

    /// The completion manifest, in ascending part-number order.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::InvalidInput`] when no part was recorded, part
    /// numbers are not exactly `1..=n`, or fewer parts than declared exist.
    pub fn manifest(&self) -> SpeedyCloudResult<CompleteMultipartUpload> {
        if self.parts.is_empty() {
            return Err(SpeedyCloudError::InvalidInput(format!(
                "multipart upload {} has no parts",
                self.upload_id
            )));
        }
        if let Some(gap) = (1..).zip(self.parts.keys()).find(|(want, got)| want != *got) {
            return Err(SpeedyCloudError::InvalidInput(format!(
                "multipart upload {} is missing part {}",
                self.upload_id, gap.0
            )));
        }
        if let Some(expected) = self.expected_parts {
            let recorded = self.parts.len();
            if recorded != expected as usize {
                return Err(SpeedyCloudError::InvalidInput(format!(
                    "multipart upload {} has {recorded} of {expected} parts",
                    self.upload_id
                )));
            }
        }

        Ok(CompleteMultipartUpload {
            parts: self
                .parts
                .iter()
                .map(|(&part_number, etag)| CompletedPart {
                    part_number,
                    etag: etag.clone(),
                })
                .collect(),
        })
    }
}
