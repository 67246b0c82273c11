//! SpeedyCloud object storage.
//!
//! [`ObjectStorageClient`] exposes the four verbs over the signed, pooled
//! transport and returns raw bodies with their headers. [`MultipartCoordinator`]
//! drives the three-phase multipart upload on top of it:
//!
//! ```text
//! INITIATE     POST   /{bucket}/{key}?uploads                  -> UploadId
//! UPLOAD_PART  PUT    /{bucket}/{key}?partNumber=N&uploadId=U  -> ETag   (N = 1, 2, ...)
//! FINALIZE     POST   /{bucket}/{key}?uploadId=U               <- CompleteMultipartUpload
//! ```

pub mod client;
pub mod coordinator;
pub mod paths;
pub mod session;

pub use client::ObjectStorageClient;
pub use coordinator::{MAX_OBJECT_SIZE, MultipartCoordinator, PART_SIZE, PartPlan, plan_parts};
pub use paths::{bucket_path, object_path};
pub use session::MultipartSession;
