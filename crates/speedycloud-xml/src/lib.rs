//! XML wire formats for the SpeedyCloud object-storage API.
//!
//! Only the documents the transport core needs are handled here:
//!
//! - reading the `UploadId` out of an `InitiateMultipartUploadResult`
//! - reading `<Error><Code/><Message/></Error>` bodies for diagnostics
//! - writing the `CompleteMultipartUpload` manifest
//!
//! # Conventions
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - The completion manifest is written without declaration or namespace:
//!   `<CompleteMultipartUpload><Part><PartNumber>1</PartNumber><ETag>..</ETag></Part>..</CompleteMultipartUpload>`

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{ServerError, parse_server_error, parse_upload_id};
pub use error::XmlError;
pub use serialize::{CompleteMultipartUpload, CompletedPart, S3_NAMESPACE};
