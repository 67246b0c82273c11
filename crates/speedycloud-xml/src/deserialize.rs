//! Reading object-storage XML responses.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::XmlError;
use crate::serialize::S3_NAMESPACE;

/// Server-reported error details from an `<Error>` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerError {
    /// Machine-readable error code (e.g. `NoSuchBucket`).
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

/// Extract the `UploadId` text from an `InitiateMultipartUploadResult`.
///
/// The element is searched at any depth. It must be in the S3 namespace or in
/// no namespace at all; an `UploadId` bound to another namespace is ignored.
/// Returns `Ok(None)` when the document has no such element.
///
/// # Errors
///
/// Returns `XmlError` if the document is not well-formed.
pub fn parse_upload_id(xml: &[u8]) -> Result<Option<String>, XmlError> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(e)) if e.local_name().as_ref() == b"UploadId" => {
                if in_s3_namespace(&ns) {
                    let text = read_text_content(&mut reader)?;
                    return Ok(Some(text).filter(|id| !id.is_empty()));
                }
            }
            (_, Event::Eof) => return Ok(None),
            _ => {}
        }
    }
}

/// Parse an `<Error>` document. Returns `None` when the body is not one.
#[must_use]
pub fn parse_server_error(xml: &[u8]) -> Option<ServerError> {
    match read_server_error(xml) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(error = %e, "response body is not a parsable error document");
            None
        }
    }
}

fn read_server_error(xml: &[u8]) -> Result<Option<ServerError>, XmlError> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    // Find the root element.
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Error" => break,
            Event::Start(_) | Event::Empty(_) | Event::Eof => return Ok(None),
            _ => {}
        }
    }

    let mut error = ServerError::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Code" => error.code = Some(read_text_content(&mut reader)?),
                b"Message" => error.message = Some(read_text_content(&mut reader)?),
                _ => skip_element(&mut reader)?,
            },
            Event::End(_) => break,
            Event::Eof => return Err(XmlError::UnexpectedEof("Error".to_owned())),
            _ => {}
        }
    }

    Ok(Some(error))
}

fn in_s3_namespace(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == S3_NAMESPACE.as_bytes(),
        ResolveResult::Unbound => true,
        ResolveResult::Unknown(_) => false,
    }
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut NsReader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedEof(
                    "while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut NsReader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedEof("while skipping element".to_owned()));
            }
            _ => {}
        }
    }
}
