//! Writing the multipart completion manifest.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::BytesText;

use crate::error::XmlError;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// One `(PartNumber, ETag)` entry of the completion manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// ETag returned when the part was uploaded.
    pub etag: String,
}

/// The `CompleteMultipartUpload` request body.
///
/// Parts are written in the order held; callers build it in ascending
/// part-number order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUpload {
    /// Parts to stitch together.
    pub parts: Vec<CompletedPart>,
}

impl CompleteMultipartUpload {
    /// Serialize the manifest.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if writing fails.
    pub fn to_xml(&self) -> Result<Vec<u8>, XmlError> {
        let mut buf = Vec::with_capacity(64 + self.parts.len() * 96);
        let mut writer = Writer::new(&mut buf);

        writer
            .create_element("CompleteMultipartUpload")
            .write_inner_content(|w| {
                for part in &self.parts {
                    write_part(w, part)?;
                }
                Ok(())
            })?;

        Ok(buf)
    }
}

fn write_part<W: Write>(writer: &mut Writer<W>, part: &CompletedPart) -> io::Result<()> {
    writer.create_element("Part").write_inner_content(|w| {
        write_text_element(w, "PartNumber", &part.part_number.to_string())?;
        write_text_element(w, "ETag", &part.etag)
    })?;
    Ok(())
}

/// Write a simple `<tag>text</tag>` element.
///
/// Only `<`, `>` and `&` are escaped, so quoted ETags stay verbatim.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::from_escaped(partial_escape(text)))?;
    Ok(())
}
