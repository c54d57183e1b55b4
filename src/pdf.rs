use std::io::Write;

use crate::error::ContextError;
use crate::xref::{CrossReferenceTable, ObjectId};

/// The append-only output of the converter.
///
/// The writer keeps track of how many bytes went through it, which is the offset the
/// cross-reference table needs for every object and the measure of each page stream.
/// Nothing that has been written is ever revisited, so any `Write` works as a sink,
/// standard output included.
#[derive(Debug)]
pub struct PdfWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new(inner: W) -> Self {
        PdfWriter { inner, position: 0 }
    }

    /// The number of bytes written so far, i.e. the offset of the next byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ContextError> {
        self.inner.write_all(bytes).map_err(|error| {
            ContextError::with_error(
                format!("Failed to write to the output at offset {}", self.position),
                &error,
            )
        })?;
        self.position += bytes.len() as u64;

        Ok(())
    }

    pub fn write_str(&mut self, text: &str) -> Result<(), ContextError> {
        self.write_bytes(text.as_bytes())
    }

    /// Records the current offset for the object and writes its `N 0 obj` header.
    ///
    /// The header is not followed by a line break: the dictionary or the line break of
    /// the body comes right after it.
    pub fn begin_object(
        &mut self,
        cross_references: &mut CrossReferenceTable,
        id: ObjectId,
    ) -> Result<(), ContextError> {
        cross_references.record_offset(id, self.position)?;
        self.write_str(&format!("{} 0 obj", id))
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flushes the sink and hands it back.
    pub fn into_inner(mut self) -> Result<W, ContextError> {
        self.inner
            .flush()
            .map_err(|error| ContextError::with_error("Failed to flush the output", &error))?;
        Ok(self.inner)
    }
}

/// Lets sections rendered elsewhere, such as the cross-reference table, stream straight
/// into the output without losing track of the position.
impl<W: Write> Write for PdfWriter<W> {
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buffer)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_counts_every_byte() {
        let mut writer = PdfWriter::new(Vec::new());
        writer.write_str("%PDF-1.4\n").unwrap();
        writer.write_bytes(b"%\xE2\xE3\xCF\xD3\n").unwrap();
        assert_eq!(writer.position(), 15);
        assert_eq!(writer.into_inner().unwrap().len(), 15);
    }

    #[test]
    fn test_begin_object_records_header_offset() {
        let mut table = CrossReferenceTable::new();
        let mut writer = PdfWriter::new(Vec::new());
        writer.write_str("%PDF-1.4\n").unwrap();
        let id = table.allocate();
        writer.begin_object(&mut table, id).unwrap();
        assert_eq!(table.offset(id), Some(9));

        let output = writer.into_inner().unwrap();
        assert_eq!(&output[9..], b"1 0 obj");
    }

    #[test]
    fn test_write_failures_carry_the_offset() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "Disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = PdfWriter::new(FailingSink);
        let error = writer.write_str("xref").unwrap_err();
        assert_eq!(error.to_string(), "Failed to write to the output at offset 0: disk full");
    }

    #[test]
    fn test_sections_streamed_through_write_are_counted() {
        let mut table = CrossReferenceTable::new();
        let id = table.allocate();
        table.record_offset(id, 9).unwrap();

        let mut writer = PdfWriter::new(Vec::new());
        table.write_to(&mut writer).unwrap();
        assert_eq!(writer.position(), 49);
    }
}
