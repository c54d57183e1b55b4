//! Opening and closing the content stream of a page.
//!
//! The length of a page stream is only known once the page is closed, yet the stream
//! dictionary comes first. The dictionary therefore refers to the length through an
//! indirect object whose number is reserved when the page is opened and whose body is
//! written right after `endstream`. Nothing written before is ever touched again, which
//! keeps the output usable on pipes.

use std::io::Write;

use crate::configuration::LineNumbering;
use crate::document::Document;
use crate::error::ContextError;
use crate::numbers::general;
use crate::xref::ObjectId;

/// The objects of the page currently being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStream {
    pub stream_id: ObjectId,
    /// Reserved for the length of the stream, written after the stream itself.
    pub length_id: ObjectId,
    /// The offset of the first byte of the stream body.
    pub start: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// No page has been opened yet.
    Idle,
    Open(PageStream),
    /// The last page has been closed, a new one may be opened or the document finished.
    Closed,
    Done,
}

impl<W: Write> Document<W> {
    /// Starts a new page: the stream header, the bands, the margin labels and the text
    /// object the lines are printed into.
    pub(crate) fn open_page(&mut self) -> Result<(), ContextError> {
        match self.page_state {
            PageState::Idle | PageState::Closed => {}
            PageState::Open(page) => {
                return Err(ContextError::with_context(format!(
                    "Page {} is opened while the stream {} is still open",
                    self.page_count + 1,
                    page.stream_id
                )))
            }
            PageState::Done => {
                return Err(ContextError::with_context(
                    "No page can be opened once the document is finished",
                ))
            }
        }

        let stream_id = self.cross_references.allocate();
        let length_id = self.cross_references.allocate();
        self.page_count += 1;
        if self.style.line_numbering == LineNumbering::PerPage {
            self.line_count = 0;
        }

        self.writer
            .begin_object(&mut self.cross_references, stream_id)?;
        self.emit(&format!("<< /Length {} 0 R >>stream\n", length_id))?;
        let start = self.writer.position();
        self.page_state = PageState::Open(PageStream {
            stream_id,
            length_id,
            start,
        });
        log::debug!("Opened page {} as object {}", self.page_count, stream_id);

        self.draw_bands()?;
        self.draw_margin()?;

        let layout = self.layout;
        let top = layout.top_of_page();
        self.emit(&format!(
            "BT\n/F0 {} Tf\n",
            general(f64::from(layout.body_font_size))
        ))?;
        self.emit(&format!(
            "{} {} Td\n",
            general(f64::from(layout.margin_left)),
            general(f64::from(top))
        ))?;
        self.emit(&format!("{} TL\n", general(f64::from(layout.line_height))))?;
        self.cursor_y = top;

        Ok(())
    }

    /// Ends the text object and the stream, then writes the length and the page object.
    pub(crate) fn close_page(&mut self) -> Result<(), ContextError> {
        let page = match self.page_state {
            PageState::Open(page) => page,
            _ => {
                return Err(ContextError::with_context(
                    "There is no open page to close",
                ))
            }
        };

        let page_id = self.cross_references.allocate();
        self.registry.append(page_id)?;

        self.emit("ET\n")?;
        let length = self.writer.position() - page.start;
        self.emit("endstream\nendobj\n")?;

        self.writer
            .begin_object(&mut self.cross_references, page.length_id)?;
        self.emit(&format!("\n{}\nendobj\n", length))?;

        self.writer
            .begin_object(&mut self.cross_references, page_id)?;
        self.emit(&format!(
            "<</Type/Page/Parent {} 0 R/Contents {} 0 R>>\nendobj\n",
            self.page_tree_id, page.stream_id
        ))?;
        self.page_state = PageState::Closed;
        log::debug!(
            "Closed page {} as object {}, {} bytes of content",
            self.page_count,
            page_id,
            length
        );

        Ok(())
    }

    /// Closes the current page and opens the next one.
    pub(crate) fn break_page(&mut self) -> Result<(), ContextError> {
        self.close_page()?;
        self.open_page()
    }
}

#[cfg(test)]
mod tests {
    use crate::configuration::Configuration;
    use crate::document::Document;

    use super::*;

    fn page_text(configuration: &Configuration) -> String {
        let mut document = Document::new(Vec::new(), configuration).unwrap();
        document.open_page().unwrap();
        document.close_page().unwrap();
        let output = document.into_inner().unwrap();
        String::from_utf8_lossy(&output).into_owned()
    }

    #[test]
    fn test_length_object_matches_the_stream_body() {
        let text = page_text(&Configuration::default());
        let body_start = text.find("stream\n").unwrap() + "stream\n".len();
        let body_end = text.find("endstream").unwrap();
        let expected = format!("3 0 obj\n{}\nendobj\n", body_end - body_start);
        assert!(text.contains(&expected), "{}", text);
    }

    #[test]
    fn test_page_objects_follow_the_stream() {
        let text = page_text(&Configuration::default());
        let stream_header = text.find("2 0 obj<< /Length 3 0 R >>stream\n").unwrap();
        let length = text.find("3 0 obj\n").unwrap();
        let page = text
            .find("4 0 obj<</Type/Page/Parent 1 0 R/Contents 2 0 R>>\nendobj\n")
            .unwrap();
        assert!(stream_header < length && length < page);
        assert!(text.contains("BT\n/F0 9 Tf\n54 576 Td\n9 TL\n"));
        assert!(text.contains("ET\nendstream\nendobj\n"));
    }

    #[test]
    fn test_state_transitions() {
        let mut document = Document::new(Vec::new(), &Configuration::default()).unwrap();
        assert!(document.close_page().is_err());
        document.open_page().unwrap();
        assert!(document.open_page().is_err());
        document.break_page().unwrap();
        assert_eq!(document.page_count, 2);
        document.close_page().unwrap();
        assert_eq!(document.page_state, PageState::Closed);
        assert_eq!(document.registry.page_count(), 2);
    }

    #[test]
    fn test_line_numbers_restart_per_page() {
        let mut configuration = Configuration::default();
        configuration.style.line_numbering = LineNumbering::PerPage;
        let mut document = Document::new(Vec::new(), &configuration).unwrap();
        document.line_count = 41;
        document.open_page().unwrap();
        assert_eq!(document.line_count, 0);

        configuration.style.line_numbering = LineNumbering::Running;
        let mut document = Document::new(Vec::new(), &configuration).unwrap();
        document.line_count = 41;
        document.open_page().unwrap();
        assert_eq!(document.line_count, 41);
    }
}
