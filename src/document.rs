use std::io::{BufRead, ErrorKind, Write};

use crate::color::RgbColor;
use crate::configuration::{Configuration, Layout, StyleConfiguration};
use crate::error::ContextError;
use crate::numbers::general;
use crate::page::PageState;
use crate::pdf::PdfWriter;
use crate::registry::PageRegistry;
use crate::xref::{CrossReferenceTable, ObjectId};

/// Input lines are cut to this many bytes.
pub const MAXIMUM_LINE_LENGTH: usize = 4095;

/// The first bytes of every document: the version, a comment with four bytes above 127
/// so that transfer tools treat the file as binary, and an identifying comment.
const HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n% PDF: Adobe Portable Document Format\n";

/// What a finished conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSummary {
    pub pages: u32,
    /// Indirect objects written, the free-list head excluded.
    pub objects: u32,
    pub bytes: u64,
}

/// One conversion in progress, from the header to the trailer.
///
/// The document owns every piece of state the conversion needs: the output, the object
/// numbering, the finished pages and the position of the text cursor on the current
/// page. Pages are opened and closed as the input demands while the lines are
/// translated, and [`Document::finish`] writes the shared resources, the page tree, the
/// catalog and the cross-reference table once the input is exhausted.
#[derive(Debug)]
pub struct Document<W: Write> {
    pub(crate) writer: PdfWriter<W>,
    pub(crate) cross_references: CrossReferenceTable,
    pub(crate) registry: PageRegistry,
    pub(crate) page_tree_id: ObjectId,
    pub(crate) asa: bool,
    pub(crate) layout: Layout,
    pub(crate) style: StyleConfiguration,
    pub(crate) page_state: PageState,
    /// The baseline of the most recently printed line.
    pub(crate) cursor_y: f32,
    /// The number printed in front of the next line when numbering is enabled, minus one.
    pub(crate) line_count: i64,
    /// Pages opened so far, the current one included.
    pub(crate) page_count: u32,
    pub(crate) current_color: RgbColor,
    /// The line of the input being translated, for diagnostics.
    pub(crate) input_line: u64,
}

impl<W: Write> Document<W> {
    /// Validates the configuration and writes the header of the document.
    pub fn new(output: W, configuration: &Configuration) -> Result<Self, ContextError> {
        let configuration = configuration.clone().validated()?;
        let layout = Layout::from(&configuration.layout);
        log::debug!(
            "Page {}x{}, line height {}, {} lines per page",
            layout.page_width,
            layout.page_height,
            layout.line_height,
            layout.lines_per_page
        );

        let mut cross_references = CrossReferenceTable::new();
        // Every page refers to its parent, so the tree is numbered before the first page
        let page_tree_id = cross_references.allocate();

        let mut writer = PdfWriter::new(output);
        writer.write_bytes(HEADER)?;

        Ok(Document {
            writer,
            cross_references,
            registry: PageRegistry::new(),
            page_tree_id,
            asa: configuration.asa,
            layout,
            current_color: configuration.style.font_color,
            style: configuration.style,
            page_state: PageState::Idle,
            cursor_y: layout.top_of_page(),
            line_count: 0,
            page_count: 0,
            input_line: 0,
        })
    }

    /// Translates every line of the input, from the first page to the last one.
    ///
    /// An empty input still produces a single, empty page.
    pub fn translate<R: BufRead>(&mut self, input: R) -> Result<(), ContextError> {
        self.open_page()?;

        let mut reader = LineReader::new(input);
        let mut line = Vec::new();
        while reader.next_line(&mut line)? {
            self.input_line = reader.line_number();
            self.translate_line(&line)?;
        }

        self.close_page()
    }

    /// Writes the fonts, the page tree, the catalog, the cross-reference table and the
    /// trailer. The document cannot be written to afterwards.
    pub fn finish(&mut self) -> Result<ConversionSummary, ContextError> {
        match self.page_state {
            PageState::Closed => {}
            PageState::Idle => {
                return Err(ContextError::with_context(
                    "The document cannot be finished before any page was written",
                ))
            }
            PageState::Open(_) => {
                return Err(ContextError::with_context(format!(
                    "Page {} is still open",
                    self.page_count
                )))
            }
            PageState::Done => {
                return Err(ContextError::with_context(
                    "The document has already been finished",
                ))
            }
        }
        self.page_state = PageState::Done;

        let body_font = self.style.body_font.clone();
        let heading_font = self.style.heading_font.clone();
        let body_font_id = self.write_font(&body_font)?;
        let heading_font_id = self.write_font(&heading_font)?;
        self.write_page_tree(body_font_id, heading_font_id)?;

        let catalog_id = self.cross_references.allocate();
        self.writer
            .begin_object(&mut self.cross_references, catalog_id)?;
        self.writer.write_str(&format!(
            "<</Type /Catalog /Pages {} 0 R>>\nendobj\n",
            self.page_tree_id
        ))?;

        let start_xref = self.writer.position();
        self.cross_references.write_to(&mut self.writer)?;
        self.writer.write_str(&format!(
            "trailer\n<<\n/Size {}\n/Root {} 0 R\n>>\nstartxref\n{}\n%%EOF\n",
            self.cross_references.size(),
            catalog_id,
            start_xref
        ))?;

        let summary = ConversionSummary {
            pages: self.registry.page_count(),
            objects: self.cross_references.size() - 1,
            bytes: self.writer.position(),
        };
        log::debug!("Cross-reference table written at offset {}", start_xref);

        Ok(summary)
    }

    /// Flushes the output and hands it back.
    pub fn into_inner(self) -> Result<W, ContextError> {
        self.writer.into_inner()
    }

    /// A Type1 font object with the Windows ANSI encoding, which is how the input bytes
    /// are interpreted.
    fn write_font(&mut self, base_font: &str) -> Result<ObjectId, ContextError> {
        let font_id = self.cross_references.allocate();
        self.writer
            .begin_object(&mut self.cross_references, font_id)?;
        self.writer.write_str(&format!(
            "<</Type/Font/Subtype/Type1/BaseFont/{}/Encoding/WinAnsiEncoding>>\nendobj\n",
            base_font
        ))?;

        Ok(font_id)
    }

    /// The root of the page tree, carrying the resources and the media box every page
    /// inherits.
    fn write_page_tree(
        &mut self,
        body_font_id: ObjectId,
        heading_font_id: ObjectId,
    ) -> Result<(), ContextError> {
        let page_ids = self.registry.drain()?;

        let mut page_tree = format!("<</Type /Pages /Count {}\n", self.registry.page_count());
        page_tree.push_str("/Kids[\n");
        for page_id in &page_ids {
            page_tree.push_str(&format!("{} 0 R\n", page_id));
        }
        page_tree.push_str("]\n");
        page_tree.push_str("/Resources<</ProcSet[/PDF/Text]/Font<<");
        page_tree.push_str(&format!("/F0 {} 0 R\n", body_font_id));
        page_tree.push_str(&format!("/F1 {} 0 R\n", heading_font_id));
        page_tree.push_str(&format!(
            "/F2<</Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >> >>\n",
            self.style.heading_font
        ));
        page_tree.push_str(&format!(
            ">>/MediaBox [ 0 0 {} {} ]\n",
            general(f64::from(self.layout.page_width)),
            general(f64::from(self.layout.page_height))
        ));
        page_tree.push_str(">>\nendobj\n");

        self.writer
            .begin_object(&mut self.cross_references, self.page_tree_id)?;
        self.writer.write_str(&page_tree)
    }

    /// Appends raw content to the output.
    pub(crate) fn emit(&mut self, content: &str) -> Result<(), ContextError> {
        self.writer.write_str(content)
    }

    pub(crate) fn emit_bytes(&mut self, content: &[u8]) -> Result<(), ContextError> {
        self.writer.write_bytes(content)
    }

    /// Whether the cursor still sits on the first baseline of the page.
    pub(crate) fn at_top(&self) -> bool {
        self.cursor_y >= self.layout.top_of_page()
    }
}

/// Converts the whole input into a PDF document written to the output.
///
/// Returns the flushed output together with what was written into it.
pub fn convert<R: BufRead, W: Write>(
    input: R,
    output: W,
    configuration: &Configuration,
) -> Result<(W, ConversionSummary), ContextError> {
    let mut document = Document::new(output, configuration)?;
    document.translate(input)?;
    let summary = document.finish()?;
    log::info!(
        "Wrote {} pages, {} objects and {} bytes",
        summary.pages,
        summary.objects,
        summary.bytes
    );

    Ok((document.into_inner()?, summary))
}

/// Splits the input into lines of bytes.
///
/// The line feed is removed; lines longer than [`MAXIMUM_LINE_LENGTH`] are truncated
/// with a warning. The bytes themselves are never decoded.
pub struct LineReader<R: BufRead> {
    input: R,
    line_number: u64,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(input: R) -> Self {
        LineReader {
            input,
            line_number: 0,
        }
    }

    /// The number of the line last returned, starting at 1.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Reads the next line into `line`, returning `false` at the end of the input.
    ///
    /// Bytes past [`MAXIMUM_LINE_LENGTH`] are dropped as they are read.
    pub fn next_line(&mut self, line: &mut Vec<u8>) -> Result<bool, ContextError> {
        line.clear();
        let mut length = 0;
        let mut read_any = false;
        loop {
            let available = match self.input.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    return Err(ContextError::with_error(
                        format!("Failed to read line {} of the input", self.line_number + 1),
                        &error,
                    ))
                }
            };
            if available.is_empty() {
                break;
            }
            read_any = true;

            let line_feed = available.iter().position(|&byte| byte == b'\n');
            let chunk = &available[..line_feed.unwrap_or(available.len())];
            let room = MAXIMUM_LINE_LENGTH.saturating_sub(line.len());
            line.extend_from_slice(&chunk[..chunk.len().min(room)]);
            length += chunk.len();

            let consumed = line_feed.map_or(chunk.len(), |position| position + 1);
            self.input.consume(consumed);
            if line_feed.is_some() {
                break;
            }
        }
        if !read_any {
            return Ok(false);
        }
        self.line_number += 1;

        if length > MAXIMUM_LINE_LENGTH {
            log::warn!(
                "Line {} is {} bytes long, truncated to {}",
                self.line_number,
                length,
                MAXIMUM_LINE_LENGTH
            );
        }

        Ok(true)
    }
}
