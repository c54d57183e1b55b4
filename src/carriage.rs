//! Translation of input lines into text operators.
//!
//! In ASA mode the first byte of every line is a carriage-control code telling how far
//! to move before the rest of the line is printed, and possibly in which colour. The
//! codes are decoded into a [`ControlCode`] whose [`Action`] drives the engine, so the
//! whole vocabulary can be read off [`ControlCode::action`].
//!
//! In free-form mode the whole line is printed, a form feed starts a new page and a
//! carriage return overprints what follows onto the baseline of what precedes it.
//!
//! The engine keeps the vertical position of the text cursor in step with the operators
//! it writes: `T*` moves down by one leading and `0 <leading> Td` moves back up.

use std::io::Write;

use crate::color::RgbColor;
use crate::configuration::LineNumbering;
use crate::document::Document;
use crate::error::ContextError;
use crate::numbers::fixed;

pub const FORM_FEED: u8 = 0x0C;

/// Added to every byte of an extended line, mapping 7-bit text onto the upper half of
/// the font encoding.
const EXTENDED_OFFSET: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primary {
    Red,
    Green,
    Blue,
}

impl Primary {
    pub fn color(self) -> RgbColor {
        match self {
            Primary::Red => RgbColor::RED,
            Primary::Green => RgbColor::GREEN,
            Primary::Blue => RgbColor::BLUE,
        }
    }
}

/// A decoded ASA carriage-control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    /// `1`
    NewPage,
    /// `0`
    SkipLine,
    /// `-`
    SkipTwoLines,
    /// `+`
    Overstrike,
    /// `R`, `G` and `B`
    ColoredOverstrike(Primary),
    /// `r`, `g` and `b`
    Colored(Primary),
    /// `H`
    HalfLineUp,
    /// `^`
    ExtendedOverstrike,
    /// A space or `>`.
    Advance,
    FormFeed,
    Unknown(u8),
}

/// The cursor movement made before the text of a line is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Nothing beyond the line advance of the text itself.
    None,
    /// A new page, unless the cursor is still at the top of the current one.
    NewPage,
    BlankLines(u8),
    /// Print on the baseline of the previous line.
    HoldBaseline,
    /// Move up by half a line.
    RaiseHalfLine,
}

/// The colour a line is printed in, until the line is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Overstrike,
    Primary(Primary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub motion: Motion,
    pub ink: Option<Ink>,
    /// Whether the bytes of the line are shifted into the upper half of the encoding.
    pub extended: bool,
}

impl Action {
    const fn new(motion: Motion, ink: Option<Ink>, extended: bool) -> Self {
        Action {
            motion,
            ink,
            extended,
        }
    }
}

impl ControlCode {
    pub fn from_byte(byte: u8) -> ControlCode {
        match byte {
            b'1' => ControlCode::NewPage,
            b'0' => ControlCode::SkipLine,
            b'-' => ControlCode::SkipTwoLines,
            b'+' => ControlCode::Overstrike,
            b'R' => ControlCode::ColoredOverstrike(Primary::Red),
            b'G' => ControlCode::ColoredOverstrike(Primary::Green),
            b'B' => ControlCode::ColoredOverstrike(Primary::Blue),
            b'r' => ControlCode::Colored(Primary::Red),
            b'g' => ControlCode::Colored(Primary::Green),
            b'b' => ControlCode::Colored(Primary::Blue),
            b'H' => ControlCode::HalfLineUp,
            b'^' => ControlCode::ExtendedOverstrike,
            b' ' | b'>' => ControlCode::Advance,
            FORM_FEED => ControlCode::FormFeed,
            other => ControlCode::Unknown(other),
        }
    }

    pub fn action(self) -> Action {
        match self {
            ControlCode::NewPage | ControlCode::FormFeed => {
                Action::new(Motion::NewPage, None, false)
            }
            ControlCode::SkipLine => Action::new(Motion::BlankLines(1), None, false),
            ControlCode::SkipTwoLines => Action::new(Motion::BlankLines(2), None, false),
            ControlCode::Overstrike => {
                Action::new(Motion::HoldBaseline, Some(Ink::Overstrike), false)
            }
            ControlCode::ColoredOverstrike(primary) => {
                Action::new(Motion::HoldBaseline, Some(Ink::Primary(primary)), false)
            }
            ControlCode::Colored(primary) => {
                Action::new(Motion::None, Some(Ink::Primary(primary)), false)
            }
            ControlCode::HalfLineUp => Action::new(Motion::RaiseHalfLine, None, false),
            ControlCode::ExtendedOverstrike => Action::new(Motion::HoldBaseline, None, true),
            ControlCode::Advance | ControlCode::Unknown(_) => {
                Action::new(Motion::None, None, false)
            }
        }
    }

    /// Lines printed over the previous one never start a new page.
    pub fn holds_baseline(self) -> bool {
        self.action().motion == Motion::HoldBaseline
    }
}

/// The bytes of a literal string holding `payload`.
///
/// Parentheses and backslashes are escaped. Extended payloads are shifted first, and
/// escaped only where the shift lands on one of those delimiters.
pub fn escape(payload: &[u8], extended: bool) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(payload.len() + payload.len() / 8);
    for &byte in payload {
        let byte = if extended {
            byte.wrapping_add(EXTENDED_OFFSET)
        } else {
            byte
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            escaped.push(b'\\');
        }
        escaped.push(byte);
    }
    escaped
}

impl<W: Write> Document<W> {
    /// Translates one input line, the line feed already removed.
    pub(crate) fn translate_line(&mut self, line: &[u8]) -> Result<(), ContextError> {
        let mut line = line;
        while let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        let code = match (self.asa, line.first()) {
            (true, Some(&byte)) => Some(ControlCode::from_byte(byte)),
            _ => None,
        };

        // The one leading of slack absorbs the rounding of the cursor arithmetic
        let holds_baseline = code.map_or(false, ControlCode::holds_baseline);
        if !line.is_empty()
            && !holds_baseline
            && self.cursor_y <= self.layout.margin_bottom + 1.0
        {
            self.break_page()?;
        }

        match code {
            _ if line.is_empty() => self.blank_line(),
            Some(code) => self.translate_asa(code, &line[1..]),
            None => self.translate_free_form(line),
        }
    }

    fn translate_asa(&mut self, code: ControlCode, payload: &[u8]) -> Result<(), ContextError> {
        if let ControlCode::Unknown(byte) = code {
            log::warn!(
                "Unknown ASA carriage control character {:?} on line {}",
                char::from(byte),
                self.input_line
            );
        }

        let action = code.action();
        match action.motion {
            Motion::None => {}
            Motion::NewPage => {
                if !self.at_top() {
                    self.break_page()?;
                }
            }
            Motion::BlankLines(count) => {
                for _ in 0..count {
                    self.blank_line()?;
                }
            }
            Motion::HoldBaseline => self.hold_baseline()?,
            Motion::RaiseHalfLine => self.raise_half_line()?,
        }

        if let Some(ink) = action.ink {
            self.current_color = match ink {
                Ink::Overstrike => self.style.overstrike_color,
                Ink::Primary(primary) => primary.color(),
            };
        }
        self.text_line(payload, action.extended)?;
        if action.ink.is_some() {
            self.reset_color()?;
        }

        Ok(())
    }

    fn translate_free_form(&mut self, line: &[u8]) -> Result<(), ContextError> {
        // A carriage return only overprints when text was printed before it
        let mut hold_pending = false;
        let mut overstruck = false;
        let mut segment_start = 0;
        for (index, &byte) in line.iter().enumerate() {
            if byte != FORM_FEED && byte != b'\r' {
                continue;
            }
            let segment = &line[segment_start..index];
            segment_start = index + 1;
            if !segment.is_empty() {
                self.print_segment(segment, hold_pending)?;
                overstruck |= hold_pending;
            }

            if byte == FORM_FEED {
                hold_pending = false;
                if overstruck {
                    self.reset_color()?;
                    overstruck = false;
                }
                if !self.at_top() {
                    self.break_page()?;
                }
            } else {
                hold_pending |= !segment.is_empty();
            }
        }

        let tail = &line[segment_start..];
        if !tail.is_empty() {
            self.print_segment(tail, hold_pending)?;
            overstruck |= hold_pending;
        }
        if overstruck {
            self.reset_color()?;
        }
        Ok(())
    }

    /// Prints a segment of a free-form line, on the baseline of the previous segment and
    /// in the overstrike colour when `overprint` is set.
    fn print_segment(&mut self, segment: &[u8], overprint: bool) -> Result<(), ContextError> {
        if overprint {
            self.current_color = self.style.overstrike_color;
            self.hold_baseline()?;
        }
        self.text_line(segment, false)
    }

    pub(crate) fn blank_line(&mut self) -> Result<(), ContextError> {
        self.emit("T*()Tj\n")?;
        self.cursor_y -= self.layout.line_height;
        self.line_count += 1;
        Ok(())
    }

    fn text_line(&mut self, payload: &[u8], extended: bool) -> Result<(), ContextError> {
        self.line_count += 1;
        self.emit("T*")?;
        self.show_text(payload, extended)?;
        self.emit("Tj\n")?;
        self.cursor_y -= self.layout.line_height;
        Ok(())
    }

    /// Moves the cursor back up by one leading, so that the next `T*` lands on the
    /// baseline of the previous line.
    fn hold_baseline(&mut self) -> Result<(), ContextError> {
        let line_height = self.layout.line_height;
        self.emit(&format!("0 {} Td\n", fixed(f64::from(line_height))))?;
        if !self.at_top() {
            self.cursor_y += line_height;
        }
        self.line_count -= 1;
        Ok(())
    }

    fn raise_half_line(&mut self) -> Result<(), ContextError> {
        let line_height = self.layout.line_height;
        self.emit(&format!("0 {} Td\n", fixed(f64::from(line_height) / 2.0)))?;
        if !self.at_top() {
            self.cursor_y += line_height * 0.5;
        }
        Ok(())
    }

    fn reset_color(&mut self) -> Result<(), ContextError> {
        self.current_color = self.style.font_color;
        self.emit(&format!("{}\n", self.style.font_color.fill_operator()))
    }

    /// Writes the operand of a `Tj`, preceded by the line number or the colour change the
    /// line needs.
    fn show_text(&mut self, payload: &[u8], extended: bool) -> Result<(), ContextError> {
        if self.style.line_numbering != LineNumbering::Off {
            let body_size = fixed(f64::from(self.layout.body_font_size));
            self.emit(&format!(
                "/F1 {} Tf\n {}\n ({:6} | )Tj\n /F0 {} Tf\n {} ",
                body_size,
                self.style.line_number_color.fill_operator(),
                self.line_count,
                body_size,
                self.current_color.fill_operator()
            ))?;
        } else if self.current_color != self.style.font_color {
            self.emit(&format!(" {}\n", self.current_color.fill_operator()))?;
        }

        self.emit("(")?;
        self.emit_bytes(&escape(payload, extended))?;
        self.emit(")")
    }
}

#[cfg(test)]
mod tests {
    use crate::configuration::Configuration;

    use super::*;

    /// Translates `lines` on a fresh page and returns what was written after the page
    /// setup, together with the document.
    fn translated(configuration: &Configuration, lines: &[&[u8]]) -> (String, Document<Vec<u8>>) {
        let mut document = Document::new(Vec::new(), configuration).unwrap();
        document.open_page().unwrap();
        let setup = document.writer.position() as usize;
        for line in lines {
            document.translate_line(line).unwrap();
        }
        let text = {
            let output: &Vec<u8> = document.writer.get_ref();
            String::from_utf8_lossy(&output[setup..]).into_owned()
        };
        (text, document)
    }

    #[test]
    fn test_control_code_table() {
        assert_eq!(ControlCode::from_byte(b'1'), ControlCode::NewPage);
        assert_eq!(
            ControlCode::from_byte(b'G').action(),
            Action::new(Motion::HoldBaseline, Some(Ink::Primary(Primary::Green)), false)
        );
        assert_eq!(
            ControlCode::from_byte(b'b').action(),
            Action::new(Motion::None, Some(Ink::Primary(Primary::Blue)), false)
        );
        assert_eq!(ControlCode::from_byte(b'-').action().motion, Motion::BlankLines(2));
        assert_eq!(ControlCode::from_byte(b'>'), ControlCode::Advance);
        assert_eq!(ControlCode::from_byte(b'Z'), ControlCode::Unknown(b'Z'));

        let holding: Vec<u8> = (0..=255u8)
            .filter(|&byte| ControlCode::from_byte(byte).holds_baseline())
            .collect();
        assert_eq!(holding, b"+BGR^".to_vec());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(b"(test)", false), b"\\(test\\)".to_vec());
        assert_eq!(escape(b"a\\b", false), b"a\\\\b".to_vec());
        assert_eq!(escape(b"AB", true), vec![0xC0, 0xC1]);
        // 169 + 127 wraps around to `(`
        assert_eq!(escape(&[169, 200], true), vec![b'\\', b'(', 71]);
    }

    #[test]
    fn test_skip_codes_emit_blank_lines() {
        let configuration = Configuration::default();
        let (text, document) = translated(&configuration, &[b"1Hello", b"0World"]);
        assert_eq!(text, "T*(Hello)Tj\nT*()Tj\nT*(World)Tj\n");
        assert_eq!(document.cursor_y, 576.0 - 27.0);
        assert_eq!(document.page_count, 1);

        let (text, document) = translated(&configuration, &[b"-Three"]);
        assert_eq!(text, "T*()Tj\nT*()Tj\nT*(Three)Tj\n");
        assert_eq!(document.cursor_y, 576.0 - 27.0);
    }

    #[test]
    fn test_overstrike_holds_the_baseline_in_colour() {
        let mut configuration = Configuration::default();
        configuration.style.overstrike_color = RgbColor::RED;
        let (text, document) = translated(&configuration, &[b" under", b"+____"]);
        assert_eq!(
            text,
            "T*(under)Tj\n\
             0 9.000000 Td\n\
             T* 1.000000 0.000000 0.000000 rg\n(____)Tj\n\
             0.000000 0.000000 0.000000 rg\n"
        );
        assert_eq!(document.cursor_y, 567.0);
        assert_eq!(document.current_color, RgbColor::BLACK);
    }

    #[test]
    fn test_each_primary_code_selects_its_own_colour() {
        let configuration = Configuration::default();
        let (text, _) = translated(&configuration, &[b" x", b"Gy", b"rz"]);
        assert!(text.contains("0 9.000000 Td\nT* 0.000000 1.000000 0.000000 rg\n(y)Tj\n"));
        assert!(text.contains("T* 1.000000 0.000000 0.000000 rg\n(z)Tj\n"));
        assert_eq!(text.matches("0.000000 0.000000 0.000000 rg\n").count(), 2);
    }

    #[test]
    fn test_half_line_and_extended_codes() {
        let configuration = Configuration::default();
        let (text, document) = translated(&configuration, &[b" a", b"Hb", b"^AB"]);
        assert!(text.contains("0 4.500000 Td\nT*(b)Tj\n"));
        assert!(text.ends_with("0 9.000000 Td\nT*(\u{FFFD}\u{FFFD})Tj\n"));
        assert_eq!(document.cursor_y, 576.0 - 9.0 + 4.5 - 9.0);
    }

    #[test]
    fn test_new_page_only_when_not_at_top() {
        let configuration = Configuration::default();
        let (_, document) = translated(&configuration, &[b"1first", b"1second", b"\x0Cthird"]);
        assert_eq!(document.page_count, 3);
        assert_eq!(document.registry.page_count(), 2);
    }

    #[test]
    fn test_bottom_of_page_breaks_before_the_line() {
        let configuration = Configuration::default();
        let line: &[u8] = b" line";
        let lines = vec![line; 60];
        let (_, mut document) = translated(&configuration, &lines);
        assert_eq!(document.page_count, 1);
        assert_eq!(document.cursor_y, 36.0);

        // Overprinting the last line stays on the page
        document.translate_line(b"+____").unwrap();
        assert_eq!(document.page_count, 1);
        document.translate_line(b"").unwrap();
        assert_eq!(document.page_count, 1);

        document.translate_line(b" next").unwrap();
        assert_eq!(document.page_count, 2);
        assert_eq!(document.cursor_y, 567.0);
    }

    #[test]
    fn test_free_form_carriage_return_overprints() {
        let mut configuration = Configuration::default();
        configuration.asa = false;
        let (text, document) = translated(&configuration, &[b"1abc\rdef\r"]);
        assert_eq!(
            text,
            "T*(1abc)Tj\n0 9.000000 Td\nT*(def)Tj\n0.000000 0.000000 0.000000 rg\n"
        );
        assert_eq!(document.cursor_y, 567.0);
    }

    #[test]
    fn test_free_form_carriage_returns_without_text_do_not_move() {
        let mut configuration = Configuration::default();
        configuration.asa = false;

        // Consecutive carriage returns overprint once
        let (text, document) = translated(&configuration, &[b"first", b"a\r\rb"]);
        assert_eq!(
            text,
            "T*(first)Tj\nT*(a)Tj\n0 9.000000 Td\nT*(b)Tj\n0.000000 0.000000 0.000000 rg\n"
        );
        assert_eq!(document.cursor_y, 558.0);

        // Nothing printed before the carriage return, nothing to overprint
        let (text, document) = translated(&configuration, &[b"first", b"\rabc"]);
        assert_eq!(text, "T*(first)Tj\nT*(abc)Tj\n");
        assert_eq!(document.cursor_y, 558.0);

        // Every final carriage return is dropped
        let (text, document) = translated(&configuration, &[b"first", b"abc\r\r", b"next"]);
        assert_eq!(text, "T*(first)Tj\nT*(abc)Tj\nT*(next)Tj\n");
        assert_eq!(document.cursor_y, 549.0);
        assert_eq!(document.line_count, 3);

        // A form feed ends the overprint before the next page
        configuration.style.overstrike_color = RgbColor::RED;
        let (text, document) = translated(&configuration, &[b"a\rb\x0Cc"]);
        assert_eq!(document.page_count, 2);
        assert!(text.ends_with("T*(c)Tj\n"));
        assert!(text.contains(
            "T* 1.000000 0.000000 0.000000 rg\n(b)Tj\n0.000000 0.000000 0.000000 rg\nET\n"
        ));
        assert_eq!(document.current_color, RgbColor::BLACK);
    }

    #[test]
    fn test_free_form_form_feed_breaks_the_page() {
        let mut configuration = Configuration::default();
        configuration.asa = false;
        let (text, document) = translated(&configuration, &[b"\x0Cone\x0Ctwo"]);
        assert_eq!(document.page_count, 2);
        assert!(text.starts_with("T*(one)Tj\nET\nendstream\n"));
        assert!(text.ends_with("T*(two)Tj\n"));
    }

    #[test]
    fn test_line_numbers_prefix_the_text() {
        let mut configuration = Configuration::default();
        configuration.style.line_numbering = LineNumbering::Running;
        let (text, document) = translated(&configuration, &[b" first", b"+over", b" second"]);
        assert!(text.starts_with(
            "T*/F1 9.000000 Tf\n 0.200000 0.000000 0.600000 rg\n (     1 | )Tj\n \
             /F0 9.000000 Tf\n 0.000000 0.000000 0.000000 rg (first)Tj\n"
        ));
        // The overprinted line repeats the number of the line below it
        assert_eq!(text.matches("(     1 | )Tj").count(), 2);
        assert!(text.contains("(     2 | )Tj"));
        assert_eq!(document.line_count, 2);
    }

    #[test]
    fn test_unknown_codes_print_the_rest_of_the_line() {
        let configuration = Configuration::default();
        let (text, _) = translated(&configuration, &[b"Zebra", b"\r"]);
        assert_eq!(text, "T*(ebra)Tj\nT*()Tj\n");
    }
}
