use std::io::Write;

use crate::carriage::escape;
use crate::configuration::PageNumbering;
use crate::document::Document;
use crate::error::ContextError;
use crate::numbers::fixed;

/// The advance of a glyph of the fixed-pitch title font, relative to its size.
const CHARACTER_WIDTH_RATIO: f32 = 0.60;

/// The banner is printed this much larger than the titles.
const BANNER_SIZE_INCREASE: f32 = 2.0;

/// The banner is always bright red.
const BANNER_FILL: &str = "0.9 0.0 0.0 rg\n";

impl<W: Write> Document<W> {
    /// Paints the bands behind the text, each `shade_step` lines high.
    ///
    /// Without a dash pattern the bands are filled rectangles separated by a gap of the
    /// same height. With one, a dashed rule is drawn at every band boundary instead.
    pub(crate) fn draw_bands(&mut self) -> Result<(), ContextError> {
        let layout = self.layout;
        let body_size = layout.body_font_size;
        let dash_pattern = self.style.dash_pattern.clone();
        let dashed = !dash_pattern.is_empty();

        self.emit(&format!("{}\n", self.style.bar_color.fill_operator()))?;
        self.emit("1 i\n")?;

        let x = layout.margin_left - 0.1 * body_size;
        let height = self.style.shade_step as f32 * layout.line_height;
        let mut y = layout.page_height - layout.margin_top - height - 0.22 * body_size;
        let width = layout.text_width();
        let mut step = 1.0f32;
        if dashed {
            self.emit(&format!("0 w [{}] 0 d\n", dash_pattern))?;
        }

        while y >= layout.margin_bottom - height {
            if dashed {
                self.emit(&format!(
                    "{} {} m {} {} l s\n",
                    fixed(f64::from(x)),
                    fixed(f64::from(y)),
                    fixed(f64::from(x + width)),
                    fixed(f64::from(y))
                ))?;
            } else {
                self.emit(&format!(
                    "{} {} {} {} re f\n",
                    fixed(f64::from(x)),
                    fixed(f64::from(y)),
                    fixed(f64::from(width)),
                    fixed(f64::from(height))
                ))?;
                step = 2.0;
            }
            y -= step * height;
        }

        if dashed {
            self.emit("[] 0 d\n")?;
        }
        self.emit("0 G\n0 g\n")
    }

    /// Prints the banner, the titles and the page label around the text area, then
    /// selects the font colour for the body.
    pub(crate) fn draw_margin(&mut self) -> Result<(), ContextError> {
        self.draw_banner()?;

        let layout = self.layout;
        let size = layout.title_font_size;
        let character_width = size * CHARACTER_WIDTH_RATIO;
        let heading_y = layout.page_height - layout.margin_top + 0.12 * size;
        self.emit(&format!("{}\n", self.style.title_color.fill_operator()))?;

        let right_title = self.style.right_title.clone();
        if !right_title.is_empty() {
            let x = layout.page_width
                - layout.margin_right
                - right_title.len() as f32 * character_width;
            self.title_at(size, x, heading_y, right_title.as_bytes())?;
        }

        let label_y = match self.style.page_numbering {
            PageNumbering::Off => None,
            PageNumbering::Top => Some(heading_y),
            PageNumbering::Bottom => Some(layout.margin_bottom - size),
        };
        if let Some(y) = label_y {
            let label = format!("Page {:04}", self.page_count);
            let x = layout.margin_left + layout.text_width() / 2.0
                - label.len() as f32 * character_width / 2.0;
            self.title_at(size, x, y, label.as_bytes())?;
        }

        let left_title = self.style.left_title.clone();
        if !left_title.is_empty() {
            self.title_at(size, layout.margin_left, heading_y, left_title.as_bytes())?;
        }

        self.emit(&format!("{}\n", self.style.font_color.fill_operator()))
    }

    /// Centres the banner at the very top of the page.
    pub(crate) fn draw_banner(&mut self) -> Result<(), ContextError> {
        if self.style.banner.is_empty() {
            return Ok(());
        }

        let layout = self.layout;
        let banner = self.style.banner.clone();
        let size = layout.title_font_size + BANNER_SIZE_INCREASE;
        let character_width = size * CHARACTER_WIDTH_RATIO;
        let x = layout.margin_left + layout.text_width() / 2.0
            - banner.len() as f32 * character_width / 2.0;
        let y = layout.page_height - size;

        self.emit(BANNER_FILL)?;
        self.title_at(size, x, y, banner.as_bytes())
    }

    /// A self-contained text object printing `text` with the heading font at (`x`, `y`).
    pub(crate) fn title_at(
        &mut self,
        size: f32,
        x: f32,
        y: f32,
        text: &[u8],
    ) -> Result<(), ContextError> {
        self.emit(&format!(
            "BT /F2 {} Tf {} {} Td(",
            fixed(f64::from(size)),
            fixed(f64::from(x)),
            fixed(f64::from(y))
        ))?;
        self.emit_bytes(&escape(text, false))?;
        self.emit(") Tj ET\n")
    }
}

#[cfg(test)]
mod tests {
    use crate::configuration::{Configuration, PageNumbering};
    use crate::document::Document;

    fn decoration(configuration: &Configuration) -> String {
        let mut document = Document::new(Vec::new(), configuration).unwrap();
        let header = document.writer.position() as usize;
        document.draw_bands().unwrap();
        document.draw_margin().unwrap();
        let output = document.into_inner().unwrap();
        String::from_utf8(output[header..].to_vec()).unwrap()
    }

    #[test]
    fn test_solid_bands_skip_every_other_band() {
        let text = decoration(&Configuration::default());
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("0.752941 0.752941 0.752941 rg"));
        assert_eq!(lines.next(), Some("1 i"));
        assert_eq!(
            lines.next(),
            Some("53.099998 556.020020 684.000000 18.000000 re f")
        );
        assert_eq!(
            lines.next(),
            Some("53.099998 520.020020 684.000000 18.000000 re f")
        );
        // From 556.02 down to the last band above 36 - 18, in steps of 36
        assert_eq!(text.matches(" re f\n").count(), 15);
        assert!(text.contains("0 G\n0 g\n"));
    }

    #[test]
    fn test_dashed_bands_rule_every_band() {
        let mut configuration = Configuration::default();
        configuration.style.dash_pattern = "2 1".into();
        let text = decoration(&configuration);
        assert!(text.contains("1 i\n0 w [2 1] 0 d\n"));
        assert!(text.contains("53.099998 556.020020 m 737.099976 556.020020 l s\n"));
        assert!(text.contains("53.099998 538.020020 m 737.099976 538.020020 l s\n"));
        assert_eq!(text.matches(" l s\n").count(), 30);
        assert!(text.contains("[] 0 d\n0 G\n0 g\n"));
        assert!(!text.contains(" re f\n"));
    }

    #[test]
    fn test_margin_labels() {
        let mut configuration = Configuration::default();
        configuration.style.left_title = "LEFT".into();
        configuration.style.right_title = "RIGHT".into();
        configuration.style.page_numbering = PageNumbering::Top;
        let mut document = Document::new(Vec::new(), &configuration).unwrap();
        document.page_count = 7;
        let header = document.writer.position() as usize;
        document.draw_margin().unwrap();
        let output = document.into_inner().unwrap();
        let text = String::from_utf8(output[header..].to_vec()).unwrap();

        assert_eq!(
            text,
            "1.000000 0.200000 0.000000 rg\n\
             BT /F2 12.000000 Tf 702.000000 577.440002 Td(RIGHT) Tj ET\n\
             BT /F2 12.000000 Tf 363.600006 577.440002 Td(Page 0007) Tj ET\n\
             BT /F2 12.000000 Tf 54.000000 577.440002 Td(LEFT) Tj ET\n\
             0.000000 0.000000 0.000000 rg\n"
        );
    }

    #[test]
    fn test_page_label_at_the_bottom() {
        let mut configuration = Configuration::default();
        configuration.style.page_numbering = PageNumbering::Bottom;
        let text = decoration(&configuration);
        assert!(text.contains("Td(Page 0000) Tj ET\n"));
        assert!(text.contains(" 24.000000 Td(Page"));
    }

    #[test]
    fn test_banner_is_red_and_centred() {
        let mut configuration = Configuration::default();
        configuration.style.banner = "SECRET".into();
        let text = decoration(&configuration);
        assert!(text.contains(
            "0.9 0.0 0.0 rg\nBT /F2 14.000000 Tf 370.799988 598.000000 Td(SECRET) Tj ET\n"
        ));
    }
}
