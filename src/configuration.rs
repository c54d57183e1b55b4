use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::RgbColor;
use crate::error::ContextError;

/// The number of page units in an inch, the default unit multiplier.
pub const POINTS_PER_INCH: f32 = 72.0;

/// The size of the margin labels, the page label and the base of the banner size.
pub const TITLE_FONT_SIZE: f32 = 12.0;

/// The longest label, font name or dash pattern accepted by the configuration.
pub const MAXIMUM_LABEL_LENGTH: usize = 255;

/// The largest page width or height, the limit of the PDF user space (200 inches).
pub const MAXIMUM_PAGE_DIMENSION: f32 = 14400.0;

/// The smallest line height a page can be divided into.
pub const MINIMUM_LINE_HEIGHT: f32 = 0.1;

/// Environment variable seeding the colour of the shaded bars.
pub const GRAYBAR_VARIABLE: &str = "IMPACT_GRAYBAR";

/// Environment variable seeding the banner printed across the top of each page.
pub const BANNER_VARIABLE: &str = "IMPACT_TOP";

/// Everything the converter needs to know before the first line is read.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Whether the first character of each line is an ASA carriage-control code.
    pub asa: bool,
    pub layout: LayoutConfiguration,
    pub style: StyleConfiguration,
}

/// The page geometry, in page units (1/72 inch).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfiguration {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub lines_per_page: f32,
}

/// Where, if anywhere, line numbers restart.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LineNumbering {
    Off,
    /// One counter for the whole document.
    Running,
    /// The counter restarts on every page.
    PerPage,
}

/// Where, if anywhere, the `Page NNNN` label is printed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PageNumbering {
    Off,
    Top,
    Bottom,
}

/// Fonts, colours and page furniture.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfiguration {
    /// Standard 14 font used for the body text (`/F0`).
    pub body_font: String,
    /// Standard 14 font used for line numbers and titles (`/F1`, `/F2`).
    pub heading_font: String,
    pub font_color: RgbColor,
    pub overstrike_color: RgbColor,
    pub bar_color: RgbColor,
    pub line_number_color: RgbColor,
    pub title_color: RgbColor,
    /// Number of lines covered by one shaded bar.
    pub shade_step: i32,
    /// Dash array operands; when empty the bars are filled instead of ruled.
    pub dash_pattern: String,
    pub line_numbering: LineNumbering,
    pub page_numbering: PageNumbering,
    pub left_title: String,
    pub right_title: String,
    pub banner: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            asa: true,
            layout: LayoutConfiguration::default(),
            style: StyleConfiguration::default(),
        }
    }
}

impl Default for LayoutConfiguration {
    /// A landscape letter page (11 by 8.5 inches) holding 60 lines.
    fn default() -> Self {
        LayoutConfiguration {
            page_width: 11.0 * POINTS_PER_INCH,
            page_height: 8.5 * POINTS_PER_INCH,
            margin_top: 0.5 * POINTS_PER_INCH,
            margin_bottom: 0.5 * POINTS_PER_INCH,
            margin_left: 0.75 * POINTS_PER_INCH,
            margin_right: 0.75 * POINTS_PER_INCH,
            lines_per_page: 60.0,
        }
    }
}

impl Default for StyleConfiguration {
    fn default() -> Self {
        StyleConfiguration {
            body_font: "Courier".into(),
            heading_font: "Courier-Bold".into(),
            font_color: RgbColor::BLACK,
            overstrike_color: RgbColor::BLACK,
            bar_color: RgbColor::from_packed(0xC0C0C0),
            line_number_color: RgbColor::from_packed(0x330099),
            title_color: RgbColor::from_packed(0xFF3300),
            shade_step: 2,
            dash_pattern: String::new(),
            line_numbering: LineNumbering::Off,
            page_numbering: PageNumbering::Off,
            left_title: String::new(),
            right_title: String::new(),
            banner: String::new(),
        }
    }
}

/// The margin addressed by a `-M` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginSide {
    All,
    Top,
    Bottom,
    Left,
    Right,
}

impl Configuration {
    /// Reads a configuration from a JSON file, missing fields take their default value.
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: Configuration = serde_json::from_str(&configuration_file_contents)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        Ok(configuration)
    }

    /// Applies the bar colour and banner seeded by the environment.
    ///
    /// The lookup is usually `|name| std::env::var(name).ok()`. An empty variable is
    /// ignored, and so is a bar colour that does not parse or is zero.
    pub fn seed_from_environment<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(graybar) = lookup(GRAYBAR_VARIABLE).filter(|value| !value.is_empty()) {
            match RgbColor::from_hex_str(&graybar) {
                Ok(color) if color.to_packed() > 0 => self.style.bar_color = color,
                Ok(_) => {}
                Err(error) => log::warn!("Ignoring {}: {}", GRAYBAR_VARIABLE, error),
            }
        }
        if let Some(banner) = lookup(BANNER_VARIABLE).filter(|value| !value.is_empty()) {
            self.style.banner = banner;
        }
    }

    /// Checks the configuration before any output is produced.
    ///
    /// A shade step below one is reset to one with a warning; everything else that
    /// cannot be rendered is an error.
    pub fn validated(mut self) -> Result<Self, ContextError> {
        let layout = &self.layout;
        for (name, value) in [
            ("page width", layout.page_width),
            ("page height", layout.page_height),
            ("lines per page", layout.lines_per_page),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ContextError::with_context(format!(
                    "The {} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("page width", layout.page_width),
            ("page height", layout.page_height),
        ] {
            if value > MAXIMUM_PAGE_DIMENSION {
                return Err(ContextError::with_context(format!(
                    "The {} must not exceed {}, got {}",
                    name, MAXIMUM_PAGE_DIMENSION, value
                )));
            }
        }
        for (name, value) in [
            ("top margin", layout.margin_top),
            ("bottom margin", layout.margin_bottom),
            ("left margin", layout.margin_left),
            ("right margin", layout.margin_right),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ContextError::with_context(format!(
                    "The {} must not be negative, got {}",
                    name, value
                )));
            }
        }
        if layout.margin_top + layout.margin_bottom >= layout.page_height {
            return Err(ContextError::with_context(format!(
                "The top and bottom margins ({} + {}) leave no room on a page {} high",
                layout.margin_top, layout.margin_bottom, layout.page_height
            )));
        }
        if layout.margin_left + layout.margin_right >= layout.page_width {
            return Err(ContextError::with_context(format!(
                "The left and right margins ({} + {}) leave no room on a page {} wide",
                layout.margin_left, layout.margin_right, layout.page_width
            )));
        }

        let line_height = Layout::from(layout).line_height;
        if line_height < MINIMUM_LINE_HEIGHT {
            return Err(ContextError::with_context(format!(
                "{} lines per page give a line height of {}, the minimum is {}",
                layout.lines_per_page, line_height, MINIMUM_LINE_HEIGHT
            )));
        }

        let style = &mut self.style;
        if style.shade_step < 1 {
            log::warn!("Resetting the shade step {} to 1", style.shade_step);
            style.shade_step = 1;
        }
        validate_font_name("body font", &style.body_font)?;
        validate_font_name("heading font", &style.heading_font)?;
        validate_dash_pattern(&style.dash_pattern)?;
        for (name, label) in [
            ("left title", &style.left_title),
            ("right title", &style.right_title),
            ("banner", &style.banner),
        ] {
            validate_length(name, label)?;
        }

        Ok(self)
    }

    /// Sets one margin, or all of them, from a `-M` argument such as `T0.5` or `a1`.
    /// The value is multiplied by the unit multiplier.
    pub fn apply_margin(&mut self, argument: &str, unit: f32) -> Result<(), ContextError> {
        let (side, value) = parse_margin(argument)?;
        let margin = value * unit;
        let layout = &mut self.layout;
        match side {
            MarginSide::All => {
                layout.margin_top = margin;
                layout.margin_bottom = margin;
                layout.margin_left = margin;
                layout.margin_right = margin;
            }
            MarginSide::Top => layout.margin_top = margin,
            MarginSide::Bottom => layout.margin_bottom = margin,
            MarginSide::Left => layout.margin_left = margin,
            MarginSide::Right => layout.margin_right = margin,
        }

        Ok(())
    }
}

/// Splits a margin argument into the addressed side and the value in units.
pub fn parse_margin(argument: &str) -> Result<(MarginSide, f32), ContextError> {
    let mut characters = argument.chars();
    let side = match characters.next() {
        Some('A' | 'a') => MarginSide::All,
        Some('T' | 't') => MarginSide::Top,
        Some('B' | 'b') => MarginSide::Bottom,
        Some('L' | 'l') => MarginSide::Left,
        Some('R' | 'r') => MarginSide::Right,
        Some(identifier) => {
            return Err(ContextError::with_context(format!(
                "Unknown margin identifier {:?}, only A, T, B, L and R are permitted",
                identifier
            )))
        }
        None => return Err(ContextError::with_context("Empty margin argument")),
    };
    let value_text = characters.as_str().trim();
    let value: f32 = value_text.parse().map_err(|error| {
        ContextError::with_error(format!("Invalid margin value {:?}", value_text), &error)
    })?;

    Ok((side, value))
}

fn validate_length(name: &str, value: &str) -> Result<(), ContextError> {
    if value.len() > MAXIMUM_LABEL_LENGTH {
        return Err(ContextError::with_context(format!(
            "The {} is {} bytes long, at most {} are allowed",
            name,
            value.len(),
            MAXIMUM_LABEL_LENGTH
        )));
    }
    Ok(())
}

/// Font names end up as PDF names, so delimiters and whitespace are rejected.
fn validate_font_name(name: &str, font: &str) -> Result<(), ContextError> {
    validate_length(name, font)?;
    let is_regular = |character: char| {
        character.is_ascii_graphic() && !"()<>[]{}/%#".contains(character)
    };
    if font.is_empty() || !font.chars().all(is_regular) {
        return Err(ContextError::with_context(format!(
            "The {} {:?} is not a valid PDF font name",
            name, font
        )));
    }
    Ok(())
}

/// The dash pattern is copied into the content stream as the operands of a dash array.
fn validate_dash_pattern(pattern: &str) -> Result<(), ContextError> {
    validate_length("dash pattern", pattern)?;
    if !pattern
        .chars()
        .all(|character| character.is_ascii_digit() || character == '.' || character == ' ')
    {
        return Err(ContextError::with_context(format!(
            "The dash pattern {:?} may only contain digits, dots and spaces",
            pattern
        )));
    }
    Ok(())
}

/// The page geometry together with the quantities derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub lines_per_page: f32,
    /// The leading of the body text.
    pub line_height: f32,
    /// The body text is set solid, so its size equals the leading.
    pub body_font_size: f32,
    pub title_font_size: f32,
}

impl Layout {
    /// The baseline the text cursor starts from on a fresh page.
    pub fn top_of_page(&self) -> f32 {
        self.page_height - self.margin_top
    }

    /// The width between the left and right margins.
    pub fn text_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }
}

impl From<&LayoutConfiguration> for Layout {
    fn from(configuration: &LayoutConfiguration) -> Self {
        let line_height = (configuration.page_height
            - configuration.margin_top
            - configuration.margin_bottom)
            / configuration.lines_per_page;
        Layout {
            page_width: configuration.page_width,
            page_height: configuration.page_height,
            margin_top: configuration.margin_top,
            margin_bottom: configuration.margin_bottom,
            margin_left: configuration.margin_left,
            margin_right: configuration.margin_right,
            lines_per_page: configuration.lines_per_page,
            line_height,
            body_font_size: line_height,
            title_font_size: TITLE_FONT_SIZE,
        }
    }
}
