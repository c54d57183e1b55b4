use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::numbers::fixed;

/// A fill colour with its three components normalized in the unit interval.
///
/// Colours are configured as packed `0xRRGGBB` integers (or their hexadecimal spelling)
/// and only ever leave the crate as the operands of an `rg` operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0.0, 0.0, 0.0);
    pub const RED: RgbColor = RgbColor::new(1.0, 0.0, 0.0);
    pub const GREEN: RgbColor = RgbColor::new(0.0, 1.0, 0.0);
    pub const BLUE: RgbColor = RgbColor::new(0.0, 0.0, 1.0);

    pub const fn new(red: f64, green: f64, blue: f64) -> RgbColor {
        RgbColor { red, green, blue }
    }

    /// Splits a packed `0xRRGGBB` value into its normalized components.
    pub fn from_packed(packed: u32) -> RgbColor {
        RgbColor {
            red: ((packed >> 16) & 0xFF) as f64 / 255.0,
            green: ((packed >> 8) & 0xFF) as f64 / 255.0,
            blue: (packed & 0xFF) as f64 / 255.0,
        }
    }

    /// Packs the components back into a `0xRRGGBB` value.
    pub fn to_packed(&self) -> u32 {
        let channel = |component: f64| (component.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.red) << 16) + (channel(self.green) << 8) + channel(self.blue)
    }

    /// Parses a hexadecimal colour such as `C0C0C0`, `0xC0C0C0` or `#C0C0C0`.
    pub fn from_hex_str(text: &str) -> Result<RgbColor, ContextError> {
        let digits = text.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .or_else(|| digits.strip_prefix('#'))
            .unwrap_or(digits);
        if digits.is_empty() || digits.len() > 6 {
            return Err(ContextError::with_context(format!(
                "Invalid colour {:?}, expected up to six hexadecimal digits (RRGGBB)",
                text
            )));
        }
        let packed = u32::from_str_radix(digits, 16).map_err(|error| {
            ContextError::with_error(format!("Invalid colour {:?}", text), &error)
        })?;

        Ok(RgbColor::from_packed(packed))
    }

    /// The `r g b rg` operator selecting this colour as the non-stroking colour.
    pub fn fill_operator(&self) -> String {
        format!(
            "{} {} {} rg",
            fixed(self.red),
            fixed(self.green),
            fixed(self.blue)
        )
    }
}

impl std::fmt::Display for RgbColor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{:06X}", self.to_packed())
    }
}

impl TryFrom<String> for RgbColor {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RgbColor::from_hex_str(&value)
    }
}

impl From<RgbColor> for String {
    fn from(value: RgbColor) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_conversion() {
        let grey = RgbColor::from_packed(0xC0C0C0);
        assert_eq!(grey.red, 192.0 / 255.0);
        assert_eq!(grey.green, grey.blue);
        assert_eq!(grey.to_packed(), 0xC0C0C0);
        assert_eq!(RgbColor::from_packed(0x330099).to_packed(), 0x330099);
    }

    #[test]
    fn test_fill_operator() {
        assert_eq!(RgbColor::BLACK.fill_operator(), "0.000000 0.000000 0.000000 rg");
        assert_eq!(RgbColor::RED.fill_operator(), "1.000000 0.000000 0.000000 rg");
        assert_eq!(
            RgbColor::from_packed(0xFF3300).fill_operator(),
            "1.000000 0.200000 0.000000 rg"
        );
    }

    #[test]
    fn test_hex_parsing_accepts_prefixes() {
        assert_eq!(RgbColor::from_hex_str("C0F0F0").unwrap().to_packed(), 0xC0F0F0);
        assert_eq!(RgbColor::from_hex_str("0xff0000").unwrap(), RgbColor::RED);
        assert_eq!(RgbColor::from_hex_str("#0000FF").unwrap(), RgbColor::BLUE);
        assert_eq!(RgbColor::from_hex_str("0").unwrap(), RgbColor::BLACK);
    }

    #[test]
    fn test_hex_parsing_rejects_garbage() {
        assert!(RgbColor::from_hex_str("").is_err());
        assert!(RgbColor::from_hex_str("GG0000").is_err());
        assert!(RgbColor::from_hex_str("1234567").is_err());
    }

    #[test]
    fn test_serializes_as_hex_string() {
        let json = serde_json::to_string(&RgbColor::from_packed(0x330099)).unwrap();
        assert_eq!(json, "\"330099\"");
        let color: RgbColor = serde_json::from_str("\"FF3300\"").unwrap();
        assert_eq!(color.to_packed(), 0xFF3300);
    }
}
