//! Physical page sizes.
//!
//! Every renderer resolves page geometry through [`Dimensions::profile`], so the
//! preview and the printed document can never disagree about a page's size.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Millimetres per PostScript point.
pub const MM_PER_PT: f64 = 25.4 / 72.0;

/// Convert millimetres to points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm / MM_PER_PT
}

/// Convert points to millimetres.
pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_PT
}

/// Supported trim sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dimensions {
    #[default]
    A4,
    Letter,
    /// 6 x 9 in trade paperback
    Trade6x9,
    /// 8.5 x 11 in
    Us8_5x11,
    /// 5 x 8 in
    Digest5x8,
    /// 7 x 10 in
    Royal7x10,
}

impl Dimensions {
    /// All sizes, in table order.
    pub const ALL: [Dimensions; 6] = [
        Dimensions::A4,
        Dimensions::Letter,
        Dimensions::Trade6x9,
        Dimensions::Us8_5x11,
        Dimensions::Digest5x8,
        Dimensions::Royal7x10,
    ];

    /// Parse a wire value, case-insensitive. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::Letter),
            "6x9" => Some(Self::Trade6x9),
            "8.5x11" => Some(Self::Us8_5x11),
            "5x8" => Some(Self::Digest5x8),
            "7x10" => Some(Self::Royal7x10),
            _ => None,
        }
    }

    /// Parse a wire value, falling back to A4 for anything unknown.
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!(value = s, "unknown dimensions, falling back to A4");
            Self::A4
        })
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::Letter => "Letter",
            Self::Trade6x9 => "6x9",
            Self::Us8_5x11 => "8.5x11",
            Self::Digest5x8 => "5x8",
            Self::Royal7x10 => "7x10",
        }
    }

    /// The physical page size for this enum value.
    pub fn profile(&self) -> DimensionProfile {
        let (width_mm, height_mm) = match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (216.0, 279.0),
            Self::Trade6x9 => (152.0, 229.0),
            Self::Us8_5x11 => (216.0, 279.0),
            Self::Digest5x8 => (127.0, 203.0),
            Self::Royal7x10 => (178.0, 254.0),
        };
        DimensionProfile {
            dimensions: *self,
            width_mm,
            height_mm,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Dimensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Dimensions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_or_default(&raw))
    }
}

/// Page orientation derived from a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Width and height of a page in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionProfile {
    pub dimensions: Dimensions,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl DimensionProfile {
    /// Landscape iff the page is wider than it is tall.
    pub fn orientation(&self) -> Orientation {
        if self.width_mm > self.height_mm {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Page width in points.
    pub fn width_pt(&self) -> f64 {
        mm_to_pt(self.width_mm)
    }

    /// Page height in points.
    pub fn height_pt(&self) -> f64 {
        mm_to_pt(self.height_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_profile() {
        let profile = Dimensions::parse_or_default("A4").profile();
        assert_eq!(profile.width_mm, 210.0);
        assert_eq!(profile.height_mm, 297.0);
        assert_eq!(profile.orientation(), Orientation::Portrait);
    }

    #[test]
    fn test_6x9_profile() {
        let profile = Dimensions::parse_or_default("6x9").profile();
        assert_eq!((profile.width_mm, profile.height_mm), (152.0, 229.0));
    }

    #[test]
    fn test_full_table() {
        let expected = [
            ("A4", 210.0, 297.0),
            ("Letter", 216.0, 279.0),
            ("6x9", 152.0, 229.0),
            ("8.5x11", 216.0, 279.0),
            ("5x8", 127.0, 203.0),
            ("7x10", 178.0, 254.0),
        ];
        for (name, w, h) in expected {
            let profile = Dimensions::parse(name).unwrap().profile();
            assert_eq!((profile.width_mm, profile.height_mm), (w, h), "{name}");
            assert_eq!(profile.dimensions.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_falls_back_to_a4() {
        assert_eq!(Dimensions::parse("B5"), None);
        assert_eq!(Dimensions::parse_or_default("B5"), Dimensions::A4);
        let parsed: Dimensions = serde_json::from_str("\"tabloid\"").unwrap();
        assert_eq!(parsed, Dimensions::A4);
    }

    #[test]
    fn test_landscape_when_wider() {
        let profile = DimensionProfile {
            dimensions: Dimensions::A4,
            width_mm: 297.0,
            height_mm: 210.0,
        };
        assert_eq!(profile.orientation(), Orientation::Landscape);
    }

    #[test]
    fn test_point_conversion() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-9);
        assert!((pt_to_mm(72.0) - 25.4).abs() < 1e-9);
    }
}
