use serde::{Deserialize, Serialize};

/// Five-point ordinal scale used by all appraisal constructs.
///
/// The ordering is semantic: `VL < L < M < H < VH`, so rules may compare
/// ratings against thresholds or test set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrdinalRating {
    #[serde(rename = "VL", alias = "Very Low", alias = "very_low")]
    VeryLow,
    #[serde(rename = "L", alias = "Low", alias = "low")]
    Low,
    #[serde(rename = "M", alias = "Medium", alias = "medium", alias = "Moderate")]
    Medium,
    #[serde(rename = "H", alias = "High", alias = "high")]
    High,
    #[serde(rename = "VH", alias = "Very High", alias = "very_high")]
    VeryHigh,
}

impl OrdinalRating {
    /// 1-based rank on the scale, `VL == 1` through `VH == 5`.
    pub fn rank(&self) -> u8 {
        match self {
            OrdinalRating::VeryLow => 1,
            OrdinalRating::Low => 2,
            OrdinalRating::Medium => 3,
            OrdinalRating::High => 4,
            OrdinalRating::VeryHigh => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrdinalRating::VeryLow => "VL",
            OrdinalRating::Low => "L",
            OrdinalRating::Medium => "M",
            OrdinalRating::High => "H",
            OrdinalRating::VeryHigh => "VH",
        }
    }

    /// Lenient parse accepting the short codes and common long forms in
    /// any casing. LLM replies are not trusted to pick one spelling.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "vl" | "very_low" => Some(OrdinalRating::VeryLow),
            "l" | "low" => Some(OrdinalRating::Low),
            "m" | "medium" | "moderate" => Some(OrdinalRating::Medium),
            "h" | "high" => Some(OrdinalRating::High),
            "vh" | "very_high" => Some(OrdinalRating::VeryHigh),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrdinalRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
