//! Tier module - journal ranking buckets and qualification thresholds

use std::fmt;

/// JUFO ranking tier of a publication channel
///
/// Tiers are ordered from lowest to highest:
/// - Unranked: unknown channel, failed lookup, or JUFO level 0
/// - Level1: basic level
/// - Level2: leading level
/// - Level3: highest level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Tier {
    /// No ranking available (lowest)
    #[default]
    Unranked,

    /// JUFO level 1
    Level1,

    /// JUFO level 2
    Level2,

    /// JUFO level 3
    Level3,
}

impl Tier {
    /// All tiers in ascending order
    pub const ALL: [Tier; 4] = [Tier::Unranked, Tier::Level1, Tier::Level2, Tier::Level3];

    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Unranked => "unranked",
            Tier::Level1 => "1",
            Tier::Level2 => "2",
            Tier::Level3 => "3",
        }
    }

    /// Ordinal used for sorting and storage (Unranked = 0)
    pub fn ordinal(&self) -> u8 {
        match self {
            Tier::Unranked => 0,
            Tier::Level1 => 1,
            Tier::Level2 => 2,
            Tier::Level3 => 3,
        }
    }

    /// Build a tier from a JUFO level number
    ///
    /// Level 0 and anything out of range are treated as unranked.
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => Tier::Level1,
            2 => Tier::Level2,
            3 => Tier::Level3,
            _ => Tier::Unranked,
        }
    }

    /// Whether this tier carries a ranking at all
    pub fn is_ranked(&self) -> bool {
        *self != Tier::Unranked
    }

    /// Parse a tier from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unranked" | "none" | "0" | "" => Some(Tier::Unranked),
            "1" | "level1" => Some(Tier::Level1),
            "2" | "level2" => Some(Tier::Level2),
            "3" | "level3" => Some(Tier::Level3),
            _ => None,
        }
    }

    /// Display class for tiered highlighting
    pub fn highlight(&self) -> Highlight {
        match self {
            Tier::Unranked => Highlight::None,
            Tier::Level1 => Highlight::Weak,
            Tier::Level2 => Highlight::Medium,
            Tier::Level3 => Highlight::Strong,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid tier: {}", s))
    }
}

/// How strongly a row should be emphasized when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// Plain rendering
    None,
    /// Slight emphasis
    Weak,
    /// Noticeable emphasis
    Medium,
    /// Strongest emphasis
    Strong,
}

/// Which tiers count toward the qualified count of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierThreshold {
    /// Levels 1, 2 and 3
    Levels123,
    /// Levels 2 and 3
    Levels23,
    /// Level 3 only
    Level3Only,
    /// Explicit minimum ranked tier
    Custom(Tier),
}

impl TierThreshold {
    /// Lowest tier that still qualifies
    pub fn minimum(&self) -> Tier {
        match self {
            TierThreshold::Levels123 => Tier::Level1,
            TierThreshold::Levels23 => Tier::Level2,
            TierThreshold::Level3Only => Tier::Level3,
            TierThreshold::Custom(tier) if tier.is_ranked() => *tier,
            TierThreshold::Custom(_) => Tier::Level1,
        }
    }

    /// Whether a tier satisfies this threshold
    ///
    /// Unranked never qualifies.
    pub fn qualifies(&self, tier: Tier) -> bool {
        tier.is_ranked() && tier >= self.minimum()
    }

    /// Canonical string form (`1_2_3`, `2_3`, `3`, `custom:N`)
    pub fn as_string(&self) -> String {
        match self {
            TierThreshold::Levels123 => "1_2_3".to_string(),
            TierThreshold::Levels23 => "2_3".to_string(),
            TierThreshold::Level3Only => "3".to_string(),
            TierThreshold::Custom(tier) => format!("custom:{}", tier.ordinal()),
        }
    }

    /// Parse a threshold from its string form
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        match s {
            "1_2_3" | "123" => return Ok(TierThreshold::Levels123),
            "2_3" | "23" => return Ok(TierThreshold::Levels23),
            "3" => return Ok(TierThreshold::Level3Only),
            _ => {}
        }

        let custom = s
            .strip_prefix("custom:")
            .ok_or_else(|| format!("Invalid tier threshold: {}", s))?;
        match Tier::parse(custom) {
            Some(tier) if tier.is_ranked() => Ok(TierThreshold::Custom(tier)),
            _ => Err(format!("Custom threshold must be a ranked tier (1-3), got '{}'", custom)),
        }
    }
}

impl Default for TierThreshold {
    fn default() -> Self {
        TierThreshold::Levels23
    }
}

impl fmt::Display for TierThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl std::str::FromStr for TierThreshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
