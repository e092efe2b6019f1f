//! Listing condition enum.

use serde::{Deserialize, Serialize};

/// Physical condition of a listed item.
///
/// Optional on a listing; sellers that skip it get no condition badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Used,
}

impl Condition {
    /// Human-readable label shown on listing cards.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::LikeNew => "Like New",
            Self::Good => "Good",
            Self::Used => "Used",
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "like_new" => Ok(Self::LikeNew),
            "good" => Ok(Self::Good),
            "used" => Ok(Self::Used),
            other => Err(format!("unknown condition: {other}")),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::LikeNew => "like_new",
            Self::Good => "good",
            Self::Used => "used",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_roundtrip() {
        for c in [
            Condition::New,
            Condition::LikeNew,
            Condition::Good,
            Condition::Used,
        ] {
            let parsed: Condition = c.to_string().parse().expect("roundtrips");
            assert_eq!(parsed, c);
        }
    }

    #[test]
    fn test_unknown_condition_rejected() {
        assert!("mint".parse::<Condition>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Condition::LikeNew.label(), "Like New");
    }
}
