//! Binary class labels.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypesError};

/// Class identifier for a scan.
///
/// The numeric value is what the model is trained against: the sigmoid
/// output is the probability of [`Label::Tumor`].
///
/// # Example
///
/// ```
/// use tumor_types::Label;
///
/// assert_eq!(Label::Tumor.index(), 1);
/// assert_eq!(Label::from_index(0).ok(), Some(Label::NoTumor));
/// assert_eq!(Label::NoTumor.display_name(), "No Tumor");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Scan without a tumor.
    #[default]
    NoTumor = 0,

    /// Scan with a tumor.
    Tumor = 1,
}

impl Label {
    /// Both labels in index order.
    pub const ALL: [Self; 2] = [Self::NoTumor, Self::Tumor];

    /// Returns the numeric class index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Returns the label as a float training target.
    #[must_use]
    pub const fn target(self) -> f32 {
        match self {
            Self::NoTumor => 0.0,
            Self::Tumor => 1.0,
        }
    }

    /// Parses a numeric class index.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::UnknownLabel`] for anything other than 0 or 1.
    pub const fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Self::NoTumor),
            1 => Ok(Self::Tumor),
            other => Err(TypesError::UnknownLabel(other)),
        }
    }

    /// Returns the short machine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoTumor => "no_tumor",
            Self::Tumor => "tumor",
        }
    }

    /// Returns the human-readable class name used in reports.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::NoTumor => "No Tumor",
            Self::Tumor => "Yes Tumor",
        }
    }

    /// Returns the opposite label.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::NoTumor => Self::Tumor,
            Self::Tumor => Self::NoTumor,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_index_roundtrip() {
        for label in Label::ALL {
            assert_eq!(Label::from_index(label.index()), Ok(label));
        }
    }

    #[test]
    fn label_unknown_index() {
        assert_eq!(Label::from_index(2), Err(TypesError::UnknownLabel(2)));
    }

    #[test]
    fn label_target() {
        assert_eq!(Label::NoTumor.target(), 0.0);
        assert_eq!(Label::Tumor.target(), 1.0);
    }

    #[test]
    fn label_other() {
        assert_eq!(Label::NoTumor.other(), Label::Tumor);
        assert_eq!(Label::Tumor.other(), Label::NoTumor);
    }

    #[test]
    fn label_display() {
        assert_eq!(format!("{}", Label::Tumor), "Yes Tumor");
        assert_eq!(Label::Tumor.name(), "tumor");
    }

    #[test]
    fn label_serialization() {
        let json = serde_json::to_string(&Label::NoTumor).unwrap_or_default();
        assert_eq!(json, "\"no_tumor\"");

        let parsed: std::result::Result<Label, _> = serde_json::from_str("\"tumor\"");
        assert_eq!(parsed.ok(), Some(Label::Tumor));
    }
}
