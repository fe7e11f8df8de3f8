//! Debate sides, output formats and the student submission.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a side or format tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseTagError {
    #[error("unknown side '{0}': expected one of pro, con")]
    Side(String),

    #[error(
        "unknown output format '{0}': expected one of points, rebuttal_paragraphs, referenced_paragraphs"
    )]
    Format(String),
}

/// Errors from building a [`StudentSubmission`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("submission field `{0}` must not be blank")]
    Blank(&'static str),
}

/// The stance taken on a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Arguing for the motion
    Pro,
    /// Arguing against the motion
    Con,
}

impl Side {
    /// All sides, in declaration order.
    pub const ALL: [Side; 2] = [Side::Pro, Side::Con];

    /// The side the agent argues when the student takes `self`.
    pub fn opposing(self) -> Side {
        match self {
            Side::Pro => Side::Con,
            Side::Con => Side::Pro,
        }
    }

    /// The wire tag (`pro` / `con`).
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Pro => "pro",
            Side::Con => "con",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pro" => Ok(Side::Pro),
            "con" => Ok(Side::Con),
            _ => Err(ParseTagError::Side(s.to_string())),
        }
    }
}

/// Shape of the Stage-2 counter-argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// 3-6 short counter-points
    Points,
    /// 2-4 rebuttal paragraphs
    RebuttalParagraphs,
    /// 2-4 paragraphs, each backed by references
    ReferencedParagraphs,
}

impl OutputFormat {
    /// All formats, in declaration order.
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Points,
        OutputFormat::RebuttalParagraphs,
        OutputFormat::ReferencedParagraphs,
    ];

    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Points => "points",
            OutputFormat::RebuttalParagraphs => "rebuttal_paragraphs",
            OutputFormat::ReferencedParagraphs => "referenced_paragraphs",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase().replace('-', "_");
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == tag)
            .ok_or_else(|| ParseTagError::Format(s.to_string()))
    }
}

/// A student's argument on one side of a motion.
///
/// Immutable once built; [`StudentSubmission::new`] rejects blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSubmission {
    motion: String,
    side: Side,
    argument: String,
}

impl StudentSubmission {
    /// Build a submission, trimming surrounding whitespace.
    pub fn new(
        motion: impl Into<String>,
        side: Side,
        argument: impl Into<String>,
    ) -> Result<Self, SubmissionError> {
        let motion = motion.into().trim().to_string();
        let argument = argument.into().trim().to_string();

        if motion.is_empty() {
            return Err(SubmissionError::Blank("motion"));
        }
        if argument.is_empty() {
            return Err(SubmissionError::Blank("argument"));
        }

        Ok(Self {
            motion,
            side,
            argument,
        })
    }

    /// The debate motion.
    pub fn motion(&self) -> &str {
        &self.motion
    }

    /// The side the student argues.
    pub fn side(&self) -> Side {
        self.side
    }

    /// The student's argument text.
    pub fn argument(&self) -> &str {
        &self.argument
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_opposing_side() {
        assert_eq!(Side::Pro.opposing(), Side::Con);
        assert_eq!(Side::Con.opposing(), Side::Pro);
    }

    #[test]
    fn test_side_parse_and_display() {
        assert_eq!("pro".parse::<Side>().unwrap(), Side::Pro);
        assert_eq!(" CON ".parse::<Side>().unwrap(), Side::Con);
        assert_eq!(Side::Con.to_string(), "con");

        let err = "maybe".parse::<Side>().unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_format_parse_and_display() {
        for format in OutputFormat::ALL {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
        assert_eq!(
            "rebuttal-paragraphs".parse::<OutputFormat>().unwrap(),
            OutputFormat::RebuttalParagraphs
        );
        assert!(matches!(
            "essay".parse::<OutputFormat>(),
            Err(ParseTagError::Format(_))
        ));
    }

    #[test]
    fn test_serde_tags_match_display() {
        let json = serde_json::to_string(&OutputFormat::ReferencedParagraphs).unwrap();
        assert_eq!(json, "\"referenced_paragraphs\"");
        let side: Side = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(side, Side::Pro);
    }

    #[test]
    fn test_submission_trims_and_keeps_fields() {
        let submission =
            StudentSubmission::new("  Ban X ", Side::Pro, "\nX causes harm\n").unwrap();
        assert_eq!(submission.motion(), "Ban X");
        assert_eq!(submission.side(), Side::Pro);
        assert_eq!(submission.argument(), "X causes harm");
    }

    #[test]
    fn test_submission_rejects_blank_fields() {
        assert_eq!(
            StudentSubmission::new("   ", Side::Pro, "arg"),
            Err(SubmissionError::Blank("motion"))
        );
        assert_eq!(
            StudentSubmission::new("Ban X", Side::Con, ""),
            Err(SubmissionError::Blank("argument"))
        );
    }

    fn any_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Pro), Just(Side::Con)]
    }

    proptest! {
        #[test]
        fn prop_opposing_is_an_involution(side in any_side()) {
            prop_assert_eq!(side.opposing().opposing(), side);
            prop_assert_ne!(side.opposing(), side);
        }
    }
}
