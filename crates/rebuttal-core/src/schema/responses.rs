//! The five reply shapes.
//!
//! Invariant-bearing types keep their fields private. They can only be built
//! through validating constructors, and their `Deserialize` impls route
//! through the same constructors.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

use super::{from_wire, DescriptorId, ResponseSchema, SchemaValidationError};
use crate::types::OutputFormat;

/// Minimum number of counter-points.
pub const MIN_POINTS: usize = 3;
/// Maximum number of counter-points.
pub const MAX_POINTS: usize = 6;
/// Minimum number of paragraphs in either paragraph format.
pub const MIN_PARAGRAPHS: usize = 2;
/// Maximum number of paragraphs in either paragraph format.
pub const MAX_PARAGRAPHS: usize = 4;

lazy_static! {
    // scheme "://" followed by at least one authority character
    static ref ABSOLUTE_URL_PREFIX: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^/?#\s]").expect("Invalid regex");
}

impl SchemaValidationError {
    /// Re-home an element error under its parent's shape and field path.
    fn within(self, shape: &'static str, prefix: &str) -> Self {
        match self {
            SchemaValidationError::ConstraintViolated {
                field, constraint, ..
            } => SchemaValidationError::ConstraintViolated {
                shape,
                field: if field == "$" {
                    prefix.to_string()
                } else {
                    format!("{}.{}", prefix, field)
                },
                constraint,
            },
            other => other,
        }
    }
}

fn non_blank(
    shape: &'static str,
    field: impl Into<String>,
    text: String,
) -> Result<String, SchemaValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SchemaValidationError::violated(
            shape,
            field,
            "non-blank text",
        ));
    }
    Ok(trimmed.to_string())
}

fn optional_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn check_count(
    shape: &'static str,
    field: &str,
    count: usize,
    min: usize,
    max: usize,
) -> Result<(), SchemaValidationError> {
    if (min..=max).contains(&count) {
        Ok(())
    } else {
        Err(SchemaValidationError::violated(
            shape,
            field,
            format!("between {} and {} items (got {})", min, max, count),
        ))
    }
}

// ==================== Stage 1 ====================

#[derive(Deserialize)]
struct UnderstoodArgumentsWire {
    main_claims: Vec<String>,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// The student's argument as understood by Stage 1.
///
/// Carries only what the student said: claims in order, supporting points,
/// and an optional summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UnderstoodArgumentsWire")]
pub struct UnderstoodArguments {
    main_claims: Vec<String>,
    key_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

impl UnderstoodArguments {
    const SHAPE: &'static str = "UnderstoodArguments";

    /// Build from extracted claims. At least one non-blank claim is required.
    pub fn new(
        main_claims: Vec<String>,
        key_points: Vec<String>,
        summary: Option<String>,
    ) -> Result<Self, SchemaValidationError> {
        if main_claims.is_empty() {
            return Err(SchemaValidationError::violated(
                Self::SHAPE,
                "main_claims",
                "at least 1 item",
            ));
        }

        let main_claims = main_claims
            .into_iter()
            .enumerate()
            .map(|(i, c)| non_blank(Self::SHAPE, format!("main_claims[{}]", i), c))
            .collect::<Result<Vec<_>, _>>()?;
        let key_points = key_points
            .into_iter()
            .enumerate()
            .map(|(i, p)| non_blank(Self::SHAPE, format!("key_points[{}]", i), p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            main_claims,
            key_points,
            summary: optional_text(summary),
        })
    }

    /// Core claims, in the order the student makes them.
    pub fn main_claims(&self) -> &[String] {
        &self.main_claims
    }

    /// Supporting points.
    pub fn key_points(&self) -> &[String] {
        &self.key_points
    }

    /// Short summary of the student's position.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

impl TryFrom<UnderstoodArgumentsWire> for UnderstoodArguments {
    type Error = SchemaValidationError;

    fn try_from(wire: UnderstoodArgumentsWire) -> Result<Self, Self::Error> {
        Self::new(wire.main_claims, wire.key_points, wire.summary)
    }
}

impl ResponseSchema for UnderstoodArguments {
    const DESCRIPTOR: DescriptorId = DescriptorId::UnderstoodArguments;

    fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        let wire: UnderstoodArgumentsWire = from_wire(Self::SHAPE, value)?;
        wire.try_into()
    }
}

// ==================== Points ====================

#[derive(Deserialize)]
struct CounterPointWire {
    point: String,
    #[serde(default)]
    support: Option<String>,
}

/// One counter-point with optional support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CounterPointWire")]
pub struct CounterPoint {
    point: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    support: Option<String>,
}

impl CounterPoint {
    /// Build a counter-point; the point text must not be blank.
    pub fn new(
        point: impl Into<String>,
        support: Option<String>,
    ) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            point: non_blank("CounterPoint", "point", point.into())?,
            support: optional_text(support),
        })
    }

    /// The counter-point.
    pub fn point(&self) -> &str {
        &self.point
    }

    /// Supporting justification, if any.
    pub fn support(&self) -> Option<&str> {
        self.support.as_deref()
    }
}

impl TryFrom<CounterPointWire> for CounterPoint {
    type Error = SchemaValidationError;

    fn try_from(wire: CounterPointWire) -> Result<Self, Self::Error> {
        Self::new(wire.point, wire.support)
    }
}

#[derive(Deserialize)]
struct PointsResponseWire {
    points: Vec<CounterPointWire>,
}

/// Between three and six counter-points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PointsResponseWire")]
pub struct PointsResponse {
    points: Vec<CounterPoint>,
}

impl PointsResponse {
    const SHAPE: &'static str = "PointsResponse";

    /// Build a points response; fails unless 3-6 points are given.
    pub fn new(points: Vec<CounterPoint>) -> Result<Self, SchemaValidationError> {
        check_count(Self::SHAPE, "points", points.len(), MIN_POINTS, MAX_POINTS)?;
        Ok(Self { points })
    }

    /// The counter-points.
    pub fn points(&self) -> &[CounterPoint] {
        &self.points
    }
}

impl TryFrom<PointsResponseWire> for PointsResponse {
    type Error = SchemaValidationError;

    fn try_from(wire: PointsResponseWire) -> Result<Self, Self::Error> {
        let points = wire
            .points
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                CounterPoint::try_from(p)
                    .map_err(|e| e.within(Self::SHAPE, &format!("points[{}]", i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(points)
    }
}

impl ResponseSchema for PointsResponse {
    const DESCRIPTOR: DescriptorId = DescriptorId::Points;

    fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        let wire: PointsResponseWire = from_wire(Self::SHAPE, value)?;
        wire.try_into()
    }
}

// ==================== Rebuttal paragraphs ====================

#[derive(Deserialize)]
struct RebuttalParagraphsWire {
    paragraphs: Vec<String>,
}

/// Between two and four rebuttal paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RebuttalParagraphsWire")]
pub struct RebuttalParagraphs {
    paragraphs: Vec<String>,
}

impl RebuttalParagraphs {
    const SHAPE: &'static str = "RebuttalParagraphs";

    /// Build from paragraph texts; fails unless 2-4 non-blank paragraphs are given.
    pub fn new(paragraphs: Vec<String>) -> Result<Self, SchemaValidationError> {
        check_count(
            Self::SHAPE,
            "paragraphs",
            paragraphs.len(),
            MIN_PARAGRAPHS,
            MAX_PARAGRAPHS,
        )?;

        let paragraphs = paragraphs
            .into_iter()
            .enumerate()
            .map(|(i, p)| non_blank(Self::SHAPE, format!("paragraphs[{}]", i), p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { paragraphs })
    }

    /// The paragraphs.
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }
}

impl TryFrom<RebuttalParagraphsWire> for RebuttalParagraphs {
    type Error = SchemaValidationError;

    fn try_from(wire: RebuttalParagraphsWire) -> Result<Self, Self::Error> {
        Self::new(wire.paragraphs)
    }
}

impl ResponseSchema for RebuttalParagraphs {
    const DESCRIPTOR: DescriptorId = DescriptorId::RebuttalParagraphs;

    fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        let wire: RebuttalParagraphsWire = from_wire(Self::SHAPE, value)?;
        wire.try_into()
    }
}

// ==================== Referenced paragraphs ====================

#[derive(Deserialize)]
struct ReferenceWire {
    url: String,
    #[serde(default, alias = "title")]
    label: Option<String>,
}

/// A cited source. The URL is checked syntactically, never fetched, and
/// kept in normalized form so equivalent spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReferenceWire")]
pub struct Reference {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Reference {
    /// Build a reference; `url` must be absolute with `scheme://host`.
    pub fn new(
        url: impl Into<String>,
        label: Option<String>,
    ) -> Result<Self, SchemaValidationError> {
        let raw = url.into();
        let url = check_absolute_url(raw.trim())
            .map_err(|constraint| SchemaValidationError::violated("Reference", "url", constraint))?;

        Ok(Self {
            url: url.into(),
            label: optional_text(label),
        })
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Human-readable label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl TryFrom<ReferenceWire> for Reference {
    type Error = SchemaValidationError;

    fn try_from(wire: ReferenceWire) -> Result<Self, Self::Error> {
        Self::new(wire.url, wire.label)
    }
}

fn check_absolute_url(raw: &str) -> Result<Url, String> {
    if !ABSOLUTE_URL_PREFIX.is_match(raw) {
        return Err("absolute URL with scheme:// and host".to_string());
    }

    let url = Url::parse(raw).map_err(|e| format!("absolute URL ({})", e))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err("absolute URL with a host".to_string()),
    }
}

#[derive(Deserialize)]
struct ReferencedParagraphWire {
    text: String,
    #[serde(default)]
    references: Vec<ReferenceWire>,
}

/// A paragraph and the sources backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReferencedParagraphWire")]
pub struct ReferencedParagraph {
    text: String,
    references: Vec<Reference>,
}

impl ReferencedParagraph {
    const SHAPE: &'static str = "ReferencedParagraph";

    /// Build a paragraph; it needs non-blank text and at least one reference.
    pub fn new(
        text: impl Into<String>,
        references: Vec<Reference>,
    ) -> Result<Self, SchemaValidationError> {
        let text = non_blank(Self::SHAPE, "text", text.into())?;
        if references.is_empty() {
            return Err(SchemaValidationError::violated(
                Self::SHAPE,
                "references",
                "at least 1 item",
            ));
        }
        Ok(Self { text, references })
    }

    /// The paragraph text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Its references, in citation order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }
}

impl TryFrom<ReferencedParagraphWire> for ReferencedParagraph {
    type Error = SchemaValidationError;

    fn try_from(wire: ReferencedParagraphWire) -> Result<Self, Self::Error> {
        let references = wire
            .references
            .into_iter()
            .enumerate()
            .map(|(j, r)| {
                Reference::try_from(r)
                    .map_err(|e| e.within(Self::SHAPE, &format!("references[{}]", j)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(wire.text, references)
    }
}

#[derive(Deserialize)]
struct ReferencedParagraphsWire {
    paragraphs: Vec<ReferencedParagraphWire>,
}

/// Between two and four referenced paragraphs, no URL cited twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReferencedParagraphsWire")]
pub struct ReferencedParagraphs {
    paragraphs: Vec<ReferencedParagraph>,
}

impl ReferencedParagraphs {
    const SHAPE: &'static str = "ReferencedParagraphs";

    /// Build from paragraphs; fails unless 2-4 are given and every URL is unique.
    pub fn new(paragraphs: Vec<ReferencedParagraph>) -> Result<Self, SchemaValidationError> {
        check_count(
            Self::SHAPE,
            "paragraphs",
            paragraphs.len(),
            MIN_PARAGRAPHS,
            MAX_PARAGRAPHS,
        )?;

        let mut seen = HashSet::new();
        for (i, paragraph) in paragraphs.iter().enumerate() {
            for (j, reference) in paragraph.references.iter().enumerate() {
                if !seen.insert(reference.url.as_str()) {
                    return Err(SchemaValidationError::violated(
                        Self::SHAPE,
                        format!("paragraphs[{}].references[{}].url", i, j),
                        format!("unique URLs across paragraphs ({} repeated)", reference.url),
                    ));
                }
            }
        }

        Ok(Self { paragraphs })
    }

    /// The paragraphs.
    pub fn paragraphs(&self) -> &[ReferencedParagraph] {
        &self.paragraphs
    }
}

impl TryFrom<ReferencedParagraphsWire> for ReferencedParagraphs {
    type Error = SchemaValidationError;

    fn try_from(wire: ReferencedParagraphsWire) -> Result<Self, Self::Error> {
        let paragraphs = wire
            .paragraphs
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                ReferencedParagraph::try_from(p)
                    .map_err(|e| e.within(Self::SHAPE, &format!("paragraphs[{}]", i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(paragraphs)
    }
}

impl ResponseSchema for ReferencedParagraphs {
    const DESCRIPTOR: DescriptorId = DescriptorId::ReferencedParagraphs;

    fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        let wire: ReferencedParagraphsWire = from_wire(Self::SHAPE, value)?;
        wire.try_into()
    }
}

// ==================== Stage 2 sum ====================

/// A validated Stage-2 reply in whichever shape was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CounterArgument {
    Points(PointsResponse),
    RebuttalParagraphs(RebuttalParagraphs),
    ReferencedParagraphs(ReferencedParagraphs),
}

impl CounterArgument {
    /// The format this value answers.
    pub fn format(&self) -> OutputFormat {
        match self {
            CounterArgument::Points(_) => OutputFormat::Points,
            CounterArgument::RebuttalParagraphs(_) => OutputFormat::RebuttalParagraphs,
            CounterArgument::ReferencedParagraphs(_) => OutputFormat::ReferencedParagraphs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn points(n: usize) -> Vec<CounterPoint> {
        (0..n)
            .map(|i| CounterPoint::new(format!("point {}", i), None).unwrap())
            .collect()
    }

    fn paragraphs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("paragraph {}", i)).collect()
    }

    fn referenced(text: &str, urls: &[&str]) -> ReferencedParagraph {
        let refs = urls
            .iter()
            .map(|u| Reference::new(*u, None).unwrap())
            .collect();
        ReferencedParagraph::new(text, refs).unwrap()
    }

    #[test]
    fn test_points_cardinality_bounds() {
        assert!(PointsResponse::new(points(2)).is_err());
        assert!(PointsResponse::new(points(3)).is_ok());
        assert!(PointsResponse::new(points(6)).is_ok());

        let err = PointsResponse::new(points(7)).unwrap_err();
        assert_eq!(err.field(), Some("points"));
        assert!(err.to_string().contains("got 7"));
    }

    #[test]
    fn test_rebuttal_paragraph_bounds() {
        assert!(RebuttalParagraphs::new(paragraphs(1)).is_err());
        assert!(RebuttalParagraphs::new(paragraphs(2)).is_ok());
        assert!(RebuttalParagraphs::new(paragraphs(4)).is_ok());
        assert!(RebuttalParagraphs::new(paragraphs(5)).is_err());
    }

    #[test]
    fn test_rebuttal_rejects_blank_paragraph() {
        let err = RebuttalParagraphs::new(vec!["fine".into(), "   ".into()]).unwrap_err();
        assert_eq!(err.field(), Some("paragraphs[1]"));
    }

    #[test]
    fn test_reference_url_validation() {
        assert!(Reference::new("https://example.org/article", None).is_ok());
        assert!(Reference::new("http://localhost:8080/x?y=1", None).is_ok());

        for bad in ["not-a-url", "ftp:/missing-slash", "https://", "/relative/path", ""] {
            let err = Reference::new(bad, None).unwrap_err();
            assert_eq!(err.field(), Some("url"), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_reference_accepts_title_alias() {
        let reference: Reference =
            serde_json::from_str(r#"{"url": "https://a.org", "title": "A"}"#).unwrap();
        assert_eq!(reference.label(), Some("A"));
    }

    #[test]
    fn test_referenced_paragraph_requires_reference() {
        let err = ReferencedParagraph::new("text", vec![]).unwrap_err();
        assert_eq!(err.field(), Some("references"));
    }

    #[test]
    fn test_referenced_paragraphs_reject_duplicate_urls() {
        let err = ReferencedParagraphs::new(vec![
            referenced("one", &["https://a.org/1"]),
            referenced("two", &["https://b.org/2", "https://a.org/1"]),
        ])
        .unwrap_err();

        assert_eq!(err.field(), Some("paragraphs[1].references[1].url"));
    }

    #[test]
    fn test_referenced_paragraphs_compare_normalized_urls() {
        for (first, second) in [
            ("https://a.org", "https://a.org/"),
            ("https://Example.ORG/x", "HTTPS://example.org/x"),
        ] {
            let err = ReferencedParagraphs::new(vec![
                referenced("one", &[first]),
                referenced("two", &[second]),
            ])
            .unwrap_err();
            assert_eq!(
                err.field(),
                Some("paragraphs[1].references[0].url"),
                "{first} and {second} should collide"
            );
        }
    }

    #[test]
    fn test_reference_keeps_normalized_url() {
        let reference = Reference::new("  HTTPS://Example.ORG  ", None).unwrap();
        assert_eq!(reference.url(), "https://example.org/");
    }

    #[test]
    fn test_referenced_paragraphs_accept_distinct_urls() {
        let response = ReferencedParagraphs::new(vec![
            referenced("one", &["https://a.org/1"]),
            referenced("two", &["https://b.org/2"]),
        ])
        .unwrap();
        assert_eq!(response.paragraphs().len(), 2);
        assert_eq!(response.paragraphs()[1].references()[0].url(), "https://b.org/2");
    }

    #[test]
    fn test_understood_requires_a_claim() {
        let err = UnderstoodArguments::new(vec![], vec!["kp".into()], None).unwrap_err();
        assert_eq!(err.field(), Some("main_claims"));

        let ok = UnderstoodArguments::new(
            vec!["X causes harm".into()],
            vec![],
            Some("  ".into()),
        )
        .unwrap();
        assert_eq!(ok.summary(), None);
    }

    #[test]
    fn test_coerce_points_reply() {
        let reply = r#"{"points": [
            {"point": "Harm is overstated", "support": "Studies show modest effects"},
            {"point": "Bans push use underground"},
            {"point": "Regulation beats prohibition", "support": null}
        ]}"#;

        let response = PointsResponse::coerce(reply).unwrap();
        assert_eq!(response.points().len(), 3);
        assert_eq!(response.points()[0].support(), Some("Studies show modest effects"));
        assert_eq!(response.points()[2].support(), None);
    }

    #[test]
    fn test_coerce_reports_schema_field() {
        let reply = r#"{"points": [{"point": "only one"}]}"#;
        let err = PointsResponse::coerce(reply).unwrap_err();
        assert_eq!(err.field(), Some("points"));
    }

    #[test]
    fn test_coerce_reports_nested_url_field() {
        let reply = r#"{"paragraphs": [
            {"text": "one", "references": [{"url": "https://a.org"}]},
            {"text": "two", "references": [{"url": "ftp:/missing-slash"}]}
        ]}"#;

        let err = ReferencedParagraphs::coerce(reply).unwrap_err();
        assert_eq!(err.shape(), "ReferencedParagraphs");
        assert_eq!(err.field(), Some("paragraphs[1].references[0].url"));
    }

    #[test]
    fn test_deserialize_enforces_invariants() {
        let result: Result<PointsResponse, _> =
            serde_json::from_str(r#"{"points": [{"point": "a"}, {"point": "b"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_round_shape() {
        let response = RebuttalParagraphs::new(paragraphs(2)).unwrap();
        let json = serde_json::to_value(CounterArgument::RebuttalParagraphs(response)).unwrap();
        assert_eq!(json["paragraphs"][0], "paragraph 0");
    }

    proptest! {
        #[test]
        fn prop_points_accepts_only_three_to_six(n in 0usize..12) {
            let result = PointsResponse::new(points(n));
            prop_assert_eq!(result.is_ok(), (MIN_POINTS..=MAX_POINTS).contains(&n));
        }

        #[test]
        fn prop_paragraphs_accept_only_two_to_four(n in 0usize..10) {
            let result = RebuttalParagraphs::new(paragraphs(n));
            prop_assert_eq!(result.is_ok(), (MIN_PARAGRAPHS..=MAX_PARAGRAPHS).contains(&n));
        }
    }
}
