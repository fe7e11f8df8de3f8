//! JSON Schema descriptors for model replies.
//!
//! The descriptors in `schemas/` are embedded at compile time, compiled once
//! and reused. They serve two purposes: they are shown to the model as the
//! required reply shape, and every reply is checked against them before typed
//! deserialization so a failure can name the offending field.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::SchemaValidationError;

const UNDERSTOOD_ARGUMENTS_SCHEMA_JSON: &str =
    include_str!("../../../../schemas/understood_arguments.schema.json");
const POINTS_SCHEMA_JSON: &str = include_str!("../../../../schemas/points.schema.json");
const REBUTTAL_PARAGRAPHS_SCHEMA_JSON: &str =
    include_str!("../../../../schemas/rebuttal_paragraphs.schema.json");
const REFERENCED_PARAGRAPHS_SCHEMA_JSON: &str =
    include_str!("../../../../schemas/referenced_paragraphs.schema.json");

static UNDERSTOOD_ARGUMENTS: OnceLock<Result<Descriptor, String>> = OnceLock::new();
static POINTS: OnceLock<Result<Descriptor, String>> = OnceLock::new();
static REBUTTAL_PARAGRAPHS: OnceLock<Result<Descriptor, String>> = OnceLock::new();
static REFERENCED_PARAGRAPHS: OnceLock<Result<Descriptor, String>> = OnceLock::new();

/// Longest constraint message kept from a validator error.
const MAX_CONSTRAINT_LEN: usize = 160;

lazy_static! {
    static ref REQUIRED_PROPERTY: Regex =
        Regex::new(r#"^"(?P<property>[^"]+)" is a required property"#).expect("Invalid regex");
}

/// Identifies one of the embedded descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorId {
    UnderstoodArguments,
    Points,
    RebuttalParagraphs,
    ReferencedParagraphs,
}

impl DescriptorId {
    /// All descriptors.
    pub const ALL: [DescriptorId; 4] = [
        DescriptorId::UnderstoodArguments,
        DescriptorId::Points,
        DescriptorId::RebuttalParagraphs,
        DescriptorId::ReferencedParagraphs,
    ];

    /// Shape name used in errors and prompts.
    pub fn shape(self) -> &'static str {
        match self {
            DescriptorId::UnderstoodArguments => "UnderstoodArguments",
            DescriptorId::Points => "PointsResponse",
            DescriptorId::RebuttalParagraphs => "RebuttalParagraphs",
            DescriptorId::ReferencedParagraphs => "ReferencedParagraphs",
        }
    }

    fn source(self) -> (&'static OnceLock<Result<Descriptor, String>>, &'static str) {
        match self {
            DescriptorId::UnderstoodArguments => {
                (&UNDERSTOOD_ARGUMENTS, UNDERSTOOD_ARGUMENTS_SCHEMA_JSON)
            }
            DescriptorId::Points => (&POINTS, POINTS_SCHEMA_JSON),
            DescriptorId::RebuttalParagraphs => {
                (&REBUTTAL_PARAGRAPHS, REBUTTAL_PARAGRAPHS_SCHEMA_JSON)
            }
            DescriptorId::ReferencedParagraphs => {
                (&REFERENCED_PARAGRAPHS, REFERENCED_PARAGRAPHS_SCHEMA_JSON)
            }
        }
    }
}

/// A compiled schema descriptor.
pub struct Descriptor {
    shape: &'static str,
    document: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("shape", &self.shape)
            .finish()
    }
}

impl Descriptor {
    /// Shape name.
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    /// The JSON Schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Check an instance against the schema.
    ///
    /// Reports the first violation with its field path and constraint.
    pub fn check(&self, instance: &Value) -> Result<(), SchemaValidationError> {
        let Some(error) = self.validator.iter_errors(instance).next() else {
            return Ok(());
        };

        let message = error.to_string();
        let keyword = error
            .schema_path
            .to_string()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let mut field = field_path(&error.instance_path.to_string());
        if let Some(caps) = REQUIRED_PROPERTY.captures(&message) {
            let property = &caps["property"];
            field = if field == "$" {
                property.to_string()
            } else {
                format!("{}.{}", field, property)
            };
        }

        Err(SchemaValidationError::ConstraintViolated {
            shape: self.shape,
            field,
            constraint: format!("{}: {}", keyword, truncate(&message, MAX_CONSTRAINT_LEN)),
        })
    }
}

/// Get or compile a descriptor.
pub fn descriptor(id: DescriptorId) -> Result<&'static Descriptor, SchemaValidationError> {
    let (cell, source) = id.source();
    let result = cell.get_or_init(|| compile(id.shape(), source));

    match result {
        Ok(d) => Ok(d),
        Err(e) => Err(SchemaValidationError::SchemaLoad {
            shape: id.shape(),
            message: e.clone(),
        }),
    }
}

fn compile(shape: &'static str, source: &str) -> Result<Descriptor, String> {
    let document: Value = match serde_json::from_str(source) {
        Ok(v) => v,
        Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
    };

    let validator = match jsonschema::options().build(&document) {
        Ok(v) => v,
        Err(e) => return Err(format!("Failed to compile schema: {}", e)),
    };

    Ok(Descriptor {
        shape,
        document,
        validator,
    })
}

/// Convert a JSON pointer (`/points/0/url`) into a field path (`points[0].url`).
pub(crate) fn field_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if segment.chars().all(|c| c.is_ascii_digit()) {
            path.push_str(&format!("[{}]", segment));
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment);
        }
    }

    if path.is_empty() {
        "$".to_string()
    } else {
        path
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
