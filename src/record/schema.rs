//! The allow-list of fields a financial record may hold.
//!
//! Clients can only write fields named in the [RecordSchema], and each value
//! must match the field's [FieldKind]. This keeps arbitrary client keys out of
//! the database.

use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// The format for `date` fields, e.g. "2025-10-16".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Names owned by the service that clients may never write.
const RESERVED_NAMES: [&str; 3] = ["id", "created_at", "updated_at"];

/// The type of value a record field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Any JSON string.
    Text,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A calendar date string in the format `YYYY-MM-DD`.
    Date,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Date => value
                .as_str()
                .is_some_and(|text| Date::parse(text, DATE_FORMAT).is_ok()),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Number => "a number",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::Date => "a date formatted as YYYY-MM-DD",
        }
    }
}

/// A named, typed field of a financial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// The JSON key of the field.
    pub name: String,
    /// The type of value the field holds.
    pub kind: FieldKind,
    /// Whether a record must be created with a non-null value for this field.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            required,
        }
    }
}

/// Whether a payload creates a record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// All required fields must be present.
    Create,
    /// Only the supplied fields are checked.
    Update,
}

/// The set of fields clients may write to a financial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
}

impl Default for RecordSchema {
    /// An amount with an optional description, date and category.
    fn default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("amount", FieldKind::Number, true),
                FieldSpec::new("description", FieldKind::Text, false),
                FieldSpec::new("date", FieldKind::Date, false),
                FieldSpec::new("category", FieldKind::Text, false),
            ],
        }
    }
}

impl TryFrom<Vec<FieldSpec>> for RecordSchema {
    type Error = Error;

    fn try_from(fields: Vec<FieldSpec>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<RecordSchema> for Vec<FieldSpec> {
    fn from(schema: RecordSchema) -> Self {
        schema.fields
    }
}

impl RecordSchema {
    /// Create a schema from a list of field specs.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidSchema] if the list is empty, a name is empty,
    /// a name appears twice, or a name is one of `id`, `created_at` or `updated_at`.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, Error> {
        if fields.is_empty() {
            return Err(Error::InvalidSchema(
                "a record schema needs at least one field".to_owned(),
            ));
        }

        let mut seen = HashSet::new();

        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(Error::InvalidSchema("field names cannot be empty".to_owned()));
            }

            if RESERVED_NAMES.contains(&field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "the field name \"{}\" is reserved",
                    field.name
                )));
            }

            if !seen.insert(field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "the field \"{}\" is defined more than once",
                    field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    /// Load a schema from a JSON file holding an array of field specs, e.g.
    /// `[{"name": "amount", "kind": "number", "required": true}]`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidSchema] if the file cannot be read, is not valid
    /// JSON, or describes an invalid schema.
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)
            .map_err(|error| Error::InvalidSchema(format!("could not read {path:?}: {error}")))?;

        let fields: Vec<FieldSpec> = serde_json::from_str(&text)
            .map_err(|error| Error::InvalidSchema(format!("could not parse {path:?}: {error}")))?;

        Self::new(fields)
    }

    /// The fields in the order they were declared.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Check a request payload against the schema and return its fields.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidPayload] if `payload` is not a JSON object, holds
    /// a key not in the schema, holds a value of the wrong kind, sets a
    /// required field to null, or (for [PayloadMode::Create]) misses a required field.
    pub fn validate(&self, payload: Value, mode: PayloadMode) -> Result<Map<String, Value>, Error> {
        let Value::Object(fields) = payload else {
            return Err(Error::InvalidPayload(
                "the request body must be a JSON object".to_owned(),
            ));
        };

        for (name, value) in &fields {
            let Some(spec) = self.get(name) else {
                return Err(Error::InvalidPayload(format!("unknown field \"{name}\"")));
            };

            if value.is_null() {
                if spec.required {
                    return Err(Error::InvalidPayload(format!(
                        "the field \"{name}\" cannot be null"
                    )));
                }

                continue;
            }

            if !spec.kind.accepts(value) {
                return Err(Error::InvalidPayload(format!(
                    "the field \"{name}\" must be {}",
                    spec.kind.describe()
                )));
            }
        }

        if mode == PayloadMode::Create {
            if let Some(missing) = self
                .fields
                .iter()
                .find(|spec| spec.required && !fields.contains_key(&spec.name))
            {
                return Err(Error::InvalidPayload(format!(
                    "the field \"{}\" is required",
                    missing.name
                )));
            }
        }

        Ok(fields)
    }
}
