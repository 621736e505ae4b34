//! Resource descriptors: the field schema, endpoint and display columns that
//! parameterize the generic list screen, form and mutation dispatch.

pub mod catalog;

use crate::error::FormError;
use crate::query::QueryKey;
use crate::screen::lookup::{ForeignLookup, SelectOption};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

pub use catalog::{
    Department, Departments, Enrollment, EnrollmentStatus, Enrollments, Grade, Grades, Module, Modules,
    Program, ProgramRef, Programs, User, Users,
};

pub type RecordId = i64;

/// A persisted entity as returned by the list endpoint.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// `None` until the server has created the record.
    fn id(&self) -> Option<RecordId>;
}

/// Describes one resource type to the generic screens.
pub trait Resource: Send + Sync + 'static {
    type Record: Record;

    /// Collection path under the API root, without slashes (`departements`).
    const ENDPOINT: &'static str;
    /// Human name of one record, used in prompts and logs.
    const SINGULAR: &'static str;
    const WRITABLE: bool = true;

    /// Editable fields in display order. `id` is never part of the schema.
    fn fields() -> &'static [FieldSpec];

    /// Values the free-text filter looks at.
    fn search_text(record: &Self::Record) -> Vec<&str>;

    fn columns() -> &'static [&'static str];

    /// One display row. Foreign keys resolve through `lookup`.
    fn cells(record: &Self::Record, lookup: &ForeignLookup) -> Vec<String>;

    /// Sibling collections the form selects from and the table joins against.
    fn references() -> Vec<(&'static str, ReferenceTarget)> {
        Self::fields()
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::Reference(target) => Some((f.name, target)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub endpoint: &'static str,
    pub label_field: &'static str,
    /// Server-side filter, e.g. `("role", "ENSEIGNANT")`.
    pub filter: Option<(&'static str, &'static str)>,
}

impl ReferenceTarget {
    pub fn query_key(&self) -> QueryKey {
        let key = QueryKey::collection(self.endpoint);
        match self.filter {
            Some((k, v)) => key.with_param(k, v),
            None => key,
        }
    }

    pub fn params(&self) -> Vec<(String, String)> {
        self.filter
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Extracts `{id, label}` from a raw sibling record.
    pub fn option_from(&self, value: &Value) -> Option<SelectOption> {
        let id = value.get("id")?.as_i64()?;
        let label = match value.get(self.label_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => format!("#{}", id),
            Some(other) => other.to_string(),
        };
        Some(SelectOption { id, label })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    LongText,
    Number,
    /// Fixed options; the first one is the create-mode default.
    Choice(&'static [&'static str]),
    Reference(ReferenceTarget),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(&self) -> FieldValue {
        match self.kind {
            FieldKind::Text | FieldKind::LongText => FieldValue::Text(String::new()),
            FieldKind::Choice(options) => options
                .first()
                .map(|o| FieldValue::Choice(o.to_string()))
                .unwrap_or(FieldValue::Empty),
            FieldKind::Number | FieldKind::Reference(_) => FieldValue::Empty,
        }
    }
}

/// One draft value. `Empty` stands in for "no value" so that a bad numeric
/// input never reaches a submission as NaN.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Choice(String),
    Reference(RecordId),
    Empty,
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.trim().is_empty(),
            FieldValue::Empty => true,
            FieldValue::Number(_) | FieldValue::Reference(_) => false,
        }
    }

    pub fn from_json(kind: &FieldKind, value: Option<&Value>) -> Self {
        let value = match value {
            Some(v) => v,
            None => return FieldSpec::new("", "", *kind).default_value(),
        };
        match kind {
            FieldKind::Text | FieldKind::LongText => match value {
                Value::String(s) => FieldValue::Text(s.clone()),
                Value::Null => FieldValue::Text(String::new()),
                other => FieldValue::Text(other.to_string()),
            },
            FieldKind::Number => match value {
                Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Empty),
                Value::String(s) => parse_number(s),
                _ => FieldValue::Empty,
            },
            FieldKind::Choice(_) => match value {
                Value::String(s) => FieldValue::Choice(s.clone()),
                _ => FieldValue::Empty,
            },
            FieldKind::Reference(_) => value.as_i64().map(FieldValue::Reference).unwrap_or(FieldValue::Empty),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => Value::String(s.clone()),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::Number(Number::from(*n as i64))
            }
            FieldValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Reference(id) => Value::Number(Number::from(*id)),
            FieldValue::Empty => Value::Null,
        }
    }

    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Reference(id) => format!("#{}", id),
            FieldValue::Empty => String::new(),
        }
    }
}

/// Parses numeric input; anything that is not a finite number becomes `Empty`.
pub fn parse_number(raw: &str) -> FieldValue {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(FieldValue::Number)
        .unwrap_or(FieldValue::Empty)
}

/// Transient edited copy of a record's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    fields: &'static [FieldSpec],
    values: Vec<FieldValue>,
}

impl Draft {
    pub fn defaults(fields: &'static [FieldSpec]) -> Self {
        Self {
            fields,
            values: fields.iter().map(FieldSpec::default_value).collect(),
        }
    }

    /// Shallow copy of the schema fields of `record`; everything else, `id`
    /// included, is left behind.
    pub fn from_record<T: Serialize>(fields: &'static [FieldSpec], record: &T) -> Self {
        let json = serde_json::to_value(record).unwrap_or(Value::Null);
        let values = fields
            .iter()
            .map(|f| FieldValue::from_json(&f.kind, json.get(f.name)))
            .collect();
        Self { fields, values }
    }

    pub fn spec(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        self.values.get(idx)
    }

    /// Replace exactly one key.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<(), FormError> {
        let idx = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        self.values[idx] = value;
        Ok(())
    }

    pub fn missing_required(&self) -> Vec<String> {
        self.iter()
            .filter(|(spec, value)| spec.required && value.is_empty())
            .map(|(spec, _)| spec.name.to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldSpec, &FieldValue)> {
        self.fields.iter().zip(self.values.iter())
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (spec, value) in self.iter() {
            map.insert(spec.name.to_string(), value.to_json());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static FIELDS: &[FieldSpec] = &[
        FieldSpec::new("code", "Code", FieldKind::Text).required(),
        FieldSpec::new("credits", "Credits", FieldKind::Number),
        FieldSpec::new("semestre", "Semester", FieldKind::Choice(&["S1", "S2"])),
        FieldSpec::new(
            "departement",
            "Department",
            FieldKind::Reference(ReferenceTarget {
                endpoint: "departements",
                label_field: "name",
                filter: None,
            }),
        ),
    ];

    #[test]
    fn defaults_follow_field_kinds() {
        let draft = Draft::defaults(FIELDS);
        assert_eq!(draft.get("code"), Some(&FieldValue::Text(String::new())));
        assert_eq!(draft.get("credits"), Some(&FieldValue::Empty));
        assert_eq!(draft.get("semestre"), Some(&FieldValue::Choice("S1".into())));
        assert_eq!(draft.get("departement"), Some(&FieldValue::Empty));
        assert_eq!(draft.missing_required(), vec!["code".to_string()]);
    }

    #[test]
    fn from_record_drops_id_and_unknown_keys() {
        let record = json!({"id": 9, "code": "INF", "credits": "6", "departement": 2, "extra": true});
        let draft = Draft::from_record(FIELDS, &record);
        let json = draft.to_json();
        assert!(json.get("id").is_none());
        assert!(json.get("extra").is_none());
        assert_eq!(json["credits"], json!(6));
        assert_eq!(json["departement"], json!(2));
        // absent in the record -> default
        assert_eq!(json["semestre"], json!("S1"));
    }

    #[test]
    fn bad_numbers_become_empty() {
        assert_eq!(parse_number("abc"), FieldValue::Empty);
        assert_eq!(parse_number(""), FieldValue::Empty);
        assert_eq!(parse_number("NaN"), FieldValue::Empty);
        assert_eq!(parse_number(" 2.5 "), FieldValue::Number(2.5));
        assert_eq!(FieldValue::Empty.to_json(), Value::Null);
    }

    #[test]
    fn set_touches_one_key() {
        let mut draft = Draft::defaults(FIELDS);
        let before = draft.clone();
        draft.set("code", FieldValue::Text("MATH".into())).unwrap();
        let changed: Vec<_> = draft
            .iter()
            .zip(before.iter())
            .filter(|((_, a), (_, b))| a != b)
            .map(|((spec, _), _)| spec.name)
            .collect();
        assert_eq!(changed, vec!["code"]);
        assert!(matches!(draft.set("nope", FieldValue::Empty), Err(FormError::UnknownField(_))));
    }
}
