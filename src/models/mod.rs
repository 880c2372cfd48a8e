//! Record type descriptors.
//!
//! Each managed resource is described by a static [`ResourceDescriptor`]: its
//! collection name, the fields its documents may carry and how they are
//! cast, defaulted and required, which fields must be unique, and the order
//! in which listings are returned. The HTTP handlers and both store backends
//! are written once against this description.

pub mod activity;
pub mod event;
pub mod volunteer;

pub use activity::ACTIVITY;
pub use event::EVENT;
pub use volunteer::VOLUNTEER;

/// JSON object holding a record's client-visible fields.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// How a field's incoming JSON value is cast before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Date,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
        }
    }
}

/// Value filled in on create when the body omits the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Text(&'static str),
    Number(f64),
}

impl DefaultValue {
    pub fn to_json(self) -> serde_json::Value {
        match self {
            DefaultValue::Text(text) => serde_json::Value::String(text.to_string()),
            DefaultValue::Number(n) => number_to_json(n),
        }
    }
}

/// Encodes a number, keeping integral values as JSON integers so `0`
/// round-trips as `0` rather than `0.0`. Non-finite values become null.
pub fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl FieldSpec {
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A field whose value may appear on at most one record of the collection.
#[derive(Debug, Clone, Copy)]
pub struct UniqueField {
    pub name: &'static str,
    /// Message returned to the client when a write collides.
    pub conflict_message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Listing order applied by `find_all`. Only date fields are sortable.
#[derive(Debug, Clone, Copy)]
pub struct SortOrder {
    pub field: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug)]
pub struct ResourceDescriptor {
    /// Collection (and table) name, also the URL segment under `/api`.
    pub collection: &'static str,
    /// Capitalised singular used in client-facing messages.
    pub singular: &'static str,
    pub fields: &'static [FieldSpec],
    pub unique: &'static [UniqueField],
    pub sort: Option<SortOrder>,
}

impl ResourceDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn unique_field(&self, name: &str) -> Option<&UniqueField> {
        self.unique.iter().find(|unique| unique.name == name)
    }

    pub fn not_found_message(&self) -> String {
        format!("{} not found", self.singular)
    }

    pub fn deleted_message(&self) -> String {
        format!("{} deleted successfully", self.singular)
    }
}

/// Every resource served under `/api`.
pub fn all_resources() -> [&'static ResourceDescriptor; 3] {
    [&VOLUNTEER, &EVENT, &ACTIVITY]
}
