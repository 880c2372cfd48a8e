use super::{DefaultValue, FieldKind, FieldSpec, ResourceDescriptor, UniqueField};

pub static VOLUNTEER: ResourceDescriptor = ResourceDescriptor {
    collection: "volunteers",
    singular: "Volunteer",
    fields: &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("email", FieldKind::String),
        FieldSpec::optional("phone", FieldKind::String),
        FieldSpec::optional("college", FieldKind::String),
        FieldSpec::optional("hoursCompleted", FieldKind::Number)
            .with_default(DefaultValue::Number(0.0)),
        FieldSpec::optional("status", FieldKind::String).with_default(DefaultValue::Text("Active")),
    ],
    unique: &[UniqueField {
        name: "email",
        conflict_message: "Email already exists",
    }],
    // Listed in insertion order.
    sort: None,
};
