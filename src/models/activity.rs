use super::{
    DefaultValue, FieldKind, FieldSpec, ResourceDescriptor, SortDirection, SortOrder,
};

pub static ACTIVITY: ResourceDescriptor = ResourceDescriptor {
    collection: "activities",
    singular: "Activity",
    fields: &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("date", FieldKind::Date),
        FieldSpec::required("hours", FieldKind::Number),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::optional("status", FieldKind::String)
            .with_default(DefaultValue::Text("Completed")),
    ],
    unique: &[],
    // Most recent first.
    sort: Some(SortOrder {
        field: "date",
        direction: SortDirection::Descending,
    }),
};
