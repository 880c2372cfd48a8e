use super::{
    DefaultValue, FieldKind, FieldSpec, ResourceDescriptor, SortDirection, SortOrder,
};

pub static EVENT: ResourceDescriptor = ResourceDescriptor {
    collection: "events",
    singular: "Event",
    fields: &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("date", FieldKind::Date),
        FieldSpec::required("location", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::optional("status", FieldKind::String)
            .with_default(DefaultValue::Text("Upcoming")),
    ],
    unique: &[],
    // Soonest first.
    sort: Some(SortOrder {
        field: "date",
        direction: SortDirection::Ascending,
    }),
};
