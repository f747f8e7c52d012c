//! Pre-registered `google.protobuf` types.
//!
//! These resolve without their defining files being part of the input. They
//! are never local to an [`super::Api`].

use super::{Enum, EnumValue, Field, FieldType, Message, State};

pub const PACKAGE: &str = "google.protobuf";

const MESSAGES: &[&str] = &[
    "Any",
    "Duration",
    "Empty",
    "FieldMask",
    "Timestamp",
    "Struct",
    "Value",
    "ListValue",
    "DoubleValue",
    "FloatValue",
    "Int64Value",
    "UInt64Value",
    "Int32Value",
    "UInt32Value",
    "BoolValue",
    "StringValue",
    "BytesValue",
];

/// True if `id` names one of the pre-registered types.
pub fn is_well_known(id: &str) -> bool {
    id.strip_prefix('.')
        .and_then(|rest| rest.strip_prefix(PACKAGE))
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|name| MESSAGES.contains(&name) || name == "NullValue")
}

pub fn id_of(name: &str) -> String {
    format!(".{PACKAGE}.{name}")
}

/// Insert every well-known message and enum into `state`.
pub fn register(state: &mut State) {
    for name in MESSAGES {
        state.insert_message(Message {
            name: name.to_string(),
            id: id_of(name),
            package: PACKAGE.to_string(),
            ..Default::default()
        });
    }

    // Struct carries its map entry so map detection works for fields typed
    // with the entry directly.
    let entry_id = format!("{}.FieldsEntry", id_of("Struct"));
    state.insert_message(Message {
        name: "FieldsEntry".to_string(),
        id: entry_id.clone(),
        package: PACKAGE.to_string(),
        parent: Some(id_of("Struct")),
        is_map: true,
        fields: vec![
            Field {
                name: "key".to_string(),
                json_name: "key".to_string(),
                id: format!("{entry_id}.key"),
                typez: FieldType::String,
                ..Default::default()
            },
            Field {
                name: "value".to_string(),
                json_name: "value".to_string(),
                id: format!("{entry_id}.value"),
                typez: FieldType::Message,
                type_id: Some(id_of("Value")),
                ..Default::default()
            },
        ],
        ..Default::default()
    });

    state.insert_enum(Enum {
        name: "NullValue".to_string(),
        id: id_of("NullValue"),
        package: PACKAGE.to_string(),
        values: vec![EnumValue {
            name: "NULL_VALUE".to_string(),
            id: format!("{}.NULL_VALUE", id_of("NullValue")),
            number: 0,
            ..Default::default()
        }],
        ..Default::default()
    });
}
