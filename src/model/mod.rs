//! # API Model
//!
//! The in-memory graph produced by the specification parsers and consumed by
//! the codecs and the renderer.
//!
//! Every entity is keyed by a fully-qualified identifier with a leading dot
//! (`.google.cloud.secretmanager.v1.Secret`). Nesting is expressed through
//! identifiers, never through ownership: a [`Message`] lists the ids of its
//! nested messages and enums and names its enclosing message in
//! [`Message::parent`]. The owning structure is the flat [`State`] index.
//!
//! Entities are immutable after parsing except for their `codec` slot, an
//! open JSON object where a codec caches computed names and types for the
//! templates.

mod state;
mod validate;
pub mod wellknown;


use crate::pathtemplate::PathTemplate;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

pub use state::State;
pub use validate::validate;

/// Codec-owned annotation bag attached to every entity.
pub type Annotations = serde_json::Map<String, serde_json::Value>;

/// Errors raised while resolving or validating the model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unknown message {id}")]
    UnknownMessage { id: String },

    #[error("unknown enum {id}")]
    UnknownEnum { id: String },

    #[error("unknown service {id}")]
    UnknownService { id: String },

    #[error("{id} belongs to package {found:?}, expected {expected:?}")]
    PackageMismatch {
        id: String,
        expected: String,
        found: String,
    },

    #[error("method {method} references {type_id}, which is not a message")]
    UnresolvedMethodType { method: String, type_id: String },

    #[error("oneof {id} has no fields")]
    EmptyOneOf { id: String },

    #[error("field {id} is both repeated and part of a oneof")]
    RepeatedOneOfMember { id: String },

    #[error("map message {id} must have exactly the fields `key` and `value`")]
    MalformedMap { id: String },

    #[error("message {message} has no field named {field:?}")]
    UnknownField { message: String, field: String },

    #[error("field {id} is not a message and cannot be traversed")]
    NotTraversable { id: String },
}

/// The protobuf field kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    UInt32,
    Enum,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
}

impl FieldType {
    /// True for kinds that reference another entity through `type_id`.
    pub fn is_composite(self) -> bool {
        matches!(self, FieldType::Message | FieldType::Enum | FieldType::Group)
    }
}

/// One member of a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Field {
    /// Canonical (snake_case) name
    pub name: String,
    /// Wire name used in JSON payloads
    pub json_name: String,
    pub id: String,
    pub documentation: String,
    pub typez: FieldType,
    /// Id of the referenced message or enum for composite kinds
    pub type_id: Option<String>,
    pub repeated: bool,
    pub optional: bool,
    pub is_oneof: bool,
    pub codec: Annotations,
}

/// A group of mutually exclusive fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OneOf {
    pub name: String,
    pub id: String,
    pub documentation: String,
    /// Names of the member fields, in declaration order
    pub fields: Vec<String>,
    pub codec: Annotations,
}

/// A structured record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Message {
    pub name: String,
    pub id: String,
    pub package: String,
    pub documentation: String,
    /// Id of the enclosing message, if nested
    pub parent: Option<String>,
    pub fields: Vec<Field>,
    pub one_ofs: Vec<OneOf>,
    /// Ids of nested messages
    pub messages: Vec<String>,
    /// Ids of nested enums
    pub enums: Vec<String>,
    /// Synthetic `key`/`value` message backing a map field
    pub is_map: bool,
    pub codec: Annotations,
}

impl Message {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The `(key, value)` fields of a map entry message.
    pub fn map_entry(&self) -> Option<(&Field, &Field)> {
        if !self.is_map || self.fields.len() != 2 {
            return None;
        }
        Some((self.field("key")?, self.field("value")?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnumValue {
    pub name: String,
    pub id: String,
    pub documentation: String,
    pub number: i32,
    pub codec: Annotations,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Enum {
    pub name: String,
    pub id: String,
    pub package: String,
    pub documentation: String,
    pub parent: Option<String>,
    pub values: Vec<EnumValue>,
    pub codec: Annotations,
}

/// The HTTP binding of one [`Method`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathInfo {
    #[serde(serialize_with = "serialize_method")]
    pub verb: http::Method,
    pub template: PathTemplate,
    /// Request field carried in the body, `*` for the whole request
    pub body_field_path: Option<String>,
    /// Request fields not bound by the path or the body
    pub query_parameters: BTreeSet<String>,
}

fn serialize_method<S: Serializer>(method: &http::Method, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(method.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name: String,
    pub id: String,
    pub documentation: String,
    pub input_type_id: String,
    pub output_type_id: String,
    pub path_info: PathInfo,
    pub codec: Annotations,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Service {
    pub name: String,
    pub id: String,
    pub package: String,
    pub documentation: String,
    pub default_host: String,
    pub methods: Vec<Method>,
    pub codec: Annotations,
}

/// One generation unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Api {
    pub name: String,
    pub title: String,
    pub description: String,
    pub package_name: String,
    /// Ids of locally defined top-level messages
    pub messages: Vec<String>,
    /// Ids of locally defined top-level enums
    pub enums: Vec<String>,
    /// Ids of locally defined services
    pub services: Vec<String>,
    pub state: State,
    pub codec: Annotations,
}

impl Api {
    /// Every locally defined message, nested ones included, parents first.
    pub fn local_messages(&self) -> Result<Vec<&Message>, ModelError> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.messages.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            let message = self.state.message(id)?;
            stack.extend(message.messages.iter().rev().map(String::as_str));
            out.push(message);
        }
        Ok(out)
    }

    /// Every locally defined enum, nested ones included.
    pub fn local_enums(&self) -> Result<Vec<&Enum>, ModelError> {
        let mut ids: Vec<&str> = self.enums.iter().map(String::as_str).collect();
        for message in self.local_messages()? {
            ids.extend(message.enums.iter().map(String::as_str));
        }
        ids.into_iter().map(|id| self.state.enum_(id)).collect()
    }

    pub fn local_services(&self) -> Result<Vec<&Service>, ModelError> {
        self.services.iter().map(|id| self.state.service(id)).collect()
    }
}
