//! # Codec Module
//!
//! A codec maps model entities to the surface syntax of one target language:
//! identifier casing with keyword escaping, field types, HTTP path
//! interpolation, path parameter access and doc comments.
//!
//! [`annotate`] runs a codec over every local entity of an [`Api`] and stores
//! the results in each entity's `codec` slot, which is what the templates
//! read. The semantic fields of the model are never changed.
//!
//! Target languages form the closed [`Language`] enum; [`codec_for`] matches
//! it exhaustively, so a new language has to be wired in here.

pub mod required;
pub mod rust;


use crate::model::{
    Annotations, Api, Enum, Field, FieldType, Message, Method, ModelError, OneOf, PathInfo, State,
};
use required::RequiredFields;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
}

impl FromStr for Language {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rust" => Ok(Language::Rust),
            other => Err(CodecError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Rust => write!(f, "rust"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported target language {0:?}")]
    UnsupportedLanguage(String),

    #[error("field {field} references unknown type {type_id}")]
    UnresolvedType { field: String, type_id: String },

    #[error("field {field} has kind {kind:?}, which has no mapping")]
    UnsupportedKind { field: String, kind: FieldType },

    #[error("{id} is in package {package:?}, which has no codec mapping (set `package:{package}`)")]
    MissingPackageMapping { id: String, package: String },

    #[error("path parameter {field_path} of {method}: {source}")]
    PathParameter {
        method: String,
        field_path: String,
        #[source]
        source: ModelError,
    },

    #[error("cannot format documentation of {id}: {message}")]
    Docs { id: String, message: String },

    #[error("invalid codec option {key:?}: {message}")]
    InvalidOption { key: String, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Target-language rules for one generation unit.
pub trait Codec {
    fn language(&self) -> Language;

    /// Name of the generated package or crate.
    fn package_name(&self, api: &Api) -> String;

    /// Casing for types, escaped if it collides with a reserved word.
    fn type_name(&self, name: &str) -> String;

    /// Casing for fields, functions and modules, escaped if reserved.
    fn member_name(&self, name: &str) -> String;

    fn enum_value_name(&self, name: &str) -> String;

    /// Fully scoped reference to a message.
    fn message_name(&self, message: &Message, state: &State) -> Result<String, CodecError>;

    /// Fully scoped reference to an enum.
    fn enum_name(&self, e: &Enum, state: &State) -> Result<String, CodecError>;

    /// The type of a field as declared in its containing message. Oneof
    /// members yield the payload type of their variant.
    fn field_type(&self, field: &Field, state: &State) -> Result<String, CodecError>;

    /// The type of the member carrying a oneof.
    fn oneof_type(
        &self,
        message: &Message,
        oneof: &OneOf,
        state: &State,
    ) -> Result<String, CodecError>;

    /// Format string for the request path, one placeholder per variable.
    fn path_format(&self, path: &PathInfo) -> String;

    /// One access expression per path variable, in path order.
    fn path_param_access(&self, method: &Method, state: &State)
        -> Result<Vec<String>, CodecError>;

    /// Documentation reformatted as comment lines.
    fn format_docs(&self, id: &str, docs: &str) -> Result<Vec<String>, CodecError>;
}

/// Instantiate the codec for `language`.
pub fn codec_for(
    language: Language,
    options: &BTreeMap<String, String>,
    api: &Api,
) -> Result<Box<dyn Codec>, CodecError> {
    match language {
        Language::Rust => Ok(Box::new(rust::RustCodec::new(options, api)?)),
    }
}

/// The input fields sent as query parameters, in declaration order.
pub fn query_parameters<'a>(method: &Method, state: &'a State) -> Result<Vec<&'a Field>, CodecError> {
    let input = state.message(&method.input_type_id)?;
    Ok(input
        .fields
        .iter()
        .filter(|f| method.path_info.query_parameters.contains(&f.name))
        .collect())
}

/// Fill the `codec` slot of every local entity of `api`.
pub fn annotate(codec: &dyn Codec, api: &mut Api) -> Result<(), CodecError> {
    let required = RequiredFields::compute(api)?;

    let mut messages = Vec::new();
    for message in api.local_messages()? {
        messages.push(message_annotations(codec, message, &api.state, &required)?);
    }
    let mut enums = Vec::new();
    for e in api.local_enums()? {
        enums.push(enum_annotations(codec, e, &api.state)?);
    }
    let mut services = Vec::new();
    for service in api.local_services()? {
        let mut methods = Vec::with_capacity(service.methods.len());
        for method in &service.methods {
            methods.push(method_annotations(codec, method, &api.state, &required)?);
        }
        let annotations = object(json!({
            "name": codec.type_name(&service.name),
            "module": codec.member_name(&service.name),
            "docs": codec.format_docs(&service.id, &service.documentation)?,
            "default_host": service.default_host,
        }));
        services.push((service.id.clone(), annotations, methods));
    }

    for (id, annotations, fields, one_ofs) in messages {
        let message = api.state.message_mut(&id)?;
        message.codec = annotations;
        for (field, a) in message.fields.iter_mut().zip(fields) {
            field.codec = a;
        }
        for (oneof, a) in message.one_ofs.iter_mut().zip(one_ofs) {
            oneof.codec = a;
        }
    }
    for (id, annotations, values) in enums {
        let e = api.state.enum_mut(&id)?;
        e.codec = annotations;
        for (value, a) in e.values.iter_mut().zip(values) {
            value.codec = a;
        }
    }
    for (id, annotations, methods) in services {
        let service = api.state.service_mut(&id)?;
        service.codec = annotations;
        for (method, a) in service.methods.iter_mut().zip(methods) {
            method.codec = a;
        }
    }

    api.codec = object(json!({
        "language": codec.language(),
        "package_name": codec.package_name(api),
        "docs": codec.format_docs(&api.name, &api.description)?,
    }));
    debug!(api = %api.name, language = %codec.language(), "model annotated");
    Ok(())
}

fn object(value: Value) -> Annotations {
    match value {
        Value::Object(map) => map,
        _ => Annotations::new(),
    }
}

type MessageAnnotations = (String, Annotations, Vec<Annotations>, Vec<Annotations>);

fn message_annotations(
    codec: &dyn Codec,
    message: &Message,
    state: &State,
    required: &RequiredFields,
) -> Result<MessageAnnotations, CodecError> {
    let mut fields = Vec::with_capacity(message.fields.len());
    for field in &message.fields {
        fields.push(object(json!({
            "name": codec.member_name(&field.name),
            "type": codec.field_type(field, state)?,
            "docs": codec.format_docs(&field.id, &field.documentation)?,
            "required": required.is_required(&field.id),
        })));
    }
    let mut one_ofs = Vec::with_capacity(message.one_ofs.len());
    for oneof in &message.one_ofs {
        one_ofs.push(object(json!({
            "name": codec.type_name(&oneof.name),
            "field_name": codec.member_name(&oneof.name),
            "type": codec.oneof_type(message, oneof, state)?,
            "docs": codec.format_docs(&oneof.id, &oneof.documentation)?,
        })));
    }
    let annotations = object(json!({
        "name": codec.type_name(&message.name),
        "qualified_name": codec.message_name(message, state)?,
        "module": codec.member_name(&message.name),
        "docs": codec.format_docs(&message.id, &message.documentation)?,
        "has_nested_types": !message.messages.is_empty() || !message.enums.is_empty()
            || !message.one_ofs.is_empty(),
    }));
    Ok((message.id.clone(), annotations, fields, one_ofs))
}

fn enum_annotations(
    codec: &dyn Codec,
    e: &Enum,
    state: &State,
) -> Result<(String, Annotations, Vec<Annotations>), CodecError> {
    let mut values = Vec::with_capacity(e.values.len());
    for value in &e.values {
        values.push(object(json!({
            "name": codec.enum_value_name(&value.name),
            "docs": codec.format_docs(&value.id, &value.documentation)?,
        })));
    }
    let annotations = object(json!({
        "name": codec.type_name(&e.name),
        "qualified_name": codec.enum_name(e, state)?,
        "docs": codec.format_docs(&e.id, &e.documentation)?,
    }));
    Ok((e.id.clone(), annotations, values))
}

fn method_annotations(
    codec: &dyn Codec,
    method: &Method,
    state: &State,
    required: &RequiredFields,
) -> Result<Annotations, CodecError> {
    let input = state.message(&method.input_type_id)?;
    let output = state.message(&method.output_type_id)?;
    let query: Vec<Value> = query_parameters(method, state)?
        .into_iter()
        .map(|f| {
            json!({
                "name": codec.member_name(&f.name),
                "json_name": f.json_name,
            })
        })
        .collect();
    let body = method.path_info.body_field_path.as_deref().map(|b| match b {
        "*" => "*".to_string(),
        field => codec.member_name(field),
    });
    Ok(object(json!({
        "name": codec.member_name(&method.name),
        "docs": codec.format_docs(&method.id, &method.documentation)?,
        "verb": method.path_info.verb.as_str(),
        "path_format": codec.path_format(&method.path_info),
        "path_args": codec.path_param_access(method, state)?,
        "query_params": query,
        "body": body,
        "input_type": codec.message_name(input, state)?,
        "output_type": codec.message_name(output, state)?,
        "required_fields": required.for_method(&method.id),
    })))
}
