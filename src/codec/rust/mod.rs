//! The Rust codec.
//!
//! Generated code places every local message in `crate::model`, nested types
//! in a module named after their parent (`crate::model::secret::State`), and
//! well-known types in the crate named by the `wkt-crate` option. Messages
//! from other packages need a `package:<proto package> = <crate>` option;
//! the mixin packages have built-in defaults.
//!
//! | Option                  | Default                         |
//! |-------------------------|---------------------------------|
//! | `package-name-override` | the proto package, `.` to `-`   |
//! | `wkt-crate`             | `wkt`                           |
//! | `gax-crate`             | `gax`                           |
//! | `package:<package>`     | none                            |

mod docs;
pub mod naming;

use super::{Codec, CodecError, Language};
use crate::model::{
    wellknown, Api, Enum, Field, FieldType, Message, Method, OneOf, PathInfo, State,
};
use crate::parser::mixin;
use crate::pathtemplate::PathSegment;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct RustCodec {
    /// Proto package of the unit being generated
    source_package: String,
    package_name: String,
    wkt_crate: String,
    gax_crate: String,
    /// Proto package to Rust crate path
    package_map: BTreeMap<String, String>,
}

impl RustCodec {
    pub fn new(options: &BTreeMap<String, String>, api: &Api) -> Result<Self, CodecError> {
        let mut package_map: BTreeMap<String, String> = mixin::PACKAGES
            .iter()
            .map(|(package, krate)| (package.to_string(), krate.to_string()))
            .collect();
        for (key, value) in options {
            if let Some(package) = key.strip_prefix("package:") {
                if value.trim().is_empty() {
                    return Err(CodecError::InvalidOption {
                        key: key.clone(),
                        message: "crate path must not be empty".to_string(),
                    });
                }
                package_map.insert(package.to_string(), value.trim().to_string());
            }
        }
        let option = |key: &str, default: &str| {
            options
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Ok(Self {
            source_package: api.package_name.clone(),
            package_name: option("package-name-override", &api.package_name.replace('.', "-")),
            wkt_crate: option("wkt-crate", "wkt"),
            gax_crate: option("gax-crate", "gax"),
            package_map,
        })
    }

    /// `crate::model` or the mapped crate's model module for `package`.
    fn model_root(&self, id: &str, package: &str) -> Result<String, CodecError> {
        if package == self.source_package {
            return Ok("crate::model".to_string());
        }
        self.package_map
            .get(package)
            .map(|krate| format!("{krate}::model"))
            .ok_or_else(|| CodecError::MissingPackageMapping {
                id: id.to_string(),
                package: package.to_string(),
            })
    }

    /// Module path of the messages enclosing `parent`, outermost first,
    /// ending with `parent` itself.
    fn parent_modules(&self, parent: Option<&str>, state: &State) -> Result<Vec<String>, CodecError> {
        let mut modules = Vec::new();
        let mut next = parent.map(str::to_string);
        while let Some(id) = next {
            let message = state.message(&id)?;
            modules.push(self.member_name(&message.name));
            next = message.parent.clone();
        }
        modules.reverse();
        Ok(modules)
    }

    fn scoped(
        &self,
        id: &str,
        package: &str,
        name: &str,
        parent: Option<&str>,
        state: &State,
    ) -> Result<String, CodecError> {
        if package == wellknown::PACKAGE {
            return Ok(format!("{}::{}", self.wkt_crate, self.type_name(name)));
        }
        let mut parts = vec![self.model_root(id, package)?];
        parts.extend(self.parent_modules(parent, state)?);
        parts.push(self.type_name(name));
        Ok(parts.join("::"))
    }

    fn referenced_message<'s>(&self, field: &Field, state: &'s State) -> Result<&'s Message, CodecError> {
        let type_id = field.type_id.as_deref().unwrap_or_default();
        state
            .message_by_id
            .get(type_id)
            .ok_or_else(|| CodecError::UnresolvedType {
                field: field.id.clone(),
                type_id: type_id.to_string(),
            })
    }

    fn base_type(&self, field: &Field, state: &State) -> Result<String, CodecError> {
        let scalar = match field.typez {
            FieldType::Double => "f64",
            FieldType::Float => "f32",
            FieldType::Int64 | FieldType::SFixed64 | FieldType::SInt64 => "i64",
            FieldType::UInt64 | FieldType::Fixed64 => "u64",
            FieldType::Int32 | FieldType::SFixed32 | FieldType::SInt32 => "i32",
            FieldType::UInt32 | FieldType::Fixed32 => "u32",
            FieldType::Bool => "bool",
            FieldType::String => "std::string::String",
            FieldType::Bytes => "::bytes::Bytes",
            FieldType::Message => {
                let message = self.referenced_message(field, state)?;
                return self.message_name(message, state);
            }
            FieldType::Enum => {
                let type_id = field.type_id.as_deref().unwrap_or_default();
                let e = state
                    .enum_by_id
                    .get(type_id)
                    .ok_or_else(|| CodecError::UnresolvedType {
                        field: field.id.clone(),
                        type_id: type_id.to_string(),
                    })?;
                return self.enum_name(e, state);
            }
            FieldType::Group => {
                return Err(CodecError::UnsupportedKind {
                    field: field.id.clone(),
                    kind: field.typez,
                })
            }
        };
        Ok(scalar.to_string())
    }

    fn map_type(&self, entry: &Message, state: &State) -> Result<String, CodecError> {
        let (key, value) = entry
            .map_entry()
            .ok_or_else(|| crate::model::ModelError::MalformedMap {
                id: entry.id.clone(),
            })?;
        Ok(format!(
            "std::collections::HashMap<{}, {}>",
            self.base_type(key, state)?,
            self.base_type(value, state)?
        ))
    }
}

impl Codec for RustCodec {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn package_name(&self, _api: &Api) -> String {
        self.package_name.clone()
    }

    fn type_name(&self, name: &str) -> String {
        naming::to_type(name)
    }

    fn member_name(&self, name: &str) -> String {
        naming::to_member(name)
    }

    fn enum_value_name(&self, name: &str) -> String {
        naming::to_constant(name)
    }

    fn message_name(&self, message: &Message, state: &State) -> Result<String, CodecError> {
        self.scoped(
            &message.id,
            &message.package,
            &message.name,
            message.parent.as_deref(),
            state,
        )
    }

    fn enum_name(&self, e: &Enum, state: &State) -> Result<String, CodecError> {
        self.scoped(&e.id, &e.package, &e.name, e.parent.as_deref(), state)
    }

    fn field_type(&self, field: &Field, state: &State) -> Result<String, CodecError> {
        if field.typez == FieldType::Message {
            let target = self.referenced_message(field, state)?;
            if target.is_map {
                return self.map_type(target, state);
            }
        }
        let base = self.base_type(field, state)?;
        Ok(if field.repeated {
            format!("std::vec::Vec<{base}>")
        } else if field.is_oneof {
            if field.typez == FieldType::Message {
                format!("std::boxed::Box<{base}>")
            } else {
                base
            }
        } else if field.optional {
            format!("std::option::Option<{base}>")
        } else {
            base
        })
    }

    fn oneof_type(
        &self,
        message: &Message,
        oneof: &OneOf,
        state: &State,
    ) -> Result<String, CodecError> {
        let mut parts = vec![self.model_root(&message.id, &message.package)?];
        parts.extend(self.parent_modules(Some(&message.id), state)?);
        parts.push(self.type_name(&oneof.name));
        Ok(format!("std::option::Option<{}>", parts.join("::")))
    }

    fn path_format(&self, path: &PathInfo) -> String {
        path.template
            .segments
            .iter()
            .map(|segment| match segment {
                PathSegment::Literal(literal) => format!("/{literal}"),
                PathSegment::Variable(_) => "/{}".to_string(),
                PathSegment::Verb(verb) => format!(":{verb}"),
            })
            .collect()
    }

    fn path_param_access(
        &self,
        method: &Method,
        state: &State,
    ) -> Result<Vec<String>, CodecError> {
        let mut out = Vec::new();
        for variable in method.path_info.template.variables() {
            let fields = state
                .resolve_field_path(&method.input_type_id, &variable.field_path)
                .map_err(|source| CodecError::PathParameter {
                    method: method.id.clone(),
                    field_path: variable.field_name(),
                    source,
                })?;
            let mut expr = "req".to_string();
            let mut walked = Vec::with_capacity(fields.len());
            for (i, field) in fields.iter().enumerate() {
                walked.push(field.name.as_str());
                expr.push('.');
                expr.push_str(&self.member_name(&field.name));
                if i + 1 < fields.len() {
                    expr = format!(
                        "{expr}.as_ref().ok_or_else(|| {}::path_parameter::missing(\"{}\"))?",
                        self.gax_crate,
                        walked.join(".")
                    );
                }
            }
            out.push(expr);
        }
        Ok(out)
    }

    fn format_docs(&self, id: &str, docs: &str) -> Result<Vec<String>, CodecError> {
        docs::format_docs(id, docs)
    }
}
