//! Descriptor-set front end.
//!
//! Reads a `FileDescriptorSet` produced with `--include_imports
//! --include_source_info`. Files whose name starts with the specification
//! source are local; everything else is indexed for reference resolution
//! only.

pub mod descriptor;

use super::mixin;
use super::{check_package, make_path_info, read_file, ParseError, ParseRequest, ServiceConfig};
use crate::model::{
    wellknown, Api, Enum, EnumValue, Field, FieldType, Message, Method, OneOf, Service, State,
};
use descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet, ServiceDescriptorProto,
};
use heck::ToLowerCamelCase;
use prost::Message as _;
use prost_types::field_descriptor_proto::{Label, Type};
use std::collections::HashMap;
use tracing::{debug, warn};

// FileDescriptorProto / DescriptorProto field numbers used in source paths.
const FILE_MESSAGE: i32 = 4;
const FILE_ENUM: i32 = 5;
const FILE_SERVICE: i32 = 6;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED: i32 = 3;
const MESSAGE_ENUM: i32 = 4;
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

pub(crate) fn parse(request: &ParseRequest<'_>) -> Result<Api, ParseError> {
    let option = "descriptor-set";
    let relative = request
        .options
        .get(option)
        .ok_or_else(|| ParseError::MissingOption(option.to_string()))?;
    let path = request.project_root.join(relative);
    let bytes = read_file(&path)?;
    let set = FileDescriptorSet::decode(bytes.as_slice())
        .map_err(|source| ParseError::Decode { path, source })?;
    from_descriptor_set(&set, request.specification_source, request.service_config)
}

/// Whether `file` lives under the `source` directory (or is `source` itself).
fn is_local(file: &str, source: &str) -> bool {
    let source = source.trim_end_matches('/');
    file == source
        || file
            .strip_prefix(source)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Build an [`Api`] from an already decoded descriptor set.
pub fn from_descriptor_set(
    set: &FileDescriptorSet,
    specification_source: &str,
    service_config: Option<&ServiceConfig>,
) -> Result<Api, ParseError> {
    let mut api = Api::default();
    wellknown::register(&mut api.state);
    mixin::register_types(&mut api.state);

    let mut package: Option<String> = None;
    let mut local_files = Vec::new();
    for file in &set.file {
        let name = file.name.as_deref().unwrap_or_default();
        let local = is_local(name, specification_source);
        let mut walker = Walker {
            package: file.package.clone().unwrap_or_default(),
            docs: comments(file),
            service_config: service_config.filter(|_| local),
            state: &mut api.state,
        };
        let (messages, enums) = walker.file_types(file)?;
        if local {
            for id in messages.iter().chain(&enums) {
                check_package(&mut package, id, &walker.package)?;
            }
            api.messages.extend(messages);
            api.enums.extend(enums);
            local_files.push(file);
        }
    }
    if local_files.is_empty() {
        return Err(ParseError::NoLocalFiles(specification_source.to_string()));
    }

    for message in api.local_messages()? {
        check_references(&api.state, message)?;
    }

    for file in local_files {
        let docs = comments(file);
        let file_package = file.package.clone().unwrap_or_default();
        for (i, service) in file.service.iter().enumerate() {
            let service = build_service(
                &api.state,
                &file_package,
                service,
                &[FILE_SERVICE, i as i32],
                &docs,
                service_config,
            )?;
            check_package(&mut package, &service.id, &service.package)?;
            api.services.push(service.id.clone());
            api.state.insert_service(service);
        }
    }

    if let Some(config) = service_config {
        mixin::inject(&mut api, config)?;
    }

    api.package_name = package.unwrap_or_default();
    fill_api_metadata(&mut api, service_config);
    debug!(
        package = %api.package_name,
        messages = api.messages.len(),
        enums = api.enums.len(),
        services = api.services.len(),
        "parsed descriptor set"
    );
    Ok(api)
}

fn fill_api_metadata(api: &mut Api, service_config: Option<&ServiceConfig>) {
    let fallback = api
        .package_name
        .split('.')
        .rev()
        .find(|p| !is_version(p))
        .unwrap_or_default()
        .to_string();
    match service_config {
        Some(config) => {
            api.name = config
                .name
                .split('.')
                .next()
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or(fallback);
            api.title = if config.title.is_empty() {
                api.name.clone()
            } else {
                config.title.clone()
            };
            api.description = config.documentation.summary.trim().to_string();
        }
        None => {
            api.title = fallback.clone();
            api.name = fallback;
        }
    }
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// Leading comments keyed by source path.
fn comments(file: &FileDescriptorProto) -> HashMap<Vec<i32>, String> {
    file.source_code_info
        .iter()
        .flat_map(|info| &info.location)
        .filter_map(|loc| {
            let text = loc.leading_comments.as_deref()?;
            Some((loc.path.clone(), clean_comment(text)))
        })
        .collect()
}

fn clean_comment(text: &str) -> String {
    text.lines()
        .map(|line| line.strip_prefix(' ').unwrap_or(line).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn child_path(path: &[i32], kind: i32, index: usize) -> Vec<i32> {
    let mut out = path.to_vec();
    out.push(kind);
    out.push(index as i32);
    out
}

struct Walker<'a> {
    package: String,
    docs: HashMap<Vec<i32>, String>,
    service_config: Option<&'a ServiceConfig>,
    state: &'a mut State,
}

impl Walker<'_> {
    fn documentation(&self, id: &str, path: &[i32]) -> String {
        self.service_config
            .and_then(|c| c.documentation_for(id))
            .map(str::to_string)
            .or_else(|| self.docs.get(path).cloned())
            .unwrap_or_default()
    }

    /// Index every type in `file`, returning the top-level message and enum ids.
    fn file_types(
        &mut self,
        file: &FileDescriptorProto,
    ) -> Result<(Vec<String>, Vec<String>), ParseError> {
        let prefix = if self.package.is_empty() {
            String::new()
        } else {
            format!(".{}", self.package)
        };
        let mut messages = Vec::new();
        for (i, desc) in file.message_type.iter().enumerate() {
            let path = [FILE_MESSAGE, i as i32];
            messages.push(self.message(desc, &prefix, None, &path)?);
        }
        let mut enums = Vec::new();
        for (i, desc) in file.enum_type.iter().enumerate() {
            let path = [FILE_ENUM, i as i32];
            enums.push(self.enumeration(desc, &prefix, None, &path));
        }
        Ok((messages, enums))
    }

    fn message(
        &mut self,
        desc: &DescriptorProto,
        prefix: &str,
        parent: Option<&str>,
        path: &[i32],
    ) -> Result<String, ParseError> {
        let name = desc.name.clone().unwrap_or_default();
        let id = format!("{prefix}.{name}");

        let mut nested = Vec::new();
        for (j, child) in desc.nested_type.iter().enumerate() {
            nested.push(self.message(child, &id, Some(&id), &child_path(path, MESSAGE_NESTED, j))?);
        }
        let mut enums = Vec::new();
        for (j, child) in desc.enum_type.iter().enumerate() {
            enums.push(self.enumeration(child, &id, Some(&id), &child_path(path, MESSAGE_ENUM, j)));
        }

        let mut fields = Vec::with_capacity(desc.field.len());
        for (k, field) in desc.field.iter().enumerate() {
            fields.push(self.field(field, &id, &child_path(path, MESSAGE_FIELD, k))?);
        }
        let one_ofs = one_ofs(desc, &id, &fields);

        let message = Message {
            documentation: self.documentation(&id, path),
            name,
            id: id.clone(),
            package: self.package.clone(),
            parent: parent.map(str::to_string),
            fields,
            one_ofs,
            messages: nested,
            enums,
            is_map: desc
                .options
                .as_ref()
                .and_then(|o| o.map_entry)
                .unwrap_or(false),
            codec: Default::default(),
        };
        self.state.insert_message(message);
        Ok(id)
    }

    fn field(
        &self,
        desc: &FieldDescriptorProto,
        message_id: &str,
        path: &[i32],
    ) -> Result<Field, ParseError> {
        let name = desc.name.clone().unwrap_or_default();
        let id = format!("{message_id}.{name}");
        let typez = field_type(&id, desc.r#type.unwrap_or_default())?;
        let repeated = desc.label == Some(Label::Repeated as i32);
        let proto3_optional = desc.proto3_optional.unwrap_or(false);
        let is_oneof = desc.oneof_index.is_some() && !proto3_optional;
        let type_id = desc
            .type_name
            .clone()
            .filter(|_| typez.is_composite());
        Ok(Field {
            documentation: self.documentation(&id, path),
            json_name: desc
                .json_name
                .clone()
                .unwrap_or_else(|| name.to_lower_camel_case()),
            name,
            id,
            typez,
            type_id,
            repeated,
            optional: proto3_optional
                || (typez == FieldType::Message && !repeated && !is_oneof),
            is_oneof,
            codec: Default::default(),
        })
    }

    fn enumeration(
        &mut self,
        desc: &EnumDescriptorProto,
        prefix: &str,
        parent: Option<&str>,
        path: &[i32],
    ) -> String {
        let name = desc.name.clone().unwrap_or_default();
        let id = format!("{prefix}.{name}");
        let values = desc
            .value
            .iter()
            .enumerate()
            .map(|(k, v)| {
                let value_name = v.name.clone().unwrap_or_default();
                let value_id = format!("{id}.{value_name}");
                EnumValue {
                    documentation: self.documentation(&value_id, &child_path(path, ENUM_VALUE, k)),
                    name: value_name,
                    id: value_id,
                    number: v.number.unwrap_or_default(),
                    codec: Default::default(),
                }
            })
            .collect();
        let e = Enum {
            documentation: self.documentation(&id, path),
            name,
            id: id.clone(),
            package: self.package.clone(),
            parent: parent.map(str::to_string),
            values,
            codec: Default::default(),
        };
        self.state.insert_enum(e);
        id
    }
}

/// Declared oneofs, excluding the synthetic ones backing proto3 `optional`.
fn one_ofs(desc: &DescriptorProto, message_id: &str, fields: &[Field]) -> Vec<OneOf> {
    desc.oneof_decl
        .iter()
        .enumerate()
        .filter_map(|(index, decl)| {
            let members: Vec<&FieldDescriptorProto> = desc
                .field
                .iter()
                .filter(|f| f.oneof_index == Some(index as i32))
                .collect();
            if members.iter().any(|f| f.proto3_optional.unwrap_or(false)) {
                return None;
            }
            let name = decl.name.clone().unwrap_or_default();
            Some(OneOf {
                id: format!("{message_id}.{name}"),
                name,
                documentation: String::new(),
                fields: members
                    .iter()
                    .filter_map(|m| m.name.clone())
                    .filter(|n| fields.iter().any(|f| &f.name == n))
                    .collect(),
                codec: Default::default(),
            })
        })
        .collect()
}

fn field_type(id: &str, raw: i32) -> Result<FieldType, ParseError> {
    let kind = Type::try_from(raw).map_err(|_| ParseError::Malformed {
        id: id.to_string(),
        message: format!("unknown field type {raw}"),
    })?;
    Ok(match kind {
        Type::Double => FieldType::Double,
        Type::Float => FieldType::Float,
        Type::Int64 => FieldType::Int64,
        Type::Uint64 => FieldType::UInt64,
        Type::Int32 => FieldType::Int32,
        Type::Fixed64 => FieldType::Fixed64,
        Type::Fixed32 => FieldType::Fixed32,
        Type::Bool => FieldType::Bool,
        Type::String => FieldType::String,
        Type::Group => FieldType::Group,
        Type::Message => FieldType::Message,
        Type::Bytes => FieldType::Bytes,
        Type::Uint32 => FieldType::UInt32,
        Type::Enum => FieldType::Enum,
        Type::Sfixed32 => FieldType::SFixed32,
        Type::Sfixed64 => FieldType::SFixed64,
        Type::Sint32 => FieldType::SInt32,
        Type::Sint64 => FieldType::SInt64,
    })
}

/// Every composite field of a local message must name an indexed type.
fn check_references(state: &State, message: &Message) -> Result<(), ParseError> {
    for field in &message.fields {
        let Some(type_id) = &field.type_id else {
            if field.typez.is_composite() {
                return Err(ParseError::Malformed {
                    id: field.id.clone(),
                    message: "composite field without a type name".to_string(),
                });
            }
            continue;
        };
        let known = match field.typez {
            FieldType::Enum => state.enum_by_id.contains_key(type_id),
            _ => state.message_by_id.contains_key(type_id),
        };
        if !known {
            return Err(ParseError::UnresolvedType {
                id: field.id.clone(),
                type_name: type_id.clone(),
            });
        }
    }
    Ok(())
}

fn build_service(
    state: &State,
    package: &str,
    desc: &ServiceDescriptorProto,
    path: &[i32],
    docs: &HashMap<Vec<i32>, String>,
    service_config: Option<&ServiceConfig>,
) -> Result<Service, ParseError> {
    let name = desc.name.clone().unwrap_or_default();
    let id = format!(".{package}.{name}");
    let overlay = |entity: &str, path: &[i32]| {
        service_config
            .and_then(|c| c.documentation_for(entity))
            .map(str::to_string)
            .or_else(|| docs.get(path).cloned())
            .unwrap_or_default()
    };

    let mut methods = Vec::new();
    for (j, method) in desc.method.iter().enumerate() {
        let method_name = method.name.clone().unwrap_or_default();
        let method_id = format!("{id}.{method_name}");
        let override_binding = service_config.and_then(|c| c.http_binding_for(&method_id));
        let descriptor_rule = method.options.as_ref().and_then(|o| o.http.as_ref());
        let (verb, template, body) = match (override_binding, descriptor_rule) {
            (Some(binding), _) => binding,
            (None, Some(rule)) => match rule.binding() {
                Some((verb, template)) => (verb, template, Some(rule.body.as_str())),
                None => {
                    warn!(method = %method_id, "HTTP rule without a binding, skipping method");
                    continue;
                }
            },
            (None, None) => {
                warn!(method = %method_id, "method has no HTTP binding, skipping");
                continue;
            }
        };

        let input_type_id = method.input_type.clone().unwrap_or_default();
        let output_type_id = method.output_type.clone().unwrap_or_default();
        let input = state
            .message(&input_type_id)
            .map_err(|_| ParseError::UnresolvedType {
                id: method_id.clone(),
                type_name: input_type_id.clone(),
            })?;
        let path_info = make_path_info(&method_id, verb, template, body, input)?;
        methods.push(Method {
            documentation: overlay(&method_id, &child_path(path, SERVICE_METHOD, j)),
            name: method_name,
            id: method_id,
            input_type_id,
            output_type_id,
            path_info,
            codec: Default::default(),
        });
    }

    let default_host = desc
        .options
        .as_ref()
        .and_then(|o| o.default_host.clone())
        .or_else(|| service_config.map(|c| c.name.clone()))
        .unwrap_or_default();

    Ok(Service {
        documentation: overlay(&id, path),
        name,
        id,
        package: package.to_string(),
        default_host,
        methods,
        codec: Default::default(),
    })
}
