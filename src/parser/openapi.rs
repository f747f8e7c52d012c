//! OpenAPI v3 front end.
//!
//! Component schemas become messages, inline objects become nested messages
//! and `additionalProperties` objects become synthetic map entries. Every
//! operation becomes a method of a single service whose input is a
//! synthesized `<OperationId>Request` carrying the path and query parameters
//! plus an optional `body` field.

use super::{path_info, ParseError, ParseRequest, ServiceConfig};
use crate::model::{wellknown, Api, Field, FieldType, Message, Method, Service, State};
use crate::pathtemplate::PathTemplate;
use heck::{ToSnakeCase, ToUpperCamelCase};
use oas3::spec::{FromRef, ObjectOrReference, ObjectSchema, Operation, Parameter, ParameterIn};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
const JSON: &str = "application/json";

/// Drop path-item keys `oas3` does not model so unusual documents still load.
fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    let Some(Value::Object(paths)) = val.get_mut("paths") else {
        return;
    };
    for item in paths.values_mut() {
        if let Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Read an OpenAPI document from JSON or YAML.
pub fn load_spec(path: &Path) -> Result<OpenApiV3Spec, ParseError> {
    let malformed = |message: String| ParseError::OpenApi {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml");
    let mut value: Value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| malformed(e.to_string()))?
    } else {
        serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?
    };
    strip_unknown_verbs(&mut value);
    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))
}

pub(crate) fn parse(request: &ParseRequest<'_>) -> Result<Api, ParseError> {
    let spec = load_spec(&request.project_root.join(request.specification_source))?;
    from_spec(&spec, request.options, request.service_config)
}

/// Slug of the document title, used as the default package.
pub fn title_slug(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        .trim_matches('_')
        .to_string()
}

/// Build an [`Api`] from a parsed OpenAPI document.
pub fn from_spec(
    spec: &OpenApiV3Spec,
    options: &BTreeMap<String, String>,
    service_config: Option<&ServiceConfig>,
) -> Result<Api, ParseError> {
    let package = options
        .get("package")
        .cloned()
        .unwrap_or_else(|| title_slug(&spec.info.title));
    let mut builder = Builder {
        spec,
        package: package.clone(),
        service_config,
        state: State::default(),
        messages: Vec::new(),
    };
    wellknown::register(&mut builder.state);

    if let Some(components) = &spec.components {
        for (name, schema) in &components.schemas {
            let ObjectOrReference::Object(schema) = schema else {
                debug!(schema = %name, "component schema alias, references follow its target");
                continue;
            };
            let value = to_value(&format!("{SCHEMA_REF_PREFIX}{name}"), schema)?;
            let id = builder.message_id(None, name);
            builder.message(name, &id, None, &value)?;
            builder.messages.push(id);
        }
    }

    let service = builder.service()?;

    let title = service_config
        .map(|c| c.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| spec.info.title.clone());
    let name = service_config
        .and_then(|c| c.name.split('.').next())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| title_slug(&spec.info.title));
    let description = service_config
        .map(|c| c.documentation.summary.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| spec.info.description.clone())
        .unwrap_or_default();

    let mut api = Api {
        name,
        title,
        description,
        package_name: package,
        messages: builder.messages,
        state: builder.state,
        ..Default::default()
    };
    if let Some(service) = service {
        api.services.push(service.id.clone());
        api.state.insert_service(service);
    }
    debug!(
        package = %api.package_name,
        messages = api.messages.len(),
        "parsed OpenAPI document"
    );
    Ok(api)
}

fn to_value<T: serde::Serialize>(id: &str, schema: &T) -> Result<Value, ParseError> {
    serde_json::to_value(schema).map_err(|e| ParseError::Malformed {
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn schema_value(
    id: &str,
    schema: &ObjectOrReference<ObjectSchema>,
) -> Result<Value, ParseError> {
    match schema {
        ObjectOrReference::Object(obj) => to_value(id, obj),
        ObjectOrReference::Ref { ref_path, .. } => Ok(serde_json::json!({ "$ref": ref_path })),
    }
}

/// The first non-null `type` of a schema (OpenAPI 3.1 allows a list).
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

fn description(schema: &Value) -> String {
    schema
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Resolve a local `#/components/...` reference, failing on anything dangling.
fn resolve<T: FromRef>(
    spec: &OpenApiV3Spec,
    owner: &str,
    item: &ObjectOrReference<T>,
) -> Result<T, ParseError> {
    item.resolve(spec).map_err(|_| ParseError::UnresolvedType {
        id: owner.to_string(),
        type_name: match item {
            ObjectOrReference::Ref { ref_path, .. } => ref_path.clone(),
            ObjectOrReference::Object(_) => String::new(),
        },
    })
}

struct Builder<'a> {
    spec: &'a OpenApiV3Spec,
    package: String,
    service_config: Option<&'a ServiceConfig>,
    state: State,
    messages: Vec<String>,
}

/// How a schema maps onto a field.
struct FieldShape {
    typez: FieldType,
    type_id: Option<String>,
    repeated: bool,
}

impl Builder<'_> {
    fn message_id(&self, parent: Option<&str>, name: &str) -> String {
        match parent {
            Some(parent) => format!("{parent}.{name}"),
            None => format!(".{}.{name}", self.package),
        }
    }

    fn documentation(&self, id: &str, fallback: String) -> String {
        self.service_config
            .and_then(|c| c.documentation_for(id))
            .map(str::to_string)
            .unwrap_or(fallback)
    }

    /// The message id a schema reference names. Aliases are followed to
    /// their target since they do not become messages themselves.
    fn ref_id(&self, owner: &str, ref_path: &str) -> Result<String, ParseError> {
        let unresolved = || ParseError::UnresolvedType {
            id: owner.to_string(),
            type_name: ref_path.to_string(),
        };
        let schemas = self.spec.components.as_ref().map(|c| &c.schemas);
        let mut name = ref_path.strip_prefix(SCHEMA_REF_PREFIX).ok_or_else(unresolved)?;
        let mut seen = Vec::new();
        loop {
            match schemas.and_then(|s| s.get(name)) {
                Some(ObjectOrReference::Object(_)) => return Ok(self.message_id(None, name)),
                Some(ObjectOrReference::Ref { ref_path: target, .. }) if !seen.contains(&name) => {
                    seen.push(name);
                    name = target.strip_prefix(SCHEMA_REF_PREFIX).ok_or_else(unresolved)?;
                }
                _ => return Err(unresolved()),
            }
        }
    }

    fn insert(&mut self, message: Message) -> Result<(), ParseError> {
        if self.state.message_by_id.contains_key(&message.id) {
            return Err(ParseError::Malformed {
                id: message.id,
                message: "duplicate message name".to_string(),
            });
        }
        self.state.insert_message(message);
        Ok(())
    }

    fn message(
        &mut self,
        name: &str,
        id: &str,
        parent: Option<&str>,
        schema: &Value,
    ) -> Result<(), ParseError> {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        let mut nested = Vec::new();
        if let Some(Value::Object(properties)) = schema.get("properties") {
            for (property, property_schema) in properties {
                let field = self.field(
                    id,
                    property,
                    property_schema,
                    required.contains(&property.as_str()),
                    &mut nested,
                )?;
                fields.push(field);
            }
        }

        let message = Message {
            name: name.to_string(),
            id: id.to_string(),
            package: self.package.clone(),
            documentation: self.documentation(id, description(schema)),
            parent: parent.map(str::to_string),
            fields,
            messages: nested,
            ..Default::default()
        };
        self.insert(message)
    }

    fn field(
        &mut self,
        message_id: &str,
        property: &str,
        schema: &Value,
        required: bool,
        nested: &mut Vec<String>,
    ) -> Result<Field, ParseError> {
        let name = property.to_snake_case();
        let id = format!("{message_id}.{name}");
        let shape = self.shape(message_id, &id, property, schema, nested)?;
        let optional = !shape.repeated && (shape.typez == FieldType::Message || !required);
        Ok(Field {
            documentation: self.documentation(&id, description(schema)),
            name,
            json_name: property.to_string(),
            id,
            typez: shape.typez,
            type_id: shape.type_id,
            repeated: shape.repeated,
            optional,
            is_oneof: false,
            codec: Default::default(),
        })
    }

    fn shape(
        &mut self,
        message_id: &str,
        field_id: &str,
        property: &str,
        schema: &Value,
        nested: &mut Vec<String>,
    ) -> Result<FieldShape, ParseError> {
        let message = |type_id: String| FieldShape {
            typez: FieldType::Message,
            type_id: Some(type_id),
            repeated: false,
        };
        let scalar = |typez: FieldType| FieldShape {
            typez,
            type_id: None,
            repeated: false,
        };

        if let Some(ref_path) = schema.get("$ref").and_then(Value::as_str) {
            return Ok(message(self.ref_id(field_id, ref_path)?));
        }
        if let Some(Value::Array(all_of)) = schema.get("allOf") {
            if let [single] = all_of.as_slice() {
                return self.shape(message_id, field_id, property, single, nested);
            }
        }

        let format = schema.get("format").and_then(Value::as_str).unwrap_or_default();
        Ok(match schema_type(schema) {
            Some("array") => {
                let items = schema.get("items").cloned().unwrap_or(Value::Null);
                let mut inner = self.shape(message_id, field_id, property, &items, nested)?;
                if inner.repeated {
                    return Err(ParseError::Malformed {
                        id: field_id.to_string(),
                        message: "nested arrays are not supported".to_string(),
                    });
                }
                inner.repeated = true;
                inner
            }
            Some("object") => {
                let has_properties = schema.get("properties").is_some();
                match schema.get("additionalProperties") {
                    Some(value @ Value::Object(_)) if !has_properties => {
                        let entry = self.map_entry(message_id, field_id, property, value)?;
                        nested.push(entry.clone());
                        FieldShape {
                            typez: FieldType::Message,
                            type_id: Some(entry),
                            repeated: true,
                        }
                    }
                    _ if has_properties => {
                        let name = property.to_upper_camel_case();
                        let id = self.message_id(Some(message_id), &name);
                        self.message(&name, &id, Some(message_id), schema)?;
                        nested.push(id.clone());
                        message(id)
                    }
                    _ => message(wellknown::id_of("Struct")),
                }
            }
            Some("integer") => scalar(match format {
                "int32" => FieldType::Int32,
                "uint32" => FieldType::UInt32,
                "uint64" => FieldType::UInt64,
                _ => FieldType::Int64,
            }),
            Some("number") => scalar(match format {
                "float" => FieldType::Float,
                _ => FieldType::Double,
            }),
            Some("boolean") => scalar(FieldType::Bool),
            Some("string") => match format {
                "byte" | "binary" => scalar(FieldType::Bytes),
                "int64" => scalar(FieldType::Int64),
                "uint64" => scalar(FieldType::UInt64),
                "date-time" | "google-datetime" => message(wellknown::id_of("Timestamp")),
                "google-duration" => message(wellknown::id_of("Duration")),
                "google-fieldmask" => message(wellknown::id_of("FieldMask")),
                _ => scalar(FieldType::String),
            },
            _ => message(wellknown::id_of("Value")),
        })
    }

    fn map_entry(
        &mut self,
        message_id: &str,
        field_id: &str,
        property: &str,
        value_schema: &Value,
    ) -> Result<String, ParseError> {
        let name = format!("{}Entry", property.to_upper_camel_case());
        let id = self.message_id(Some(message_id), &name);
        let mut nested = Vec::new();
        let shape = self.shape(&id, field_id, "value", value_schema, &mut nested)?;
        let entry = Message {
            name,
            id: id.clone(),
            package: self.package.clone(),
            parent: Some(message_id.to_string()),
            is_map: true,
            fields: vec![
                Field {
                    name: "key".to_string(),
                    json_name: "key".to_string(),
                    id: format!("{id}.key"),
                    typez: FieldType::String,
                    ..Default::default()
                },
                Field {
                    name: "value".to_string(),
                    json_name: "value".to_string(),
                    id: format!("{id}.value"),
                    typez: shape.typez,
                    type_id: shape.type_id,
                    repeated: shape.repeated,
                    ..Default::default()
                },
            ],
            messages: nested,
            ..Default::default()
        };
        self.insert(entry)?;
        Ok(id)
    }

    fn service(&mut self) -> Result<Option<Service>, ParseError> {
        let spec = self.spec;
        let Some(paths) = spec.paths.as_ref() else {
            return Ok(None);
        };
        let title = self
            .service_config
            .map(|c| c.title.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(&spec.info.title);
        let name = title.to_upper_camel_case();
        let id = format!(".{}.{name}", self.package);

        let mut methods = Vec::new();
        for (path, item) in paths {
            for (verb, operation) in item.methods() {
                let location = format!("{path} {verb}");
                let Some(operation_id) = operation.operation_id.as_deref() else {
                    return Err(ParseError::Malformed {
                        id: location,
                        message: "operation without operationId".to_string(),
                    });
                };
                let mut parameters = item.parameters.clone();
                parameters.extend(operation.parameters.iter().cloned());
                methods.push(self.method(&id, path, verb.clone(), operation_id, operation, &parameters)?);
            }
        }

        let default_host = self
            .spec
            .servers
            .first()
            .and_then(|s| url::Url::parse(&s.url).ok())
            .and_then(|u| u.host_str().map(str::to_string))
            .or_else(|| self.service_config.map(|c| c.name.clone()))
            .unwrap_or_default();

        Ok(Some(Service {
            documentation: self.documentation(
                &id,
                self.spec.info.description.clone().unwrap_or_default(),
            ),
            name,
            id,
            package: self.package.clone(),
            default_host,
            methods,
            codec: Default::default(),
        }))
    }

    fn method(
        &mut self,
        service_id: &str,
        path: &str,
        verb: http::Method,
        operation_id: &str,
        operation: &Operation,
        parameters: &[ObjectOrReference<Parameter>],
    ) -> Result<Method, ParseError> {
        let name = operation_id.to_upper_camel_case();
        let method_id = format!("{service_id}.{name}");

        let request_name = format!("{name}Request");
        let request_id = self.message_id(None, &request_name);
        let mut fields = Vec::new();
        let mut nested = Vec::new();
        for param in parameters {
            let param = resolve(self.spec, &method_id, param)?;
            if !matches!(param.location, ParameterIn::Path | ParameterIn::Query) {
                continue;
            }
            let schema = match &param.schema {
                Some(schema) => schema_value(&method_id, schema)?,
                None => serde_json::json!({ "type": "string" }),
            };
            let name = param.name.clone();
            let in_path = matches!(param.location, ParameterIn::Path);
            let required = in_path || param.required.unwrap_or(false);
            let mut field = self.field(&request_id, &name, &schema, required, &mut nested)?;
            if let Some(doc) = &param.description {
                field.documentation = doc.trim().to_string();
            }
            fields.push(field);
        }

        let body_schema = match &operation.request_body {
            Some(body) => resolve(self.spec, &method_id, body)?
                .content
                .get(JSON)
                .and_then(|media| media.schema.as_ref())
                .map(|s| schema_value(&method_id, s))
                .transpose()?,
            None => None,
        };
        let body = match body_schema {
            Some(schema) => {
                let mut field = self.field(&request_id, "body", &schema, true, &mut nested)?;
                field.optional = field.typez == FieldType::Message && !field.repeated;
                fields.push(field);
                Some("body")
            }
            None => None,
        };

        let request = Message {
            name: request_name,
            id: request_id.clone(),
            package: self.package.clone(),
            documentation: format!("The request message for [{name}]."),
            fields,
            messages: nested,
            ..Default::default()
        };
        let template = PathTemplate::parse(path)
            .map_err(|source| ParseError::PathTemplate {
                method: method_id.clone(),
                source,
            })?
            .map_field_paths(|p| p.to_snake_case());
        let path_info = path_info(verb, template, body, &request);
        self.insert(request)?;
        self.messages.push(request_id.clone());

        let output_type_id = self.response_type(&method_id, &name, operation)?;

        let summary = operation
            .description
            .as_deref()
            .or(operation.summary.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Method {
            documentation: self.documentation(&method_id, summary),
            name,
            id: method_id,
            input_type_id: request_id,
            output_type_id,
            path_info,
            codec: Default::default(),
        })
    }

    /// The `200` response, else the first `2xx`, else `google.protobuf.Empty`.
    fn response_type(
        &mut self,
        method_id: &str,
        name: &str,
        operation: &Operation,
    ) -> Result<String, ParseError> {
        let empty = wellknown::id_of("Empty");
        let Some(responses) = operation.responses.as_ref() else {
            return Ok(empty);
        };
        let chosen = responses.get("200").or_else(|| {
            responses
                .iter()
                .find(|(status, _)| status.starts_with('2'))
                .map(|(_, r)| r)
        });
        let Some(response) = chosen else {
            return Ok(empty);
        };
        let response = resolve(self.spec, method_id, response)?;
        let Some(schema) = response.content.get(JSON).and_then(|m| m.schema.as_ref()) else {
            return Ok(empty);
        };
        match schema {
            ObjectOrReference::Ref { ref_path, .. } => self.ref_id(method_id, ref_path),
            ObjectOrReference::Object(obj) => {
                let value = to_value(method_id, obj)?;
                let response_name = format!("{name}Response");
                let id = self.message_id(None, &response_name);
                self.message(&response_name, &id, None, &value)?;
                self.messages.push(id.clone());
                Ok(id)
            }
        }
    }
}
