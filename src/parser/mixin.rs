//! Built-in mixin service contracts.
//!
//! A mixin is a standard service (locations, long-running operations, IAM
//! policies) whose methods are copied into every local service when the
//! service config lists it under `apis`. Its request and response messages
//! are registered as imported-only types so method references resolve.

use super::{make_path_info, ParseError, ServiceConfig};
use crate::model::{wellknown, Api, Field, FieldType, Message, Method, State};
use heck::ToLowerCamelCase;
use tracing::debug;

struct MixinMethod {
    name: &'static str,
    input: &'static str,
    output: &'static str,
    verb: http::Method,
    path: &'static str,
    body: Option<&'static str>,
    documentation: &'static str,
}

struct Mixin {
    /// Service id without the leading dot
    service: &'static str,
    package: &'static str,
    methods: Vec<MixinMethod>,
}

/// `(proto package, default Rust crate)` for every mixin.
pub const PACKAGES: &[(&str, &str)] = &[
    ("google.cloud.location", "location"),
    ("google.longrunning", "longrunning"),
    ("google.iam.v1", "iam_v1"),
];

fn mixins() -> Vec<Mixin> {
    vec![
        Mixin {
            service: "google.cloud.location.Locations",
            package: "google.cloud.location",
            methods: vec![
                MixinMethod {
                    name: "ListLocations",
                    input: "ListLocationsRequest",
                    output: "ListLocationsResponse",
                    verb: http::Method::GET,
                    path: "/v1/{name=projects/*}/locations",
                    body: None,
                    documentation: "Lists information about the supported locations for this service.",
                },
                MixinMethod {
                    name: "GetLocation",
                    input: "GetLocationRequest",
                    output: "Location",
                    verb: http::Method::GET,
                    path: "/v1/{name=projects/*/locations/*}",
                    body: None,
                    documentation: "Gets information about a location.",
                },
            ],
        },
        Mixin {
            service: "google.longrunning.Operations",
            package: "google.longrunning",
            methods: vec![
                MixinMethod {
                    name: "ListOperations",
                    input: "ListOperationsRequest",
                    output: "ListOperationsResponse",
                    verb: http::Method::GET,
                    path: "/v1/{name=operations}",
                    body: None,
                    documentation: "Lists operations that match the specified filter in the request.",
                },
                MixinMethod {
                    name: "GetOperation",
                    input: "GetOperationRequest",
                    output: "Operation",
                    verb: http::Method::GET,
                    path: "/v1/{name=operations/**}",
                    body: None,
                    documentation: "Gets the latest state of a long-running operation.",
                },
                MixinMethod {
                    name: "DeleteOperation",
                    input: "DeleteOperationRequest",
                    output: ".google.protobuf.Empty",
                    verb: http::Method::DELETE,
                    path: "/v1/{name=operations/**}",
                    body: None,
                    documentation: "Deletes a long-running operation.",
                },
                MixinMethod {
                    name: "CancelOperation",
                    input: "CancelOperationRequest",
                    output: ".google.protobuf.Empty",
                    verb: http::Method::POST,
                    path: "/v1/{name=operations/**}:cancel",
                    body: Some("*"),
                    documentation: "Starts asynchronous cancellation on a long-running operation.",
                },
            ],
        },
        Mixin {
            service: "google.iam.v1.IAMPolicy",
            package: "google.iam.v1",
            methods: vec![
                MixinMethod {
                    name: "SetIamPolicy",
                    input: "SetIamPolicyRequest",
                    output: "Policy",
                    verb: http::Method::POST,
                    path: "/v1/{resource=**}:setIamPolicy",
                    body: Some("*"),
                    documentation: "Sets the access control policy on the specified resource.",
                },
                MixinMethod {
                    name: "GetIamPolicy",
                    input: "GetIamPolicyRequest",
                    output: "Policy",
                    verb: http::Method::POST,
                    path: "/v1/{resource=**}:getIamPolicy",
                    body: Some("*"),
                    documentation: "Gets the access control policy for a resource.",
                },
                MixinMethod {
                    name: "TestIamPermissions",
                    input: "TestIamPermissionsRequest",
                    output: "TestIamPermissionsResponse",
                    verb: http::Method::POST,
                    path: "/v1/{resource=**}:testIamPermissions",
                    body: Some("*"),
                    documentation: "Returns permissions that a caller has on the specified resource.",
                },
            ],
        },
    ]
}

impl Mixin {
    fn type_id(&self, name: &str) -> String {
        if name.starts_with('.') {
            name.to_string()
        } else {
            format!(".{}.{name}", self.package)
        }
    }
}

fn field(message_id: &str, name: &str, typez: FieldType) -> Field {
    Field {
        name: name.to_string(),
        json_name: name.to_lower_camel_case(),
        id: format!("{message_id}.{name}"),
        typez,
        ..Default::default()
    }
}

fn message_field(message_id: &str, name: &str, type_id: String, repeated: bool) -> Field {
    Field {
        type_id: Some(type_id),
        repeated,
        optional: !repeated,
        ..field(message_id, name, FieldType::Message)
    }
}

fn repeated(mut f: Field) -> Field {
    f.repeated = true;
    f
}

/// Field layout of every mixin message, keyed by `(package, name)`.
fn message_fields(package: &str, name: &str, id: &str) -> Vec<Field> {
    let pkg = |n: &str| format!(".{package}.{n}");
    let string = |n: &str| field(id, n, FieldType::String);
    match name {
        "ListLocationsRequest" | "ListOperationsRequest" => vec![
            string("name"),
            string("filter"),
            field(id, "page_size", FieldType::Int32),
            string("page_token"),
        ],
        "ListLocationsResponse" => vec![
            message_field(id, "locations", pkg("Location"), true),
            string("next_page_token"),
        ],
        "Location" => vec![
            string("name"),
            string("location_id"),
            string("display_name"),
            message_field(id, "metadata", wellknown::id_of("Any"), false),
        ],
        "ListOperationsResponse" => vec![
            message_field(id, "operations", pkg("Operation"), true),
            string("next_page_token"),
        ],
        "Operation" => vec![
            string("name"),
            message_field(id, "metadata", wellknown::id_of("Any"), false),
            field(id, "done", FieldType::Bool),
        ],
        "GetLocationRequest" | "GetOperationRequest" | "DeleteOperationRequest"
        | "CancelOperationRequest" => vec![string("name")],
        "SetIamPolicyRequest" => vec![
            string("resource"),
            message_field(id, "policy", pkg("Policy"), false),
            message_field(id, "update_mask", wellknown::id_of("FieldMask"), false),
        ],
        "GetIamPolicyRequest" => vec![string("resource")],
        "TestIamPermissionsRequest" => vec![string("resource"), repeated(string("permissions"))],
        "TestIamPermissionsResponse" => vec![repeated(string("permissions"))],
        "Policy" => vec![field(id, "version", FieldType::Int32), field(id, "etag", FieldType::Bytes)],
        _ => Vec::new(),
    }
}

/// Register every mixin message that is not already indexed.
pub fn register_types(state: &mut State) {
    for mixin in mixins() {
        for method in &mixin.methods {
            for name in [method.input, method.output] {
                let id = mixin.type_id(name);
                if name.starts_with('.') || state.message_by_id.contains_key(&id) {
                    continue;
                }
                state.insert_message(Message {
                    name: name.to_string(),
                    fields: message_fields(mixin.package, name, &id),
                    id,
                    package: mixin.package.to_string(),
                    ..Default::default()
                });
            }
        }
    }
}

/// Add the methods of every mixin listed in `config` to each local service.
///
/// HTTP bindings and documentation come from the service config when it has
/// a rule for the mixin method's selector.
pub fn inject(api: &mut Api, config: &ServiceConfig) -> Result<(), ParseError> {
    for mixin in mixins().into_iter().filter(|m| config.has_api(m.service)) {
        let mut methods = Vec::with_capacity(mixin.methods.len());
        for method in &mixin.methods {
            let selector = format!("{}.{}", mixin.service, method.name);
            let (verb, path, body) = match config.http_binding_for(&selector) {
                Some((verb, path, body)) => (verb, path.to_string(), body.map(str::to_string)),
                None => (
                    method.verb.clone(),
                    method.path.to_string(),
                    method.body.map(str::to_string),
                ),
            };
            let input_type_id = mixin.type_id(method.input);
            let input = api.state.message(&input_type_id)?;
            let path_info = make_path_info(&selector, verb, &path, body.as_deref(), input)?;
            methods.push((method, input_type_id, path_info, selector));
        }

        for service_id in &api.services {
            let Some(service) = api.state.service_by_id.get_mut(service_id) else {
                continue;
            };
            for (method, input_type_id, path_info, selector) in &methods {
                if service.methods.iter().any(|m| m.name == method.name) {
                    continue;
                }
                service.methods.push(Method {
                    name: method.name.to_string(),
                    id: format!("{service_id}.{}", method.name),
                    documentation: config
                        .documentation_for(selector)
                        .unwrap_or(method.documentation)
                        .to_string(),
                    input_type_id: input_type_id.clone(),
                    output_type_id: mixin.type_id(method.output),
                    path_info: path_info.clone(),
                    codec: Default::default(),
                });
            }
            debug!(service = %service_id, mixin = mixin.service, "injected mixin methods");
        }
    }
    Ok(())
}
