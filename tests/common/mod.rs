//! Shared fixtures for the integration tests.
//!
//! The protobuf fixture is a trimmed secret manager API built with the
//! crate's own descriptor types, the way `protoc --include_imports
//! --include_source_info` would emit it.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use clientgen::parser::protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, HttpRule, Location, MessageOptions,
    MethodDescriptorProto, MethodOptions, OneofDescriptorProto, ServiceDescriptorProto,
    ServiceOptions, SourceCodeInfo,
};
use prost::Message as _;
use prost_types::field_descriptor_proto::{Label, Type};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub const PACKAGE: &str = "google.cloud.secretmanager.v1";
pub const SOURCE: &str = "google/cloud/secretmanager/v1";

pub fn id(name: &str) -> String {
    format!(".{PACKAGE}.{name}")
}

pub fn scalar(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

pub fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

pub fn in_oneof(mut field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    field.oneof_index = Some(index);
    field
}

pub fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn get(path: &str) -> HttpRule {
    HttpRule {
        get: Some(path.to_string()),
        ..Default::default()
    }
}

pub fn method(name: &str, input: &str, output: &str, http: Option<HttpRule>) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        options: http.map(|rule| MethodOptions { http: Some(rule) }),
    }
}

fn comment(path: Vec<i32>, text: &str) -> Location {
    Location {
        path,
        span: vec![0, 0, 0],
        leading_comments: Some(text.to_string()),
    }
}

fn secret() -> DescriptorProto {
    let mut labels_entry = message(
        "LabelsEntry",
        vec![scalar("key", 1, Type::String), scalar("value", 2, Type::String)],
    );
    labels_entry.options = Some(MessageOptions {
        map_entry: Some(true),
    });

    let state = EnumDescriptorProto {
        name: Some("State".to_string()),
        value: ["STATE_UNSPECIFIED", "ENABLED", "DISABLED"]
            .iter()
            .enumerate()
            .map(|(n, name)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(n as i32),
            })
            .collect(),
    };

    let mut etag = scalar("etag", 8, Type::String);
    etag.proto3_optional = Some(true);
    etag.oneof_index = Some(1);

    let mut state_field = scalar("state", 4, Type::Enum);
    state_field.type_name = Some(format!("{}.State", id("Secret")));

    DescriptorProto {
        name: Some("Secret".to_string()),
        field: vec![
            scalar("name", 1, Type::String),
            repeated(message_field("labels", 2, &format!("{}.LabelsEntry", id("Secret")))),
            message_field("create_time", 3, ".google.protobuf.Timestamp"),
            state_field,
            in_oneof(message_field("expire_time", 5, ".google.protobuf.Timestamp"), 0),
            in_oneof(message_field("ttl", 6, ".google.protobuf.Duration"), 0),
            repeated(scalar("topics", 7, Type::String)),
            etag,
        ],
        nested_type: vec![labels_entry],
        enum_type: vec![state],
        oneof_decl: vec![
            OneofDescriptorProto {
                name: Some("expiration".to_string()),
            },
            OneofDescriptorProto {
                name: Some("_etag".to_string()),
            },
        ],
        ..Default::default()
    }
}

/// The local `service.proto` of the fixture.
pub fn service_file() -> FileDescriptorProto {
    let update = HttpRule {
        patch: Some("/v1/{secret.name=projects/*/secrets/*}".to_string()),
        body: "secret".to_string(),
        ..Default::default()
    };
    FileDescriptorProto {
        name: Some(format!("{SOURCE}/service.proto")),
        package: Some(PACKAGE.to_string()),
        dependency: vec!["google/protobuf/timestamp.proto".to_string()],
        message_type: vec![
            secret(),
            message("GetSecretRequest", vec![scalar("name", 1, Type::String)]),
            message(
                "ListSecretsRequest",
                vec![
                    scalar("parent", 1, Type::String),
                    scalar("page_size", 2, Type::Int32),
                    scalar("page_token", 3, Type::String),
                ],
            ),
            message(
                "ListSecretsResponse",
                vec![
                    repeated(message_field("secrets", 1, &id("Secret"))),
                    scalar("next_page_token", 2, Type::String),
                ],
            ),
            message(
                "UpdateSecretRequest",
                vec![
                    message_field("secret", 1, &id("Secret")),
                    message_field("update_mask", 2, ".google.protobuf.FieldMask"),
                ],
            ),
            message("DeleteSecretRequest", vec![scalar("name", 1, Type::String)]),
        ],
        enum_type: Vec::new(),
        service: vec![ServiceDescriptorProto {
            name: Some("SecretManagerService".to_string()),
            method: vec![
                method(
                    "GetSecret",
                    &id("GetSecretRequest"),
                    &id("Secret"),
                    Some(get("/v1/{name=projects/*/secrets/*}")),
                ),
                method(
                    "ListSecrets",
                    &id("ListSecretsRequest"),
                    &id("ListSecretsResponse"),
                    Some(get("/v1/{parent=projects/*}/secrets")),
                ),
                method(
                    "UpdateSecret",
                    &id("UpdateSecretRequest"),
                    &id("Secret"),
                    Some(update),
                ),
                method(
                    "DeleteSecret",
                    &id("DeleteSecretRequest"),
                    ".google.protobuf.Empty",
                    None,
                ),
            ],
            options: Some(ServiceOptions {
                default_host: Some("secretmanager.googleapis.com".to_string()),
            }),
        }],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                comment(vec![4, 0], " A secret.\n\n Holds versions.\n"),
                comment(vec![4, 0, 2, 0], " The resource name.\n"),
                comment(vec![6, 0], " Manages secrets.\n"),
                comment(vec![6, 0, 2, 0], " Gets a secret.\n"),
            ],
        }),
    }
}

/// An imported-only file in a foreign package.
pub fn expr_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/type/expr.proto".to_string()),
        package: Some("google.type".to_string()),
        message_type: vec![message(
            "Expr",
            vec![scalar("expression", 1, Type::String)],
        )],
        ..Default::default()
    }
}

pub fn descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![expr_file(), service_file()],
    }
}

pub fn encode(set: &FileDescriptorSet) -> Vec<u8> {
    set.encode_to_vec()
}

pub const SERVICE_CONFIG: &str = r#"
name: secretmanager.googleapis.com
title: Secret Manager API
apis:
  - name: google.cloud.secretmanager.v1.SecretManagerService
  - name: google.cloud.location.Locations
documentation:
  summary: Stores sensitive data such as API keys, passwords, and certificates.
  rules:
    - selector: google.cloud.secretmanager.v1.SecretManagerService.ListSecrets
      description: Lists secrets, newest first.
    - selector: google.cloud.location.Locations.GetLocation
      description: Gets a location of the secret manager service.
http:
  rules:
    - selector: google.cloud.location.Locations.ListLocations
      get: '/v1/{name=projects/*}/locations'
    - selector: google.cloud.location.Locations.GetLocation
      get: '/v1/{name=projects/*/locations/*}'
"#;

pub fn petstore() -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Pet Store",
            "version": "1.0.0",
            "description": "A sample pet store."
        },
        "servers": [{ "url": "https://petstore.example.com/v1" }],
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "summary": "List all pets.",
                    "parameters": [
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "format": "int32" } },
                        { "$ref": "#/components/parameters/PageToken" }
                    ],
                    "responses": {
                        "200": {
                            "description": "A page of pets",
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "properties": {
                                    "pets": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } },
                                    "nextPageToken": { "type": "string" }
                                }
                            } } }
                        }
                    }
                },
                "post": {
                    "operationId": "createPet",
                    "requestBody": {
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
                    },
                    "responses": {
                        "201": {
                            "description": "Created",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
                        }
                    }
                }
            },
            "/pets/{petId}": {
                "delete": {
                    "operationId": "deletePet",
                    "parameters": [
                        { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "X-Trace", "in": "header", "schema": { "type": "string" } }
                    ],
                    "responses": { "204": { "description": "Deleted" } }
                }
            }
        },
        "components": {
            "parameters": {
                "PageToken": { "name": "pageToken", "in": "query", "schema": { "type": "string" } }
            },
            "schemas": {
                "Pet": {
                    "type": "object",
                    "description": "A pet for sale.",
                    "required": ["name"],
                    "properties": {
                        "name": { "type": "string" },
                        "birthTime": { "type": "string", "format": "date-time" },
                        "tags": { "type": "array", "items": { "type": "string" } },
                        "attributes": { "type": "object", "additionalProperties": { "type": "integer", "format": "int64" } },
                        "owner": {
                            "type": "object",
                            "properties": { "displayName": { "type": "string" } }
                        },
                        "photo": { "type": "string", "format": "byte" },
                        "extra": { "type": "object" }
                    }
                }
            }
        }
    })
}

pub fn write(path: &Path, contents: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Lay out a project root with the descriptor set, service config, an
/// OpenAPI document, root defaults and two templates.
pub fn write_project(root: &Path) {
    write(&root.join("protos.binpb"), encode(&descriptor_set()));
    write(&root.join(SOURCE).join("secretmanager_v1.yaml"), SERVICE_CONFIG);
    write(
        &root.join("openapi/petstore.json"),
        serde_json::to_vec_pretty(&petstore()).unwrap(),
    );
    write(
        &root.join(".clientgen.toml"),
        "[general]\nlanguage = \"rust\"\ntemplate-dir = \"templates\"\n\n[codec]\nwkt-crate = \"wkt\"\n",
    );
    write(
        &root.join("templates/src/model.rs.j2"),
        "{% for m in messages %}pub struct {{ m.codec.name }};\n{% endfor %}",
    );
    write(
        &root.join("templates/src/client.rs.j2"),
        "{% for s in services %}// {{ s.codec.default_host }}\n{% for m in s.methods %}{{ m.codec.name }}: {{ m.codec.verb }} {{ m.codec.path_format }}\n{% endfor %}{% endfor %}",
    );
}

/// A protobuf unit directory below `root`.
pub fn write_protobuf_unit(root: &Path, name: &str) -> std::path::PathBuf {
    let dir = root.join("generated").join(name);
    write(
        &dir.join(".clientgen.toml"),
        format!(
            "[general]\nspecification-format = \"protobuf\"\nspecification-source = \"{SOURCE}\"\nservice-config = \"{SOURCE}/secretmanager_v1.yaml\"\n\n[source]\ndescriptor-set = \"protos.binpb\"\n"
        ),
    );
    dir
}

/// An OpenAPI unit directory below `root`.
pub fn write_openapi_unit(root: &Path, name: &str, document: &str) -> std::path::PathBuf {
    let dir = root.join("generated").join(name);
    write(
        &dir.join(".clientgen.toml"),
        format!(
            "[general]\nspecification-format = \"openapi\"\nspecification-source = \"{document}\"\n"
        ),
    );
    dir
}
