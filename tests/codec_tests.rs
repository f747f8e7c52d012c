#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use clientgen::codec::{annotate, codec_for, CodecError, Language};
use clientgen::model::Api;
use clientgen::parser::protobuf::from_descriptor_set;
use clientgen::parser::ServiceConfig;
use common::{id, SOURCE};
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn annotated(options: &[(&str, &str)]) -> Api {
    let config = ServiceConfig::from_yaml(common::SERVICE_CONFIG).unwrap();
    let mut api = from_descriptor_set(&common::descriptor_set(), SOURCE, Some(&config)).unwrap();
    let options: BTreeMap<String, String> = options
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let codec = codec_for(Language::Rust, &options, &api).unwrap();
    annotate(codec.as_ref(), &mut api).unwrap();
    api
}

fn field_type(api: &Api, message: &str, field: &str) -> Value {
    api.state
        .message(message)
        .unwrap()
        .field(field)
        .unwrap()
        .codec["type"]
        .clone()
}

#[test]
fn test_api_annotations() {
    let api = annotated(&[]);
    assert_eq!(api.codec["language"], json!("rust"));
    assert_eq!(
        api.codec["package_name"],
        json!("google-cloud-secretmanager-v1")
    );
    assert_eq!(
        api.codec["docs"],
        json!(["/// Stores sensitive data such as API keys, passwords, and certificates."])
    );
}

#[test]
fn test_package_name_override() {
    let api = annotated(&[("package-name-override", "google-cloud-secretmanager")]);
    assert_eq!(api.codec["package_name"], json!("google-cloud-secretmanager"));
}

#[test]
fn test_secret_field_types() {
    let api = annotated(&[]);
    let secret = id("Secret");
    assert_eq!(field_type(&api, &secret, "name"), json!("std::string::String"));
    assert_eq!(
        field_type(&api, &secret, "labels"),
        json!("std::collections::HashMap<std::string::String, std::string::String>")
    );
    assert_eq!(
        field_type(&api, &secret, "create_time"),
        json!("std::option::Option<wkt::Timestamp>")
    );
    assert_eq!(
        field_type(&api, &secret, "state"),
        json!("crate::model::secret::State")
    );
    assert_eq!(
        field_type(&api, &secret, "ttl"),
        json!("std::boxed::Box<wkt::Duration>")
    );
    assert_eq!(
        field_type(&api, &secret, "topics"),
        json!("std::vec::Vec<std::string::String>")
    );
    assert_eq!(
        field_type(&api, &secret, "etag"),
        json!("std::option::Option<std::string::String>")
    );
}

#[test]
fn test_wkt_crate_option() {
    let api = annotated(&[("wkt-crate", "types")]);
    assert_eq!(
        field_type(&api, &id("Secret"), "create_time"),
        json!("std::option::Option<types::Timestamp>")
    );
}

#[test]
fn test_message_and_oneof_annotations() {
    let api = annotated(&[]);
    let secret = api.state.message(&id("Secret")).unwrap();
    assert_eq!(secret.codec["name"], json!("Secret"));
    assert_eq!(secret.codec["qualified_name"], json!("crate::model::Secret"));
    assert_eq!(secret.codec["module"], json!("secret"));
    assert_eq!(secret.codec["has_nested_types"], json!(true));
    assert_eq!(secret.codec["docs"][0], json!("/// A secret."));

    let oneof = &secret.one_ofs[0];
    assert_eq!(oneof.codec["name"], json!("Expiration"));
    assert_eq!(oneof.codec["field_name"], json!("expiration"));
    assert_eq!(
        oneof.codec["type"],
        json!("std::option::Option<crate::model::secret::Expiration>")
    );

    let entry = api
        .state
        .message(&format!("{}.LabelsEntry", id("Secret")))
        .unwrap();
    assert_eq!(
        entry.codec["qualified_name"],
        json!("crate::model::secret::LabelsEntry")
    );
}

#[test]
fn test_enum_annotations() {
    let api = annotated(&[]);
    let state = api.state.enum_(&format!("{}.State", id("Secret"))).unwrap();
    assert_eq!(state.codec["qualified_name"], json!("crate::model::secret::State"));
    let names: Vec<&Value> = state.values.iter().map(|v| &v.codec["name"]).collect();
    assert_eq!(
        names,
        vec![
            &json!("STATE_UNSPECIFIED"),
            &json!("ENABLED"),
            &json!("DISABLED")
        ]
    );
}

#[test]
fn test_method_annotations() {
    let api = annotated(&[]);
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    assert_eq!(service.codec["name"], json!("SecretManagerService"));
    assert_eq!(service.codec["module"], json!("secret_manager_service"));
    assert_eq!(service.codec["default_host"], json!("secretmanager.googleapis.com"));

    let get = &service.methods[0].codec;
    assert_eq!(get["name"], json!("get_secret"));
    assert_eq!(get["verb"], json!("GET"));
    assert_eq!(get["path_format"], json!("/v1/{}"));
    assert_eq!(get["path_args"], json!(["req.name"]));
    assert_eq!(get["input_type"], json!("crate::model::GetSecretRequest"));
    assert_eq!(get["output_type"], json!("crate::model::Secret"));
    assert_eq!(
        get["required_fields"],
        json!([format!("{}.name", id("GetSecretRequest"))])
    );

    let list = &service.methods[1].codec;
    assert_eq!(list["path_format"], json!("/v1/{}/secrets"));
    assert_eq!(
        list["query_params"],
        json!([
            { "name": "page_size", "json_name": "pageSize" },
            { "name": "page_token", "json_name": "pageToken" }
        ])
    );
    assert_eq!(list["body"], Value::Null);
    assert_eq!(
        list["required_fields"],
        json!([format!("{}.parent", id("ListSecretsRequest"))])
    );
    assert_eq!(list["docs"], json!(["/// Lists secrets, newest first."]));
}

#[test]
fn test_nested_path_parameter_access() {
    let api = annotated(&[("gax-crate", "google_cloud_gax")]);
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    let update = &service.methods[2].codec;
    assert_eq!(update["verb"], json!("PATCH"));
    assert_eq!(update["body"], json!("secret"));
    assert_eq!(
        update["path_args"],
        json!([
            "req.secret.as_ref().ok_or_else(|| google_cloud_gax::path_parameter::missing(\"secret\"))?.name"
        ])
    );
    let secret = api.state.message(&id("Secret")).unwrap();
    assert_eq!(secret.field("name").unwrap().codec["required"], json!(true));
    assert_eq!(secret.field("etag").unwrap().codec["required"], json!(false));
}

#[test]
fn test_mixin_types_use_default_crate() {
    let api = annotated(&[]);
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    let list_locations = service
        .methods
        .iter()
        .find(|m| m.name == "ListLocations")
        .unwrap();
    assert_eq!(
        list_locations.codec["output_type"],
        json!("location::model::ListLocationsResponse")
    );
}

#[test]
fn test_mixin_crate_can_be_remapped() {
    let api = annotated(&[("package:google.cloud.location", "google_cloud_location")]);
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    let get_location = service
        .methods
        .iter()
        .find(|m| m.name == "GetLocation")
        .unwrap();
    assert_eq!(
        get_location.codec["output_type"],
        json!("google_cloud_location::model::Location")
    );
}

#[test]
fn test_unmapped_foreign_package_fails() {
    let mut set = common::descriptor_set();
    set.file[1].message_type[1]
        .field
        .push(common::message_field("condition", 2, ".google.type.Expr"));
    let mut api = from_descriptor_set(&set, SOURCE, None).unwrap();
    let codec = codec_for(Language::Rust, &BTreeMap::new(), &api).unwrap();
    let err = annotate(codec.as_ref(), &mut api).unwrap_err();
    assert!(
        matches!(err, CodecError::MissingPackageMapping { ref package, .. } if package == "google.type"),
        "{err}"
    );

    let options = BTreeMap::from([("package:google.type".to_string(), "gtype".to_string())]);
    let codec = codec_for(Language::Rust, &options, &api).unwrap();
    annotate(codec.as_ref(), &mut api).unwrap();
    assert_eq!(
        field_type(&api, &id("GetSecretRequest"), "condition"),
        json!("std::option::Option<gtype::model::Expr>")
    );
}

#[test]
fn test_annotate_leaves_semantic_fields_alone() {
    let config = ServiceConfig::from_yaml(common::SERVICE_CONFIG).unwrap();
    let before = from_descriptor_set(&common::descriptor_set(), SOURCE, Some(&config)).unwrap();
    let after = annotated(&[]);
    let strip = |api: &Api| {
        let mut secret = api.state.message(&id("Secret")).unwrap().clone();
        secret.codec.clear();
        for field in &mut secret.fields {
            field.codec.clear();
        }
        for oneof in &mut secret.one_ofs {
            oneof.codec.clear();
        }
        secret
    };
    assert_eq!(strip(&before), strip(&after));
}
