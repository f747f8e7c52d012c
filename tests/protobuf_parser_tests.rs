#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use clientgen::model::{self, FieldType};
use clientgen::parser::protobuf::descriptor::FileDescriptorProto;
use clientgen::parser::protobuf::from_descriptor_set;
use clientgen::parser::{parse, ParseError, ParseRequest, ServiceConfig, SpecificationFormat};
use common::{id, PACKAGE, SOURCE};
use std::collections::{BTreeMap, BTreeSet};

fn service_config() -> ServiceConfig {
    ServiceConfig::from_yaml(common::SERVICE_CONFIG).unwrap()
}

fn secretmanager() -> model::Api {
    let config = service_config();
    from_descriptor_set(&common::descriptor_set(), SOURCE, Some(&config)).unwrap()
}

#[test]
fn test_api_metadata_from_service_config() {
    let api = secretmanager();
    assert_eq!(api.name, "secretmanager");
    assert_eq!(api.title, "Secret Manager API");
    assert!(api.description.starts_with("Stores sensitive data"));
    assert_eq!(api.package_name, PACKAGE);
    model::validate(&api).unwrap();
}

#[test]
fn test_api_metadata_without_service_config() {
    let api = from_descriptor_set(&common::descriptor_set(), SOURCE, None).unwrap();
    assert_eq!(api.name, "secretmanager");
    assert_eq!(api.title, "secretmanager");
    assert!(api.description.is_empty());
}

#[test]
fn test_only_local_files_are_listed() {
    let api = secretmanager();
    assert_eq!(
        api.messages,
        vec![
            id("Secret"),
            id("GetSecretRequest"),
            id("ListSecretsRequest"),
            id("ListSecretsResponse"),
            id("UpdateSecretRequest"),
            id("DeleteSecretRequest"),
        ]
    );
    assert!(api.state.message(".google.type.Expr").is_ok());
    assert!(!api.messages.iter().any(|m| m.starts_with(".google.type")));

    let local: Vec<&str> = api
        .local_messages()
        .unwrap()
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(local[0], id("Secret"));
    assert_eq!(local[1], format!("{}.LabelsEntry", id("Secret")));

    let enums: Vec<String> = api
        .local_enums()
        .unwrap()
        .iter()
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(enums, vec![format!("{}.State", id("Secret"))]);
}

#[test]
fn test_comments_become_documentation() {
    let api = secretmanager();
    let secret = api.state.message(&id("Secret")).unwrap();
    assert_eq!(secret.documentation, "A secret.\n\nHolds versions.");
    assert_eq!(secret.field("name").unwrap().documentation, "The resource name.");
    assert!(secret.field("labels").unwrap().documentation.is_empty());
}

#[test]
fn test_field_shapes() {
    let api = secretmanager();
    let secret = api.state.message(&id("Secret")).unwrap();

    let labels = secret.field("labels").unwrap();
    assert!(labels.repeated);
    assert!(!labels.optional);
    let entry = api.state.message(labels.type_id.as_deref().unwrap()).unwrap();
    assert!(entry.is_map);
    assert_eq!(entry.parent.as_deref(), Some(id("Secret").as_str()));
    let (key, value) = entry.map_entry().unwrap();
    assert_eq!((key.typez, value.typez), (FieldType::String, FieldType::String));

    let create_time = secret.field("create_time").unwrap();
    assert!(create_time.optional);
    assert_eq!(create_time.type_id.as_deref(), Some(".google.protobuf.Timestamp"));

    let ttl = secret.field("ttl").unwrap();
    assert!(ttl.is_oneof);
    assert!(!ttl.optional);

    let etag = secret.field("etag").unwrap();
    assert!(etag.optional);
    assert!(!etag.is_oneof);

    let topics = secret.field("topics").unwrap();
    assert!(topics.repeated);
    assert_eq!(topics.type_id, None);
    assert_eq!(topics.json_name, "topics");

    assert_eq!(secret.field("create_time").unwrap().json_name, "createTime");
}

#[test]
fn test_synthetic_oneofs_are_dropped() {
    let api = secretmanager();
    let secret = api.state.message(&id("Secret")).unwrap();
    assert_eq!(secret.one_ofs.len(), 1);
    assert_eq!(secret.one_ofs[0].name, "expiration");
    assert_eq!(secret.one_ofs[0].fields, vec!["expire_time", "ttl"]);
}

#[test]
fn test_enum_values() {
    let api = secretmanager();
    let state = api.state.enum_(&format!("{}.State", id("Secret"))).unwrap();
    let values: Vec<(&str, i32)> = state
        .values
        .iter()
        .map(|v| (v.name.as_str(), v.number))
        .collect();
    assert_eq!(
        values,
        vec![("STATE_UNSPECIFIED", 0), ("ENABLED", 1), ("DISABLED", 2)]
    );
}

#[test]
fn test_service_methods_and_bindings() {
    let api = secretmanager();
    assert_eq!(api.services, vec![id("SecretManagerService")]);
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    assert_eq!(service.default_host, "secretmanager.googleapis.com");
    assert_eq!(service.documentation, "Manages secrets.");

    let names: Vec<&str> = service.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "GetSecret",
            "ListSecrets",
            "UpdateSecret",
            "ListLocations",
            "GetLocation"
        ]
    );

    let get = &service.methods[0];
    assert_eq!(get.documentation, "Gets a secret.");
    assert_eq!(get.path_info.verb, http::Method::GET);
    assert!(get.path_info.query_parameters.is_empty());

    let list = &service.methods[1];
    assert_eq!(list.documentation, "Lists secrets, newest first.");
    assert_eq!(
        list.path_info.query_parameters,
        BTreeSet::from(["page_size".to_string(), "page_token".to_string()])
    );

    let update = &service.methods[2];
    assert_eq!(update.path_info.verb, http::Method::PATCH);
    assert_eq!(update.path_info.body_field_path.as_deref(), Some("secret"));
    assert_eq!(
        update.path_info.query_parameters,
        BTreeSet::from(["update_mask".to_string()])
    );
    assert_eq!(
        update.path_info.template.to_string(),
        "/v1/{secret.name=projects/*/secrets/*}"
    );
}

#[test]
fn test_mixin_methods_use_service_config() {
    let api = secretmanager();
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    let get_location = service
        .methods
        .iter()
        .find(|m| m.name == "GetLocation")
        .unwrap();
    assert_eq!(get_location.id, format!("{}.GetLocation", id("SecretManagerService")));
    assert_eq!(get_location.input_type_id, ".google.cloud.location.GetLocationRequest");
    assert_eq!(get_location.output_type_id, ".google.cloud.location.Location");
    assert_eq!(
        get_location.documentation,
        "Gets a location of the secret manager service."
    );
    assert_eq!(
        get_location.path_info.template.to_string(),
        "/v1/{name=projects/*/locations/*}"
    );
}

#[test]
fn test_no_mixins_without_service_config() {
    let api = from_descriptor_set(&common::descriptor_set(), SOURCE, None).unwrap();
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    assert_eq!(service.methods.len(), 3);
}

#[test]
fn test_service_config_http_rule_overrides_annotation() {
    let yaml = format!(
        "{}\n    - selector: {PACKAGE}.SecretManagerService.GetSecret\n      get: '/v1/{{name=projects/*/locations/*/secrets/*}}'\n",
        common::SERVICE_CONFIG.trim_end()
    );
    let config = ServiceConfig::from_yaml(&yaml).unwrap();
    let api = from_descriptor_set(&common::descriptor_set(), SOURCE, Some(&config)).unwrap();
    let service = api.state.service(&id("SecretManagerService")).unwrap();
    assert_eq!(
        service.methods[0].path_info.template.to_string(),
        "/v1/{name=projects/*/locations/*/secrets/*}"
    );
}

#[test]
fn test_no_local_files() {
    let err = from_descriptor_set(&common::descriptor_set(), "google/cloud/kms", None).unwrap_err();
    assert!(matches!(err, ParseError::NoLocalFiles(ref s) if s == "google/cloud/kms"));
}

#[test]
fn test_unresolved_field_type() {
    let mut set = common::descriptor_set();
    set.file[1].message_type[1]
        .field
        .push(common::message_field("policy", 2, &id("Missing")));
    let err = from_descriptor_set(&set, SOURCE, None).unwrap_err();
    match err {
        ParseError::UnresolvedType { id: field, type_name } => {
            assert_eq!(field, format!("{}.policy", id("GetSecretRequest")));
            assert_eq!(type_name, id("Missing"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_inconsistent_local_packages() {
    let mut set = common::descriptor_set();
    let mut other = common::expr_file();
    other.name = Some(format!("{SOURCE}/other.proto"));
    set.file.push(other);
    let err = from_descriptor_set(&set, SOURCE, None).unwrap_err();
    assert!(matches!(err, ParseError::InconsistentPackage { .. }), "{err}");
}

#[test]
fn test_sibling_version_directories_are_not_local() {
    let mut set = common::descriptor_set();
    set.file.push(FileDescriptorProto {
        name: Some("google/cloud/secretmanager/v1beta2/service.proto".to_string()),
        package: Some("google.cloud.secretmanager.v1beta2".to_string()),
        message_type: vec![common::message("BetaOnly", Vec::new())],
        ..Default::default()
    });
    let api = from_descriptor_set(&set, SOURCE, None).unwrap();
    assert_eq!(api.package_name, PACKAGE);
    assert!(!api.messages.iter().any(|m| m.contains("v1beta2")));
    assert!(api
        .state
        .message(".google.cloud.secretmanager.v1beta2.BetaOnly")
        .is_ok());

    let beta = from_descriptor_set(&set, "google/cloud/secretmanager/v1beta2/", None).unwrap();
    assert_eq!(beta.package_name, "google.cloud.secretmanager.v1beta2");
    assert_eq!(
        beta.messages,
        vec![".google.cloud.secretmanager.v1beta2.BetaOnly".to_string()]
    );
}

#[test]
fn test_parse_reads_descriptor_set_file() {
    let dir = tempfile::tempdir().unwrap();
    common::write(&dir.path().join("protos.binpb"), common::encode(&common::descriptor_set()));
    let options = BTreeMap::from([("descriptor-set".to_string(), "protos.binpb".to_string())]);
    let config = service_config();
    let api = parse(&ParseRequest {
        format: SpecificationFormat::Protobuf,
        specification_source: SOURCE,
        service_config: Some(&config),
        options: &options,
        project_root: dir.path(),
    })
    .unwrap();
    assert_eq!(api.package_name, PACKAGE);
    assert_eq!(api.services.len(), 1);
}

#[test]
fn test_parse_requires_descriptor_set_option() {
    let dir = tempfile::tempdir().unwrap();
    let options = BTreeMap::new();
    let err = parse(&ParseRequest {
        format: SpecificationFormat::Protobuf,
        specification_source: SOURCE,
        service_config: None,
        options: &options,
        project_root: dir.path(),
    })
    .unwrap_err();
    assert!(matches!(err, ParseError::MissingOption(ref o) if o == "descriptor-set"));
}

#[test]
fn test_parse_rejects_truncated_descriptor_set() {
    let dir = tempfile::tempdir().unwrap();
    common::write(&dir.path().join("protos.binpb"), b"\x0a\x05ab");
    let options = BTreeMap::from([("descriptor-set".to_string(), "protos.binpb".to_string())]);
    let err = parse(&ParseRequest {
        format: SpecificationFormat::Protobuf,
        specification_source: SOURCE,
        service_config: None,
        options: &options,
        project_root: dir.path(),
    })
    .unwrap_err();
    assert!(matches!(err, ParseError::Decode { .. }), "{err}");
}
