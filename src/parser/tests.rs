#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::model::{Field, FieldType};

fn request_message() -> Message {
    let field = |name: &str| Field {
        name: name.to_string(),
        json_name: name.to_string(),
        id: format!(".test.v1.UpdateSecretRequest.{name}"),
        typez: FieldType::String,
        ..Default::default()
    };
    Message {
        name: "UpdateSecretRequest".to_string(),
        id: ".test.v1.UpdateSecretRequest".to_string(),
        package: "test.v1".to_string(),
        fields: vec![field("secret"), field("update_mask"), field("etag")],
        ..Default::default()
    }
}

#[test]
fn test_query_parameters_exclude_path_and_body() {
    let info = make_path_info(
        ".test.v1.S.UpdateSecret",
        http::Method::PATCH,
        "/v1/{secret.name=projects/*/secrets/*}",
        Some("secret"),
        &request_message(),
    )
    .unwrap();
    assert_eq!(info.body_field_path.as_deref(), Some("secret"));
    let params: Vec<_> = info.query_parameters.iter().map(String::as_str).collect();
    assert_eq!(params, vec!["etag", "update_mask"]);
}

#[test]
fn test_star_body_leaves_no_query_parameters() {
    let info = make_path_info(
        ".test.v1.S.UpdateSecret",
        http::Method::POST,
        "/v1/{secret}:update",
        Some("*"),
        &request_message(),
    )
    .unwrap();
    assert!(info.query_parameters.is_empty());
}

#[test]
fn test_empty_body_is_no_body() {
    let info = make_path_info(
        ".test.v1.S.GetSecret",
        http::Method::GET,
        "/v1/{secret}",
        Some(""),
        &request_message(),
    )
    .unwrap();
    assert_eq!(info.body_field_path, None);
    assert_eq!(info.query_parameters.len(), 2);
}

#[test]
fn test_bad_template_names_the_method() {
    let err = make_path_info(
        ".test.v1.S.Broken",
        http::Method::GET,
        "v1/{secret}",
        None,
        &request_message(),
    )
    .unwrap_err();
    match err {
        ParseError::PathTemplate { method, source } => {
            assert_eq!(method, ".test.v1.S.Broken");
            assert_eq!(source.position, 0);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_check_package_detects_conflict() {
    let mut package = None;
    check_package(&mut package, ".a.v1.X", "a.v1").unwrap();
    check_package(&mut package, ".a.v1.Y", "a.v1").unwrap();
    assert!(matches!(
        check_package(&mut package, ".b.v1.Z", "b.v1"),
        Err(ParseError::InconsistentPackage { .. })
    ));
}

#[test]
fn test_specification_format_from_str() {
    assert_eq!(
        "protobuf".parse::<SpecificationFormat>().unwrap(),
        SpecificationFormat::Protobuf
    );
    assert_eq!(
        "openapi".parse::<SpecificationFormat>().unwrap(),
        SpecificationFormat::OpenApi
    );
    assert!("disco".parse::<SpecificationFormat>().is_err());
}

#[test]
fn test_service_config_selectors() {
    let config = ServiceConfig::from_yaml(
        r#"
name: secretmanager.googleapis.com
title: Secret Manager API
apis:
  - name: google.cloud.secretmanager.v1.SecretManagerService
  - name: google.cloud.location.Locations
documentation:
  summary: Stores sensitive data.
  rules:
    - selector: google.cloud.location.Locations.ListLocations
      description: Lists locations.
http:
  rules:
    - selector: google.cloud.location.Locations.ListLocations
      get: '/v1/{name=projects/*}/locations'
    - selector: google.cloud.location.Locations.GetLocation
"#,
    )
    .unwrap();
    assert!(config.has_api("google.cloud.location.Locations"));
    assert!(!config.has_api("google.iam.v1.IAMPolicy"));
    assert_eq!(
        config.documentation_for(".google.cloud.location.Locations.ListLocations"),
        Some("Lists locations.")
    );
    assert_eq!(
        config.http_binding_for("google.cloud.location.Locations.ListLocations"),
        Some((http::Method::GET, "/v1/{name=projects/*}/locations", None))
    );
    // A rule without a binding is ignored.
    assert!(config
        .http_binding_for("google.cloud.location.Locations.GetLocation")
        .is_none());
}
