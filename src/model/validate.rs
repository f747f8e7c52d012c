use super::{Api, Message, ModelError};
use tracing::debug;

/// Check the structural invariants of a freshly parsed model.
///
/// All local messages, enums and services must share one package, method
/// input and output types must be messages, and oneofs must be non-empty and
/// free of repeated members. Field type references are not resolved here;
/// the codec resolves them lazily.
pub fn validate(api: &Api) -> Result<(), ModelError> {
    let mut expected = (!api.package_name.is_empty()).then(|| api.package_name.clone());
    let mut check_package = |id: &str, package: &str| -> Result<(), ModelError> {
        if let Some(expected) = expected.as_deref() {
            if expected != package {
                return Err(ModelError::PackageMismatch {
                    id: id.to_string(),
                    expected: expected.to_string(),
                    found: package.to_string(),
                });
            }
            return Ok(());
        }
        expected = Some(package.to_string());
        Ok(())
    };

    let messages = api.local_messages()?;
    for message in &messages {
        check_package(&message.id, &message.package)?;
        validate_message(message)?;
    }
    for e in api.local_enums()? {
        check_package(&e.id, &e.package)?;
    }
    for service in api.local_services()? {
        check_package(&service.id, &service.package)?;
        for method in &service.methods {
            for type_id in [&method.input_type_id, &method.output_type_id] {
                if !api.state.message_by_id.contains_key(type_id) {
                    return Err(ModelError::UnresolvedMethodType {
                        method: method.id.clone(),
                        type_id: type_id.clone(),
                    });
                }
            }
        }
    }

    debug!(
        api = %api.name,
        messages = messages.len(),
        services = api.services.len(),
        "model validated"
    );
    Ok(())
}

fn validate_message(message: &Message) -> Result<(), ModelError> {
    if message.is_map && message.map_entry().is_none() {
        return Err(ModelError::MalformedMap {
            id: message.id.clone(),
        });
    }
    for field in &message.fields {
        if field.is_oneof && field.repeated {
            return Err(ModelError::RepeatedOneOfMember {
                id: field.id.clone(),
            });
        }
    }
    for oneof in &message.one_ofs {
        if oneof.fields.is_empty() {
            return Err(ModelError::EmptyOneOf {
                id: oneof.id.clone(),
            });
        }
        for name in &oneof.fields {
            let field = message.field(name).ok_or_else(|| ModelError::UnknownField {
                message: message.id.clone(),
                field: name.clone(),
            })?;
            if field.repeated {
                return Err(ModelError::RepeatedOneOfMember {
                    id: field.id.clone(),
                });
            }
        }
    }
    Ok(())
}
