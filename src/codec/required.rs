//! Required-field tracing.
//!
//! A field is required in the context of a method when one of the method's
//! path variables ends at it. The whole model is traced once; codecs query
//! the result instead of re-walking templates per field.

use super::CodecError;
use crate::model::Api;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    /// Method id to the ids of the terminal fields of its path variables
    by_method: BTreeMap<String, BTreeSet<String>>,
    all: BTreeSet<String>,
}

impl RequiredFields {
    pub fn compute(api: &Api) -> Result<Self, CodecError> {
        let mut out = Self::default();
        for service in api.local_services()? {
            for method in &service.methods {
                let fields = out.by_method.entry(method.id.clone()).or_default();
                for variable in method.path_info.template.variables() {
                    let path = api
                        .state
                        .resolve_field_path(&method.input_type_id, &variable.field_path)
                        .map_err(|source| CodecError::PathParameter {
                            method: method.id.clone(),
                            field_path: variable.field_name(),
                            source,
                        })?;
                    if let Some(terminal) = path.last() {
                        fields.insert(terminal.id.clone());
                        out.all.insert(terminal.id.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    /// True if any method's path ends at `field_id`.
    pub fn is_required(&self, field_id: &str) -> bool {
        self.all.contains(field_id)
    }

    /// The required field ids of one method, sorted.
    pub fn for_method(&self, method_id: &str) -> Vec<String> {
        self.by_method
            .get(method_id)
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }
}
