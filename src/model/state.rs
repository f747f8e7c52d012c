use super::{Enum, Field, FieldType, Message, ModelError, Service};
use serde::Serialize;
use std::collections::BTreeMap;

/// Id-indexed lookup tables for one generation run.
///
/// Holds local and imported entities alike; the [`super::Api`] id lists say
/// which ones are local.
#[derive(Debug, Clone, Default, Serialize)]
pub struct State {
    pub message_by_id: BTreeMap<String, Message>,
    pub enum_by_id: BTreeMap<String, Enum>,
    pub service_by_id: BTreeMap<String, Service>,
}

impl State {
    pub fn insert_message(&mut self, message: Message) {
        self.message_by_id.insert(message.id.clone(), message);
    }

    pub fn insert_enum(&mut self, e: Enum) {
        self.enum_by_id.insert(e.id.clone(), e);
    }

    pub fn insert_service(&mut self, service: Service) {
        self.service_by_id.insert(service.id.clone(), service);
    }

    pub fn message(&self, id: &str) -> Result<&Message, ModelError> {
        self.message_by_id
            .get(id)
            .ok_or_else(|| ModelError::UnknownMessage { id: id.to_string() })
    }

    pub fn message_mut(&mut self, id: &str) -> Result<&mut Message, ModelError> {
        self.message_by_id
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownMessage { id: id.to_string() })
    }

    pub fn enum_(&self, id: &str) -> Result<&Enum, ModelError> {
        self.enum_by_id
            .get(id)
            .ok_or_else(|| ModelError::UnknownEnum { id: id.to_string() })
    }

    pub fn enum_mut(&mut self, id: &str) -> Result<&mut Enum, ModelError> {
        self.enum_by_id
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownEnum { id: id.to_string() })
    }

    pub fn service(&self, id: &str) -> Result<&Service, ModelError> {
        self.service_by_id
            .get(id)
            .ok_or_else(|| ModelError::UnknownService { id: id.to_string() })
    }

    pub fn service_mut(&mut self, id: &str) -> Result<&mut Service, ModelError> {
        self.service_by_id
            .get_mut(id)
            .ok_or_else(|| ModelError::UnknownService { id: id.to_string() })
    }

    /// Walk `path` starting at message `message_id`, returning one field per
    /// component. Every component but the last must be a message field.
    pub fn resolve_field_path<S: AsRef<str>>(
        &self,
        message_id: &str,
        path: &[S],
    ) -> Result<Vec<&Field>, ModelError> {
        let mut message = self.message(message_id)?;
        let mut fields = Vec::with_capacity(path.len());
        for (i, component) in path.iter().enumerate() {
            let component = component.as_ref();
            let field = message
                .field(component)
                .ok_or_else(|| ModelError::UnknownField {
                    message: message.id.clone(),
                    field: component.to_string(),
                })?;
            fields.push(field);
            if i + 1 < path.len() {
                message = match (&field.typez, &field.type_id) {
                    (FieldType::Message, Some(type_id)) => self.message(type_id)?,
                    _ => {
                        return Err(ModelError::NotTraversable {
                            id: field.id.clone(),
                        })
                    }
                };
            }
        }
        Ok(fields)
    }
}
