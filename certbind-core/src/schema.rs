//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type, enabling validation of
//! declared attributes before any API call is made.

use std::collections::HashMap;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// String with an additional format check
    Custom {
        name: String,
        validate: fn(&str) -> Result<(), String>,
    },
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match self {
            AttributeType::String => Ok(()),
            AttributeType::Custom { name, validate } => {
                validate(value.as_str()).map_err(|message| TypeError::ValidationFailed {
                    type_name: name.clone(),
                    message,
                })
            }
        }
    }
}

/// Type error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Validation failed for {type_name}: {message}")]
    ValidationFailed { type_name: String, message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the remote side; may also be set by the user when `optional`
    pub computed: bool,
    pub optional: bool,
    /// Changing this attribute requires destroying and recreating the resource
    pub force_new: bool,
    pub deprecated: Option<String>,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "certCrn")
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            optional: false,
            force_new: false,
            deprecated: None,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = Some(message.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Whether the user may declare a value for this attribute
    pub fn is_settable(&self) -> bool {
        self.required || self.optional || !self.computed
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate declared resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            match self.attributes.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if !schema.is_settable() => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(e);
                    }
                }
            }
        }

        // HashMap iteration order is unstable; keep reports deterministic
        errors.sort_by_key(|e| e.to_string());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Declared attributes that carry a deprecation notice, with the notice
    pub fn deprecated_in<'a>(
        &'a self,
        attributes: &'a HashMap<String, Value>,
    ) -> Vec<(&'a str, &'a str)> {
        let mut found: Vec<(&str, &str)> = attributes
            .keys()
            .filter_map(|name| {
                let schema = self.attributes.get(name)?;
                schema
                    .deprecated
                    .as_deref()
                    .map(|msg| (schema.name.as_str(), msg))
            })
            .collect();
        found.sort();
        found
    }

    /// Subset of `changed` that cannot be updated in place
    pub fn force_new_attributes(&self, changed: &[String]) -> Vec<String> {
        let mut forced: Vec<String> = changed
            .iter()
            .filter(|name| self.attributes.get(*name).is_some_and(|s| s.force_new))
            .cloned()
            .collect();
        forced.sort();
        forced
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Cloud resource name, e.g. `crn:v1:bluemix:public:cloudcerts:us-south:a/acct:inst::`
    pub fn crn() -> AttributeType {
        AttributeType::Custom {
            name: "Crn".to_string(),
            validate: validate_crn,
        }
    }
}

/// Validate CRN format: `crn:` followed by nine colon-separated segments
pub fn validate_crn(crn: &str) -> Result<(), String> {
    let segments: Vec<&str> = crn.split(':').collect();
    if segments.first() != Some(&"crn") {
        return Err(format!("Invalid CRN '{}': must start with 'crn:'", crn));
    }
    if segments.len() != 10 {
        return Err(format!(
            "Invalid CRN '{}': expected 10 segments, got {}",
            crn,
            segments.len()
        ));
    }
    if segments[1].is_empty() {
        return Err(format!("Invalid CRN '{}': missing version", crn));
    }
    Ok(())
}
