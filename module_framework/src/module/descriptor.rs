//! Immutable module metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::capability::canonical_id;

/// Priority given to modules that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Metadata describing one module.
///
/// Built once with the `with_*` methods and then handed to the module; the
/// container only ever sees it through `&ModuleDescriptor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    id: String,
    name: String,
    version: String,
    description: String,
    authors: Vec<String>,
    dependencies: Vec<String>,
    optional: bool,
    priority: i32,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl ModuleDescriptor {
    /// Create a descriptor whose display name defaults to the id.
    ///
    /// The id is canonicalised to upper case, like every other module id.
    pub fn new(id: impl Into<String>) -> Self {
        let name = id.into();
        let id = canonical_id(&name);
        Self {
            name,
            id,
            version: "1.0.0".to_string(),
            description: String::new(),
            authors: Vec::new(),
            dependencies: Vec::new(),
            optional: false,
            priority: DEFAULT_PRIORITY,
            properties: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    /// Declare a module that must be registered before this one can initialize.
    pub fn with_dependency(mut self, module_id: impl Into<String>) -> Self {
        self.dependencies.push(canonical_id(&module_id.into()));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = ModuleDescriptor::new("SHIELD");
        assert_eq!(descriptor.id(), "SHIELD");
        assert_eq!(descriptor.name(), "SHIELD");
        assert_eq!(descriptor.priority(), DEFAULT_PRIORITY);
        assert!(!descriptor.is_optional());
        assert!(descriptor.dependencies().is_empty());
    }

    #[test]
    fn test_ids_are_canonical() {
        let descriptor = ModuleDescriptor::new("yellow_shield").with_dependency(" energy_core ");
        assert_eq!(descriptor.id(), "YELLOW_SHIELD");
        assert_eq!(descriptor.name(), "yellow_shield");
        assert_eq!(descriptor.dependencies(), ["ENERGY_CORE".to_string()]);
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ModuleDescriptor::new("JETPACK")
            .with_name("Jetpack")
            .with_version("2.1.0")
            .with_description("Short bursts of flight")
            .with_author("Engineering")
            .with_dependency("ENERGY_CORE")
            .with_priority(10)
            .optional()
            .with_property("max_fuel", json!(400));

        assert_eq!(descriptor.name(), "Jetpack");
        assert_eq!(descriptor.version(), "2.1.0");
        assert_eq!(descriptor.authors(), ["Engineering".to_string()]);
        assert_eq!(descriptor.dependencies(), ["ENERGY_CORE".to_string()]);
        assert_eq!(descriptor.priority(), 10);
        assert!(descriptor.is_optional());
        assert_eq!(descriptor.property("max_fuel"), Some(&json!(400)));
    }
}
