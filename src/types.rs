//! Core types and configuration for JSON:API rendering.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::JsonApiObject;
use crate::error::CodecError;

/// IANA link relation names used by the codec.
pub mod rel {
    pub const SELF: &str = "self";
    pub const RELATED: &str = "related";
    pub const DESCRIBEDBY: &str = "describedby";
    pub const FIRST: &str = "first";
    pub const LAST: &str = "last";
    pub const PREV: &str = "prev";
    pub const NEXT: &str = "next";
    pub const ABOUT: &str = "about";
}

/// Link relations JSON:API allows at document level.
pub const DOCUMENT_LEVEL_RELATIONS: &[&str] = &[
    rel::SELF,
    rel::RELATED,
    rel::DESCRIBEDBY,
    rel::FIRST,
    rel::LAST,
    rel::PREV,
    rel::NEXT,
];

/// Link relations JSON:API allows at resource level.
pub const RESOURCE_LEVEL_RELATIONS: &[&str] = &[rel::SELF];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pluralize an English noun.
///
/// `-y` after a consonant becomes `-ies`, words ending in `s`, `x`, `z`, `ch`
/// or `sh` get `es`, everything else gets `s`.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    if lower.ends_with('y') {
        let stem = &word[..word.len() - 1];
        let before_y = stem.chars().last();
        let vowel = matches!(before_y, Some(c) if "aeiouAEIOU".contains(c));
        if !vowel && !stem.is_empty() {
            let ies = if word.ends_with('Y') { "IES" } else { "ies" };
            return format!("{}{}", stem, ies);
        }
    }

    let es = ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix));
    if es {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}

/// How link affordances are rendered into link `meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffordanceRendering {
    /// Affordances are not rendered.
    #[default]
    None,
    /// Rendered as a list under `meta.affordances`.
    Proprietary,
    /// Rendered as HAL-FORMS templates under `meta["hal-forms-templates"]`.
    HalForms,
}

/// JSON:API specific configuration.
///
/// Loaded once and shared read-only by every codec call. All `with_*` methods
/// consume and return the configuration so it can be built fluently:
///
/// ```
/// use jsonapi_codec::JsonApiConfiguration;
///
/// let config = JsonApiConfiguration::default()
///     .with_pluralized_type_rendered(false)
///     .with_type_for_class("Movie", "film");
/// assert_eq!(config.type_for_class("Movie"), Some("film"));
/// assert_eq!(config.class_for_type("film"), Some("Movie"));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonApiConfiguration {
    /// Render types in plural form ("movies" instead of "movie").
    pub pluralized_type_rendered: bool,
    /// Render types lower cased.
    pub lower_cased_type_rendered: bool,
    /// The top level `jsonapi` member, rendered when set.
    pub json_api_object: Option<JsonApiObject>,
    /// Create `meta.page` automatically for paged models.
    pub page_meta_automatically_created: bool,
    /// Create first/prev/next/last links automatically for paged models with a self link.
    pub pagination_links_automatically_created: bool,
    /// Request parameter for the page number in pagination links.
    pub page_number_request_parameter: String,
    /// Request parameter for the page size in pagination links.
    pub page_size_request_parameter: String,
    /// Use the class<->type registry to pick the concrete class when deserializing.
    pub type_for_class_used_for_deserialization: bool,
    pub affordances_rendered_as_link_meta: AffordanceRendering,
    /// Render `"attributes": {}` when a resource has no attributes.
    pub empty_attributes_object_serialized: bool,
    /// Resources whose id equals this value are rendered without an `id`.
    pub json_api_id_not_serialized_for_value: Option<String>,
    /// Keep `title`, `type` and `hreflang` out of link `meta` (JSON:API 1.1 link objects).
    pub json_api11_link_properties_removed_from_link_meta: bool,
    /// Drop link relations that JSON:API does not allow at the given level.
    pub json_api_compliant_links: bool,
    /// Link relations whose href is rendered without percent-encoding.
    pub links_not_url_encoded: BTreeSet<String>,
    /// Render the links of a single resource document at resource level.
    pub links_as_resource_level_links: bool,
    /// Class name to JSON:API type.
    pub type_for_class: IndexMap<String, String>,
}

impl Default for JsonApiConfiguration {
    fn default() -> Self {
        Self {
            pluralized_type_rendered: true,
            lower_cased_type_rendered: true,
            json_api_object: None,
            page_meta_automatically_created: true,
            pagination_links_automatically_created: true,
            page_number_request_parameter: "page[number]".to_string(),
            page_size_request_parameter: "page[size]".to_string(),
            type_for_class_used_for_deserialization: false,
            affordances_rendered_as_link_meta: AffordanceRendering::None,
            empty_attributes_object_serialized: true,
            json_api_id_not_serialized_for_value: None,
            json_api11_link_properties_removed_from_link_meta: true,
            json_api_compliant_links: true,
            links_not_url_encoded: BTreeSet::new(),
            links_as_resource_level_links: false,
            type_for_class: IndexMap::new(),
        }
    }
}

impl JsonApiConfiguration {
    /// Parse a configuration from JSON. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidConfiguration` if the text is not a valid configuration.
    pub fn from_json_str(content: &str) -> Result<Self, CodecError> {
        serde_json::from_str(content).map_err(|e| CodecError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::FileNotFound` or `CodecError::ReadError` for IO problems,
    /// `CodecError::InvalidConfiguration` if the file content is invalid.
    pub fn load(path: &Path) -> Result<Self, CodecError> {
        if !path.exists() {
            return Err(CodecError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| CodecError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn with_pluralized_type_rendered(mut self, value: bool) -> Self {
        self.pluralized_type_rendered = value;
        self
    }

    pub fn with_lower_cased_type_rendered(mut self, value: bool) -> Self {
        self.lower_cased_type_rendered = value;
        self
    }

    pub fn with_json_api_object(mut self, value: JsonApiObject) -> Self {
        self.json_api_object = Some(value);
        self
    }

    pub fn with_page_meta_automatically_created(mut self, value: bool) -> Self {
        self.page_meta_automatically_created = value;
        self
    }

    pub fn with_pagination_links_automatically_created(mut self, value: bool) -> Self {
        self.pagination_links_automatically_created = value;
        self
    }

    pub fn with_page_number_request_parameter(mut self, value: impl Into<String>) -> Self {
        self.page_number_request_parameter = value.into();
        self
    }

    pub fn with_page_size_request_parameter(mut self, value: impl Into<String>) -> Self {
        self.page_size_request_parameter = value.into();
        self
    }

    pub fn with_type_for_class_used_for_deserialization(mut self, value: bool) -> Self {
        self.type_for_class_used_for_deserialization = value;
        self
    }

    pub fn with_affordances_rendered_as_link_meta(mut self, value: AffordanceRendering) -> Self {
        self.affordances_rendered_as_link_meta = value;
        self
    }

    pub fn with_empty_attributes_object_serialized(mut self, value: bool) -> Self {
        self.empty_attributes_object_serialized = value;
        self
    }

    pub fn with_json_api_id_not_serialized_for_value(mut self, value: impl Into<String>) -> Self {
        self.json_api_id_not_serialized_for_value = Some(value.into());
        self
    }

    pub fn with_json_api11_link_properties_removed_from_link_meta(mut self, value: bool) -> Self {
        self.json_api11_link_properties_removed_from_link_meta = value;
        self
    }

    pub fn with_json_api_compliant_links(mut self, value: bool) -> Self {
        self.json_api_compliant_links = value;
        self
    }

    /// Exempt a link relation from percent-encoding.
    pub fn with_link_not_url_encoded(mut self, relation: impl Into<String>) -> Self {
        self.links_not_url_encoded.insert(relation.into());
        self
    }

    pub fn with_links_as_resource_level_links(mut self, value: bool) -> Self {
        self.links_as_resource_level_links = value;
        self
    }

    /// Register a class name <-> JSON:API type pair.
    pub fn with_type_for_class(mut self, class: impl Into<String>, json_api_type: impl Into<String>) -> Self {
        self.type_for_class.insert(class.into(), json_api_type.into());
        self
    }

    /// Returns the registered JSON:API type for a class name.
    pub fn type_for_class(&self, class: &str) -> Option<&str> {
        self.type_for_class.get(class).map(String::as_str)
    }

    /// Returns the class name registered for a JSON:API type.
    pub fn class_for_type(&self, json_api_type: &str) -> Option<&str> {
        self.type_for_class
            .iter()
            .find(|(_, t)| t.as_str() == json_api_type)
            .map(|(class, _)| class.as_str())
    }

    /// Whether hrefs of this relation are percent-encoded when rendered.
    pub fn is_url_encoded(&self, relation: &str) -> bool {
        !self.links_not_url_encoded.contains(relation)
    }
}
