//! JSON:API document value types and their wire form.
//!
//! These are the immutable results of assembling a model and the first stage
//! of parsing a wire document. Rendering needs the configuration because
//! links are policed and encoded on the way out.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::links::{parse_links, render_links, Links};
use crate::types::{json_type_name, JsonApiConfiguration};

/// The supported JSON:API version.
pub const JSON_API_VERSION: &str = "1.1";

/// The top level `jsonapi` member.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonApiObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ext: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl JsonApiObject {
    /// Create a `jsonapi` object, with `"version": "1.1"` when `show_version` is set.
    pub fn new(show_version: bool) -> Self {
        Self {
            version: show_version.then(|| JSON_API_VERSION.to_string()),
            ..Self::default()
        }
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext.push(ext.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile.push(profile.into());
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    fn to_value(&self) -> Value {
        let mut result = Map::new();
        insert_string(&mut result, "version", &self.version);
        if !self.ext.is_empty() {
            result.insert("ext".to_string(), Value::from(self.ext.clone()));
        }
        if !self.profile.is_empty() {
            result.insert("profile".to_string(), Value::from(self.profile.clone()));
        }
        if let Some(meta) = &self.meta {
            result.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        Value::Object(result)
    }
}

/// A resource identifier object: `{ "id": ..., "type": ..., "meta": ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceIdentifier {
    pub id: String,
    pub resource_type: String,
    pub meta: Option<Map<String, Value>>,
}

impl ResourceIdentifier {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    fn to_value(&self) -> Value {
        let mut result = Map::new();
        result.insert("id".to_string(), Value::String(self.id.clone()));
        result.insert("type".to_string(), Value::String(self.resource_type.clone()));
        if let Some(meta) = &self.meta {
            result.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        Value::Object(result)
    }
}

/// Relationship `data` as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Linkage {
    /// No `data` member.
    #[default]
    Absent,
    /// `"data": null`
    Null,
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

impl Linkage {
    /// Identifiers referenced by this linkage, in order.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Linkage::Absent | Linkage::Null => Vec::new(),
            Linkage::One(identifier) => vec![identifier],
            Linkage::Many(identifiers) => identifiers.iter().collect(),
        }
    }
}

/// A relationship object: `{ "data": ..., "links": ..., "meta": ... }`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationshipObject {
    pub data: Linkage,
    pub links: Links,
    pub meta: Map<String, Value>,
}

/// A resource object (`JsonApiData`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceObject {
    /// `None` for resources not yet persisted.
    pub id: Option<String>,
    pub resource_type: String,
    pub attributes: Map<String, Value>,
    pub relationships: IndexMap<String, RelationshipObject>,
    pub links: Links,
    pub meta: Map<String, Value>,
}

impl ResourceObject {
    pub fn new(id: Option<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id,
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// The `(id, type)` pair used for deduplication, if the resource has an id.
    pub fn identity(&self) -> Option<(&str, &str)> {
        self.id
            .as_deref()
            .map(|id| (id, self.resource_type.as_str()))
    }
}

/// Primary data of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    /// `"data": null`
    Null,
    Single(Box<ResourceObject>),
    Many(Vec<ResourceObject>),
}

impl PrimaryData {
    pub fn resources(&self) -> Vec<&ResourceObject> {
        match self {
            PrimaryData::Null => Vec::new(),
            PrimaryData::Single(resource) => vec![resource.as_ref()],
            PrimaryData::Many(resources) => resources.iter().collect(),
        }
    }

    pub fn resources_mut(&mut self) -> Vec<&mut ResourceObject> {
        match self {
            PrimaryData::Null => Vec::new(),
            PrimaryData::Single(resource) => vec![resource.as_mut()],
            PrimaryData::Many(resources) => resources.iter_mut().collect(),
        }
    }
}

/// Links member of an error object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

/// Source member of an error object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A single JSON:API error object.
///
/// ```
/// use jsonapi_codec::ErrorObject;
///
/// let error = ErrorObject::new()
///     .with_status("422")
///     .with_title("Invalid Attribute")
///     .with_source_pointer("/data/attributes/title");
/// assert_eq!(error.source.unwrap().pointer.as_deref(), Some("/data/attributes/title"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ErrorLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl ErrorObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_about_link(mut self, about: impl Into<String>) -> Self {
        self.links = Some(ErrorLinks {
            about: Some(about.into()),
        });
        self
    }

    /// Set `source.pointer`, keeping an existing `source.parameter`.
    pub fn with_source_pointer(mut self, pointer: impl Into<String>) -> Self {
        let source = self.source.get_or_insert_with(ErrorSource::default);
        source.pointer = Some(pointer.into());
        self
    }

    /// Set `source.parameter`, keeping an existing `source.pointer`.
    pub fn with_source_parameter(mut self, parameter: impl Into<String>) -> Self {
        let source = self.source.get_or_insert_with(ErrorSource::default);
        source.parameter = Some(parameter.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut result = Map::new();
        insert_string(&mut result, "id", &self.id);
        if let Some(links) = &self.links {
            let mut rendered = Map::new();
            insert_string(&mut rendered, "about", &links.about);
            result.insert("links".to_string(), Value::Object(rendered));
        }
        insert_string(&mut result, "status", &self.status);
        insert_string(&mut result, "code", &self.code);
        insert_string(&mut result, "title", &self.title);
        insert_string(&mut result, "detail", &self.detail);
        if let Some(source) = &self.source {
            let mut rendered = Map::new();
            insert_string(&mut rendered, "pointer", &source.pointer);
            insert_string(&mut rendered, "parameter", &source.parameter);
            result.insert("source".to_string(), Value::Object(rendered));
        }
        if let Some(meta) = &self.meta {
            result.insert("meta".to_string(), Value::Object(meta.clone()));
        }
        Value::Object(result)
    }
}

fn insert_string(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::String(value.clone()));
    }
}

/// A list of errors, rendered as an errors document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonApiErrors {
    pub errors: Vec<ErrorObject>,
}

impl JsonApiErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, error: ErrorObject) -> Self {
        self.errors.push(error);
        self
    }

    pub fn into_document(self) -> JsonApiDocument {
        JsonApiDocument {
            errors: self.errors,
            ..JsonApiDocument::default()
        }
    }
}

impl From<ErrorObject> for JsonApiErrors {
    fn from(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// A complete JSON:API document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonApiDocument {
    pub jsonapi: Option<JsonApiObject>,
    /// `None` when the document has no `data` member.
    pub data: Option<PrimaryData>,
    pub included: Vec<ResourceObject>,
    pub links: Links,
    pub meta: Map<String, Value>,
    pub errors: Vec<ErrorObject>,
}

impl JsonApiDocument {
    /// Render the document as JSON.
    ///
    /// Empty members are omitted. Links are encoded per configuration; placement
    /// and compliance filtering happen earlier, during assembly.
    pub fn to_value(&self, config: &JsonApiConfiguration) -> Value {
        let mut result = Map::new();

        if let Some(jsonapi) = &self.jsonapi {
            result.insert("jsonapi".to_string(), jsonapi.to_value());
        }

        if let Some(data) = &self.data {
            let rendered = match data {
                PrimaryData::Null => Value::Null,
                PrimaryData::Single(resource) => render_resource(resource, config),
                PrimaryData::Many(resources) => Value::Array(
                    resources
                        .iter()
                        .map(|r| render_resource(r, config))
                        .collect(),
                ),
            };
            result.insert("data".to_string(), rendered);
        }

        if !self.included.is_empty() {
            let included = self
                .included
                .iter()
                .map(|r| render_resource(r, config))
                .collect();
            result.insert("included".to_string(), Value::Array(included));
        }

        if !self.links.is_empty() {
            result.insert("links".to_string(), render_links(&self.links, config));
        }

        if !self.meta.is_empty() {
            result.insert("meta".to_string(), Value::Object(self.meta.clone()));
        }

        if !self.errors.is_empty() {
            let errors = self
                .errors
                .iter()
                .map(ErrorObject::to_value)
                .collect();
            result.insert("errors".to_string(), Value::Array(errors));
        }

        Value::Object(result)
    }

    /// Parse a wire document.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidDocument` for shape violations (including
    /// `data` together with `errors`) and `CodecError::MalformedRelationship`
    /// when relationship linkage is not null, an identifier object or an array.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let Some(map) = value.as_object() else {
            return Err(CodecError::invalid_document(format!(
                "document must be an object, got {}",
                json_type_name(value)
            )));
        };

        if map.contains_key("data") && map.contains_key("errors") {
            return Err(CodecError::invalid_document(
                "members data and errors must not coexist",
            ));
        }

        let mut document = JsonApiDocument::default();

        if let Some(jsonapi) = map.get("jsonapi") {
            document.jsonapi = Some(serde_json::from_value(jsonapi.clone())?);
        }

        if let Some(data) = map.get("data") {
            document.data = Some(match data {
                Value::Null => PrimaryData::Null,
                Value::Object(_) => PrimaryData::Single(Box::new(parse_resource(data, "/data")?)),
                Value::Array(items) => PrimaryData::Many(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| parse_resource(item, &format!("/data/{}", i)))
                        .collect::<Result<_, _>>()?,
                ),
                other => {
                    return Err(CodecError::invalid_document(format!(
                        "data must be null, an object or an array, got {}",
                        json_type_name(other)
                    )))
                }
            });
        }

        if let Some(included) = map.get("included") {
            let Some(items) = included.as_array() else {
                return Err(CodecError::invalid_document("included must be an array"));
            };
            for (i, item) in items.iter().enumerate() {
                document
                    .included
                    .push(parse_resource(item, &format!("/included/{}", i))?);
            }
        }

        if let Some(links) = map.get("links") {
            document.links = parse_links(links)?;
        }

        document.meta = parse_meta(map.get("meta"), "/meta")?;

        if let Some(errors) = map.get("errors") {
            document.errors = serde_json::from_value(errors.clone())?;
        }

        Ok(document)
    }
}

/// Render a single resource object.
pub fn render_resource(resource: &ResourceObject, config: &JsonApiConfiguration) -> Value {
    let mut result = Map::new();
    if let Some(id) = &resource.id {
        result.insert("id".to_string(), Value::String(id.clone()));
    }
    result.insert(
        "type".to_string(),
        Value::String(resource.resource_type.clone()),
    );

    if !resource.attributes.is_empty() || config.empty_attributes_object_serialized {
        result.insert(
            "attributes".to_string(),
            Value::Object(resource.attributes.clone()),
        );
    }

    if !resource.relationships.is_empty() {
        let mut relationships = Map::new();
        for (name, relationship) in &resource.relationships {
            relationships.insert(name.clone(), render_relationship(relationship, config));
        }
        result.insert("relationships".to_string(), Value::Object(relationships));
    }

    if !resource.links.is_empty() {
        result.insert("links".to_string(), render_links(&resource.links, config));
    }

    if !resource.meta.is_empty() {
        result.insert("meta".to_string(), Value::Object(resource.meta.clone()));
    }

    Value::Object(result)
}

/// Render a relationship object. `Linkage::Absent` omits `data`.
pub fn render_relationship(relationship: &RelationshipObject, config: &JsonApiConfiguration) -> Value {
    let mut result = Map::new();
    match &relationship.data {
        Linkage::Absent => {}
        Linkage::Null => {
            result.insert("data".to_string(), Value::Null);
        }
        Linkage::One(identifier) => {
            result.insert("data".to_string(), identifier.to_value());
        }
        Linkage::Many(identifiers) => {
            let data = identifiers.iter().map(ResourceIdentifier::to_value).collect();
            result.insert("data".to_string(), Value::Array(data));
        }
    }
    if !relationship.links.is_empty() {
        result.insert("links".to_string(), render_links(&relationship.links, config));
    }
    if !relationship.meta.is_empty() {
        result.insert("meta".to_string(), Value::Object(relationship.meta.clone()));
    }
    Value::Object(result)
}

fn parse_meta(value: Option<&Value>, path: &str) -> Result<Map<String, Value>, CodecError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(meta)) => Ok(meta.clone()),
        Some(other) => Err(CodecError::invalid_document(format!(
            "{} must be an object, got {}",
            path,
            json_type_name(other)
        ))),
    }
}

/// Read an id that may have been rendered as a number.
fn parse_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_resource(value: &Value, path: &str) -> Result<ResourceObject, CodecError> {
    let Some(map) = value.as_object() else {
        return Err(CodecError::invalid_document(format!(
            "{} must be a resource object, got {}",
            path,
            json_type_name(value)
        )));
    };

    let resource_type = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::invalid_document(format!("{} has no type", path)))?;

    let mut resource = ResourceObject::new(parse_id(map.get("id")), resource_type);
    resource.attributes = parse_meta(map.get("attributes"), &format!("{}/attributes", path))?;
    resource.meta = parse_meta(map.get("meta"), &format!("{}/meta", path))?;

    if let Some(links) = map.get("links") {
        resource.links = parse_links(links)?;
    }

    match map.get("relationships") {
        None | Some(Value::Null) => {}
        Some(Value::Object(relationships)) => {
            for (name, relationship) in relationships {
                resource
                    .relationships
                    .insert(name.clone(), parse_relationship(name, relationship)?);
            }
        }
        Some(other) => {
            return Err(CodecError::invalid_document(format!(
                "{}/relationships must be an object, got {}",
                path,
                json_type_name(other)
            )))
        }
    }

    Ok(resource)
}

/// Parse a relationship object.
///
/// # Errors
///
/// Returns `CodecError::MalformedRelationship` if the relationship or its
/// linkage has an unexpected shape.
pub fn parse_relationship(name: &str, value: &Value) -> Result<RelationshipObject, CodecError> {
    let malformed = |message: String| CodecError::MalformedRelationship {
        name: name.to_string(),
        message,
    };

    let Some(map) = value.as_object() else {
        return Err(malformed(format!(
            "expected relationship object, got {}",
            json_type_name(value)
        )));
    };

    let data = match map.get("data") {
        None => Linkage::Absent,
        Some(Value::Null) => Linkage::Null,
        Some(object @ Value::Object(_)) => Linkage::One(parse_identifier(object).map_err(malformed)?),
        Some(Value::Array(items)) => Linkage::Many(
            items
                .iter()
                .map(parse_identifier)
                .collect::<Result<_, _>>()
                .map_err(malformed)?,
        ),
        Some(other) => {
            return Err(malformed(format!(
                "data must be null, an object or an array, got {}",
                json_type_name(other)
            )))
        }
    };

    let links = match map.get("links") {
        Some(links) => parse_links(links)?,
        None => Links::new(),
    };

    let meta = match map.get("meta") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(meta)) => meta.clone(),
        Some(other) => {
            return Err(malformed(format!(
                "meta must be an object, got {}",
                json_type_name(other)
            )))
        }
    };

    Ok(RelationshipObject { data, links, meta })
}

fn parse_identifier(value: &Value) -> Result<ResourceIdentifier, String> {
    let Some(map) = value.as_object() else {
        return Err(format!(
            "expected resource identifier, got {}",
            json_type_name(value)
        ));
    };
    let id = parse_id(map.get("id")).ok_or_else(|| "resource identifier has no id".to_string())?;
    let resource_type = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "resource identifier has no type".to_string())?;

    let mut identifier = ResourceIdentifier::new(id, resource_type);
    if let Some(Value::Object(meta)) = map.get("meta") {
        identifier.meta = Some(meta.clone());
    }
    Ok(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> JsonApiConfiguration {
        JsonApiConfiguration::default()
    }

    #[test]
    fn render_minimal_resource_document() {
        let mut resource = ResourceObject::new(Some("1".into()), "movies");
        resource
            .attributes
            .insert("title".into(), json!("Star Wars"));
        let document = JsonApiDocument {
            data: Some(PrimaryData::Single(Box::new(resource))),
            ..JsonApiDocument::default()
        };

        assert_eq!(
            document.to_value(&config()),
            json!({ "data": { "id": "1", "type": "movies", "attributes": { "title": "Star Wars" } } })
        );
    }

    #[test]
    fn empty_attributes_follow_configuration() {
        let resource = ResourceObject::new(Some("1".into()), "movies");
        assert_eq!(
            render_resource(&resource, &config()),
            json!({ "id": "1", "type": "movies", "attributes": {} })
        );

        let config = config().with_empty_attributes_object_serialized(false);
        assert_eq!(
            render_resource(&resource, &config),
            json!({ "id": "1", "type": "movies" })
        );
    }

    #[test]
    fn explicit_empty_linkage_is_rendered() {
        let null = RelationshipObject {
            data: Linkage::Null,
            ..RelationshipObject::default()
        };
        assert_eq!(render_relationship(&null, &config()), json!({ "data": null }));

        let empty = RelationshipObject {
            data: Linkage::Many(Vec::new()),
            ..RelationshipObject::default()
        };
        assert_eq!(render_relationship(&empty, &config()), json!({ "data": [] }));

        let absent = RelationshipObject::default();
        assert_eq!(render_relationship(&absent, &config()), json!({}));
    }

    #[test]
    fn parse_rejects_data_with_errors() {
        let result = JsonApiDocument::from_value(&json!({ "data": null, "errors": [] }));
        assert!(matches!(result, Err(CodecError::InvalidDocument { .. })));
    }

    #[test]
    fn parse_rejects_resource_without_type() {
        let result = JsonApiDocument::from_value(&json!({ "data": { "id": "1" } }));
        assert!(matches!(result, Err(CodecError::InvalidDocument { .. })));
    }

    #[test]
    fn parse_numeric_id_as_string() {
        let document =
            JsonApiDocument::from_value(&json!({ "data": { "id": 7, "type": "movies" } })).unwrap();
        let resources = document.data.as_ref().unwrap().resources();
        assert_eq!(resources[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn parse_relationship_shapes() {
        let one = parse_relationship("director", &json!({ "data": { "id": "3", "type": "directors" } })).unwrap();
        assert_eq!(one.data, Linkage::One(ResourceIdentifier::new("3", "directors")));

        let many = parse_relationship("directors", &json!({ "data": [] })).unwrap();
        assert_eq!(many.data, Linkage::Many(Vec::new()));

        let null = parse_relationship("director", &json!({ "data": null })).unwrap();
        assert_eq!(null.data, Linkage::Null);

        let absent = parse_relationship("director", &json!({ "links": { "related": "http://x" } })).unwrap();
        assert_eq!(absent.data, Linkage::Absent);
    }

    #[test]
    fn parse_malformed_relationship() {
        let result = parse_relationship("director", &json!({ "data": "3" }));
        assert!(matches!(
            result,
            Err(CodecError::MalformedRelationship { name, .. }) if name == "director"
        ));

        let result = parse_relationship("director", &json!({ "data": { "id": "3" } }));
        assert!(matches!(result, Err(CodecError::MalformedRelationship { .. })));
    }

    #[test]
    fn errors_document() {
        let document = JsonApiErrors::new()
            .with_error(
                ErrorObject::new()
                    .with_status("404")
                    .with_title("Not Found")
                    .with_about_link("http://localhost/errors/404"),
            )
            .into_document();

        assert_eq!(
            document.to_value(&config()),
            json!({
                "errors": [{
                    "links": { "about": "http://localhost/errors/404" },
                    "status": "404",
                    "title": "Not Found"
                }]
            })
        );
    }

    #[test]
    fn error_source_keeps_both_members() {
        let error = ErrorObject::new()
            .with_source_parameter("page[size]")
            .with_source_pointer("/data");
        let source = error.source.unwrap();
        assert_eq!(source.pointer.as_deref(), Some("/data"));
        assert_eq!(source.parameter.as_deref(), Some("page[size]"));
    }

    #[test]
    fn error_rendering_keeps_every_member() {
        let error = ErrorObject::new()
            .with_id("e1")
            .with_status("422")
            .with_code("invalid")
            .with_title("Invalid Attribute")
            .with_detail("title must not be blank")
            .with_about_link("http://localhost/errors/422")
            .with_source_pointer("/data/attributes/title")
            .with_source_parameter("filter")
            .with_meta(Map::from_iter([("field".to_string(), json!("title"))]));
        let jsonapi = JsonApiObject::new(true)
            .with_ext("https://jsonapi.org/ext/atomic")
            .with_meta(Map::from_iter([("server".to_string(), json!("movies"))]));
        let document = JsonApiDocument {
            jsonapi: Some(jsonapi.clone()),
            errors: vec![error.clone()],
            ..JsonApiDocument::default()
        };

        let rendered = document.to_value(&config());
        assert_eq!(rendered["errors"][0], serde_json::to_value(&error).unwrap());
        assert_eq!(rendered["jsonapi"], serde_json::to_value(&jsonapi).unwrap());
        assert_eq!(rendered["errors"][0]["source"]["parameter"], json!("filter"));
    }

    #[test]
    fn jsonapi_object_rendering() {
        let document = JsonApiDocument {
            jsonapi: Some(JsonApiObject::new(true).with_profile("http://example.com/profile")),
            meta: Map::from_iter([("count".to_string(), json!(0))]),
            ..JsonApiDocument::default()
        };
        assert_eq!(
            document.to_value(&config()),
            json!({
                "jsonapi": { "version": "1.1", "profile": ["http://example.com/profile"] },
                "meta": { "count": 0 }
            })
        );
    }
}
