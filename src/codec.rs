//! The JSON:API codec.
//!
//! Serialization turns a [`JsonApiModel`] into a [`JsonApiDocument`] and then
//! into JSON:
//!
//! 1. resolve identity, attributes and meta of every resource
//! 2. apply added relationships on top of relationship fields and validate them
//! 3. apply sparse fieldsets
//! 4. deduplicate `included`
//! 5. add page meta and pagination links for paged models
//! 6. police link placement
//!
//! Deserialization parses the wire text into a [`JsonApiDocument`] and rebuilds
//! domain objects through serde, resolving relationship data against
//! `included`.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::assembler::JsonApiModel;
use crate::document::{JsonApiDocument, Linkage, PrimaryData, ResourceIdentifier, ResourceObject};
use crate::error::CodecError;
use crate::fieldset::SparseFieldsets;
use crate::identity::{
    derive_type_name, extract_attributes, resolve_type, set_field, IdentityField, RelationshipField,
    Resource, ResourceDescriptor, ID_LITERAL,
};
use crate::included::IncludedResources;
use crate::links::Links;
use crate::model::{EntityModel, Model, PageMetadata};
use crate::pagination::{link_base, page_links, page_meta, PAGE_META_KEY};
use crate::policy::{LinksPolicy, NonCompliantLink};
use crate::relationship::{Member, Relationship, RelationshipOp};
use crate::types::{json_type_name, rel, JsonApiConfiguration};

/// A rendered document together with the links the policy dropped.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub document: JsonApiDocument,
    pub dropped_links: Vec<NonCompliantLink>,
}

/// A deserialized single resource document.
#[derive(Debug, Clone)]
pub struct DecodedEntity<T> {
    pub content: T,
    /// Resource links followed by document links.
    pub links: Links,
    pub meta: Map<String, Value>,
}

/// A deserialized collection document.
#[derive(Debug, Clone)]
pub struct DecodedCollection<T> {
    pub content: Vec<T>,
    pub links: Links,
    pub meta: Map<String, Value>,
    /// Read from `meta.page` when present.
    pub page: Option<PageMetadata>,
}

/// Encoder and decoder for JSON:API documents.
///
/// The codec owns an immutable configuration and keeps no state between
/// calls, so one instance can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct JsonApiCodec {
    config: JsonApiConfiguration,
}

type IncludedIndex<'a> = HashMap<(&'a str, &'a str), &'a ResourceObject>;

impl JsonApiCodec {
    pub fn new(config: JsonApiConfiguration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JsonApiConfiguration {
        &self.config
    }

    // === Serialization ===

    /// Turn a model into a document, reporting dropped links.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MissingIdentifier` if a rendered resource has no id,
    /// `CodecError::InvalidRelationship` if a relationship is invalid or its
    /// data cannot be identified and `CodecError::MalformedRelationship` if a
    /// relationship field holds something other than objects or ids.
    pub fn assemble(&self, model: &JsonApiModel) -> Result<Assembled, CodecError> {
        let policy = LinksPolicy::new(&self.config);
        let mut dropped = Vec::new();
        let mut links = model.links.clone();
        let mut meta = Map::new();

        let mut document = JsonApiDocument {
            jsonapi: self.config.json_api_object.clone(),
            ..JsonApiDocument::default()
        };

        match &model.model {
            None | Some(Model::Representation { .. }) => {}
            Some(Model::Single(entity)) => {
                let mut resource =
                    self.resource_object(entity, Some(&model.relationships), &model.fields, &mut dropped)?;
                if self.config.links_as_resource_level_links {
                    let links = std::mem::take(&mut links);
                    dropped.extend(policy.place_at_resource_level(&mut resource, links));
                }
                document.data = Some(PrimaryData::Single(Box::new(resource)));
            }
            Some(Model::Collection { content, .. }) => {
                document.data = Some(PrimaryData::Many(self.resource_objects(
                    content,
                    &model.fields,
                    &mut dropped,
                )?));
            }
            Some(Model::Paged { content, page, .. }) => {
                document.data = Some(PrimaryData::Many(self.resource_objects(
                    content,
                    &model.fields,
                    &mut dropped,
                )?));
                if let Some(page) = page {
                    if self.config.page_meta_automatically_created {
                        meta.insert(PAGE_META_KEY.to_string(), page_meta(page));
                    }
                    if self.config.pagination_links_automatically_created {
                        self.add_automatic_page_links(&mut links, page);
                    }
                }
            }
        }

        if !matches!(model.model, Some(Model::Single(_))) && !model.relationships.is_empty() {
            debug!(
                count = model.relationships.len(),
                "ignoring builder relationships without a single primary resource"
            );
        }

        let mut included = IncludedResources::new();
        for entity in &model.included {
            included.add(self.resource_object(entity, None, &model.fields, &mut dropped)?);
        }
        document.included = included.into_vec();

        dropped.extend(policy.place_at_document_level(&mut document, links));

        for (key, value) in &model.meta {
            meta.insert(key.clone(), value.clone());
        }
        document.meta = meta;

        Ok(Assembled {
            document,
            dropped_links: dropped,
        })
    }

    /// # Errors
    ///
    /// See [`JsonApiCodec::assemble`].
    pub fn to_document(&self, model: &JsonApiModel) -> Result<JsonApiDocument, CodecError> {
        Ok(self.assemble(model)?.document)
    }

    /// # Errors
    ///
    /// See [`JsonApiCodec::assemble`].
    pub fn to_value(&self, model: &JsonApiModel) -> Result<Value, CodecError> {
        Ok(self.render(&self.to_document(model)?))
    }

    /// # Errors
    ///
    /// See [`JsonApiCodec::assemble`].
    pub fn to_string(&self, model: &JsonApiModel) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&self.to_value(model)?)?)
    }

    /// # Errors
    ///
    /// See [`JsonApiCodec::assemble`].
    pub fn to_string_pretty(&self, model: &JsonApiModel) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(&self.to_value(model)?)?)
    }

    /// Serialize a single domain object as a document.
    ///
    /// # Errors
    ///
    /// See [`EntityModel::of`] and [`JsonApiCodec::assemble`].
    pub fn serialize<T: Resource + Serialize>(&self, entity: &T) -> Result<String, CodecError> {
        self.to_string(&JsonApiModel::from(Model::entity(entity)?))
    }

    /// Render a document with this codec's link encoding.
    pub fn render(&self, document: &JsonApiDocument) -> Value {
        document.to_value(&self.config)
    }

    /// Apply included deduplication and link compliance to a parsed document.
    pub fn normalize(&self, mut document: JsonApiDocument) -> Assembled {
        let policy = LinksPolicy::new(&self.config);
        let mut dropped = Vec::new();

        if document.jsonapi.is_none() {
            document.jsonapi = self.config.json_api_object.clone();
        }

        let links = std::mem::take(&mut document.links);
        dropped.extend(policy.place_at_document_level(&mut document, links));

        if let Some(data) = &mut document.data {
            for resource in data.resources_mut() {
                let links = std::mem::take(&mut resource.links);
                dropped.extend(policy.place_at_resource_level(resource, links));
            }
        }

        let mut included = IncludedResources::new();
        for mut resource in std::mem::take(&mut document.included) {
            let links = std::mem::take(&mut resource.links);
            dropped.extend(policy.place_at_resource_level(&mut resource, links));
            included.add(resource);
        }
        document.included = included.into_vec();

        Assembled {
            document,
            dropped_links: dropped,
        }
    }

    fn resource_objects(
        &self,
        entities: &[EntityModel],
        fields: &SparseFieldsets,
        dropped: &mut Vec<NonCompliantLink>,
    ) -> Result<Vec<ResourceObject>, CodecError> {
        entities
            .iter()
            .map(|entity| self.resource_object(entity, None, fields, dropped))
            .collect()
    }

    fn resource_object(
        &self,
        entity: &EntityModel,
        ops: Option<&IndexMap<String, Vec<RelationshipOp>>>,
        fields: &SparseFieldsets,
        dropped: &mut Vec<NonCompliantLink>,
    ) -> Result<ResourceObject, CodecError> {
        let id = entity.resolve_id()?;
        let json_api_type = entity.resolve_type(&self.config);
        let attributes = extract_attributes(&entity.fields, &entity.descriptor, Some(&id), &json_api_type);

        let rendered_id = match &self.config.json_api_id_not_serialized_for_value {
            Some(sentinel) if *sentinel == id.value => {
                debug!(class = %entity.descriptor.class_name, id = %id.value, "not rendering sentinel id");
                None
            }
            _ => Some(id.value),
        };

        let mut resource = ResourceObject::new(rendered_id, json_api_type.value);
        resource.attributes = fields.apply(&attributes, &resource.resource_type);
        resource.meta = entity.meta();

        let mut relationships = self.field_relationships(entity)?;
        for (name, relationship) in &entity.relationships {
            let slot = relationships.entry(name.clone()).or_default();
            let existing = std::mem::take(slot);
            *slot = existing.merge(relationship.clone());
        }
        for (name, ops) in ops.into_iter().flatten() {
            let slot = relationships.entry(name.clone()).or_default();
            let existing = std::mem::take(slot);
            *slot = ops.iter().cloned().fold(existing, Relationship::apply);
        }

        for (name, relationship) in relationships {
            if relationship.is_empty() {
                continue;
            }
            relationship
                .validate()
                .map_err(|reason| CodecError::InvalidRelationship {
                    name: name.clone(),
                    reason,
                })?;
            if !fields.includes_relationship(&resource.resource_type, &name) {
                debug!(
                    json_api_type = %resource.resource_type,
                    relationship = %name,
                    "relationship omitted by sparse fieldset"
                );
                continue;
            }
            let object = relationship.to_object(&self.config).map_err(|e| match e {
                CodecError::MissingIdentifier { .. } => CodecError::InvalidRelationship {
                    name: name.clone(),
                    reason: e.to_string(),
                },
                other => other,
            })?;
            resource.relationships.insert(name, object);
        }

        let policy = LinksPolicy::new(&self.config);
        dropped.extend(policy.place_at_resource_level(&mut resource, entity.links.clone()));

        Ok(resource)
    }

    /// Relationships declared as fields of the domain object.
    fn field_relationships(&self, entity: &EntityModel) -> Result<IndexMap<String, Relationship>, CodecError> {
        let mut relationships = IndexMap::new();
        for field in &entity.descriptor.relationships {
            let value = match entity.fields.get(&field.field) {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };
            let target = (field.target)();

            let relationship = if field.many {
                let Value::Array(items) = value else {
                    return Err(CodecError::MalformedRelationship {
                        name: field.name.clone(),
                        message: format!("to-many field holds {}", json_type_name(value)),
                    });
                };
                let members = items
                    .iter()
                    .map(|item| self.field_member(field, &target, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Relationship::of_collection(members)
            } else {
                Relationship::of(self.field_member(field, &target, value)?)
            };
            relationships.insert(field.name.clone(), relationship);
        }
        Ok(relationships)
    }

    /// A related object is either an embedded object or a bare id.
    fn field_member(
        &self,
        field: &RelationshipField,
        target: &ResourceDescriptor,
        value: &Value,
    ) -> Result<Member, CodecError> {
        match value {
            Value::Object(object) => {
                let mut descriptor = target.clone();
                if let Some(Value::String(class)) =
                    target.discriminator.as_ref().and_then(|d| object.get(d))
                {
                    descriptor.class_name = class.clone();
                }
                Ok(Member::from(EntityModel::from_parts(descriptor, object.clone())))
            }
            Value::String(_) | Value::Number(_) => {
                let id = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let json_api_type = resolve_type(&Map::new(), target, &self.config);
                Ok(Member::from(ResourceIdentifier::new(id, json_api_type.value)))
            }
            other => Err(CodecError::MalformedRelationship {
                name: field.name.clone(),
                message: format!("related value is {}", json_type_name(other)),
            }),
        }
    }

    fn add_automatic_page_links(&self, links: &mut Links, page: &PageMetadata) {
        let pagination = [rel::FIRST, rel::PREV, rel::NEXT, rel::LAST];
        if pagination.iter().any(|relation| links.has_link(relation)) {
            return;
        }
        let Some(self_link) = links.get(rel::SELF) else {
            return;
        };

        let number_param = &self.config.page_number_request_parameter;
        let size_param = &self.config.page_size_request_parameter;
        let base = link_base(&self_link.href, number_param, size_param);
        match page_links(&base, page, number_param, size_param) {
            Ok(page_links) => {
                for link in page_links {
                    links.push(link);
                }
            }
            Err(error) => debug!(%error, "skipping automatic pagination links"),
        }
    }

    // === Deserialization ===

    /// Parse wire text into a document.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidJson` for malformed JSON and the errors of
    /// [`JsonApiDocument::from_value`] for shape violations.
    pub fn parse_document(&self, json: &str) -> Result<JsonApiDocument, CodecError> {
        let value: Value = serde_json::from_str(json)?;
        JsonApiDocument::from_value(&value)
    }

    /// Deserialize a single resource document.
    ///
    /// # Errors
    ///
    /// See [`JsonApiCodec::entity_from_document`].
    pub fn deserialize_entity<T>(&self, json: &str) -> Result<DecodedEntity<T>, CodecError>
    where
        T: Resource + DeserializeOwned,
    {
        let document = self.parse_document(json)?;
        self.entity_from_document(&document)
    }

    /// Rebuild the primary resource of a document.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidDocument` if the primary data is not a single
    /// resource, `CodecError::TypeMismatch` if the resource type maps to a class
    /// the target cannot hold, `CodecError::MissingIdentifier` if the target
    /// requires an id the resource lacks, and `CodecError::InvalidJson` if serde
    /// rejects the resulting object.
    pub fn entity_from_document<T>(&self, document: &JsonApiDocument) -> Result<DecodedEntity<T>, CodecError>
    where
        T: Resource + DeserializeOwned,
    {
        let resource = match &document.data {
            Some(PrimaryData::Single(resource)) => resource,
            Some(PrimaryData::Many(_)) => {
                return Err(CodecError::invalid_document(
                    "expected a single resource, got an array",
                ))
            }
            Some(PrimaryData::Null) | None => {
                return Err(CodecError::invalid_document("document has no primary resource"))
            }
        };

        let index = included_index(&document.included);
        let content = self.decode::<T>(resource, &index)?;
        Ok(DecodedEntity {
            content,
            links: resource.links.clone().merge(document.links.clone()),
            meta: document.meta.clone(),
        })
    }

    /// Deserialize a collection document. A single resource yields one element.
    ///
    /// # Errors
    ///
    /// See [`JsonApiCodec::collection_from_document`].
    pub fn deserialize_collection<T>(&self, json: &str) -> Result<DecodedCollection<T>, CodecError>
    where
        T: Resource + DeserializeOwned,
    {
        let document = self.parse_document(json)?;
        self.collection_from_document(&document)
    }

    /// Rebuild all primary resources of a document.
    ///
    /// # Errors
    ///
    /// See [`JsonApiCodec::entity_from_document`].
    pub fn collection_from_document<T>(
        &self,
        document: &JsonApiDocument,
    ) -> Result<DecodedCollection<T>, CodecError>
    where
        T: Resource + DeserializeOwned,
    {
        let index = included_index(&document.included);
        let content = match &document.data {
            Some(data) => data
                .resources()
                .into_iter()
                .map(|resource| self.decode::<T>(resource, &index))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        let page = document
            .meta
            .get(PAGE_META_KEY)
            .and_then(|page| serde_json::from_value(page.clone()).ok());

        Ok(DecodedCollection {
            content,
            links: document.links.clone(),
            meta: document.meta.clone(),
            page,
        })
    }

    fn decode<T>(&self, resource: &ResourceObject, index: &IncludedIndex<'_>) -> Result<T, CodecError>
    where
        T: Resource + DeserializeOwned,
    {
        let descriptor = T::descriptor();
        let fields = self.resource_fields(resource, &descriptor, index, &mut Vec::new())?;
        if resource.id.is_some() {
            return Ok(serde_json::from_value(Value::Object(fields))?);
        }

        // An id-less resource fails with MissingIdentifier when the same
        // fields plus an id would have decoded.
        let source = match serde_json::from_value(Value::Object(fields.clone())) {
            Ok(content) => return Ok(content),
            Err(source) => source,
        };
        let id_field = descriptor
            .id_field
            .as_deref()
            .or(descriptor.primary_key_field.as_deref())
            .unwrap_or(ID_LITERAL);
        if !fields.contains_key(id_field) {
            let mut with_id = fields;
            with_id.insert(id_field.to_string(), descriptor.id_kind.placeholder());
            if serde_json::from_value::<T>(Value::Object(with_id)).is_ok() {
                return Err(CodecError::MissingIdentifier {
                    class: descriptor.class_name.clone(),
                });
            }
        }
        Err(CodecError::InvalidJson { source })
    }

    /// Build the serde representation of a resource for `declared`.
    ///
    /// `visiting` holds the identities on the current path; an included
    /// resource already on the path is not expanded again.
    fn resource_fields(
        &self,
        resource: &ResourceObject,
        declared: &ResourceDescriptor,
        index: &IncludedIndex<'_>,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<Map<String, Value>, CodecError> {
        let (descriptor, concrete_class) = self.concrete_descriptor(declared, &resource.resource_type)?;

        let mut fields = resource.attributes.clone();
        if let (Some(discriminator), Some(class)) = (&descriptor.discriminator, concrete_class) {
            fields.insert(discriminator.clone(), Value::String(class));
        }
        if let Some(id) = &resource.id {
            set_field(&mut fields, &descriptor, IdentityField::Id, id)?;
        }
        set_field(&mut fields, &descriptor, IdentityField::Type, &resource.resource_type)?;

        for name in &descriptor.meta_fields {
            if let Some(value) = resource.meta.get(name) {
                fields.insert(name.clone(), value.clone());
            }
        }

        let identity = resource
            .identity()
            .map(|(id, json_api_type)| (id.to_string(), json_api_type.to_string()));
        if let Some(identity) = &identity {
            visiting.push(identity.clone());
        }

        for field in &descriptor.relationships {
            let Some(relationship) = resource.relationships.get(&field.name) else {
                continue;
            };
            let target = (field.target)();
            let value = match &relationship.data {
                Linkage::Absent => continue,
                Linkage::Null if field.many => Value::Array(Vec::new()),
                Linkage::Null => Value::Null,
                Linkage::One(identifier) => {
                    let related = self.related_fields(identifier, &target, index, visiting)?;
                    if field.many {
                        Value::Array(vec![related])
                    } else {
                        related
                    }
                }
                Linkage::Many(identifiers) => {
                    let related = identifiers
                        .iter()
                        .map(|identifier| self.related_fields(identifier, &target, index, visiting))
                        .collect::<Result<Vec<_>, _>>()?;
                    if field.many {
                        Value::Array(related)
                    } else {
                        match related.as_slice() {
                            [] => Value::Null,
                            [single] => single.clone(),
                            _ => {
                                return Err(CodecError::MalformedRelationship {
                                    name: field.name.clone(),
                                    message: format!(
                                        "to-one relationship has {} elements",
                                        related.len()
                                    ),
                                })
                            }
                        }
                    }
                }
            };
            fields.insert(field.field.clone(), value);
        }

        if identity.is_some() {
            visiting.pop();
        }
        Ok(fields)
    }

    /// Related data, enriched from `included` when a matching resource exists.
    fn related_fields(
        &self,
        identifier: &ResourceIdentifier,
        target: &ResourceDescriptor,
        index: &IncludedIndex<'_>,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<Value, CodecError> {
        let key = (identifier.id.as_str(), identifier.resource_type.as_str());
        let on_path = visiting
            .iter()
            .any(|(id, json_api_type)| id == key.0 && json_api_type == key.1);

        let fields = match index.get(&key) {
            Some(included) if !on_path => self.resource_fields(included, target, index, visiting)?,
            _ => {
                let mut bare = ResourceObject::new(
                    Some(identifier.id.clone()),
                    identifier.resource_type.clone(),
                );
                bare.meta = identifier.meta.clone().unwrap_or_default();
                self.resource_fields(&bare, target, index, visiting)?
            }
        };
        Ok(Value::Object(fields))
    }

    /// Pick the class to build for a JSON:API type.
    ///
    /// With `type_for_class_used_for_deserialization` the class registry
    /// decides and the class must be assignable to `declared`. Otherwise a
    /// declared discriminator is filled by matching the derived types of the
    /// declared class and its subtypes.
    fn concrete_descriptor(
        &self,
        declared: &ResourceDescriptor,
        json_api_type: &str,
    ) -> Result<(ResourceDescriptor, Option<String>), CodecError> {
        if self.config.type_for_class_used_for_deserialization {
            if let Some(class) = self.config.class_for_type(json_api_type) {
                if !declared.is_assignable_from(class) {
                    return Err(CodecError::TypeMismatch {
                        expected: declared.class_name.clone(),
                        actual: json_api_type.to_string(),
                    });
                }
                debug!(json_api_type, class, "resolved class for JSON:API type");
                let mut concrete = declared.clone();
                concrete.class_name = class.to_string();
                return Ok((concrete, Some(class.to_string())));
            }
        }

        if declared.discriminator.is_some() {
            let candidates = std::iter::once(&declared.class_name).chain(declared.subtypes.iter());
            for class in candidates {
                let class_type = self
                    .config
                    .type_for_class(class)
                    .map(str::to_string)
                    .unwrap_or_else(|| derive_type_name(class, &self.config));
                if class_type == json_api_type {
                    debug!(json_api_type, class = %class, "resolved subtype for JSON:API type");
                    let mut concrete = declared.clone();
                    concrete.class_name = class.clone();
                    return Ok((concrete, Some(class.clone())));
                }
            }
        }

        Ok((declared.clone(), None))
    }
}

fn included_index(included: &[ResourceObject]) -> IncludedIndex<'_> {
    let mut index = HashMap::new();
    for resource in included {
        if let Some(identity) = resource.identity() {
            index.entry(identity).or_insert(resource);
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::JsonApiModelBuilder;
    use crate::identity::IdKind;
    use crate::links::Link;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Director {
        id: String,
        #[serde(default)]
        name: Option<String>,
    }

    impl Resource for Director {
        fn descriptor() -> ResourceDescriptor {
            ResourceDescriptor::new("Director")
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Movie {
        id: u64,
        title: String,
        #[serde(default)]
        rating: Option<f64>,
        #[serde(default)]
        directors: Vec<Director>,
    }

    impl Resource for Movie {
        fn descriptor() -> ResourceDescriptor {
            ResourceDescriptor::new("Movie")
                .with_id_kind(IdKind::Long)
                .with_meta_field("rating")
                .with_to_many::<Director>("directors", "directors")
        }
    }

    fn star_wars() -> Movie {
        Movie {
            id: 1,
            title: "Star Wars".into(),
            rating: Some(8.6),
            directors: vec![Director {
                id: "3".into(),
                name: Some("George Lucas".into()),
            }],
        }
    }

    fn codec() -> JsonApiCodec {
        JsonApiCodec::default()
    }

    #[test]
    fn relationship_fields_render_as_linkage() {
        let value = codec()
            .to_value(&Model::entity(&star_wars()).unwrap().into())
            .unwrap();
        assert_eq!(
            value,
            json!({
                "data": {
                    "id": "1",
                    "type": "movies",
                    "attributes": { "title": "Star Wars" },
                    "relationships": {
                        "directors": { "data": [{ "id": "3", "type": "directors" }] }
                    },
                    "meta": { "rating": 8.6 }
                }
            })
        );
    }

    #[test]
    fn builder_relationships_merge_with_fields() {
        let model = JsonApiModelBuilder::new()
            .model(Model::entity(&star_wars()).unwrap())
            .relationship("directors", ResourceIdentifier::new("4", "directors"))
            .build()
            .unwrap();
        let value = codec().to_value(&model).unwrap();
        assert_eq!(
            value["data"]["relationships"]["directors"]["data"],
            json!([{ "id": "3", "type": "directors" }, { "id": "4", "type": "directors" }])
        );
    }

    #[test]
    fn builder_null_and_empty_data_replace_fields() {
        let model = JsonApiModelBuilder::new()
            .model(Model::entity(&star_wars()).unwrap())
            .relationship_with_null_data("directors")
            .build()
            .unwrap();
        let value = codec().to_value(&model).unwrap();
        assert_eq!(value["data"]["relationships"]["directors"], json!({ "data": null }));

        let model = JsonApiModelBuilder::new()
            .model(Model::entity(&star_wars()).unwrap())
            .relationship_with_empty_data("directors")
            .build()
            .unwrap();
        let value = codec().to_value(&model).unwrap();
        assert_eq!(value["data"]["relationships"]["directors"], json!({ "data": [] }));
    }

    #[test]
    fn builder_ops_apply_after_fields_in_order() {
        let model = JsonApiModelBuilder::new()
            .model(Model::entity(&star_wars()).unwrap())
            .relationship_with_empty_data("directors")
            .relationship("directors", ResourceIdentifier::new("4", "directors"))
            .build()
            .unwrap();
        let value = codec().to_value(&model).unwrap();
        assert_eq!(
            value["data"]["relationships"]["directors"]["data"],
            json!([{ "id": "4", "type": "directors" }])
        );
    }

    #[test]
    fn entity_relationships_are_validated() {
        let entity = EntityModel::of(&star_wars()).unwrap().with_relationship(
            "actors",
            Relationship::of_links(Links::of([Link::new("http://localhost/actors", "other")])),
        );
        let model = JsonApiModelBuilder::new()
            .model(Model::Single(entity))
            .build()
            .unwrap();
        let result = codec().to_value(&model);
        assert!(matches!(
            result,
            Err(CodecError::InvalidRelationship { name, .. }) if name == "actors"
        ));
    }

    #[test]
    fn field_relationship_without_id_is_invalid() {
        let fields = serde_json::to_value(star_wars()).unwrap();
        let mut fields = fields.as_object().cloned().unwrap();
        fields["directors"][0].as_object_mut().unwrap().remove("id");
        let entity = EntityModel::from_parts(Movie::descriptor(), fields);

        let result = codec().to_value(&Model::Single(entity).into());
        assert!(matches!(
            result,
            Err(CodecError::InvalidRelationship { name, .. }) if name == "directors"
        ));
    }

    #[test]
    fn sentinel_id_is_not_rendered() {
        let codec = JsonApiCodec::new(JsonApiConfiguration::default().with_json_api_id_not_serialized_for_value("0"));
        let mut movie = star_wars();
        movie.id = 0;
        movie.directors.clear();
        let value = codec.to_value(&Model::entity(&movie).unwrap().into()).unwrap();
        assert!(value["data"].get("id").is_none());
    }

    #[test]
    fn links_as_resource_level_links() {
        let codec = JsonApiCodec::new(JsonApiConfiguration::default().with_links_as_resource_level_links(true));
        let model = Model::entity(&star_wars())
            .unwrap()
            .with_link(Link::self_link("http://localhost/movies/1"));
        let value = codec.to_value(&model.into()).unwrap();
        assert_eq!(value["data"]["links"], json!({ "self": "http://localhost/movies/1" }));
        assert!(value.get("links").is_none());
    }

    #[test]
    fn automatic_page_links_from_self_link() {
        let movies = [star_wars()];
        let model = Model::paged(&movies, PageMetadata::new(1, 0, 3, 3))
            .unwrap()
            .with_link(Link::self_link("http://localhost/movies?page[number]=0&page[size]=1"));
        let value = codec().to_value(&model.into()).unwrap();
        assert_eq!(
            value["links"]["next"],
            json!("http://localhost/movies?page%5Bnumber%5D=1&page%5Bsize%5D=1")
        );
        assert_eq!(
            value["links"]["last"],
            json!("http://localhost/movies?page%5Bnumber%5D=2&page%5Bsize%5D=1")
        );
        assert!(value["links"].get("prev").is_none());
        assert_eq!(value["meta"]["page"]["totalPages"], json!(3));
    }

    #[test]
    fn builder_meta_wins_over_page_meta() {
        let movies = [star_wars()];
        let model = JsonApiModelBuilder::new()
            .model(Model::paged(&movies, PageMetadata::new(1, 0, 1, 1)).unwrap())
            .meta("page", json!("custom"))
            .build()
            .unwrap();
        assert_eq!(codec().to_value(&model).unwrap()["meta"]["page"], json!("custom"));
    }

    #[test]
    fn included_is_deduplicated() {
        let director = EntityModel::of(&star_wars().directors[0]).unwrap();
        let model = JsonApiModelBuilder::new()
            .model(Model::entity(&star_wars()).unwrap())
            .included(director.clone())
            .included(director)
            .build()
            .unwrap();
        assert_eq!(codec().to_document(&model).unwrap().included.len(), 1);
    }

    #[test]
    fn meta_only_document_has_no_data() {
        let model = JsonApiModelBuilder::new()
            .model(Model::representation())
            .meta("count", json!(0))
            .build()
            .unwrap();
        assert_eq!(codec().to_value(&model).unwrap(), json!({ "meta": { "count": 0 } }));
    }

    #[test]
    fn deserialize_resolves_included_and_meta() {
        let json = r#"{
            "data": {
                "id": "1",
                "type": "movies",
                "attributes": { "title": "Star Wars" },
                "relationships": { "directors": { "data": [{ "id": "3", "type": "directors" }] } },
                "meta": { "rating": 8.6 }
            },
            "included": [{ "id": "3", "type": "directors", "attributes": { "name": "George Lucas" } }]
        }"#;
        let decoded = codec().deserialize_entity::<Movie>(json).unwrap();
        assert_eq!(decoded.content, star_wars());
    }

    #[test]
    fn deserialize_without_included_keeps_ids() {
        let json = r#"{
            "data": {
                "id": "1",
                "type": "movies",
                "attributes": { "title": "Star Wars" },
                "relationships": { "directors": { "data": { "id": "3", "type": "directors" } } }
            }
        }"#;
        let movie = codec().deserialize_entity::<Movie>(json).unwrap().content;
        assert_eq!(movie.directors, vec![Director { id: "3".into(), name: None }]);
    }

    #[test]
    fn deserialize_invalid_numeric_id() {
        let json = r#"{ "data": { "id": "abc", "type": "movies", "attributes": { "title": "x" } } }"#;
        let result = codec().deserialize_entity::<Movie>(json);
        assert!(matches!(result, Err(CodecError::InvalidIdentifier { .. })));
    }

    #[test]
    fn deserialize_missing_required_id() {
        let json = r#"{ "data": { "type": "movies", "attributes": { "title": "x" } } }"#;
        let result = codec().deserialize_entity::<Movie>(json);
        assert!(matches!(result, Err(CodecError::MissingIdentifier { .. })));
    }

    #[test]
    fn deserialize_missing_id_with_bad_field_is_invalid_json() {
        let json = r#"{ "data": { "type": "movies", "attributes": { "title": 42 } } }"#;
        let result = codec().deserialize_entity::<Movie>(json);
        assert!(matches!(result, Err(CodecError::InvalidJson { .. })));
    }

    #[test]
    fn deserialize_bad_field_with_id_is_invalid_json() {
        let json = r#"{ "data": { "id": "1", "type": "movies", "attributes": { "title": 42 } } }"#;
        let result = codec().deserialize_entity::<Movie>(json);
        assert!(matches!(result, Err(CodecError::InvalidJson { .. })));
    }

    #[test]
    fn deserialize_rejects_unregistered_subtype() {
        let codec = JsonApiCodec::new(
            JsonApiConfiguration::default()
                .with_type_for_class_used_for_deserialization(true)
                .with_type_for_class("Director", "movies"),
        );
        let json = r#"{ "data": { "id": "1", "type": "movies", "attributes": { "title": "x" } } }"#;
        let result = codec.deserialize_entity::<Movie>(json);
        assert!(matches!(
            result,
            Err(CodecError::TypeMismatch { expected, actual }) if expected == "Movie" && actual == "movies"
        ));
    }

    #[test]
    fn normalize_drops_non_compliant_links() {
        let document = codec()
            .parse_document(
                r#"{
                    "data": { "id": "1", "type": "movies", "links": { "self": "http://x/1", "edit": "http://x/1/edit" } },
                    "links": { "self": "http://x", "movies": "http://x/movies" }
                }"#,
            )
            .unwrap();
        let normalized = codec().normalize(document);
        assert_eq!(normalized.dropped_links.len(), 2);
        assert_eq!(
            codec().render(&normalized.document),
            json!({
                "data": { "id": "1", "type": "movies", "attributes": {}, "links": { "self": "http://x/1" } },
                "links": { "self": "http://x" }
            })
        );
    }
}
