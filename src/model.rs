//! Host side shapes handed to the serializer.
//!
//! A [`Model`] is the primary content of a document: one entity, a collection
//! or a page of a larger collection. A model without content renders a
//! document with only links and meta.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::ResourceIdentifier;
use crate::error::CodecError;
use crate::identity::{resolve_id, resolve_meta, resolve_type, Resource, ResourceDescriptor, ResourceField};
use crate::links::{Link, Links};
use crate::relationship::Relationship;
use crate::types::{json_type_name, JsonApiConfiguration};

/// A domain object in its serialized form, with its capabilities, own links
/// and relationships contributed for this object only.
#[derive(Debug, Clone)]
pub struct EntityModel {
    pub descriptor: ResourceDescriptor,
    pub fields: Map<String, Value>,
    pub links: Links,
    pub relationships: IndexMap<String, Relationship>,
}

impl EntityModel {
    /// Capture a domain object.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidJson` if serde serialization fails and
    /// `CodecError::InvalidDocument` if the object does not serialize to a JSON object.
    pub fn of<T: Resource + Serialize>(entity: &T) -> Result<Self, CodecError> {
        let descriptor = entity.instance_descriptor();
        match serde_json::to_value(entity)? {
            Value::Object(fields) => Ok(Self::from_parts(descriptor, fields)),
            other => Err(CodecError::invalid_document(format!(
                "{} must serialize to an object, got {}",
                descriptor.class_name,
                json_type_name(&other)
            ))),
        }
    }

    pub fn from_parts(descriptor: ResourceDescriptor, fields: Map<String, Value>) -> Self {
        Self {
            descriptor,
            fields,
            links: Links::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.links = self.links.merge(links);
        self
    }

    /// Attach a relationship to this object, merging with one of the same name.
    pub fn with_relationship(mut self, name: impl Into<String>, relationship: Relationship) -> Self {
        match self.relationships.entry(name.into()) {
            indexmap::map::Entry::Occupied(mut entry) => {
                let existing = std::mem::take(entry.get_mut());
                *entry.get_mut() = existing.merge(relationship);
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(relationship);
            }
        }
        self
    }

    /// # Errors
    ///
    /// Returns `CodecError::MissingIdentifier` if no id can be resolved.
    pub fn resolve_id(&self) -> Result<ResourceField, CodecError> {
        resolve_id(&self.fields, &self.descriptor)
    }

    pub fn resolve_type(&self, config: &JsonApiConfiguration) -> ResourceField {
        resolve_type(&self.fields, &self.descriptor, config)
    }

    pub fn meta(&self) -> Map<String, Value> {
        resolve_meta(&self.fields, &self.descriptor)
    }

    /// The `(id, type)` identifier of this entity.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MissingIdentifier` if no id can be resolved.
    pub fn identifier(&self, config: &JsonApiConfiguration) -> Result<ResourceIdentifier, CodecError> {
        let id = self.resolve_id()?;
        let json_api_type = self.resolve_type(config);
        Ok(ResourceIdentifier::new(id.value, json_api_type.value))
    }
}

/// Page metadata of a paged collection. `number` is zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number: u64,
}

impl PageMetadata {
    pub fn new(size: u64, number: u64, total_elements: u64, total_pages: u64) -> Self {
        Self {
            size,
            total_elements,
            total_pages,
            number,
        }
    }

    /// Page metadata with `total_pages` derived from the element count.
    pub fn from_total(size: u64, number: u64, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size)
        };
        Self::new(size, number, total_elements, total_pages)
    }
}

/// Primary content of a document.
#[derive(Debug, Clone)]
pub enum Model {
    Single(EntityModel),
    Collection {
        content: Vec<EntityModel>,
        links: Links,
    },
    Paged {
        content: Vec<EntityModel>,
        links: Links,
        page: Option<PageMetadata>,
    },
    /// No primary data; only links and meta are rendered.
    Representation { links: Links },
}

impl Model {
    /// Wrap a single domain object.
    ///
    /// # Errors
    ///
    /// See [`EntityModel::of`].
    pub fn entity<T: Resource + Serialize>(entity: &T) -> Result<Self, CodecError> {
        Ok(Model::Single(EntityModel::of(entity)?))
    }

    /// Wrap a collection of domain objects.
    ///
    /// # Errors
    ///
    /// See [`EntityModel::of`].
    pub fn collection<'a, T, I>(entities: I) -> Result<Self, CodecError>
    where
        T: Resource + Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let content = entities
            .into_iter()
            .map(EntityModel::of)
            .collect::<Result<_, _>>()?;
        Ok(Model::Collection {
            content,
            links: Links::new(),
        })
    }

    /// Wrap a page of domain objects.
    ///
    /// # Errors
    ///
    /// See [`EntityModel::of`].
    pub fn paged<'a, T, I>(entities: I, page: PageMetadata) -> Result<Self, CodecError>
    where
        T: Resource + Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let content = entities
            .into_iter()
            .map(EntityModel::of)
            .collect::<Result<_, _>>()?;
        Ok(Model::Paged {
            content,
            links: Links::new(),
            page: Some(page),
        })
    }

    pub fn representation() -> Self {
        Model::Representation { links: Links::new() }
    }

    /// Add a model level link. For a single entity it is added to the entity.
    pub fn with_link(mut self, link: Link) -> Self {
        self.links_mut().push(link);
        self
    }

    pub fn links(&self) -> &Links {
        match self {
            Model::Single(entity) => &entity.links,
            Model::Collection { links, .. }
            | Model::Paged { links, .. }
            | Model::Representation { links } => links,
        }
    }

    fn links_mut(&mut self) -> &mut Links {
        match self {
            Model::Single(entity) => &mut entity.links,
            Model::Collection { links, .. }
            | Model::Paged { links, .. }
            | Model::Representation { links } => links,
        }
    }

    /// Take the model level links out, leaving the model without links.
    pub fn take_links(&mut self) -> Links {
        std::mem::take(self.links_mut())
    }

    /// Page metadata, if this is a paged collection that carries it.
    pub fn page(&self) -> Option<&PageMetadata> {
        match self {
            Model::Paged { page, .. } => page.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Movie {
        id: String,
        title: String,
    }

    impl Resource for Movie {
        fn descriptor() -> ResourceDescriptor {
            ResourceDescriptor::new("Movie")
        }
    }

    #[test]
    fn entity_model_identifier() {
        let movie = Movie {
            id: "1".into(),
            title: "Star Wars".into(),
        };
        let entity = EntityModel::of(&movie).unwrap();
        assert_eq!(
            entity.identifier(&JsonApiConfiguration::default()).unwrap(),
            ResourceIdentifier::new("1", "movies")
        );
    }

    #[test]
    fn non_object_entity_is_rejected() {
        struct Title;
        impl Serialize for Title {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str("Star Wars")
            }
        }
        impl Resource for Title {
            fn descriptor() -> ResourceDescriptor {
                ResourceDescriptor::new("Title")
            }
        }

        let result = EntityModel::of(&Title);
        assert!(matches!(result, Err(CodecError::InvalidDocument { .. })));
    }

    #[test]
    fn page_metadata_serializes_camel_case() {
        let page = PageMetadata::new(2, 1, 2, 2);
        assert_eq!(
            serde_json::to_value(page).unwrap(),
            json!({ "size": 2, "totalElements": 2, "totalPages": 2, "number": 1 })
        );
    }

    #[test]
    fn page_metadata_from_total() {
        assert_eq!(PageMetadata::from_total(2, 0, 5).total_pages, 3);
        assert_eq!(PageMetadata::from_total(0, 0, 5).total_pages, 0);
    }

    #[test]
    fn only_paged_models_carry_pages() {
        let movies = [Movie {
            id: "1".into(),
            title: "Star Wars".into(),
        }];
        let collection = Model::collection(&movies).unwrap();
        assert!(collection.page().is_none());

        let paged = Model::paged(&movies, PageMetadata::new(1, 0, 1, 1)).unwrap();
        assert_eq!(paged.page().map(|p| p.total_pages), Some(1));
    }

    #[test]
    fn single_model_links_live_on_entity() {
        let movie = Movie {
            id: "1".into(),
            title: "Star Wars".into(),
        };
        let mut model = Model::entity(&movie)
            .unwrap()
            .with_link(Link::self_link("http://localhost/movies/1"));
        assert!(model.links().has_link("self"));

        let links = model.take_links();
        assert_eq!(links.len(), 1);
        assert!(model.links().is_empty());
    }
}
