//! Document assembly.
//!
//! [`JsonApiModelBuilder`] collects the primary model, relationships,
//! included resources, links and meta from any number of call sites.
//! [`JsonApiModelBuilder::build`] validates every relationship and freezes the
//! result into a [`JsonApiModel`] ready for the codec.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::fieldset::SparseFieldsets;
use crate::links::{Link, Links};
use crate::model::{EntityModel, Model, PageMetadata};
use crate::pagination::{page_links, page_meta, PAGE_META_KEY};
use crate::relationship::{Member, Relationship, RelationshipOp};
use crate::types::rel;

/// Default page number request parameter for [`JsonApiModelBuilder::page_links`].
pub const DEFAULT_PAGE_NUMBER_PARAMETER: &str = "page[number]";
/// Default page size request parameter for [`JsonApiModelBuilder::page_links`].
pub const DEFAULT_PAGE_SIZE_PARAMETER: &str = "page[size]";

/// A validated model ready to be rendered.
#[derive(Debug, Clone, Default)]
pub struct JsonApiModel {
    pub model: Option<Model>,
    /// Relationship operations per name, applied on top of the relationships
    /// the primary resource already carries.
    pub relationships: IndexMap<String, Vec<RelationshipOp>>,
    pub included: Vec<EntityModel>,
    pub links: Links,
    pub meta: Map<String, Value>,
    pub fields: SparseFieldsets,
}

impl JsonApiModel {
    /// The relationship `name` as built from its operations alone.
    pub fn relationship(&self, name: &str) -> Option<Relationship> {
        self.relationships
            .get(name)
            .map(|ops| Relationship::fold(ops.iter().cloned()))
    }
}

impl From<Model> for JsonApiModel {
    fn from(mut model: Model) -> Self {
        let links = model.take_links();
        Self {
            model: Some(model),
            links,
            ..Self::default()
        }
    }
}

/// Builder for [`JsonApiModel`].
///
/// ```
/// use jsonapi_codec::{JsonApiModelBuilder, Link, Model, Resource, ResourceDescriptor};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Movie {
///     id: String,
///     title: String,
/// }
///
/// impl Resource for Movie {
///     fn descriptor() -> ResourceDescriptor {
///         ResourceDescriptor::new("Movie")
///     }
/// }
///
/// # fn main() -> Result<(), jsonapi_codec::CodecError> {
/// let movie = Movie { id: "1".into(), title: "Star Wars".into() };
/// let model = JsonApiModelBuilder::new()
///     .model(Model::entity(&movie)?)
///     .link(Link::self_link("http://localhost/movies/1"))
///     .relationship_with_data_array("directors")
///     .meta("count", 1.into())
///     .build()?;
/// assert!(model.relationship("directors").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct JsonApiModelBuilder {
    model: Option<Model>,
    links: Links,
    relationships: IndexMap<String, Vec<RelationshipOp>>,
    included: Vec<EntityModel>,
    meta: Map<String, Value>,
    fields: SparseFieldsets,
}

impl JsonApiModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary model, replacing a previous one.
    ///
    /// Links of the model become document links.
    pub fn model(mut self, mut model: Model) -> Self {
        let links = model.take_links();
        self.links = self.links.merge(links);
        self.model = Some(model);
        self
    }

    /// Add a document link. A link with an existing relation replaces it.
    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn links(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        for link in links {
            self.links.push(link);
        }
        self
    }

    /// Record an operation on relationship `name`.
    ///
    /// Operations apply in call order, on top of the relationship fields of
    /// the primary resource.
    pub fn relationship_op(mut self, name: impl Into<String>, op: RelationshipOp) -> Self {
        self.relationships.entry(name.into()).or_default().push(op);
        self
    }

    /// Add one data element to relationship `name`.
    ///
    /// A second element turns the relationship data into an array.
    pub fn relationship(self, name: impl Into<String>, member: impl Into<Member>) -> Self {
        self.relationship_op(name, RelationshipOp::AddData(member.into()))
    }

    /// Append data elements to relationship `name`.
    pub fn relationship_collection<M: Into<Member>>(
        self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = M>,
    ) -> Self {
        let members = members.into_iter().map(Into::into).collect();
        self.relationship_op(name, RelationshipOp::AddDataCollection(members))
    }

    /// Replace the meta of relationship `name`.
    pub fn relationship_meta(self, name: impl Into<String>, meta: Map<String, Value>) -> Self {
        self.relationship_op(name, RelationshipOp::SetMeta(meta))
    }

    /// Replace the links of relationship `name`.
    pub fn relationship_links(self, name: impl Into<String>, links: Links) -> Self {
        self.relationship_op(name, RelationshipOp::SetLinks(links))
    }

    /// Replace the links of relationship `name` with `self`, `related` and `other_links`.
    ///
    /// Blank hrefs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidRelationship` if the resulting links have
    /// neither a `self` nor a `related` link.
    pub fn relationship_with_links(
        self,
        name: impl Into<String>,
        self_link: Option<&str>,
        related_link: Option<&str>,
        other_links: Option<Links>,
    ) -> Result<Self, CodecError> {
        let name = name.into();
        let mut links = other_links.unwrap_or_default();

        if let Some(href) = self_link.filter(|href| !href.trim().is_empty()) {
            links.push(Link::self_link(href));
        }
        if let Some(href) = related_link.filter(|href| !href.trim().is_empty()) {
            links.push(Link::new(href, rel::RELATED));
        }

        if !(links.has_link(rel::SELF) || links.has_link(rel::RELATED)) {
            return Err(CodecError::InvalidRelationship {
                name,
                reason: "links must contain a \"self\" or a \"related\" link".to_string(),
            });
        }

        Ok(self.relationship_op(name, RelationshipOp::SetLinks(links)))
    }

    /// Always render the data of relationship `name` as an array.
    pub fn relationship_with_data_array(self, name: impl Into<String>) -> Self {
        self.relationship_op(name, RelationshipOp::AlwaysDataArray)
    }

    /// Render relationship `name` with `"data": null`.
    pub fn relationship_with_null_data(self, name: impl Into<String>) -> Self {
        self.relationship_op(name, RelationshipOp::SetNullData)
    }

    /// Render relationship `name` with `"data": []`.
    pub fn relationship_with_empty_data(self, name: impl Into<String>) -> Self {
        self.relationship_op(name, RelationshipOp::SetEmptyData)
    }

    /// Add a resource to `included`. Duplicates are removed when rendering.
    pub fn included(mut self, entity: EntityModel) -> Self {
        self.included.push(entity);
        self
    }

    pub fn included_collection(mut self, entities: impl IntoIterator<Item = EntityModel>) -> Self {
        self.included.extend(entities);
        self
    }

    /// Set a top level meta entry.
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Restrict the attributes rendered for `json_api_type`.
    pub fn fields<S: Into<String>>(mut self, json_api_type: impl Into<String>, names: impl IntoIterator<Item = S>) -> Self {
        self.fields = self.fields.with_fields(json_api_type, names);
        self
    }

    pub fn sparse_fieldsets(mut self, fields: SparseFieldsets) -> Self {
        self.fields = fields;
        self
    }

    /// Add `meta.page` from the page metadata of the model.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::NotPaged` unless the model is a paged collection with page metadata.
    pub fn page_meta(mut self) -> Result<Self, CodecError> {
        let page = self.page_metadata()?;
        self.meta.insert(PAGE_META_KEY.to_string(), page_meta(&page));
        Ok(self)
    }

    /// Add pagination links using `page[number]` and `page[size]`.
    ///
    /// # Errors
    ///
    /// See [`JsonApiModelBuilder::page_links_with_parameters`].
    pub fn page_links(self, base: &str) -> Result<Self, CodecError> {
        self.page_links_with_parameters(base, DEFAULT_PAGE_NUMBER_PARAMETER, DEFAULT_PAGE_SIZE_PARAMETER)
    }

    /// Add `first`, `prev`, `next` and `last` links derived from the page metadata.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::NotPaged` unless the model is a paged collection with
    /// page metadata, and `CodecError::InvalidLinkBase` if `base` is not a URL.
    pub fn page_links_with_parameters(
        mut self,
        base: &str,
        number_param: &str,
        size_param: &str,
    ) -> Result<Self, CodecError> {
        let page = self.page_metadata()?;
        for link in page_links(base, &page, number_param, size_param)? {
            self.links.push(link);
        }
        Ok(self)
    }

    fn page_metadata(&self) -> Result<PageMetadata, CodecError> {
        self.model
            .as_ref()
            .and_then(Model::page)
            .copied()
            .ok_or(CodecError::NotPaged)
    }

    /// Validate the relationships and freeze the model.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::InvalidRelationship` for the first invalid relationship.
    pub fn build(self) -> Result<JsonApiModel, CodecError> {
        for (name, ops) in &self.relationships {
            Relationship::fold(ops.iter().cloned())
                .validate()
                .map_err(|reason| CodecError::InvalidRelationship {
                    name: name.clone(),
                    reason,
                })?;
        }

        Ok(JsonApiModel {
            model: self.model,
            relationships: self.relationships,
            included: self.included,
            links: self.links,
            meta: self.meta,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ResourceIdentifier;
    use crate::identity::ResourceDescriptor;
    use serde_json::json;

    fn movie(id: &str) -> EntityModel {
        EntityModel::from_parts(
            ResourceDescriptor::new("Movie"),
            json!({ "id": id, "title": "Star Wars" }).as_object().cloned().unwrap(),
        )
    }

    fn paged() -> Model {
        Model::Paged {
            content: vec![movie("1"), movie("2")],
            links: Links::new(),
            page: Some(PageMetadata::new(2, 1, 4, 2)),
        }
    }

    #[test]
    fn model_links_become_document_links() {
        let model = Model::Single(movie("1")).with_link(Link::self_link("http://localhost/movies/1"));
        let built = JsonApiModelBuilder::new().model(model).build().unwrap();
        assert!(built.links.has_link("self"));
        assert!(built.model.unwrap().links().is_empty());
    }

    #[test]
    fn page_meta_requires_paged_model() {
        let result = JsonApiModelBuilder::new().model(Model::Single(movie("1"))).page_meta();
        assert!(matches!(result, Err(CodecError::NotPaged)));

        let result = JsonApiModelBuilder::new().page_links("http://localhost/movies");
        assert!(matches!(result, Err(CodecError::NotPaged)));

        let missing = Model::Paged {
            content: Vec::new(),
            links: Links::new(),
            page: None,
        };
        let result = JsonApiModelBuilder::new().model(missing).page_meta();
        assert!(matches!(result, Err(CodecError::NotPaged)));
    }

    #[test]
    fn page_meta_and_links() {
        let built = JsonApiModelBuilder::new()
            .model(paged())
            .page_meta()
            .unwrap()
            .page_links("http://localhost/movies")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            built.meta["page"],
            json!({ "size": 2, "totalElements": 4, "totalPages": 2, "number": 1 })
        );
        assert_eq!(built.links.relations().collect::<Vec<_>>(), vec!["first", "prev"]);
    }

    #[test]
    fn relationships_merge_across_calls() {
        let built = JsonApiModelBuilder::new()
            .model(Model::Single(movie("1")))
            .relationship("directors", ResourceIdentifier::new("1", "directors"))
            .relationship("directors", ResourceIdentifier::new("2", "directors"))
            .relationship_meta("directors", Map::from_iter([("count".to_string(), json!(2))]))
            .build()
            .unwrap();
        let directors = built.relationship("directors").unwrap();
        assert_eq!(directors.members().len(), 2);
        assert_eq!(directors.meta["count"], json!(2));
    }

    #[test]
    fn invalid_relationship_fails_build() {
        let director = EntityModel::from_parts(
            ResourceDescriptor::new("Director"),
            json!({ "name": "George Lucas" }).as_object().cloned().unwrap(),
        );
        let result = JsonApiModelBuilder::new()
            .model(Model::Single(movie("1")))
            .relationship("directors", director)
            .build();
        assert!(matches!(
            result,
            Err(CodecError::InvalidRelationship { name, .. }) if name == "directors"
        ));
    }

    #[test]
    fn relationship_links_need_self_or_related() {
        let result = JsonApiModelBuilder::new().relationship_with_links(
            "directors",
            Some(" "),
            None,
            Some(Links::of([Link::new("http://localhost/x", "other")])),
        );
        assert!(matches!(result, Err(CodecError::InvalidRelationship { .. })));

        let built = JsonApiModelBuilder::new()
            .relationship_with_links("directors", None, Some("http://localhost/movies/1/directors"), None)
            .unwrap()
            .build()
            .unwrap();
        assert!(built.relationship("directors").unwrap().links.has_link("related"));
    }

    #[test]
    fn empty_relationship_with_data_array() {
        let built = JsonApiModelBuilder::new()
            .relationship_with_data_array("directors")
            .build()
            .unwrap();
        let directors = built.relationship("directors").unwrap();
        assert!(directors.data_explicitly_set);
        assert!(directors.members().is_empty());
    }
}
