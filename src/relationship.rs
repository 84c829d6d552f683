//! Relationship values and the operations that build them.
//!
//! A [`Relationship`] is immutable; every operation consumes it and returns
//! the updated value. Call sites that contribute to the same relationship
//! express their contribution as a [`RelationshipOp`] and the ops are folded
//! left to right.

use serde_json::{Map, Value};

use crate::document::{Linkage, RelationshipObject, ResourceIdentifier};
use crate::error::CodecError;
use crate::links::Links;
use crate::model::EntityModel;
use crate::types::{rel, JsonApiConfiguration};

/// What a relationship element points at.
#[derive(Debug, Clone)]
pub enum Target {
    /// An already resolved identifier.
    Identifier(ResourceIdentifier),
    /// A domain object whose identity is resolved at render time.
    Entity(Box<EntityModel>),
}

/// One element of relationship data, carrying its own meta.
#[derive(Debug, Clone)]
pub struct Member {
    pub target: Target,
    pub meta: Option<Map<String, Value>>,
}

impl Member {
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The id of the element, if it can be resolved.
    pub fn id(&self) -> Option<String> {
        match &self.target {
            Target::Identifier(identifier) => {
                (!identifier.id.is_empty()).then(|| identifier.id.clone())
            }
            Target::Entity(entity) => entity.resolve_id().ok().map(|f| f.value),
        }
    }

    /// Resolve the wire identifier of this element.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MissingIdentifier` if the element has no id.
    pub fn identifier(&self, config: &JsonApiConfiguration) -> Result<ResourceIdentifier, CodecError> {
        let mut identifier = match &self.target {
            Target::Identifier(identifier) if identifier.id.is_empty() => {
                return Err(CodecError::MissingIdentifier {
                    class: identifier.resource_type.clone(),
                })
            }
            Target::Identifier(identifier) => identifier.clone(),
            Target::Entity(entity) => entity.identifier(config)?,
        };
        if let Some(meta) = &self.meta {
            identifier.meta = Some(meta.clone());
        }
        Ok(identifier)
    }
}

impl From<EntityModel> for Member {
    fn from(entity: EntityModel) -> Self {
        Self {
            target: Target::Entity(Box::new(entity)),
            meta: None,
        }
    }
}

impl From<ResourceIdentifier> for Member {
    fn from(mut identifier: ResourceIdentifier) -> Self {
        let meta = identifier.meta.take();
        Self {
            target: Target::Identifier(identifier),
            meta,
        }
    }
}

/// Relationship data before rendering.
#[derive(Debug, Clone, Default)]
pub enum RelationshipData {
    #[default]
    None,
    One(Member),
    Many(Vec<Member>),
}

/// A single contribution to a relationship.
#[derive(Debug, Clone)]
pub enum RelationshipOp {
    /// Add one element; a second element promotes the data to an array.
    AddData(Member),
    /// Append elements, always producing an array.
    AddDataCollection(Vec<Member>),
    /// Replace the links.
    SetLinks(Links),
    /// Replace the meta.
    SetMeta(Map<String, Value>),
    /// Render data as an array from now on.
    AlwaysDataArray,
    /// Render `"data": null`.
    SetNullData,
    /// Render `"data": []`.
    SetEmptyData,
}

/// A relationship under construction.
#[derive(Debug, Clone, Default)]
pub struct Relationship {
    pub data: RelationshipData,
    pub links: Links,
    pub meta: Map<String, Value>,
    /// Render empty data as `null` or `[]` instead of omitting it.
    pub data_explicitly_set: bool,
}

impl Relationship {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `ops` left to right into a fresh relationship.
    pub fn fold(ops: impl IntoIterator<Item = RelationshipOp>) -> Self {
        ops.into_iter().fold(Self::new(), Self::apply)
    }

    pub fn of(member: impl Into<Member>) -> Self {
        Self::new().add_data_object(member)
    }

    pub fn of_collection<M: Into<Member>>(members: impl IntoIterator<Item = M>) -> Self {
        Self::new().add_data_collection(members)
    }

    pub fn of_links(links: Links) -> Self {
        Self::new().with_links(links)
    }

    pub fn of_meta(meta: Map<String, Value>) -> Self {
        Self::new().with_meta(meta)
    }

    pub fn apply(self, op: RelationshipOp) -> Self {
        let mut relationship = self;
        match op {
            RelationshipOp::AddData(member) => {
                relationship.data = match relationship.data {
                    RelationshipData::None => RelationshipData::One(member),
                    RelationshipData::One(existing) => RelationshipData::Many(vec![existing, member]),
                    RelationshipData::Many(mut members) => {
                        members.push(member);
                        RelationshipData::Many(members)
                    }
                };
            }
            RelationshipOp::AddDataCollection(added) => {
                let mut members = match relationship.data {
                    RelationshipData::None => Vec::new(),
                    RelationshipData::One(existing) => vec![existing],
                    RelationshipData::Many(members) => members,
                };
                members.extend(added);
                relationship.data = RelationshipData::Many(members);
            }
            RelationshipOp::SetLinks(links) => relationship.links = links,
            RelationshipOp::SetMeta(meta) => relationship.meta = meta,
            RelationshipOp::AlwaysDataArray => {
                relationship.data = match relationship.data {
                    RelationshipData::None => RelationshipData::Many(Vec::new()),
                    RelationshipData::One(existing) => RelationshipData::Many(vec![existing]),
                    many @ RelationshipData::Many(_) => many,
                };
                relationship.data_explicitly_set = true;
            }
            RelationshipOp::SetNullData => {
                relationship.data = RelationshipData::None;
                relationship.data_explicitly_set = true;
            }
            RelationshipOp::SetEmptyData => {
                relationship.data = RelationshipData::Many(Vec::new());
                relationship.data_explicitly_set = true;
            }
        }
        relationship
    }

    pub fn add_data_object(self, member: impl Into<Member>) -> Self {
        self.apply(RelationshipOp::AddData(member.into()))
    }

    pub fn add_data_collection<M: Into<Member>>(self, members: impl IntoIterator<Item = M>) -> Self {
        let members = members.into_iter().map(Into::into).collect();
        self.apply(RelationshipOp::AddDataCollection(members))
    }

    pub fn with_links(self, links: Links) -> Self {
        self.apply(RelationshipOp::SetLinks(links))
    }

    pub fn with_meta(self, meta: Map<String, Value>) -> Self {
        self.apply(RelationshipOp::SetMeta(meta))
    }

    pub fn always_serialized_with_data_array(self) -> Self {
        self.apply(RelationshipOp::AlwaysDataArray)
    }

    pub fn with_null_data(self) -> Self {
        self.apply(RelationshipOp::SetNullData)
    }

    pub fn with_empty_data(self) -> Self {
        self.apply(RelationshipOp::SetEmptyData)
    }

    /// Lay `other` over this relationship.
    ///
    /// Data of `other` is added as if by [`RelationshipOp::AddData`] or
    /// [`RelationshipOp::AddDataCollection`]; non-empty links and meta replace
    /// the existing ones.
    pub fn merge(self, other: Relationship) -> Self {
        let mut merged = match other.data {
            RelationshipData::None => self,
            RelationshipData::One(member) => self.add_data_object(member),
            RelationshipData::Many(members) => self.add_data_collection(members),
        };
        if !other.links.is_empty() {
            merged.links = other.links;
        }
        if !other.meta.is_empty() {
            merged.meta = other.meta;
        }
        merged.data_explicitly_set |= other.data_explicitly_set;
        merged
    }

    pub fn members(&self) -> &[Member] {
        match &self.data {
            RelationshipData::None => &[],
            RelationshipData::One(member) => std::slice::from_ref(member),
            RelationshipData::Many(members) => members,
        }
    }

    fn has_data(&self) -> bool {
        !matches!(self.data, RelationshipData::None) || self.data_explicitly_set
    }

    /// Check the relationship, returning the reason it is invalid.
    ///
    /// A fully empty relationship is valid and is omitted when rendered.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(position) = self.members().iter().position(|m| m.id().is_none()) {
            return Err(format!("data element {} has no resolvable id", position));
        }

        if !self.links.is_empty()
            && !self.has_data()
            && self.meta.is_empty()
            && !(self.links.has_link(rel::SELF) || self.links.has_link(rel::RELATED))
        {
            return Err("links must contain a \"self\" or a \"related\" link".to_string());
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Nothing to render.
    pub fn is_empty(&self) -> bool {
        !self.has_data() && self.links.is_empty() && self.meta.is_empty()
    }

    /// Render into a wire relationship object.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MissingIdentifier` if an element has no id.
    pub fn to_object(&self, config: &JsonApiConfiguration) -> Result<RelationshipObject, CodecError> {
        let data = match &self.data {
            RelationshipData::None if self.data_explicitly_set => Linkage::Null,
            RelationshipData::None => Linkage::Absent,
            RelationshipData::One(member) => Linkage::One(member.identifier(config)?),
            RelationshipData::Many(members) => Linkage::Many(
                members
                    .iter()
                    .map(|m| m.identifier(config))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(RelationshipObject {
            data,
            links: self.links.clone(),
            meta: self.meta.clone(),
        })
    }
}

impl From<RelationshipObject> for Relationship {
    fn from(object: RelationshipObject) -> Self {
        let (data, data_explicitly_set) = match object.data {
            Linkage::Absent => (RelationshipData::None, false),
            Linkage::Null => (RelationshipData::None, true),
            Linkage::One(identifier) => (RelationshipData::One(identifier.into()), true),
            Linkage::Many(identifiers) => (
                RelationshipData::Many(identifiers.into_iter().map(Into::into).collect()),
                true,
            ),
        };
        Self {
            data,
            links: object.links,
            meta: object.meta,
            data_explicitly_set,
        }
    }
}
