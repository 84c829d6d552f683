//! JSON:API Codec
//!
//! Encoding and decoding of domain objects as [JSON:API 1.1](https://jsonapi.org/format/1.1/)
//! documents.
//!
//! Domain types describe their JSON:API capabilities through a
//! [`ResourceDescriptor`] (id and type fields, meta fields, relationship
//! fields, subtypes). A [`JsonApiModelBuilder`] assembles a document from a
//! primary [`Model`], extra relationships, included resources, links and meta.
//! [`JsonApiCodec`] renders the result and parses documents back into objects.
//!
//! # Example
//!
//! ```
//! use jsonapi_codec::{JsonApiCodec, Link, Model, Resource, ResourceDescriptor};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Movie {
//!     id: String,
//!     title: String,
//! }
//!
//! impl Resource for Movie {
//!     fn descriptor() -> ResourceDescriptor {
//!         ResourceDescriptor::new("Movie")
//!     }
//! }
//!
//! # fn main() -> Result<(), jsonapi_codec::CodecError> {
//! let codec = JsonApiCodec::default();
//! let movie = Movie { id: "1".into(), title: "Star Wars".into() };
//! let model = Model::entity(&movie)?.with_link(Link::self_link("http://localhost/movies/1"));
//!
//! let value = codec.to_value(&model.into())?;
//! assert_eq!(
//!     value,
//!     json!({
//!         "data": { "id": "1", "type": "movies", "attributes": { "title": "Star Wars" } },
//!         "links": { "self": "http://localhost/movies/1" }
//!     })
//! );
//!
//! let decoded = codec.deserialize_entity::<Movie>(&value.to_string())?;
//! assert_eq!(decoded.content.title, "Star Wars");
//! # Ok(())
//! # }
//! ```
//!
//! # Identity
//!
//! | Step | id | type |
//! |------|----|------|
//! | 1 | - | class level type |
//! | 2 | explicit id field | explicit type field |
//! | 3 | primary key field | - |
//! | 4 | field named `id` | - |
//! | 5 | - | configured mapping, else the class name (lower cased, pluralized) |
//!
//! # Links
//!
//! With `jsonApiCompliantLinks` (the default) only `self`, `related`,
//! `describedby`, `first`, `last`, `prev` and `next` are rendered at document
//! level and only `self` at resource level. Other relations are dropped and
//! reported through [`Assembled::dropped_links`].

mod assembler;
mod codec;
mod document;
mod error;
mod fieldset;
mod identity;
mod included;
mod linter;
mod links;
mod model;
mod pagination;
mod policy;
mod relationship;
mod types;

pub use assembler::{
    JsonApiModel, JsonApiModelBuilder, DEFAULT_PAGE_NUMBER_PARAMETER, DEFAULT_PAGE_SIZE_PARAMETER,
};
pub use codec::{Assembled, DecodedCollection, DecodedEntity, JsonApiCodec};
pub use document::{
    parse_relationship, render_relationship, render_resource, ErrorLinks, ErrorObject, ErrorSource,
    JsonApiDocument, JsonApiErrors, JsonApiObject, Linkage, PrimaryData, RelationshipObject,
    ResourceIdentifier, ResourceObject, JSON_API_VERSION,
};
pub use error::CodecError;
pub use fieldset::SparseFieldsets;
pub use identity::{
    derive_type_name, extract_attributes, resolve_id, resolve_meta, resolve_type, set_field,
    IdKind, IdentityField, RelationshipField, Resource, ResourceDescriptor, ResourceField,
    ID_LITERAL, TYPE_LITERAL,
};
pub use included::IncludedResources;
pub use linter::{
    lint, lint_file, lint_value, read_json, Diagnostic, FileResult, FileStatus, LintResult,
    Severity,
};
pub use links::{
    encode_href, find_link_with_rel, find_links, parse_links, render_link, render_links,
    Affordance, AffordanceProperty, Link, Links,
};
pub use model::{EntityModel, Model, PageMetadata};
pub use pagination::{link_base, page_links, page_meta, PAGE_META_KEY};
pub use policy::{LinkScope, LinksPolicy, NonCompliantLink};
pub use relationship::{Member, Relationship, RelationshipData, RelationshipOp, Target};
pub use types::{
    json_type_name, pluralize, rel, AffordanceRendering, JsonApiConfiguration,
    DOCUMENT_LEVEL_RELATIONS, RESOURCE_LEVEL_RELATIONS,
};
