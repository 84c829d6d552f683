//! Link placement and JSON:API compliance filtering.
//!
//! JSON:API 1.1 allows `self`, `related`, `describedby` and the pagination
//! relations at document level, and only `self` on resource objects. With
//! `json_api_compliant_links` enabled every other relation is dropped and
//! reported; with it disabled links pass through untouched.

use serde::Serialize;
use tracing::warn;

use crate::document::{JsonApiDocument, ResourceObject};
use crate::links::Links;
use crate::types::{JsonApiConfiguration, DOCUMENT_LEVEL_RELATIONS, RESOURCE_LEVEL_RELATIONS};

/// Where a set of links is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkScope {
    Document,
    Resource,
}

impl LinkScope {
    /// Relations JSON:API permits at this level.
    pub fn allowed_relations(self) -> &'static [&'static str] {
        match self {
            LinkScope::Document => DOCUMENT_LEVEL_RELATIONS,
            LinkScope::Resource => RESOURCE_LEVEL_RELATIONS,
        }
    }

    pub fn allows(self, relation: &str) -> bool {
        self.allowed_relations().contains(&relation)
    }
}

impl std::fmt::Display for LinkScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkScope::Document => write!(f, "document"),
            LinkScope::Resource => write!(f, "resource"),
        }
    }
}

/// A link removed by the compliance filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonCompliantLink {
    pub relation: String,
    pub href: String,
    pub scope: LinkScope,
}

/// Applies the link compliance rules of a configuration.
#[derive(Debug, Clone, Copy)]
pub struct LinksPolicy<'a> {
    config: &'a JsonApiConfiguration,
}

impl<'a> LinksPolicy<'a> {
    pub fn new(config: &'a JsonApiConfiguration) -> Self {
        Self { config }
    }

    /// Split `links` into the ones allowed at `scope` and the dropped ones.
    ///
    /// Order of the kept links is preserved.
    pub fn filter_compliant(&self, links: Links, scope: LinkScope) -> (Links, Vec<NonCompliantLink>) {
        if !self.config.json_api_compliant_links {
            return (links, Vec::new());
        }

        let mut kept = Links::new();
        let mut dropped = Vec::new();
        for link in links {
            if scope.allows(&link.rel) {
                kept.push(link);
            } else {
                warn!(
                    relation = %link.rel,
                    href = %link.href,
                    ?scope,
                    "dropping link not allowed by JSON:API"
                );
                dropped.push(NonCompliantLink {
                    relation: link.rel,
                    href: link.href,
                    scope,
                });
            }
        }
        (kept, dropped)
    }

    /// Filter `links` for document level and append them to the document.
    pub fn place_at_document_level(&self, document: &mut JsonApiDocument, links: Links) -> Vec<NonCompliantLink> {
        let (kept, dropped) = self.filter_compliant(links, LinkScope::Document);
        for link in kept {
            document.links.push(link);
        }
        dropped
    }

    /// Filter `links` for resource level and append them to the resource.
    pub fn place_at_resource_level(&self, resource: &mut ResourceObject, links: Links) -> Vec<NonCompliantLink> {
        let (kept, dropped) = self.filter_compliant(links, LinkScope::Resource);
        for link in kept {
            resource.links.push(link);
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::Link;
    use crate::types::rel;

    fn links() -> Links {
        Links::of([
            Link::self_link("http://localhost/movies/1"),
            Link::new("http://localhost/movies", "movies"),
            Link::new("http://localhost/movies?page[number]=2", rel::NEXT),
        ])
    }

    #[test]
    fn document_level_keeps_pagination() {
        let config = JsonApiConfiguration::default();
        let (kept, dropped) = LinksPolicy::new(&config).filter_compliant(links(), LinkScope::Document);

        assert_eq!(kept.relations().collect::<Vec<_>>(), vec!["self", "next"]);
        assert_eq!(
            dropped,
            vec![NonCompliantLink {
                relation: "movies".into(),
                href: "http://localhost/movies".into(),
                scope: LinkScope::Document,
            }]
        );
    }

    #[test]
    fn resource_level_keeps_only_self() {
        let config = JsonApiConfiguration::default();
        let mut resource = ResourceObject::new(Some("1".into()), "movies");
        let dropped = LinksPolicy::new(&config).place_at_resource_level(&mut resource, links());

        assert_eq!(resource.links.relations().collect::<Vec<_>>(), vec!["self"]);
        assert_eq!(dropped.len(), 2);
    }

    #[test]
    fn disabled_policy_passes_everything() {
        let config = JsonApiConfiguration::default().with_json_api_compliant_links(false);
        let mut document = JsonApiDocument::default();
        let dropped = LinksPolicy::new(&config).place_at_document_level(&mut document, links());

        assert!(dropped.is_empty());
        assert_eq!(document.links.len(), 3);
    }
}
