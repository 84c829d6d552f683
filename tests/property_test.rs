//! Property-based tests for document invariants
//!
//! Included deduplication, sparse fieldset projection and pagination links
//! must hold for arbitrary inputs.

use std::collections::HashSet;

use jsonapi_codec::{page_links, IncludedResources, PageMetadata, ResourceObject, SparseFieldsets};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn identities() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..8, 0u8..3), 0..40)
}

fn attribute_map() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-e]", any::<i32>(), 0..6)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

proptest! {
    /// Every (id, type) appears once, in first-seen order
    #[test]
    fn included_dedup_keeps_first_seen(pairs in identities()) {
        let mut included = IncludedResources::new();
        for (position, (id, kind)) in pairs.iter().enumerate() {
            let mut resource = ResourceObject::new(Some(id.to_string()), format!("type{}", kind));
            resource.meta.insert("position".into(), Value::from(position));
            included.add(resource);
        }

        let mut seen = HashSet::new();
        let expected: Vec<usize> = pairs
            .iter()
            .enumerate()
            .filter(|(_, pair)| seen.insert(**pair))
            .map(|(position, _)| position)
            .collect();

        let resources = included.into_vec();
        let positions: Vec<usize> = resources
            .iter()
            .filter_map(|r| r.meta.get("position").and_then(Value::as_u64))
            .map(|p| p as usize)
            .collect();
        prop_assert_eq!(positions, expected);
    }

    /// Applying an allow-list keeps exactly the allowed attributes
    #[test]
    fn sparse_fieldset_is_intersection(
        attributes in attribute_map(),
        allowed in prop::collection::btree_set("[a-e]", 0..6),
    ) {
        let fields = SparseFieldsets::new().with_fields("movies", allowed.iter().cloned());
        let projected = fields.apply(&attributes, "movies");

        let expected: HashSet<&String> = attributes.keys().filter(|k| allowed.contains(*k)).collect();
        let actual: HashSet<&String> = projected.keys().collect();
        prop_assert_eq!(actual, expected);
        for (key, value) in &projected {
            prop_assert_eq!(Some(value), attributes.get(key));
        }
    }

    /// Types without an allow-list pass through unchanged
    #[test]
    fn sparse_fieldset_other_type_unchanged(attributes in attribute_map()) {
        let fields = SparseFieldsets::new().with_fields("directors", ["name"]);
        prop_assert_eq!(fields.apply(&attributes, "movies"), attributes);
    }

    /// first/prev exist exactly when there is an earlier page, next/last when there is a later one
    #[test]
    fn page_links_match_position(size in 1u64..50, total_elements in 0u64..500, number in 0u64..20) {
        let page = PageMetadata::from_total(size, number, total_elements);
        let links = page_links("http://x/movies", &page, "page[number]", "page[size]").unwrap();

        prop_assert_eq!(links.has_link("first"), number > 0);
        prop_assert_eq!(links.has_link("prev"), number > 0);
        prop_assert_eq!(links.has_link("next"), number + 1 < page.total_pages);
        prop_assert_eq!(links.has_link("last"), number + 1 < page.total_pages);

        for link in links.iter() {
            let expected_size = format!("page[size]={}", size);
            prop_assert!(link.href.ends_with(&expected_size));
        }
        if let Some(next) = links.get("next") {
            let expected_number = format!("page[number]={}&", number + 1);
            prop_assert!(next.href.contains(&expected_number));
        }
    }
}
