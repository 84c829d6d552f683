//! Page meta and pagination links.

use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::links::{Link, Links};
use crate::model::PageMetadata;
use crate::types::rel;

/// Key of the page block inside `meta`.
pub const PAGE_META_KEY: &str = "page";

/// The `meta.page` value for a page.
pub fn page_meta(page: &PageMetadata) -> Value {
    let mut result = Map::new();
    result.insert("size".to_string(), Value::from(page.size));
    result.insert("totalElements".to_string(), Value::from(page.total_elements));
    result.insert("totalPages".to_string(), Value::from(page.total_pages));
    result.insert("number".to_string(), Value::from(page.number));
    Value::Object(result)
}

/// Derive `first`, `prev`, `next` and `last` links for a page.
///
/// `first` and `prev` are emitted when `number > 0`, `next` and `last` when
/// there is a later page. Parameters are appended with `&` when `base`
/// already has a query string.
///
/// # Errors
///
/// Returns `CodecError::InvalidLinkBase` if `base` is not an absolute URL.
pub fn page_links(
    base: &str,
    page: &PageMetadata,
    number_param: &str,
    size_param: &str,
) -> Result<Links, CodecError> {
    let parsed = url::Url::parse(base).map_err(|source| CodecError::InvalidLinkBase {
        base: base.to_string(),
        source,
    })?;
    let separator = if parsed.query().is_some() { '&' } else { '?' };

    let href = |number: u64| {
        format!(
            "{}{}{}={}&{}={}",
            base, separator, number_param, number, size_param, page.size
        )
    };

    let mut links = Links::new();
    if page.number > 0 {
        links.push(Link::new(href(0), rel::FIRST));
        links.push(Link::new(href(page.number - 1), rel::PREV));
    }
    if let Some(next) = page.number.checked_add(1).filter(|n| *n < page.total_pages) {
        links.push(Link::new(href(next), rel::NEXT));
        links.push(Link::new(href(page.total_pages - 1), rel::LAST));
    }
    Ok(links)
}

/// Strip pagination parameters from an href, giving a base for [`page_links`].
pub fn link_base(href: &str, number_param: &str, size_param: &str) -> String {
    let Some((path, query)) = href.split_once('?') else {
        return href.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(key, _)| key);
            let decoded = url::form_urlencoded::parse(key.as_bytes())
                .next()
                .map(|(k, _)| k.into_owned())
                .unwrap_or_default();
            !pair.is_empty() && decoded != number_param && decoded != size_param
        })
        .collect();

    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, kept.join("&"))
    }
}
