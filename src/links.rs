//! Links container, link objects and their JSON:API wire form.
//!
//! A [`Links`] holds at most one [`Link`] per relation, in insertion order.
//! Simple links render as `"rel": "href"`; links with extra attributes,
//! affordances or a template render as link objects:
//!
//! ```json
//! { "href": "...", "title": "...", "meta": { "media": "...", "isTemplated": true } }
//! ```

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::CodecError;
use crate::types::{json_type_name, rel, AffordanceRendering, JsonApiConfiguration};

const HAL_FORMS_TEMPLATES: &str = "hal-forms-templates";

/// A single property of an affordance payload or query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffordanceProperty {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl AffordanceProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: None,
            required: false,
        }
    }

    pub fn with_type(mut self, property_type: impl Into<String>) -> Self {
        self.property_type = Some(property_type.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// A state transition offered next to a link, e.g. "POST a new movie here".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
    pub name: String,
    /// Upper cased HTTP method.
    pub method: String,
    /// Target href; defaults to the href of the link carrying the affordance.
    pub target: Option<String>,
    pub input_properties: Vec<AffordanceProperty>,
    pub query_properties: Vec<AffordanceProperty>,
}

impl Affordance {
    pub fn new(name: impl Into<String>, method: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            method: method.as_ref().to_uppercase(),
            target: None,
            input_properties: Vec::new(),
            query_properties: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_input_property(mut self, property: AffordanceProperty) -> Self {
        self.input_properties.push(property);
        self
    }

    pub fn with_query_property(mut self, property: AffordanceProperty) -> Self {
        self.query_properties.push(property);
        self
    }

    fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A hypermedia link.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub title: Option<String>,
    /// Media type hint, rendered as `type`.
    pub media_type: Option<String>,
    pub hreflang: Option<String>,
    pub media: Option<String>,
    pub profile: Option<String>,
    pub deprecation: Option<String>,
    pub name: Option<String>,
    pub templated: bool,
    pub affordances: Vec<Affordance>,
    /// Arbitrary extra attributes, rendered into the link `meta`.
    pub meta: Map<String, Value>,
}

impl Link {
    /// Create a link. Hrefs containing `{...}` variables are marked templated.
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        let href = href.into();
        let templated = is_template(&href);
        Self {
            rel: rel.into(),
            href,
            templated,
            ..Self::default()
        }
    }

    /// Create a `self` link.
    pub fn self_link(href: impl Into<String>) -> Self {
        Self::new(href, rel::SELF)
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = rel.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_hreflang(mut self, hreflang: impl Into<String>) -> Self {
        self.hreflang = Some(hreflang.into());
        self
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_deprecation(mut self, deprecation: impl Into<String>) -> Self {
        self.deprecation = Some(deprecation.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn with_affordance(mut self, affordance: Affordance) -> Self {
        self.affordances.push(affordance);
        self
    }

    pub fn has_rel(&self, relation: &str) -> bool {
        self.rel == relation
    }

    fn has_attributes(&self) -> bool {
        self.title.is_some()
            || self.media_type.is_some()
            || self.hreflang.is_some()
            || self.media.is_some()
            || self.profile.is_some()
            || self.deprecation.is_some()
            || self.name.is_some()
            || !self.meta.is_empty()
    }

    fn rendered_affordances(&self, mode: AffordanceRendering) -> Vec<&Affordance> {
        if mode == AffordanceRendering::None {
            return Vec::new();
        }
        self.affordances.iter().filter(|a| !a.is_get()).collect()
    }
}

/// Ordered links keyed by relation name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Links {
    links: IndexMap<String, Link>,
}

impl Links {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build links from an iterator; a later link replaces an earlier one with the same relation.
    pub fn of(links: impl IntoIterator<Item = Link>) -> Self {
        links.into_iter().collect()
    }

    /// Add a link, replacing an existing one with the same relation in place.
    pub fn push(&mut self, link: Link) {
        self.links.insert(link.rel.clone(), link);
    }

    pub fn and(mut self, link: Link) -> Self {
        self.push(link);
        self
    }

    /// Append all links of `other`.
    pub fn merge(mut self, other: Links) -> Self {
        for link in other {
            self.push(link);
        }
        self
    }

    pub fn get(&self, relation: &str) -> Option<&Link> {
        self.links.get(relation)
    }

    pub fn has_link(&self, relation: &str) -> bool {
        self.links.contains_key(relation)
    }

    pub fn remove(&mut self, relation: &str) -> Option<Link> {
        self.links.shift_remove(relation)
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Link) -> bool) {
        self.links.retain(|_, link| keep(link));
    }
}

impl FromIterator<Link> for Links {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut links = Links::new();
        for link in iter {
            links.push(link);
        }
        links
    }
}

impl IntoIterator for Links {
    type Item = Link;
    type IntoIter = indexmap::map::IntoValues<String, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_values()
    }
}

/// Render links as a JSON:API links object.
pub fn render_links(links: &Links, config: &JsonApiConfiguration) -> Value {
    let mut result = Map::new();
    for link in links.iter() {
        result.insert(link.rel.clone(), render_link(link, config));
    }
    Value::Object(result)
}

/// Render a single link as a string or a link object.
pub fn render_link(link: &Link, config: &JsonApiConfiguration) -> Value {
    let href = if config.is_url_encoded(&link.rel) {
        encode_href(&link.href, link.templated)
    } else {
        link.href.clone()
    };

    let affordances = link.rendered_affordances(config.affordances_rendered_as_link_meta);
    if !link.has_attributes() && !link.templated && affordances.is_empty() {
        return Value::String(href);
    }

    let mut object = Map::new();
    object.insert("href".to_string(), Value::String(href.clone()));

    let mut meta = link.meta.clone();
    let top_level = [
        ("title", &link.title),
        ("type", &link.media_type),
        ("hreflang", &link.hreflang),
    ];
    for (key, value) in top_level {
        if let Some(value) = value {
            object.insert(key.to_string(), Value::String(value.clone()));
            if !config.json_api11_link_properties_removed_from_link_meta {
                meta.insert(key.to_string(), Value::String(value.clone()));
            }
        }
    }

    let meta_attributes = [
        ("media", &link.media),
        ("profile", &link.profile),
        ("deprecation", &link.deprecation),
        ("name", &link.name),
    ];
    for (key, value) in meta_attributes {
        if let Some(value) = value {
            meta.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    if link.templated {
        meta.insert("isTemplated".to_string(), Value::Bool(true));
    }

    match config.affordances_rendered_as_link_meta {
        AffordanceRendering::Proprietary if !affordances.is_empty() => {
            let rendered = affordances
                .iter()
                .map(|a| render_affordance(a, &link.rel, &href))
                .collect();
            meta.insert("affordances".to_string(), Value::Array(rendered));
        }
        AffordanceRendering::HalForms if !affordances.is_empty() => {
            let mut templates = Map::new();
            for affordance in affordances {
                templates.insert(affordance.name.clone(), render_hal_forms_template(affordance));
            }
            meta.insert(HAL_FORMS_TEMPLATES.to_string(), Value::Object(templates));
        }
        _ => {}
    }

    if !meta.is_empty() {
        object.insert("meta".to_string(), Value::Object(meta));
    }

    Value::Object(object)
}

fn render_affordance(affordance: &Affordance, relation: &str, href: &str) -> Value {
    let target = affordance.target.as_deref().unwrap_or(href);
    let mut result = Map::new();
    result.insert("name".to_string(), json!(affordance.name));
    result.insert("link".to_string(), json!({ "rel": relation, "href": target }));
    result.insert("httpMethod".to_string(), json!(affordance.method));
    if !affordance.input_properties.is_empty() {
        result.insert("inputProperties".to_string(), json!(affordance.input_properties));
    }
    if !affordance.query_properties.is_empty() {
        result.insert("queryProperties".to_string(), json!(affordance.query_properties));
    }
    Value::Object(result)
}

fn render_hal_forms_template(affordance: &Affordance) -> Value {
    let mut template = Map::new();
    template.insert("method".to_string(), json!(affordance.method));
    template.insert("properties".to_string(), json!(affordance.input_properties));
    if let Some(target) = &affordance.target {
        template.insert("target".to_string(), json!(target));
    }
    Value::Object(template)
}

/// Parse a JSON:API links object.
///
/// # Errors
///
/// Returns `CodecError::InvalidDocument` if the value is not a links object,
/// a relation maps to an array, or a link object has no string `href`.
pub fn parse_links(value: &Value) -> Result<Links, CodecError> {
    let Some(map) = value.as_object() else {
        return Err(CodecError::invalid_document(format!(
            "links must be an object, got {}",
            json_type_name(value)
        )));
    };

    let mut links = Links::new();
    for (relation, link) in map {
        match link {
            Value::Null => continue,
            Value::String(href) => links.push(Link::new(href.clone(), relation.clone())),
            Value::Object(object) => links.push(parse_link_object(relation, object)?),
            other => {
                return Err(CodecError::invalid_document(format!(
                    "link '{}' must be a string or an object, got {}",
                    relation,
                    json_type_name(other)
                )))
            }
        }
    }
    Ok(links)
}

fn parse_link_object(relation: &str, object: &Map<String, Value>) -> Result<Link, CodecError> {
    let href = object
        .get("href")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::invalid_document(format!("link '{}' has no href", relation)))?;

    let mut link = Link::new(href, relation);
    let string = |key: &str| object.get(key).and_then(Value::as_str).map(String::from);
    link.title = string("title");
    link.media_type = string("type");
    link.hreflang = string("hreflang");

    if let Some(Value::Object(meta)) = object.get("meta") {
        for (key, value) in meta {
            let text = value.as_str().map(String::from);
            match key.as_str() {
                "title" if link.title.is_none() => link.title = text,
                "type" if link.media_type.is_none() => link.media_type = text,
                "hreflang" if link.hreflang.is_none() => link.hreflang = text,
                "title" | "type" | "hreflang" => {}
                "media" => link.media = text,
                "profile" => link.profile = text,
                "deprecation" => link.deprecation = text,
                "name" => link.name = text,
                "isTemplated" => link.templated = value.as_bool().unwrap_or(false),
                _ => {
                    link.meta.insert(key.clone(), value.clone());
                }
            }
        }
    }
    Ok(link)
}

/// Read the top level links of a wire document.
///
/// # Errors
///
/// Returns `CodecError::InvalidJson` for malformed JSON and
/// `CodecError::InvalidDocument` for malformed links.
pub fn find_links(json: &str) -> Result<Links, CodecError> {
    let document: Value = serde_json::from_str(json)?;
    match document.get("links") {
        Some(links) => parse_links(links),
        None => Ok(Links::new()),
    }
}

/// Find the top level link with the given relation in a wire document.
pub fn find_link_with_rel(json: &str, relation: &str) -> Result<Option<Link>, CodecError> {
    let links = find_links(json)?;
    Ok(links.get(relation).cloned())
}

fn is_template(href: &str) -> bool {
    match (href.find('{'), href.rfind('}')) {
        (Some(open), Some(close)) => open < close,
        _ => false,
    }
}

/// Characters outside the URI reserved and unreserved sets, minus `%` so
/// existing escapes are kept.
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'%');

const TEMPLATED_HREF: &AsciiSet = &HREF.remove(b'{').remove(b'}');

/// Percent-encode everything outside the URI reserved and unreserved sets.
///
/// Existing `%XX` escapes are kept. Template braces survive when `templated`.
pub fn encode_href(href: &str, templated: bool) -> String {
    let set = if templated { TEMPLATED_HREF } else { HREF };
    utf8_percent_encode(href, set).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JsonApiConfiguration {
        JsonApiConfiguration::default()
    }

    #[test]
    fn links_keep_insertion_order() {
        let links = Links::new()
            .and(Link::self_link("http://localhost/movies"))
            .and(Link::new("http://localhost/movies?page=0", "first"))
            .and(Link::new("http://localhost/movies?page=1", "next"));

        let relations: Vec<&str> = links.relations().collect();
        assert_eq!(relations, vec!["self", "first", "next"]);
    }

    #[test]
    fn same_relation_replaces_in_place() {
        let links = Links::new()
            .and(Link::self_link("http://a"))
            .and(Link::new("http://b", "next"))
            .and(Link::self_link("http://c"));

        assert_eq!(links.len(), 2);
        assert_eq!(links.get("self").unwrap().href, "http://c");
        assert_eq!(links.relations().next(), Some("self"));
    }

    #[test]
    fn simple_link_renders_as_string() {
        let links = Links::of([Link::self_link("http://localhost/movies/1")]);
        assert_eq!(
            render_links(&links, &config()),
            json!({ "self": "http://localhost/movies/1" })
        );
    }

    #[test]
    fn complex_link_renders_as_object() {
        let link = Link::new("http://localhost/movies", "related")
            .with_title("Movies")
            .with_media_type("application/vnd.api+json")
            .with_media("screen")
            .with_meta("count", json!(3));

        assert_eq!(
            render_link(&link, &config()),
            json!({
                "href": "http://localhost/movies",
                "title": "Movies",
                "type": "application/vnd.api+json",
                "meta": { "count": 3, "media": "screen" }
            })
        );
    }

    #[test]
    fn legacy_link_properties_stay_in_meta() {
        let link = Link::new("http://localhost/movies", "related").with_title("Movies");
        let config = config().with_json_api11_link_properties_removed_from_link_meta(false);

        assert_eq!(
            render_link(&link, &config),
            json!({
                "href": "http://localhost/movies",
                "title": "Movies",
                "meta": { "title": "Movies" }
            })
        );
    }

    #[test]
    fn templated_link_is_flagged() {
        let link = Link::new("http://localhost/movies{?page,size}", "search");
        assert!(link.templated);
        assert_eq!(
            render_link(&link, &config()),
            json!({
                "href": "http://localhost/movies{?page,size}",
                "meta": { "isTemplated": true }
            })
        );
    }

    #[test]
    fn href_is_percent_encoded_unless_exempt() {
        let link = Link::new("http://localhost/movies?page[number]=1", "next");
        assert_eq!(
            render_link(&link, &config()),
            json!("http://localhost/movies?page%5Bnumber%5D=1")
        );

        let config = config().with_link_not_url_encoded("next");
        assert_eq!(
            render_link(&link, &config),
            json!("http://localhost/movies?page[number]=1")
        );
    }

    #[test]
    fn encode_href_keeps_existing_escapes() {
        assert_eq!(encode_href("http://x/a%20b c", false), "http://x/a%20b%20c");
        assert_eq!(encode_href("http://x/ü", false), "http://x/%C3%BC");
    }

    #[test]
    fn encode_href_brackets_and_template_braces() {
        assert_eq!(
            encode_href("http://x/movies?page[number]=1", false),
            "http://x/movies?page%5Bnumber%5D=1"
        );
        assert_eq!(
            encode_href("http://x/movies/{id}", true),
            "http://x/movies/{id}"
        );
        assert_eq!(
            encode_href("http://x/movies/{id}", false),
            "http://x/movies/%7Bid%7D"
        );
    }

    #[test]
    fn affordances_hidden_by_default() {
        let link = Link::self_link("http://localhost/movies")
            .with_affordance(Affordance::new("createMovie", "post"));
        assert_eq!(render_link(&link, &config()), json!("http://localhost/movies"));
    }

    #[test]
    fn proprietary_affordances_skip_get() {
        let link = Link::self_link("http://localhost/movies")
            .with_affordance(Affordance::new("listMovies", "GET"))
            .with_affordance(
                Affordance::new("createMovie", "POST")
                    .with_input_property(AffordanceProperty::new("title").with_type("text").required(true)),
            );
        let config = config().with_affordances_rendered_as_link_meta(AffordanceRendering::Proprietary);

        assert_eq!(
            render_link(&link, &config),
            json!({
                "href": "http://localhost/movies",
                "meta": {
                    "affordances": [{
                        "name": "createMovie",
                        "link": { "rel": "self", "href": "http://localhost/movies" },
                        "httpMethod": "POST",
                        "inputProperties": [{ "name": "title", "type": "text", "required": true }]
                    }]
                }
            })
        );
    }

    #[test]
    fn hal_forms_affordances() {
        let link = Link::self_link("http://localhost/movies/1").with_affordance(
            Affordance::new("updateMovie", "patch").with_input_property(AffordanceProperty::new("title")),
        );
        let config = config().with_affordances_rendered_as_link_meta(AffordanceRendering::HalForms);

        let rendered = render_link(&link, &config);
        assert_eq!(
            rendered["meta"]["hal-forms-templates"],
            json!({ "updateMovie": { "method": "PATCH", "properties": [{ "name": "title" }] } })
        );
        assert!(rendered["meta"].get("affordances").is_none());
    }

    #[test]
    fn parse_string_and_object_links() {
        let links = parse_links(&json!({
            "self": "http://localhost/movies/1",
            "related": {
                "href": "http://localhost/directors",
                "title": "Directors",
                "meta": { "media": "screen", "count": 2 }
            },
            "prev": null
        }))
        .unwrap();

        assert_eq!(links.len(), 2);
        let related = links.get("related").unwrap();
        assert_eq!(related.title.as_deref(), Some("Directors"));
        assert_eq!(related.media.as_deref(), Some("screen"));
        assert_eq!(related.meta.get("count"), Some(&json!(2)));
    }

    #[test]
    fn parse_rejects_link_arrays() {
        let result = parse_links(&json!({ "self": ["http://a", "http://b"] }));
        assert!(matches!(result, Err(CodecError::InvalidDocument { .. })));
    }

    #[test]
    fn find_link_in_document() {
        let json = r#"{"data": [], "links": {"self": "http://localhost/movies", "next": "http://localhost/movies?page=2"}}"#;
        let next = find_link_with_rel(json, "next").unwrap().unwrap();
        assert_eq!(next.href, "http://localhost/movies?page=2");
        assert!(find_link_with_rel(json, "prev").unwrap().is_none());
    }
}
