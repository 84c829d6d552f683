//! Sparse fieldsets (`fields[type]=a,b`).

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

/// Per type allow-lists of attribute names.
///
/// ```
/// use jsonapi_codec::SparseFieldsets;
/// use serde_json::json;
///
/// let fields = SparseFieldsets::from_query("fields[movies]=title&page[number]=1");
/// let attributes = json!({ "title": "Star Wars", "year": 1977 });
/// let filtered = fields.apply(attributes.as_object().unwrap(), "movies");
/// assert_eq!(serde_json::Value::Object(filtered), json!({ "title": "Star Wars" }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseFieldsets {
    fields: IndexMap<String, IndexSet<String>>,
}

impl SparseFieldsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `names` for `json_api_type`, extending an existing allow-list.
    pub fn with_fields<S: Into<String>>(mut self, json_api_type: impl Into<String>, names: impl IntoIterator<Item = S>) -> Self {
        self.fields
            .entry(json_api_type.into())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Parse `fields[type]=a,b` parameters from a query string.
    ///
    /// Other parameters are ignored. A leading `?` is accepted.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut fieldsets = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let Some(json_api_type) = key
                .strip_prefix("fields[")
                .and_then(|rest| rest.strip_suffix(']'))
            else {
                continue;
            };
            let names = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>();
            fieldsets = fieldsets.with_fields(json_api_type, names);
        }
        fieldsets
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn allowed(&self, json_api_type: &str) -> Option<&IndexSet<String>> {
        self.fields.get(json_api_type)
    }

    /// Project `attributes` onto the allow-list for `json_api_type`.
    ///
    /// Types without an allow-list pass through unchanged.
    pub fn apply(&self, attributes: &Map<String, Value>, json_api_type: &str) -> Map<String, Value> {
        match self.allowed(json_api_type) {
            None => attributes.clone(),
            Some(allowed) => attributes
                .iter()
                .filter(|(key, _)| allowed.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Whether relationship `name` of a `json_api_type` resource is rendered.
    pub fn includes_relationship(&self, json_api_type: &str, name: &str) -> bool {
        self.allowed(json_api_type)
            .map_or(true, |allowed| allowed.contains(name))
    }
}
