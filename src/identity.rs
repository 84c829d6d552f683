//! Resource identity resolution.
//!
//! Domain types declare their JSON:API capabilities through a
//! [`ResourceDescriptor`] instead of annotations. Resolution works on the
//! serde representation of the object (a JSON object map), so any
//! `Serialize`/`Deserialize` type can take part.
//!
//! # Resolution order
//!
//! | Step | id | type |
//! |------|----|------|
//! | 1 | - | class level type (`with_type_for_class`) |
//! | 2 | explicit id field | explicit type field |
//! | 3 | primary key field | - |
//! | 4 | field named `id` | - |
//! | 5 | - | configured class->type mapping, else the class name (lower cased, pluralized) |

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CodecError;
use crate::types::{pluralize, JsonApiConfiguration};

/// Name of the implicit id field.
pub const ID_LITERAL: &str = "id";
/// Name of the type member.
pub const TYPE_LITERAL: &str = "type";

/// Declared type of the id field, used when writing ids back on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdKind {
    #[default]
    String,
    /// 64 bit integer.
    Long,
    /// 32 bit integer.
    Int,
    Uuid,
}

impl IdKind {
    /// A value of this kind standing in for an absent id.
    pub(crate) fn placeholder(self) -> Value {
        match self {
            IdKind::String => Value::String(String::new()),
            IdKind::Long | IdKind::Int => Value::from(0),
            IdKind::Uuid => Value::String(uuid::Uuid::nil().to_string()),
        }
    }

    fn name(self) -> &'static str {
        match self {
            IdKind::String => "string",
            IdKind::Long => "64 bit integer",
            IdKind::Int => "32 bit integer",
            IdKind::Uuid => "UUID",
        }
    }
}

/// A field that holds related objects.
#[derive(Debug, Clone)]
pub struct RelationshipField {
    /// Relationship name in the document.
    pub name: String,
    /// Field name in the serialized object.
    pub field: String,
    /// To-many when true.
    pub many: bool,
    /// Descriptor of the related objects.
    pub target: fn() -> ResourceDescriptor,
}

/// Which identity member to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Id,
    Type,
}

/// Declared JSON:API capabilities of a domain type.
#[derive(Debug, Clone, Default)]
pub struct ResourceDescriptor {
    /// Bare class name, e.g. `Movie`.
    pub class_name: String,
    /// Explicit class level JSON:API type.
    pub type_for_class: Option<String>,
    pub id_field: Option<String>,
    pub type_field: Option<String>,
    /// Legacy persistence primary key, lower priority than `id_field`.
    pub primary_key_field: Option<String>,
    pub id_kind: IdKind,
    pub meta_fields: Vec<String>,
    pub relationships: Vec<RelationshipField>,
    /// Class names assignable to this type when deserializing polymorphic data.
    pub subtypes: Vec<String>,
    /// Field receiving the concrete class name of a polymorphic target.
    pub discriminator: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_type_for_class(mut self, json_api_type: impl Into<String>) -> Self {
        self.type_for_class = Some(json_api_type.into());
        self
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn with_type_field(mut self, field: impl Into<String>) -> Self {
        self.type_field = Some(field.into());
        self
    }

    pub fn with_primary_key_field(mut self, field: impl Into<String>) -> Self {
        self.primary_key_field = Some(field.into());
        self
    }

    pub fn with_id_kind(mut self, kind: IdKind) -> Self {
        self.id_kind = kind;
        self
    }

    pub fn with_meta_field(mut self, field: impl Into<String>) -> Self {
        self.meta_fields.push(field.into());
        self
    }

    /// Declare a to-one relationship stored in `field`.
    pub fn with_to_one<T: Resource>(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.relationships.push(RelationshipField {
            name: name.into(),
            field: field.into(),
            many: false,
            target: T::descriptor,
        });
        self
    }

    /// Declare a to-many relationship stored in `field`.
    pub fn with_to_many<T: Resource>(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.relationships.push(RelationshipField {
            name: name.into(),
            field: field.into(),
            many: true,
            target: T::descriptor,
        });
        self
    }

    pub fn with_subtype(mut self, class_name: impl Into<String>) -> Self {
        self.subtypes.push(class_name.into());
        self
    }

    pub fn with_discriminator(mut self, field: impl Into<String>) -> Self {
        self.discriminator = Some(field.into());
        self
    }

    /// Whether objects of `class_name` may be produced for this type.
    pub fn is_assignable_from(&self, class_name: &str) -> bool {
        self.class_name == class_name || self.subtypes.iter().any(|s| s == class_name)
    }

    fn is_relationship_field(&self, field: &str) -> bool {
        self.relationships.iter().any(|r| r.field == field)
    }
}

/// A domain type that can be rendered as a JSON:API resource.
///
/// ```
/// use jsonapi_codec::{Resource, ResourceDescriptor};
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
/// ```
pub trait Resource {
    /// Capabilities of the type, used as the deserialization target.
    fn descriptor() -> ResourceDescriptor;

    /// Capabilities of this value. Polymorphic types return the concrete class.
    fn instance_descriptor(&self) -> ResourceDescriptor {
        Self::descriptor()
    }
}

/// A resolved identity member: where it came from and its rendered value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceField {
    /// Field name in the object, or `type` for derived types.
    pub name: String,
    pub value: String,
}

impl ResourceField {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Resolve the JSON:API id of an object.
///
/// # Errors
///
/// Returns `CodecError::MissingIdentifier` if no id capability yields a value.
pub fn resolve_id(
    fields: &Map<String, Value>,
    descriptor: &ResourceDescriptor,
) -> Result<ResourceField, CodecError> {
    let missing = || CodecError::MissingIdentifier {
        class: descriptor.class_name.clone(),
    };

    let field = descriptor
        .id_field
        .as_deref()
        .or(descriptor.primary_key_field.as_deref())
        .unwrap_or(ID_LITERAL);

    let value = fields.get(field).and_then(scalar_to_string).ok_or_else(missing)?;
    Ok(ResourceField::new(field, value))
}

/// Resolve the JSON:API type of an object. Always succeeds.
pub fn resolve_type(
    fields: &Map<String, Value>,
    descriptor: &ResourceDescriptor,
    config: &JsonApiConfiguration,
) -> ResourceField {
    if let Some(json_api_type) = &descriptor.type_for_class {
        return ResourceField::new(TYPE_LITERAL, json_api_type.clone());
    }

    if let Some(field) = &descriptor.type_field {
        if let Some(value) = fields.get(field).and_then(scalar_to_string) {
            return ResourceField::new(field.clone(), value);
        }
    }

    if let Some(json_api_type) = config.type_for_class(&descriptor.class_name) {
        return ResourceField::new(TYPE_LITERAL, json_api_type);
    }

    ResourceField::new(TYPE_LITERAL, derive_type_name(&descriptor.class_name, config))
}

/// Derive a type from a class name per configuration.
pub fn derive_type_name(class_name: &str, config: &JsonApiConfiguration) -> String {
    let mut json_api_type = class_name.to_string();
    if config.lower_cased_type_rendered {
        json_api_type = json_api_type.to_lowercase();
    }
    if config.pluralized_type_rendered {
        json_api_type = pluralize(&json_api_type);
    }
    json_api_type
}

/// Write an identity member back into a serialized object.
///
/// Ids are coerced to the declared [`IdKind`]. A type is only written when the
/// descriptor declares a type field.
///
/// # Errors
///
/// Returns `CodecError::InvalidIdentifier` if the value does not parse as the declared kind.
pub fn set_field(
    fields: &mut Map<String, Value>,
    descriptor: &ResourceDescriptor,
    which: IdentityField,
    value: &str,
) -> Result<(), CodecError> {
    match which {
        IdentityField::Id => {
            let field = descriptor
                .id_field
                .as_deref()
                .or(descriptor.primary_key_field.as_deref())
                .unwrap_or(ID_LITERAL);
            let coerced = coerce_id(field, value, descriptor.id_kind)?;
            fields.insert(field.to_string(), coerced);
        }
        IdentityField::Type => {
            if let Some(field) = &descriptor.type_field {
                fields.insert(field.clone(), Value::String(value.to_string()));
            }
        }
    }
    Ok(())
}

fn coerce_id(field: &str, value: &str, kind: IdKind) -> Result<Value, CodecError> {
    let invalid = || CodecError::InvalidIdentifier {
        field: field.to_string(),
        value: value.to_string(),
        expected: kind.name(),
    };

    match kind {
        IdKind::String => Ok(Value::String(value.to_string())),
        IdKind::Long => value
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        IdKind::Int => value
            .parse::<i32>()
            .map(Value::from)
            .map_err(|_| invalid()),
        IdKind::Uuid => uuid::Uuid::parse_str(value)
            .map(|uuid| Value::String(uuid.to_string()))
            .map_err(|_| invalid()),
    }
}

/// Collect the declared meta fields of an object. Null values are skipped.
pub fn resolve_meta(fields: &Map<String, Value>, descriptor: &ResourceDescriptor) -> Map<String, Value> {
    descriptor
        .meta_fields
        .iter()
        .filter_map(|name| match fields.get(name) {
            Some(Value::Null) | None => None,
            Some(value) => Some((name.clone(), value.clone())),
        })
        .collect()
}

/// Compute the attributes of an object.
///
/// Removes the identity fields, the `links` and `relationships` keys, declared
/// meta fields and declared relationship fields.
pub fn extract_attributes(
    fields: &Map<String, Value>,
    descriptor: &ResourceDescriptor,
    id: Option<&ResourceField>,
    json_api_type: &ResourceField,
) -> Map<String, Value> {
    let excluded = |key: &str| {
        key == ID_LITERAL
            || key == TYPE_LITERAL
            || key == "links"
            || key == "relationships"
            || id.is_some_and(|f| f.name == key)
            || json_api_type.name == key
            || descriptor.primary_key_field.as_deref() == Some(key)
            || descriptor.discriminator.as_deref() == Some(key)
            || descriptor.meta_fields.iter().any(|m| m == key)
            || descriptor.is_relationship_field(key)
    };

    let attributes: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| !excluded(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if attributes.len() < fields.len() {
        debug!(
            class = %descriptor.class_name,
            removed = fields.len() - attributes.len(),
            "separated identity, meta and relationship fields from attributes"
        );
    }
    attributes
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
