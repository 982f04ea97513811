//! Resource metadata as listed in `ResourceList`.

use serde_json::{json, Map, Value};

use super::resource_names;

/// `canSet` of a resource entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertySetAccess {
    #[default]
    None,
    Full,
    Partial,
}

impl PropertySetAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertySetAccess::None => "none",
            PropertySetAccess::Full => "full",
            PropertySetAccess::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(PropertySetAccess::None),
            "full" => Some(PropertySetAccess::Full),
            "partial" => Some(PropertySetAccess::Partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyResourceColumn {
    pub title: String,
    pub property: Option<String>,
    pub link: Option<String>,
}

impl PropertyResourceColumn {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("title".into(), self.title.clone().into());
        if let Some(property) = &self.property {
            map.insert("property".into(), property.clone().into());
        }
        if let Some(link) = &self.link {
            map.insert("link".into(), link.clone().into());
        }
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Option<Self> {
        let s = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            title: s("title")?,
            property: s("property"),
            link: s("link"),
        })
    }
}

/// One entry of the resource list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyMetadata {
    pub resource: String,
    pub can_get: bool,
    pub can_set: PropertySetAccess,
    pub can_subscribe: bool,
    pub require_res_id: bool,
    pub media_types: Vec<String>,
    pub encodings: Vec<String>,
    pub schema: Option<Value>,
    pub can_paginate: bool,
    pub columns: Vec<PropertyResourceColumn>,
}

impl PropertyMetadata {
    /// A gettable, read-only resource with JSON media type and ASCII encoding.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            can_get: true,
            can_set: PropertySetAccess::None,
            can_subscribe: false,
            require_res_id: false,
            media_types: vec!["application/json".into()],
            encodings: vec!["ASCII".into()],
            schema: None,
            can_paginate: false,
            columns: Vec::new(),
        }
    }

    pub fn with_set(mut self, access: PropertySetAccess) -> Self {
        self.can_set = access;
        self
    }

    pub fn with_subscribe(mut self, can_subscribe: bool) -> Self {
        self.can_subscribe = can_subscribe;
        self
    }

    pub fn with_encodings<I, S>(mut self, encodings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encodings = encodings.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "resource": self.resource,
            "canGet": self.can_get,
            "canSet": self.can_set.as_str(),
            "canSubscribe": self.can_subscribe,
            "requireResId": self.require_res_id,
            "mediaTypes": self.media_types,
            "encodings": self.encodings,
            "canPaginate": self.can_paginate,
        });
        if let Some(map) = value.as_object_mut() {
            if let Some(schema) = &self.schema {
                map.insert("schema".into(), schema.clone());
            }
            if !self.columns.is_empty() {
                map.insert(
                    "columns".into(),
                    Value::Array(self.columns.iter().map(PropertyResourceColumn::to_json).collect()),
                );
            }
        }
        value
    }

    /// Reads an entry leniently: absent fields take the common rules defaults.
    pub fn from_json(value: &Value) -> Option<Self> {
        let resource = value.get("resource")?.as_str()?;
        let mut meta = Self::new(resource);
        let b = |key: &str, default: bool| value.get(key).and_then(Value::as_bool).unwrap_or(default);
        let strings = |key: &str| {
            value.get(key).and_then(Value::as_array).map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
        };
        meta.can_get = b("canGet", true);
        meta.can_set = value
            .get("canSet")
            .and_then(Value::as_str)
            .and_then(PropertySetAccess::parse)
            .unwrap_or_default();
        meta.can_subscribe = b("canSubscribe", false);
        meta.require_res_id = b("requireResId", false);
        if let Some(media_types) = strings("mediaTypes") {
            meta.media_types = media_types;
        }
        if let Some(encodings) = strings("encodings") {
            meta.encodings = encodings;
        }
        meta.schema = value.get("schema").cloned();
        meta.can_paginate = b("canPaginate", false);
        meta.columns = value
            .get("columns")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(PropertyResourceColumn::from_json).collect())
            .unwrap_or_default();
        Some(meta)
    }
}

/// The resources every responder lists unless configured otherwise.
pub fn default_resources() -> Vec<PropertyMetadata> {
    vec![
        PropertyMetadata::new(resource_names::DEVICE_INFO),
        PropertyMetadata::new(resource_names::CHANNEL_LIST),
        PropertyMetadata::new(resource_names::JSON_SCHEMA),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json() {
        let meta = PropertyMetadata::new("X-Volume")
            .with_set(PropertySetAccess::Partial)
            .with_subscribe(true);
        let json = meta.to_json();
        assert_eq!(json["resource"], "X-Volume");
        assert_eq!(json["canSet"], "partial");
        assert_eq!(json["canSubscribe"], true);
        assert!(json.get("columns").is_none());
        assert_eq!(PropertyMetadata::from_json(&json), Some(meta));
    }

    #[test]
    fn test_lenient_parse() {
        let meta = PropertyMetadata::from_json(&json!({ "resource": "ModeList", "canSet": "bogus" })).unwrap();
        assert!(meta.can_get);
        assert_eq!(meta.can_set, PropertySetAccess::None);
        assert_eq!(meta.encodings, vec!["ASCII".to_string()]);
        assert!(PropertyMetadata::from_json(&json!({ "canGet": true })).is_none());
    }

    #[test]
    fn test_columns() {
        let mut meta = PropertyMetadata::new("ProgramList");
        meta.columns.push(PropertyResourceColumn {
            title: "Name".into(),
            property: Some("name".into()),
            link: None,
        });
        let json = meta.to_json();
        assert_eq!(json["columns"][0]["property"], "name");
        assert_eq!(PropertyMetadata::from_json(&json).unwrap().columns, meta.columns);
    }

    #[test]
    fn test_default_resources() {
        let names: Vec<_> = default_resources().into_iter().map(|m| m.resource).collect();
        assert_eq!(names, ["DeviceInfo", "ChannelList", "JSONSchema"]);
    }
}
