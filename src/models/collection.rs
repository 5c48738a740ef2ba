//! Collection tree models
//!
//! A Collection is a tree of folders and requests in the Postman v2.1 shape.
//! Unknown fields are kept in `extra` maps so a partition can be handed to an
//! external engine without losing auth, variables or scripts.

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Root of a test collection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Engine-assigned id (only present in result trees)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Collection metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,

    /// Top-level items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<Item>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Collection metadata (`info` object)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Position among the top-level folders of the source collection
    #[serde(
        rename = "originalIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_index: Option<usize>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A node of the collection tree
///
/// A node with an `item` key is a folder, anything else is a request. A
/// malformed child is a parse error; it never turns its folder into a request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item {
    Folder(Folder),
    Request(Request),
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(fields) = &value else {
            return Err(de::Error::custom("collection item must be an object"));
        };

        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();

        if fields.contains_key("item") {
            serde_json::from_value(value)
                .map(Item::Folder)
                .map_err(|e| de::Error::custom(format!("folder '{name}': {e}")))
        } else {
            serde_json::from_value(value)
                .map(Item::Request)
                .map_err(|e| de::Error::custom(format!("request '{name}': {e}")))
        }
    }
}

/// Named group of items
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub item: Vec<Item>,

    /// Set on top-level folders when they are promoted to partitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Leaf node: one HTTP call plus its checks
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSpec>,

    /// Declarative checks understood by the built-in runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Expectation>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request definition, either a bare URL or a full object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestSpec {
    Url(String),
    Detailed(RequestDefinition),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<UrlSpec>,

    /// A header list, or the raw `Key: value` lines form
    #[serde(
        default,
        deserialize_with = "deserialize_headers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub header: Vec<Header>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlSpec {
    Raw(String),
    Parts {
        #[serde(default)]
        raw: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl UrlSpec {
    pub fn raw(&self) -> Option<&str> {
        match self {
            UrlSpec::Raw(url) => Some(url),
            UrlSpec::Parts { raw, .. } => raw.as_deref(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<Header>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Headers {
        Lines(String),
        List(Vec<Header>),
    }

    Ok(match Option::<Headers>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Headers::List(headers)) => headers,
        Some(Headers::Lines(text)) => parse_header_lines(&text),
    })
}

/// Parse `Key: value` lines, skipping lines without a colon
fn parse_header_lines(text: &str) -> Vec<Header> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| Header {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
            disabled: false,
        })
        .filter(|header| !header.key.is_empty())
        .collect()
}

/// Checks evaluated against a response by the built-in runner
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_contains: Vec<String>,

    /// Header names that must be present in the response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
}

impl RequestSpec {
    /// HTTP method, defaulting to GET
    pub fn method(&self) -> &str {
        match self {
            RequestSpec::Url(_) => "GET",
            RequestSpec::Detailed(def) => def.method.as_deref().unwrap_or("GET"),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            RequestSpec::Url(url) => Some(url),
            RequestSpec::Detailed(def) => def.url.as_ref().and_then(UrlSpec::raw),
        }
    }

    /// Enabled headers
    pub fn headers(&self) -> impl Iterator<Item = &Header> {
        let headers: &[Header] = match self {
            RequestSpec::Url(_) => &[],
            RequestSpec::Detailed(def) => &def.header,
        };
        headers.iter().filter(|h| !h.disabled)
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            RequestSpec::Url(_) => None,
            RequestSpec::Detailed(def) => def.body.as_ref().and_then(|b| b.raw.as_deref()),
        }
    }
}

/// A folder-like node: something with a name and child items
pub trait Container {
    fn id(&self) -> Option<&str>;
    fn label(&self) -> &str;
    fn children(&self) -> &[Item];
}

impl Container for Collection {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn label(&self) -> &str {
        self.name()
    }

    fn children(&self) -> &[Item] {
        self.item.as_deref().unwrap_or(&[])
    }
}

impl Container for Folder {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn children(&self) -> &[Item] {
        &self.item
    }
}

impl Item {
    pub fn id(&self) -> Option<&str> {
        match self {
            Item::Folder(folder) => folder.id.as_deref(),
            Item::Request(request) => request.id.as_deref(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Folder(folder) => folder.label(),
            Item::Request(request) => &request.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Item::Folder(_))
    }

    /// Number of requests in this subtree
    pub fn request_count(&self) -> usize {
        match self {
            Item::Folder(folder) => folder.item.iter().map(Item::request_count).sum(),
            Item::Request(_) => 1,
        }
    }

}

impl Collection {
    /// Collection name, empty when `info` is missing
    pub fn name(&self) -> &str {
        self.info.as_ref().map(|i| i.name.as_str()).unwrap_or("")
    }

    /// Load a collection from a JSON or YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read collection: {}", path.display()))?;

        let collection: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML collection: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON collection: {}", path.display()))?
        };

        Ok(collection)
    }
}

#[cfg(test)]
impl Info {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl Item {
    pub fn folder(name: impl Into<String>, items: Vec<Item>) -> Self {
        Item::Folder(Folder {
            name: Some(name.into()),
            item: items,
            ..Default::default()
        })
    }

    pub fn request(name: impl Into<String>, url: impl Into<String>) -> Self {
        Item::Request(Request {
            name: name.into(),
            request: Some(RequestSpec::Url(url.into())),
            ..Default::default()
        })
    }

    /// Attach an id to this node
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Item::Folder(folder) => folder.id = Some(id.into()),
            Item::Request(request) => request.id = Some(id.into()),
        }
        self
    }
}

#[cfg(test)]
impl Collection {
    pub fn new(name: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            id: None,
            info: Some(Info::new(name)),
            item: Some(items),
            extra: Map::new(),
        }
    }
}

/// Check if file is YAML based on extension
pub(crate) fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "info": {
            "_postman_id": "abc",
            "name": "API",
            "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"
        },
        "item": [
            {
                "name": "Users",
                "auth": { "type": "noauth" },
                "item": [
                    {
                        "name": "GetUser",
                        "request": {
                            "method": "GET",
                            "url": { "raw": "http://localhost/users/1", "host": ["localhost"] },
                            "header": [
                                { "key": "Accept", "value": "application/json" },
                                { "key": "X-Off", "value": "1", "disabled": true }
                            ]
                        },
                        "expect": { "status": 200, "body_contains": ["id"] }
                    },
                    { "name": "Ping", "request": "http://localhost/ping" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_postman_shape() {
        let collection: Collection = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(collection.name(), "API");

        let items = collection.children();
        assert_eq!(items.len(), 1);
        let Item::Folder(users) = &items[0] else {
            panic!("expected a folder");
        };
        assert_eq!(users.label(), "Users");
        assert!(users.extra.contains_key("auth"));

        let Item::Request(get_user) = &users.item[0] else {
            panic!("expected a request");
        };
        let spec = get_user.request.as_ref().unwrap();
        assert_eq!(spec.method(), "GET");
        assert_eq!(spec.url(), Some("http://localhost/users/1"));
        assert_eq!(spec.headers().count(), 1);
        assert_eq!(get_user.expect.as_ref().unwrap().status, Some(200));

        let Item::Request(ping) = &users.item[1] else {
            panic!("expected a request");
        };
        assert_eq!(ping.request.as_ref().unwrap().url(), Some("http://localhost/ping"));
    }

    #[test]
    fn test_unknown_fields_survive_serialization() {
        let collection: Collection = serde_json::from_str(SAMPLE).unwrap();
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["info"]["_postman_id"], "abc");
        assert_eq!(value["item"][0]["auth"]["type"], "noauth");
        assert!(value["info"].get("originalIndex").is_none());
    }

    #[test]
    fn test_missing_sections_parse() {
        let collection: Collection = serde_json::from_str("{}").unwrap();
        assert!(collection.info.is_none());
        assert!(collection.item.is_none());
        assert_eq!(collection.name(), "");
    }

    #[test]
    fn test_request_count() {
        let folder = Item::folder(
            "A",
            vec![
                Item::request("r1", "http://x"),
                Item::folder("B", vec![Item::request("r2", "http://x")]),
            ],
        );
        assert_eq!(folder.request_count(), 2);
        assert!(folder.is_folder());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "info:\n  name: API\nitem:\n  - name: Users\n    item:\n      - name: GetUser\n        request: http://localhost/users"
        )
        .unwrap();

        let collection = Collection::load(file.path()).unwrap();
        assert_eq!(collection.name(), "API");
        assert_eq!(collection.children()[0].request_count(), 1);
    }

    #[test]
    fn test_string_header_keeps_folder() {
        let json = r#"{
            "info": { "name": "API" },
            "item": [
                {
                    "name": "Users",
                    "item": [
                        {
                            "name": "GetUser",
                            "request": {
                                "method": "GET",
                                "url": "http://localhost/users/1",
                                "header": "Accept: application/json\nX-Trace: abc"
                            }
                        }
                    ]
                }
            ]
        }"#;
        let mut collection: Collection = serde_json::from_str(json).unwrap();

        let Item::Folder(users) = &collection.children()[0] else {
            panic!("expected a folder");
        };
        let Item::Request(get_user) = &users.item[0] else {
            panic!("expected a request");
        };
        let headers: Vec<_> = get_user
            .request
            .as_ref()
            .unwrap()
            .headers()
            .map(|h| (h.key.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(headers, vec![("Accept", "application/json"), ("X-Trace", "abc")]);

        let partitions = crate::partition::partition(&mut collection).unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].request_count(), 1);
    }

    #[test]
    fn test_null_header_value_keeps_nested_folder() {
        let json = r#"{
            "info": { "name": "API" },
            "item": [
                {
                    "name": "Users",
                    "item": [
                        {
                            "name": "Outer",
                            "item": [
                                {
                                    "name": "GetUser",
                                    "request": {
                                        "url": "http://localhost/users/1",
                                        "header": [{ "key": "X-Empty", "value": null }]
                                    }
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let collection: Collection = serde_json::from_str(json).unwrap();

        let Item::Folder(users) = &collection.children()[0] else {
            panic!("expected a folder");
        };
        let Item::Folder(outer) = &users.item[0] else {
            panic!("nested 'Outer' should stay a folder");
        };
        let Item::Request(get_user) = &outer.item[0] else {
            panic!("expected a request");
        };
        let header = get_user.request.as_ref().unwrap().headers().next().unwrap();
        assert_eq!(header.key, "X-Empty");
        assert_eq!(header.value, "");
    }

    #[test]
    fn test_malformed_child_is_a_parse_error() {
        let json = r#"{
            "info": { "name": "API" },
            "item": [
                { "name": "Users", "item": [ { "name": "Bad", "request": { "method": 5 } } ] }
            ]
        }"#;
        let err = serde_json::from_str::<Collection>(json).unwrap_err();
        assert!(err.to_string().contains("folder 'Users'"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Collection::load("/nonexistent/collection.json").is_err());
    }
}
