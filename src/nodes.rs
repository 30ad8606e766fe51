//! Node operations on a remote XML file.
//!
//! | Function | Method | Endpoint |
//! |----------|--------|----------|
//! | [`create_node`] | POST | `/create` |
//! | [`read_node`] | GET | `/read` |
//! | [`update_node`] | PUT | `/update` |
//! | [`delete_node`] | DELETE | `/delete` |
//!
//! Nodes are addressed by device ID, file name and a path inside the file.
//! The service describes XML structure as JSON; this module decodes it into
//! a [`Node`] tree without interpreting it further.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};

use crate::client::XmlClient;
use crate::envelope::Envelope;
use crate::error::{Result, XmlApiError};

const CREATE_ENDPOINT: &str = "/create";
const READ_ENDPOINT: &str = "/read";
const UPDATE_ENDPOINT: &str = "/update";
const DELETE_ENDPOINT: &str = "/delete";

// ── Response types ─────────────────────────────────────────────────────

/// Reads `null` as the type's default. Leaf nodes may come back with
/// `"nodes": null`.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Element name of a node.
///
/// The service sends either a bare string or a namespace-qualified object
/// `{"space": "...", "local": "..."}` (keys may also be capitalized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeName {
    /// Bare element name.
    Plain(String),
    /// Name with its namespace URI.
    Qualified(QualifiedName),
}

/// Namespace-qualified element name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace URI; empty when the element has none.
    #[serde(default, alias = "Space", deserialize_with = "null_as_default")]
    pub space: String,
    /// Element name without prefix.
    #[serde(alias = "Local")]
    pub local: String,
}

impl NodeName {
    /// The element name without its namespace.
    pub fn local(&self) -> &str {
        match self {
            NodeName::Plain(name) => name,
            NodeName::Qualified(q) => &q.local,
        }
    }

    /// The namespace, if the name carries a non-empty one.
    pub fn space(&self) -> Option<&str> {
        match self {
            NodeName::Qualified(q) if !q.space.is_empty() => Some(&q.space),
            _ => None,
        }
    }
}

impl Default for NodeName {
    fn default() -> Self {
        NodeName::Plain(String::new())
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.space() {
            Some(space) => write!(f, "{space}:{}", self.local()),
            None => f.write_str(self.local()),
        }
    }
}

/// One element of a remote XML document, with its children in document
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Element name.
    #[serde(
        default,
        alias = "xmlname",
        alias = "XMLName",
        deserialize_with = "null_as_default"
    )]
    pub name: NodeName,
    /// Text content.
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    /// Child elements.
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<Node>,
}

impl Node {
    /// First direct child whose local name is `name`.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name.local() == name)
    }

    /// Number of levels in the tree rooted here; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.nodes.iter().map(Node::depth).max().unwrap_or(0)
    }
}

/// `/read` body: a node, possibly accompanied by an `error` field.
#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    node: Node,
}

// ── Endpoint functions ─────────────────────────────────────────────────

/// Creates a `<tag>value</tag>` element under `parent_path`.
///
/// Returns the service's status message.
///
/// # Errors
///
/// - `XmlApiError::Domain` — the service refused the change (e.g. the parent
///   path does not exist).
/// - `XmlApiError::Api` / `Auth` / `Network` — see [`XmlClient::execute`].
pub async fn create_node(
    client: &XmlClient,
    device_id: &str,
    filename: &str,
    parent_path: &str,
    tag: &str,
    value: &str,
) -> Result<String> {
    let params = [
        ("deviceid", device_id),
        ("filename", filename),
        ("parent_path", parent_path),
        ("tag", tag),
        ("value", value),
    ];
    let envelope: Envelope = client
        .execute_json(Method::POST, CREATE_ENDPOINT, &params)
        .await?;
    envelope.into_result()
}

/// Reads the node at `path` together with its whole subtree.
///
/// # Errors
///
/// - `XmlApiError::Domain` — the body carried a non-empty `error` field.
/// - `XmlApiError::Parse` — the body is not a node.
/// - `XmlApiError::Api` / `Auth` / `Network` — see [`XmlClient::execute`].
pub async fn read_node(
    client: &XmlClient,
    device_id: &str,
    filename: &str,
    path: &str,
) -> Result<Node> {
    let params = [("deviceid", device_id), ("filename", filename), ("path", path)];
    let response: ReadResponse = client
        .execute_json(Method::GET, READ_ENDPOINT, &params)
        .await?;
    match response.error {
        Some(error) if !error.is_empty() => Err(XmlApiError::Domain(error)),
        _ => Ok(response.node),
    }
}

/// Replaces the text value of the node at `path`.
pub async fn update_node(
    client: &XmlClient,
    device_id: &str,
    filename: &str,
    path: &str,
    value: &str,
) -> Result<String> {
    let params = [
        ("deviceid", device_id),
        ("filename", filename),
        ("path", path),
        ("value", value),
    ];
    let envelope: Envelope = client
        .execute_json(Method::PUT, UPDATE_ENDPOINT, &params)
        .await?;
    envelope.into_result()
}

/// Removes the node at `path` and its subtree.
pub async fn delete_node(
    client: &XmlClient,
    device_id: &str,
    filename: &str,
    path: &str,
) -> Result<String> {
    let params = [("deviceid", device_id), ("filename", filename), ("path", path)];
    let envelope: Envelope = client
        .execute_json(Method::DELETE, DELETE_ENDPOINT, &params)
        .await?;
    envelope.into_result()
}
