//! `DOM.*` commands and events, used only by the cooperative-load gate.

use cdp_types::{Command, Event, Method};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize)]
pub struct GetDocumentParams {}

impl Method for GetDocumentParams {
    fn identifier(&self) -> &'static str {
        "DOM.getDocument"
    }
}

impl Command for GetDocumentParams {
    type Response = GetDocumentResult;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetDocumentResult {
    pub root: Node,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorAllParams {
    pub node_id: i64,
    pub selector: String,
}

impl QuerySelectorAllParams {
    pub fn new(node_id: i64, selector: impl Into<String>) -> Self {
        Self {
            node_id,
            selector: selector.into(),
        }
    }
}

impl Method for QuerySelectorAllParams {
    fn identifier(&self) -> &'static str {
        "DOM.querySelectorAll"
    }
}

impl Command for QuerySelectorAllParams {
    type Response = QuerySelectorAllResult;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorAllResult {
    pub node_ids: Vec<i64>,
}

/// Fired whenever an attribute on any node changes. The cooperative-load
/// gate watches this for `name == "value"` transitions on the nodes
/// `querySelectorAll` returned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeModifiedEvent {
    pub node_id: i64,
    pub name: String,
    pub value: String,
}

impl Method for AttributeModifiedEvent {
    fn identifier(&self) -> &'static str {
        "DOM.attributeModified"
    }
}

impl Event for AttributeModifiedEvent {}
</content>
