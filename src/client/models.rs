//! Upstream ICD-10 payloads.
//!
//! The upstream wraps every tree node the same way: a `model` tag naming the
//! level (chapter, section, type, disease), the node id, a leaf flag and the
//! node's own `data`.

use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";

/// Code, name and rendered description of one node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeData {
    pub code: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub html: Option<String>,
}

/// A node in the ICD-10 hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcdNode {
    pub model: String,
    pub id: String,
    pub is_leaf: bool,
    pub data: NodeData,
}

/// `/ICD10/root`: the list of chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub data: Vec<IcdNode>,
    #[serde(default)]
    pub html: String,
}

/// `/ICD10/data/{chapter,section,type,disease}`: a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResponse {
    pub status: String,
    pub data: IcdNode,
}

impl RootResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

impl NodeResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}
