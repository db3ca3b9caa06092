//! Operation log.
//!
//! Every mutation a [`super::MemoryDom`] performs is recorded as a
//! [`DomOp`]. The log is what a remote renderer would consume: it encodes
//! to JSON for inspection and to MessagePack for the wire, and replaying it
//! into an empty document reproduces the same tree.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vdom::NodeId;

/// One recorded backend mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomOp {
    CreateElement {
        id: NodeId,
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    CreateText {
        id: NodeId,
        text: String,
    },
    CreateComment {
        id: NodeId,
        text: String,
    },
    InsertBefore {
        parent: NodeId,
        node: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<NodeId>,
    },
    AppendChild {
        parent: NodeId,
        child: NodeId,
    },
    RemoveChild {
        parent: NodeId,
        child: NodeId,
    },
    SetText {
        node: NodeId,
        text: String,
    },
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: NodeId,
        name: String,
    },
    /// Listeners are recorded by event name only; handlers stay local.
    AddListener {
        node: NodeId,
        event: String,
    },
    RemoveListener {
        node: NodeId,
        event: String,
    },
}

impl DomOp {
    /// Whether the op changes tree structure rather than node contents.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DomOp::InsertBefore { .. } | DomOp::AppendChild { .. } | DomOp::RemoveChild { .. }
        )
    }
}

pub fn to_json(ops: &[DomOp]) -> Result<String> {
    serde_json::to_string(ops).map_err(|err| Error::Codec(err.to_string()))
}

pub fn from_json(json: &str) -> Result<Vec<DomOp>> {
    serde_json::from_str(json).map_err(|err| Error::Codec(err.to_string()))
}

/// Encode with named fields so the log stays self-describing.
pub fn to_msgpack(ops: &[DomOp]) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(ops)?)
}

pub fn from_msgpack(bytes: &[u8]) -> Result<Vec<DomOp>> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_tagged_by_op() {
        let ops = vec![DomOp::SetAttribute {
            node: NodeId::from_raw(2),
            name: "id".into(),
            value: "app".into(),
        }];
        let json = to_json(&ops).unwrap();
        assert_eq!(json, r#"[{"op":"set_attribute","node":2,"name":"id","value":"app"}]"#);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let op = DomOp::InsertBefore {
            parent: NodeId::from_raw(1),
            node: NodeId::from_raw(2),
            reference: None,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert!(json.get("reference").is_none());
        let log = vec![op];
        assert_eq!(from_json(&to_json(&log).unwrap()).unwrap(), log);
    }

    #[test]
    fn malformed_logs_are_codec_errors() {
        assert!(matches!(from_json("{"), Err(Error::Codec(_))));
        assert!(matches!(from_msgpack(&[0xc1]), Err(Error::Codec(_))));
    }
}
