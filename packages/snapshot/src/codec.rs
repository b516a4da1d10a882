use crate::error::{SnapshotError, SnapshotResult};
use crate::{lzw, varint};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use stencil_tree::{Document, Node, ScriptRule};
use tracing::{debug, instrument};

/// Prefix carried by every snapshot string
pub const SNAPSHOT_TAG: &str = "lzw64:";

/// Name of the encoding, stamped next to markers so readers can pick a decoder
pub const ENCODING_NAME: &str = "lzw64";

#[derive(Serialize)]
struct SnapshotRef<'a> {
    nodes: &'a [Node],
    scripts: &'a [ScriptRule],
}

#[derive(Deserialize)]
struct Snapshot {
    nodes: Vec<Node>,
    #[serde(default)]
    scripts: Vec<ScriptRule>,
}

/// Encode a document (node list plus script rules) into a snapshot string.
///
/// Output is deterministic: attribute maps are ordered, so equal documents
/// produce byte-identical snapshots.
#[instrument(skip(document), fields(roots = document.roots().len()))]
pub fn serialize(document: &Document) -> SnapshotResult<String> {
    let nodes = document.to_nodes();
    let json = serde_json::to_vec(&SnapshotRef {
        nodes: &nodes,
        scripts: document.scripts(),
    })?;
    let encoded = encode_bytes(&json);
    debug!(json_len = json.len(), encoded_len = encoded.len(), "Serialized snapshot");
    Ok(encoded)
}

/// Decode a snapshot string back into a fresh, clean document
#[instrument(skip(snapshot), fields(len = snapshot.len()))]
pub fn deserialize(snapshot: &str) -> SnapshotResult<Document> {
    let json = decode_bytes(snapshot)?;
    let Snapshot { nodes, scripts } = serde_json::from_slice(&json)?;
    debug!(roots = nodes.len(), scripts = scripts.len(), "Deserialized snapshot");
    Ok(Document::from_nodes(nodes, scripts))
}

/// compress -> pack -> base64 -> tag
pub fn encode_bytes(bytes: &[u8]) -> String {
    let codes = lzw::compress(bytes);
    let packed = varint::encode(&codes);
    format!("{SNAPSHOT_TAG}{}", STANDARD.encode(packed))
}

/// Inverse of [`encode_bytes`]
pub fn decode_bytes(snapshot: &str) -> SnapshotResult<Vec<u8>> {
    let body = snapshot
        .strip_prefix(SNAPSHOT_TAG)
        .ok_or(SnapshotError::MissingTag {
            expected: SNAPSHOT_TAG,
        })?;
    let packed = STANDARD.decode(body.trim())?;
    let codes = varint::decode(&packed)?;
    lzw::decompress(&codes)
}
