//! # Stencil Snapshot
//!
//! Compact, reversible text encoding of a document tree.
//!
//! Pipeline, in order:
//!
//! 1. JSON: `{"nodes": [...], "scripts": [...]}`
//! 2. LZW over the UTF-8 bytes, dictionary seeded with all 256 byte values
//! 3. each code packed as a base-128 varint
//! 4. base64 (standard alphabet, padded)
//! 5. prefixed with [`SNAPSHOT_TAG`]
//!
//! ```
//! use stencil_snapshot::{deserialize, serialize};
//! use stencil_tree::{Document, Node};
//!
//! let doc = Document::from_nodes(vec![Node::element("p").with_text("héllo")], vec![]);
//! let encoded = serialize(&doc).unwrap();
//! assert!(encoded.starts_with("lzw64:"));
//! assert_eq!(deserialize(&encoded).unwrap(), doc);
//! ```

pub mod codec;
pub mod error;
pub mod lzw;
pub mod varint;

pub use codec::{decode_bytes, deserialize, encode_bytes, serialize, ENCODING_NAME, SNAPSHOT_TAG};
pub use error::{SnapshotError, SnapshotResult};
