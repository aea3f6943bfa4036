//! FILENAME: codec/src/lib.rs
//! PURPOSE: Compact, URL-safe text encoding for nested values.
//! CONTEXT: Turns a `StructuredValue` into a single query-string-safe
//! string and back. Used for shareable/bookmarkable table state.
//!
//! PIPELINE: StructuredValue --> encode --> text --> scanner/decode --> StructuredValue (string-typed)
//!
//! Example: {"filter": {"or": [{"id": 5}, {"name": "x", "op": "con"}]}}
//! encodes as `filter=(or:(id:5),(name:x;op:con))`.

pub mod decode;
pub mod encode;
pub mod escape;
pub mod scanner;


pub use decode::{parse, parse_value};
pub use encode::{stringify, stringify_value};
pub use escape::{escape, unescape};
pub use scanner::split_top_level;
