//! Schema-driven binary container engine.
//!
//! This crate is the wire-format core: a declarative structure-definition
//! framework, the pointer-list mechanism behind every variable-length field,
//! a deferred-write scheduler, compact numeric codecs, and the container
//! envelope with its record catalog.
//!
//! # Architecture
//!
//! - **[`Codec`]**: the closed set of wire codecs a field can use.
//! - **[`StructDef`] / [`Field`]**: the declarative description of one wire
//!   structure, built once per type in a static table. Field order is wire
//!   order and drives alignment padding.
//! - **[`Record`]**: the typed side of a structure; a plain Rust struct whose
//!   `read`/`write` walk the field table through checking cursors.
//! - **Pointer lists**: every string, array, and tree-child collection is a
//!   16-byte `(relative offset, count, tag)` record pointing at a payload
//!   emitted elsewhere in the file.
//! - **Deferred writes**: headers are serialized before their payloads exist,
//!   so payload jobs queue during the first tree walk and flush FIFO.
//! - **[`Envelope`] / [`Catalog`]**: the on-disk container header and the
//!   structure-hash table it resolves against.
//!
//! # Example
//!
//! ```
//! use perun_schema::{
//!     read_root, write_root, Codec, Field, FieldReader, FieldWriter, Record,
//!     Result, StructDef,
//! };
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Tag {
//!     name: String,
//!     ids: Vec<u32>,
//! }
//!
//! static TAG_FIELDS: &[Field] = &[
//!     Field::plain("name", Codec::List(&Codec::Char)),
//!     Field::plain("ids", Codec::List(&Codec::UInt32)),
//! ];
//! static TAG_DEF: StructDef = StructDef::new("Tag", TAG_FIELDS);
//!
//! impl Record for Tag {
//!     fn def() -> &'static StructDef {
//!         &TAG_DEF
//!     }
//!
//!     fn read(r: &mut FieldReader<'_, '_>) -> Result<Self> {
//!         Ok(Self { name: r.string()?, ids: r.list()? })
//!     }
//!
//!     fn write(&self, w: &mut FieldWriter<'_>) -> Result<()> {
//!         w.string(&self.name)?;
//!         w.list(&self.ids)
//!     }
//! }
//!
//! let tag = Tag { name: "collision".into(), ids: vec![3, 5, 8] };
//! let bytes = write_root(&tag)?;
//! assert_eq!(read_root::<Tag>(&bytes)?, tag);
//! # Ok::<(), perun_schema::Error>(())
//! ```

mod catalog;
mod codec;
mod container;
mod def;
mod error;
mod read;
mod write;

pub mod compact;

pub use catalog::Catalog;
pub use codec::{Codec, Element, ALIGNMENT_CAP, DEFAULT_LIST_TAG, LIST_ALIGNMENT, LIST_RECORD_SIZE};
pub use container::{
    peek_envelope, read_record, write_record, Envelope, RecordKind, ASSET_HEADER_SIZE,
    FORMAT_VERSION, INLINE_HEADER_SIZE, MAGIC,
};
pub use def::{Field, Record, StructDef};
pub use error::{Error, Result};
pub use read::{read_root, read_struct, FieldReader};
pub use write::{write_root, write_struct, FieldWriter, WriteCursor};
