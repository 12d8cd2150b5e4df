//! snaptel shared types.
//!
//! This crate provides:
//! - The closed catalog of primitive field types ([`BasicType`]) with names and sizes
//! - Raw-bytes decoding into a tagged value ([`VarNumber`]) and the matching encoder
//! - The schema model ([`Schema`], [`Field`]) with its cross-process identity hash
//! - The canonical schema text dump and its parser

pub mod error;
pub mod hash;
pub mod schema;
pub mod types;

pub use error::{SchemaError, TypeError};
pub use hash::{add_field_to_hash, hash_name};
pub use schema::{Field, Schema};
pub use types::{decode, try_decode, BasicType, Primitive, VarNumber};

/// Version written into the `__version__` header of schema dumps.
pub const SCHEMA_VERSION: u32 = 4;
