//! Row model shared by the versioning engine and its collaborators
//!
//! - `Datum` / `ColumnType` - typed column values
//! - `TupleDescriptor` - ordered column layout of a relation
//! - `RowImage` - one version of a row (old pre-image or new post-image)
//! - `Relation` - identity, qualified name and layout of a table

mod datum;
mod descriptor;
mod image;
mod relation;

pub use datum::{ColumnType, Datum};
pub use descriptor::{ColumnDef, TupleDescriptor};
pub use image::RowImage;
pub use relation::{quote_identifier, QualifiedName, Relation, RelationId};
