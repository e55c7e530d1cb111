//! Index Module
//!
//! In-memory materialization of one table.
//!
//! ## Responsibilities
//! - Primary index: id → row, iterated in id order
//! - Unique secondary indexes: (field, value) → id
//! - All-or-nothing mutation: every constraint is checked before any map
//!   is touched, so a rejected insert or update leaves no trace
//!
//! ## Data Structure Choice
//! BTreeMap for the primary index (stable id order for the table file and
//! for `select_all`), HashMap per declared unique field.

mod table;

pub use table::TableIndex;
