//! Widget query builder.
//!
//! Dashboard widgets describe the data they need as a JSON descriptor
//! (`select`, `from`, `where`, `orderBy`, `limit`, `offset`). The
//! translator checks every identifier against a static whitelist, binds
//! every client value as a parameter and scopes the query to the acting
//! user before anything reaches SQLite.
//!
//! ```text
//! POST /api/widgets/query
//!        │ QueryDescriptor (descriptor.rs)
//!        v
//! QueryTranslator::compile ── whitelist.rs (entities, fields, owner scope)
//!        │                 └─ operator.rs  (`_gte`, `_like`, `_in`, ...)
//!        v
//! CompiledQuery ──> DbHandle::call(run_select) ──> QueryEnvelope
//! ```

pub mod descriptor;
pub mod operator;
pub mod translator;
pub mod whitelist;

pub use descriptor::{AggregateFunction, QueryDescriptor, SelectItem, SortDirection};
pub use operator::{Operator, parse_condition_key};
pub use translator::{
    BindValue, CompiledQuery, MAX_LIMIT, OutputColumn, OutputKind, QueryEnvelope, QueryTranslator,
};
pub use whitelist::{EntitySpec, FieldKind, FieldSpec, OwnerScope, Whitelist};
