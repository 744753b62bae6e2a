//! Entity and field whitelist for widget queries.
//!
//! This table is the only source of SQL identifiers the translator ever
//! emits. Logical names are what clients send; storage names are what the
//! database sees.

/// How a column's stored value is surfaced in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    Bool,
    Timestamp,
    /// Text column holding a JSON document (e.g. user roles).
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

/// How rows of an entity are tied to the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// The row carries the owner id itself.
    Column(&'static str),
    /// The row references a parent row that carries the owner id.
    Parent {
        column: &'static str,
        table: &'static str,
        owner_column: &'static str,
    },
    /// The row is the user.
    SelfRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySpec {
    pub name: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    pub scope: OwnerScope,
}

impl EntitySpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

const fn field(name: &'static str, column: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, column, kind }
}

use FieldKind::*;

const PRODUCT_FIELDS: &[FieldSpec] = &[
    field("id", "id", Integer),
    field("name", "name", Text),
    field("imageName", "image_name", Text),
    field("isArchived", "is_archived", Bool),
    field("status", "status", Text),
    field("price", "price", Real),
    field("createdAt", "created_at", Timestamp),
    field("updatedAt", "updated_at", Timestamp),
];

const SALE_FIELDS: &[FieldSpec] = &[
    field("id", "id", Integer),
    field("name", "name", Text),
    field("price", "price", Real),
    field("benefit", "benefit", Real),
    field("nbProduct", "nb_product", Real),
    field("ursaf", "ursaf", Real),
    field("expense", "expense", Real),
    field("commission", "commission", Real),
    field("time", "time", Real),
    field("createdAt", "created_at", Timestamp),
    field("updatedAt", "updated_at", Timestamp),
];

const USER_FIELDS: &[FieldSpec] = &[
    field("id", "id", Integer),
    field("email", "email", Text),
    field("firstName", "first_name", Text),
    field("lastName", "last_name", Text),
    field("roles", "roles", Json),
    field("objectiveValue", "objective_value", Integer),
    field("createdAt", "created_at", Timestamp),
    field("updatedAt", "updated_at", Timestamp),
];

const NAMED_FIELDS: &[FieldSpec] = &[
    field("id", "id", Integer),
    field("name", "name", Text),
    field("createdAt", "created_at", Timestamp),
    field("updatedAt", "updated_at", Timestamp),
];

const SALES_PRODUCT_FIELDS: &[FieldSpec] = &[
    field("id", "id", Integer),
    field("createdAt", "created_at", Timestamp),
    field("updatedAt", "updated_at", Timestamp),
];

const PRICE_FIELDS: &[FieldSpec] = &[
    field("id", "id", Integer),
    field("name", "name", Text),
    field("price", "price", Real),
    field("benefit", "benefit", Real),
    field("ursaf", "ursaf", Real),
    field("expense", "expense", Real),
    field("commission", "commission", Real),
    field("time", "time", Real),
    field("isArchived", "is_archived", Bool),
    field("createdAt", "created_at", Timestamp),
    field("updatedAt", "updated_at", Timestamp),
];

/// Entities eligible for dynamic querying.
pub static ENTITIES: &[EntitySpec] = &[
    EntitySpec {
        name: "Product",
        table: "product",
        fields: PRODUCT_FIELDS,
        scope: OwnerScope::Column("user_id"),
    },
    EntitySpec {
        name: "Sale",
        table: "sale",
        fields: SALE_FIELDS,
        scope: OwnerScope::Column("user_id"),
    },
    EntitySpec {
        name: "User",
        table: "app_user",
        fields: USER_FIELDS,
        scope: OwnerScope::SelfRow,
    },
    EntitySpec {
        name: "SalesChannel",
        table: "sales_channel",
        fields: NAMED_FIELDS,
        scope: OwnerScope::Column("user_id"),
    },
    EntitySpec {
        name: "Client",
        table: "client",
        fields: NAMED_FIELDS,
        scope: OwnerScope::Column("user_id"),
    },
    EntitySpec {
        name: "SalesProduct",
        table: "sales_product",
        fields: SALES_PRODUCT_FIELDS,
        scope: OwnerScope::Parent {
            column: "sale_id",
            table: "sale",
            owner_column: "user_id",
        },
    },
    EntitySpec {
        name: "Price",
        table: "price",
        fields: PRICE_FIELDS,
        scope: OwnerScope::Parent {
            column: "product_id",
            table: "product",
            owner_column: "user_id",
        },
    },
];

/// Lookup wrapper over a static entity table.
#[derive(Debug, Clone, Copy)]
pub struct Whitelist {
    entities: &'static [EntitySpec],
}

impl Default for Whitelist {
    fn default() -> Self {
        Self { entities: ENTITIES }
    }
}

impl Whitelist {
    pub fn entity(&self, name: &str) -> Option<&'static EntitySpec> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entities.iter().map(|e| e.name).collect()
    }
}
