use crate::schema::{taxonomy_assignments, taxonomy_nodes};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which forest a node belongs to. Tags and groups share every rule but never
/// reference each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    Tag,
    Group,
}

impl TaxonomyKind {
    pub const ALL: [TaxonomyKind; 2] = [TaxonomyKind::Tag, TaxonomyKind::Group];

    /// Value stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => "tag",
            TaxonomyKind::Group => "group",
        }
    }

    /// Route segment used by the HTTP API.
    pub fn api_segment(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => crate::TAGS_API,
            TaxonomyKind::Group => crate::GROUPS_API,
        }
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = taxonomy_nodes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TaxonomyNode {
    pub id: i32,
    pub kind: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub path: String,
    pub level: i32,
    pub sort_order: i32,
    pub is_active: bool,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = taxonomy_nodes)]
pub struct NewTaxonomyNode<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    pub parent_id: Option<i32>,
    pub path: &'a str,
    pub level: i32,
    pub sort_order: i32,
    pub is_active: bool,
    pub color: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub description: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Column updates for a single node. `None` leaves the column alone,
/// `Some(None)` clears a nullable column.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = taxonomy_nodes)]
pub struct NodeChangeset {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<Option<i32>>,
    pub path: Option<String>,
    pub level: Option<i32>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = taxonomy_assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Assignment {
    pub id: i32,
    pub node_id: i32,
    pub entity_type: String,
    pub entity_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = taxonomy_assignments)]
pub struct NewAssignment<'a> {
    pub node_id: i32,
    pub entity_type: &'a str,
    pub entity_id: &'a str,
    pub created_at: NaiveDateTime,
}
