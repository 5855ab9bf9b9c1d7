//! Hierarchical taxonomy store.
//!
//! Keeps a forest of tag (or group) nodes whose denormalized `path` and
//! `level` always agree with the `parent_id` chain. Every mutation runs in a
//! single database transaction: a reparent or slug change either rewrites the
//! moved node and its whole subtree, or nothing at all. Mutations take the
//! write lock up front (`BEGIN IMMEDIATE`) so concurrent writers wait on the
//! busy timeout instead of failing on a lock upgrade.

pub mod error;
pub mod generics;
pub mod paths;

pub use error::HierarchyError;
pub use generics::TreeNode;
pub use paths::Placement;

use crate::db::{DbConnection, Pool};
use crate::schema::{taxonomy_assignments, taxonomy_nodes};
use crate::tables::{
    Assignment, NewAssignment, NewTaxonomyNode, NodeChangeset, TaxonomyKind, TaxonomyNode,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use generics::{build_generic_tree, collect_ancestors, collect_descendants};
use paths::{normalize_path, validate_name, validate_slug};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub type TaxonomyTreeNode = TreeNode<TaxonomyNode>;

/// Input for `TaxonomyStore::create`.
#[derive(Debug, Clone, Default)]
pub struct NodeDraft {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl NodeDraft {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: i32) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update for `TaxonomyStore::update`. `parent_id: Some(None)` moves
/// the node to the root; `Some(None)` on a metadata field clears it.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<Option<i32>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub include_inactive: bool,
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub roots_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub id: i32,
    pub slug: String,
    pub assignments_removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub updated: usize,
    pub unreachable: Vec<i32>,
}

/// A violation of the forest invariants found by `check_consistency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum Inconsistency {
    PathMismatch {
        id: i32,
        expected: String,
        actual: String,
    },
    LevelMismatch {
        id: i32,
        expected: i32,
        actual: i32,
    },
    MissingParent {
        id: i32,
        parent_id: i32,
    },
    Cycle {
        id: i32,
    },
}

struct CascadeOutcome {
    visited: HashSet<i32>,
    changed: usize,
}

pub struct TaxonomyStore<'a> {
    pool: &'a Pool,
    kind: TaxonomyKind,
}

impl<'a> TaxonomyStore<'a> {
    pub fn new(pool: &'a Pool, kind: TaxonomyKind) -> Self {
        Self { pool, kind }
    }

    pub fn kind(&self) -> TaxonomyKind {
        self.kind
    }

    // * Mutations ............................................................

    pub fn create(&self, draft: NodeDraft) -> Result<TaxonomyNode, HierarchyError> {
        let name = validate_name(&draft.name)?;
        validate_slug(&draft.slug)?;

        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;

        let node = conn.immediate_transaction::<_, HierarchyError, _>(|conn| {
            if slug_taken(conn, kind, &draft.slug, None)? {
                return Err(HierarchyError::DuplicateSlug(draft.slug.clone()));
            }

            let parent = match draft.parent_id {
                Some(pid) => Some(require_parent(conn, kind, pid)?),
                None => None,
            };
            let placement = Placement::under(parent.as_ref(), &draft.slug);
            let now = now();

            let new_node = NewTaxonomyNode {
                kind: kind.as_str(),
                name: &name,
                slug: &draft.slug,
                parent_id: draft.parent_id,
                path: &placement.path,
                level: placement.level,
                sort_order: draft.sort_order.unwrap_or(0),
                is_active: draft.is_active.unwrap_or(true),
                color: draft.color.as_deref(),
                icon: draft.icon.as_deref(),
                description: draft.description.as_deref(),
                created_at: now,
                updated_at: now,
            };

            diesel::insert_into(taxonomy_nodes::table)
                .values(&new_node)
                .returning(TaxonomyNode::as_returning())
                .get_result(conn)
                .map_err(|err| HierarchyError::from_write(err, &draft.slug))
        })?;

        info!("Created {} {} at {}", kind, node.id, node.path);
        Ok(node)
    }

    pub fn update(&self, id: i32, changes: NodeUpdate) -> Result<TaxonomyNode, HierarchyError> {
        let name = changes.name.as_deref().map(validate_name).transpose()?;
        if let Some(slug) = &changes.slug {
            validate_slug(slug)?;
        }

        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;

        let (node, cascaded) = conn.immediate_transaction::<_, HierarchyError, _>(|conn| {
            let current = require_node(conn, kind, id)?;

            let new_slug = changes.slug.filter(|slug| *slug != current.slug);
            if let Some(slug) = &new_slug {
                if slug_taken(conn, kind, slug, Some(id))? {
                    return Err(HierarchyError::DuplicateSlug(slug.clone()));
                }
            }

            let new_parent = changes.parent_id.filter(|pid| *pid != current.parent_id);
            let mut new_parent_node = None;
            if let Some(Some(pid)) = new_parent {
                if pid == id {
                    return Err(HierarchyError::Cycle { id, parent_id: pid });
                }
                let parent = require_parent(conn, kind, pid)?;
                let descendants = descendant_ids_of(conn, kind, id)?;
                if descendants.contains(&pid) {
                    warn!("Rejected moving {} {} under its descendant {}", kind, id, pid);
                    return Err(HierarchyError::Cycle { id, parent_id: pid });
                }
                new_parent_node = Some(parent);
            }

            let now = now();
            let mut changeset = NodeChangeset {
                name,
                slug: new_slug.clone(),
                parent_id: new_parent,
                sort_order: changes.sort_order,
                is_active: changes.is_active,
                color: changes.color,
                icon: changes.icon,
                description: changes.description,
                updated_at: Some(now),
                ..Default::default()
            };

            // Only a slug or parent change moves the node.
            let placement = if new_slug.is_some() || new_parent.is_some() {
                let parent = match new_parent {
                    Some(_) => new_parent_node,
                    None => match current.parent_id {
                        Some(pid) => Some(require_parent(conn, kind, pid)?),
                        None => None,
                    },
                };
                let slug = new_slug.as_deref().unwrap_or(&current.slug);
                let placement = Placement::under(parent.as_ref(), slug);
                changeset.path = Some(placement.path.clone());
                changeset.level = Some(placement.level);
                Some(placement)
            } else {
                None
            };

            let written_slug = new_slug.as_deref().unwrap_or(&current.slug).to_string();
            let node = diesel::update(taxonomy_nodes::table.find(id))
                .set(&changeset)
                .returning(TaxonomyNode::as_returning())
                .get_result(conn)
                .map_err(|err| HierarchyError::from_write(err, &written_slug))?;

            let cascaded = match placement {
                Some(placement) => Some(cascade(conn, kind, id, &placement, now)?),
                None => None,
            };

            Ok((node, cascaded))
        })?;

        match cascaded {
            Some(outcome) => info!(
                "Moved {} {} to {}; {} descendant(s) updated",
                kind, id, node.path, outcome.changed
            ),
            None => info!("Updated {} {}", kind, id),
        }
        Ok(node)
    }

    pub fn delete(&self, id: i32) -> Result<DeleteSummary, HierarchyError> {
        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;

        let summary = conn.immediate_transaction::<_, HierarchyError, _>(|conn| {
            let node = require_node(conn, kind, id)?;

            let count: i64 = taxonomy_nodes::table
                .filter(taxonomy_nodes::parent_id.eq(id))
                .count()
                .get_result(conn)?;
            if count > 0 {
                return Err(HierarchyError::HasChildren { id, count });
            }

            let assignments_removed = diesel::delete(
                taxonomy_assignments::table.filter(taxonomy_assignments::node_id.eq(id)),
            )
            .execute(conn)?;

            diesel::delete(taxonomy_nodes::table.find(id)).execute(conn)?;

            Ok(DeleteSummary {
                id,
                slug: node.slug,
                assignments_removed,
            })
        })?;

        info!(
            "Deleted {} {} ({} assignment(s) removed)",
            kind, id, summary.assignments_removed
        );
        Ok(summary)
    }

    // * Reads ................................................................

    pub fn get(&self, id: i32) -> Result<TaxonomyNode, HierarchyError> {
        let mut conn = self.pool.get()?;
        require_node(&mut conn, self.kind, id)
    }

    pub fn get_by_slug(&self, slug: &str) -> Result<TaxonomyNode, HierarchyError> {
        let mut conn = self.pool.get()?;
        nodes_of(self.kind)
            .filter(taxonomy_nodes::slug.eq(slug))
            .first::<TaxonomyNode>(&mut conn)
            .optional()?
            .ok_or_else(|| HierarchyError::NotFound(format!("{} with slug '{}'", self.kind, slug)))
    }

    pub fn get_by_path(&self, path: &str) -> Result<TaxonomyNode, HierarchyError> {
        let path = normalize_path(path);
        let mut conn = self.pool.get()?;
        nodes_of(self.kind)
            .filter(taxonomy_nodes::path.eq(&path))
            .first::<TaxonomyNode>(&mut conn)
            .optional()?
            .ok_or_else(|| HierarchyError::NotFound(format!("{} at path '{}'", self.kind, path)))
    }

    /// Nodes ordered by path, so every parent precedes its children.
    pub fn list(&self, filter: ListFilter) -> Result<Vec<TaxonomyNode>, HierarchyError> {
        let mut conn = self.pool.get()?;

        let mut query =
            nodes_of(self.kind).order((taxonomy_nodes::path.asc(), taxonomy_nodes::id.asc()));
        if !filter.include_inactive {
            query = query.filter(taxonomy_nodes::is_active.eq(true));
        }
        if let Some(pid) = filter.parent_id {
            query = query.filter(taxonomy_nodes::parent_id.eq(pid));
        }
        if filter.roots_only {
            query = query.filter(taxonomy_nodes::parent_id.is_null());
        }

        Ok(query.load::<TaxonomyNode>(&mut conn)?)
    }

    pub fn children(&self, id: i32) -> Result<Vec<TaxonomyNode>, HierarchyError> {
        let mut conn = self.pool.get()?;
        require_node(&mut conn, self.kind, id)?;
        Ok(load_children(&mut conn, self.kind, id)?)
    }

    pub fn descendant_ids(&self, id: i32) -> Result<HashSet<i32>, HierarchyError> {
        let mut conn = self.pool.get()?;
        require_node(&mut conn, self.kind, id)?;
        let ids = descendant_ids_of(&mut conn, self.kind, id)?;
        debug!("{} {} has {} descendant(s)", self.kind, id, ids.len());
        Ok(ids)
    }

    /// Ancestors from the root down to the direct parent.
    pub fn ancestors(&self, id: i32) -> Result<Vec<TaxonomyNode>, HierarchyError> {
        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;
        require_node(conn, kind, id)?;

        let chain = collect_ancestors(id, |child| {
            taxonomy_nodes::table
                .filter(taxonomy_nodes::kind.eq(kind.as_str()))
                .filter(taxonomy_nodes::id.eq(child))
                .select(taxonomy_nodes::parent_id)
                .first::<Option<i32>>(conn)
                .optional()
                .map(Option::flatten)
        })?;

        let mut by_id: HashMap<i32, TaxonomyNode> = nodes_of(kind)
            .filter(taxonomy_nodes::id.eq_any(&chain))
            .load::<TaxonomyNode>(conn)?
            .into_iter()
            .map(|node| (node.id, node))
            .collect();

        Ok(chain
            .iter()
            .rev()
            .filter_map(|ancestor| by_id.remove(ancestor))
            .collect())
    }

    /// Nested forest with siblings ordered by `(sort_order, name)`. Without
    /// `include_inactive`, an inactive node hides its whole subtree.
    pub fn tree(&self, include_inactive: bool) -> Result<Vec<TaxonomyTreeNode>, HierarchyError> {
        let mut conn = self.pool.get()?;

        let mut query = nodes_of(self.kind).order((
            taxonomy_nodes::sort_order.asc(),
            taxonomy_nodes::name.asc(),
            taxonomy_nodes::id.asc(),
        ));
        if !include_inactive {
            query = query.filter(taxonomy_nodes::is_active.eq(true));
        }
        let nodes = query.load::<TaxonomyNode>(&mut conn)?;

        let items = nodes
            .into_iter()
            .map(|node| (node.id, node.parent_id, node))
            .collect();
        Ok(build_generic_tree(items))
    }

    // * Maintenance ..........................................................

    pub fn check_consistency(&self) -> Result<Vec<Inconsistency>, HierarchyError> {
        let mut conn = self.pool.get()?;
        let nodes: Vec<TaxonomyNode> = nodes_of(self.kind)
            .order(taxonomy_nodes::id.asc())
            .load::<TaxonomyNode>(&mut conn)?;
        Ok(find_inconsistencies(&nodes))
    }

    /// Recomputes every path and level top-down from the roots. Nodes that no
    /// root reaches (orphans, cycles) are reported and left untouched.
    pub fn rebuild_paths(&self) -> Result<RebuildReport, HierarchyError> {
        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;

        let report = conn.immediate_transaction::<_, HierarchyError, _>(|conn| {
            let roots: Vec<TaxonomyNode> = nodes_of(kind)
                .filter(taxonomy_nodes::parent_id.is_null())
                .order(taxonomy_nodes::id.asc())
                .load::<TaxonomyNode>(conn)?;
            let now = now();

            let mut reached = HashSet::new();
            let mut updated = 0;
            for root in roots {
                let placement = Placement::root(&root.slug);
                if !placement.matches(&root) {
                    write_placement(conn, root.id, &placement, now)?;
                    updated += 1;
                }
                let outcome = cascade(conn, kind, root.id, &placement, now)?;
                updated += outcome.changed;
                reached.insert(root.id);
                reached.extend(outcome.visited);
            }

            let mut unreachable: Vec<i32> = taxonomy_nodes::table
                .filter(taxonomy_nodes::kind.eq(kind.as_str()))
                .select(taxonomy_nodes::id)
                .load::<i32>(conn)?
                .into_iter()
                .filter(|node_id| !reached.contains(node_id))
                .collect();
            unreachable.sort_unstable();

            Ok(RebuildReport {
                updated,
                unreachable,
            })
        })?;

        if !report.unreachable.is_empty() {
            warn!(
                "{} {} node(s) are not reachable from any root: {:?}",
                report.unreachable.len(),
                kind,
                report.unreachable
            );
        }
        info!("Rebuilt {} paths; {} node(s) updated", kind, report.updated);
        Ok(report)
    }

    // * Assignments ..........................................................

    /// Attaches the node to an external entity. Assigning twice returns the
    /// existing assignment.
    pub fn assign(
        &self,
        id: i32,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Assignment, HierarchyError> {
        let entity_type = validate_entity_field("entity_type", entity_type)?;
        let entity_id = validate_entity_field("entity_id", entity_id)?;

        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;

        conn.immediate_transaction::<_, HierarchyError, _>(|conn| {
            require_node(conn, kind, id)?;

            if let Some(existing) = find_assignment(conn, id, entity_type, entity_id)? {
                return Ok(existing);
            }

            let new_assignment = NewAssignment {
                node_id: id,
                entity_type,
                entity_id,
                created_at: now(),
            };
            let assignment = diesel::insert_into(taxonomy_assignments::table)
                .values(&new_assignment)
                .returning(Assignment::as_returning())
                .get_result(conn)?;

            info!("Assigned {} {} to {}/{}", kind, id, entity_type, entity_id);
            Ok(assignment)
        })
    }

    pub fn unassign(&self, id: i32, entity_type: &str, entity_id: &str) -> Result<(), HierarchyError> {
        let kind = self.kind;
        let mut pooled = self.pool.get()?;
        let conn: &mut DbConnection = &mut pooled;

        conn.immediate_transaction::<_, HierarchyError, _>(|conn| {
            require_node(conn, kind, id)?;

            let removed = diesel::delete(
                taxonomy_assignments::table
                    .filter(taxonomy_assignments::node_id.eq(id))
                    .filter(taxonomy_assignments::entity_type.eq(entity_type))
                    .filter(taxonomy_assignments::entity_id.eq(entity_id)),
            )
            .execute(conn)?;

            if removed == 0 {
                return Err(HierarchyError::NotFound(format!(
                    "assignment of {} {} to {}/{}",
                    kind, id, entity_type, entity_id
                )));
            }
            Ok(())
        })
    }

    pub fn assignments(&self, id: i32) -> Result<Vec<Assignment>, HierarchyError> {
        let mut conn = self.pool.get()?;
        require_node(&mut conn, self.kind, id)?;

        Ok(taxonomy_assignments::table
            .filter(taxonomy_assignments::node_id.eq(id))
            .order((
                taxonomy_assignments::entity_type.asc(),
                taxonomy_assignments::entity_id.asc(),
            ))
            .select(Assignment::as_select())
            .load(&mut conn)?)
    }
}

// * Connection helpers .......................................................

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Every node of one kind; rows load positionally into `TaxonomyNode`.
fn nodes_of<'a>(kind: TaxonomyKind) -> taxonomy_nodes::BoxedQuery<'a, Sqlite> {
    taxonomy_nodes::table
        .filter(taxonomy_nodes::kind.eq(kind.as_str()))
        .into_boxed()
}

fn find_node(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    id: i32,
) -> QueryResult<Option<TaxonomyNode>> {
    nodes_of(kind)
        .filter(taxonomy_nodes::id.eq(id))
        .first::<TaxonomyNode>(conn)
        .optional()
}

fn require_node(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    id: i32,
) -> Result<TaxonomyNode, HierarchyError> {
    find_node(conn, kind, id)?.ok_or_else(|| HierarchyError::NotFound(format!("{} {}", kind, id)))
}

fn require_parent(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    id: i32,
) -> Result<TaxonomyNode, HierarchyError> {
    find_node(conn, kind, id)?
        .ok_or_else(|| HierarchyError::NotFound(format!("parent {} {}", kind, id)))
}

fn slug_taken(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    slug: &str,
    exclude: Option<i32>,
) -> QueryResult<bool> {
    let mut query = taxonomy_nodes::table
        .filter(taxonomy_nodes::kind.eq(kind.as_str()))
        .filter(taxonomy_nodes::slug.eq(slug))
        .select(taxonomy_nodes::id)
        .into_boxed();
    if let Some(self_id) = exclude {
        query = query.filter(taxonomy_nodes::id.ne(self_id));
    }
    Ok(query.first::<i32>(conn).optional()?.is_some())
}

fn load_children(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    parent: i32,
) -> QueryResult<Vec<TaxonomyNode>> {
    nodes_of(kind)
        .filter(taxonomy_nodes::parent_id.eq(parent))
        .order((
            taxonomy_nodes::sort_order.asc(),
            taxonomy_nodes::name.asc(),
            taxonomy_nodes::id.asc(),
        ))
        .load::<TaxonomyNode>(conn)
}

fn descendant_ids_of(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    id: i32,
) -> QueryResult<HashSet<i32>> {
    collect_descendants(id, |parent| {
        taxonomy_nodes::table
            .filter(taxonomy_nodes::kind.eq(kind.as_str()))
            .filter(taxonomy_nodes::parent_id.eq(parent))
            .select(taxonomy_nodes::id)
            .load::<i32>(conn)
    })
}

fn write_placement(
    conn: &mut DbConnection,
    id: i32,
    placement: &Placement,
    now: NaiveDateTime,
) -> QueryResult<usize> {
    diesel::update(taxonomy_nodes::table.find(id))
        .set((
            taxonomy_nodes::path.eq(&placement.path),
            taxonomy_nodes::level.eq(placement.level),
            taxonomy_nodes::updated_at.eq(now),
        ))
        .execute(conn)
}

// Rewrites the subtree under `root_id` from an explicit worklist. A child is
// only computed once its parent's new placement is known, so the walk is
// strictly top-down whatever the depth of the tree.
fn cascade(
    conn: &mut DbConnection,
    kind: TaxonomyKind,
    root_id: i32,
    root_placement: &Placement,
    now: NaiveDateTime,
) -> QueryResult<CascadeOutcome> {
    let mut visited = HashSet::new();
    let mut changed = 0;
    let mut worklist = vec![(root_id, root_placement.clone())];

    while let Some((parent_id, parent_placement)) = worklist.pop() {
        let children = load_children(conn, kind, parent_id)?;
        for child in children.into_iter().rev() {
            if child.id == root_id || !visited.insert(child.id) {
                continue;
            }
            let placement = parent_placement.child(&child.slug);
            if !placement.matches(&child) {
                write_placement(conn, child.id, &placement, now)?;
                changed += 1;
            }
            worklist.push((child.id, placement));
        }
    }

    Ok(CascadeOutcome { visited, changed })
}

fn find_assignment(
    conn: &mut DbConnection,
    node_id: i32,
    entity_type: &str,
    entity_id: &str,
) -> QueryResult<Option<Assignment>> {
    taxonomy_assignments::table
        .filter(taxonomy_assignments::node_id.eq(node_id))
        .filter(taxonomy_assignments::entity_type.eq(entity_type))
        .filter(taxonomy_assignments::entity_id.eq(entity_id))
        .select(Assignment::as_select())
        .first(conn)
        .optional()
}

fn validate_entity_field<'v>(field: &str, value: &'v str) -> Result<&'v str, HierarchyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

// * Invariant checks .........................................................

fn find_inconsistencies(nodes: &[TaxonomyNode]) -> Vec<Inconsistency> {
    let by_id: HashMap<i32, &TaxonomyNode> = nodes.iter().map(|node| (node.id, node)).collect();
    let mut issues = Vec::new();

    for node in nodes {
        if in_cycle(node.id, &by_id) {
            issues.push(Inconsistency::Cycle { id: node.id });
            continue;
        }

        let expected = match node.parent_id {
            None => Placement::root(&node.slug),
            Some(pid) => match by_id.get(&pid) {
                Some(parent) => Placement::of(parent).child(&node.slug),
                None => {
                    issues.push(Inconsistency::MissingParent {
                        id: node.id,
                        parent_id: pid,
                    });
                    continue;
                }
            },
        };

        if expected.path != node.path {
            issues.push(Inconsistency::PathMismatch {
                id: node.id,
                expected: expected.path,
                actual: node.path.clone(),
            });
        }
        if expected.level != node.level {
            issues.push(Inconsistency::LevelMismatch {
                id: node.id,
                expected: expected.level,
                actual: node.level,
            });
        }
    }

    issues
}

fn in_cycle(start: i32, by_id: &HashMap<i32, &TaxonomyNode>) -> bool {
    let mut seen = HashSet::new();
    let mut current = by_id.get(&start).and_then(|node| node.parent_id);

    while let Some(pid) = current {
        if pid == start {
            return true;
        }
        if !seen.insert(pid) {
            return false;
        }
        current = by_id.get(&pid).and_then(|node| node.parent_id);
    }
    false
}
