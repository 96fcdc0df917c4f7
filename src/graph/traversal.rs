//! Bounded BFS distance over one relationship's directed edges.

use std::collections::HashSet;

use crate::db::Db;
use crate::entity::Entity;
use crate::graph::{store, Relationship};
use crate::Result;

/// Hop limit used when callers don't choose one.
pub const DEFAULT_DISTANCE_LIMIT: usize = 2;

/// Length of the shortest directed path `from → to` along `relationship`,
/// or `None` if there is none of at most `limit` hops.
///
/// 0 when `from` and `to` are the same entity (no lookup), 1 for a direct
/// edge. Each hop is one successor query over the whole frontier, so a
/// limit of `n` issues at most `n` queries. Nodes already reached are not
/// expanded again, which keeps cycles and self-loops finite.
///
/// Targets of a relationship between two different kinds are never sources
/// of it, so such a relationship is searched one hop deep regardless of
/// `limit`.
pub async fn distance_between(
    db: &Db,
    relationship: &Relationship,
    from: &(impl Entity + ?Sized),
    to: &(impl Entity + ?Sized),
    limit: usize,
) -> Result<Option<usize>> {
    let (from_kind, to_kind) = (from.kind(), to.kind());
    relationship.validate_from(&from_kind)?;
    relationship.validate_to(&to_kind)?;

    if from_kind == to_kind && from.id() == to.id() {
        return Ok(Some(0));
    }
    if limit == 0 {
        return Ok(None);
    }

    let target = to.id();
    let max_depth = if relationship.from_kind() == relationship.to_kind() {
        limit
    } else {
        1
    };
    let mut frontier: Vec<i64> = vec![from.id()];
    let mut visited: HashSet<i64> = HashSet::new();

    for depth in 1..=max_depth {
        let name = relationship.name().to_string();
        let expand = frontier;
        let next = db
            .with_connection(move |conn| store::successors(conn, &name, &expand))
            .await?;

        if next.contains(&target) {
            log::debug!(
                "distance {} -> {} on '{}': {}",
                from.id(),
                target,
                relationship.name(),
                depth
            );
            return Ok(Some(depth));
        }

        frontier = next.into_iter().filter(|id| visited.insert(*id)).collect();
        log::debug!(
            "'{}' BFS round {}: {} new node(s)",
            relationship.name(),
            depth,
            frontier.len()
        );
        if frontier.is_empty() {
            break;
        }
    }

    Ok(None)
}
