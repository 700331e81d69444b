//! Counting passes: cast-wide bound tightening and Hall-style saturation.

use tracing::trace;

use puzzle_rules::Bounds;

use super::target_set::TargetSet;
use super::workspace::Workspace;
use super::Contradiction;

fn finite(max: u32) -> Option<u64> {
    (max != Bounds::UNBOUNDED).then_some(max as u64)
}

fn clamp(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(Bounds::UNBOUNDED)
}

/// Every character holds exactly one value per category, so a category's
/// concrete occurrences add up to the cast size.
pub(crate) fn tighten_bounds(ws: &mut Workspace) -> Result<bool, Contradiction> {
    let floor = ws.bounds.floor as u64;
    let ceiling = ws.bounds.ceiling.map(u64::from);
    let mut changed = false;

    for cat in 0..ws.categories.len() {
        let slots: Vec<usize> = ws.members[cat]
            .iter()
            .copied()
            .filter(|s| !ws.slots[*s].ambiguous)
            .collect();
        let total_min: u64 = slots.iter().map(|s| ws.slots[*s].bounds.min as u64).sum();
        let total_max: Option<u64> = slots.iter().map(|s| finite(ws.slots[*s].bounds.max)).sum();

        if let Some(ceiling) = ceiling {
            if total_min > ceiling {
                return Err(Contradiction::Overdemanded {
                    category: ws.categories[cat],
                    demand: total_min,
                    supply: ceiling,
                });
            }
        }
        if let Some(total_max) = total_max {
            if total_max < floor {
                return Err(Contradiction::Overdemanded {
                    category: ws.categories[cat],
                    demand: floor,
                    supply: total_max,
                });
            }
        }

        for &slot in &slots {
            let bounds = ws.slots[slot].bounds;
            if let Some(ceiling) = ceiling {
                let others_min = total_min - bounds.min as u64;
                changed |= ws.slots[slot].bounds.lower_max(clamp(ceiling - others_min));
            }
            if let Some(total_max) = total_max {
                let others_max = total_max - bounds.max as u64;
                if floor > others_max {
                    changed |= ws.slots[slot].bounds.raise_min(clamp(floor - others_max));
                }
            }
            let bounds = ws.slots[slot].bounds;
            if !bounds.is_consistent() {
                return Err(Contradiction::InvertedBounds {
                    element: ws.element_ref(slot),
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
    }
    Ok(changed)
}

/// Hall-style saturation between two categories.
///
/// For a set `U` of values in category A, let `N` be every value of B they
/// may co-occur with and `M` the values of B that can only co-occur with
/// members of `U`. Every carrier of `M` is a carrier of `U`, so `M`'s
/// minimum demand can never exceed `U`'s maximum supply. When the two are
/// equal, `U` and `M` are saturated and cover exactly the same characters.
///
/// Groups of up to `limit` values are grown in index order, each new member
/// sharing a neighbour with the group so far; a group whose neighbourhoods
/// split apart is no stronger than its parts. Stops at the first change so
/// the cheaper passes can run again.
pub(crate) fn saturate(ws: &mut Workspace, limit: usize) -> Result<bool, Contradiction> {
    let categories = ws.categories.len();
    for cat_a in 0..categories {
        let candidates: Vec<usize> = (0..ws.members[cat_a].len())
            .filter(|&local| {
                let slot = &ws.slots[ws.members[cat_a][local]];
                !slot.ambiguous && slot.is_live()
            })
            .collect();

        for cat_b in (0..categories).filter(|&b| b != cat_a) {
            let mut group = Vec::new();
            let reach = TargetSet::empty(ws.members[cat_b].len());
            if grow(ws, cat_a, cat_b, &candidates, 0, limit, &mut group, &reach)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[allow(clippy::too_many_arguments)]
fn grow(
    ws: &mut Workspace,
    cat_a: usize,
    cat_b: usize,
    candidates: &[usize],
    start: usize,
    limit: usize,
    group: &mut Vec<usize>,
    reach: &TargetSet,
) -> Result<bool, Contradiction> {
    if group.len() >= limit {
        return Ok(false);
    }
    for i in start..candidates.len() {
        let local = candidates[i];
        let slot = ws.members[cat_a][local];
        let bounded = finite(ws.slots[slot].bounds.max).is_some();
        if !group.is_empty() && (!bounded || !ws.domains[slot][cat_b].intersects(reach)) {
            continue;
        }
        let mut widened = reach.clone();
        widened.union_with(&ws.domains[slot][cat_b]);

        group.push(local);
        let changed = saturate_group(ws, cat_a, cat_b, group)?
            || (bounded && grow(ws, cat_a, cat_b, candidates, i + 1, limit, group, &widened)?);
        group.pop();
        if changed {
            return Ok(true);
        }
    }
    Ok(false)
}

fn saturate_group(ws: &mut Workspace, cat_a: usize, cat_b: usize, group: &[usize]) -> Result<bool, Contradiction> {
    let members: Vec<usize> = group.iter().map(|&local| ws.members[cat_a][local]).collect();
    if members.iter().any(|&m| !ws.slots[m].is_live()) {
        return Ok(false);
    }
    let supply: Option<u64> = members.iter().map(|&m| finite(ws.slots[m].bounds.max)).sum();
    if supply.is_none() && group.len() > 1 {
        return Ok(false);
    }

    let mut group_set = TargetSet::empty(ws.members[cat_a].len());
    for &local in group {
        group_set.insert(local);
    }
    let mut neighbours = TargetSet::empty(ws.members[cat_b].len());
    for &m in &members {
        neighbours.union_with(&ws.domains[m][cat_b]);
    }
    let matched: Vec<usize> = neighbours
        .iter()
        .filter(|&local| {
            let slot = ws.members[cat_b][local];
            !ws.slots[slot].ambiguous && ws.slots[slot].is_live() && ws.domains[slot][cat_a].is_subset(&group_set)
        })
        .collect();
    if matched.is_empty() {
        return Ok(false);
    }
    let demand: u64 = matched
        .iter()
        .map(|&local| ws.slots[ws.members[cat_b][local]].bounds.min as u64)
        .sum();

    if members.len() == 1 {
        let raised = ws.slots[members[0]].bounds.raise_min(clamp(demand));
        if raised {
            trace!(element = ?ws.element_ref(members[0]), demand, "raised minimum from dependants");
            return Ok(true);
        }
    }

    let Some(supply) = supply else {
        return Ok(false);
    };
    if demand > supply {
        return Err(Contradiction::Overdemanded {
            category: ws.categories[cat_b],
            demand,
            supply,
        });
    }
    if demand < supply {
        return Ok(false);
    }

    let mut changed = false;
    for &m in &members {
        let max = ws.slots[m].bounds.max;
        changed |= ws.slots[m].bounds.raise_min(max);
    }
    for &local in &matched {
        let slot = ws.members[cat_b][local];
        let min = ws.slots[slot].bounds.min;
        changed |= ws.slots[slot].bounds.lower_max(min);
    }
    for local in neighbours.iter() {
        if matched.contains(&local) {
            continue;
        }
        let slot = ws.members[cat_b][local];
        if ws.slots[slot].ambiguous {
            continue;
        }
        changed |= ws.domains[slot][cat_a].subtract(&group_set);
        for &m in &members {
            changed |= ws.domains[m][cat_b].remove(local);
        }
    }
    if changed {
        trace!(category = %ws.categories[cat_a], size = group.len(), "saturated group");
    }
    Ok(changed)
}
