//! Negation inference and placeholder handling.

use tracing::trace;

use super::target_set::TargetSet;
use super::workspace::Workspace;

/// If `a` can only co-occur with values in `S` within some category, and `c`
/// can reach none of `S` there, then `a` and `c` never co-occur.
pub(crate) fn infer_negations(ws: &mut Workspace) -> bool {
    let categories = ws.categories.len();
    let expanded: Vec<Vec<TargetSet>> = (0..ws.slots.len())
        .map(|slot| (0..categories).map(|cat| ws.expand(slot, cat)).collect())
        .collect();

    let mut changed = false;
    for a in 0..ws.slots.len() {
        if !ws.slots[a].is_live() {
            continue;
        }
        for cat_c in 0..categories {
            let removals: Vec<usize> = ws.domains[a][cat_c]
                .iter()
                .filter(|&local| {
                    let c = ws.members[cat_c][local];
                    c != a
                        && ws.slots[c].is_live()
                        && (0..categories)
                            .filter(|&cat_b| cat_b != cat_c)
                            .any(|cat_b| !expanded[a][cat_b].intersects(&expanded[c][cat_b]))
                })
                .collect();
            for local in removals {
                trace!(source = ?ws.element_ref(a), target = ?ws.element_ref(ws.members[cat_c][local]), "inferred negation");
                ws.domains[a][cat_c].remove(local);
                changed = true;
            }
        }
    }
    changed
}

/// Placeholder rules.
///
/// - A placeholder separated from a subject cannot hold any value the
///   subject holds uniquely.
/// - A placeholder that exists and is tied to a unique concrete element
///   shares that element's carrier, so their allowed sets meet.
/// - A placeholder that never occurs and names a single concrete identity is
///   an alias: its knowledge folds onto that identity and references to it
///   are redirected there.
pub(crate) fn resolve_placeholders(ws: &mut Workspace) -> bool {
    let mut changed = false;
    for slot in 0..ws.slots.len() {
        if !ws.slots[slot].ambiguous {
            continue;
        }
        if ws.slots[slot].is_live() {
            changed |= exclude_separated(ws, slot);
            changed |= share_carrier(ws, slot);
        } else if !ws.slots[slot].retired {
            changed |= fold_alias(ws, slot);
        }
    }
    changed
}

fn exclude_separated(ws: &mut Workspace, slot: usize) -> bool {
    let mut changed = false;
    for separation in ws.separations[slot].clone() {
        for subject in separation.targets {
            let held = &ws.slots[subject];
            if held.ambiguous || !held.is_live() || held.bounds.min == 0 {
                continue;
            }
            for cat in 0..ws.categories.len() {
                let Some(local) = ws.domains[subject][cat].only() else {
                    continue;
                };
                let value = &ws.slots[ws.members[cat][local]];
                if value.ambiguous || value.bounds.max > 1 {
                    continue;
                }
                if ws.domains[slot][cat].remove(local) {
                    trace!(placeholder = ?ws.element_ref(slot), "separated from unique value");
                    changed = true;
                }
            }
        }
    }
    changed
}

fn share_carrier(ws: &mut Workspace, slot: usize) -> bool {
    if ws.slots[slot].bounds.min == 0 {
        return false;
    }
    let mut changed = false;
    for cat in 0..ws.categories.len() {
        let Some(local) = ws.domains[slot][cat].only() else {
            continue;
        };
        let anchor = ws.members[cat][local];
        let held = &ws.slots[anchor];
        if held.ambiguous || !held.is_live() || held.bounds.max > 1 {
            continue;
        }
        for other in 0..ws.categories.len() {
            let expanded = ws.expand(slot, other);
            changed |= ws.domains[anchor][other].intersect_with(&expanded);
            let anchored = ws.domains[anchor][other].clone();
            changed |= ws.domains[slot][other].intersect_with(&anchored);
        }
    }
    changed
}

fn fold_alias(ws: &mut Workspace, slot: usize) -> bool {
    let own = ws.slots[slot].category;
    let own_local = ws.slots[slot].local;

    let mut identity = ws.domains[slot][own].clone();
    identity.remove(own_local);
    let Some(local) = identity.only() else {
        return false;
    };
    let target = ws.members[own][local];
    if ws.slots[target].ambiguous || !ws.slots[target].is_live() {
        return false;
    }
    let has_empty_domain = (0..ws.categories.len()).any(|cat| {
        ws.domains[slot][cat]
            .iter()
            .all(|l| !ws.slots[ws.members[cat][l]].is_live())
    });
    if has_empty_domain {
        return false;
    }

    trace!(alias = ?ws.element_ref(slot), target = ?ws.element_ref(target), "folding alias");
    for cat in 0..ws.categories.len() {
        if cat == own {
            continue;
        }
        let expanded = ws.expand(slot, cat);
        ws.domains[target][cat].intersect_with(&expanded);
    }

    for other in 0..ws.slots.len() {
        if other == slot || !ws.slots[other].ambiguous {
            continue;
        }
        if ws.domains[other][own].remove(own_local) {
            ws.domains[other][own].insert(local);
        }
    }
    ws.slots[slot].retired = true;
    true
}
