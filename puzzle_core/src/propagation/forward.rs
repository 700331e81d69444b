//! Forward consistency.

use tracing::trace;

use super::workspace::Workspace;
use super::Contradiction;

/// Narrow every live element's allowed targets and settle what that implies
/// for its bounds.
///
/// Targets that never occur are dropped. Between two unambiguous elements
/// the link is kept only if each admits the other. An element left with no
/// targets in some category never occurs, which contradicts a positive
/// minimum.
pub(crate) fn forward_consistency(ws: &mut Workspace) -> Result<bool, Contradiction> {
    let mut changed = false;

    for slot in 0..ws.slots.len() {
        if !ws.slots[slot].is_live() {
            continue;
        }
        let source = &ws.slots[slot];
        let (source_cat, source_local, source_ambiguous) = (source.category, source.local, source.ambiguous);

        for cat in 0..ws.categories.len() {
            let removals: Vec<usize> = ws.domains[slot][cat]
                .iter()
                .filter(|&local| {
                    let target = &ws.slots[ws.members[cat][local]];
                    if !target.is_live() {
                        // Unresolved aliases stay referenced until they fold.
                        return !(target.ambiguous && !target.retired);
                    }
                    !source_ambiguous
                        && !target.ambiguous
                        && !ws.domains[ws.members[cat][local]][source_cat].contains(source_local)
                })
                .collect();
            for local in removals {
                ws.domains[slot][cat].remove(local);
                changed = true;
            }

            if ws.domains[slot][cat].is_empty() {
                let element = ws.element_ref(slot);
                if ws.slots[slot].bounds.min > 0 {
                    trace!(?element, category = %ws.categories[cat], "no admissible targets");
                    return Err(Contradiction::NoTargets {
                        element,
                        category: ws.categories[cat],
                    });
                }
                trace!(?element, "never occurs");
                ws.slots[slot].bounds.max = 0;
                changed = true;
                break;
            }
        }
    }

    for slot in 0..ws.slots.len() {
        let bounds = ws.slots[slot].bounds;
        if !bounds.is_consistent() {
            return Err(Contradiction::InvertedBounds {
                element: ws.element_ref(slot),
                min: bounds.min,
                max: bounds.max,
            });
        }
    }

    Ok(changed)
}
