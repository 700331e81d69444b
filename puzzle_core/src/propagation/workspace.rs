//! Index arena the passes work on.
//!
//! Every element of the merged model becomes a slot. Each slot keeps, per
//! category, the set of that category's elements it may co-occur with. Sets
//! only ever shrink, so a round that removes nothing is a fixed point.

use puzzle_rules::{
    Bounds, CastBounds, Category, ConstraintModel, Element, ElementRef, Relation, RelationKind, Value,
};
use std::collections::{BTreeMap, BTreeSet};

use super::target_set::TargetSet;

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub category: usize,
    pub local: usize,
    pub value: Value,
    pub bounds: Bounds,
    pub ambiguous: bool,
    /// Placeholder already folded onto the element it aliases.
    pub retired: bool,
}

impl Slot {
    pub fn is_live(&self) -> bool {
        self.bounds.is_live()
    }

    pub fn element_ref(&self, categories: &[Category]) -> ElementRef {
        ElementRef::new(categories[self.category], self.value)
    }
}

/// A mutual negation attached to a slot: the slot's carrier is none of `targets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Separation {
    pub category: usize,
    pub targets: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    pub categories: Vec<Category>,
    /// Category -> slots, in local order.
    pub members: Vec<Vec<usize>>,
    pub slots: Vec<Slot>,
    /// Slot -> category -> allowed targets.
    pub domains: Vec<Vec<TargetSet>>,
    pub separations: Vec<Vec<Separation>>,
    pub bounds: CastBounds,
}

impl Workspace {
    /// Union the fragments and set up the initial domains.
    pub fn build(fragments: &[&ConstraintModel], bounds: CastBounds) -> Self {
        let merged = merge(fragments);

        let categories: Vec<Category> = merged.categories().collect();
        let category_index: BTreeMap<Category, usize> =
            categories.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let mut members = vec![Vec::new(); categories.len()];
        let mut slots = Vec::new();
        let mut slot_index = BTreeMap::new();
        for (cat, category) in categories.iter().enumerate() {
            for (value, element) in merged.category(*category).into_iter().flatten() {
                let id = slots.len();
                slots.push(Slot {
                    category: cat,
                    local: members[cat].len(),
                    value: *value,
                    bounds: element.bounds,
                    ambiguous: element.ambiguous,
                    retired: false,
                });
                members[cat].push(id);
                slot_index.insert(ElementRef::new(*category, *value), id);
            }
        }

        let mut workspace = Self {
            categories,
            members,
            slots,
            domains: Vec::new(),
            separations: Vec::new(),
            bounds,
        };
        workspace.hoist_bounds(&merged, &slot_index, &category_index);
        workspace.initial_domains();
        workspace.apply_relations(&merged, &slot_index, &category_index);
        workspace
    }

    fn hoist_bounds(
        &mut self,
        merged: &ConstraintModel,
        slot_index: &BTreeMap<ElementRef, usize>,
        category_index: &BTreeMap<Category, usize>,
    ) {
        for (_, element) in merged.elements() {
            for relation in &element.relations {
                if !category_index.contains_key(&relation.category) {
                    continue;
                }
                for target in &relation.targets {
                    let Some(&slot) = slot_index.get(&ElementRef::new(relation.category, *target)) else {
                        continue;
                    };
                    match relation.kind {
                        RelationKind::Minimum(n) => {
                            self.slots[slot].bounds.raise_min(n);
                        }
                        RelationKind::Maximum(n) => {
                            self.slots[slot].bounds.lower_max(n);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn initial_domains(&mut self) {
        let sizes: Vec<usize> = self.members.iter().map(Vec::len).collect();
        self.domains = self
            .slots
            .iter()
            .map(|slot| {
                sizes
                    .iter()
                    .enumerate()
                    .map(|(cat, &size)| {
                        if cat == slot.category && !slot.ambiguous {
                            return TargetSet::single(size, slot.local);
                        }
                        let mut set = TargetSet::full(size);
                        if !slot.ambiguous {
                            for (local, &member) in self.members[cat].iter().enumerate() {
                                if self.slots[member].ambiguous {
                                    set.remove(local);
                                }
                            }
                        }
                        set
                    })
                    .collect()
            })
            .collect();
        self.separations = vec![Vec::new(); self.slots.len()];
    }

    fn apply_relations(
        &mut self,
        merged: &ConstraintModel,
        slot_index: &BTreeMap<ElementRef, usize>,
        category_index: &BTreeMap<Category, usize>,
    ) {
        for (source_ref, element) in merged.elements() {
            let source = slot_index[&source_ref];
            let source_cat = self.slots[source].category;

            for relation in &element.relations {
                let Some(&target_cat) = category_index.get(&relation.category) else {
                    continue;
                };
                let targets: Vec<usize> = relation
                    .targets
                    .iter()
                    .filter_map(|t| slot_index.get(&ElementRef::new(relation.category, *t)).copied())
                    .collect();
                let mut target_set = TargetSet::empty(self.members[target_cat].len());
                for &t in &targets {
                    target_set.insert(self.slots[t].local);
                }
                let source_single = TargetSet::single(self.members[source_cat].len(), self.slots[source].local);

                match relation.kind.canonical(relation.targets.len()) {
                    RelationKind::ForwardUnique | RelationKind::ForwardSet | RelationKind::EquivalenceSet => {
                        self.domains[source][target_cat].intersect_with(&target_set);
                    }
                    RelationKind::Equivalence => {
                        self.domains[source][target_cat].intersect_with(&target_set);
                        for &t in &targets {
                            self.domains[t][source_cat].intersect_with(&source_single);
                        }
                    }
                    RelationKind::Backward => {
                        for &t in &targets {
                            self.domains[t][source_cat].intersect_with(&source_single);
                        }
                    }
                    kind @ (RelationKind::Negation | RelationKind::MutualNegation) => {
                        self.domains[source][target_cat].subtract(&target_set);
                        for &t in &targets {
                            self.domains[t][source_cat].subtract(&source_single);
                        }
                        if kind == RelationKind::MutualNegation {
                            self.separate(source, target_cat, targets.clone());
                            for &t in &targets {
                                self.separate(t, source_cat, vec![source]);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn separate(&mut self, slot: usize, category: usize, targets: Vec<usize>) {
        let separation = Separation { category, targets };
        if !self.separations[slot].contains(&separation) {
            self.separations[slot].push(separation);
        }
    }

    pub fn element_ref(&self, slot: usize) -> ElementRef {
        self.slots[slot].element_ref(&self.categories)
    }

    /// Concrete elements a slot's targets in `category` may stand for.
    ///
    /// Unambiguous targets stand for themselves; a placeholder stands for
    /// whatever its own identity set reaches.
    pub fn expand(&self, slot: usize, category: usize) -> TargetSet {
        let mut out = TargetSet::empty(self.members[category].len());
        let mut visited = BTreeSet::from([slot]);
        self.expand_into(&self.domains[slot][category], category, &mut out, &mut visited);
        out
    }

    fn expand_into(&self, set: &TargetSet, category: usize, out: &mut TargetSet, visited: &mut BTreeSet<usize>) {
        for local in set.iter() {
            let member = self.members[category][local];
            if !self.slots[member].ambiguous {
                out.insert(local);
            } else if visited.insert(member) {
                self.expand_into(&self.domains[member][category], category, out, visited);
            }
        }
    }

    /// Turn the arena back into a model.
    ///
    /// Each live element gets one forward relation per category (the
    /// unambiguous self-identity is implicit); elements that never occur
    /// point at `Empty` everywhere.
    pub fn emit(&self) -> ConstraintModel {
        let mut model = ConstraintModel::new();
        for category in &self.categories {
            model.ensure_category(*category);
        }

        for (id, slot) in self.slots.iter().enumerate() {
            let mut element = Element {
                bounds: slot.bounds,
                ambiguous: slot.ambiguous,
                relations: Vec::new(),
            };

            if !slot.is_live() {
                for category in &self.categories {
                    element.relations.push(Relation::unique(*category, Value::Empty));
                }
            } else {
                for (cat, category) in self.categories.iter().enumerate() {
                    if cat == slot.category && !slot.ambiguous {
                        continue;
                    }
                    let targets: BTreeSet<Value> = self.domains[id][cat]
                        .iter()
                        .map(|local| self.slots[self.members[cat][local]].value)
                        .collect();
                    element.relations.push(Relation::forward(*category, targets));
                }

                let mut separated: BTreeMap<usize, BTreeSet<Value>> = BTreeMap::new();
                for separation in &self.separations[id] {
                    separated
                        .entry(separation.category)
                        .or_default()
                        .extend(separation.targets.iter().map(|t| self.slots[*t].value));
                }
                for (cat, targets) in separated {
                    element
                        .relations
                        .push(Relation::new(self.categories[cat], RelationKind::MutualNegation, targets));
                }
            }

            model.insert(self.categories[slot.category], slot.value, element);
        }
        model
    }
}

/// Union every fragment, creating referenced elements and the per-category
/// sentinels.
fn merge(fragments: &[&ConstraintModel]) -> ConstraintModel {
    let mut merged = ConstraintModel::new();
    for fragment in fragments {
        for (element_ref, element) in fragment.elements() {
            merged.merge_element(element_ref.category, element_ref.value, element);
        }
        for category in fragment.categories() {
            merged.ensure_category(category);
        }
    }

    let referenced: Vec<ElementRef> = merged
        .elements()
        .flat_map(|(_, element)| {
            element
                .relations
                .iter()
                .flat_map(|r| r.targets.iter().map(move |t| ElementRef::new(r.category, *t)))
        })
        .collect();
    for element_ref in referenced {
        merged.entry(element_ref.category, element_ref.value);
    }

    let categories: Vec<Category> = merged.categories().collect();
    for category in categories {
        merged.entry(category, Value::Undefined);
        merged.entry(category, Value::Empty).bounds = Bounds::never();
    }
    merged
}
