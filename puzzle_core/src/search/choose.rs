//! Picking one continuation out of many candidate narratives.

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, trace};

use puzzle_rules::{Cast, ConstraintModel};

use super::{Deadline, Narrative};
use crate::fitness::{self, Fitness};
use crate::propagation::Propagator;

/// How [`Chooser::choose`] orders and scores its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChooseMode {
    /// Clues at the end of each candidate that its model does not include yet.
    pub depth: usize,
    /// Try candidates that reveal the least first.
    pub incremental: bool,
    /// Order ambiguous and resolved candidates at random.
    pub shuffle: bool,
}

impl ChooseMode {
    /// Adding one clue to a growing narrative.
    pub fn growth() -> Self {
        Self {
            depth: 1,
            incremental: true,
            shuffle: true,
        }
    }

    /// Replacing two clues of an existing narrative.
    pub fn mutation() -> Self {
        Self {
            depth: 2,
            incremental: false,
            shuffle: true,
        }
    }

    /// Candidates assembled from scratch; nothing is propagated yet.
    pub fn recombination(depth: usize) -> Self {
        Self {
            depth,
            incremental: false,
            shuffle: true,
        }
    }
}

/// Scores candidates against a cast and returns the first improvement.
#[derive(Debug, Clone, Copy)]
pub struct Chooser<'a> {
    cast: &'a Cast,
    propagator: &'a Propagator,
}

impl<'a> Chooser<'a> {
    pub fn new(cast: &'a Cast, propagator: &'a Propagator) -> Self {
        Self { cast, propagator }
    }

    pub fn cast(&self) -> &'a Cast {
        self.cast
    }

    pub fn propagator(&self) -> &'a Propagator {
        self.propagator
    }

    /// Pick a continuation of `baseline` from `choices`.
    ///
    /// Candidates are filtered and ordered by their cheap scores, then
    /// propagated one at a time; the first that [`Fitness::improves_on`] the
    /// baseline wins. Without a winner the fallback is a candidate with
    /// nothing unknown, the baseline's ambiguity and fewer templates in
    /// common with the baseline, or else the baseline itself.
    pub fn choose<R: Rng>(
        &self,
        choices: Vec<Narrative>,
        baseline: &Narrative,
        mode: ChooseMode,
        deadline: Deadline,
        rng: &mut R,
    ) -> Narrative {
        let offered = choices.len();
        let choices = self.order(choices, baseline, mode, rng);
        if choices.is_empty() {
            trace!(offered, "no candidate worth scoring");
            return baseline.clone();
        }

        let mut failsafe: Option<Narrative> = None;
        let mut scored = 0;
        for mut choice in choices {
            if deadline.expired() {
                debug!(scored, "choice budget expired");
                break;
            }
            scored += 1;

            let fresh = choice.clues.len().saturating_sub(mode.depth);
            let fragments: Vec<&ConstraintModel> = std::iter::once(choice.model.as_ref())
                .chain(choice.clues[fresh..].iter().map(|clue| clue.fragment.as_ref()))
                .collect();
            let model = match self.propagator.propagate(&fragments, self.cast.bounds) {
                Ok(model) => model,
                Err(contradiction) => {
                    trace!(%contradiction, "candidate discarded");
                    continue;
                }
            };
            choice.fitness.ambiguities = fitness::ambiguities(&model, &self.cast.targets);
            choice.model = Arc::new(model);

            if choice.fitness.improves_on(&baseline.fitness) {
                debug!(scored, offered, fitness = %choice.fitness, "improvement found");
                return choice;
            }

            let current = failsafe.as_ref().unwrap_or(baseline);
            if choice.fitness.unknowns == 0
                && choice.fitness.ambiguities == current.fitness.ambiguities
                && choice.collisions(baseline) < current.collisions(baseline)
            {
                failsafe = Some(choice);
            }
        }

        debug!(scored, offered, diversified = failsafe.is_some(), "no improvement found");
        failsafe.unwrap_or_else(|| baseline.clone())
    }

    /// Fill in the cheap scores, drop hopeless candidates and order the rest.
    fn order<R: Rng>(
        &self,
        mut choices: Vec<Narrative>,
        baseline: &Narrative,
        mode: ChooseMode,
        rng: &mut R,
    ) -> Vec<Narrative> {
        let targets = &self.cast.targets;
        for choice in &mut choices {
            choice.fitness = Fitness::new(
                fitness::unknowns(&choice.clues, targets),
                baseline.fitness.ambiguities,
                fitness::obviousness(&choice.clues),
            );
        }
        let base = baseline.fitness;
        choices.retain(|c| c.fitness.unknowns < base.unknowns || c.fitness.unknowns == 0);

        // Shuffling before a stable sort breaks ties at random.
        choices.shuffle(rng);
        if base.unknowns > 0 {
            sort_by_unknowns(&mut choices, mode.incremental);
        } else if base.ambiguities > 0 {
            let cap = 1usize
                .checked_shl(self.cast.principals() as u32)
                .unwrap_or(usize::MAX);
            choices.truncate(cap);
            if !mode.shuffle {
                sort_by_unknowns(&mut choices, mode.incremental);
            }
        } else {
            choices.retain(|c| c.fitness.unknowns == 0 && c.fitness.obviousness < base.obviousness);
            if !mode.shuffle {
                if mode.incremental {
                    choices.sort_by_key(|c| std::cmp::Reverse(c.fitness.obviousness));
                } else {
                    choices.sort_by_key(|c| c.fitness.obviousness);
                }
            }
        }
        choices
    }
}

fn sort_by_unknowns(choices: &mut [Narrative], incremental: bool) {
    if incremental {
        choices.sort_by_key(|c| std::cmp::Reverse(c.fitness.unknowns));
    } else {
        choices.sort_by_key(|c| c.fitness.unknowns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_rules::{
        CastBounds, Category, Character, CharacterId, Clue, Element, ElementRef, FirstOrderTargets, Relation,
        TargetFact, Vocabulary,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::{BTreeMap, BTreeSet};

    struct Scene {
        vocabulary: Vocabulary,
        cast: Cast,
        name: Category,
    }

    /// One character, Hugo, whose name is the only target.
    fn scene() -> Scene {
        let mut vocabulary = Vocabulary::new();
        let name = vocabulary.category("Name");
        let hugo = vocabulary.value("Hugo");
        let model = ConstraintModel::new().with_element(name, hugo, Element::new());

        let mut targets = FirstOrderTargets::new(BTreeSet::from([name]));
        targets.facts.insert(
            ElementRef::new(name, hugo),
            TargetFact {
                multiplicity: 1,
                resolved: BTreeMap::new(),
            },
        );
        let model = Arc::new(model);
        let cast = Cast {
            vocabulary: vocabulary.clone(),
            characters: vec![Character::new(BTreeMap::from([(name, hugo)])).with_identity("Hugo")],
            minimal: Arc::clone(&model),
            partial: Arc::clone(&model),
            full: model,
            targets,
            bounds: CastBounds::new(1, Some(1)),
            unknowns: 1,
            ambiguities: 0,
        };
        Scene { vocabulary, cast, name }
    }

    fn reveal(scene: &mut Scene, template: &str, value: &str, obviousness: u32) -> Clue {
        let template = scene.vocabulary.category(template);
        let subject = scene.vocabulary.value("Subject");
        let value = scene.vocabulary.value(value);
        let fragment = ConstraintModel::new().with_element(
            template,
            subject,
            Element::new()
                .with_bounds(1, 1)
                .with_relation(Relation::minimum(scene.name, 1, [value])),
        );
        Clue::new(template, "", fragment, CharacterId::new()).with_obviousness(obviousness)
    }

    #[test]
    fn test_first_improvement_wins() {
        let mut scene = scene();
        let useless = reveal(&mut scene, "#A# knows Otto", "Otto", 0);
        let useful = reveal(&mut scene, "#A# knows Hugo", "Hugo", 0);

        let baseline = Narrative::baseline(&scene.cast);
        let propagator = Propagator::with_defaults();
        let chooser = Chooser::new(&scene.cast, &propagator);
        let chosen = chooser.choose(
            vec![baseline.with_clue(useless), baseline.with_clue(useful.clone())],
            &baseline,
            ChooseMode::growth(),
            Deadline::never(),
            &mut ChaCha8Rng::seed_from_u64(0),
        );
        assert_eq!(chosen.clues.len(), 1);
        assert_eq!(chosen.clues[0].id, useful.id);
        assert_eq!(chosen.fitness.unknowns, 0);
    }

    #[test]
    fn test_no_improvement_keeps_baseline() {
        let mut scene = scene();
        let useless = reveal(&mut scene, "#A# knows Otto", "Otto", 0);
        let baseline = Narrative::baseline(&scene.cast);
        let propagator = Propagator::with_defaults();
        let chosen = Chooser::new(&scene.cast, &propagator).choose(
            vec![baseline.with_clue(useless)],
            &baseline,
            ChooseMode::growth(),
            Deadline::never(),
            &mut ChaCha8Rng::seed_from_u64(0),
        );
        assert!(chosen.is_empty());
        assert_eq!(chosen.fitness, baseline.fitness);
    }

    #[test]
    fn test_resolved_baseline_prefers_less_obvious() {
        let mut scene = scene();
        let blunt = reveal(&mut scene, "#A# is plainly Hugo", "Hugo", 5);
        let subtle = reveal(&mut scene, "#A# hints at Hugo", "Hugo", 2);
        let propagator = Propagator::with_defaults();
        let chooser = Chooser::new(&scene.cast, &propagator);

        let baseline = Narrative::baseline(&scene.cast);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let solved = chooser.choose(
            vec![baseline.with_clue(blunt.clone())],
            &baseline,
            ChooseMode::growth(),
            Deadline::never(),
            &mut rng,
        );
        assert!(solved.fitness.is_solved());

        let empty = Narrative::baseline(&scene.cast);
        let swapped = chooser.choose(
            vec![empty.with_clue(subtle.clone()), empty.with_clue(blunt)],
            &solved,
            ChooseMode::recombination(1),
            Deadline::never(),
            &mut rng,
        );
        assert_eq!(swapped.clues[0].id, subtle.id);
        assert_eq!(swapped.fitness.obviousness, 2);
    }
}
