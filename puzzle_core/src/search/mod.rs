//! Evolutionary Search - looks for a small, hard-to-guess set of clues that
//! makes every first-order fact deducible.
//!
//! Each generation is evaluated, truncated to the population size, mutated
//! and advanced:
//!
//! - **initialise**: every narrative is grown one character at a time
//! - **mutate**: two clues are dropped and the best replacement pair taken
//! - **advance**: the leader seeds the next generation, or with
//!   [`CrossoverMode::Recombine`] parents survive and their per-character
//!   recombinations join them
//!
//! The search stops once the leader has not improved for as many
//! generations as the cast has principals, or when the time budget runs out.

mod choose;
mod deadline;
mod narrative;

pub use choose::*;
pub use deadline::*;
pub use narrative::*;

use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use puzzle_rules::{
    Cast, Character, CharacterId, CharacterOrder, ClueId, ConstraintModel, CrossoverMode, SearchSettings, Vocabulary,
};

use crate::admissibility::admissible;
use crate::fitness::{self, Fitness};
use crate::propagation::{PropagationLimits, Propagator};

/// Most characters a recombination splits between two parents.
const MAX_SPLIT_CHARACTERS: usize = 12;

/// Result of a search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub narrative: Narrative,
    pub generations: usize,
    pub elapsed: Duration,
}

impl SearchOutcome {
    /// Presentation view of the outcome.
    pub fn report(&self, vocabulary: &Vocabulary) -> SearchReport {
        SearchReport {
            clues: self
                .narrative
                .clues
                .iter()
                .map(|clue| ReportedClue {
                    id: clue.id,
                    template: vocabulary.display_category(clue.template),
                    text: clue.text.clone(),
                    accuser: clue.accuser,
                    obviousness: clue.obviousness,
                })
                .collect(),
            fitness: self.narrative.fitness,
            generations: self.generations,
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedClue {
    pub id: ClueId,
    pub template: String,
    pub text: String,
    pub accuser: CharacterId,
    pub obviousness: u32,
}

/// The winning narrative, ready for a presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub clues: Vec<ReportedClue>,
    pub fitness: Fitness,
    pub generations: usize,
    pub elapsed_ms: u64,
}

impl SearchReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Generational search over clue subsets.
#[derive(Debug, Clone)]
pub struct EvolutionarySearch {
    settings: SearchSettings,
    propagator: Propagator,
}

impl EvolutionarySearch {
    pub fn new(settings: SearchSettings) -> Self {
        let propagator = Propagator::new(PropagationLimits::from(&settings));
        Self { settings, propagator }
    }

    pub fn with_defaults() -> Self {
        Self::new(SearchSettings::default())
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Search for the best narrative the cast's catalogues allow.
    ///
    /// Identical settings and cast give identical results as long as the
    /// time budget does not expire.
    pub fn run(&self, cast: &Cast) -> SearchOutcome {
        let started = Instant::now();
        let deadline = Deadline::after(Duration::from_millis(self.settings.max_elapsed_ms));
        let settle = Duration::from_millis(self.settings.min_elapsed_ms);
        let mut rng = ChaCha8Rng::seed_from_u64(self.settings.seed);
        let chooser = Chooser::new(cast, &self.propagator);
        let baseline = Narrative::baseline(cast);

        if cast.characters_with_catalogue().next().is_none() {
            info!("no character has clues to give; returning the empty narrative");
            return SearchOutcome {
                narrative: baseline,
                generations: 0,
                elapsed: started.elapsed(),
            };
        }

        let size = self.settings.population.max(1);
        let patience = cast.principals().max(1);
        let mut population: Vec<Narrative> = (0..size)
            .map(|slot| {
                let narrative = self.initialise(&chooser, &baseline, &mut rng);
                debug!(slot, clues = narrative.len(), fitness = %narrative.fitness, "narrative initialised");
                narrative
            })
            .collect();

        let mut best: Option<Fitness> = None;
        let mut stale = 0;
        let mut generation = 0;
        loop {
            evaluate(&mut population, &mut rng);
            let leader = population[0].fitness;
            match best {
                Some(previous) if leader >= previous => stale += 1,
                _ => {
                    best = Some(leader);
                    stale = 0;
                }
            }
            info!(generation, fitness = %leader, clues = population[0].len(), stale, "generation evaluated");

            if (stale >= patience && started.elapsed() >= settle) || deadline.expired() {
                break;
            }

            population.truncate(size);
            population = population
                .into_iter()
                .map(|narrative| self.mutate(&chooser, narrative, deadline, &mut rng))
                .collect();
            population = self.advance(&chooser, population, deadline, &mut rng);
            generation += 1;
        }

        population.truncate(1);
        let narrative = population.pop().unwrap_or(baseline);
        let elapsed = started.elapsed();
        info!(
            generations = generation,
            elapsed_ms = elapsed.as_millis() as u64,
            fitness = %narrative.fitness,
            clues = narrative.len(),
            "search finished"
        );
        SearchOutcome {
            narrative,
            generations: generation,
            elapsed,
        }
    }

    /// Grow a narrative by letting each character with an admissible clue
    /// contribute one, in random or most-constrained order.
    fn initialise(&self, chooser: &Chooser<'_>, baseline: &Narrative, rng: &mut ChaCha8Rng) -> Narrative {
        let cast = chooser.cast();
        let mut narrative = baseline.clone();
        let mut remaining: Vec<&Character> = cast.characters_with_catalogue().collect();

        loop {
            remaining.shuffle(rng);
            if self.settings.character_order == CharacterOrder::MostConstrained {
                remaining.sort_by_cached_key(|c| admissible(c, &narrative.clues, &cast.targets).len());
            }

            let mut next = None;
            while !remaining.is_empty() {
                let character = remaining.remove(0);
                let clues = admissible(character, &narrative.clues, &cast.targets);
                if !clues.is_empty() {
                    next = Some(clues);
                    break;
                }
            }
            let Some(clues) = next else {
                return narrative;
            };

            let choices = clues.into_iter().map(|clue| narrative.with_clue(clue)).collect();
            narrative = chooser.choose(choices, &narrative, ChooseMode::growth(), Deadline::never(), rng);
        }
    }

    /// Replace two random clues with the best admissible pair from the same
    /// accusers.
    fn mutate(
        &self,
        chooser: &Chooser<'_>,
        narrative: Narrative,
        deadline: Deadline,
        rng: &mut ChaCha8Rng,
    ) -> Narrative {
        if narrative.len() < 2 {
            return narrative;
        }
        let cast = chooser.cast();

        let mut picks = index::sample(rng, narrative.len(), 2).into_vec();
        picks.sort_unstable();
        let mut kept = narrative.clues.clone();
        let second = kept.remove(picks[1]);
        let first = kept.remove(picks[0]);

        let (Some(first_accuser), Some(second_accuser)) = (cast.character(first.accuser), cast.character(second.accuser))
        else {
            return narrative;
        };

        let fragments: Vec<&ConstraintModel> = std::iter::once(cast.partial.as_ref())
            .chain(kept.iter().map(|clue| clue.fragment.as_ref()))
            .collect();
        let model = match self.propagator.propagate(&fragments, cast.bounds) {
            Ok(model) => model,
            Err(contradiction) => {
                debug!(%contradiction, "mutation base contradicts; narrative kept");
                return narrative;
            }
        };
        let stripped = Narrative {
            clues: kept,
            model: Arc::new(model),
            fitness: narrative.fitness,
        };

        let mut choices = Vec::new();
        for a in admissible(first_accuser, &stripped.clues, &cast.targets) {
            let partial = stripped.with_clue(a);
            for b in admissible(second_accuser, &partial.clues, &cast.targets) {
                let choice = partial.with_clue(b);
                if fitness::unknowns(&choice.clues, &cast.targets) <= narrative.fitness.unknowns {
                    choices.push(choice);
                }
            }
        }

        let offered = choices.len();
        let mutated = chooser.choose(choices, &narrative, ChooseMode::mutation(), deadline, rng);
        debug!(offered, before = %narrative.fitness, after = %mutated.fitness, "mutation");
        mutated
    }

    /// Form the next generation from the mutated one.
    fn advance(
        &self,
        chooser: &Chooser<'_>,
        mut population: Vec<Narrative>,
        deadline: Deadline,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Narrative> {
        evaluate(&mut population, rng);
        match self.settings.crossover {
            CrossoverMode::Elitist => vec![population[0].clone(); self.settings.population.max(1)],
            CrossoverMode::Recombine => {
                let mut next = population.clone();
                for i in 0..population.len() {
                    for j in i + 1..population.len() {
                        let child = self.recombine(chooser, &population[i], &population[j], deadline, rng);
                        if !child.same_clues(&population[i]) && !child.same_clues(&population[j]) {
                            next.push(child);
                        }
                    }
                }
                next
            }
        }
    }

    /// Best splice of two parents, taking each shared character's clues from
    /// one parent. `preferred` is returned when no splice improves on it.
    fn recombine(
        &self,
        chooser: &Chooser<'_>,
        preferred: &Narrative,
        other: &Narrative,
        deadline: Deadline,
        rng: &mut ChaCha8Rng,
    ) -> Narrative {
        let cast = chooser.cast();
        let speaks_in = |narrative: &Narrative, id: CharacterId| narrative.clues.iter().any(|clue| clue.accuser == id);
        let shared: Vec<CharacterId> = cast
            .characters
            .iter()
            .filter(|c| c.is_principal() && speaks_in(preferred, c.id) && speaks_in(other, c.id))
            .map(|c| c.id)
            .take(MAX_SPLIT_CHARACTERS)
            .collect();
        if shared.len() < 2 {
            return preferred.clone();
        }

        let empty = Narrative::baseline(cast);
        let mut choices = Vec::new();
        for mask in 1..(1u32 << shared.len()) - 1 {
            let donor = |id: CharacterId| match shared.iter().position(|s| *s == id) {
                Some(bit) if mask & (1 << bit) != 0 => other,
                _ => preferred,
            };
            let mut child = empty.clone();
            for character in &cast.characters {
                let parent = donor(character.id);
                child
                    .clues
                    .extend(parent.clues.iter().filter(|clue| clue.accuser == character.id).cloned());
            }
            if child.has_distinct_templates() {
                choices.push(child);
            }
        }

        let depth = choices.iter().map(Narrative::len).max().unwrap_or(0);
        chooser.choose(choices, preferred, ChooseMode::recombination(depth), deadline, rng)
    }
}

impl Default for EvolutionarySearch {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Sort best first, breaking ties at random.
fn evaluate(population: &mut [Narrative], rng: &mut ChaCha8Rng) {
    population.shuffle(rng);
    population.sort_by_key(|narrative| narrative.fitness);
}
