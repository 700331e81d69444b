//! Admissibility Filter - which of a character's clues may still be added.
//!
//! Two style rules keep narratives readable:
//!
//! 1. No template appears twice.
//! 2. No first-order fact is mentioned too often. A fact carried by `n`
//!    characters may be linked to other facts in up to `n` mentions and
//!    mentioned at all in fewer than `2n`.

use std::collections::BTreeMap;

use puzzle_rules::{Category, Character, Clue, ElementRef, FirstOrderTargets, Value};

/// How much more a first-order fact may be mentioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exposure {
    /// May still be linked to other facts.
    Unexposed,
    /// Links are used up; only mentions on its own remain.
    UnderLinked,
    /// No further mentions.
    Saturated,
}

impl Exposure {
    /// Classify a fact from its mention counts.
    pub fn classify(mentions: u32, links: u32, multiplicity: u32) -> Self {
        if mentions < 2 * multiplicity {
            if links < multiplicity {
                Exposure::Unexposed
            } else {
                Exposure::UnderLinked
            }
        } else {
            Exposure::Saturated
        }
    }
}

/// Exposure of every first-order fact given the clues already chosen.
pub fn exposures<'a>(
    narrative: impl IntoIterator<Item = &'a Clue>,
    targets: &FirstOrderTargets,
) -> BTreeMap<ElementRef, Exposure> {
    let associations: Vec<BTreeMap<Category, Value>> = narrative
        .into_iter()
        .flat_map(|clue| clue.associations(&targets.categories))
        .collect();

    targets
        .iter()
        .map(|(fact, target)| {
            let mut mentions = 0;
            let mut links = 0;
            for association in &associations {
                if association.get(&fact.category) == Some(&fact.value) {
                    mentions += 1;
                    if association.len() > 1 {
                        links += 1;
                    }
                }
            }
            (*fact, Exposure::classify(mentions, links, target.multiplicity))
        })
        .collect()
}

/// Whether a candidate clue respects the current exposures.
///
/// Facts outside the targets are unrestricted.
pub fn respects(clue: &Clue, exposures: &BTreeMap<ElementRef, Exposure>, targets: &FirstOrderTargets) -> bool {
    clue.associations(&targets.categories).iter().all(|association| {
        let exposure_of = |(category, value): (&Category, &Value)| exposures.get(&ElementRef::new(*category, *value));
        match association.len() {
            0 => true,
            1 => association.iter().all(|entry| exposure_of(entry) != Some(&Exposure::Saturated)),
            _ => association
                .iter()
                .all(|entry| matches!(exposure_of(entry), None | Some(Exposure::Unexposed))),
        }
    })
}

/// The character's clues that may be appended to `narrative`.
pub fn admissible(character: &Character, narrative: &[Clue], targets: &FirstOrderTargets) -> Vec<Clue> {
    let exposures = exposures(narrative, targets);
    character
        .clues
        .iter()
        .filter(|(template, _)| !narrative.iter().any(|clue| clue.template == **template))
        .flat_map(|(_, clues)| clues.iter())
        .filter(|clue| respects(clue, &exposures, targets))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_rules::{
        Assignment, ConstraintModel, Element, Relation, TargetFact, Vocabulary,
    };
    use std::collections::BTreeSet;

    struct Fixture {
        vocabulary: Vocabulary,
        name: Category,
        title: Category,
        targets: FirstOrderTargets,
    }

    fn fixture() -> Fixture {
        let mut vocabulary = Vocabulary::new();
        let name = vocabulary.category("Name");
        let title = vocabulary.category("Title");
        let mut targets = FirstOrderTargets::new(BTreeSet::from([name, title]));
        for (n, t) in [("Hugo", "Duke"), ("Ada", "Earl")] {
            let n = vocabulary.value(n);
            let t = vocabulary.value(t);
            targets.facts.insert(
                ElementRef::new(name, n),
                TargetFact {
                    multiplicity: 1,
                    resolved: BTreeMap::from([(title, BTreeSet::from([t]))]),
                },
            );
            targets.facts.insert(
                ElementRef::new(title, t),
                TargetFact {
                    multiplicity: 1,
                    resolved: BTreeMap::from([(name, BTreeSet::from([n]))]),
                },
            );
        }
        Fixture {
            vocabulary,
            name,
            title,
            targets,
        }
    }

    /// A clue whose single subject is linked to the given facts.
    fn clue(f: &mut Fixture, template: &str, links: &[(Category, &str)]) -> Clue {
        let template = f.vocabulary.category(template);
        let subject = f.vocabulary.value("Subject");
        let mut element = Element::new().with_bounds(1, 1);
        for (category, value) in links {
            let value = f.vocabulary.value(value);
            element.add_relation(Relation::unique(*category, value));
        }
        let fragment = ConstraintModel::new().with_element(template, subject, element);
        Clue::new(template, "", fragment, Default::default())
    }

    #[test]
    fn test_classify() {
        assert_eq!(Exposure::classify(0, 0, 1), Exposure::Unexposed);
        assert_eq!(Exposure::classify(1, 1, 1), Exposure::UnderLinked);
        assert_eq!(Exposure::classify(2, 1, 1), Exposure::Saturated);
        assert_eq!(Exposure::classify(3, 1, 2), Exposure::Unexposed);
    }

    #[test]
    fn test_repeated_template_is_rejected() {
        let mut f = fixture();
        let (name, title) = (f.name, f.title);
        let used = clue(&mut f, "#A# is a Duke", &[(title, "Duke")]);
        let again = clue(&mut f, "#A# is a Duke", &[(name, "Ada")]);
        let fresh = clue(&mut f, "#A# is Ada", &[(name, "Ada")]);

        let mut character = Character::new(Assignment::new());
        character.clues.insert(again.template, vec![again]);
        character.clues.insert(fresh.template, vec![fresh.clone()]);

        let allowed = admissible(&character, &[used], &f.targets);
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].template, fresh.template);
    }

    #[test]
    fn test_linked_fact_cannot_be_linked_again() {
        let mut f = fixture();
        let (name, title) = (f.name, f.title);
        let linked = clue(&mut f, "#A# is the Duke Hugo", &[(name, "Hugo"), (title, "Duke")]);
        let relink = clue(&mut f, "#A# is Hugo the Earl", &[(name, "Hugo"), (title, "Earl")]);
        let alone = clue(&mut f, "#A# is Hugo", &[(name, "Hugo")]);

        let current = exposures([&linked], &f.targets);
        assert!(!respects(&relink, &current, &f.targets));
        assert!(respects(&alone, &current, &f.targets));

        let saturated = exposures_after(&f, &[&linked, &alone]);
        let again = clue(&mut f, "#A# might be Hugo", &[(name, "Hugo")]);
        assert!(!respects(&again, &saturated, &f.targets));
    }

    fn exposures_after(f: &Fixture, clues: &[&Clue]) -> BTreeMap<ElementRef, Exposure> {
        exposures(clues.iter().copied(), &f.targets)
    }
}
