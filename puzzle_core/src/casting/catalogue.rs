//! Attaching clue catalogues to a cast.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use puzzle_rules::{Cast, Clue};

use crate::fitness;
use crate::propagation::Propagator;

/// What happened to a batch of clues offered to a cast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueReport {
    pub attached: usize,
    /// Clues that contradict the ground truth.
    pub contradictory: usize,
    /// Clues whose accuser is missing from the cast or cannot accuse.
    pub orphaned: usize,
}

/// Validate, price and attach `clues` to their accusers' catalogues.
///
/// A clue is kept only if it is consistent with the full solution. Its
/// obviousness is the ambiguity it removes on its own from the partial
/// baseline.
pub fn attach_clues(cast: &mut Cast, clues: Vec<Clue>, propagator: &Propagator) -> CatalogueReport {
    let mut report = CatalogueReport::default();

    for clue in clues {
        match cast.character(clue.accuser) {
            Some(accuser) if !accuser.red_herring => {}
            Some(_) => {
                warn!(clue = %clue.id, accuser = %clue.accuser, "red herrings cannot accuse; clue dropped");
                report.orphaned += 1;
                continue;
            }
            None => {
                warn!(clue = %clue.id, accuser = %clue.accuser, "accuser is not in the cast; clue dropped");
                report.orphaned += 1;
                continue;
            }
        }

        if let Err(contradiction) = propagator.propagate(&[cast.full.as_ref(), clue.fragment.as_ref()], cast.bounds) {
            warn!(clue = %clue.id, text = %clue.text, %contradiction, "clue contradicts the solution; dropped");
            report.contradictory += 1;
            continue;
        }

        let obviousness = fitness::price(cast, &clue, propagator).unwrap_or_default();
        let clue = clue.with_obviousness(obviousness);
        if let Some(accuser) = cast.character_mut(clue.accuser) {
            accuser.clues.entry(clue.template).or_default().push(clue);
            report.attached += 1;
        }
    }

    debug!(
        attached = report.attached,
        contradictory = report.contradictory,
        orphaned = report.orphaned,
        "catalogue attached"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casting::CastBuilder;
    use puzzle_rules::{
        Assignment, Character, CharacterId, ConstraintModel, DesignerData, Element, PuzzleConfig, Relation, Value,
        Vocabulary,
    };

    struct Scene {
        cast: Cast,
        vocabulary: Vocabulary,
    }

    fn scene() -> Scene {
        let designer = DesignerData::from_json(r#"{ "Name": { "Hugo": [], "Ada": [] }, "Title": { "Duke": [], "Earl": [] } }"#)
            .unwrap();
        let name = designer.category("Name").unwrap();
        let title = designer.category("Title").unwrap();
        let value = |n: &str| Value::Named(designer.vocabulary.symbol(n).unwrap());
        let characters = vec![
            Character::new(Assignment::from([(name, value("Hugo")), (title, value("Duke"))])).with_identity("Hugo"),
            Character::new(Assignment::from([(name, value("Ada")), (title, value("Earl"))]))
                .with_identity("Ada")
                .red_herring(),
        ];

        let mut config = PuzzleConfig::default();
        config.first_order = vec!["Name".to_string(), "Title".to_string()];
        config.cast.given_categories = Vec::new();
        let cast = CastBuilder::new(&config).build(&designer, characters).unwrap();
        Scene {
            cast,
            vocabulary: designer.vocabulary,
        }
    }

    fn clue(scene: &mut Scene, text: &str, title: &str, accuser: CharacterId) -> Clue {
        let template = scene.vocabulary.category(text);
        let subject = scene.vocabulary.value("Subject");
        let name = scene.vocabulary.category("Name");
        let title_category = scene.vocabulary.category("Title");
        let hugo = scene.vocabulary.value("Hugo");
        let title = scene.vocabulary.value(title);
        let fragment = ConstraintModel::new().with_element(
            template,
            subject,
            Element::new()
                .with_bounds(1, 1)
                .with_relation(Relation::unique(name, hugo))
                .with_relation(Relation::unique(title_category, title)),
        );
        Clue::new(template, text, fragment, accuser)
    }

    #[test]
    fn test_attach_sorts_clues() {
        let mut scene = scene();
        let hugo = scene.cast.characters[0].id;
        let herring = scene.cast.characters[1].id;

        let truthful = clue(&mut scene, "Hugo is the Duke", "Duke", hugo);
        let false_claim = clue(&mut scene, "Hugo is the Earl", "Earl", hugo);
        let from_herring = clue(&mut scene, "I saw the Duke Hugo", "Duke", herring);
        let stranger = clue(&mut scene, "Someone saw Hugo", "Duke", CharacterId::new());

        let propagator = Propagator::with_defaults();
        let report = attach_clues(
            &mut scene.cast,
            vec![truthful.clone(), false_claim, from_herring, stranger],
            &propagator,
        );

        assert_eq!(
            report,
            CatalogueReport {
                attached: 1,
                contradictory: 1,
                orphaned: 2,
            }
        );
        let accuser = scene.cast.character(hugo).unwrap();
        assert_eq!(accuser.catalogue_size(), 1);
        assert_eq!(accuser.clues[&truthful.template][0].id, truthful.id);
    }
}
