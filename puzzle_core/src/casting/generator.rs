//! Random cast generation from designer data.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use puzzle_rules::{
    Assignment, Cast, CastBounds, CastSettings, Category, Character, CharacterId, ConstraintModel, DesignerData,
    PuzzleConfig, Value, Vocabulary,
};

use super::CastBuilder;
use crate::error::CastError;

/// Draws characters one by one, each consistent with the designer's
/// relations, and hands them to a [`CastBuilder`].
#[derive(Debug, Clone)]
pub struct CastGenerator {
    settings: CastSettings,
    builder: CastBuilder,
}

struct IdentitySlot {
    category: Category,
    unique: bool,
    marker: bool,
}

impl CastGenerator {
    pub fn new(config: &PuzzleConfig) -> Self {
        Self {
            settings: config.cast.clone(),
            builder: CastBuilder::new(config),
        }
    }

    /// Builder: replace the cast builder.
    pub fn with_builder(mut self, builder: CastBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Generate a cast of `principals + red_herrings` characters.
    ///
    /// Red herrings are drawn last and never receive the marker category.
    pub fn generate<R: Rng>(&self, designer: &DesignerData, rng: &mut R) -> Result<Cast, CastError> {
        let slots = self.identity_slots(&designer.vocabulary)?;
        let propagator = self.builder.propagator();
        let descriptors = propagator.propagate(&[&designer.model], CastBounds::open())?;

        for attempt in 1..=self.settings.attempts {
            match self.draw(&descriptors, &slots, &designer.vocabulary, rng) {
                Some(characters) => {
                    info!(attempt, characters = characters.len(), "cast drawn");
                    return self.builder.build(designer, characters);
                }
                None => debug!(attempt, "cast draw failed"),
            }
        }
        Err(CastError::Infeasible {
            attempts: self.settings.attempts,
        })
    }

    fn identity_slots(&self, vocabulary: &Vocabulary) -> Result<Vec<IdentitySlot>, CastError> {
        self.settings
            .identity_categories
            .iter()
            .map(|identity| {
                let category = vocabulary
                    .symbol(&identity.name)
                    .map(Category)
                    .ok_or_else(|| CastError::UnknownCategory(identity.name.clone()))?;
                Ok(IdentitySlot {
                    category,
                    unique: identity.unique,
                    marker: self.settings.marker_category.as_deref() == Some(identity.name.as_str()),
                })
            })
            .collect()
    }

    fn draw<R: Rng>(
        &self,
        descriptors: &ConstraintModel,
        slots: &[IdentitySlot],
        vocabulary: &Vocabulary,
        rng: &mut R,
    ) -> Option<Vec<Character>> {
        let propagator = self.builder.propagator();
        let total = self.settings.principals + self.settings.red_herrings;
        let mut pool = descriptors.clone();
        let mut characters = Vec::with_capacity(total as usize);

        for index in 0..total {
            let red_herring = index >= self.settings.principals;
            let mut model = propagator.propagate(&[&pool], CastBounds::single()).ok()?;

            for slot in slots.iter().filter(|slot| !(red_herring && slot.marker)) {
                let mut choices: Vec<Value> = model
                    .category(slot.category)
                    .into_iter()
                    .flatten()
                    .filter(|(value, element)| !value.is_sentinel() && element.is_live())
                    .map(|(value, _)| *value)
                    .collect();
                choices.shuffle(rng);

                let (value, pinned) = choices.into_iter().find_map(|value| {
                    let mut candidate = model.clone();
                    let element = candidate.entry(slot.category, value);
                    element.bounds.raise_min(1);
                    element.bounds.lower_max(1);
                    propagator
                        .propagate(&[&candidate], CastBounds::single())
                        .ok()
                        .map(|pinned| (value, pinned))
                })?;
                model = pinned;
                if slot.unique {
                    pool.entry(slot.category, value).bounds.lower_max(0);
                }
            }

            let assignment: Assignment = model
                .elements()
                .filter(|(element_ref, element)| {
                    element.bounds.min >= 1 && !element.ambiguous && !element_ref.value.is_sentinel()
                })
                .map(|(element_ref, _)| (element_ref.category, element_ref.value))
                .collect();

            let mut character =
                Character::new(assignment).with_id(CharacterId::from_uuid(Uuid::from_u128(rng.gen())));
            character.identity = character.compose_identity(&self.settings.identity_format, vocabulary);
            if red_herring {
                character = character.red_herring();
            }
            characters.push(character);
        }
        Some(characters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::{PropagationLimits, Propagator};
    use puzzle_rules::IdentityCategory;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    const DESIGNER: &str = r#"{
        "Name": { "Hugo": [], "Ada": [], "Otto": [] },
        "Title": { "Duke": [], "Earl": [] },
        "Headline": { "Poisoner": [], "Forger": [] }
    }"#;

    fn config(principals: u32, red_herrings: u32) -> PuzzleConfig {
        let mut config = PuzzleConfig::default();
        config.first_order = vec!["Name".to_string(), "Title".to_string()];
        config.cast = CastSettings {
            principals,
            red_herrings,
            identity_categories: vec![
                IdentityCategory::new("Name", true),
                IdentityCategory::new("Title", false),
                IdentityCategory::new("Headline", true),
            ],
            marker_category: Some("Headline".to_string()),
            given_categories: vec!["Title".to_string()],
            identity_format: "#Name# the #Title#".to_string(),
            ..CastSettings::default()
        };
        config
    }

    #[test]
    fn test_generated_cast_respects_uniqueness() {
        let designer = DesignerData::from_json(DESIGNER).unwrap();
        let name = designer.category("Name").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let cast = CastGenerator::new(&config(2, 1)).generate(&designer, &mut rng).unwrap();

        assert_eq!(cast.characters.len(), 3);
        assert_eq!(cast.principals(), 2);
        let names: BTreeSet<Value> = cast.characters.iter().map(|c| c.value(name)).collect();
        assert_eq!(names.len(), 3);
        assert!(cast.characters.iter().all(|c| c.identity.is_some()));
        assert!(cast.full.admits(&cast.assignments()));
    }

    #[test]
    fn test_red_herrings_skip_the_marker() {
        let designer = DesignerData::from_json(DESIGNER).unwrap();
        let headline = designer.category("Headline").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let cast = CastGenerator::new(&config(2, 1)).generate(&designer, &mut rng).unwrap();

        let herring = &cast.characters[2];
        assert!(herring.red_herring);
        assert_eq!(herring.value(headline), Value::Undefined);
        assert!(cast.characters[..2].iter().all(|c| c.value(headline) != Value::Undefined));
    }

    #[test]
    fn test_same_seed_same_cast() {
        let designer = DesignerData::from_json(DESIGNER).unwrap();
        let generator = CastGenerator::new(&config(2, 0));
        let a = generator.generate(&designer, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        let b = generator.generate(&designer, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        assert_eq!(a.assignments(), b.assignments());
        assert_eq!(a.characters[0].id, b.characters[0].id);
    }

    #[test]
    fn test_custom_builder_is_used() {
        let designer = DesignerData::from_json(DESIGNER).unwrap();
        let config = config(2, 0);
        let limits = PropagationLimits {
            hall_subset_size: 1,
            max_rounds: 50,
        };
        let generator =
            CastGenerator::new(&config).with_builder(CastBuilder::new(&config).with_propagator(Propagator::new(limits)));
        assert_eq!(generator.builder.propagator().limits(), limits);

        let cast = generator.generate(&designer, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert!(cast.full.admits(&cast.assignments()));
    }

    #[test]
    fn test_exhausted_names_are_infeasible() {
        let designer = DesignerData::from_json(DESIGNER).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            CastGenerator::new(&config(4, 0)).generate(&designer, &mut rng),
            Err(CastError::Infeasible { attempts: 1 })
        ));
    }
}
