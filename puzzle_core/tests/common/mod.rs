//! Shared fixture: five nobles, each with one value per category, and one
//! testimony per noble tying their name to their title.

#![allow(dead_code)]

use puzzle_core::{attach_clues, CastBuilder, Propagator};
use puzzle_rules::{
    Assignment, Cast, Category, Character, CharacterId, Clue, ConstraintModel, DesignerData, Element, PuzzleConfig,
    Relation, Value, Vocabulary,
};

pub const NOBLES: [(&str, &str, &str, &str); 5] = [
    ("Hugo", "Duke", "Ravenmoor", "Poisoner"),
    ("Ada", "Earl", "Thornwick", "Forger"),
    ("Otto", "Baron", "Ashford", "Smuggler"),
    ("Vera", "Count", "Dunmere", "Blackmailer"),
    ("Ines", "Viscount", "Kelby", "Spy"),
];

pub struct Fixture {
    pub cast: Cast,
    pub vocabulary: Vocabulary,
    pub name: Category,
    pub title: Category,
}

impl Fixture {
    pub fn value(&self, name: &str) -> Value {
        Value::Named(self.vocabulary.symbol(name).expect("value is interned"))
    }

    pub fn character(&self, index: usize) -> CharacterId {
        self.cast.characters[index].id
    }
}

fn designer() -> DesignerData {
    let mut categories = [String::new(), String::new(), String::new(), String::new()];
    for (name, title, domain, headline) in NOBLES {
        for (i, value) in [name, title, domain, headline].into_iter().enumerate() {
            if !categories[i].is_empty() {
                categories[i].push_str(", ");
            }
            categories[i].push_str(&format!("\"{value}\": []"));
        }
    }
    let json = format!(
        r#"{{ "Name": {{ {} }}, "Title": {{ {} }}, "Domain": {{ {} }}, "Headline": {{ {} }} }}"#,
        categories[0], categories[1], categories[2], categories[3]
    );
    DesignerData::from_json(&json).expect("fixture designer data parses")
}

pub fn config() -> PuzzleConfig {
    let mut config = PuzzleConfig::default();
    config.first_order = vec!["Name".to_string(), "Title".to_string()];
    config.cast.principals = NOBLES.len() as u32;
    config.cast.given_categories = Vec::new();
    config.search.seed = 42;
    config.search.max_elapsed_ms = 120_000;
    config
}

/// The cast without any clues attached.
pub fn bare_cast() -> Fixture {
    let designer = designer();
    let categories: Vec<Category> = ["Name", "Title", "Domain", "Headline"]
        .iter()
        .map(|c| designer.category(c).expect("fixture category exists"))
        .collect();
    let value = |n: &str| Value::Named(designer.vocabulary.symbol(n).expect("fixture value exists"));

    let characters = NOBLES
        .iter()
        .map(|(name, title, domain, headline)| {
            let assignment: Assignment = categories
                .iter()
                .copied()
                .zip([*name, *title, *domain, *headline].map(value))
                .collect();
            Character::new(assignment).with_identity(format!("{name} the {title}"))
        })
        .collect();

    let cast = CastBuilder::new(&config())
        .build(&designer, characters)
        .expect("fixture cast is consistent");
    Fixture {
        vocabulary: designer.vocabulary.clone(),
        name: categories[0],
        title: categories[1],
        cast,
    }
}

/// A testimony by `accuser`: someone is both `name` and the `title`.
pub fn testimony(fixture: &mut Fixture, name: &str, title: &str, accuser: CharacterId) -> Clue {
    let text = format!("The {title} answers to {name}");
    let template = fixture.vocabulary.category(&text);
    let subject = fixture.vocabulary.value("Subject");
    let name_value = fixture.vocabulary.value(name);
    let title_value = fixture.vocabulary.value(title);
    let fragment = ConstraintModel::new().with_element(
        template,
        subject,
        Element::new()
            .with_bounds(1, 1)
            .with_relation(Relation::minimum(fixture.name, 1, [name_value]))
            .with_relation(Relation::unique(fixture.name, name_value))
            .with_relation(Relation::minimum(fixture.title, 1, [title_value]))
            .with_relation(Relation::unique(fixture.title, title_value)),
    );
    Clue::new(template, text, fragment, accuser)
}

/// The cast with one truthful testimony per noble about themselves.
pub fn cast_with_testimonies() -> Fixture {
    let mut fixture = bare_cast();
    let clues: Vec<Clue> = (0..NOBLES.len())
        .map(|i| {
            let (name, title, _, _) = NOBLES[i];
            let accuser = fixture.character(i);
            testimony(&mut fixture, name, title, accuser)
        })
        .collect();
    let report = attach_clues(&mut fixture.cast, clues, &Propagator::with_defaults());
    assert_eq!(report.attached, NOBLES.len());
    fixture
}
