//! Designer data: the JSON file authors write categories, elements and
//! relations in.
//!
//! ```json
//! { "Domain": { "Ravenmoor": [["Nobility", "=>", "Duke/Earl"], ["Domain", "MAX:1", "Ravenmoor"]] } }
//! ```
//!
//! Tokens are consumed verbatim and target sets are joined with `/`.

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::RulesError;
use crate::model::{ConstraintModel, Element};
use crate::relations::{Relation, RelationKind, SET_SEPARATOR};
use crate::vocabulary::{Category, Value, Vocabulary};

/// A parsed designer file.
#[derive(Debug, Clone, Default)]
pub struct DesignerData {
    pub vocabulary: Vocabulary,
    pub model: ConstraintModel,
    /// Categories the file declares.
    pub categories: Vec<Category>,
}

impl DesignerData {
    /// Parse designer data into a fresh vocabulary.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let mut vocabulary = Vocabulary::new();
        let (model, categories) = parse_into(&mut vocabulary, json)?;
        Ok(Self {
            vocabulary,
            model,
            categories,
        })
    }

    /// Read and parse a designer file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Result<Category, RulesError> {
        self.vocabulary
            .symbol(name)
            .map(Category)
            .filter(|c| self.model.contains_category(*c))
            .ok_or_else(|| RulesError::UnknownCategory(name.to_string()))
    }
}

/// Parse designer JSON, interning names into an existing vocabulary.
///
/// Used for clue fragments and other data that must share symbols with an
/// already-loaded cast.
pub fn parse_into(vocabulary: &mut Vocabulary, json: &str) -> Result<(ConstraintModel, Vec<Category>), RulesError> {
    let document: Map<String, Json> = serde_json::from_str(json)?;
    if document.is_empty() {
        return Err(RulesError::EmptyDesigner);
    }

    let mut model = ConstraintModel::new();
    let mut categories = Vec::new();

    for (category_name, elements) in &document {
        let category = vocabulary.category(category_name);
        model.ensure_category(category);
        categories.push(category);

        let elements: BTreeMap<String, Vec<Vec<String>>> = serde_json::from_value(elements.clone())?;
        for (element_name, relations) in elements {
            let value = vocabulary.value(&element_name);
            let mut element = Element::new();
            for parts in relations {
                let [target, token, targets]: [String; 3] =
                    parts.try_into().map_err(|parts: Vec<String>| RulesError::RelationArity {
                        category: category_name.clone(),
                        element: element_name.clone(),
                        found: parts.len(),
                    })?;
                let kind: RelationKind = token.parse()?;
                let target = vocabulary.category(&target);
                let targets = targets
                    .split(SET_SEPARATOR)
                    .map(|name| vocabulary.value(name))
                    .collect::<Vec<_>>();
                element.add_relation(Relation::new(target, kind, targets));
            }
            model.merge_element(category, value, &element);
        }
    }

    Ok((model, categories))
}

/// Render a model back into designer JSON.
pub fn to_json(model: &ConstraintModel, vocabulary: &Vocabulary) -> Result<String, RulesError> {
    let mut document = Map::new();
    for category in model.categories() {
        let mut elements = Map::new();
        for (value, element) in model.category(category).into_iter().flatten() {
            let relations: Vec<Json> = element
                .relations
                .iter()
                .map(|relation| {
                    let targets = relation
                        .targets
                        .iter()
                        .map(|t| token_name(*t, vocabulary))
                        .collect::<Vec<_>>()
                        .join(&SET_SEPARATOR.to_string());
                    Json::from(vec![
                        vocabulary.display_category(relation.category),
                        relation.kind.as_token(),
                        targets,
                    ])
                })
                .collect();
            elements.insert(token_name(*value, vocabulary), Json::Array(relations));
        }
        document.insert(vocabulary.display_category(category), Json::Object(elements));
    }
    Ok(serde_json::to_string_pretty(&document)?)
}

fn token_name(value: Value, vocabulary: &Vocabulary) -> String {
    match value {
        Value::Empty => String::new(),
        other => vocabulary.display_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Domain": {
            "Ravenmoor": [["Nobility", "=>", "Duke/Earl"], ["Domain", "MAX:1", "Ravenmoor"]],
            "Thornwick": [["Nobility", "!=", "Duke"]]
        },
        "Nobility": { "Duke": [], "Earl": [] }
    }"#;

    #[test]
    fn test_parse_designer_data() {
        let data = DesignerData::from_json(SAMPLE).unwrap();
        let domain = data.category("Domain").unwrap();
        let nobility = data.category("Nobility").unwrap();
        let ravenmoor = Value::Named(data.vocabulary.symbol("Ravenmoor").unwrap());

        let element = data.model.element(domain, ravenmoor).unwrap();
        assert_eq!(element.relations.len(), 2);
        assert_eq!(element.relations[0].kind, RelationKind::Implies);
        assert_eq!(element.relations[1].kind, RelationKind::Maximum(1));
        assert_eq!(data.model.forward_targets(domain, ravenmoor, nobility).map(|t| t.len()), None);
        assert_eq!(data.categories.len(), 2);
    }

    #[test]
    fn test_load_designer_file() {
        let path = std::env::temp_dir().join(format!("puzzle_designer_{}.json", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        let data = DesignerData::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(data.categories.len(), 2);

        assert!(matches!(DesignerData::load(&path), Err(RulesError::Io(_))));
    }

    #[test]
    fn test_malformed_designer_data() {
        assert!(matches!(DesignerData::from_json("{"), Err(RulesError::Json(_))));
        assert!(matches!(DesignerData::from_json("{}"), Err(RulesError::EmptyDesigner)));
        assert!(matches!(
            DesignerData::from_json(r#"{"A": {"x": [["B", "=>"]]}}"#),
            Err(RulesError::RelationArity { found: 2, .. })
        ));
        assert!(matches!(
            DesignerData::from_json(r#"{"A": {"x": [["B", "~>", "y"]]}}"#),
            Err(RulesError::UnknownToken(_))
        ));
        assert!(matches!(
            DesignerData::from_json(r#"{"A": {"x": [["B", "MIN:lots", "y"]]}}"#),
            Err(RulesError::InvalidCount(_))
        ));
    }

    #[test]
    fn test_sentinel_targets_and_render() {
        let data = DesignerData::from_json(r#"{"A": {"x": [["B", "=>|", "UNDEFINED/"]]}}"#).unwrap();
        let a = data.category("A").unwrap();
        let x = Value::Named(data.vocabulary.symbol("x").unwrap());
        let targets = &data.model.element(a, x).unwrap().relations[0].targets;
        assert!(targets.contains(&Value::Undefined));
        assert!(targets.contains(&Value::Empty));

        let rendered = to_json(&data.model, &data.vocabulary).unwrap();
        assert!(rendered.contains("\"=>|\""));
        assert!(rendered.contains("\"UNDEFINED/\""));
    }
}
