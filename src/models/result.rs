//! Result-side models: the six generation modules and their canonical output shapes.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Year used for search records whose year is missing or unparseable
pub const DEFAULT_RECORD_YEAR: i32 = 2023;

/// Maximum number of titles a topic result carries
pub const MAX_TITLES: usize = 8;

/// The generation actions offered by the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Topic,
    Outline,
    Draft,
    Polish,
    Search,
    Citations,
}

impl Module {
    /// All modules in page order
    pub const ALL: [Module; 6] = [
        Module::Topic,
        Module::Outline,
        Module::Draft,
        Module::Polish,
        Module::Search,
        Module::Citations,
    ];

    /// Module identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Topic => "topic",
            Module::Outline => "outline",
            Module::Draft => "draft",
            Module::Polish => "polish",
            Module::Search => "search",
            Module::Citations => "citations",
        }
    }

    /// Endpoint name under `/api/`
    pub fn endpoint(&self) -> &'static str {
        match self {
            Module::Search => "search-refs",
            Module::Citations => "insert-refs",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "topic" => Ok(Module::Topic),
            "outline" => Ok(Module::Outline),
            "draft" => Ok(Module::Draft),
            "polish" => Ok(Module::Polish),
            "search" | "search-refs" => Ok(Module::Search),
            "citations" | "insert-refs" => Ok(Module::Citations),
            _ => Err(UnknownModule(s.to_string())),
        }
    }
}

/// Returned when a module name is not one of the six modules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown module: {0}")]
pub struct UnknownModule(pub String);

/// One literature search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub title: String,
    pub year: i32,
    pub source: String,
}

impl SearchRecord {
    pub fn new(title: impl Into<String>, year: i32, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year,
            source: source.into(),
        }
    }
}

/// The normalized output of a module. Each variant serializes to the exact
/// object shape the front end renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CanonicalResult {
    Topic {
        titles: Vec<String>,
    },
    Outline {
        sections: Vec<String>,
        logic: Vec<String>,
    },
    Draft {
        draft: String,
    },
    Polish {
        polished: String,
    },
    Search {
        results: Vec<SearchRecord>,
    },
    Citations {
        #[serde(rename = "citationBlock")]
        citation_block: String,
    },
}

impl CanonicalResult {
    /// The module this result belongs to
    pub fn module(&self) -> Module {
        match self {
            CanonicalResult::Topic { .. } => Module::Topic,
            CanonicalResult::Outline { .. } => Module::Outline,
            CanonicalResult::Draft { .. } => Module::Draft,
            CanonicalResult::Polish { .. } => Module::Polish,
            CanonicalResult::Search { .. } => Module::Search,
            CanonicalResult::Citations { .. } => Module::Citations,
        }
    }

    /// Whether the result satisfies its module's shape: non-empty titles
    /// (at most eight), non-empty sections, non-empty text blocks, and
    /// search records with a title and source.
    pub fn is_well_formed(&self) -> bool {
        let filled = |items: &[String]| items.iter().all(|s| !s.trim().is_empty());
        match self {
            CanonicalResult::Topic { titles } => {
                !titles.is_empty() && titles.len() <= MAX_TITLES && filled(titles)
            }
            CanonicalResult::Outline { sections, logic } => {
                !sections.is_empty() && filled(sections) && filled(logic)
            }
            CanonicalResult::Draft { draft } => !draft.trim().is_empty(),
            CanonicalResult::Polish { polished } => !polished.trim().is_empty(),
            CanonicalResult::Search { results } => {
                !results.is_empty()
                    && results
                        .iter()
                        .all(|r| !r.title.trim().is_empty() && !r.source.trim().is_empty())
            }
            CanonicalResult::Citations { citation_block } => !citation_block.trim().is_empty(),
        }
    }
}

/// A model offered by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub label: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
        }
    }
}

/// Answer to a model listing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListing {
    pub models: Vec<ModelInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelListing {
    pub fn ok(models: Vec<ModelInfo>) -> Self {
        Self {
            models,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            models: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_module_parsing() {
        assert_eq!("topic".parse::<Module>().unwrap(), Module::Topic);
        assert_eq!("search-refs".parse::<Module>().unwrap(), Module::Search);
        assert_eq!("insert-refs".parse::<Module>().unwrap(), Module::Citations);
        assert!("summary".parse::<Module>().is_err());

        for module in Module::ALL {
            assert_eq!(module.endpoint().parse::<Module>().unwrap(), module);
        }
    }

    #[test]
    fn test_result_wire_shapes() {
        let citations = CanonicalResult::Citations {
            citation_block: "Suggested citations: A; B".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&citations).unwrap(),
            json!({"citationBlock": "Suggested citations: A; B"})
        );

        let search = CanonicalResult::Search {
            results: vec![SearchRecord::new("T", 2021, "S")],
        };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({"results": [{"title": "T", "year": 2021, "source": "S"}]})
        );
    }

    #[test]
    fn test_well_formed() {
        assert!(!CanonicalResult::Topic { titles: vec![] }.is_well_formed());
        assert!(CanonicalResult::Outline {
            sections: vec!["Intro".to_string()],
            logic: vec![],
        }
        .is_well_formed());
        assert!(!CanonicalResult::Draft {
            draft: "  ".to_string()
        }
        .is_well_formed());
    }
}
