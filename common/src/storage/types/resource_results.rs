use serde::{Deserialize, Serialize};

pub const FALLBACK_INTRODUCTION: &str = "We found some resources for your area, but could not organize them \
into categories. The raw search results are included below.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResults {
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub categories: Vec<ResourceCategory>,
    /// Set when the model output could not be normalized.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Resource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ResourceResults {
    /// Labelled placeholder for a search that returned text we could not structure.
    pub fn fallback(raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            introduction: FALLBACK_INTRODUCTION.to_string(),
            categories: vec![ResourceCategory {
                name: "Search Results".to_string(),
                resources: vec![Resource {
                    name: "Unformatted search results".to_string(),
                    description: raw_text.clone(),
                    ..Default::default()
                }],
            }],
            fallback: true,
            raw_text: Some(raw_text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.introduction.trim().is_empty() && self.categories.is_empty()
    }
}
