//! Request and response types for analysis

use serde::{Serialize, Serializer};
use verilens_domain::Category;

/// Input to a single analysis
///
/// Text takes precedence; the image is only read when no usable text was
/// supplied.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Post text typed or pasted by the user
    pub text: Option<String>,

    /// Raw bytes of an uploaded screenshot
    pub image: Option<Vec<u8>>,
}

impl AnalysisRequest {
    /// Request carrying only text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    /// Request carrying only an image
    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            text: None,
            image: Some(image),
        }
    }
}

/// Category decision for a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Assigned category
    pub category: Category,

    /// Short justification, or failure detail
    pub reason: String,
}

/// Truthfulness assessment of a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactCheck {
    /// 0 (false) to 100 (true); `None` when no score could be obtained
    pub score: Option<u8>,

    /// Short reasoning, or failure detail
    pub explanation: String,
}

/// Body returned to the caller
///
/// Serialises flat: `{ "type", "reason" }` plus `"score"` and
/// `"explanation"` for claims only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResponse {
    /// Assigned category
    #[serde(rename = "type", serialize_with = "serialize_category")]
    pub category: Category,

    /// Classification reason
    pub reason: String,

    /// Present iff the category is `claim`
    #[serde(flatten)]
    pub fact_check: Option<FactCheck>,
}

impl AnalysisResponse {
    /// Merge a classification with its optional fact-check
    pub fn merge(classification: Classification, fact_check: Option<FactCheck>) -> Self {
        Self {
            category: classification.category,
            reason: classification.reason,
            fact_check,
        }
    }
}

fn serialize_category<S: Serializer>(category: &Category, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(category.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_claim_serializes_without_fact_check_fields() {
        let response = AnalysisResponse::merge(
            Classification {
                category: Category::MemeOrSarcasm,
                reason: "obvious joke".to_string(),
            },
            None,
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"type": "meme/sarcasm", "reason": "obvious joke"})
        );
    }

    #[test]
    fn test_claim_serializes_flat() {
        let response = AnalysisResponse::merge(
            Classification {
                category: Category::Claim,
                reason: "states a fact".to_string(),
            },
            Some(FactCheck {
                score: Some(3),
                explanation: "the Earth is an oblate spheroid".to_string(),
            }),
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "type": "claim",
                "reason": "states a fact",
                "score": 3,
                "explanation": "the Earth is an oblate spheroid"
            })
        );
    }

    #[test]
    fn test_missing_score_serializes_as_null() {
        let response = AnalysisResponse::merge(
            Classification {
                category: Category::Claim,
                reason: "r".to_string(),
            },
            Some(FactCheck {
                score: None,
                explanation: "quota exceeded".to_string(),
            }),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["score"].is_null());
        assert!(value.as_object().unwrap().contains_key("score"));
    }
}
