use serde::{Deserialize, Serialize};

/// Classification assigned by the model from relative search volume vs
/// competition. Never derived locally; the enum only names what came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quadrant {
    GoldMine,
    LongTail,
    WarZone,
    TrashRisk,
}

impl Quadrant {
    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::GoldMine => "💎 Gold Mine",
            Quadrant::LongTail => "🎯 Long Tail",
            Quadrant::WarZone => "⚔️ War Zone",
            Quadrant::TrashRisk => "❌ Trash/Risk",
        }
    }

    pub const ALL: [Quadrant; 4] = [
        Quadrant::GoldMine,
        Quadrant::LongTail,
        Quadrant::WarZone,
        Quadrant::TrashRisk,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRecord {
    pub keyword: String,
    pub search_volume: f64,
    pub competition: f64,
    pub quadrant: Quadrant,
    pub reason: String,
}

/// What the model inferred about the product from the uploaded images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductContext {
    pub niche: String,
    pub is_physical: bool,
    pub visual_style: String,
}

/// One complete report. Replaces any prior result wholesale; keyword order is
/// exactly as received — sorting for display happens at render time only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub product_context: ProductContext,
    pub keywords: Vec<KeywordRecord>,
    pub value_analysis: String,
    pub pricing_strategy: String,
    pub next_steps: Vec<String>,
}

/// Reply shape for the keyword-idea call. An absent `suggestions` field reads
/// as an empty list, never null.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSuggestions {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "productContext": {
                "niche": "Cottagecore Kitchen",
                "isPhysical": true,
                "visualStyle": "Pastel ceramic, hand-painted strawberries"
            },
            "keywords": [
                {"keyword": "Strawberry Cow Mug", "searchVolume": 2400, "competition": 310, "quadrant": "GOLD_MINE", "reason": "High demand, few listings"},
                {"keyword": "Cute Mug", "searchVolume": 9000, "competition": 88000, "quadrant": "WAR_ZONE", "reason": "Saturated head term"},
                {"keyword": "Crochet Mug Pattern", "searchVolume": 120, "competition": 54000, "quadrant": "TRASH_RISK", "reason": "Digital intent against a physical item"}
            ],
            "valueAnalysis": "**Gold mine** terms match the visual style.",
            "pricingStrategy": "Price at $24-28 for perceived handmade value.",
            "nextSteps": ["Strawberry Kitchen Decor", "Cow Print Cup"]
        }"#
    }

    #[test]
    fn parses_conformant_response_preserving_order() {
        let result: AnalysisResult = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(result.keywords.len(), 3);
        // Order as supplied, not volume-sorted (9000 comes second).
        assert_eq!(result.keywords[0].keyword, "Strawberry Cow Mug");
        assert_eq!(result.keywords[0].search_volume, 2400.0);
        assert_eq!(result.keywords[0].competition, 310.0);
        assert_eq!(result.keywords[0].quadrant, Quadrant::GoldMine);
        assert_eq!(result.keywords[1].search_volume, 9000.0);
        assert!(result.product_context.is_physical);
    }

    #[test]
    fn parse_is_deterministic() {
        let a: AnalysisResult = serde_json::from_str(sample_json()).unwrap();
        let b: AnalysisResult = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unknown_quadrant() {
        let json = r#"{"keyword": "x", "searchVolume": 1, "competition": 1, "quadrant": "MAYBE", "reason": ""}"#;
        assert!(serde_json::from_str::<KeywordRecord>(json).is_err());
    }

    #[test]
    fn rejects_missing_required_field() {
        // No pricingStrategy.
        let json = r#"{
            "productContext": {"niche": "n", "isPhysical": false, "visualStyle": "s"},
            "keywords": [],
            "valueAnalysis": "v",
            "nextSteps": []
        }"#;
        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }

    #[test]
    fn quadrant_wire_names_are_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&Quadrant::TrashRisk).unwrap(),
            "\"TRASH_RISK\""
        );
    }

    #[test]
    fn missing_suggestions_field_reads_as_empty() {
        let parsed: KeywordSuggestions = serde_json::from_str("{}").unwrap();
        assert!(parsed.suggestions.is_empty());
    }
}
