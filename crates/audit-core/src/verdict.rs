//! Score tiers and the recommendation shown next to each result.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn from_score(score: i64) -> Self {
        if score >= 70 {
            Tier::High
        } else if score >= 40 {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "Highly Recyclable",
            Tier::Medium => "Moderately Recyclable",
            Tier::Low => "Low Recyclability",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub tier: Tier,
    pub label: String,
    pub description: String,
    pub recommendation: String,
    pub contamination_level: u8,
}

impl Verdict {
    pub fn assess(plastic_type: &str, score: i64, contamination: &str) -> Self {
        let tier = Tier::from_score(score);
        let recommendation = match tier {
            Tier::High => {
                "This item can be recycled. Please place in appropriate recycling bin."
            }
            Tier::Medium if contamination.to_lowercase().contains("high") => {
                "Clean the item before recycling to improve recovery rate."
            }
            Tier::Medium => "Check local recycling guidelines for this plastic type.",
            Tier::Low => "This item has low recyclability. Consider reuse or proper disposal.",
        };
        Self {
            tier,
            label: tier.label().to_string(),
            description: plastic_description(plastic_type).to_string(),
            recommendation: recommendation.to_string(),
            contamination_level: contamination_level(contamination),
        }
    }
}

/// Resin name and typical products for a plastic category code.
pub fn plastic_description(plastic_type: &str) -> &'static str {
    match plastic_type {
        "PET" => "Polyethylene Terephthalate - Bottles & Containers",
        "HDPE" => "High-Density Polyethylene - Milk Jugs & Detergent",
        "PVC" => "Polyvinyl Chloride - Pipes & Credit Cards",
        "LDPE" => "Low-Density Polyethylene - Plastic Bags",
        "PP" => "Polypropylene - Food Containers & Straws",
        "PS" => "Polystyrene - Foam Cups & Packing Materials",
        "OTHER" => "Mixed or Other Plastics",
        _ => "Plastic material detected",
    }
}

/// Rough percentage for a free-form contamination label.
pub fn contamination_level(contamination: &str) -> u8 {
    let level = contamination.to_lowercase();
    if level.contains("high") {
        80
    } else if level.contains("medium") || level.contains("moderate") {
        50
    } else if level.contains("low") {
        20
    } else {
        0
    }
}
