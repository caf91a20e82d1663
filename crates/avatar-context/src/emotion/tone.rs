//! Emotion to response-tone mapping.

use serde::{Deserialize, Serialize};

use crate::types::Emotion;

/// How the avatar should shift its tone for a detected emotion.
///
/// Deltas are applied on top of the personality traits by response shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneAdjustment {
    pub warmth_delta: f64,
    pub energy_delta: f64,
    pub formality_delta: f64,
    pub empathy_delta: f64,
    pub guidance: String,
    pub suggested_phrases: Vec<String>,
    pub avoid_phrases: Vec<String>,
}

impl ToneAdjustment {
    /// Deterministic mapping from primary emotion to tone.
    pub fn for_emotion(emotion: Emotion) -> Self {
        let (warmth, energy, formality, empathy, guidance, suggested, avoid): (
            f64,
            f64,
            f64,
            f64,
            &str,
            &[&str],
            &[&str],
        ) = match emotion {
            Emotion::Happy => (
                0.1,
                0.1,
                -0.05,
                0.0,
                "Share the user's good mood and keep the conversation light",
                &["That's great to hear!", "I love that!"],
                &["Unfortunately", "However"],
            ),
            Emotion::Excited => (
                0.1,
                0.2,
                -0.1,
                0.0,
                "Match the user's enthusiasm with an energetic reply",
                &["How exciting!", "Tell me more!"],
                &["Calm down", "Let's be realistic"],
            ),
            Emotion::Sad => (
                0.2,
                -0.2,
                0.0,
                0.3,
                "Respond with empathy and gentle support",
                &["I'm here for you.", "That sounds really hard."],
                &["Cheer up", "It could be worse"],
            ),
            Emotion::Frustrated => (
                0.1,
                -0.1,
                0.05,
                0.2,
                "Acknowledge the frustration and offer concrete help",
                &["Let's sort this out together.", "I understand why that's annoying."],
                &["Just relax", "It's easy"],
            ),
            Emotion::Angry => (
                0.05,
                -0.2,
                0.1,
                0.25,
                "Stay calm, validate the feeling and avoid arguing",
                &["I hear you.", "That would upset me too."],
                &["Calm down", "You're overreacting"],
            ),
            Emotion::Anxious => (
                0.2,
                -0.15,
                0.0,
                0.3,
                "Be reassuring and break things into small steps",
                &["Let's take it one step at a time.", "You're not alone in this."],
                &["Don't worry", "It's nothing"],
            ),
            Emotion::Confused => (
                0.05,
                -0.05,
                0.05,
                0.1,
                "Clarify patiently with simple explanations",
                &["Let me explain that differently.", "Good question!"],
                &["Obviously", "As I already said"],
            ),
            Emotion::Curious => (
                0.05,
                0.1,
                0.0,
                0.0,
                "Feed the curiosity with interesting detail",
                &["Great question!", "Here's something fascinating:"],
                &["It doesn't matter"],
            ),
            Emotion::Grateful => (
                0.15,
                0.05,
                0.0,
                0.05,
                "Accept the thanks warmly",
                &["You're very welcome!", "Happy to help!"],
                &["No problem, whatever"],
            ),
            Emotion::Calm => (
                0.0,
                -0.05,
                0.0,
                0.0,
                "Keep a relaxed, easy-going pace",
                &["Sounds nice and peaceful."],
                &[],
            ),
            Emotion::Neutral => (
                0.0,
                0.0,
                0.0,
                0.0,
                "Respond naturally and stay attentive to cues",
                &[],
                &[],
            ),
        };

        Self {
            warmth_delta: warmth,
            energy_delta: energy,
            formality_delta: formality,
            empathy_delta: empathy,
            guidance: guidance.to_string(),
            suggested_phrases: suggested.iter().map(|s| (*s).to_string()).collect(),
            avoid_phrases: avoid.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}
