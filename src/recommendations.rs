//! Intervention statements for a risk assessment
//!
//! Rules are evaluated in a fixed priority order and each appends at most one
//! sentence. The overall-risk banner is inserted at the front afterwards.

use crate::models::RiskLevel;

/// Everything the generator looks at
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationInput {
    pub risk_level: RiskLevel,
    pub compound_multiplier: f64,
    pub compound_alert_threshold: f64,

    pub acwr: Option<f64>,
    pub load_spike_score: f64,
    pub training_monotony: Option<f64>,
    pub training_strain: Option<f64>,
    pub max_z_score_7d: f64,

    pub avg_sleep_hours: Option<f64>,
    pub sleep_modifier: f64,
    pub avg_stress: Option<f64>,
    pub stress_modifier: f64,
    pub days_since_injury: Option<i64>,
    pub injury_recency_modifier: f64,
    pub age: Option<u32>,
    pub age_modifier: f64,

    pub recovery_score: f64,
    pub lifestyle_score: f64,
    pub injury_history_score: f64,
}

/// Fallback when no rule fires
pub const NO_ACTION_NEEDED: &str =
    "✅ Athlete showing good balance. Continue current training plan.";

/// Recommendation text generator
pub struct RecommendationGenerator;

impl RecommendationGenerator {
    /// Ordered intervention statements
    pub fn generate(input: &RecommendationInput) -> Vec<String> {
        let mut recommendations = Vec::new();

        Self::compound_alert(input, &mut recommendations);
        Self::monotony_and_strain(input, &mut recommendations);
        Self::zscore_spike(input, &mut recommendations);
        Self::workload(input, &mut recommendations);
        Self::sleep(input, &mut recommendations);
        Self::stress(input, &mut recommendations);
        Self::injury(input, &mut recommendations);
        Self::age(input, &mut recommendations);
        Self::recovery(input, &mut recommendations);
        Self::lifestyle(input, &mut recommendations);

        match input.risk_level {
            RiskLevel::High => recommendations.insert(
                0,
                "🚨 HIGH RISK ALERT: Immediate intervention required. Consider rest day or active recovery only.".to_string(),
            ),
            RiskLevel::Medium => recommendations.insert(
                0,
                "⚠️ MODERATE RISK: Monitor closely. Modify training intensity/volume as needed."
                    .to_string(),
            ),
            RiskLevel::Low => {}
        }

        if recommendations.is_empty() {
            recommendations.push(NO_ACTION_NEEDED.to_string());
        }

        recommendations
    }

    /// Newline-joined text as stored on a [`RiskResult`](crate::models::RiskResult)
    pub fn render(input: &RecommendationInput) -> String {
        Self::generate(input).join("\n")
    }

    fn compound_alert(input: &RecommendationInput, out: &mut Vec<String>) {
        if input.compound_multiplier > input.compound_alert_threshold {
            out.push(format!(
                "🔥 COMPOUND RISK: Multiple risk factors stack to {:.2}× baseline risk. Address sleep, stress and recovery together before adding load.",
                input.compound_multiplier
            ));
        }
    }

    fn monotony_and_strain(input: &RecommendationInput, out: &mut Vec<String>) {
        let Some(monotony) = input.training_monotony else {
            return;
        };
        let strain = input.training_strain.unwrap_or(0.0);

        if monotony > 2.0 {
            out.push(format!(
                "🔁 Training monotony is very high ({:.2}, strain {:.0}). Vary daily load and schedule at least one low-intensity day.",
                monotony, strain
            ));
        } else if monotony > 1.5 {
            out.push(format!(
                "🔁 Training monotony elevated ({:.2}, strain {:.0}). Introduce more hard/easy variation across the week.",
                monotony, strain
            ));
        }
    }

    fn zscore_spike(input: &RecommendationInput, out: &mut Vec<String>) {
        let z = input.max_z_score_7d;
        if z > 2.5 {
            out.push(format!(
                "📈 Extreme load spike: {:.1} standard deviations above this athlete's baseline in the last 7 days. Reduce the next sessions to baseline volume.",
                z
            ));
        } else if z > 2.0 {
            out.push(format!(
                "📈 Significant load spike: {:.1} standard deviations above baseline this week. Avoid further increases until load stabilises.",
                z
            ));
        }
    }

    fn workload(input: &RecommendationInput, out: &mut Vec<String>) {
        if let Some(acwr) = input.acwr.filter(|&a| a > 0.0) {
            if acwr > 1.5 {
                out.push(format!(
                    "⚠️ ACWR is very high ({:.2} > 1.5). Reduce training volume by 20-30% this week.",
                    acwr
                ));
            } else if acwr < 0.8 {
                out.push(format!(
                    "⚠️ ACWR is very low ({:.2} < 0.8). Athlete may be detraining. Gradually increase load.",
                    acwr
                ));
            } else if acwr > 1.3 {
                out.push(format!(
                    "⚡ ACWR elevated ({:.2} > 1.3). Monitor closely and consider 10-15% volume reduction.",
                    acwr
                ));
            }
        }

        if input.load_spike_score > 60.0 {
            out.push(format!(
                "📊 Large training load fluctuations detected (spike score {:.0}). Implement more gradual load progression.",
                input.load_spike_score
            ));
        }
    }

    fn sleep(input: &RecommendationInput, out: &mut Vec<String>) {
        let hours = input.avg_sleep_hours.unwrap_or(0.0);
        if input.sleep_modifier >= 1.4 {
            out.push(format!(
                "😴 Severe sleep deficit: averaging {:.1}h over the last week (<6h). Prioritise 8+ hours before high-intensity work.",
                hours
            ));
        } else if input.sleep_modifier >= 1.2 {
            out.push(format!(
                "😴 Sleep below recommended range: averaging {:.1}h (<7h). Target 7-9 hours per night.",
                hours
            ));
        } else if input.sleep_modifier > 1.0 {
            out.push(format!(
                "🛌 Averaging {:.1}h of sleep (>9h). Excess sleep can signal accumulated fatigue or illness; check in with the athlete.",
                hours
            ));
        }
    }

    fn stress(input: &RecommendationInput, out: &mut Vec<String>) {
        let stress = input.avg_stress.unwrap_or(0.0);
        if input.stress_modifier >= 1.3 {
            out.push(format!(
                "🧠 Very high stress levels (average {:.1}/10). Consider reduced load and referral for stress management support.",
                stress
            ));
        } else if input.stress_modifier > 1.0 {
            out.push(format!(
                "🧠 Elevated stress (average {:.1}/10). Monitor wellbeing and keep sessions controlled.",
                stress
            ));
        }
    }

    fn injury(input: &RecommendationInput, out: &mut Vec<String>) {
        if let Some(days) = input.days_since_injury {
            if input.injury_recency_modifier >= 1.5 {
                out.push(format!(
                    "🩹 Recent injury {} days ago: re-injury risk is highest in this period. Follow a graded return-to-play protocol.",
                    days
                ));
            } else if input.injury_recency_modifier > 1.0 {
                out.push(format!(
                    "🩹 Injury {} days ago. Maintain prehab work for the affected area while load returns to normal.",
                    days
                ));
            }
        }

        if input.injury_history_score > 40.0 {
            out.push(
                "🏥 Recent injury history concerning. Consider preventive strengthening and mobility work."
                    .to_string(),
            );
        }
    }

    fn age(input: &RecommendationInput, out: &mut Vec<String>) {
        if input.age_modifier >= 1.2 {
            let age = input.age.map(|a| a.to_string()).unwrap_or_else(|| "unknown".to_string());
            out.push(format!(
                "⏳ Age factor ({} years) extends tissue recovery. Allow extra recovery time between high-load sessions.",
                age
            ));
        }
    }

    fn recovery(input: &RecommendationInput, out: &mut Vec<String>) {
        if input.recovery_score < 40.0 {
            out.push(
                "🔧 Low recovery score. Increase recovery modalities: massage, ice baths, sleep optimization."
                    .to_string(),
            );
        } else if input.recovery_score < 60.0 {
            out.push(
                "💆 Moderate recovery needed. Add 1-2 additional recovery sessions this week."
                    .to_string(),
            );
        }
    }

    fn lifestyle(input: &RecommendationInput, out: &mut Vec<String>) {
        if input.lifestyle_score < 50.0 {
            out.push(
                "😴 Poor lifestyle metrics. Focus on: 8+ hours sleep, proper nutrition, stress management."
                    .to_string(),
            );
        } else if input.lifestyle_score < 70.0 {
            out.push(
                "🌟 Lifestyle factors need attention. Review sleep quality and nutrition habits."
                    .to_string(),
            );
        }
    }
}
