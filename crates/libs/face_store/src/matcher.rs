use crate::StoreSnapshot;
use app_state::MatchSettings;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Result of matching one probe embedding against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    NoMatch,
    Confident {
        name: String,
        distance: f32,
    },
    /// The best candidates are too close together to trust automatically;
    /// a human has to decide. Candidates are ordered best first, at most three.
    Ambiguous {
        candidates: Vec<(String, f32)>,
        best_distance: f32,
    },
}

/// Calculates the L2 (Euclidean) distance between two equal-length vectors.
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Matches a probe embedding against a store snapshot.
///
/// Samples dated more than the configured age window away from `target_date`
/// are skipped. Each person is scored by their single closest sample; people
/// past the distance threshold drop out. A lone survivor, or a winner whose
/// runner-up gap exceeds `max(best * relative_margin, absolute_margin)`, is a
/// confident match; anything closer is ambiguous.
#[must_use]
pub fn match_face(
    snapshot: &StoreSnapshot,
    probe: &[f32],
    target_date: Option<NaiveDate>,
    settings: &MatchSettings,
) -> MatchOutcome {
    let max_age_days = settings.age_window_years * 365;

    let mut best_per_person: HashMap<&str, f32> = HashMap::new();
    for sample in snapshot.samples() {
        if let (Some(target), Some(sample_date)) = (target_date, sample.sample_date)
            && (target - sample_date).num_days().abs() > max_age_days
        {
            continue;
        }
        if sample.embedding.len() != probe.len() {
            continue;
        }
        let distance = l2_distance(probe, &sample.embedding);
        best_per_person
            .entry(sample.person_name.as_str())
            .and_modify(|d| *d = d.min(distance))
            .or_insert(distance);
    }

    let mut ranked: Vec<(String, f32)> = best_per_person
        .into_iter()
        .filter(|(_, distance)| *distance <= settings.threshold)
        .map(|(name, distance)| (name.to_string(), distance))
        .collect();
    if ranked.is_empty() {
        return MatchOutcome::NoMatch;
    }
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let best_distance = ranked[0].1;
    let margin = (best_distance * settings.ambiguity_relative_margin)
        .max(settings.ambiguity_absolute_margin);
    if ranked.len() == 1 || ranked[1].1 - best_distance > margin {
        let (name, distance) = ranked.swap_remove(0);
        return MatchOutcome::Confident { name, distance };
    }

    ranked.truncate(3);
    MatchOutcome::Ambiguous {
        candidates: ranked,
        best_distance,
    }
}
