//! Utility Scoring Engine
//!
//! Turns a pile of advertised actions into one committed choice. Each
//! candidate's (need, delta) pairs are scored through a nonlinear
//! attenuation curve that makes satisfying a nearly-empty need worth far
//! more than topping up a full one; the best few candidates then go
//! through a squared-weight random draw so the leader usually wins but
//! upsets stay possible.
//!
//! The whole module is pure apart from the injected random source.

use rand::rngs::SmallRng;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;

use crate::actions::{Action, Advertisement};
use crate::components::Need;

/// Only this many of the best-scored candidates survive into the random
/// draw. Bounding the pool keeps a long tail of low-value options from
/// winning by sheer volume.
pub const TOP_CHOICES: usize = 3;

/// Scale of the attenuation curve.
const ATTENUATION_SCALE: f64 = 5.0;

/// Stand-in divisor for a need level of exactly zero.
const ZERO_GUARD: f64 = 1e-6;

/// Errors from scoring configuration and degenerate inputs.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A choice was requested from an empty candidate set.
    #[error("cannot choose from an empty candidate set")]
    NoCandidates,
    /// Response-curve initialisation lists did not line up.
    #[error("response curve lists have mismatched lengths: {needs} needs, {functions} functions")]
    MismatchedLists { needs: usize, functions: usize },
    /// A need was ranked that has no registered response function.
    #[error("no response function registered for need {0:?}")]
    UnknownNeed(Need),
}

/// Response function applied to a raw need level before ranking.
pub type ResponseFn = fn(f64) -> f64;

/// Per-need response curves. All current species use the identity curve;
/// the table stays so species can skew their priorities later without
/// touching the scoring pipeline.
#[derive(Debug, Clone, Default)]
pub struct ResponseCurves {
    functions: HashMap<Need, ResponseFn>,
}

impl ResponseCurves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity curves for every stored need plus health.
    pub fn identity() -> Self {
        let mut curves = Self::new();
        curves.add_response(Need::Health, |x| x);
        for need in Need::STORED {
            curves.add_response(need, |x| x);
        }
        curves
    }

    /// Builds curves from parallel lists, rejecting mismatched lengths.
    pub fn from_lists(needs: Vec<Need>, functions: Vec<ResponseFn>) -> Result<Self, ScoringError> {
        if needs.len() != functions.len() {
            return Err(ScoringError::MismatchedLists {
                needs: needs.len(),
                functions: functions.len(),
            });
        }
        let mut curves = Self::new();
        for (need, function) in needs.into_iter().zip(functions) {
            curves.add_response(need, function);
        }
        Ok(curves)
    }

    /// Registers a response function. The first registration for a need
    /// wins; later ones are ignored.
    pub fn add_response(&mut self, need: Need, function: ResponseFn) {
        self.functions.entry(need).or_insert(function);
    }

    /// Needs ordered by descending response value. A need without a
    /// registered function is an error rather than a silent skip.
    pub fn ranked_needs(&self, levels: &[(Need, f64)]) -> Result<Vec<Need>, ScoringError> {
        let mut pairs = Vec::with_capacity(levels.len());
        for (need, level) in levels {
            let function = self
                .functions
                .get(need)
                .ok_or(ScoringError::UnknownNeed(*need))?;
            pairs.push((*need, function(*level)));
        }
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(pairs.into_iter().map(|(need, _)| need).collect())
    }
}

/// The attenuation curve: huge value near zero, near-nothing when the
/// need is already met.
pub fn attenuate(level: f64) -> f64 {
    let divisor = if level == 0.0 { ZERO_GUARD } else { level };
    ATTENUATION_SCALE / divisor
}

/// Marginal utility of applying `delta` to a need currently at `level`:
/// the drop in attenuated pressure between now and after.
fn attenuated_gain(level: f64, delta: f64) -> f64 {
    attenuate(level) - attenuate(level + delta)
}

/// Squares every weight and renormalises so the results sum to 1.
/// Squaring amplifies the lead of the best option while still leaving the
/// rest a real chance.
pub fn weight_choices<T>(options: Vec<(T, f64)>) -> Vec<(T, f64)> {
    let total: f64 = options.iter().map(|(_, w)| w * w).sum();
    options
        .into_iter()
        .map(|(value, w)| (value, w * w / total))
        .collect()
}

/// Builds the cumulative threshold array for a normalised weight list.
/// The final bucket is forced to exactly 1.0 so floating-point dust can
/// never leave the draw without a winner.
pub fn cumulative_thresholds(weights: &[f64]) -> Vec<f64> {
    let mut thresholds = Vec::with_capacity(weights.len());
    let mut running = 0.0;
    for w in weights {
        running += w;
        thresholds.push(running);
    }
    if let Some(last) = thresholds.last_mut() {
        *last = 1.0;
    }
    thresholds
}

/// Draws one option, weighted by squared share. Zero and negative weights
/// are deliberately not filtered out; a worthless candidate keeps its
/// sliver of probability.
pub fn weighted_random_choice<T>(
    rng: &mut SmallRng,
    options: Vec<(T, f64)>,
) -> Result<T, ScoringError> {
    if options.is_empty() {
        return Err(ScoringError::NoCandidates);
    }

    let mut options = weight_choices(options);
    let roll: f64 = rng.gen();

    let weights: Vec<f64> = options.iter().map(|(_, w)| *w).collect();
    let thresholds = cumulative_thresholds(&weights);

    // The forced final threshold means the scan can only miss when the
    // weights degenerated to NaN; the last option is the fallback either
    // way.
    let index = thresholds
        .iter()
        .position(|threshold| roll <= *threshold)
        .unwrap_or(thresholds.len() - 1);

    Ok(options.swap_remove(index).0)
}

/// The scoring engine for one species.
#[derive(Debug, Clone)]
pub struct UtilityScorer {
    curves: ResponseCurves,
}

impl UtilityScorer {
    pub fn new(curves: ResponseCurves) -> Self {
        Self { curves }
    }

    pub fn curves(&self) -> &ResponseCurves {
        &self.curves
    }

    /// Scores one advertisement against the agent's current need levels.
    pub fn score(&self, need_value: &dyn Fn(Need) -> f64, ad: &Advertisement) -> f64 {
        ad.deltas
            .iter()
            .map(|(need, delta)| attenuated_gain(need_value(*need), *delta))
            .sum()
    }

    /// Picks one advertisement from the candidates: score, keep the top
    /// few, then draw by squared weight. Candidates with zero or negative
    /// scores are kept on purpose. The winner comes back whole so the
    /// promised deltas travel with the chosen action.
    pub fn choose(
        &self,
        rng: &mut SmallRng,
        need_value: &dyn Fn(Need) -> f64,
        candidates: Vec<Advertisement>,
    ) -> Result<Advertisement, ScoringError> {
        if candidates.is_empty() {
            return Err(ScoringError::NoCandidates);
        }

        let mut weighted: Vec<(Advertisement, f64)> = candidates
            .into_iter()
            .map(|ad| {
                let weight = self.score(need_value, &ad);
                (ad, weight)
            })
            .collect();

        weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        weighted.truncate(TOP_CHOICES);

        weighted_random_choice(rng, weighted)
    }

    /// Like [`UtilityScorer::choose`], returning only the action.
    pub fn choose_action(
        &self,
        rng: &mut SmallRng,
        need_value: &dyn Fn(Need) -> f64,
        candidates: Vec<Advertisement>,
    ) -> Result<Action, ScoringError> {
        self.choose(rng, need_value, candidates).map(|ad| ad.action)
    }
}

impl Default for UtilityScorer {
    fn default() -> Self {
        Self::new(ResponseCurves::identity())
    }
}
