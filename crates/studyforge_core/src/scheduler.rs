//! crates/studyforge_core/src/scheduler.rs
//!
//! SM-2-style spaced-repetition scheduling. A pure function over the
//! flashcard's review state: no I/O, no failure mode, deterministic.
//! The optional model-written rationale shown next to a review lives
//! entirely outside this module and never influences these fields.

use chrono::{DateTime, Days, Utc};

use crate::domain::{ReviewOutcome, ReviewState};

/// The easiness factor never drops below this floor.
pub const MIN_EASINESS: f64 = 1.3;

/// Computes the state after one review event.
///
/// `hard` resets the repetition streak to a one-day interval and makes
/// the card harder to grow (easiness down 0.2). `medium` and `easy`
/// advance the streak: intervals run 1 day, 6 days, then the previous
/// interval scaled by the updated easiness factor; `easy` additionally
/// raises the easiness factor by 0.1. Total over its input domain, and
/// not idempotent: each call advances the state again.
pub fn review(state: &ReviewState, outcome: ReviewOutcome, now: DateTime<Utc>) -> ReviewState {
    let (repetitions, interval_days, easiness_factor) = match outcome {
        ReviewOutcome::Hard => {
            let easiness = clamp_easiness(state.easiness_factor - 0.2);
            (0, 1, easiness)
        }
        ReviewOutcome::Medium | ReviewOutcome::Easy => {
            let bump = if outcome == ReviewOutcome::Easy { 0.1 } else { 0.0 };
            let easiness = clamp_easiness(state.easiness_factor + bump);
            let repetitions = state.repetitions + 1;
            let interval = match repetitions {
                1 => 1,
                2 => 6,
                _ => (state.interval_days as f64 * easiness).round() as u32,
            };
            (repetitions, interval, easiness)
        }
    };

    ReviewState {
        last_reviewed: Some(now),
        next_review_date: Some(
            (now + Days::new(u64::from(interval_days))).date_naive(),
        ),
        easiness_factor,
        repetitions,
        interval_days,
    }
}

fn clamp_easiness(easiness: f64) -> f64 {
    easiness.max(MIN_EASINESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(date: &str) -> DateTime<Utc> {
        format!("{date}T00:00:00Z").parse().unwrap()
    }

    fn day(date: &str) -> NaiveDate {
        date.parse().unwrap()
    }

    #[test]
    fn first_easy_review_of_a_fresh_card() {
        let next = review(&ReviewState::initial(), ReviewOutcome::Easy, at("2024-01-01"));
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.next_review_date, Some(day("2024-01-02")));
        assert!((next.easiness_factor - 2.6).abs() < 1e-9);
        assert_eq!(next.last_reviewed, Some(at("2024-01-01")));
    }

    #[test]
    fn second_review_medium_keeps_easiness_and_jumps_to_six_days() {
        let first = review(&ReviewState::initial(), ReviewOutcome::Easy, at("2024-01-01"));
        let second = review(&first, ReviewOutcome::Medium, at("2024-01-02"));
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.next_review_date, Some(day("2024-01-08")));
        assert!((second.easiness_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn third_review_scales_the_previous_interval_by_the_updated_easiness() {
        let first = review(&ReviewState::initial(), ReviewOutcome::Easy, at("2024-01-01"));
        let second = review(&first, ReviewOutcome::Medium, at("2024-01-02"));
        let third = review(&second, ReviewOutcome::Easy, at("2024-01-08"));
        assert_eq!(third.repetitions, 3);
        // round(6 × 2.7) = 16
        assert_eq!(third.interval_days, 16);
        assert_eq!(third.next_review_date, Some(day("2024-01-24")));
        assert!((third.easiness_factor - 2.7).abs() < 1e-9);
    }

    #[test]
    fn hard_resets_the_streak_and_lowers_easiness() {
        let mut state = ReviewState {
            last_reviewed: Some(at("2024-02-01")),
            next_review_date: Some(day("2024-02-17")),
            easiness_factor: 2.5,
            repetitions: 4,
            interval_days: 16,
        };
        state = review(&state, ReviewOutcome::Hard, at("2024-02-17"));
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.next_review_date, Some(day("2024-02-18")));
        assert!((state.easiness_factor - 2.3).abs() < 1e-9);
    }

    #[test]
    fn repeated_hard_outcomes_never_drop_easiness_below_the_floor() {
        let mut state = ReviewState::initial();
        let mut now = at("2024-03-01");
        for _ in 0..20 {
            state = review(&state, ReviewOutcome::Hard, now);
            assert_eq!(state.repetitions, 0);
            assert_eq!(state.interval_days, 1);
            assert!(state.easiness_factor >= MIN_EASINESS);
            now = now + Days::new(1);
        }
        assert!((state.easiness_factor - MIN_EASINESS).abs() < 1e-9);
    }

    #[test]
    fn next_review_date_never_precedes_the_review_itself() {
        let outcomes = [ReviewOutcome::Easy, ReviewOutcome::Medium, ReviewOutcome::Hard];
        let mut state = ReviewState::initial();
        let mut now = at("2024-04-01");
        for outcome in outcomes.iter().cycle().take(12) {
            state = review(&state, *outcome, now);
            let reviewed = state.last_reviewed.unwrap();
            assert_eq!(reviewed, now);
            assert!(state.next_review_date.unwrap() >= reviewed.date_naive());
            now = now + Days::new(u64::from(state.interval_days));
        }
    }

    #[test]
    fn review_is_not_idempotent() {
        let once = review(&ReviewState::initial(), ReviewOutcome::Easy, at("2024-01-01"));
        let twice = review(&once, ReviewOutcome::Easy, at("2024-01-01"));
        assert_ne!(once.repetitions, twice.repetitions);
    }
}
