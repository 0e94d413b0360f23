//! SM-2 variant spaced repetition algorithm.
//!
//! Based on SuperMemo 2 with mastery and response-time bookkeeping folded
//! into the scheduling state.

use chrono::{DateTime, Duration, Utc};

use super::{SchedulingAlgorithm, SchedulingResult};
use crate::types::{Rating, SchedulingState};

/// SM-2 variant with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2Variant {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub graduating_interval: u32,
    pub second_interval: u32,
    pub mastery_gain: u8,
    pub mastery_penalty: u8,
}

impl Default for Sm2Variant {
    fn default() -> Self {
        Self {
            initial_ease: 2.5,
            minimum_ease: 1.3,
            graduating_interval: 1,
            second_interval: 6,
            mastery_gain: 5,
            mastery_penalty: 10,
        }
    }
}

impl SchedulingAlgorithm for Sm2Variant {
    fn name(&self) -> &'static str {
        "sm2-variant"
    }

    fn initial_state(&self, now: DateTime<Utc>) -> SchedulingState {
        SchedulingState {
            ease_factor: self.initial_ease,
            ..SchedulingState::new(now)
        }
    }

    fn schedule(
        &self,
        state: &SchedulingState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> SchedulingResult {
        let correct = rating.is_correct();

        // Interval ladder uses the ease factor as it was before this
        // review; the ease update below never feeds back into it.
        let (new_interval, new_repetitions) = if correct {
            let interval = match state.repetitions {
                0 => self.graduating_interval,
                1 => self.second_interval,
                _ => (f64::from(state.interval_days) * state.ease_factor).round() as u32,
            };
            (interval, state.repetitions + 1)
        } else {
            (1, 0)
        };

        let new_ease = self.adjust_ease(state.ease_factor, rating);
        let next_due = now + Duration::days(i64::from(new_interval));

        let new_mastery = if correct {
            state.mastery_level.saturating_add(self.mastery_gain).min(100)
        } else {
            state.mastery_level.saturating_sub(self.mastery_penalty)
        };

        SchedulingResult {
            new_state: SchedulingState {
                ease_factor: new_ease,
                interval_days: new_interval,
                repetitions: new_repetitions,
                next_review_date: next_due,
                last_review_date: Some(now),
                total_reviews: state.total_reviews + 1,
                correct_reviews: state.correct_reviews + u32::from(correct),
                mastery_level: new_mastery,
                average_response_time_ms: state.average_response_time_ms,
            },
            next_due,
        }
    }
}

impl Sm2Variant {
    /// Standard SM-2 ease update, applied on both the success and the
    /// failure branch, clamped to the minimum.
    fn adjust_ease(&self, ease: f64, rating: Rating) -> f64 {
        let q = f64::from(rating.to_value());
        let adjusted = ease + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
        adjusted.max(self.minimum_ease)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn reviewed_state(repetitions: u32, interval_days: u32, ease_factor: f64) -> SchedulingState {
        SchedulingState {
            ease_factor,
            interval_days,
            repetitions,
            mastery_level: 50,
            total_reviews: repetitions,
            correct_reviews: repetitions,
            ..SchedulingState::new(now())
        }
    }

    #[test]
    fn first_review_success_gets_one_day() {
        let sm2 = Sm2Variant::default();
        let state = sm2.initial_state(now());
        let result = sm2.schedule(&state, Rating::Easy, now());
        assert_eq!(result.new_state.interval_days, 1);
        assert_eq!(result.new_state.repetitions, 1);
        assert_eq!(result.new_state.mastery_level, 5);
    }

    #[test]
    fn second_success_gets_six_days_regardless_of_ease() {
        let sm2 = Sm2Variant::default();
        for ease in [1.3, 2.5, 3.2] {
            let state = reviewed_state(1, 1, ease);
            let result = sm2.schedule(&state, Rating::Perfect, now());
            assert_eq!(result.new_state.interval_days, 6);
            assert_eq!(result.new_state.repetitions, 2);
        }
    }

    #[test]
    fn mature_interval_grows_by_old_ease() {
        let sm2 = Sm2Variant::default();
        let state = reviewed_state(2, 6, 2.5);
        let result = sm2.schedule(&state, Rating::Good, now());
        assert_eq!(result.new_state.interval_days, 15);
        assert_eq!(result.new_state.repetitions, 3);
    }

    #[test]
    fn failure_resets_repetitions_and_interval() {
        let sm2 = Sm2Variant::default();
        let state = reviewed_state(3, 15, 2.5);
        let result = sm2.schedule(&state, Rating::Blackout, now());
        assert_eq!(result.new_state.repetitions, 0);
        assert_eq!(result.new_state.interval_days, 1);
        assert_eq!(result.new_state.mastery_level, 40);
        // 2.5 + (0.1 - 5 * (0.08 + 5 * 0.02)) = 1.7
        assert!((result.new_state.ease_factor - 1.7).abs() < 1e-9);
    }

    #[test]
    fn perfect_rating_raises_ease() {
        let sm2 = Sm2Variant::default();
        let state = reviewed_state(1, 1, 2.5);
        let result = sm2.schedule(&state, Rating::Perfect, now());
        assert!((result.new_state.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn good_rating_lowers_ease_slightly() {
        let sm2 = Sm2Variant::default();
        let state = reviewed_state(2, 6, 2.5);
        let result = sm2.schedule(&state, Rating::Good, now());
        // 2.5 + (0.1 - 2 * (0.08 + 2 * 0.02)) = 2.36
        assert!((result.new_state.ease_factor - 2.36).abs() < 1e-9);
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let sm2 = Sm2Variant::default();
        let mut state = sm2.initial_state(now());
        for _ in 0..50 {
            state = sm2.schedule(&state, Rating::Blackout, now()).new_state;
            assert!(state.ease_factor >= 1.3);
        }
    }

    #[test]
    fn mastery_stays_in_bounds() {
        let sm2 = Sm2Variant::default();
        let mut state = sm2.initial_state(now());
        for _ in 0..30 {
            state = sm2.schedule(&state, Rating::Perfect, now()).new_state;
        }
        assert_eq!(state.mastery_level, 100);
        for _ in 0..30 {
            state = sm2.schedule(&state, Rating::Blackout, now()).new_state;
        }
        assert_eq!(state.mastery_level, 0);
    }

    #[test]
    fn counters_are_monotonic() {
        let sm2 = Sm2Variant::default();
        let mut state = sm2.initial_state(now());
        for (i, rating) in [Rating::Good, Rating::Blackout, Rating::Easy].iter().enumerate() {
            state = sm2.schedule(&state, *rating, now()).new_state;
            assert_eq!(state.total_reviews, i as u32 + 1);
        }
        assert_eq!(state.correct_reviews, 2);
    }

    #[test]
    fn next_due_matches_interval() {
        let sm2 = Sm2Variant::default();
        let at = now();
        let state = reviewed_state(2, 6, 2.5);
        let result = sm2.schedule(&state, Rating::Good, at);
        assert_eq!(result.next_due, at + Duration::days(15));
        assert_eq!(result.new_state.next_review_date, result.next_due);
        assert_eq!(result.new_state.last_review_date, Some(at));
    }
}
