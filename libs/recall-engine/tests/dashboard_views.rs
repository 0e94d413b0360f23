//! Aggregator read views over seeded stores.

mod common;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use common::{engine, seed_session, seed_state, submission};
use recall_engine::stats::{CompletionState, DEFAULT_DUE_LIMIT};

#[test]
fn card_stats_bucket_by_mastery_and_due_date() {
    let (store, _, aggregator) = engine();
    let learner = Uuid::new_v4();
    let now = Utc::now();

    seed_state(&store, learner, 1, now - Duration::hours(1), 90); // due, mastered
    seed_state(&store, learner, 2, now + Duration::days(2), 80); // mastered
    seed_state(&store, learner, 3, now - Duration::days(3), 40); // due, learning
    seed_state(&store, learner, 4, now + Duration::days(1), 79); // learning
    seed_state(&store, learner, 5, now + Duration::days(1), 39); // difficult

    let stats = aggregator.card_stats_at(learner, now);
    assert_eq!(stats.total_cards, 5);
    assert_eq!(stats.due_cards, 2);
    assert_eq!(stats.mastered, 2);
    assert_eq!(stats.learning, 2);
    assert_eq!(stats.difficult, 1);
}

#[test]
fn due_cards_are_most_overdue_first_and_capped() {
    let (store, _, aggregator) = engine();
    let learner = Uuid::new_v4();
    let now = Utc::now();

    for card in 0..30 {
        seed_state(&store, learner, card, now - Duration::hours(card as i64 + 1), 50);
    }

    let due = aggregator.due_cards_at(learner, None, now);
    assert_eq!(due.len(), DEFAULT_DUE_LIMIT);
    assert_eq!(due[0].card_id, 29);
    assert!(due.windows(2).all(|w| w[0].next_review_date <= w[1].next_review_date));

    let top3 = aggregator.due_cards_at(learner, Some(3), now);
    assert_eq!(top3.len(), 3);
    assert_eq!(top3[0].card_id, 29);
}

#[test]
fn upcoming_cards_group_by_calendar_day_within_a_week() {
    let (store, _, aggregator) = engine();
    let learner = Uuid::new_v4();
    // Fixed midday timestamp so the +5min offset stays on the same day.
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

    seed_state(&store, learner, 1, now - Duration::hours(1), 50); // already due, excluded
    seed_state(&store, learner, 2, now + Duration::days(1), 50);
    seed_state(&store, learner, 3, now + Duration::days(1) + Duration::minutes(5), 50);
    seed_state(&store, learner, 4, now + Duration::days(3), 50);
    seed_state(&store, learner, 5, now + Duration::days(8), 50); // beyond a week, excluded

    let upcoming = aggregator.upcoming_cards_at(learner, now);
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0].cards.len(), 2);
    assert_eq!(upcoming[1].cards.len(), 1);
    assert!(upcoming[0].date < upcoming[1].date);
}

#[test]
fn streak_requires_a_today_or_yesterday_anchor() {
    let (store, _, aggregator) = engine();
    let now = Utc::now();

    // Anchored today, three consecutive days.
    let anchored = Uuid::new_v4();
    for days_ago in [0, 1, 2] {
        seed_session(&store, anchored, now, days_ago);
    }
    assert_eq!(aggregator.streak_days_at(anchored, now), 3);

    // Anchored yesterday still counts.
    let yesterday = Uuid::new_v4();
    for days_ago in [1, 2] {
        seed_session(&store, yesterday, now, days_ago);
    }
    assert_eq!(aggregator.streak_days_at(yesterday, now), 2);

    // Most recent session two days ago: streak is gone.
    let stale = Uuid::new_v4();
    for days_ago in [2, 3, 4] {
        seed_session(&store, stale, now, days_ago);
    }
    assert_eq!(aggregator.streak_days_at(stale, now), 0);
}

#[test]
fn streak_breaks_on_the_first_gap_day() {
    let (store, _, aggregator) = engine();
    let learner = Uuid::new_v4();
    let now = Utc::now();

    // Sessions today, yesterday, then a gap, then more history.
    for days_ago in [0, 1, 3, 4, 5] {
        seed_session(&store, learner, now, days_ago);
    }
    assert_eq!(aggregator.streak_days_at(learner, now), 2);
}

#[test]
fn completion_state_priority_order() {
    let (store, scheduler, aggregator) = engine();
    let now = Utc::now();

    // No tracked items at all.
    let newcomer = Uuid::new_v4();
    assert_eq!(
        aggregator.completion_state_at(newcomer, now),
        CompletionState::NewUser
    );

    // A due card wins over everything else.
    let behind = Uuid::new_v4();
    seed_state(&store, behind, 1, now - Duration::hours(2), 50);
    assert_eq!(
        aggregator.completion_state_at(behind, now),
        CompletionState::HasDueCards
    );

    // Nothing due and a review logged today.
    let done = Uuid::new_v4();
    scheduler.submit_review_at(done, submission(1, 4), now).unwrap();
    assert_eq!(
        aggregator.completion_state_at(done, now),
        CompletionState::CompletedToday
    );

    // Nothing due, no review today.
    let idle = Uuid::new_v4();
    seed_state(&store, idle, 1, now + Duration::days(2), 50);
    assert_eq!(
        aggregator.completion_state_at(idle, now),
        CompletionState::NoCardsDue
    );
}

#[test]
fn insights_surface_weak_topics_before_milestones() {
    let (_, scheduler, aggregator) = engine();
    let learner = Uuid::new_v4();
    let now = Utc::now();

    // Five poor reviews of chemistry, five strong reviews of history.
    for card in 0..5 {
        let mut s = submission(card, 1);
        s.topic = Some("chemistry".to_string());
        scheduler.submit_review_at(learner, s, now).unwrap();
    }
    for card in 10..15 {
        let mut s = submission(card, 5);
        s.topic = Some("history".to_string());
        scheduler.submit_review_at(learner, s, now).unwrap();
    }

    let insights = aggregator.insights_at(learner, now);
    assert!(!insights.is_empty());
    let weak = insights
        .iter()
        .find(|i| i.kind == "weak_topic")
        .expect("weak topic insight");
    assert!(weak.message.contains("chemistry"));
    let strong_pos = insights.iter().position(|i| i.kind == "strong_topic");
    let weak_pos = insights.iter().position(|i| i.kind == "weak_topic").unwrap();
    if let Some(strong_pos) = strong_pos {
        assert!(weak_pos < strong_pos);
    }
}

#[test]
fn overall_accuracy_tracks_events() {
    let (_, scheduler, aggregator) = engine();
    let learner = Uuid::new_v4();
    let now = Utc::now();

    assert_eq!(aggregator.accuracy(learner), 0.0);

    for (card, rating) in [(1, 5), (2, 4), (3, 1), (4, 3)] {
        scheduler.submit_review_at(learner, submission(card, rating), now).unwrap();
    }
    assert_eq!(aggregator.accuracy(learner), 0.75);
}
