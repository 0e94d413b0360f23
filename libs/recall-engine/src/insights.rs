//! Rule-based study insights.
//!
//! Each rule is an independent pure function over a precomputed
//! `InsightData` aggregate. Rules run in a fixed order, non-matches are
//! dropped, and the survivors are stably sorted by priority.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use recall_core::types::ReviewEvent;

/// Insight priority; `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One human-readable observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub priority: Priority,
    pub kind: &'static str,
    pub message: String,
}

/// Simple correct/total tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub correct: usize,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    fn percent(&self) -> u32 {
        (self.accuracy() * 100.0).round() as u32
    }
}

/// Aggregates the rules read. Computed once per insight pass.
#[derive(Debug, Clone, Default)]
pub struct InsightData {
    pub streak_days: u32,
    pub overall: Tally,
    pub by_topic: HashMap<String, Tally>,
    pub by_hour: HashMap<u32, Tally>,
    pub new_cards_this_week: usize,
    pub new_cards_last_week: usize,
}

impl InsightData {
    pub fn from_history(events: &[ReviewEvent], streak_days: u32, now: DateTime<Utc>) -> Self {
        let mut data = Self {
            streak_days,
            ..Self::default()
        };

        for event in events {
            let correct = event.rating.is_correct();
            data.overall.record(correct);
            if let Some(topic) = &event.topic {
                data.by_topic.entry(topic.clone()).or_default().record(correct);
            }
            data.by_hour
                .entry(event.reviewed_at.hour())
                .or_default()
                .record(correct);
        }

        // First-seen timestamps give the new-card velocity.
        let mut ordered: Vec<&ReviewEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.reviewed_at);
        let mut seen = std::collections::HashSet::new();
        let week_ago = now - Duration::days(7);
        let two_weeks_ago = now - Duration::days(14);
        for event in ordered {
            if !seen.insert(event.card_id) {
                continue;
            }
            if event.reviewed_at > week_ago {
                data.new_cards_this_week += 1;
            } else if event.reviewed_at > two_weeks_ago {
                data.new_cards_last_week += 1;
            }
        }
        data
    }
}

/// Minimum reviews a topic or an hour needs before the rules will judge it.
const MIN_SAMPLE: usize = 5;
/// Minimum reviews before overall accuracy is judged.
const MIN_OVERALL_SAMPLE: usize = 20;

type Rule = fn(&InsightData) -> Option<Insight>;

const RULES: [Rule; 7] = [
    streak_milestone,
    overall_accuracy,
    weakest_topic,
    strongest_topic,
    best_hour,
    review_milestone,
    new_card_velocity,
];

/// Run every rule and return the matches, sorted by priority.
pub fn generate(data: &InsightData) -> Vec<Insight> {
    let mut insights: Vec<Insight> = RULES.iter().filter_map(|rule| rule(data)).collect();
    insights.sort_by_key(|i| i.priority);
    insights
}

fn streak_milestone(data: &InsightData) -> Option<Insight> {
    let (priority, message) = match data.streak_days {
        d if d >= 30 => (
            Priority::High,
            format!("{d}-day streak: a full month of daily study."),
        ),
        d if d >= 7 => (
            Priority::Medium,
            format!("{d} days in a row. Keep the streak going."),
        ),
        d if d >= 3 => (Priority::Low, format!("{d}-day streak started.")),
        _ => return None,
    };
    Some(Insight {
        priority,
        kind: "streak",
        message,
    })
}

fn overall_accuracy(data: &InsightData) -> Option<Insight> {
    if data.overall.total < MIN_OVERALL_SAMPLE {
        return None;
    }
    let accuracy = data.overall.accuracy();
    if accuracy < 0.6 {
        Some(Insight {
            priority: Priority::High,
            kind: "accuracy",
            message: format!(
                "Accuracy is {}%. Shorter, more frequent sessions may help.",
                data.overall.percent()
            ),
        })
    } else if accuracy >= 0.9 {
        Some(Insight {
            priority: Priority::Medium,
            kind: "accuracy",
            message: format!("Excellent recall: {}% correct overall.", data.overall.percent()),
        })
    } else {
        None
    }
}

fn weakest_topic(data: &InsightData) -> Option<Insight> {
    let (topic, tally) = topic_extreme(data, false)?;
    if tally.accuracy() >= 0.75 {
        return None;
    }
    Some(Insight {
        priority: Priority::High,
        kind: "weak_topic",
        message: format!(
            "{topic} is your weakest topic at {}% correct. Worth extra reviews.",
            tally.percent()
        ),
    })
}

fn strongest_topic(data: &InsightData) -> Option<Insight> {
    let (topic, tally) = topic_extreme(data, true)?;
    if tally.accuracy() < 0.85 {
        return None;
    }
    Some(Insight {
        priority: Priority::Low,
        kind: "strong_topic",
        message: format!("{topic} is going well: {}% correct.", tally.percent()),
    })
}

/// Lowest- or highest-accuracy topic among those with enough reviews.
/// Ties break on the topic name so the output is order-stable.
fn topic_extreme(data: &InsightData, highest: bool) -> Option<(String, Tally)> {
    let mut candidates: Vec<(&String, &Tally)> = data
        .by_topic
        .iter()
        .filter(|(_, tally)| tally.total >= MIN_SAMPLE)
        .collect();
    candidates.sort_by(|(name_a, a), (name_b, b)| {
        a.accuracy()
            .partial_cmp(&b.accuracy())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| name_a.cmp(name_b))
    });
    let pick = if highest {
        candidates.last()
    } else {
        candidates.first()
    };
    pick.map(|(name, tally)| ((*name).clone(), **tally))
}

fn best_hour(data: &InsightData) -> Option<Insight> {
    let (hour, tally) = data
        .by_hour
        .iter()
        .filter(|(_, tally)| tally.total >= MIN_SAMPLE)
        .max_by(|(hour_a, a), (hour_b, b)| {
            a.accuracy()
                .partial_cmp(&b.accuracy())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| hour_b.cmp(hour_a))
        })?;
    Some(Insight {
        priority: Priority::Medium,
        kind: "best_hour",
        message: format!(
            "You recall best around {hour:02}:00 ({}% correct).",
            tally.percent()
        ),
    })
}

fn review_milestone(data: &InsightData) -> Option<Insight> {
    let milestone = [1000, 500, 100]
        .into_iter()
        .find(|m| data.overall.total >= *m)?;
    Some(Insight {
        priority: Priority::Low,
        kind: "milestone",
        message: format!("Over {milestone} reviews logged."),
    })
}

fn new_card_velocity(data: &InsightData) -> Option<Insight> {
    if data.new_cards_this_week == 0 && data.new_cards_last_week == 0 {
        return None;
    }
    let message = if data.new_cards_this_week >= data.new_cards_last_week {
        format!(
            "{} new cards started this week, up from {} last week.",
            data.new_cards_this_week, data.new_cards_last_week
        )
    } else {
        format!(
            "{} new cards started this week, down from {} last week.",
            data.new_cards_this_week, data.new_cards_last_week
        )
    };
    Some(Insight {
        priority: Priority::Medium,
        kind: "velocity",
        message,
    })
}
