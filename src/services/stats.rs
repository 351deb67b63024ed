//! Dashboard aggregates. Pure functions of the loaded learnings and topic
//! metadata.

use serde::Serialize;

use crate::services::models::{Learning, LearningStatus, Topic};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_topics: usize,
    pub completed_topics: usize,
    pub in_progress_topics: usize,
    pub not_started_topics: usize,
    pub total_hours_spent: u32,
    pub average_progress: u32,
}

/// Aggregate `learnings`. `None` for an empty collection, so callers keep
/// whatever they showed before.
pub fn compute_dashboard_stats(learnings: &[Learning], topics: &[Topic]) -> Option<DashboardStats> {
    if learnings.is_empty() {
        return None;
    }

    let count_status = |status: LearningStatus| learnings.iter().filter(|l| l.status == status).count();
    let total_progress: u32 = learnings.iter().map(|l| u32::from(l.progress)).sum();

    let total_hours_spent: u32 = learnings
        .iter()
        .filter_map(|l| {
            let topic = topics.iter().find(|t| t.id == l.topic_id)?;
            Some(round(f64::from(topic.estimated_hours) * f64::from(l.progress) / 100.0))
        })
        .sum();

    Some(DashboardStats {
        total_topics: learnings.len(),
        completed_topics: count_status(LearningStatus::Completed),
        in_progress_topics: count_status(LearningStatus::InProgress),
        not_started_topics: count_status(LearningStatus::NotStarted),
        total_hours_spent,
        average_progress: round(f64::from(total_progress) / learnings.len() as f64),
    })
}

/// A topic the user is working through, for the dashboard highlight list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicWithProgress {
    #[serde(flatten)]
    pub topic: Topic,
    pub progress: u8,
    pub status: LearningStatus,
    pub hours_remaining: u32,
}

/// In-progress topics, furthest along first, at most `limit`.
pub fn in_progress_topics(topics: &[Topic], learnings: &[Learning], limit: usize) -> Vec<TopicWithProgress> {
    let mut rows: Vec<TopicWithProgress> = topics
        .iter()
        .filter_map(|topic| {
            let learning = learnings.iter().find(|l| l.topic_id == topic.id)?;
            (learning.status == LearningStatus::InProgress).then(|| TopicWithProgress {
                topic: topic.clone(),
                progress: learning.progress,
                status: learning.status,
                hours_remaining: round(
                    f64::from(topic.estimated_hours) * (1.0 - f64::from(learning.progress) / 100.0),
                ),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.progress.cmp(&a.progress));
    rows.truncate(limit);
    rows
}

fn round(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
