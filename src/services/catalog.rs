//! Learning data backend.
//!
//! [`LearningBackend`] is what the orchestration layer dispatches to.
//! [`MockLearningBackend`] serves seeded data after a fixed artificial
//! delay; its loads never fail.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::CatalogError;
use crate::services::models::{
    Difficulty, Learning, LearningStatus, NewTimelineEvent, TimelineEvent, TimelineEventType, Topic,
};

#[async_trait]
pub trait LearningBackend: Send + Sync {
    async fn fetch_topics(&self) -> Vec<Topic>;

    async fn fetch_learnings(&self, user_id: &str) -> Vec<Learning>;

    async fn fetch_timeline(&self, user_id: &str) -> Vec<TimelineEvent>;

    async fn update_progress(&self, learning_id: &str, progress: u8) -> Result<Learning, CatalogError>;

    async fn add_timeline_event(&self, event: NewTimelineEvent) -> TimelineEvent;
}

pub struct MockLearningBackend {
    topics: Vec<Topic>,
    learnings: DashMap<String, Learning>,
    added_events: RwLock<Vec<TimelineEvent>>,
    load_delay: Duration,
    update_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl MockLearningBackend {
    /// Seeded backend with the default 800 ms load / 500 ms update delays.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_data(SEED_TOPICS.clone(), SEED_LEARNINGS.clone(), clock)
    }

    pub fn with_data(topics: Vec<Topic>, learnings: Vec<Learning>, clock: Arc<dyn Clock>) -> Self {
        Self {
            topics,
            learnings: learnings.into_iter().map(|l| (l.id.clone(), l)).collect(),
            added_events: RwLock::new(Vec::new()),
            load_delay: Duration::from_millis(800),
            update_delay: Duration::from_millis(500),
            clock,
        }
    }

    pub fn with_delays(mut self, load_delay: Duration, update_delay: Duration) -> Self {
        self.load_delay = load_delay;
        self.update_delay = update_delay;
        self
    }

    fn learnings_for(&self, user_id: &str) -> Vec<Learning> {
        let mut learnings: Vec<Learning> = self
            .learnings
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.value().clone())
            .collect();
        learnings.sort_by(|a, b| a.id.cmp(&b.id));
        learnings
    }
}

#[async_trait]
impl LearningBackend for MockLearningBackend {
    async fn fetch_topics(&self) -> Vec<Topic> {
        tokio::time::sleep(self.load_delay).await;
        self.topics.clone()
    }

    async fn fetch_learnings(&self, user_id: &str) -> Vec<Learning> {
        tokio::time::sleep(self.load_delay).await;
        self.learnings_for(user_id)
    }

    async fn fetch_timeline(&self, user_id: &str) -> Vec<TimelineEvent> {
        tokio::time::sleep(self.load_delay).await;
        let mut events = derive_timeline(&self.learnings_for(user_id), &self.topics);
        events.extend(
            self.added_events
                .read()
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned(),
        );
        sort_newest_first(&mut events);
        events
    }

    async fn update_progress(&self, learning_id: &str, progress: u8) -> Result<Learning, CatalogError> {
        if !self.learnings.contains_key(learning_id) {
            return Err(CatalogError::LearningNotFound(learning_id.to_string()));
        }
        if progress > 100 {
            return Err(CatalogError::InvalidProgress(progress.into()));
        }

        tokio::time::sleep(self.update_delay).await;

        let now = self.clock.now();
        let mut entry = self
            .learnings
            .get_mut(learning_id)
            .ok_or_else(|| CatalogError::LearningNotFound(learning_id.to_string()))?;
        let learning = entry.value_mut();
        learning.progress = progress;
        learning.status = LearningStatus::from_progress(progress);
        learning.last_accessed = now;
        learning.completion_date = (learning.status == LearningStatus::Completed).then_some(now);
        Ok(learning.clone())
    }

    async fn add_timeline_event(&self, event: NewTimelineEvent) -> TimelineEvent {
        tokio::time::sleep(self.update_delay).await;
        let event = TimelineEvent {
            id: format!("event-{}", Uuid::new_v4()),
            user_id: event.user_id,
            topic_id: event.topic_id,
            event_type: event.event_type,
            event_date: self.clock.now(),
            details: event.details,
        };
        self.added_events.write().push(event.clone());
        event
    }
}

/// Timeline events implied by a user's learnings, newest first.
///
/// In-progress learnings at 50% or more produce a milestone; completed
/// learnings with a completion date produce a completion event.
pub fn derive_timeline(learnings: &[Learning], topics: &[Topic]) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    for learning in learnings {
        let title = topics
            .iter()
            .find(|t| t.id == learning.topic_id)
            .map(|t| t.title.as_str())
            .unwrap_or("topic");

        if learning.status == LearningStatus::InProgress && learning.progress >= 50 {
            events.push(TimelineEvent {
                id: format!("milestone-{}", learning.id),
                user_id: learning.user_id.clone(),
                topic_id: learning.topic_id.clone(),
                event_type: TimelineEventType::Milestone,
                event_date: learning.last_accessed,
                details: Some(format!("Reached {}% completion in {}", learning.progress, title)),
            });
        }

        if let (LearningStatus::Completed, Some(completed_at)) = (learning.status, learning.completion_date) {
            let details = match learning.notes.as_deref() {
                Some(notes) if !notes.is_empty() => format!("Completed {title} - {notes}"),
                _ => format!("Completed {title}"),
            };
            events.push(TimelineEvent {
                id: format!("complete-{}", learning.id),
                user_id: learning.user_id.clone(),
                topic_id: learning.topic_id.clone(),
                event_type: TimelineEventType::Completed,
                event_date: completed_at,
                details: Some(details),
            });
        }
    }
    sort_newest_first(&mut events);
    events
}

fn sort_newest_first(events: &mut [TimelineEvent]) {
    events.sort_by(|a, b| b.event_date.cmp(&a.event_date));
}

/// Case-insensitive match on title, description or any tag. An empty term
/// matches everything.
pub fn filter_topics(topics: &[Topic], term: &str) -> Vec<Topic> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return topics.to_vec();
    }
    topics
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.description.to_lowercase().contains(&needle)
                || t.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

// ============================================================================
// SEED DATA
// ============================================================================

/// 2024-01-01T00:00:00Z plus `n` days.
fn day(n: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_067_200 + n * 86_400, 0).unwrap_or_default()
}

fn topic(id: &str, title: &str, description: &str, category: &str, difficulty: Difficulty, hours: u32, tags: &[&str]) -> Topic {
    Topic {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        difficulty,
        estimated_hours: hours,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image_url: None,
        created_at: day(0),
        updated_at: day(0),
    }
}

fn learning(id: &str, user_id: &str, topic_id: &str, progress: u8, last_accessed: i64, notes: Option<&str>) -> Learning {
    let status = LearningStatus::from_progress(progress);
    Learning {
        id: id.to_string(),
        user_id: user_id.to_string(),
        topic_id: topic_id.to_string(),
        progress,
        status,
        start_date: day(5),
        completion_date: (status == LearningStatus::Completed).then(|| day(last_accessed)),
        notes: notes.map(str::to_string),
        last_accessed: day(last_accessed),
    }
}

pub static SEED_TOPICS: Lazy<Vec<Topic>> = Lazy::new(|| {
    vec![
        topic("t1", "Rust Fundamentals", "Ownership, borrowing and the type system", "Programming", Difficulty::Beginner, 20, &["rust", "systems"]),
        topic("t2", "Async Programming with Tokio", "Futures, tasks and async I/O", "Programming", Difficulty::Intermediate, 15, &["rust", "async", "tokio"]),
        topic("t3", "Distributed Systems Design", "Consensus, replication and partitioning", "Architecture", Difficulty::Advanced, 30, &["architecture", "scalability"]),
        topic("t4", "UX Research Basics", "Interviews, usability tests and personas", "Design", Difficulty::Beginner, 10, &["ux", "research"]),
        topic("t5", "Data Visualization", "Charts that tell the truth", "Data", Difficulty::Intermediate, 12, &["charts", "analytics"]),
        topic("t6", "Leadership Essentials", "Feedback, delegation and one-on-ones", "Management", Difficulty::Beginner, 8, &["leadership", "people"]),
    ]
});

pub static SEED_LEARNINGS: Lazy<Vec<Learning>> = Lazy::new(|| {
    vec![
        learning("l1", "3", "t1", 100, 20, Some("Great introduction")),
        learning("l2", "3", "t2", 60, 40, None),
        learning("l3", "3", "t3", 20, 35, None),
        learning("l4", "3", "t5", 0, 5, None),
        learning("l5", "4", "t1", 45, 30, None),
        learning("l6", "4", "t4", 100, 25, None),
        learning("l7", "5", "t4", 75, 33, None),
        learning("l8", "2", "t6", 100, 18, None),
        learning("l9", "6", "t3", 50, 28, None),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn backend() -> (Arc<ManualClock>, MockLearningBackend) {
        let clock = Arc::new(ManualClock::new(day(60)));
        let backend = MockLearningBackend::new(clock.clone()).with_delays(Duration::ZERO, Duration::ZERO);
        (clock, backend)
    }

    #[tokio::test]
    async fn test_fetch_learnings_is_per_user() {
        let (_, backend) = backend();
        let learnings = backend.fetch_learnings("3").await;
        assert_eq!(learnings.len(), 4);
        assert!(learnings.iter().all(|l| l.user_id == "3"));
        assert!(backend.fetch_learnings("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_timeline_for_seed_user() {
        let (_, backend) = backend();
        let events = backend.fetch_timeline("3").await;

        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        // l2 milestone (day 40) before l1 completion (day 20); l3 is under 50%
        assert_eq!(ids, vec!["milestone-l2", "complete-l1"]);
        assert_eq!(
            events[1].details.as_deref(),
            Some("Completed Rust Fundamentals - Great introduction")
        );
        assert_eq!(
            events[0].details.as_deref(),
            Some("Reached 60% completion in Async Programming with Tokio")
        );
    }

    #[test]
    fn test_derive_timeline_unknown_topic() {
        let learnings = vec![learning("x", "u", "missing", 100, 1, None)];
        let events = derive_timeline(&learnings, &[]);
        assert_eq!(events[0].details.as_deref(), Some("Completed topic"));
    }

    #[tokio::test]
    async fn test_update_progress_sets_status() {
        let (clock, backend) = backend();
        let updated = backend.update_progress("l5", 100).await.unwrap();
        assert_eq!(updated.status, LearningStatus::Completed);
        assert_eq!(updated.completion_date, Some(clock.now()));

        let reset = backend.update_progress("l5", 0).await.unwrap();
        assert_eq!(reset.status, LearningStatus::NotStarted);
        assert_eq!(reset.completion_date, None);

        assert_eq!(
            backend.update_progress("nope", 10).await,
            Err(CatalogError::LearningNotFound("nope".to_string()))
        );
        assert_eq!(
            backend.update_progress("l5", 101).await,
            Err(CatalogError::InvalidProgress(101))
        );
    }

    #[tokio::test]
    async fn test_added_events_join_the_timeline() {
        let (clock, backend) = backend();
        let added = backend
            .add_timeline_event(NewTimelineEvent {
                user_id: "3".to_string(),
                topic_id: "t3".to_string(),
                event_type: TimelineEventType::Started,
                details: None,
            })
            .await;
        assert!(added.id.starts_with("event-"));
        assert_eq!(added.event_date, clock.now());

        let events = backend.fetch_timeline("3").await;
        assert_eq!(events[0].id, added.id);
    }

    #[test]
    fn test_filter_topics() {
        let topics = SEED_TOPICS.clone();
        assert_eq!(filter_topics(&topics, "").len(), topics.len());
        let tokio: Vec<_> = filter_topics(&topics, "TOKIO").into_iter().map(|t| t.id).collect();
        assert_eq!(tokio, vec!["t2"]);
        let rust: Vec<_> = filter_topics(&topics, "rust").into_iter().map(|t| t.id).collect();
        assert_eq!(rust, vec!["t1", "t2"]);
        assert!(filter_topics(&topics, "cobol").is_empty());
    }
}
