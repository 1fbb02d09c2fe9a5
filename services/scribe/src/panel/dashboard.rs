//! services/scribe/src/panel/dashboard.rs
//!
//! The options-page dashboard over a user's saved questions.

use scribe_core::{
    Difficulty, NewQuestion, PortResult, QuestionRecord, QuestionStore, QuestionUpdate,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Filter label that matches everything.
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Difficulty,
    Topic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuestionFilter {
    /// `None` or `"All"` keeps every topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// `None` or `"All"` keeps every difficulty.
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
}

impl QuestionFilter {
    fn matches(&self, question: &QuestionRecord) -> bool {
        let topic_match = match self.topic.as_deref() {
            None | Some(ALL) => true,
            Some(topic) => question.topics.iter().any(|t| t == topic),
        };
        let difficulty_match = match self.difficulty.as_deref() {
            None | Some(ALL) => true,
            Some(label) => question.difficulty.as_str() == label,
        };
        topic_match && difficulty_match
    }
}

fn first_topic(question: &QuestionRecord) -> &str {
    question.topics.first().map(String::as_str).unwrap_or_default()
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Filters, then sorts. The sort is stable.
pub fn filter_questions(
    questions: &[QuestionRecord],
    filter: &QuestionFilter,
) -> Vec<QuestionRecord> {
    let mut filtered: Vec<QuestionRecord> =
        questions.iter().filter(|q| filter.matches(q)).cloned().collect();
    match filter.sort {
        SortKey::Name => filtered.sort_by(|a, b| compare_text(&a.question_name, &b.question_name)),
        SortKey::Difficulty => filtered.sort_by_key(|q| q.difficulty),
        SortKey::Topic => filtered.sort_by(|a, b| compare_text(first_topic(a), first_topic(b))),
    }
    filtered
}

/// `All` plus every topic in use, unique and sorted.
pub fn topic_universe(questions: &[QuestionRecord]) -> Vec<String> {
    let mut topics: BTreeSet<String> = questions
        .iter()
        .flat_map(|q| q.topics.iter().cloned())
        .collect();
    topics.insert(ALL.to_string());
    topics.into_iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    Beginner,
    Intermediate,
    Expert,
}

impl Rank {
    pub fn for_total(total: usize) -> Self {
        if total > 100 {
            Rank::Expert
        } else if total > 50 {
            Rank::Intermediate
        } else {
            Rank::Beginner
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub total: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub rank: Rank,
}

impl ProfileStats {
    pub fn from_questions(questions: &[QuestionRecord]) -> Self {
        let count = |d: Difficulty| questions.iter().filter(|q| q.difficulty == d).count();
        Self {
            total: questions.len(),
            easy: count(Difficulty::Easy),
            medium: count(Difficulty::Medium),
            hard: count(Difficulty::Hard),
            rank: Rank::for_total(questions.len()),
        }
    }
}

#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn QuestionStore>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &QuestionFilter,
    ) -> PortResult<Vec<QuestionRecord>> {
        let questions = self.store.list_questions_for_user(user_id).await?;
        Ok(filter_questions(&questions, filter))
    }

    pub async fn stats(&self, user_id: Uuid) -> PortResult<(ProfileStats, Vec<String>)> {
        let questions = self.store.list_questions_for_user(user_id).await?;
        Ok((ProfileStats::from_questions(&questions), topic_universe(&questions)))
    }

    /// Stores a hand-written question for `user_id`, whatever owner the draft names.
    pub async fn create(
        &self,
        user_id: Uuid,
        mut question: NewQuestion,
    ) -> PortResult<QuestionRecord> {
        question.user_id = user_id;
        let record = self.store.insert_question(question).await?;
        info!("Question {} created.", record.id);
        Ok(record)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        question_id: i64,
        update: QuestionUpdate,
    ) -> PortResult<QuestionRecord> {
        let column = update.column();
        let record = self.store.update_question(question_id, user_id, update).await?;
        info!("Question {} field '{}' updated.", question_id, column);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryQuestionStore;
    use scribe_core::PortError;

    fn draft(name: &str, difficulty: Difficulty, topics: &[&str]) -> NewQuestion {
        NewQuestion {
            question_name: name.into(),
            description: String::new(),
            usercode: String::new(),
            solution: String::new(),
            difficulty,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            tips: vec![],
            note: String::new(),
            user_id: Uuid::nil(),
        }
    }

    async fn seeded(user_id: Uuid) -> Dashboard {
        let dashboard = Dashboard::new(Arc::new(MemoryQuestionStore::default()));
        for question in [
            draft("two sum", Difficulty::Easy, &["Hash Table", "Array"]),
            draft("Merge k Sorted Lists", Difficulty::Hard, &["Heap"]),
            draft("LRU Cache", Difficulty::Medium, &["Design", "Hash Table"]),
        ] {
            dashboard.create(user_id, question).await.unwrap();
        }
        dashboard
    }

    fn names(questions: &[QuestionRecord]) -> Vec<&str> {
        questions.iter().map(|q| q.question_name.as_str()).collect()
    }

    #[tokio::test]
    async fn default_filter_sorts_by_name_case_insensitively() {
        let user = Uuid::new_v4();
        let dashboard = seeded(user).await;
        let listed = dashboard.list(user, &QuestionFilter::default()).await.unwrap();
        assert_eq!(names(&listed), vec!["LRU Cache", "Merge k Sorted Lists", "two sum"]);
    }

    #[tokio::test]
    async fn topic_and_difficulty_filters_combine() {
        let user = Uuid::new_v4();
        let dashboard = seeded(user).await;
        let filter = QuestionFilter {
            topic: Some("Hash Table".into()),
            difficulty: Some("Medium".into()),
            sort: SortKey::Name,
        };
        assert_eq!(names(&dashboard.list(user, &filter).await.unwrap()), vec!["LRU Cache"]);

        let filter = QuestionFilter {
            topic: Some(ALL.into()),
            difficulty: Some(ALL.into()),
            sort: SortKey::Difficulty,
        };
        assert_eq!(
            names(&dashboard.list(user, &filter).await.unwrap()),
            vec!["two sum", "LRU Cache", "Merge k Sorted Lists"]
        );
    }

    #[tokio::test]
    async fn topic_sort_uses_first_topic() {
        let user = Uuid::new_v4();
        let dashboard = seeded(user).await;
        let filter = QuestionFilter {
            sort: SortKey::Topic,
            ..Default::default()
        };
        assert_eq!(
            names(&dashboard.list(user, &filter).await.unwrap()),
            vec!["LRU Cache", "two sum", "Merge k Sorted Lists"]
        );
    }

    #[tokio::test]
    async fn other_users_questions_are_invisible() {
        let user = Uuid::new_v4();
        let dashboard = seeded(user).await;
        let listed = dashboard
            .list(Uuid::new_v4(), &QuestionFilter::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn stats_count_difficulties_and_topics() {
        let user = Uuid::new_v4();
        let dashboard = seeded(user).await;
        let (stats, topics) = dashboard.stats(user).await.unwrap();
        assert_eq!(
            stats,
            ProfileStats {
                total: 3,
                easy: 1,
                medium: 1,
                hard: 1,
                rank: Rank::Beginner
            }
        );
        assert_eq!(topics, vec!["All", "Array", "Design", "Hash Table", "Heap"]);
    }

    #[test]
    fn rank_thresholds() {
        assert_eq!(Rank::for_total(50), Rank::Beginner);
        assert_eq!(Rank::for_total(51), Rank::Intermediate);
        assert_eq!(Rank::for_total(100), Rank::Intermediate);
        assert_eq!(Rank::for_total(101), Rank::Expert);
    }

    #[tokio::test]
    async fn update_changes_one_field_for_the_owner_only() {
        let user = Uuid::new_v4();
        let dashboard = seeded(user).await;
        let id = dashboard.list(user, &QuestionFilter::default()).await.unwrap()[0].id;

        let updated = dashboard
            .update(user, id, QuestionUpdate::Difficulty(Difficulty::Hard))
            .await
            .unwrap();
        assert_eq!(updated.difficulty, Difficulty::Hard);
        assert_eq!(updated.question_name, "LRU Cache");

        let err = dashboard
            .update(Uuid::new_v4(), id, QuestionUpdate::Note("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[test]
    fn filter_reads_query_parameters() {
        let filter: QuestionFilter =
            serde_json::from_value(serde_json::json!({"topic": "Heap", "sort": "difficulty"}))
                .unwrap();
        assert_eq!(filter.topic.as_deref(), Some("Heap"));
        assert_eq!(filter.difficulty, None);
        assert_eq!(filter.sort, SortKey::Difficulty);
    }
}
