//! Regrade status models.
//!
//! The backend computes regrade status per topic, optionally scoped to one
//! question and/or one student. A non-null `retroStartedTime` means a regrade
//! job is running and must be polled; `regradeCount` is a server-side
//! monotonic counter that increments whenever a regrade-worthy edit occurs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-computed regrade status for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRegradeInfo {
    /// Non-null while a regrade job is running.
    pub retro_started_time: Option<DateTime<Utc>>,
    /// Incremented server-side on each regrade-worthy edit. An increase
    /// between two fetches means new edits happened since the last check.
    #[serde(default)]
    pub regrade_count: i64,
    /// Grade ids pending regrade.
    #[serde(default)]
    pub grade_ids_that_need_retro: Vec<i64>,
}

impl TopicRegradeInfo {
    pub fn in_flight(&self) -> bool {
        self.retro_started_time.is_some()
    }
}

/// The (topic, question, user) triple a regrade check is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegradeScope {
    pub topic_id: i64,
    pub question_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl RegradeScope {
    pub fn topic(topic_id: i64) -> Self {
        Self {
            topic_id,
            question_id: None,
            user_id: None,
        }
    }

    pub fn with_question(mut self, question_id: i64) -> Self {
        self.question_id = Some(question_id);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_camel_case_payload() {
        let info: TopicRegradeInfo = serde_json::from_str(
            r#"{
                "retroStartedTime": "2021-03-01T12:00:00Z",
                "regradeCount": 3,
                "gradeIdsThatNeedRetro": [1, 2]
            }"#,
        )
        .unwrap();
        assert!(info.in_flight());
        assert_eq!(info.regrade_count, 3);
        assert_eq!(info.grade_ids_that_need_retro, vec![1, 2]);
    }

    #[test]
    fn missing_optional_fields_default() {
        let info: TopicRegradeInfo =
            serde_json::from_str(r#"{ "retroStartedTime": null }"#).unwrap();
        assert!(!info.in_flight());
        assert_eq!(info.regrade_count, 0);
        assert!(info.grade_ids_that_need_retro.is_empty());
    }

    #[test]
    fn scope_builder() {
        let scope = RegradeScope::topic(10).with_question(4).with_user(99);
        assert_eq!(scope.topic_id, 10);
        assert_eq!(scope.question_id, Some(4));
        assert_eq!(scope.user_id, Some(99));
    }
}
