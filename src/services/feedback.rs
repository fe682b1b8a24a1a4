//! Feedback service

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{feedback::Feedback, user::UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct FeedbackService {
    repository: Repository,
}

impl FeedbackService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn submit(&self, user_id: i32, message: &str) -> AppResult<Feedback> {
        self.repository
            .feedback
            .create(user_id, message.trim(), Utc::now())
            .await
    }

    /// Administrators see every message, members only their own
    pub async fn list(&self, claims: &UserClaims) -> AppResult<Vec<Feedback>> {
        let owner = (!claims.is_admin()).then_some(claims.user_id);
        self.repository.feedback.list(owner).await
    }

    pub async fn reply(&self, id: i32, reply: &str) -> AppResult<Feedback> {
        let feedback = self.repository.feedback.reply(id, reply.trim()).await?;
        tracing::info!("Feedback {} answered", id);
        Ok(feedback)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.feedback.delete(id).await
    }
}
