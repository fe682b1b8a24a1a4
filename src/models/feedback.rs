//! Member feedback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FeedbackStatus {
    #[serde(rename = "belum dibalas")]
    Pending,
    #[serde(rename = "sudah dibalas")]
    Replied,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "belum dibalas",
            FeedbackStatus::Replied => "sudah dibalas",
        }
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "belum dibalas" => Ok(FeedbackStatus::Pending),
            "sudah dibalas" => Ok(FeedbackStatus::Replied),
            _ => Err(format!("Invalid feedback status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for FeedbackStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for FeedbackStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for FeedbackStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Feedback message with its sender
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Feedback {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub message: String,
    #[serde(with = "crate::models::datetime")]
    #[schema(value_type = String, example = "2025-01-08 14:30:00")]
    pub date_sent: DateTime<Utc>,
    pub admin_reply: Option<String>,
    pub status: FeedbackStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFeedback {
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplyFeedback {
    #[validate(length(min = 1, message = "Reply cannot be empty"))]
    pub reply: String,
}
