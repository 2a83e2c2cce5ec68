use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const COMPANY_NAME_MAX_LENGTH: usize = 200;
pub const JOB_TITLE_MAX_LENGTH: usize = 200;
pub const DESCRIPTION_TEXT_MIN_LENGTH: usize = 50;
pub const DESCRIPTION_TEXT_MAX_LENGTH: usize = 10_000;

/// Bearer token issued by login/register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobDescriptionStatus {
    Pending,
    QuestionsGenerated,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub job_title: String,
    pub status: JobDescriptionStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub answered_questions: Option<u32>,
}

/// Job description upload
#[derive(Debug, Clone, Serialize)]
pub struct NewJobDescription {
    pub company_name: String,
    pub job_title: String,
    pub description_text: String,
}

impl NewJobDescription {
    /// Check field lengths before upload; returns the first problem found
    pub fn validate(&self) -> Result<(), String> {
        let company = self.company_name.trim().chars().count();
        if company == 0 || company > COMPANY_NAME_MAX_LENGTH {
            return Err(format!(
                "company name must be 1 to {} characters (got {})",
                COMPANY_NAME_MAX_LENGTH, company
            ));
        }

        let title = self.job_title.trim().chars().count();
        if title == 0 || title > JOB_TITLE_MAX_LENGTH {
            return Err(format!(
                "job title must be 1 to {} characters (got {})",
                JOB_TITLE_MAX_LENGTH, title
            ));
        }

        let text = self.description_text.trim().chars().count();
        if !(DESCRIPTION_TEXT_MIN_LENGTH..=DESCRIPTION_TEXT_MAX_LENGTH).contains(&text) {
            return Err(format!(
                "description must be {} to {} characters (got {})",
                DESCRIPTION_TEXT_MIN_LENGTH, DESCRIPTION_TEXT_MAX_LENGTH, text
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub job_description_id: String,
    pub question_text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts_count: Option<u32>,
    #[serde(default)]
    pub last_score: Option<f64>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        self.attempts_count.unwrap_or(0) > 0
    }
}

/// Scores per evaluation dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub confidence: u32,
    pub clarity_structure: u32,
    pub technical_depth: u32,
    pub communication_skills: u32,
    pub relevance: u32,
}

impl Scores {
    pub fn average(&self) -> f64 {
        let total = self.confidence
            + self.clarity_structure
            + self.technical_depth
            + self.communication_skills
            + self.relevance;
        total as f64 / 5.0
    }
}

/// Written feedback per evaluation dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub confidence: String,
    pub clarity_structure: String,
    pub technical_depth: String,
    pub communication_skills: String,
    pub relevance: String,
}

/// A scored answer as returned by submit and list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub response_id: String,
    #[serde(default)]
    pub transcript: String,
    pub scores: Scores,
    pub feedback: Feedback,
    #[serde(default)]
    pub overall_comment: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Timestamps from the backend, with or without a UTC offset
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
