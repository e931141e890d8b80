//! Trained portrait model entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an asynchronously executing provider job.
///
/// Rows are created in `Submitted` and move to a terminal state only
/// through a webhook matching their provider request id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Completed,
    Failed,
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "submitted" => JobStatus::Submitted,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Submitted,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Submitted => "submitted".to_string(),
            JobStatus::Completed => "completed".to_string(),
            JobStatus::Failed => "failed".to_string(),
        }
    }
}

impl JobStatus {
    /// Check whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Subject type descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectType {
    Man,
    Woman,
    Other,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Man => "Man",
            SubjectType::Woman => "Woman",
            SubjectType::Other => "Other",
        }
    }
}

/// Ethnicity descriptor (wire spellings match the public API)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ethnicity {
    White,
    Black,
    #[serde(rename = "Asian_American")]
    AsianAmerican,
    #[serde(rename = "East_Asian")]
    EastAsian,
    #[serde(rename = "South_East_Asian")]
    SouthEastAsian,
    #[serde(rename = "South_Eastern")]
    SouthEastern,
    #[serde(rename = "Middle_Eastern")]
    MiddleEastern,
    Pacific,
    Hispanic,
}

impl Ethnicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ethnicity::White => "White",
            Ethnicity::Black => "Black",
            Ethnicity::AsianAmerican => "Asian_American",
            Ethnicity::EastAsian => "East_Asian",
            Ethnicity::SouthEastAsian => "South_East_Asian",
            Ethnicity::SouthEastern => "South_Eastern",
            Ethnicity::MiddleEastern => "Middle_Eastern",
            Ethnicity::Pacific => "Pacific",
            Ethnicity::Hispanic => "Hispanic",
        }
    }
}

/// Eye color descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeColor {
    Brown,
    Blue,
    Hazel,
    Gray,
}

impl EyeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            EyeColor::Brown => "Brown",
            EyeColor::Blue => "Blue",
            EyeColor::Hazel => "Hazel",
            EyeColor::Gray => "Gray",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub subject_type: String,

    pub age: i32,

    #[sea_orm(column_type = "Text")]
    pub ethnicity: String,

    #[sea_orm(column_type = "Text")]
    pub eye_color: String,

    pub bald: bool,

    /// Source archive of training images
    #[sea_orm(column_type = "Text")]
    pub zip_url: String,

    /// Token conditioning the trained model
    #[sea_orm(column_type = "Text")]
    pub trigger_word: String,

    /// Correlation handle for the outstanding training job
    #[sea_orm(column_type = "Text", nullable)]
    pub provider_request_id: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub training_status: String,

    /// Trained weights reference, set by the training webhook
    #[sea_orm(column_type = "Text", nullable)]
    pub tensor_path: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the training status as an enum
    pub fn status(&self) -> JobStatus {
        JobStatus::from(self.training_status.clone())
    }

    /// Check whether the model has resolved weights and can serve generation
    pub fn is_trained(&self) -> bool {
        self.status() == JobStatus::Completed && self.tensor_path.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::output_image::Entity")]
    OutputImages,
}

impl Related<super::output_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutputImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [JobStatus::Submitted, JobStatus::Completed, JobStatus::Failed] {
            let s = String::from(status.clone());
            assert_eq!(JobStatus::from(s), status);
        }
    }

    #[test]
    fn test_unknown_status_normalizes_to_submitted() {
        assert_eq!(JobStatus::from("Generated".to_string()), JobStatus::Submitted);
        assert_eq!(JobStatus::from(String::new()), JobStatus::Submitted);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_ethnicity_wire_spelling() {
        let e: Ethnicity = serde_json::from_str("\"Asian_American\"").unwrap();
        assert_eq!(e, Ethnicity::AsianAmerican);
        assert_eq!(e.as_str(), "Asian_American");
    }
}
