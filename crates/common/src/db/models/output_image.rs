//! Generated output image entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::portrait_model::JobStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "output_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub model_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub prompt: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Correlation handle for the outstanding generation job
    #[sea_orm(column_type = "Text", nullable)]
    pub provider_request_id: Option<String>,

    /// Resolved image location, set by the image webhook
    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the generation status as an enum
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from(self.status.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portrait_model::Entity",
        from = "Column::ModelId",
        to = "super::portrait_model::Column::Id"
    )]
    PortraitModel,
}

impl Related<super::portrait_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortraitModel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
