//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling. Webhook-driven status transitions are single filtered
//! updates keyed on the provider request id, so retried deliveries and
//! unknown job ids degrade to zero-row no-ops.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

/// Clamp limit/offset query parameters to sane page bounds
pub fn clamp_page(limit: Option<u64>, offset: Option<u64>) -> (u64, u64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (limit, offset.unwrap_or(0))
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Model Operations
    // ========================================================================

    /// Persist a model row in submitted state, correlated to a training job
    #[allow(clippy::too_many_arguments)]
    pub async fn create_model(
        &self,
        user_id: Uuid,
        name: String,
        subject_type: SubjectType,
        age: i32,
        ethnicity: Ethnicity,
        eye_color: EyeColor,
        bald: bool,
        zip_url: String,
        trigger_word: String,
        provider_request_id: String,
    ) -> Result<PortraitModel> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let model = PortraitModelActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            name: Set(name),
            subject_type: Set(subject_type.as_str().to_string()),
            age: Set(age),
            ethnicity: Set(ethnicity.as_str().to_string()),
            eye_color: Set(eye_color.as_str().to_string()),
            bald: Set(bald),
            zip_url: Set(zip_url),
            trigger_word: Set(trigger_word),
            provider_request_id: Set(Some(provider_request_id)),
            training_status: Set(String::from(JobStatus::Submitted)),
            tensor_path: Set(None),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find model by ID
    pub async fn find_model_by_id(&self, id: Uuid) -> Result<Option<PortraitModel>> {
        PortraitModelEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve every submitted model matching the training job id to
    /// completed, storing the trained weights path.
    ///
    /// Returns the number of rows updated; zero means the job id is unknown
    /// or the row already reached a terminal state.
    pub async fn complete_training(&self, request_id: &str, tensor_path: &str) -> Result<u64> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let result = PortraitModelEntity::update_many()
            .col_expr(
                PortraitModelColumn::TrainingStatus,
                Expr::value(String::from(JobStatus::Completed)),
            )
            .col_expr(
                PortraitModelColumn::TensorPath,
                Expr::value(Some(tensor_path.to_string())),
            )
            .col_expr(PortraitModelColumn::UpdatedAt, Expr::value(now))
            .filter(PortraitModelColumn::ProviderRequestId.eq(request_id))
            .filter(PortraitModelColumn::TrainingStatus.eq(String::from(JobStatus::Submitted)))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Mark every submitted model matching the training job id as failed
    pub async fn fail_training(&self, request_id: &str, error: &str) -> Result<u64> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let result = PortraitModelEntity::update_many()
            .col_expr(
                PortraitModelColumn::TrainingStatus,
                Expr::value(String::from(JobStatus::Failed)),
            )
            .col_expr(
                PortraitModelColumn::ErrorMessage,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(PortraitModelColumn::UpdatedAt, Expr::value(now))
            .filter(PortraitModelColumn::ProviderRequestId.eq(request_id))
            .filter(PortraitModelColumn::TrainingStatus.eq(String::from(JobStatus::Submitted)))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Output Image Operations
    // ========================================================================

    /// Persist a single output image row in submitted state
    pub async fn create_output_image(
        &self,
        user_id: Uuid,
        model_id: Uuid,
        prompt: String,
        provider_request_id: String,
    ) -> Result<OutputImage> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let image = OutputImageActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            model_id: Set(model_id),
            prompt: Set(prompt),
            status: Set(String::from(JobStatus::Submitted)),
            provider_request_id: Set(Some(provider_request_id)),
            image_url: Set(None),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        image.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Persist one output image row per (prompt, job id) pair, preserving
    /// input order in the returned rows.
    pub async fn create_output_images(
        &self,
        user_id: Uuid,
        model_id: Uuid,
        pairs: Vec<(String, String)>,
    ) -> Result<Vec<OutputImage>> {
        let mut rows = Vec::with_capacity(pairs.len());

        for (prompt, request_id) in pairs {
            let row = self
                .create_output_image(user_id, model_id, prompt, request_id)
                .await?;
            rows.push(row);
        }

        Ok(rows)
    }

    /// Resolve every submitted image matching the generation job id
    pub async fn complete_image(&self, request_id: &str, image_url: &str) -> Result<u64> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let result = OutputImageEntity::update_many()
            .col_expr(
                OutputImageColumn::Status,
                Expr::value(String::from(JobStatus::Completed)),
            )
            .col_expr(
                OutputImageColumn::ImageUrl,
                Expr::value(Some(image_url.to_string())),
            )
            .col_expr(OutputImageColumn::UpdatedAt, Expr::value(now))
            .filter(OutputImageColumn::ProviderRequestId.eq(request_id))
            .filter(OutputImageColumn::Status.eq(String::from(JobStatus::Submitted)))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Mark every submitted image matching the generation job id as failed
    pub async fn fail_image(&self, request_id: &str, error: &str) -> Result<u64> {
        let now: DateTimeWithTimeZone = chrono::Utc::now().into();

        let result = OutputImageEntity::update_many()
            .col_expr(
                OutputImageColumn::Status,
                Expr::value(String::from(JobStatus::Failed)),
            )
            .col_expr(
                OutputImageColumn::ErrorMessage,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(OutputImageColumn::UpdatedAt, Expr::value(now))
            .filter(OutputImageColumn::ProviderRequestId.eq(request_id))
            .filter(OutputImageColumn::Status.eq(String::from(JobStatus::Submitted)))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// List images owned by a user, optionally restricted to specific ids,
    /// with bounded pagination.
    pub async fn list_images(
        &self,
        user_id: Uuid,
        ids: Option<Vec<Uuid>>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<OutputImage>, u64)> {
        let mut query = OutputImageEntity::find().filter(OutputImageColumn::UserId.eq(user_id));

        if let Some(ids) = ids {
            query = query.filter(OutputImageColumn::Id.is_in(ids));
        }

        let total = query.clone().count(self.read_conn()).await?;

        let images = query
            .order_by_desc(OutputImageColumn::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((images, total))
    }

    // ========================================================================
    // Pack Operations
    // ========================================================================

    /// Find pack by ID
    pub async fn find_pack_by_id(&self, id: Uuid) -> Result<Option<Pack>> {
        PackEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List packs with bounded pagination
    pub async fn list_packs(&self, offset: u64, limit: u64) -> Result<(Vec<Pack>, u64)> {
        let total = PackEntity::find().count(self.read_conn()).await?;

        let packs = PackEntity::find()
            .order_by_asc(PackColumn::Name)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((packs, total))
    }

    /// List a pack's prompts in their stable position order
    pub async fn list_pack_prompts(&self, pack_id: Uuid) -> Result<Vec<PackPrompt>> {
        PackPromptEntity::find()
            .filter(PackPromptColumn::PackId.eq(pack_id))
            .order_by_asc(PackPromptColumn::Position)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_defaults() {
        assert_eq!(clamp_page(None, None), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_clamp_page_bounds() {
        assert_eq!(clamp_page(Some(0), Some(5)), (1, 5));
        assert_eq!(clamp_page(Some(1000), None), (MAX_PAGE_SIZE, 0));
        assert_eq!(clamp_page(Some(20), Some(0)), (20, 0));
    }
}
