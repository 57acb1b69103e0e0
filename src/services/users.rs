use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Service for the cashier roster
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a user; usernames must be unique
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(
        &self,
        request: CreateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "username '{}' is already taken",
                request.username
            )));
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(request.username),
            email: Set(request.email),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(user_id = %model.id, username = %model.username, "User created");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::UserCreated(model.id)).await {
                warn!(error = %e, "Failed to send user created event");
            }
        }

        Ok(Self::to_response(model))
    }

    /// Retrieves a user by ID
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let db = &*self.db_pool;

        let model = user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        Ok(Self::to_response(model))
    }

    /// Lists users alphabetically
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let db = &*self.db_pool;

        let users = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;

        Ok(users.into_iter().map(Self::to_response).collect())
    }

    fn to_response(model: user::Model) -> UserResponse {
        UserResponse {
            id: model.id,
            username: model.username,
            email: model.email,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
