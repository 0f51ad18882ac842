use bson::{DateTime, doc, oid::ObjectId};
use careercompass_db::models::{User, UserRole};
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        display_name: String,
        password_hash: String,
        role: UserRole,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email,
            display_name,
            password_hash: Some(password_hash),
            role,
            avatar: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email })
            .await?
            .ok_or(super::base::DaoError::NotFound)
    }

    pub async fn find_by_id(&self, user_id: ObjectId) -> DaoResult<User> {
        self.base.find_by_id(user_id).await
    }

    /// Lookup for first-contact: the target must be an active mentor.
    pub async fn find_active_mentor(&self, mentor_id: ObjectId) -> DaoResult<Option<User>> {
        self.base
            .find_one(doc! {
                "_id": mentor_id,
                "role": "mentor",
                "is_active": true,
            })
            .await
    }
}
