use careercompass_config::Settings;
use careercompass_services::{
    AuthService, ChatService, ObjectStore, UploadGateway,
    dao::{MessageDao, UserDao},
};
use mongodb::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub chat: Arc<ChatService>,
    pub messages: Arc<MessageDao>,
    pub object_store: Arc<ObjectStore>,
    pub uploads: Arc<UploadGateway>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let chat = Arc::new(ChatService::new(&db, settings.chat.clone()));
        let messages = Arc::new(MessageDao::new(&db));
        let object_store = Arc::new(ObjectStore::new(&db, &settings.upload.bucket_name));
        let uploads = Arc::new(UploadGateway::new(
            Arc::clone(&object_store),
            settings.upload.clone(),
        ));

        Self {
            db,
            settings,
            auth,
            users,
            chat,
            messages,
            object_store,
            uploads,
        }
    }
}
