use crate::error::AppError;
use crate::models::{Project, Task};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for project-service");

        // Index on owner_id for owner-scoped project listing
        let owner_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("owner_lookup".to_string())
                    .build(),
            )
            .build();

        self.projects()
            .create_index(owner_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create owner index on projects collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on projects.owner_id");

        // Index on project_id for task listing and cascade deletes
        let project_index = IndexModel::builder()
            .keys(doc! { "project_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("project_lookup".to_string())
                    .build(),
            )
            .build();

        self.tasks()
            .create_index(project_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create project index on tasks collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on tasks.project_id");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn projects(&self) -> Collection<Project> {
        self.db.collection("projects")
    }

    pub fn tasks(&self) -> Collection<Task> {
        self.db.collection("tasks")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }
}
