pub mod health;
pub mod metrics;
pub mod projects;
pub mod tasks;

pub use health::health_check;
pub use metrics::metrics_endpoint;
pub use projects::{create_project, delete_project, get_project, list_projects, update_project};
pub use tasks::{create_task, delete_task, list_tasks, update_task};
