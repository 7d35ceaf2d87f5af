pub mod projects;
pub mod tasks;

pub use projects::{CreateProjectRequest, ProjectResponse, UpdateProjectRequest};
pub use tasks::{CreateTaskRequest, TaskResponse, UpdateTaskRequest};
