pub mod database;
pub mod metrics;
pub mod token;

pub use database::MongoDb;
pub use metrics::{get_metrics, init_metrics};
pub use token::{AccessTokenClaims, TokenVerifier};
