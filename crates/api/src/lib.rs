//! Admin REST API: recipient CRUD, campaign dispatch, webhook intake,
//! analytics, and the template/content endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod server;

pub use handlers::AppState;
pub use router::build_router;
pub use server::ApiServer;
