//! Local HTTP control API
//!
//! - GET /health - Health check
//! - GET /contacts, POST /contacts, DELETE /contacts/:id - Contact management
//! - POST /emergency/activate, POST /emergency/deactivate - Session control
//! - GET /emergency/status - Session log and pending question
//! - POST /emergency/answer - Answer the pending question
//! - GET /permissions, POST /permissions/refresh - Capability permissions
//! - POST /location/refresh, GET /location/map - Location fix and map link
//! - GET /services - Emergency number directory
//! - POST /reset - Clear all stored data

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
