//! HTTP session controller.
//!
//! A browser front end drives one drafting session through these routes:
//! upload a protocol, review and edit the fields, pick a template, render.
//! Routes are nested under `/api/`.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server, ApiServer, ApiServerInfo};
pub use types::ApiContext;
