//! HTTP API handlers for photosong-ai
//!
//! REST for job submission and polling, SSE for progress.

pub mod health;
pub mod jobs;
pub mod sse;

pub use health::health_routes;
pub use jobs::job_routes;
pub use sse::event_stream;
