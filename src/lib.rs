pub mod app;
pub mod auth;
pub mod config;
pub mod deadline;
pub mod response;
pub mod state;
pub mod telemetry;
pub mod users;
