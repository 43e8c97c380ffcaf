pub mod app;
pub mod bot;
pub mod config;
pub mod dialog;
pub mod functions;
pub mod healthcheck;
pub mod telemetry;
