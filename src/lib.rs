pub mod charts;
pub mod dashboard;
pub mod data;
pub mod filter;
pub mod html;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod state;
