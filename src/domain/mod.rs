pub mod auth;
pub mod collector;
pub mod dashboard_service;
pub mod detect;
pub mod geolocation;
pub mod private_ip;
pub mod public_ip;
pub mod snapshot;
pub mod types;
