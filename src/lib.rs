pub mod backend;
pub mod check;
pub mod comprehensive;
pub mod config;
pub mod db;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod env_check;
pub mod errors;
pub mod logging;
pub mod models;
pub mod panel;
pub mod store;

#[cfg(feature = "desktop")]
pub use crate::desktop::run;
