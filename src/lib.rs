pub mod api;
pub mod character;
pub mod config;
pub mod cooldown;
pub mod db;
pub mod embed;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod prefix;
pub mod progression;
pub mod util;
