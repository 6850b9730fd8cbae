//! Route configuration

pub mod relay;

pub use relay::create_relay_router;
