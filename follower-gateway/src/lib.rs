mod client;
mod dto;
mod error;

pub use client::{Gateway, GatewayClient, DEFAULT_GATEWAY_URL};
pub use error::GatewayError;
