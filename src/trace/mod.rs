//! Middleware that adds a server span to a [`Service`].
//!
//! [`Service`]: tower_service::Service

#[doc(inline)]
pub use self::{
    config::{Config, ResponseMeta},
    http::{request_context, Http, HttpLayer},
    peer::RemoteAddr,
};

mod config;
mod extractor;
pub mod http;
pub mod operation_name;
mod peer;
pub mod tags;
