//! SocialSpace terminal client.
//!
//! A photo feed with likes, follows, stories and uploads, talking to a
//! hosted backend (auth, PostgREST-style tables and object storage).

pub mod app;
pub mod backend;
pub mod banner;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod model;
pub mod services;
pub mod state;
pub mod ui;
