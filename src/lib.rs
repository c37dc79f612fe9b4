#![doc(html_root_url = "https://docs.rs/dash-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! Single-page-app-like navigation for server-rendered dashboards.
//!
//! A [`Dash`] is constructed once from a [`Config`], a [`Dom`] and a [`Transport`], and then [`init`](`Dash::init`)ed
//! to bind to the document. See the README for an overview.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod config;
mod dash;
pub mod delegate;
pub mod dom;
pub mod error;
pub mod form;
pub mod history;
pub mod memory;
pub mod navigate;
pub mod payload;
pub mod request;
pub mod resource;
pub mod search;
pub mod transport;
pub mod web;

pub use config::Config;
pub use dash::{Action, Dash, WeakDash};
pub use dom::Dom;
pub use error::{Error, Result};
pub use navigate::{NavigateOptions, ViewTarget};
pub use payload::{Body, Payload};
pub use request::{Failure, RequestHandle, RequestOptions};
pub use search::SearchOptions;
pub use transport::{Method, Transport};
