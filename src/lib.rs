//! Rate-limited API key pool and idempotent filing cache - hand out upstream credentials,
//! rotate on 429, and store every filing exactly once.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod model;
pub mod object;
pub mod obs;
pub mod pool;
pub mod schedule;
#[cfg(feature = "server")] pub mod server;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use {clap as _, color_eyre as _, tracing_subscriber as _};
#[cfg(test)] use {httpmock as _, tower as _};
