//! # ovh-dynhost
//!
//! Keeps OVH DynHost records pointed at the current public IPv4 address.
//!
//! ## Features
//!
//! - Public IPv4 detection through a plain-text echo service
//! - Signed OVH API client (record lookup, read, update)
//! - Consumer key bootstrap with the minimal `/domain/zone/*` access rules
//! - Per-target failure isolation: one broken record never blocks the others
//!
//! ## Usage
//!
//! ```bash
//! # One-time: obtain a consumer key, then validate it in a browser
//! ovh-dynhost auth
//!
//! # Periodically (cron, systemd timer)
//! ovh-dynhost update
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod reconciler;

pub use config::{Config, Target};
pub use detector::{IpDetector, IpSource};
pub use error::{DdnsError, ErrorKind, Result};
pub use reconciler::{Reconciler, RunReport};
