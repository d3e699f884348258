//! Policy types for the runguard execution endpoint.
//!
//! Two pieces of operator policy live here, both compiled once at startup
//! and read-only afterwards:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  security: (YAML)                            │
//! │   allowed_networks: ["127.0.0.0/8", "10.0.0.0/8"]            │
//! │   approved_path_arguments:                                   │
//! │     sh: [["-c"], ["-s"]]                                     │
//! └───────────────┬──────────────────────────────┬───────────────┘
//!                 ▼                              ▼
//! ┌───────────────────────────────┐  ┌───────────────────────────┐
//! │ NetworkPolicy                 │  │ AllowlistPolicy           │
//! │ • CIDR containment (v4 + v6)  │  │ • exact executable key    │
//! │ • empty set denies all        │  │ • exact argument sequence │
//! └───────────────────────────────┘  └───────────────────────────┘
//! ```
//!
//! Both types fail closed: anything not explicitly listed is refused.

pub mod allowlist;
pub mod error;
pub mod network;

pub use allowlist::{AllowlistPolicy, ArgumentSequences, CommandMatch};
pub use error::{PolicyError, PolicyResult};
pub use network::NetworkPolicy;
