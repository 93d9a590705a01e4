//! Post-install verification of a freshly installed host.
//!
//! The installer leaves a snapshot of the state it was asked to produce on
//! the target. This crate fetches that snapshot over SSH, probes the live
//! system, and reports one pass/fail verdict per configuration domain.
//!
//! - **Expected state** - typed, validated snapshot ([`expected`])
//! - **Pattern derivation** - pure functions from expected state to patterns ([`derive`])
//! - **Remote probe** - command execution and file transfer with timeouts ([`transport`])
//! - **Matcher** - line-pattern and literal matching over output ([`matcher`])
//! - **Domain checks** - one boolean per domain ([`checks`])
//! - **Orchestrator** - one run, one verdict map ([`orchestrator`])
//!
//! # Architecture
//!
//! ```text
//! orchestrator::run
//!     │
//!     ├── expected::load ──── RemoteProbe::fetch_file
//!     │
//!     └── CheckId::run (per selected check)
//!             │
//!             ├── derive::* ──── patterns
//!             ├── RemoteProbe::execute / read_remote_file
//!             └── matcher::* ──── bool
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use install_verify::config::{load_config, Overrides};
//! use install_verify::orchestrator::verify_host;
//!
//! let overrides = Overrides { host: Some("node1".into()), ..Default::default() };
//! let config = load_config(None, &overrides)?;
//! let outcome = verify_host(config.target, &config.options)?;
//! assert!(outcome.verdicts.passed());
//! ```

pub mod checks;
pub mod config;
pub mod derive;
pub mod error;
pub mod expected;
pub mod matcher;
pub mod orchestrator;
pub mod preflight;
pub mod report;
pub mod transport;

pub use checks::CheckId;
pub use error::{LoadError, ProbeError, SpecError, VerifyError};
pub use orchestrator::{run, verify_host, RunOptions, RunOutcome, Verdicts};
