//! PintuKerja quota service
//!
//! Subscription plans, usage counters and admission control for the job board's
//! gated actions: posting a job, marking a posting featured or urgent, and
//! downloading a CV.
//!
//! The rules themselves are pure functions in [`domain`]:
//! ```rust
//! use pintu_kerja::domain::{can_post_job, SubscriptionPlan};
//!
//! let admission = can_post_job(SubscriptionPlan::Free, 3);
//! assert!(!admission.allowed);
//! assert_eq!(admission.reason.as_deref(), Some("Quota habis! Upgrade ke Starter (Rp 199k)"));
//! ```
//!
//! ## Standalone
//!
//! ```bash
//! pintu-kerja-server
//! ```
//!
//! ## Embedded (Axum)
//!
//! With the `server` feature enabled the router can be nested into the main API:
//! ```rust,ignore
//! use axum::Router;
//! use pintu_kerja::infrastructure::AppConfig;
//! use pintu_kerja::server::{build_state_with_pool, router};
//! use sqlx::PgPool;
//!
//! let cfg = AppConfig::from_env()?;
//! let pool = PgPool::connect(&cfg.database_url).await?;
//! let state = build_state_with_pool(cfg, pool, true).await?;
//! let app = Router::new().nest("/billing", router(state));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Enabled behind the `server` feature so the rules can be used without Axum.
#[cfg(feature = "server")]
pub mod server;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;

#[cfg(feature = "server")]
pub use server::*;
