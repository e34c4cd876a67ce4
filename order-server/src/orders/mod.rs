//! Order lifecycle module
//!
//! - **service**: OrderService, orchestration of every mutation
//! - **status_machine**: allowed moves and their side-effect hints
//! - **storage**: durable (redb) + fallback backends behind one store
//! - **classifier**: test-order detection (creation and backfill)
//! - **scheduler** / **timer**: delayed auto-confirm and prep timers
//!
//! # Architecture
//!
//! ```text
//! HTTP → OrderService → status_machine → OrderStore (redb | fallback)
//!              ↓                               ↓
//!        TaskScheduler                    committed Order
//!        TimerCoordinator                      ↓
//!                                       RealtimeFanout → kitchen / kanban / sinks
//! ```

pub mod backfill;
pub mod classifier;
pub mod error;
pub mod fee;
pub mod locks;
pub mod money;
pub mod scheduler;
pub mod service;
pub mod status_machine;
pub mod storage;
pub mod timer;
pub mod validation;

pub use backfill::{BackfillJob, BackfillReport, BackfillSettings, WriteGate};
pub use classifier::{ClassifierConfig, OrderClassifier};
pub use error::{OrderError, OrderResult};
pub use fee::FeePolicy;
pub use service::{BulkFailure, BulkUpdateReport, OrderService, ServiceConfig};
pub use storage::{FallbackStore, OfflineBackend, OrderBackend, OrderStore, RedbBackend};
pub use timer::TimerCoordinator;
