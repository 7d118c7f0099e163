//! RxLedger Hooks - External collaborators of the decision pipeline
//!
//! ```text
//! Submission
//!     │
//!     ▼
//! ┌─────────────────────────────┐
//! │ VALIDATOR                   │ ← required fields, interactions, age
//! └─────────────────────────────┘
//!     │
//!     ▼
//!   score + route
//!     │
//!     ├── Flag ──────────► NOTIFICATION GATEWAY (tier alert)
//!     │
//!     ▼
//! ┌─────────────────────────────┐
//! │ LEDGER APPEND               │
//! └─────────────────────────────┘
//!     │
//!     ▼
//!   INTEGRATIONS (records, insurance, inventory)
//! ```
//!
//! Collaborators run outside the ledger and queue locks. Their failures are
//! logged and reported, never rolled back into the core state.

pub mod context;
pub mod error;
pub mod integration;
pub mod notify;
pub mod registry;
pub mod traits;
pub mod validator;

pub use context::{IntegrationContext, NotificationContext, NotificationKind};
pub use error::{HookError, HookResult};
pub use integration::{IntegrationOutcome, StaticIntegration};
pub use notify::{DeliveryRecord, DeliveryStatus, RecordingGateway, TracingGateway};
pub use registry::{FailPolicy, HookRegistry};
pub use traits::{IntegrationHook, NoOpIntegration, NotificationGateway, PrescriptionValidator};
pub use validator::RuleBasedValidator;
