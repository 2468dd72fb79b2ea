//! Task builders for warehouse workflow graphs.
//!
//! This crate turns declarative inputs into the step descriptions defined in
//! [`firn_types`]: an idempotent create/replace SQL group, polling steps that
//! block on external completions or wall-clock time, and the injected
//! variable/secret/region stores the builders read configuration from.
//!
//! Nothing here schedules, retries, or executes anything. The emitted
//! documents are handed to an external orchestration engine, which owns all
//! of that; warehouse side effects happen when the engine runs the steps.

pub mod credits;
pub mod format;
pub mod poll;
pub mod region;
pub mod replace;
pub mod store;
pub mod txn;

pub use credits::warehouse_size_credits_case;
pub use format::format_query;
pub use poll::{wait_for_completions, wait_n_hours, RunContext, WarehouseClient};
pub use region::{RegionCatalog, RegionProfile};
pub use replace::{ManagedReplace, TableType};
pub use store::{
    DeployEnv, EnvSecretStore, EnvVariableStore, SecretStore, StaticSecretStore,
    StaticVariableStore, VariableStore,
};
pub use txn::TransactionPolicy;
