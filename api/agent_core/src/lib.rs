#![ allow( clippy::missing_errors_doc ) ]
#![ allow( clippy::missing_panics_doc ) ]
#![ allow( clippy::unused_async ) ]
#![ allow( clippy::double_must_use ) ]
#![ allow( clippy::std_instead_of_core ) ]
#![ allow( clippy::must_use_candidate ) ]
#![ allow( clippy::doc_markdown ) ]
#![ allow( clippy::cast_possible_truncation ) ]
#![ allow( clippy::cast_lossless ) ]
#![ allow( clippy::missing_inline_in_public_items ) ]
#![ allow( clippy::map_unwrap_or ) ]
#![ allow( clippy::cast_sign_loss ) ]
#![ allow( clippy::redundant_closure_for_method_calls ) ]
#![ allow( clippy::match_same_arms ) ]
#![ allow( clippy::await_holding_lock ) ]
#![ allow( clippy::uninlined_format_args ) ]
#![ allow( clippy::new_without_default ) ]
#![ allow( clippy::missing_fields_in_debug ) ]
#![ allow( clippy::type_complexity ) ]
#![ allow( clippy::struct_excessive_bools ) ]
#![ allow( clippy::unused_self ) ]
#![ allow( clippy::unreadable_literal ) ]
#![ allow( clippy::unnecessary_map_or ) ]
#![ allow( clippy::unchecked_duration_subtraction ) ]
#![ allow( clippy::too_many_lines ) ]
#![ allow( clippy::single_match ) ]
#![ allow( clippy::should_implement_trait ) ]
#![ allow( clippy::return_self_not_must_use ) ]
#![ allow( clippy::redundant_else ) ]
#![ allow( clippy::needless_pass_by_value ) ]
#![ allow( clippy::format_in_format_args ) ]
#![ allow( clippy::for_kv_map ) ]
#![ allow( clippy::cast_possible_wrap ) ]
#![ allow( clippy::float_cmp ) ]
#![ allow( clippy::bool_assert_comparison ) ]
#![ allow( clippy::manual_string_new ) ]
#![ allow( clippy::len_zero ) ]
#![ allow( clippy::needless_borrows_for_generic_args ) ]
#![ allow( clippy::useless_format ) ]
#![ allow( clippy::no_effect_underscore_binding ) ]

//! Routing and execution core for a personal AI orchestration agent.
//!
//! Given one line of user text, the [`Orchestrator`] runs it through a
//! pattern-based command parser, a five-tier intent classifier, a static
//! routing table, and a cached/retrying execution flow, landing on
//! either a remote aggregator or a locally-served model.
//!
//! ## State Management Policy
//!
//! Unlike a thin API client, this crate owns two durable pieces of
//! state on purpose:
//!
//! - **The Response Cache (`cache`, feature `request_caching`)** persists
//!   content-addressed responses to a local database file across
//!   process restarts — that is the entire point of a cache.
//! - **The Local Model Service Manager (`local_manager`)** owns a
//!   subprocess handle for the lifetime of the process; it does not
//!   survive a restart, but it is deliberately stateful within one.
//!
//! Everything else follows the "runtime-stateful, process-stateless"
//! discipline: retry counters, health-check caches, judge-label caches,
//! and the command parser's interaction context all die with the
//! process.
//!
//! ## Feature Gating
//!
//! Every capability beyond the closed data model and error taxonomy is
//! behind a cargo feature (`retry`, `request_caching`, `health_checks`,
//! `structured_logging`, `streaming`, `failover`), each mapping to one
//! module. `full` enables all of them; `default = ["full"]`.

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

#[ cfg( feature = "enabled" ) ]
pub mod errors;
#[ cfg( feature = "enabled" ) ]
pub mod model;
#[ cfg( feature = "enabled" ) ]
pub mod config;
#[ cfg( feature = "enabled" ) ]
pub mod cache;
#[ cfg( feature = "enabled" ) ]
pub mod client;
#[ cfg( feature = "retry" ) ]
pub mod retry;
#[ cfg( feature = "enabled" ) ]
pub mod remote_client;
#[ cfg( feature = "enabled" ) ]
pub mod local_client;
#[ cfg( all( feature = "enabled", feature = "health_checks" ) ) ]
pub mod local_manager;
#[ cfg( feature = "enabled" ) ]
pub mod intent;
#[ cfg( feature = "enabled" ) ]
pub mod routing;
#[ cfg( all( feature = "enabled", feature = "retry" ) ) ]
pub mod execution;
#[ cfg( feature = "enabled" ) ]
pub mod command_parser;
#[ cfg( all( feature = "enabled", feature = "retry", feature = "health_checks" ) ) ]
pub mod orchestrator;

#[ cfg( feature = "enabled" ) ]
mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    errors::ErrorKind,
    errors::Severity,
    errors::ErrorSource,
    errors::ErrorRecord,
    errors::AllAttemptsFailed,
    errors::ConfigurationError,
    errors::Trend,
    errors::ErrorMonitor,
    model::Message,
    model::Usage,
    model::ResponseKind,
    model::ModelResponse,
    model::IntentLabel,
    model::Via,
    model::RoutingDecision,
    model::Response,
    config::EnvSettings,
    cache::DEFAULT_TTL_SECONDS,
    cache::CacheStats,
    cache::canonicalize_key,
    cache::fingerprint,
    client::ModelClient,
    remote_client::RemoteClient,
    local_client::LocalClient,
    intent::IntentClassifier,
    intent::Classification,
    intent::ClassificationTier,
    routing::RoutingTable,
    command_parser::CommandParser,
    command_parser::ParsedCommand,
    command_parser::ParserContext,
  };

  #[ cfg( feature = "retry" ) ]
  exposed use
  {
    retry::RetryConfig,
    retry::execute_with_retry,
    execution::ExecutionFlow,
  };

  #[ cfg( feature = "request_caching" ) ]
  exposed use
  {
    cache::ResponseCache,
  };

  #[ cfg( feature = "health_checks" ) ]
  exposed use
  {
    local_manager::LocalManager,
    local_manager::ServiceState,
    local_manager::ServiceResult,
    local_manager::MemoryStats,
  };

  #[ cfg( all( feature = "retry", feature = "health_checks" ) ) ]
  exposed use
  {
    orchestrator::Orchestrator,
  };
}
