//! Canonical error taxonomy and in-memory error monitor.
//!
//! Every boundary call in this crate returns either a success value or one
//! of the closed [`ErrorKind`] variants — never a raw transport exception.
//! The [`ErrorMonitor`] aggregates [`ErrorRecord`]s into a bounded ring for
//! post-mortem analysis and trend detection.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use error_tools::dependency::thiserror;
  use std::collections::HashMap;

  /// Canonical, closed set of error kinds crossing any component boundary.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize ) ]
  #[ serde( rename_all = "snake_case" ) ]
  pub enum ErrorKind
  {
    /// Connection refused, DNS failure, or other transport-level fault.
    NetworkError,
    /// Invalid or missing credentials.
    AuthError,
    /// Upstream signalled rate limiting (HTTP 429 or equivalent).
    RateLimit,
    /// Prompt plus history exceeded the model's context window.
    ContextLengthExceeded,
    /// Upstream refused the request on content-policy grounds.
    ContentPolicy,
    /// Upstream returned a 5xx-class failure.
    ServerError,
    /// Requested model or resource does not exist.
    NotFound,
    /// Caller supplied a malformed request.
    InvalidInput,
    /// Local setup/config problem (missing binary, bad path, ...).
    ConfigurationError,
    /// Anything that does not fit the above.
    UnknownError,
  }

  impl ErrorKind
  {
    /// True iff another attempt at the same call may succeed without
    /// operator intervention: `network_error`, `rate_limit`, `server_error`.
    #[ inline ]
    #[ must_use ]
    pub fn is_retryable_kind( self ) -> bool
    {
      matches!( self, ErrorKind::NetworkError | ErrorKind::RateLimit | ErrorKind::ServerError )
    }

    /// Classify a lowercased error message by substring, the fallback path
    /// used once exception type and status code have both failed to yield
    /// a kind. Mirrors the original keyword table (`"rate limit"`,
    /// `"context length"`, `"content policy"`, `"api key"`, ...).
    #[ must_use ]
    pub fn from_message( message : &str ) -> Self
    {
      let lower = message.to_lowercase();
      if lower.contains( "rate limit" ) || lower.contains( "too many requests" )
      {
        ErrorKind::RateLimit
      }
      else if lower.contains( "context length" ) || lower.contains( "context window" ) || lower.contains( "maximum context" )
      {
        ErrorKind::ContextLengthExceeded
      }
      else if lower.contains( "content policy" ) || lower.contains( "content filter" ) || lower.contains( "safety" )
      {
        ErrorKind::ContentPolicy
      }
      else if lower.contains( "api key" ) || lower.contains( "unauthorized" ) || lower.contains( "invalid credentials" )
      {
        ErrorKind::AuthError
      }
      else if lower.contains( "not found" ) || lower.contains( "404" )
      {
        ErrorKind::NotFound
      }
      else if lower.contains( "timeout" ) || lower.contains( "connection" ) || lower.contains( "network" ) || lower.contains( "dns" )
      {
        ErrorKind::NetworkError
      }
      else if lower.contains( "invalid" ) || lower.contains( "malformed" ) || lower.contains( "bad request" )
      {
        ErrorKind::InvalidInput
      }
      else
      {
        ErrorKind::UnknownError
      }
    }

    /// Classify by HTTP status code first, falling back to `None` so the
    /// caller can try message-substring classification next.
    #[ must_use ]
    pub fn from_status_code( status : u16 ) -> Option< Self >
    {
      match status
      {
        401 | 403 => Some( ErrorKind::AuthError ),
        404 => Some( ErrorKind::NotFound ),
        429 => Some( ErrorKind::RateLimit ),
        400 | 422 => Some( ErrorKind::InvalidInput ),
        500 | 502 | 503 | 504 => Some( ErrorKind::ServerError ),
        _ => None,
      }
    }
  }

  /// Severity of an [`ErrorRecord`], mirrors common structured-logging
  /// levels so entries can be forwarded to `tracing` directly.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum Severity
  {
    /// Diagnostic detail, not actionable on its own.
    Debug,
    /// Informational.
    Info,
    /// Worth operator attention but not an outage.
    Warning,
    /// A request failed.
    Error,
    /// Repeated/escalating failures worth paging on.
    Critical,
  }

  /// Where an error originated, used for monitor aggregation keys.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum ErrorSource
  {
    /// The remote aggregator client (C2).
    Remote,
    /// The local model client/manager (C3/C4).
    Local,
    /// The intent classifier (C5).
    Intent,
    /// The response cache (C1).
    Cache,
    /// Startup/configuration.
    Config,
    /// Raw transport/network layer shared by both clients.
    Network,
  }

  /// A single structured error crossing a component boundary. Every field
  /// is plain data — no exception objects are ever embedded, per the
  /// "plain-data-only cross-boundary errors" design decision recorded in
  /// `DESIGN.md`.
  #[ derive( Debug, Clone, serde::Serialize, serde::Deserialize ) ]
  pub struct ErrorRecord
  {
    /// `{source}_{unix_seconds}_{short_hash}`.
    pub id : String,
    /// Unix seconds at the time the record was created.
    pub timestamp : u64,
    /// Which subsystem raised this.
    pub source : ErrorSource,
    /// The operation being attempted (`"chat"`, `"generate"`, `"classify"`, ...).
    pub operation : String,
    /// The canonical kind.
    pub kind : ErrorKind,
    /// Raw diagnostic message — logged, never shown to the end user.
    pub message : String,
    /// User-facing message, safe to display.
    pub user_message : String,
    /// Operator severity.
    pub severity : Severity,
    /// HTTP status code, when the error came from a transport call.
    pub status_code : Option< u16 >,
    /// Extra scalar context (model id, attempt number, ...).
    pub context : HashMap< String, String >,
  }

  impl ErrorRecord
  {
    /// True iff this record's kind or status code indicates another
    /// attempt might succeed. See [`ErrorKind::is_retryable_kind`].
    #[ inline ]
    #[ must_use ]
    pub fn is_retryable( &self ) -> bool
    {
      self.kind.is_retryable_kind()
        || matches!( self.status_code, Some( 429 | 500 | 502 | 503 | 504 ) )
    }
  }

  /// Error raised by `execute_with_fallbacks` once the primary retries and
  /// every fallback have been exhausted.
  #[ derive( Debug, Clone, thiserror::Error ) ]
  #[ error( "all execution attempts failed: {last_error:?}" ) ]
  pub struct AllAttemptsFailed
  {
    /// The last primary-path error, attached for diagnostics.
    pub last_error : ErrorRecord,
  }

  /// Error raised only at startup when required configuration is absent
  /// or malformed. Never raised mid-request.
  #[ derive( Debug, Clone, thiserror::Error ) ]
  #[ error( "configuration error: {0}" ) ]
  pub struct ConfigurationError( pub String );

  /// Aggregate counters and recent-history view produced by
  /// [`ErrorMonitor::analyze_trends`].
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum Trend
  {
    /// Second half of the window has more errors than the first.
    Increasing,
    /// Second half has fewer.
    Decreasing,
    /// Roughly equal.
    Stable,
  }

  const MAX_ERROR_HISTORY : usize = 1000;
  const TREND_BUCKETS : usize = 24;

  /// Bounded in-memory aggregation of [`ErrorRecord`]s, with optional
  /// out-of-band notification for critical entries.
  #[ derive( Debug ) ]
  pub struct ErrorMonitor
  {
    capacity : usize,
    records : std::collections::VecDeque< ErrorRecord >,
    counts_by_source : HashMap< ErrorSource, u64 >,
    counts_by_kind : HashMap< ErrorKind, u64 >,
    counts_by_severity : HashMap< Severity, u64 >,
    /// Per-hour bucket key (`"source:kind"`) → ordered list of hour labels,
    /// trimmed to the last [`TREND_BUCKETS`] entries.
    trends : HashMap< String, Vec< u64 > >,
  }

  impl Default for ErrorMonitor
  {
    fn default() -> Self
    {
      Self::new( MAX_ERROR_HISTORY )
    }
  }

  impl ErrorMonitor
  {
    /// Create a monitor with a custom ring capacity.
    #[ inline ]
    #[ must_use ]
    pub fn new( capacity : usize ) -> Self
    {
      Self
      {
        capacity,
        records : std::collections::VecDeque::with_capacity( capacity ),
        counts_by_source : HashMap::new(),
        counts_by_kind : HashMap::new(),
        counts_by_severity : HashMap::new(),
        trends : HashMap::new(),
      }
    }

    /// Record an error, updating all aggregates in place, and optionally
    /// invoke a notification hook for `critical` entries (the hook
    /// interface is in scope; actual transports are not).
    pub fn record( &mut self, record : ErrorRecord, notify : Option< &dyn Fn( &ErrorRecord ) > )
    {
      *self.counts_by_source.entry( record.source ).or_insert( 0 ) += 1;
      *self.counts_by_kind.entry( record.kind ).or_insert( 0 ) += 1;
      *self.counts_by_severity.entry( record.severity ).or_insert( 0 ) += 1;

      let hour_bucket = record.timestamp / 3600;
      let trend_key = format!( "{:?}:{:?}", record.source, record.kind );
      let bucket = self.trends.entry( trend_key ).or_default();
      bucket.push( hour_bucket );
      if bucket.len() > TREND_BUCKETS
      {
        let overflow = bucket.len() - TREND_BUCKETS;
        bucket.drain( 0..overflow );
      }

      if record.severity == Severity::Critical
      {
        if let Some( hook ) = notify
        {
          hook( &record );
        }
      }

      self.records.push_back( record );
      if self.records.len() > self.capacity
      {
        self.records.pop_front();
      }
    }

    /// Total recorded errors currently retained in the ring.
    #[ inline ]
    #[ must_use ]
    pub fn len( &self ) -> usize
    {
      self.records.len()
    }

    /// True iff no errors have been recorded.
    #[ inline ]
    #[ must_use ]
    pub fn is_empty( &self ) -> bool
    {
      self.records.is_empty()
    }

    /// Count by source, snapshot.
    #[ must_use ]
    pub fn counts_by_source( &self ) -> HashMap< ErrorSource, u64 >
    {
      self.counts_by_source.clone()
    }

    /// Count by kind, snapshot.
    #[ must_use ]
    pub fn counts_by_kind( &self ) -> HashMap< ErrorKind, u64 >
    {
      self.counts_by_kind.clone()
    }

    /// The ten most frequent `(source, kind)` pairs, descending.
    #[ must_use ]
    pub fn top_errors( &self, limit : usize ) -> Vec< ( String, u64 ) >
    {
      let mut counts : HashMap< String, u64 > = HashMap::new();
      for record in &self.records
      {
        let key = format!( "{:?}:{:?}", record.source, record.kind );
        *counts.entry( key ).or_insert( 0 ) += 1;
      }
      let mut pairs : Vec< ( String, u64 ) > = counts.into_iter().collect();
      pairs.sort_by( | a, b | b.1.cmp( &a.1 ) );
      pairs.truncate( limit );
      pairs
    }

    /// Split a `(source, kind)` pair's retained hourly histogram at the
    /// midpoint of its observed time range, sum the occurrence counts
    /// falling in each half, and classify the trend from those sums —
    /// not from an index-based split of the occurrence list, which would
    /// always yield two near-equal halves regardless of the actual
    /// distribution over time.
    #[ must_use ]
    pub fn analyze_trends( &self, source : ErrorSource, kind : ErrorKind ) -> Trend
    {
      let key = format!( "{source:?}:{kind:?}" );
      let Some( bucket ) = self.trends.get( &key ) else { return Trend::Stable };
      if bucket.len() < 2
      {
        return Trend::Stable;
      }
      let min_hour = *bucket.iter().min().expect( "non-empty bucket" );
      let max_hour = *bucket.iter().max().expect( "non-empty bucket" );
      if min_hour == max_hour
      {
        return Trend::Stable;
      }
      let midpoint = min_hour + ( max_hour - min_hour ) / 2;
      let first_half = bucket.iter().filter( | hour | **hour <= midpoint ).count();
      let second_half = bucket.iter().filter( | hour | **hour > midpoint ).count();
      if second_half > first_half
      {
        Trend::Increasing
      }
      else if second_half < first_half
      {
        Trend::Decreasing
      }
      else
      {
        Trend::Stable
      }
    }

    /// Serialize all retained records to a JSON array for post-mortem
    /// export.
    ///
    /// # Errors
    /// Returns an error if serialization fails (never expected for plain
    /// data records).
    pub fn export_json( &self ) -> error_tools::untyped::Result< String >
    {
      let records : Vec< &ErrorRecord > = self.records.iter().collect();
      Ok( serde_json::to_string_pretty( &records )? )
    }

    /// Replace the retained history with records parsed from a prior
    /// [`Self::export_json`] call. Aggregates are rebuilt from scratch.
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed as a record array.
    pub fn import_json( &mut self, json : &str ) -> error_tools::untyped::Result< () >
    {
      let records : Vec< ErrorRecord > = serde_json::from_str( json )?;
      let capacity = self.capacity;
      *self = Self::new( capacity );
      for record in records
      {
        self.record( record, None );
      }
      Ok( () )
    }

  }

  /// Build an error id of the form `{source}_{unix_seconds}_{short_hash}`.
  #[ must_use ]
  pub fn make_error_id( source : ErrorSource, timestamp : u64, message : &str ) -> String
  {
    use core::hash::{ Hash, Hasher };
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    message.hash( &mut hasher );
    let short_hash = hasher.finish() % 10_000;
    format!( "{source:?}_{timestamp}_{short_hash}" ).to_lowercase()
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    ErrorKind,
    Severity,
    ErrorSource,
    ErrorRecord,
    AllAttemptsFailed,
    ConfigurationError,
    Trend,
    ErrorMonitor,
    make_error_id,
  };
}
