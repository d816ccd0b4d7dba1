//! Error Taxonomy & Monitor (C8): message/status classification and
//! the bounded ring's aggregate counters.

#![ cfg( feature = "enabled" ) ]

use agent_core::{ ErrorKind, ErrorMonitor, ErrorRecord, ErrorSource, Severity, Trend };
use std::collections::HashMap;

fn record( kind : ErrorKind, timestamp : u64 ) -> ErrorRecord
{
  ErrorRecord
  {
    id : format!( "test_{timestamp}" ),
    timestamp,
    source : ErrorSource::Remote,
    operation : "generate".to_string(),
    kind,
    message : "synthetic".to_string(),
    user_message : "synthetic".to_string(),
    severity : Severity::Error,
    status_code : None,
    context : HashMap::new(),
  }
}

#[ test ]
fn status_code_classification_takes_priority()
{
  assert_eq!( ErrorKind::from_status_code( 429 ), Some( ErrorKind::RateLimit ) );
  assert_eq!( ErrorKind::from_status_code( 401 ), Some( ErrorKind::AuthError ) );
  assert_eq!( ErrorKind::from_status_code( 404 ), Some( ErrorKind::NotFound ) );
  assert_eq!( ErrorKind::from_status_code( 200 ), None );
}

#[ test ]
fn message_classification_matches_known_substrings()
{
  assert_eq!( ErrorKind::from_message( "Rate limit exceeded, try later" ), ErrorKind::RateLimit );
  assert_eq!( ErrorKind::from_message( "maximum context length exceeded" ), ErrorKind::ContextLengthExceeded );
  assert_eq!( ErrorKind::from_message( "safety filters triggered" ), ErrorKind::ContentPolicy );
  assert_eq!( ErrorKind::from_message( "invalid api key" ), ErrorKind::AuthError );
  assert_eq!( ErrorKind::from_message( "connection refused" ), ErrorKind::NetworkError );
  assert_eq!( ErrorKind::from_message( "something entirely unrelated" ), ErrorKind::UnknownError );
}

#[ test ]
fn only_network_ratelimit_and_server_errors_are_retryable()
{
  assert!( ErrorKind::NetworkError.is_retryable_kind() );
  assert!( ErrorKind::RateLimit.is_retryable_kind() );
  assert!( ErrorKind::ServerError.is_retryable_kind() );
  assert!( !ErrorKind::AuthError.is_retryable_kind() );
  assert!( !ErrorKind::InvalidInput.is_retryable_kind() );
}

#[ test ]
fn error_record_is_retryable_also_considers_status_code()
{
  let mut rec = record( ErrorKind::UnknownError, 0 );
  rec.status_code = Some( 503 );
  assert!( rec.is_retryable() );
}

#[ test ]
fn monitor_tracks_counts_by_kind_and_source()
{
  let mut monitor = ErrorMonitor::new( 100 );
  monitor.record( record( ErrorKind::NetworkError, 1 ), None );
  monitor.record( record( ErrorKind::NetworkError, 2 ), None );
  monitor.record( record( ErrorKind::RateLimit, 3 ), None );

  assert_eq!( monitor.len(), 3 );
  let by_kind = monitor.counts_by_kind();
  assert_eq!( by_kind.get( &ErrorKind::NetworkError ), Some( &2 ) );
  assert_eq!( by_kind.get( &ErrorKind::RateLimit ), Some( &1 ) );
}

#[ test ]
fn monitor_evicts_oldest_once_capacity_is_exceeded()
{
  let mut monitor = ErrorMonitor::new( 2 );
  monitor.record( record( ErrorKind::NetworkError, 1 ), None );
  monitor.record( record( ErrorKind::NetworkError, 2 ), None );
  monitor.record( record( ErrorKind::NetworkError, 3 ), None );
  assert_eq!( monitor.len(), 2 );
}

#[ test ]
fn analyze_trends_reports_increasing_when_the_second_half_has_more_errors()
{
  let mut monitor = ErrorMonitor::new( 100 );
  // Hour 0: one occurrence. Hour 1: one. Hour 2: one. Hour 3: three.
  // Midpoint of [0, 3] is hour 1, so the first half (hours 0-1) totals 2
  // and the second half (hours 2-3) totals 4.
  monitor.record( record( ErrorKind::NetworkError, 0 ), None );
  monitor.record( record( ErrorKind::NetworkError, 3600 ), None );
  monitor.record( record( ErrorKind::NetworkError, 7200 ), None );
  monitor.record( record( ErrorKind::NetworkError, 10800 ), None );
  monitor.record( record( ErrorKind::NetworkError, 10800 ), None );
  monitor.record( record( ErrorKind::NetworkError, 10800 ), None );
  assert_eq!( monitor.analyze_trends( ErrorSource::Remote, ErrorKind::NetworkError ), Trend::Increasing );
}

#[ test ]
fn analyze_trends_reports_decreasing_when_the_first_half_has_more_errors()
{
  let mut monitor = ErrorMonitor::new( 100 );
  monitor.record( record( ErrorKind::NetworkError, 0 ), None );
  monitor.record( record( ErrorKind::NetworkError, 0 ), None );
  monitor.record( record( ErrorKind::NetworkError, 0 ), None );
  monitor.record( record( ErrorKind::NetworkError, 3600 ), None );
  monitor.record( record( ErrorKind::NetworkError, 7200 ), None );
  monitor.record( record( ErrorKind::NetworkError, 10800 ), None );
  assert_eq!( monitor.analyze_trends( ErrorSource::Remote, ErrorKind::NetworkError ), Trend::Decreasing );
}

#[ test ]
fn analyze_trends_reports_stable_when_both_halves_are_even()
{
  let mut monitor = ErrorMonitor::new( 100 );
  monitor.record( record( ErrorKind::NetworkError, 0 ), None );
  monitor.record( record( ErrorKind::NetworkError, 3600 ), None );
  monitor.record( record( ErrorKind::NetworkError, 7200 ), None );
  monitor.record( record( ErrorKind::NetworkError, 10800 ), None );
  assert_eq!( monitor.analyze_trends( ErrorSource::Remote, ErrorKind::NetworkError ), Trend::Stable );
}

#[ test ]
fn analyze_trends_is_stable_for_an_unseen_pair_or_a_single_hour()
{
  let mut monitor = ErrorMonitor::new( 100 );
  assert_eq!( monitor.analyze_trends( ErrorSource::Remote, ErrorKind::NetworkError ), Trend::Stable );

  monitor.record( record( ErrorKind::NetworkError, 0 ), None );
  monitor.record( record( ErrorKind::NetworkError, 1 ), None );
  assert_eq!( monitor.analyze_trends( ErrorSource::Remote, ErrorKind::NetworkError ), Trend::Stable );
}

#[ test ]
fn export_then_import_round_trips_the_history()
{
  let mut monitor = ErrorMonitor::new( 10 );
  monitor.record( record( ErrorKind::ServerError, 5 ), None );
  let json = monitor.export_json().expect( "export should succeed" );

  let mut restored = ErrorMonitor::new( 10 );
  restored.import_json( &json ).expect( "import should succeed" );
  assert_eq!( restored.len(), 1 );
  assert_eq!( restored.counts_by_kind().get( &ErrorKind::ServerError ), Some( &1 ) );
}
