//! Retry-with-backoff (shared by C2 and C7): attempt counting, the
//! stop-on-non-retryable-error short circuit, and the jitter envelope.

#![ cfg( all( feature = "enabled", feature = "retry" ) ) ]

use agent_core::{ AttemptOutcome, ErrorKind, ErrorRecord, ErrorSource, RetryConfig, Severity };
use std::collections::HashMap;
use std::sync::atomic::{ AtomicU32, Ordering };
use std::sync::Arc;

fn retryable_error() -> ErrorRecord
{
  ErrorRecord
  {
    id : "test".to_string(),
    timestamp : 0,
    source : ErrorSource::Remote,
    operation : "generate".to_string(),
    kind : ErrorKind::ServerError,
    message : "upstream 503".to_string(),
    user_message : "temporarily unavailable".to_string(),
    severity : Severity::Error,
    status_code : Some( 503 ),
    context : HashMap::new(),
  }
}

fn non_retryable_error() -> ErrorRecord
{
  ErrorRecord
  {
    id : "test".to_string(),
    timestamp : 0,
    source : ErrorSource::Remote,
    operation : "generate".to_string(),
    kind : ErrorKind::AuthError,
    message : "bad api key".to_string(),
    user_message : "authentication failed".to_string(),
    severity : Severity::Error,
    status_code : Some( 401 ),
    context : HashMap::new(),
  }
}

#[ tokio::test ]
async fn succeeds_without_retrying_when_the_first_attempt_succeeds()
{
  let attempts = Arc::new( AtomicU32::new( 0 ) );
  let counter = Arc::clone( &attempts );
  let result = agent_core::execute_with_retry(
    move ||
    {
      let counter = Arc::clone( &counter );
      async move
      {
        counter.fetch_add( 1, Ordering::SeqCst );
        AttemptOutcome::Success( 42 )
      }
    },
    RetryConfig { max_attempts : 3, base_delay_ms : 1, backoff_multiplier : 2.0 },
  )
  .await;

  assert_eq!( result.unwrap(), 42 );
  assert_eq!( attempts.load( Ordering::SeqCst ), 1 );
}

#[ tokio::test ]
async fn retries_up_to_max_attempts_on_retryable_failures()
{
  let attempts = Arc::new( AtomicU32::new( 0 ) );
  let counter = Arc::clone( &attempts );
  let result : Result< (), ErrorRecord > = agent_core::execute_with_retry(
    move ||
    {
      let counter = Arc::clone( &counter );
      async move
      {
        counter.fetch_add( 1, Ordering::SeqCst );
        AttemptOutcome::Failure( retryable_error() )
      }
    },
    RetryConfig { max_attempts : 3, base_delay_ms : 1, backoff_multiplier : 2.0 },
  )
  .await;

  assert!( result.is_err() );
  assert_eq!( attempts.load( Ordering::SeqCst ), 3 );
}

#[ tokio::test ]
async fn stops_immediately_on_a_non_retryable_failure()
{
  let attempts = Arc::new( AtomicU32::new( 0 ) );
  let counter = Arc::clone( &attempts );
  let result : Result< (), ErrorRecord > = agent_core::execute_with_retry(
    move ||
    {
      let counter = Arc::clone( &counter );
      async move
      {
        counter.fetch_add( 1, Ordering::SeqCst );
        AttemptOutcome::Failure( non_retryable_error() )
      }
    },
    RetryConfig { max_attempts : 5, base_delay_ms : 1, backoff_multiplier : 2.0 },
  )
  .await;

  assert!( result.is_err() );
  assert_eq!( attempts.load( Ordering::SeqCst ), 1 );
}

#[ test ]
fn delay_grows_by_the_backoff_multiplier_within_the_jitter_envelope()
{
  let config = RetryConfig { max_attempts : 5, base_delay_ms : 1000, backoff_multiplier : 2.0 };
  let first = config.delay_for_attempt( 0 ).as_millis();
  let second = config.delay_for_attempt( 1 ).as_millis();
  // attempt 0 delay is base*2^0 in [0.8, 1.2] -> [800, 1200]
  assert!( ( 800..=1200 ).contains( &first ), "first delay {first} out of envelope" );
  // attempt 1 delay is base*2^1 in [0.8, 1.2] -> [1600, 2400]
  assert!( ( 1600..=2400 ).contains( &second ), "second delay {second} out of envelope" );
}
