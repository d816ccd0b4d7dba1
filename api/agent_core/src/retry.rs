//! Exponential-backoff-with-jitter retry, shared by the Remote Aggregator
//! Client's fixed per-call policy (C2) and the Execution Flow's
//! caller-configurable executor (C7). Grounded on the teacher's
//! `enhanced_retry.rs` for the backoff/jitter shape, and on
//! `original_source/utils/execution_flow.py`'s `retry_async` for the
//! confirmation that jitter is multiplicative in `[0.8, 1.2]`, not
//! additive.

#[ cfg( feature = "retry" ) ]
mod private
{
  use crate::errors::ErrorRecord;

  /// Backoff parameters for a retry loop. `max_attempts` is inclusive of
  /// the first attempt — the design note fixes the original's
  /// occasional double-counting of attempt one.
  #[ derive( Debug, Clone, Copy ) ]
  pub struct RetryConfig
  {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts : u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms : u64,
    /// Multiplier applied to the delay after every failed attempt.
    pub backoff_multiplier : f64,
  }

  impl Default for RetryConfig
  {
    fn default() -> Self
    {
      Self { max_attempts : 3, base_delay_ms : 1000, backoff_multiplier : 2.0 }
    }
  }

  impl RetryConfig
  {
    /// Delay before the attempt numbered `attempt` (0-based, so `attempt =
    /// 0` is the delay before the *second* try), with a uniform
    /// multiplicative jitter in `[0.8, 1.2]`.
    #[ must_use ]
    pub fn delay_for_attempt( &self, attempt : u32 ) -> std::time::Duration
    {
      #[ allow( clippy::cast_precision_loss ) ]
      let base = self.base_delay_ms as f64 * self.backoff_multiplier.powi( i32::try_from( attempt ).unwrap_or( i32::MAX ) );
      let jitter = 0.8 + fastrand::f64() * 0.4;
      #[ allow( clippy::cast_possible_truncation, clippy::cast_sign_loss ) ]
      std::time::Duration::from_millis( ( base * jitter ).round() as u64 )
    }
  }

  /// Result of a single attempt, used internally by [`execute_with_retry`]
  /// to decide whether to continue.
  pub enum AttemptOutcome< T >
  {
    /// The attempt succeeded.
    Success( T ),
    /// The attempt failed with a classified error; retry iff `retryable`.
    Failure( ErrorRecord ),
  }

  /// Run `operation` up to `config.max_attempts` times. Stops immediately
  /// on the first non-retryable failure (per `ErrorRecord::is_retryable`)
  /// without spending further attempts. Returns the last failure if every
  /// attempt is exhausted or a non-retryable error is hit.
  pub async fn execute_with_retry< F, Fut, T >( mut operation : F, config : RetryConfig ) -> Result< T, ErrorRecord >
  where
    F : FnMut() -> Fut,
    Fut : core::future::Future< Output = AttemptOutcome< T > >,
  {
    let mut last_error : Option< ErrorRecord > = None;
    for attempt in 0..config.max_attempts.max( 1 )
    {
      match operation().await
      {
        AttemptOutcome::Success( value ) => return Ok( value ),
        AttemptOutcome::Failure( err ) =>
        {
          let retryable = err.is_retryable();
          let is_last = attempt + 1 >= config.max_attempts;
          last_error = Some( err );
          if !retryable || is_last
          {
            break;
          }
          #[ cfg( feature = "structured_logging" ) ]
          tracing::warn!( attempt = attempt + 1, max_attempts = config.max_attempts, "retrying after retryable error" );
          tokio::time::sleep( config.delay_for_attempt( attempt ) ).await;
        }
      }
    }
    Err( last_error.expect( "at least one attempt is always made" ) )
  }
}

#[ cfg( feature = "retry" ) ]
crate::mod_interface!
{
  exposed use
  {
    RetryConfig,
    AttemptOutcome,
    execute_with_retry,
  };
}
