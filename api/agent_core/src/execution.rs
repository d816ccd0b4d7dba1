//! Execution Flow (C7): the scheduler. Three entry points —
//! `execute_query`, `execute_with_fallbacks`, `multi_model_query` — all
//! built on top of the Response Cache (C1), the retry executor, and the
//! `ModelClient` trait (C2/C4). Grounded on the teacher's
//! `enhanced_retry.rs` for the fallback-chain shape and on
//! `original_source/utils/execution_flow.py` for the three-entry-point
//! split and the "cache the aggregate even with errors inside" rule for
//! multi-model fan-out.

#[ cfg( all( feature = "enabled", feature = "retry" ) ) ]
mod private
{
  use crate::client::ModelClient;
  use crate::config::EnvSettings;
  use crate::errors::{ AllAttemptsFailed, ErrorKind, ErrorRecord, ErrorSource, Severity };
  use crate::model::{ ModelResponse, ResponseKind, Usage };
  use crate::retry::{ execute_with_retry, AttemptOutcome, RetryConfig };
  use std::collections::HashMap;
  use std::sync::Arc;
  use std::time::{ SystemTime, UNIX_EPOCH };

  #[ cfg( feature = "request_caching" ) ]
  use crate::cache::ResponseCache;

  fn now_unix() -> u64
  {
    SystemTime::now().duration_since( UNIX_EPOCH ).map( | d | d.as_secs() ).unwrap_or( 0 )
  }

  /// Drives requests against the remote and local clients, applying
  /// caching, retry-with-fallback, and concurrent fan-out. One instance
  /// is constructed at startup and shared behind an `Arc`.
  pub struct ExecutionFlow
  {
    remote : Arc< dyn ModelClient >,
    local : Arc< dyn ModelClient >,
    #[ cfg( feature = "request_caching" ) ]
    cache : Option< Arc< ResponseCache > >,
    simulate : bool,
  }

  impl core::fmt::Debug for ExecutionFlow
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "ExecutionFlow" ).field( "simulate", &self.simulate ).finish_non_exhaustive()
    }
  }

  impl ExecutionFlow
  {
    /// Build a flow over the given clients. `simulate` mirrors
    /// `SIMULATE=1` (see [`EnvSettings`]) — when set, `execute_query`
    /// synthesizes a response instead of calling out, a test-only path
    /// that must still exist in production builds (§4.7).
    #[ cfg( feature = "request_caching" ) ]
    #[ must_use ]
    pub fn new( remote : Arc< dyn ModelClient >, local : Arc< dyn ModelClient >, cache : Option< Arc< ResponseCache > >, settings : &EnvSettings ) -> Self
    {
      Self { remote, local, cache, simulate : settings.simulate }
    }

    #[ cfg( not( feature = "request_caching" ) ) ]
    #[ must_use ]
    pub fn new( remote : Arc< dyn ModelClient >, local : Arc< dyn ModelClient >, settings : &EnvSettings ) -> Self
    {
      Self { remote, local, simulate : settings.simulate }
    }

    fn client_for( &self, alias : &str ) -> &Arc< dyn ModelClient >
    {
      if alias == "local" || alias == "phi"
      {
        &self.local
      }
      else
      {
        &self.remote
      }
    }

    #[ cfg( feature = "request_caching" ) ]
    fn cache_get( &self, key : &serde_json::Value ) -> Option< ModelResponse >
    {
      let cache = self.cache.as_ref()?;
      let bytes = cache.get( key )?;
      serde_json::from_slice( &bytes ).ok()
    }

    #[ cfg( not( feature = "request_caching" ) ) ]
    fn cache_get( &self, _key : &serde_json::Value ) -> Option< ModelResponse >
    {
      None
    }

    #[ cfg( feature = "request_caching" ) ]
    fn cache_put( &self, key : &serde_json::Value, response : &ModelResponse, ttl_seconds : Option< u32 > )
    {
      let Some( cache ) = self.cache.as_ref() else { return };
      let Ok( bytes ) = serde_json::to_vec( response ) else { return };
      match ttl_seconds
      {
        Some( ttl ) => cache.set( key, &bytes, ttl ),
        None => cache.set_default_ttl( key, &bytes ),
      }
    }

    #[ cfg( not( feature = "request_caching" ) ) ]
    fn cache_put( &self, _key : &serde_json::Value, _response : &ModelResponse, _ttl_seconds : Option< u32 > )
    {
    }

    fn simulated_response( prompt : &str, model : &str ) -> ModelResponse
    {
      ModelResponse::success( format!( "[simulated response to: {prompt}]" ), model, ResponseKind::Simulated, Usage::default(), 0 )
    }

    /// Single-model call with cache. Fingerprint → lookup → (SIMULATE
    /// short-circuit |> client call) → cache on success.
    pub async fn execute_query(
      &self,
      prompt : &str,
      model : &str,
      system_prompt : Option< &str >,
      temperature : f32,
      max_tokens : u32,
    ) -> ModelResponse
    {
      let key = serde_json::json!( { "kind" : "single", "prompt" : prompt, "model" : model, "system_prompt" : system_prompt, "temperature" : temperature, "max_tokens" : max_tokens } );

      if let Some( hit ) = self.cache_get( &key )
      {
        return hit;
      }

      if self.simulate
      {
        let response = Self::simulated_response( prompt, model );
        self.cache_put( &key, &response, None );
        return response;
      }

      let response = self.client_for( model ).generate( prompt, model, system_prompt, temperature, max_tokens ).await;
      if response.success
      {
        self.cache_put( &key, &response, None );
      }
      response
    }

    /// Generic fault-tolerant executor. Retries `primary` up to
    /// `config.max_attempts` with backoff+jitter (stopping early on a
    /// non-retryable failure), then tries each of `fallbacks` exactly
    /// once. On any success, caches (if `cache_key` is set) and returns.
    /// On total exhaustion, returns [`AllAttemptsFailed`] with the last
    /// primary error attached.
    pub async fn execute_with_fallbacks< P, PFut, F, FFut >(
      &self,
      mut primary : P,
      fallbacks : Vec< F >,
      config : RetryConfig,
      cache_key : Option< serde_json::Value >,
      cache_ttl : Option< u32 >,
    ) -> Result< ModelResponse, AllAttemptsFailed >
    where
      P : FnMut() -> PFut,
      PFut : core::future::Future< Output = ModelResponse >,
      F : Fn() -> FFut,
      FFut : core::future::Future< Output = ModelResponse >,
    {
      if let Some( key ) = &cache_key
      {
        if let Some( hit ) = self.cache_get( key )
        {
          return Ok( hit );
        }
      }

      let primary_result = execute_with_retry(
        move || async
        {
          let response = primary().await;
          match to_outcome( response, "execute_with_fallbacks:primary" )
          {
            Ok( ok ) => AttemptOutcome::Success( ok ),
            Err( err ) => AttemptOutcome::Failure( err ),
          }
        },
        config,
      )
      .await;

      let last_primary_error = match primary_result
      {
        Ok( response ) =>
        {
          if let Some( key ) = &cache_key
          {
            self.cache_put( key, &response, cache_ttl );
          }
          return Ok( response );
        }
        Err( err ) => err,
      };

      for fallback in &fallbacks
      {
        let response = fallback().await;
        if response.success
        {
          if let Some( key ) = &cache_key
          {
            self.cache_put( key, &response, cache_ttl );
          }
          return Ok( response );
        }
      }

      Err( AllAttemptsFailed { last_error : last_primary_error } )
    }

    /// Concurrent fan-out: one task per model, no short-circuit.
    /// Individual task failures (including a `JoinError` from a panicked
    /// or cancelled task) become error-shaped entries rather than being
    /// dropped, so the result always has exactly `models.len()` entries.
    /// The aggregate is cached even when it contains errors.
    pub async fn multi_model_query(
      &self,
      prompt : &str,
      models : &HashMap< String, String >,
      system_prompt : Option< &str >,
      temperature : f32,
      max_tokens : u32,
    ) -> HashMap< String, ModelResponse >
    {
      let key = serde_json::json!( { "kind" : "multi", "prompt" : prompt, "models" : models, "system_prompt" : system_prompt, "temperature" : temperature, "max_tokens" : max_tokens } );

      if let Some( hit ) = self.cache_multi_get( &key )
      {
        return hit;
      }

      let mut handles = Vec::with_capacity( models.len() );
      for ( alias, model_id ) in models
      {
        let client = Arc::clone( self.client_for( alias ) );
        let prompt = prompt.to_string();
        let system_prompt = system_prompt.map( str::to_string );
        let alias = alias.clone();
        let model_id = model_id.clone();
        let simulate = self.simulate;
        handles.push( tokio::spawn( async move
        {
          let response = if simulate
          {
            Self::simulated_response( &prompt, &model_id )
          }
          else
          {
            client.generate( &prompt, &model_id, system_prompt.as_deref(), temperature, max_tokens ).await
          };
          ( alias, response )
        } ) );
      }

      let mut results = HashMap::with_capacity( handles.len() );
      for ( handle, ( alias_for_join_failure, _model_id ) ) in handles.into_iter().zip( models.iter() )
      {
        match handle.await
        {
          Ok( ( alias, response ) ) =>
          {
            results.insert( alias, response );
          }
          Err( join_err ) =>
          {
            results.insert(
              alias_for_join_failure.clone(),
              ModelResponse::failure( alias_for_join_failure, ResponseKind::Remote, ErrorKind::UnknownError, join_err.to_string(), 0 ),
            );
          }
        }
      }

      self.cache_multi_put( &key, &results );
      results
    }

    #[ cfg( feature = "request_caching" ) ]
    fn cache_multi_get( &self, key : &serde_json::Value ) -> Option< HashMap< String, ModelResponse > >
    {
      let cache = self.cache.as_ref()?;
      let bytes = cache.get( key )?;
      serde_json::from_slice( &bytes ).ok()
    }

    #[ cfg( not( feature = "request_caching" ) ) ]
    fn cache_multi_get( &self, _key : &serde_json::Value ) -> Option< HashMap< String, ModelResponse > >
    {
      None
    }

    #[ cfg( feature = "request_caching" ) ]
    fn cache_multi_put( &self, key : &serde_json::Value, results : &HashMap< String, ModelResponse > )
    {
      let Some( cache ) = self.cache.as_ref() else { return };
      if let Ok( bytes ) = serde_json::to_vec( results )
      {
        cache.set_default_ttl( key, &bytes );
      }
    }

    #[ cfg( not( feature = "request_caching" ) ) ]
    fn cache_multi_put( &self, _key : &serde_json::Value, _results : &HashMap< String, ModelResponse > )
    {
    }
  }

  fn to_outcome( response : ModelResponse, operation : &str ) -> Result< ModelResponse, ErrorRecord >
  {
    if response.success
    {
      return Ok( response );
    }
    let kind = response.error.unwrap_or( ErrorKind::UnknownError );
    let message = response.error_detail.clone().unwrap_or_default();
    Err( ErrorRecord
    {
      id : crate::errors::make_error_id( ErrorSource::Remote, now_unix(), &message ),
      timestamp : now_unix(),
      source : ErrorSource::Remote,
      operation : operation.to_string(),
      kind,
      message,
      user_message : "The model service is temporarily unavailable.".to_string(),
      severity : Severity::Error,
      status_code : None,
      context : HashMap::from( [ ( "model".to_string(), response.model.clone() ) ] ),
    } )
  }
}

#[ cfg( all( feature = "enabled", feature = "retry" ) ) ]
crate::mod_interface!
{
  exposed use
  {
    ExecutionFlow,
  };
}
