//! Local Model Client (C4): async HTTP client to the local model server,
//! with cached health state and CPU-only fallback on constrained hosts.
//! Grounded on the teacher's `client.rs` (`is_available`/`generate`
//! request shapes) and `generate.rs` (`prompt_eval_count`/`eval_count`
//! usage fields), cross-checked against
//! `original_source/utils/ollama_manager.py`'s `OllamaClient`.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use crate::client::ModelClient;
  use crate::model::{ Message, ModelResponse, ResponseKind, Usage };
  use crate::errors::ErrorKind;
  use serde::{ Deserialize, Serialize };
  use std::sync::Mutex;
  use std::time::{ Duration, Instant };

  const DEFAULT_TOTAL_TIMEOUT_SECS : u64 = 30;
  const DEFAULT_CONNECT_TIMEOUT_SECS : u64 = 5;
  const HEALTH_CACHE_SECS : u64 = 30;
  /// Hosts with less free memory than this append a CPU-only option to
  /// generation requests (§4.3).
  const LOW_MEMORY_THRESHOLD_GIB : f64 = 6.0;

  #[ derive( Debug, Serialize ) ]
  struct GenerateRequest< 'a >
  {
    model : &'a str,
    prompt : &'a str,
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    system : Option< &'a str >,
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    options : Option< serde_json::Value >,
    stream : bool,
  }

  #[ derive( Debug, Default, Deserialize ) ]
  struct GenerateResponse
  {
    #[ serde( default ) ]
    response : String,
    #[ serde( default ) ]
    prompt_eval_count : u32,
    #[ serde( default ) ]
    eval_count : u32,
  }

  #[ derive( Debug, Deserialize ) ]
  struct TagsResponse
  {
    #[ serde( default ) ]
    models : Vec< TagsModel >,
  }

  #[ derive( Debug, Deserialize ) ]
  struct TagsModel
  {
    name : String,
  }

  /// `"num_gpu": 0` below [`LOW_MEMORY_THRESHOLD_GIB`] free, `None`
  /// otherwise (including when the memory reading is unavailable).
  #[ must_use ]
  pub fn cpu_only_options( free_memory_gib : Option< f64 > ) -> Option< serde_json::Value >
  {
    free_memory_gib.is_some_and( | gib | gib < LOW_MEMORY_THRESHOLD_GIB ).then( || serde_json::json!( { "num_gpu" : 0 } ) )
  }

  struct HealthCache
  {
    last_checked : Option< Instant >,
    last_result : bool,
  }

  /// Async HTTP client for the local model server's loopback API.
  #[ derive( Debug ) ]
  pub struct LocalClient
  {
    base_url : String,
    http : reqwest::Client,
    health_cache : Mutex< HealthCache >,
  }

  impl LocalClient
  {
    /// Build a client for the local server, default `http://localhost:11434`.
    ///
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new( base_url : impl Into< String > ) -> error_tools::untyped::Result< Self >
    {
      let http = reqwest::Client::builder()
      .timeout( Duration::from_secs( DEFAULT_TOTAL_TIMEOUT_SECS ) )
      .connect_timeout( Duration::from_secs( DEFAULT_CONNECT_TIMEOUT_SECS ) )
      .build()?;
      Ok( Self { base_url : base_url.into(), http, health_cache : Mutex::new( HealthCache { last_checked : None, last_result : false } ) } )
    }

    /// Single-turn generation against `POST /api/generate`. When
    /// `free_memory_gib` is below [`LOW_MEMORY_THRESHOLD_GIB`], a
    /// `"num_gpu": 0` option is appended to force CPU-only inference.
    pub async fn generate_with_memory( &self, prompt : &str, model : &str, system_prompt : Option< &str >, free_memory_gib : Option< f64 > ) -> ModelResponse
    {
      let started = Instant::now();
      let options = cpu_only_options( free_memory_gib );
      let body = GenerateRequest { model, prompt, system : system_prompt, options, stream : false };

      let url = format!( "{}/api/generate", self.base_url );
      let response = match self.http.post( &url ).json( &body ).send().await
      {
        Ok( r ) => r,
        Err( e ) =>
        {
          #[ allow( clippy::cast_possible_truncation ) ]
          return ModelResponse::failure( model, ResponseKind::Local, ErrorKind::NetworkError, e.to_string(), started.elapsed().as_millis() as u32 );
        }
      };

      let status = response.status();
      #[ allow( clippy::cast_possible_truncation ) ]
      let elapsed_ms = started.elapsed().as_millis() as u32;
      if !status.is_success()
      {
        let kind = ErrorKind::from_status_code( status.as_u16() ).unwrap_or( ErrorKind::ServerError );
        let detail = response.text().await.unwrap_or_default();
        return ModelResponse::failure( model, ResponseKind::Local, kind, detail, elapsed_ms );
      }

      match response.json::< GenerateResponse >().await
      {
        Ok( parsed ) =>
        {
          let usage = Usage::new( parsed.prompt_eval_count, parsed.eval_count );
          ModelResponse::success( parsed.response, model, ResponseKind::Local, usage, elapsed_ms )
        }
        Err( e ) => ModelResponse::failure( model, ResponseKind::Local, ErrorKind::UnknownError, e.to_string(), elapsed_ms ),
      }
    }

    /// Current free memory, used to gate the CPU-only fallback. Reads
    /// live system memory when service health-probing is compiled in;
    /// without it there is no memory source to consult, so the gate
    /// never fires.
    #[ cfg( feature = "health_checks" ) ]
    fn current_free_memory_gib( &self ) -> Option< f64 >
    {
      Some( crate::local_manager::system_memory().free_gib )
    }

    #[ cfg( not( feature = "health_checks" ) ) ]
    fn current_free_memory_gib( &self ) -> Option< f64 >
    {
      None
    }

    /// `GET /api/tags`, returning model names or an empty list on any
    /// failure (logged and swallowed, matching the original's behavior).
    pub async fn refresh_models( &self ) -> Vec< String >
    {
      let url = format!( "{}/api/tags", self.base_url );
      let Ok( response ) = self.http.get( &url ).send().await else { return Vec::new() };
      if !response.status().is_success()
      {
        return Vec::new();
      }
      let Ok( parsed ) = response.json::< TagsResponse >().await else { return Vec::new() };
      parsed.models.into_iter().map( | m | m.name ).collect()
    }

    /// `GET /api/version` health probe, cached for [`HEALTH_CACHE_SECS`].
    /// When `offline_mode` is `false` and `force` is `false`, returns
    /// `false` immediately without any network I/O — waking a dormant
    /// local server while the system is online is undesirable (§4.3/§4.4).
    pub async fn check_health( &self, force : bool, offline_mode : bool ) -> bool
    {
      if !offline_mode && !force
      {
        return false;
      }

      if !force
      {
        if let Ok( cache ) = self.health_cache.lock()
        {
          if let Some( last ) = cache.last_checked
          {
            if last.elapsed() < Duration::from_secs( HEALTH_CACHE_SECS )
            {
              return cache.last_result;
            }
          }
        }
      }

      let url = format!( "{}/api/version", self.base_url );
      let healthy = self.http.get( &url ).send().await.is_ok_and( | r | r.status().is_success() );

      if let Ok( mut cache ) = self.health_cache.lock()
      {
        cache.last_checked = Some( Instant::now() );
        cache.last_result = healthy;
      }
      healthy
    }
  }

  #[ async_trait::async_trait ]
  impl ModelClient for LocalClient
  {
    async fn generate( &self, prompt : &str, model : &str, system_prompt : Option< &str >, _temperature : f32, _max_tokens : u32 ) -> ModelResponse
    {
      self.generate_with_memory( prompt, model, system_prompt, self.current_free_memory_gib() ).await
    }

    async fn chat( &self, model : &str, messages : &[ Message ], temperature : f32, max_tokens : u32 ) -> ModelResponse
    {
      // The local server's chat surface is generate-with-history: fold the
      // transcript into a single prompt, keeping the last system message.
      let system_prompt = messages.iter().rev().find( | m | m.role == "system" ).map( | m | m.content.as_str() );
      let prompt = messages
      .iter()
      .filter( | m | m.role != "system" )
      .map( | m | format!( "{}: {}", m.role, m.content ) )
      .collect::< Vec< _ > >()
      .join( "\n" );
      let _ = ( temperature, max_tokens );
      self.generate_with_memory( &prompt, model, system_prompt, self.current_free_memory_gib() ).await
    }

    async fn health( &self, force : bool ) -> bool
    {
      self.check_health( force, true ).await
    }
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    LocalClient,
    cpu_only_options,
  };
}
