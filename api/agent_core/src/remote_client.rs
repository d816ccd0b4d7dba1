//! Remote Aggregator Client (C2): async HTTP client for a single upstream
//! that multiplexes many model identifiers. Grounded on the teacher's
//! `client.rs` (request shape, retry-wrapped call sites) and
//! `streaming/types.rs` (SSE parsing) plus `api_xai`'s `error.rs` for
//! status/exception-driven error classification.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use crate::client::ModelClient;
  use crate::errors::{ ErrorKind, ErrorRecord, ErrorSource, Severity };
  use crate::model::{ Message, ModelResponse, ResponseKind, Usage };
  use serde::{ Deserialize, Serialize };
  use std::collections::HashMap;
  use std::time::{ Duration, Instant };

  const DEFAULT_TOTAL_TIMEOUT_SECS : u64 = 60;
  const DEFAULT_CONNECT_TIMEOUT_SECS : u64 = 5;

  #[ derive( Debug, Serialize ) ]
  struct ChatCompletionRequest< 'a >
  {
    model : &'a str,
    messages : &'a [ Message ],
    temperature : f32,
    max_tokens : u32,
    #[ serde( skip_serializing_if = "Option::is_none" ) ]
    stream : Option< bool >,
  }

  #[ derive( Debug, Default, Deserialize ) ]
  struct UpstreamUsage
  {
    #[ serde( default ) ]
    prompt_tokens : u32,
    #[ serde( default ) ]
    completion_tokens : u32,
  }

  #[ derive( Debug, Deserialize ) ]
  struct ChoiceMessage
  {
    #[ serde( default ) ]
    content : String,
  }

  #[ derive( Debug, Deserialize ) ]
  struct Choice
  {
    message : ChoiceMessage,
  }

  #[ derive( Debug, Deserialize ) ]
  struct UpstreamError
  {
    message : String,
    #[ serde( default ) ]
    code : Option< String >,
    #[ serde( default ) ]
    #[ serde( rename = "type" ) ]
    error_type : Option< String >,
  }

  #[ derive( Debug, Deserialize ) ]
  struct ChatCompletionResponse
  {
    #[ serde( default ) ]
    choices : Vec< Choice >,
    #[ serde( default ) ]
    model : Option< String >,
    #[ serde( default ) ]
    usage : UpstreamUsage,
    #[ serde( default ) ]
    error : Option< UpstreamError >,
  }

  #[ derive( Debug, Deserialize ) ]
  struct ModelsListResponse
  {
    #[ serde( default ) ]
    data : Vec< ModelsListEntry >,
  }

  #[ derive( Debug, Deserialize ) ]
  struct ModelsListEntry
  {
    id : String,
  }

  /// Async HTTP client for the aggregator endpoint. Owns the `reqwest`
  /// connection pool and the bearer token; safe to share behind an `Arc`
  /// for concurrent issuance of independent requests.
  #[ derive( Debug, Clone ) ]
  pub struct RemoteClient
  {
    base_url : String,
    api_key : Option< String >,
    http : reqwest::Client,
  }

  impl RemoteClient
  {
    /// Build a client for `base_url` (e.g. `https://aggregator.example.com`)
    /// with the aggregator's default timeouts (60s total, 5s connect).
    ///
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be
    /// constructed (e.g. TLS backend initialization failure).
    pub fn new( base_url : impl Into< String >, api_key : Option< String > ) -> error_tools::untyped::Result< Self >
    {
      let http = reqwest::Client::builder()
      .timeout( Duration::from_secs( DEFAULT_TOTAL_TIMEOUT_SECS ) )
      .connect_timeout( Duration::from_secs( DEFAULT_CONNECT_TIMEOUT_SECS ) )
      .build()?;
      Ok( Self { base_url : base_url.into(), api_key, http } )
    }

    fn authorize( &self, builder : reqwest::RequestBuilder ) -> reqwest::RequestBuilder
    {
      match &self.api_key
      {
        Some( key ) => builder.bearer_auth( key ),
        None => builder,
      }
    }

    /// Non-streaming chat completion against `/chat/completions`.
    pub async fn chat_completion( &self, model : &str, messages : &[ Message ], temperature : f32, max_tokens : u32 ) -> ModelResponse
    {
      let started = Instant::now();
      let body = ChatCompletionRequest { model, messages, temperature, max_tokens, stream : Some( false ) };
      let url = format!( "{}/chat/completions", self.base_url );
      let request = self.authorize( self.http.post( &url ).json( &body ) );

      let response = match request.send().await
      {
        Ok( r ) => r,
        Err( e ) => return Self::transport_failure( model, &e, started.elapsed() ),
      };

      let status = response.status();
      let text = match response.text().await
      {
        Ok( t ) => t,
        Err( e ) => return Self::transport_failure( model, &e, started.elapsed() ),
      };

      Self::parse_completion_body( model, status.as_u16(), &text, started.elapsed() )
    }

    fn transport_failure( model : &str, error : &reqwest::Error, elapsed : Duration ) -> ModelResponse
    {
      let kind = if error.is_timeout()
      {
        ErrorKind::NetworkError
      }
      else if error.is_connect()
      {
        ErrorKind::NetworkError
      }
      else
      {
        error.status().and_then( | s | ErrorKind::from_status_code( s.as_u16() ) ).unwrap_or( ErrorKind::NetworkError )
      };
      #[ allow( clippy::cast_possible_truncation ) ]
      ModelResponse::failure( model, ResponseKind::Remote, kind, error.to_string(), elapsed.as_millis() as u32 )
    }

    fn parse_completion_body( model : &str, status : u16, text : &str, elapsed : Duration ) -> ModelResponse
    {
      #[ allow( clippy::cast_possible_truncation ) ]
      let elapsed_ms = elapsed.as_millis() as u32;

      // Non-200 is always a failure; try to pull a structured message out of
      // the body, falling back to the raw text.
      if status != 200
      {
        let detail = serde_json::from_str::< ChatCompletionResponse >( text )
        .ok()
        .and_then( | parsed | parsed.error )
        .map_or_else( || text.to_string(), | e | e.message );
        let kind = ErrorKind::from_status_code( status ).unwrap_or_else( || ErrorKind::from_message( &detail ) );
        return ModelResponse::failure( model, ResponseKind::Remote, kind, detail, elapsed_ms );
      }

      let parsed : ChatCompletionResponse = match serde_json::from_str( text )
      {
        Ok( p ) => p,
        Err( e ) => return ModelResponse::failure( model, ResponseKind::Remote, ErrorKind::UnknownError, e.to_string(), elapsed_ms ),
      };

      // HTTP 200 with an embedded error object is still a failure (§6).
      if let Some( error ) = parsed.error
      {
        let kind = ErrorKind::from_message( &error.message );
        let detail = match ( error.code, error.error_type )
        {
          ( Some( code ), Some( t ) ) => format!( "{} (code: {code}, type: {t})", error.message ),
          _ => error.message,
        };
        return ModelResponse::failure( model, ResponseKind::Remote, kind, detail, elapsed_ms );
      }

      let content = parsed.choices.first().map( | c | c.message.content.clone() ).unwrap_or_default();
      let used_model = parsed.model.unwrap_or_else( || model.to_string() );
      let usage = Usage::new( parsed.usage.prompt_tokens, parsed.usage.completion_tokens );
      ModelResponse::success( content, used_model, ResponseKind::Remote, usage, elapsed_ms )
    }

    /// Single-turn generation, implemented in terms of [`Self::chat_completion`]
    /// with a synthetic one-turn (optionally two-turn, with a system
    /// message) conversation.
    pub async fn generate( &self, prompt : &str, model : &str, system_prompt : Option< &str >, temperature : f32, max_tokens : u32 ) -> ModelResponse
    {
      let mut messages = Vec::new();
      if let Some( sys ) = system_prompt
      {
        messages.push( Message { role : "system".to_string(), content : sys.to_string() } );
      }
      messages.push( Message { role : "user".to_string(), content : prompt.to_string() } );
      self.chat_completion( model, &messages, temperature, max_tokens ).await
    }

    /// Best-effort list of model ids the upstream currently exposes. Used
    /// by the Routing Table to refresh its alias map on startup; missing
    /// data does not fail startup, so this returns an empty vec rather
    /// than propagating transport errors.
    pub async fn get_available_models( &self ) -> Vec< String >
    {
      let url = format!( "{}/models", self.base_url );
      let Ok( response ) = self.authorize( self.http.get( &url ) ).send().await else { return Vec::new() };
      let Ok( parsed ) = response.json::< ModelsListResponse >().await else { return Vec::new() };
      parsed.data.into_iter().map( | e | e.id ).collect()
    }

    /// Launch one concurrent task per `(alias, model_id)` pair, await all,
    /// and return a map keyed by alias. Individual failures, including a
    /// `JoinError` from a panicked or cancelled task, become error-shaped
    /// responses so the map always has exactly `models.len()` entries.
    pub async fn multi_model_query( &self, prompt : &str, models : &HashMap< String, String >, system_prompt : Option< &str >, temperature : f32, max_tokens : u32 ) -> HashMap< String, ModelResponse >
    {
      let mut aliases = Vec::with_capacity( models.len() );
      let mut handles = Vec::with_capacity( models.len() );
      for ( alias, model_id ) in models
      {
        let client = self.clone();
        let prompt = prompt.to_string();
        let system_prompt = system_prompt.map( str::to_string );
        let alias = alias.clone();
        let model_id = model_id.clone();
        aliases.push( alias.clone() );
        handles.push( tokio::spawn( async move
        {
          let response = client.generate( &prompt, &model_id, system_prompt.as_deref(), temperature, max_tokens ).await;
          ( alias, response )
        } ) );
      }

      let mut results = HashMap::with_capacity( handles.len() );
      for ( alias_for_join_failure, handle ) in aliases.into_iter().zip( handles )
      {
        match handle.await
        {
          Ok( ( alias, response ) ) => { results.insert( alias, response ); }
          Err( join_err ) =>
          {
            // A panicked/cancelled task becomes an error-shaped entry so
            // the map still has exactly one entry per requested model.
            results.insert(
              alias_for_join_failure.clone(),
              ModelResponse::failure( alias_for_join_failure, ResponseKind::Remote, ErrorKind::UnknownError, join_err.to_string(), 0 ),
            );
          }
        }
      }
      results
    }

    /// Build an [`ErrorRecord`] suitable for the Error Monitor from a
    /// failed [`ModelResponse`] (used by the Execution Flow, which owns
    /// the monitor).
    #[ must_use ]
    pub fn to_error_record( response : &ModelResponse, operation : &str ) -> Option< ErrorRecord >
    {
      if response.success
      {
        return None;
      }
      let kind = response.error.unwrap_or( ErrorKind::UnknownError );
      Some( ErrorRecord
      {
        id : String::new(),
        timestamp : 0,
        source : ErrorSource::Remote,
        operation : operation.to_string(),
        kind,
        message : response.error_detail.clone().unwrap_or_default(),
        user_message : "The remote model service is temporarily unavailable.".to_string(),
        severity : Severity::Error,
        status_code : None,
        context : HashMap::from( [ ( "model".to_string(), response.model.clone() ) ] ),
      } )
    }
  }

  #[ async_trait::async_trait ]
  impl ModelClient for RemoteClient
  {
    async fn generate( &self, prompt : &str, model : &str, system_prompt : Option< &str >, temperature : f32, max_tokens : u32 ) -> ModelResponse
    {
      RemoteClient::generate( self, prompt, model, system_prompt, temperature, max_tokens ).await
    }

    async fn chat( &self, model : &str, messages : &[ Message ], temperature : f32, max_tokens : u32 ) -> ModelResponse
    {
      self.chat_completion( model, messages, temperature, max_tokens ).await
    }

    async fn health( &self, _force : bool ) -> bool
    {
      self.http.get( format!( "{}/models", self.base_url ) ).send().await.is_ok_and( | r | r.status().is_success() )
    }
  }

  /// A single text delta parsed from an SSE `data:` line, prior to the
  /// `[DONE]` sentinel.
  #[ cfg( feature = "streaming" ) ]
  #[ derive( Debug, Clone ) ]
  pub struct StreamDelta
  {
    /// Incremental text content.
    pub text : String,
  }

  /// Parse one SSE payload (the text after a `data: ` prefix) into a
  /// delta, or `None` for the `[DONE]` sentinel or an unrecognized shape.
  /// Mirrors the teacher's `claude` crate's `parse_single_event` but
  /// flattened to this aggregator's simpler `{delta: {content}}` shape.
  #[ cfg( feature = "streaming" ) ]
  #[ must_use ]
  pub fn parse_stream_line( data : &str ) -> Option< StreamDelta >
  {
    if data.trim() == "[DONE]"
    {
      return None;
    }
    #[ derive( Deserialize ) ]
    struct Payload
    {
      #[ serde( default ) ]
      choices : Vec< PayloadChoice >,
    }
    #[ derive( Deserialize ) ]
    struct PayloadChoice
    {
      #[ serde( default ) ]
      delta : PayloadDelta,
    }
    #[ derive( Default, Deserialize ) ]
    struct PayloadDelta
    {
      #[ serde( default ) ]
      content : String,
    }
    let parsed : Payload = serde_json::from_str( data ).ok()?;
    let text = parsed.choices.into_iter().next()?.delta.content;
    Some( StreamDelta { text } )
  }

  /// Concatenate a sequence of already-parsed deltas into one string —
  /// the aggregation helper named in §4.2 (`process_stream`).
  #[ cfg( feature = "streaming" ) ]
  #[ must_use ]
  pub fn process_stream( deltas : &[ StreamDelta ] ) -> String
  {
    deltas.iter().map( | d | d.text.as_str() ).collect()
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    RemoteClient,
  };

  #[ cfg( feature = "streaming" ) ]
  exposed use
  {
    StreamDelta,
    parse_stream_line,
    process_stream,
  };
}
