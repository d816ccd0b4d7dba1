//! `ModelClient`: the single capability the Execution Flow depends on,
//! replacing the source's client-hierarchy inheritance with one trait and
//! two implementations (remote, local), per the "dynamic dispatch without
//! inheritance" design note.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use crate::model::{ Message, ModelResponse };

  /// Shared capability implemented by the remote aggregator client and the
  /// local model client. The Execution Flow accepts `&dyn ModelClient` so
  /// it never needs to know which backend it is driving.
  #[ async_trait::async_trait ]
  pub trait ModelClient : Send + Sync
  {
    /// Single-turn text generation.
    async fn generate( &self, prompt : &str, model : &str, system_prompt : Option< &str >, temperature : f32, max_tokens : u32 ) -> ModelResponse;

    /// Multi-turn chat completion.
    async fn chat( &self, model : &str, messages : &[ Message ], temperature : f32, max_tokens : u32 ) -> ModelResponse;

    /// Cheap liveness probe; `force` bypasses any cached result.
    async fn health( &self, force : bool ) -> bool;
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    ModelClient,
  };
}
