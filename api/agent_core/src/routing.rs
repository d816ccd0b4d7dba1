//! Routing Table (C6): a static, process-wide, three-layer table mapping
//! intents to preferred models, named aliases to ordered fallback
//! chains, and display aliases to upstream provider model-ids. Pure —
//! no I/O happens inside this module; the alias map is only ever
//! *refreshed* by a caller that already holds a fetched model list.
//! Grounded on the alias-resolution and fallback-tier shape of
//! `other_examples/…claw-router…router.rs`'s `RouterState`, adapted from
//! a dynamic classifier-driven router to this spec's static table.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use crate::model::{ IntentLabel, RoutingDecision, Via };
  use std::collections::HashMap;
  use std::sync::RwLock;

  /// Names of the built-in fallback chains (§4.6.2).
  pub const CHAIN_PREMIUM : &str = "premium";
  pub const CHAIN_STANDARD : &str = "standard";
  pub const CHAIN_EFFICIENT : &str = "efficient";
  pub const CHAIN_CODE : &str = "code";

  fn default_intent_preferences() -> HashMap< IntentLabel, &'static str >
  {
    HashMap::from( [
      ( IntentLabel::Time, "local" ),
      ( IntentLabel::Code, "code-specialist" ),
      ( IntentLabel::Debug, "debug-specialist" ),
      ( IntentLabel::Troubleshoot, "debug-specialist" ),
      ( IntentLabel::Math, "reasoning-specialist" ),
      ( IntentLabel::Reasoning, "reasoning-specialist" ),
      ( IntentLabel::Github, "code-specialist" ),
      ( IntentLabel::Docs, "main_brain" ),
      ( IntentLabel::Explain, "main_brain" ),
      ( IntentLabel::Trends, "main_brain" ),
      ( IntentLabel::Content, "main_brain" ),
      ( IntentLabel::Technical, "main_brain" ),
      ( IntentLabel::Brainstorm, "main_brain" ),
      ( IntentLabel::Ethics, "main_brain" ),
      ( IntentLabel::Automate, "main_brain" ),
      ( IntentLabel::Visual, "main_brain" ),
      ( IntentLabel::AiQuery, "main_brain" ),
      ( IntentLabel::General, "main_brain" ),
    ] )
  }

  fn default_chains() -> HashMap< &'static str, Vec< &'static str > >
  {
    HashMap::from( [
      ( CHAIN_PREMIUM, vec![ "main_brain", "claude", "gpt" ] ),
      ( CHAIN_STANDARD, vec![ "main_brain", "gemini", "phi" ] ),
      ( CHAIN_EFFICIENT, vec![ "phi", "local" ] ),
      ( CHAIN_CODE, vec![ "code-specialist", "main_brain", "phi" ] ),
    ] )
  }

  fn default_alias_map() -> HashMap< String, String >
  {
    HashMap::from( [
      ( "main_brain".to_string(), "anthropic/claude-3-5-sonnet".to_string() ),
      ( "claude".to_string(), "anthropic/claude-3-5-sonnet".to_string() ),
      ( "gpt".to_string(), "openai/gpt-4o".to_string() ),
      ( "gemini".to_string(), "google/gemini-1.5-pro".to_string() ),
      ( "deepseek".to_string(), "deepseek/deepseek-chat".to_string() ),
      ( "code-specialist".to_string(), "anthropic/claude-3-5-sonnet".to_string() ),
      ( "debug-specialist".to_string(), "anthropic/claude-3-5-sonnet".to_string() ),
      ( "reasoning-specialist".to_string(), "openai/o1-mini".to_string() ),
      ( "phi".to_string(), "phi3".to_string() ),
      ( "local".to_string(), "phi3".to_string() ),
    ] )
  }

  struct Tables
  {
    intent_preferences : HashMap< IntentLabel, &'static str >,
    chains : HashMap< &'static str, Vec< &'static str > >,
    alias_to_model_id : HashMap< String, String >,
  }

  /// Holds the three routing layers behind a single lock, refreshed as a
  /// unit whenever the Remote Client's model list changes.
  #[ derive( Debug ) ]
  pub struct RoutingTable
  {
    tables : RwLock< Tables >,
  }

  impl core::fmt::Debug for Tables
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "Tables" ).field( "aliases", &self.alias_to_model_id.len() ).finish()
    }
  }

  impl Default for RoutingTable
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  impl RoutingTable
  {
    /// Builds the table from the static defaults in this module.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
      {
        tables : RwLock::new( Tables
        {
          intent_preferences : default_intent_preferences(),
          chains : default_chains(),
          alias_to_model_id : default_alias_map(),
        } ),
      }
    }

    /// Replaces the alias → provider-model-id layer from a freshly
    /// fetched model list (alias, provider-model-id), leaving the other
    /// two layers untouched. Falls back to the static default map if
    /// `fetched` is empty.
    pub fn refresh_aliases( &self, fetched : &HashMap< String, String > )
    {
      let mut guard = self.tables.write().expect( "routing table lock poisoned" );
      if fetched.is_empty()
      {
        guard.alias_to_model_id = default_alias_map();
      }
      else
      {
        guard.alias_to_model_id = fetched.clone();
      }
    }

    /// Resolves an alias to its upstream provider model-id, or passes the
    /// input through unchanged if it is already a provider id (no entry
    /// found), mirroring the router's "resolve direct tier name" path.
    #[ must_use ]
    pub fn resolve_alias( &self, alias : &str ) -> String
    {
      let guard = self.tables.read().expect( "routing table lock poisoned" );
      guard.alias_to_model_id.get( alias ).cloned().unwrap_or_else( || alias.to_string() )
    }

    /// Looks up a named fallback chain by name.
    #[ must_use ]
    pub fn chain( &self, name : &str ) -> Option< Vec< String > >
    {
      let guard = self.tables.read().expect( "routing table lock poisoned" );
      guard.chains.get( name ).map( | c | c.iter().map( | s | ( *s ).to_string() ).collect() )
    }

    /// The preferred alias for an intent, `general`'s online/offline split
    /// resolved by the caller-supplied `online` flag (`main_brain` online,
    /// `phi` offline).
    #[ must_use ]
    pub fn preferred_for_intent( &self, intent : IntentLabel, online : bool ) -> &'static str
    {
      if intent == IntentLabel::General && !online
      {
        return "phi";
      }
      let guard = self.tables.read().expect( "routing table lock poisoned" );
      guard.intent_preferences.get( &intent ).copied().unwrap_or( if online { "main_brain" } else { "phi" } )
    }

    /// Routes an intent to a full decision: primary alias plus the
    /// fallback chain members that follow it, with `via` set by whether
    /// the primary alias is the reserved `local` name. A non-empty
    /// `explicit_model` from a parsed `ask <model> …` command bypasses
    /// the intent→model layer entirely (§4.6's "single-line override").
    #[ must_use ]
    pub fn route( &self, intent : IntentLabel, online : bool, explicit_model : Option< &str > ) -> RoutingDecision
    {
      if let Some( model ) = explicit_model
      {
        return RoutingDecision { primary : model.to_string(), fallbacks : Vec::new(), via : self.via_for( model ) };
      }

      let primary = self.preferred_for_intent( intent, online );
      let fallbacks = self
      .chain( CHAIN_STANDARD )
      .unwrap_or_default()
      .into_iter()
      .filter( | alias | alias != primary )
      .collect();

      RoutingDecision { primary : primary.to_string(), fallbacks, via : self.via_for( primary ) }
    }

    /// Which backend an alias resolves to — `local`/`phi` run in-process
    /// against the local server, everything else goes to the remote
    /// aggregator.
    #[ must_use ]
    pub fn via_for( &self, alias : &str ) -> Via
    {
      if alias == "local" || alias == "phi"
      {
        Via::Local
      }
      else
      {
        Via::Remote
      }
    }
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    CHAIN_PREMIUM,
    CHAIN_STANDARD,
    CHAIN_EFFICIENT,
    CHAIN_CODE,
    RoutingTable,
  };
}
