//! Routing Table (C6) behavior: default preferences, alias resolution,
//! fallback chains, and the explicit-model override path.

#![ cfg( feature = "enabled" ) ]

use agent_core::{ IntentLabel, RoutingTable, Via };
use std::collections::HashMap;

#[ test ]
fn time_routes_to_local_regardless_of_online_state()
{
  let table = RoutingTable::new();
  let online = table.route( IntentLabel::Time, true, None );
  let offline = table.route( IntentLabel::Time, false, None );
  assert_eq!( online.via, Via::Local );
  assert_eq!( offline.via, Via::Local );
  assert_eq!( online.primary, "local" );
}

#[ test ]
fn general_intent_splits_on_online_state()
{
  let table = RoutingTable::new();
  let online = table.route( IntentLabel::General, true, None );
  let offline = table.route( IntentLabel::General, false, None );
  assert_eq!( online.primary, "main_brain" );
  assert_eq!( offline.primary, "phi" );
  assert_eq!( offline.via, Via::Local );
}

#[ test ]
fn code_intent_prefers_code_specialist()
{
  let table = RoutingTable::new();
  let decision = table.route( IntentLabel::Code, true, None );
  assert_eq!( decision.primary, "code-specialist" );
  assert_eq!( decision.via, Via::Remote );
}

#[ test ]
fn explicit_model_bypasses_intent_layer()
{
  let table = RoutingTable::new();
  let decision = table.route( IntentLabel::Code, true, Some( "phi" ) );
  assert_eq!( decision.primary, "phi" );
  assert!( decision.fallbacks.is_empty() );
  assert_eq!( decision.via, Via::Local );
}

#[ test ]
fn fallback_chain_never_repeats_the_primary()
{
  let table = RoutingTable::new();
  let decision = table.route( IntentLabel::AiQuery, true, None );
  assert!( !decision.fallbacks.contains( &decision.primary ) );
}

#[ test ]
fn resolve_alias_passes_through_unknown_aliases()
{
  let table = RoutingTable::new();
  assert_eq!( table.resolve_alias( "anthropic/claude-3-5-sonnet" ), "anthropic/claude-3-5-sonnet" );
  assert_eq!( table.resolve_alias( "main_brain" ), "anthropic/claude-3-5-sonnet" );
}

#[ test ]
fn refresh_aliases_falls_back_to_defaults_when_fetched_is_empty()
{
  let table = RoutingTable::new();
  table.refresh_aliases( &HashMap::new() );
  assert_eq!( table.resolve_alias( "main_brain" ), "anthropic/claude-3-5-sonnet" );
}

#[ test ]
fn refresh_aliases_replaces_the_alias_layer()
{
  let table = RoutingTable::new();
  let mut fetched = HashMap::new();
  fetched.insert( "main_brain".to_string(), "anthropic/claude-3-7-sonnet".to_string() );
  table.refresh_aliases( &fetched );
  assert_eq!( table.resolve_alias( "main_brain" ), "anthropic/claude-3-7-sonnet" );
  // Layer is fully replaced, not merged: an alias absent from `fetched`
  // no longer resolves to its old target.
  assert_eq!( table.resolve_alias( "gpt" ), "gpt" );
}
