//! Response Cache (C1): key canonicalization/fingerprinting, TTL
//! expiry, and the in-memory fallback path.

#![ cfg( feature = "enabled" ) ]

use agent_core::{ canonicalize_key, fingerprint, DEFAULT_TTL_SECONDS };
use serde_json::json;

#[ test ]
fn string_keys_canonicalize_to_themselves()
{
  let key = json!( "hello world" );
  assert_eq!( canonicalize_key( &key ), "hello world" );
}

#[ test ]
fn object_keys_canonicalize_with_sorted_fields()
{
  let a = json!( { "b" : 2, "a" : 1 } );
  let b = json!( { "a" : 1, "b" : 2 } );
  assert_eq!( canonicalize_key( &a ), canonicalize_key( &b ) );
}

#[ test ]
fn fingerprint_is_deterministic_and_order_independent()
{
  let a = json!( { "model" : "phi3", "prompt" : "hi" } );
  let b = json!( { "prompt" : "hi", "model" : "phi3" } );
  assert_eq!( fingerprint( &a ), fingerprint( &b ) );
}

#[ test ]
fn fingerprint_differs_for_different_keys()
{
  let a = json!( { "prompt" : "hi" } );
  let b = json!( { "prompt" : "bye" } );
  assert_ne!( fingerprint( &a ), fingerprint( &b ) );
}

#[ test ]
fn default_ttl_is_one_hour()
{
  assert_eq!( DEFAULT_TTL_SECONDS, 3600 );
}

#[ cfg( feature = "request_caching" ) ]
#[ test ]
fn in_memory_cache_round_trips_a_value()
{
  use agent_core::ResponseCache;

  let cache = ResponseCache::in_memory();
  let key = json!( { "model" : "phi3", "prompt" : "ping" } );
  assert!( cache.get( &key ).is_none() );

  cache.set( &key, b"pong", DEFAULT_TTL_SECONDS );
  assert_eq!( cache.get( &key ), Some( b"pong".to_vec() ) );
}

#[ cfg( feature = "request_caching" ) ]
#[ test ]
fn in_memory_cache_expires_entries_past_ttl()
{
  use agent_core::ResponseCache;

  let cache = ResponseCache::in_memory();
  let key = json!( "expiring" );
  cache.set( &key, b"value", 0 );
  std::thread::sleep( std::time::Duration::from_millis( 1100 ) );
  assert!( cache.get( &key ).is_none() );
}

#[ cfg( feature = "request_caching" ) ]
#[ test ]
fn invalidate_removes_a_single_entry()
{
  use agent_core::ResponseCache;

  let cache = ResponseCache::in_memory();
  let key = json!( "to-remove" );
  cache.set( &key, b"value", DEFAULT_TTL_SECONDS );
  cache.invalidate( &key );
  assert!( cache.get( &key ).is_none() );
}

#[ cfg( feature = "request_caching" ) ]
#[ test ]
fn stats_reports_live_entry_count()
{
  use agent_core::ResponseCache;

  let cache = ResponseCache::in_memory();
  cache.set( &json!( "one" ), b"a", DEFAULT_TTL_SECONDS );
  cache.set( &json!( "two" ), b"bb", DEFAULT_TTL_SECONDS );
  let stats = cache.stats();
  assert_eq!( stats.entry_count, 2 );
  assert_eq!( stats.total_bytes, 3 );
}

#[ cfg( feature = "request_caching" ) ]
#[ test ]
fn persistent_backend_round_trips_a_value_across_reopen()
{
  use agent_core::ResponseCache;

  let dir = tempfile::tempdir().expect( "create temp dir" );
  let path = dir.path().join( "cache.duckdb" );
  let key = json!( { "model" : "phi3", "prompt" : "ping" } );

  {
    let cache = ResponseCache::open( &path );
    cache.set( &key, b"pong", DEFAULT_TTL_SECONDS );
  }

  let reopened = ResponseCache::open( &path );
  assert_eq!( reopened.get( &key ), Some( b"pong".to_vec() ) );
}
