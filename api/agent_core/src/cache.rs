//! Response Cache (C1): a persistent, content-addressed key/value store
//! with per-entry TTL, falling back silently to an in-memory map if the
//! backing database cannot be opened.
//!
//! Grounded on `DSado88-squall`'s `src/memory/global.rs` for the
//! single-file embedded-database pattern (there: duckdb + Parquet; here:
//! duckdb's native table storage, since this cache has no analytical
//! workload to justify Parquet) and on the `other_examples` response-cache
//! (`nearai-ironclaw`) for the hash-keyed LRU-shaped entry API the
//! Execution Flow expects.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use sha2::{ Digest, Sha256 };
  use serde_json::Value;

  /// Default TTL applied when a caller does not specify one, fixing the
  /// ambiguity the original mixed call sites left implicit.
  pub const DEFAULT_TTL_SECONDS : u32 = 3600;

  /// Aggregate counters returned by [`ResponseCache::stats`].
  #[ derive( Debug, Clone, Copy, Default ) ]
  pub struct CacheStats
  {
    /// Number of live (non-expired) entries at the time of the call.
    pub entry_count : u64,
    /// Total serialized payload bytes across all live entries.
    pub total_bytes : u64,
  }

  /// Serialize a cache key to its canonical hash input: strings are hashed
  /// as-is; anything else is serialized to JSON with object keys sorted,
  /// matching the original's `json.dumps(..., sort_keys=True)` behavior.
  #[ must_use ]
  pub fn canonicalize_key( key : &Value ) -> String
  {
    if let Value::String( s ) = key
    {
      return s.clone();
    }
    canonical_json( key )
  }

  fn canonical_json( value : &Value ) -> String
  {
    match value
    {
      Value::Object( map ) =>
      {
        let mut entries : Vec< ( &String, &Value ) > = map.iter().collect();
        entries.sort_by( | a, b | a.0.cmp( b.0 ) );
        let body = entries
        .iter()
        .map( | ( k, v ) | format!( "{}:{}", serde_json::to_string( k ).unwrap_or_default(), canonical_json( v ) ) )
        .collect::< Vec< _ > >()
        .join( "," );
        format!( "{{{body}}}" )
      }
      Value::Array( items ) =>
      {
        let body = items.iter().map( canonical_json ).collect::< Vec< _ > >().join( "," );
        format!( "[{body}]" )
      }
      other => other.to_string(),
    }
  }

  /// SHA-256 of the canonical form, hex-encoded — the cache's primary key.
  #[ must_use ]
  pub fn fingerprint( key : &Value ) -> String
  {
    let canonical = canonicalize_key( key );
    let digest = Sha256::digest( canonical.as_bytes() );
    hex::encode( digest )
  }

  #[ cfg( feature = "request_caching" ) ]
  mod persistent
  {
    use super::{ CacheStats, DEFAULT_TTL_SECONDS };
    use sha2::Digest;
    use std::sync::Mutex;
    use std::time::{ SystemTime, UNIX_EPOCH };

    enum Backend
    {
      Persistent( Mutex< duckdb::Connection > ),
      Memory( Mutex< std::collections::HashMap< String, ( Vec< u8 >, u64, u32 ) > > ),
    }

    /// Persistent key/value store backed by a single local database file,
    /// falling back to an in-memory map if the file cannot be opened. A
    /// singleton per DB path — callers are expected to construct one and
    /// share it behind an `Arc`.
    pub struct ResponseCache
    {
      backend : Backend,
    }

    impl core::fmt::Debug for ResponseCache
    {
      fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
      {
        f.debug_struct( "ResponseCache" ).finish_non_exhaustive()
      }
    }

    fn now_unix() -> u64
    {
      SystemTime::now().duration_since( UNIX_EPOCH ).map( | d | d.as_secs() ).unwrap_or( 0 )
    }

    impl ResponseCache
    {
      /// Open (or create) the database file at `path`. If opening or
      /// schema creation fails, logs a single warning and falls back to a
      /// purely in-memory map for the lifetime of this instance.
      #[ must_use ]
      pub fn open( path : &std::path::Path ) -> Self
      {
        match Self::try_open_persistent( path )
        {
          Ok( conn ) => Self { backend : Backend::Persistent( Mutex::new( conn ) ) },
          Err( _err ) =>
          {
            #[ cfg( feature = "structured_logging" ) ]
            tracing::warn!( path = %path.display(), "response cache: falling back to in-memory store" );
            Self { backend : Backend::Memory( Mutex::new( std::collections::HashMap::new() ) ) }
          }
        }
      }

      /// Construct a cache that is in-memory only, regardless of whether a
      /// persistent backend is available. Used by tests and by
      /// `SIMULATE=1` runs.
      #[ must_use ]
      pub fn in_memory() -> Self
      {
        Self { backend : Backend::Memory( Mutex::new( std::collections::HashMap::new() ) ) }
      }

      fn try_open_persistent( path : &std::path::Path ) -> duckdb::Result< duckdb::Connection >
      {
        let conn = duckdb::Connection::open( path )?;
        conn.execute_batch(
          "CREATE TABLE IF NOT EXISTS entries ( hash TEXT PRIMARY KEY, payload BLOB, stored_at BIGINT, ttl INTEGER );
           CREATE INDEX IF NOT EXISTS entries_stored_at_idx ON entries ( stored_at );"
        )?;
        Ok( conn )
      }

      /// Look up `key`. Returns `None` on a miss or on an expired entry
      /// (the expired row is deleted as part of the lookup).
      #[ must_use ]
      pub fn get( &self, key : &serde_json::Value ) -> Option< Vec< u8 > >
      {
        let hash = super::fingerprint( key );
        let now = now_unix();
        match &self.backend
        {
          Backend::Memory( map ) =>
          {
            let mut guard = map.lock().ok()?;
            let ( payload, stored_at, ttl ) = guard.get( &hash )?.clone();
            if now.saturating_sub( stored_at ) > u64::from( ttl )
            {
              guard.remove( &hash );
              return None;
            }
            Some( payload )
          }
          Backend::Persistent( conn ) =>
          {
            let guard = conn.lock().ok()?;
            let row : Option< ( Vec< u8 >, i64, i32 ) > = guard
            .query_row(
              "SELECT payload, stored_at, ttl FROM entries WHERE hash = ?",
              [ &hash ],
              | row | Ok( ( row.get( 0 )?, row.get( 1 )?, row.get( 2 )? ) ),
            )
            .ok();
            let ( payload, stored_at, ttl ) = row?;
            #[ allow( clippy::cast_sign_loss ) ]
            let stored_at = stored_at as u64;
            #[ allow( clippy::cast_sign_loss ) ]
            let ttl = ttl as u64;
            if now.saturating_sub( stored_at ) > ttl
            {
              let _ = guard.execute( "DELETE FROM entries WHERE hash = ?", [ &hash ] );
              return None;
            }
            Some( payload )
          }
        }
      }

      /// Upsert `key → value` with the given TTL. Always reports success
      /// to the caller; failures are logged and swallowed — the cache is
      /// advisory, never fatal to a request.
      pub fn set( &self, key : &serde_json::Value, value : &[ u8 ], ttl_seconds : u32 )
      {
        let hash = super::fingerprint( key );
        let now = now_unix();
        match &self.backend
        {
          Backend::Memory( map ) =>
          {
            if let Ok( mut guard ) = map.lock()
            {
              guard.insert( hash, ( value.to_vec(), now, ttl_seconds ) );
            }
          }
          Backend::Persistent( conn ) =>
          {
            if let Ok( guard ) = conn.lock()
            {
              #[ allow( clippy::cast_possible_wrap ) ]
              let result = guard.execute(
                "INSERT INTO entries ( hash, payload, stored_at, ttl ) VALUES ( ?, ?, ?, ? )
                 ON CONFLICT ( hash ) DO UPDATE SET payload = excluded.payload, stored_at = excluded.stored_at, ttl = excluded.ttl",
                duckdb::params![ hash, value, now as i64, ttl_seconds as i32 ],
              );
              if let Err( _err ) = result
              {
                #[ cfg( feature = "structured_logging" ) ]
                tracing::warn!( "response cache: set failed, entry dropped" );
              }
            }
          }
        }
      }

      /// Upsert using [`DEFAULT_TTL_SECONDS`].
      #[ inline ]
      pub fn set_default_ttl( &self, key : &serde_json::Value, value : &[ u8 ] )
      {
        self.set( key, value, DEFAULT_TTL_SECONDS );
      }

      /// Delete one entry by key.
      pub fn invalidate( &self, key : &serde_json::Value )
      {
        let hash = super::fingerprint( key );
        match &self.backend
        {
          Backend::Memory( map ) =>
          {
            if let Ok( mut guard ) = map.lock()
            {
              guard.remove( &hash );
            }
          }
          Backend::Persistent( conn ) =>
          {
            if let Ok( guard ) = conn.lock()
            {
              let _ = guard.execute( "DELETE FROM entries WHERE hash = ?", [ &hash ] );
            }
          }
        }
      }

      /// Delete all entries whose hash-hex starts with `prefix`. An empty
      /// prefix deletes everything. A `prefix` shorter than a full
      /// SHA-256 hex digest (64 characters) is raw text and gets hashed
      /// first, matching the contract's "prefix may be passed as raw
      /// text" clause; a full-length prefix is assumed to already be a
      /// fingerprint and is used as-is.
      pub fn clear( &self, prefix : &str )
      {
        let hex_prefix = if prefix.is_empty()
        {
          String::new()
        }
        else if prefix.len() < 64
        {
          let digest = sha2::Sha256::digest( prefix.as_bytes() );
          hex::encode( digest )[ ..16 ].to_string()
        }
        else
        {
          prefix.to_string()
        };

        match &self.backend
        {
          Backend::Memory( map ) =>
          {
            if let Ok( mut guard ) = map.lock()
            {
              guard.retain( | k, _ | !k.starts_with( &hex_prefix ) );
            }
          }
          Backend::Persistent( conn ) =>
          {
            if let Ok( guard ) = conn.lock()
            {
              let pattern = format!( "{hex_prefix}%" );
              let _ = guard.execute( "DELETE FROM entries WHERE hash LIKE ?", [ pattern ] );
            }
          }
        }
      }

      /// Bulk-delete rows whose TTL has elapsed. Called opportunistically
      /// on startup.
      pub fn clear_expired( &self )
      {
        let now = now_unix();
        match &self.backend
        {
          Backend::Memory( map ) =>
          {
            if let Ok( mut guard ) = map.lock()
            {
              guard.retain( | _, ( _, stored_at, ttl ) | now.saturating_sub( *stored_at ) <= u64::from( *ttl ) );
            }
          }
          Backend::Persistent( conn ) =>
          {
            if let Ok( guard ) = conn.lock()
            {
              #[ allow( clippy::cast_possible_wrap ) ]
              let _ = guard.execute( "DELETE FROM entries WHERE stored_at + ttl < ?", duckdb::params![ now as i64 ] );
            }
          }
        }
      }

      /// Totals and byte size across all currently-live entries.
      #[ must_use ]
      pub fn stats( &self ) -> CacheStats
      {
        match &self.backend
        {
          Backend::Memory( map ) =>
          {
            let guard = map.lock().map( | g | g.len() as u64 ).unwrap_or( 0 );
            let bytes = map.lock().map( | g | g.values().map( | ( payload, _, _ ) | payload.len() as u64 ).sum() ).unwrap_or( 0 );
            CacheStats { entry_count : guard, total_bytes : bytes }
          }
          Backend::Persistent( conn ) =>
          {
            let Ok( guard ) = conn.lock() else { return CacheStats::default() };
            let row : Option< ( i64, i64 ) > = guard
            .query_row( "SELECT COUNT(*), COALESCE(SUM(LENGTH(payload)), 0) FROM entries", [], | row | Ok( ( row.get( 0 )?, row.get( 1 )? ) ) )
            .ok();
            let ( count, bytes ) = row.unwrap_or( ( 0, 0 ) );
            #[ allow( clippy::cast_sign_loss ) ]
            CacheStats { entry_count : count as u64, total_bytes : bytes as u64 }
          }
        }
      }
    }
  }

  #[ cfg( feature = "request_caching" ) ]
  pub use persistent::ResponseCache;
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    DEFAULT_TTL_SECONDS,
    CacheStats,
    canonicalize_key,
    fingerprint,
  };

  #[ cfg( feature = "request_caching" ) ]
  exposed use
  {
    ResponseCache,
  };
}
