//! The three environment variables this crate recognizes directly
//! (`REMOTE_API_KEY`, `SIMULATE`, `OFFLINE_MODE`). Everything else —
//! cache DB path, fallback-chain tables, timeouts — is a named
//! constructor parameter with a documented default, mirroring the
//! teacher's builder-method pattern rather than a general config-file
//! loader (config-file loading is out of scope for this core).

#[ cfg( feature = "enabled" ) ]
mod private
{
  /// Process-wide settings read once at startup from the environment.
  #[ derive( Debug, Clone ) ]
  pub struct EnvSettings
  {
    /// Bearer token for the remote aggregator, if configured.
    pub remote_api_key : Option< String >,
    /// `SIMULATE=1` forces the deterministic simulated path in the
    /// Execution Flow; used by tests that must not make network calls.
    pub simulate : bool,
    /// `OFFLINE_MODE=1` boots the Local Model Service Manager with
    /// `offline_mode` already set.
    pub offline_mode : bool,
  }

  impl EnvSettings
  {
    /// Read the three recognized variables from the process environment.
    /// Absent or unparsable boolean variables default to `false`.
    #[ must_use ]
    pub fn from_env() -> Self
    {
      Self
      {
        remote_api_key : std::env::var( "REMOTE_API_KEY" ).ok().filter( | v | !v.is_empty() ),
        simulate : env_flag( "SIMULATE" ),
        offline_mode : env_flag( "OFFLINE_MODE" ),
      }
    }
  }

  fn env_flag( name : &str ) -> bool
  {
    std::env::var( name ).map( | v | v == "1" ).unwrap_or( false )
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    EnvSettings,
  };
}
