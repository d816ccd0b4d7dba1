//! Local Model Service Manager (C3): discovers the local model-server
//! binary, starts/stops it, probes health, lists/pulls models, and
//! enforces memory-pressure gates. Grounded on
//! `original_source/utils/ollama_manager.py` (`OllamaManager`) for the
//! state machine and memory thresholds, and on the teacher's
//! `health_checks.rs` for the cached-probe shape.

#[ cfg( all( feature = "enabled", feature = "health_checks" ) ) ]
mod private
{
  use crate::local_client::LocalClient;
  use std::process::{ Child, Stdio };
  use std::sync::Mutex;
  use std::time::{ Duration, Instant };

  /// Minimum free memory required to start the service at all.
  const START_MIN_FREE_GIB : f64 = 1.5;
  /// How long `check_status` trusts its own cache before re-probing.
  const STATUS_CACHE_SECS : u64 = 10;
  /// Budget for a `start_service` health-poll loop.
  const START_TIMEOUT_SECS : u64 = 10;
  /// Grace period before escalating `stop_service` from terminate to kill.
  const STOP_GRACE_SECS : u64 = 5;
  /// Consecutive failed probes before `Running` degrades.
  const DEGRADE_AFTER_FAILURES : u32 = 3;

  /// Minimum free memory (GiB) required to pull a given model, keyed by a
  /// coarse size class. Unknown models use the 1.5 GiB default.
  #[ must_use ]
  pub fn pull_memory_requirement_gib( model : &str ) -> f64
  {
    let lower = model.to_lowercase();
    if lower.contains( "70b" ) || lower.contains( "large" )
    {
      4.0
    }
    else if lower.contains( "34b" ) || lower.contains( "30b" )
    {
      3.0
    }
    else if lower.contains( "13b" ) || lower.contains( "medium" )
    {
      2.0
    }
    else
    {
      1.5
    }
  }

  /// `{total, free, used, percent}` in GiB/percent, read from
  /// `/proc/meminfo` on Linux. On platforms without that file, returns a
  /// generous fixed estimate so memory gates never spuriously block —
  /// this manager's gates are a Linux-server-deployment concern.
  #[ must_use ]
  pub fn system_memory() -> MemoryStats
  {
    #[ cfg( target_os = "linux" ) ]
    {
      if let Ok( contents ) = std::fs::read_to_string( "/proc/meminfo" )
      {
        let mut total_kb = 0_u64;
        let mut available_kb = 0_u64;
        for line in contents.lines()
        {
          if let Some( rest ) = line.strip_prefix( "MemTotal:" )
          {
            total_kb = parse_meminfo_kb( rest );
          }
          else if let Some( rest ) = line.strip_prefix( "MemAvailable:" )
          {
            available_kb = parse_meminfo_kb( rest );
          }
        }
        if total_kb > 0
        {
          let total = total_kb as f64 / ( 1024.0 * 1024.0 );
          let free = available_kb as f64 / ( 1024.0 * 1024.0 );
          let used = ( total - free ).max( 0.0 );
          let percent = if total > 0.0 { used / total * 100.0 } else { 0.0 };
          return MemoryStats { total_gib : total, free_gib : free, used_gib : used, percent_used : percent };
        }
      }
    }
    MemoryStats { total_gib : 16.0, free_gib : 16.0, used_gib : 0.0, percent_used : 0.0 }
  }

  #[ cfg( target_os = "linux" ) ]
  fn parse_meminfo_kb( field : &str ) -> u64
  {
    field.split_whitespace().next().and_then( | v | v.parse().ok() ).unwrap_or( 0 )
  }

  /// System memory snapshot in GiB.
  #[ derive( Debug, Clone, Copy ) ]
  pub struct MemoryStats
  {
    /// Total installed memory.
    pub total_gib : f64,
    /// Currently free/available memory.
    pub free_gib : f64,
    /// Currently used memory.
    pub used_gib : f64,
    /// Percent used, `0..=100`.
    pub percent_used : f64,
  }

  /// Lifecycle states of the local model server, per §4.3's state
  /// diagram.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum ServiceState
  {
    /// No probe has run yet.
    Unknown,
    /// Confirmed not running.
    Stopped,
    /// Spawn issued, health-polling for the first `ok`.
    Starting,
    /// Last probe succeeded.
    Running,
    /// Running but has accumulated consecutive probe failures.
    Degraded,
  }

  /// Outcome of a lifecycle operation, returned as plain data rather than
  /// raised — service-manager errors are surfaced to the caller, never
  /// thrown (§7).
  #[ derive( Debug, Clone ) ]
  pub struct ServiceResult
  {
    /// Whether the requested operation achieved its goal.
    pub success : bool,
    /// Human-readable explanation.
    pub message : String,
    /// State after the operation.
    pub state : ServiceState,
  }

  struct Inner
  {
    state : ServiceState,
    offline_mode : bool,
    consecutive_failures : u32,
    last_checked : Option< Instant >,
    last_running : bool,
    child : Option< Child >,
    binary_path : Option< std::path::PathBuf >,
  }

  /// Owns the local server's process (if this manager spawned it) and its
  /// [`LocalClient`] handle. The state machine is serialized by a single
  /// mutex; `check_status` may run concurrently with other callers but
  /// always sees a consistent snapshot.
  pub struct LocalManager
  {
    client : std::sync::Arc< LocalClient >,
    binary_names : Vec< String >,
    inner : Mutex< Inner >,
  }

  impl core::fmt::Debug for LocalManager
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "LocalManager" ).finish_non_exhaustive()
    }
  }

  impl LocalManager
  {
    /// Construct a manager around an existing [`LocalClient`], with
    /// `offline_mode` seeded from startup configuration (`OFFLINE_MODE=1`).
    #[ must_use ]
    pub fn new( client : std::sync::Arc< LocalClient >, binary_names : Vec< String >, offline_mode : bool ) -> Self
    {
      Self
      {
        client,
        binary_names,
        inner : Mutex::new( Inner
        {
          state : ServiceState::Unknown,
          offline_mode,
          consecutive_failures : 0,
          last_checked : None,
          last_running : false,
          child : None,
          binary_path : None,
        } ),
      }
    }

    /// Platform-specific search for the local server binary: checks the
    /// configured names on `PATH` first, then a short list of common
    /// install locations.
    #[ must_use ]
    pub fn find_binary( &self ) -> Option< std::path::PathBuf >
    {
      for name in &self.binary_names
      {
        if let Ok( path_var ) = std::env::var( "PATH" )
        {
          for dir in std::env::split_paths( &path_var )
          {
            let candidate = dir.join( name );
            if candidate.is_file()
            {
              return Some( candidate );
            }
          }
        }
        #[ cfg( unix ) ]
        for common in [ "/usr/local/bin", "/usr/bin", "/opt/homebrew/bin" ]
        {
          let candidate = std::path::Path::new( common ).join( name );
          if candidate.is_file()
          {
            return Some( candidate );
          }
        }
      }
      None
    }

    /// Start the server: refuses under the memory floor, spawns it with
    /// captured stdio, polls health every second up to
    /// [`START_TIMEOUT_SECS`]. On first `ok`, transitions to `Running`;
    /// otherwise reaps the child and transitions to `Stopped`.
    pub async fn start_service( &self ) -> ServiceResult
    {
      let memory = system_memory();
      if memory.free_gib < START_MIN_FREE_GIB
      {
        return ServiceResult
        {
          success : false,
          message : format!( "insufficient memory to start: {:.1} GiB free, {START_MIN_FREE_GIB:.1} GiB required", memory.free_gib ),
          state : self.inner.lock().map( | g | g.state ).unwrap_or( ServiceState::Unknown ),
        };
      }

      let Some( binary ) = self.find_binary() else
      {
        return ServiceResult { success : false, message : "local model server binary not found on PATH".to_string(), state : ServiceState::Stopped };
      };

      {
        let mut guard = self.inner.lock().expect( "local manager mutex poisoned" );
        guard.state = ServiceState::Starting;
        guard.binary_path = Some( binary.clone() );
      }

      let spawned = std::process::Command::new( &binary ).arg( "serve" ).stdout( Stdio::null() ).stderr( Stdio::null() ).spawn();
      let child = match spawned
      {
        Ok( c ) => c,
        Err( e ) =>
        {
          let mut guard = self.inner.lock().expect( "local manager mutex poisoned" );
          guard.state = ServiceState::Stopped;
          return ServiceResult { success : false, message : format!( "failed to spawn local server: {e}" ), state : ServiceState::Stopped };
        }
      };

      {
        let mut guard = self.inner.lock().expect( "local manager mutex poisoned" );
        guard.child = Some( child );
      }

      let deadline = Instant::now() + Duration::from_secs( START_TIMEOUT_SECS );
      while Instant::now() < deadline
      {
        if self.client.check_health( true, true ).await
        {
          let mut guard = self.inner.lock().expect( "local manager mutex poisoned" );
          guard.state = ServiceState::Running;
          guard.consecutive_failures = 0;
          guard.last_running = true;
          guard.last_checked = Some( Instant::now() );
          return ServiceResult { success : true, message : "local server is running".to_string(), state : ServiceState::Running };
        }
        tokio::time::sleep( Duration::from_secs( 1 ) ).await;
      }

      self.reap_child();
      let mut guard = self.inner.lock().expect( "local manager mutex poisoned" );
      guard.state = ServiceState::Stopped;
      ServiceResult { success : false, message : "local server did not become healthy in time".to_string(), state : ServiceState::Stopped }
    }

    fn reap_child( &self )
    {
      if let Ok( mut guard ) = self.inner.lock()
      {
        if let Some( mut child ) = guard.child.take()
        {
          let _ = child.kill();
          let _ = child.wait();
        }
      }
    }

    /// Stop the server. If this manager spawned the process, sends a
    /// terminate signal and escalates to kill after
    /// [`STOP_GRACE_SECS`]. If the process is externally owned, this only
    /// attempts best-effort termination by name and never claims
    /// ownership of it.
    pub async fn stop_service( &self ) -> ServiceResult
    {
      let owns_child = self.inner.lock().map( | g | g.child.is_some() ).unwrap_or( false );

      if owns_child
      {
        if let Ok( mut guard ) = self.inner.lock()
        {
          if let Some( child ) = guard.child.as_mut()
          {
            #[ cfg( unix ) ]
            {
              let pid = child.id();
              let _ = std::process::Command::new( "kill" ).arg( "-TERM" ).arg( pid.to_string() ).status();
            }
            let waited = wait_with_timeout( child, Duration::from_secs( STOP_GRACE_SECS ) );
            if !waited
            {
              let _ = child.kill();
              let _ = child.wait();
            }
          }
          guard.child = None;
          guard.state = ServiceState::Stopped;
        }
      }
      else
      {
        // External process: best-effort only, never owned.
        #[ cfg( unix ) ]
        {
          for name in &self.binary_names
          {
            let _ = std::process::Command::new( "pkill" ).arg( "-TERM" ).arg( name ).status();
          }
        }
        if let Ok( mut guard ) = self.inner.lock()
        {
          guard.state = ServiceState::Stopped;
        }
      }

      ServiceResult { success : true, message : "stop requested".to_string(), state : ServiceState::Stopped }
    }

    /// Returns the cached status unless `force` is set or the cache is
    /// older than [`STATUS_CACHE_SECS`]. When `offline_mode` is `false`
    /// and not forced, returns `{running: false}` without probing — the
    /// rationale in §4.3 is to avoid waking a dormant local server while
    /// the system is online.
    pub async fn check_status( &self, force : bool ) -> ( bool, ServiceState )
    {
      let ( offline_mode, is_fresh, cached_running, cached_state ) =
      {
        let guard = self.inner.lock().expect( "local manager mutex poisoned" );
        let fresh = guard.last_checked.is_some_and( | t | t.elapsed() < Duration::from_secs( STATUS_CACHE_SECS ) );
        ( guard.offline_mode, fresh, guard.last_running, guard.state )
      };

      if !offline_mode && !force
      {
        return ( false, cached_state );
      }
      if is_fresh && !force
      {
        return ( cached_running, cached_state );
      }

      let healthy = self.client.check_health( true, offline_mode ).await;
      let mut guard = self.inner.lock().expect( "local manager mutex poisoned" );
      guard.last_checked = Some( Instant::now() );
      guard.last_running = healthy;
      if healthy
      {
        guard.consecutive_failures = 0;
        guard.state = ServiceState::Running;
      }
      else
      {
        guard.consecutive_failures += 1;
        guard.state = if matches!( guard.state, ServiceState::Running | ServiceState::Degraded ) && guard.consecutive_failures < DEGRADE_AFTER_FAILURES
        {
          ServiceState::Degraded
        }
        else
        {
          ServiceState::Stopped
        };
      }
      ( healthy, guard.state )
    }

    /// Enable or disable offline mode. Enabling starts the service if it
    /// is not already running; disabling only clears the flag (the
    /// service, if running, is left alone).
    pub async fn toggle_offline_mode( &self, enable : bool ) -> ServiceResult
    {
      if enable
      {
        let ( running, state ) = self.check_status( true ).await;
        if !running
        {
          let result = self.start_service().await;
          if let Ok( mut guard ) = self.inner.lock()
          {
            guard.offline_mode = true;
          }
          return result;
        }
        if let Ok( mut guard ) = self.inner.lock()
        {
          guard.offline_mode = true;
        }
        return ServiceResult { success : true, message : "offline mode enabled".to_string(), state };
      }

      let state = self.inner.lock().map( | g | g.state ).unwrap_or( ServiceState::Unknown );
      if let Ok( mut guard ) = self.inner.lock()
      {
        guard.offline_mode = false;
      }
      ServiceResult { success : true, message : "offline mode disabled".to_string(), state }
    }

    /// Whether offline mode is currently enabled.
    #[ must_use ]
    pub fn is_offline( &self ) -> bool
    {
      self.inner.lock().map( | g | g.offline_mode ).unwrap_or( false )
    }

    /// Ensures the service is running, gates on the model-specific memory
    /// minimum, and spawns the pull with a 20-minute budget. Refreshes the
    /// model list on success.
    pub async fn pull_model( &self, model_name : &str ) -> ServiceResult
    {
      let ( running, state ) = self.check_status( true ).await;
      if !running
      {
        let start_result = self.start_service().await;
        if !start_result.success
        {
          return start_result;
        }
      }

      let required = pull_memory_requirement_gib( model_name );
      let memory = system_memory();
      if memory.free_gib < required
      {
        return ServiceResult
        {
          success : false,
          message : format!(
            "not enough memory to pull {model_name}: required {required:.1} GiB, available {:.1} GiB ({:.0}% used)",
            memory.free_gib, memory.percent_used
          ),
          state,
        };
      }

      let Some( binary ) = self.inner.lock().ok().and_then( | g | g.binary_path.clone() ).or_else( || self.find_binary() ) else
      {
        return ServiceResult { success : false, message : "local model server binary not found".to_string(), state };
      };

      let output = tokio::time::timeout(
        Duration::from_secs( 20 * 60 ),
        tokio::process::Command::new( &binary ).arg( "pull" ).arg( model_name ).output(),
      )
      .await;

      match output
      {
        Ok( Ok( out ) ) if out.status.success() =>
        {
          self.client.refresh_models().await;
          ServiceResult { success : true, message : format!( "model {model_name} pulled successfully" ), state : ServiceState::Running }
        }
        Ok( Ok( out ) ) => ServiceResult
        {
          success : false,
          message : format!( "failed to pull {model_name}: {}", String::from_utf8_lossy( &out.stderr ) ),
          state,
        },
        Ok( Err( e ) ) => ServiceResult { success : false, message : format!( "failed to pull {model_name}: {e}" ), state },
        Err( _elapsed ) => ServiceResult { success : false, message : format!( "timed out pulling {model_name} (exceeded 20 minutes)" ), state },
      }
    }

    /// Pings a fixed reachable host; if unreachable and the service is
    /// not running, starts it and sets `offline_mode = true`. The only
    /// place the flag is set from a network signal (§4.3).
    pub async fn auto_start_if_offline( &self, probe : &reqwest::Client ) -> ServiceResult
    {
      let reachable = probe
      .get( "https://1.1.1.1" )
      .timeout( Duration::from_secs( 3 ) )
      .send()
      .await
      .is_ok();

      if reachable
      {
        let state = self.inner.lock().map( | g | g.state ).unwrap_or( ServiceState::Unknown );
        return ServiceResult { success : true, message : "network reachable, staying online".to_string(), state };
      }

      let ( running, _ ) = self.check_status( true ).await;
      if running
      {
        if let Ok( mut guard ) = self.inner.lock()
        {
          guard.offline_mode = true;
        }
        return ServiceResult { success : true, message : "network unreachable, local server already running".to_string(), state : ServiceState::Running };
      }

      let result = self.start_service().await;
      if let Ok( mut guard ) = self.inner.lock()
      {
        guard.offline_mode = true;
      }
      result
    }
  }

  fn wait_with_timeout( child : &mut Child, timeout : Duration ) -> bool
  {
    let deadline = Instant::now() + timeout;
    loop
    {
      if let Ok( Some( _status ) ) = child.try_wait()
      {
        return true;
      }
      if Instant::now() >= deadline
      {
        return false;
      }
      std::thread::sleep( Duration::from_millis( 100 ) );
    }
  }
}

#[ cfg( all( feature = "enabled", feature = "health_checks" ) ) ]
crate::mod_interface!
{
  exposed use
  {
    MemoryStats,
    ServiceState,
    ServiceResult,
    LocalManager,
    system_memory,
    pull_memory_requirement_gib,
  };
}
