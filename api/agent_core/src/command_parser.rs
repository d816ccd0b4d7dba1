//! Command Parser (C9): a pattern-based fast path for deterministic
//! commands — time/date/timezone queries, direct model invocations,
//! workflow dispatch, help/exit, memory/personality/local-model
//! operations. A match skips the Intent Classifier entirely. Grounded on
//! `original_source/utils/command_parser.py`'s `command_patterns` table
//! and `parse_command` dispatch loop (spaCy branch dropped — out of this
//! workspace's dependency set, and the original itself treats it as
//! optional, falling back to the same regex table).

#[ cfg( feature = "enabled" ) ]
mod private
{
  use regex::Regex;
  use std::sync::Mutex;

  /// The structured outcome of parsing one line of input.
  #[ derive( Debug, Clone, PartialEq, Eq ) ]
  pub enum ParsedCommand
  {
    /// `help` / `commands` / `what can you do`.
    Help,
    /// `exit` / `quit` / `bye`.
    Exit,
    /// `what's the time`, `current time`.
    Time,
    /// `what's the date`, `today's date`.
    Date,
    /// `time in <location>` — captures the location text.
    Timezone
    {
      /// Free-text location as typed, not geocoded here.
      location : String,
    },
    /// `ask <model> <prompt>` / `query <model> to <prompt>`.
    AskModel
    {
      /// The model alias named in the command.
      model : String,
      /// The remainder of the line, passed through to the model.
      prompt : String,
    },
    /// `workflow <description>` / `run a workflow for <description>`.
    Workflow
    {
      /// Free-text workflow description.
      description : String,
    },
    /// `search memory <query>` / `save to memory <text>` / `recall memory`.
    Memory
    {
      /// The verb that matched (`search`, `save`, `recall`, ...).
      action : String,
      /// Remaining free text, if the pattern captured any.
      detail : Option< String >,
    },
    /// `show personality` / `adjust personality <trait> <value>`.
    Personality
    {
      /// `show` or `adjust`.
      action : String,
    },
    /// `system status` / `health check` / `show system status`.
    SystemStatus,
    /// `ollama on|off|status|pull <model>` / `toggle offline mode`.
    LocalModel
    {
      /// `on`, `off`, `status`, or `pull`.
      action : String,
      /// The model name, present only for `pull`.
      model : Option< String >,
    },
    /// Nothing matched.
    Unknown
    {
      /// The normalized input text, echoed back for diagnostics.
      original_text : String,
      /// UI-only suggestions derived from the previous classified
      /// intent. The core never acts on these itself.
      suggestions : Vec< String >,
    },
  }

  /// Tracks the rolling conversation state a `Command::Unknown` fallback
  /// uses to generate suggestions — mirrors the original's
  /// `self.context = {previous_intent, interaction_count}`.
  #[ derive( Debug, Default ) ]
  pub struct ParserContext
  {
    inner : Mutex< ContextState >,
  }

  #[ derive( Debug, Default, Clone ) ]
  struct ContextState
  {
    previous_intent : Option< String >,
    interaction_count : u64,
  }

  impl ParserContext
  {
    /// A fresh context with no prior interactions.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Record a classified intent after an `Unknown` fallback, advancing
    /// the interaction counter.
    pub fn record_intent( &self, intent : &str )
    {
      let mut guard = self.inner.lock().expect( "parser context mutex poisoned" );
      guard.previous_intent = Some( intent.to_string() );
      guard.interaction_count += 1;
    }

    /// The most recently recorded intent, if any.
    #[ must_use ]
    pub fn previous_intent( &self ) -> Option< String >
    {
      self.inner.lock().expect( "parser context mutex poisoned" ).previous_intent.clone()
    }

    /// Total number of `Unknown` fallbacks seen so far.
    #[ must_use ]
    pub fn interaction_count( &self ) -> u64
    {
      self.inner.lock().expect( "parser context mutex poisoned" ).interaction_count
    }
  }

  struct Rule
  {
    regex : Regex,
    build : fn( &regex::Captures<'_> ) -> ParsedCommand,
  }

  fn rules() -> Vec< Rule >
  {
    let specs : Vec< ( &str, fn( &regex::Captures<'_> ) -> ParsedCommand ) > = vec![
      ( r"(?i)^\s*(?:help|commands|what can you do|show commands|available commands)\s*$", | _ | ParsedCommand::Help ),
      ( r"(?i)^\s*(?:exit|quit|bye|goodbye)\s*$", | _ | ParsedCommand::Exit ),
      ( r"(?i)^\s*what(?:'s| is) the time(?: now)?\s*$", | _ | ParsedCommand::Time ),
      ( r"(?i)^\s*(?:current time|time now)\s*$", | _ | ParsedCommand::Time ),
      ( r"(?i)^\s*what(?:'s| is) (?:the|today's) date\s*$", | _ | ParsedCommand::Date ),
      ( r"(?i)^\s*what day is (?:it|today)\s*$", | _ | ParsedCommand::Date ),
      ( r"(?i)^\s*(?:current date|today's date)\s*$", | _ | ParsedCommand::Date ),
      (
        r"(?i)^\s*(?:what(?:'s| is)(?: the)?(?: time)?(?: like)? in|time (?:in|at)|current time in|what time is it in)\s+([a-zA-Z\s]+)\s*$",
        | caps | ParsedCommand::Timezone { location : caps[ 1 ].trim().to_string() },
      ),
      (
        r"(?i)^\s*ask\s+([a-zA-Z0-9_-]+)\s+(.+)$",
        | caps | ParsedCommand::AskModel { model : caps[ 1 ].to_string(), prompt : caps[ 2 ].to_string() },
      ),
      (
        r"(?i)^\s*(?:query|use)\s+([a-zA-Z0-9_-]+)(?:\s+to)?\s+(.+)$",
        | caps | ParsedCommand::AskModel { model : caps[ 1 ].to_string(), prompt : caps[ 2 ].to_string() },
      ),
      (
        r"(?i)^\s*workflow\s+(.+)$",
        | caps | ParsedCommand::Workflow { description : caps[ 1 ].to_string() },
      ),
      (
        r"(?i)^\s*(?:create(?:\s+a)?\s+workflow(?:\s+for)?|(?:run|execute)(?:\s+a)?\s+workflow(?:\s+for)?)\s+(.+)$",
        | caps | ParsedCommand::Workflow { description : caps[ 1 ].to_string() },
      ),
      (
        r"(?i)^\s*search\s+(?:memory|memories)(?:\s+(?:for|about)\s+(.+))?$",
        | caps | ParsedCommand::Memory { action : "search".to_string(), detail : caps.get( 1 ).map( | m | m.as_str().to_string() ) },
      ),
      (
        r"(?i)^\s*save to\s+(?:memory|memories)\s+(.+)$",
        | caps | ParsedCommand::Memory { action : "save".to_string(), detail : Some( caps[ 1 ].to_string() ) },
      ),
      (
        r"(?i)^\s*(?:recall|show recent|show|get)\s+(?:memory|memories)(?:\s+(.+))?$",
        | caps | ParsedCommand::Memory { action : "recall".to_string(), detail : caps.get( 1 ).map( | m | m.as_str().to_string() ) },
      ),
      ( r"(?i)^\s*show\s+personality\s*$", | _ | ParsedCommand::Personality { action : "show".to_string() } ),
      ( r"(?i)^\s*adjust\s+personality", | _ | ParsedCommand::Personality { action : "adjust".to_string() } ),
      ( r"(?i)^\s*(?:system\s+(?:status|info|health)|(?:show|display|get)\s+(?:system|status)|how(?:'s| is) the system(?:\s+status)?)\s*.*$", | _ | ParsedCommand::SystemStatus ),
      (
        r"(?i)^\s*ollama\s+(on|off|status|pull)(?:\s+(.+))?$",
        | caps | ParsedCommand::LocalModel { action : caps[ 1 ].to_lowercase(), model : caps.get( 2 ).map( | m | m.as_str().to_string() ) },
      ),
      (
        r"(?i)^\s*(enable|disable|toggle)\s+offline\s+mode\s*$",
        | caps | ParsedCommand::LocalModel { action : caps[ 1 ].to_lowercase(), model : None },
      ),
    ];

    specs
    .into_iter()
    .map( | ( pattern, build ) | Rule { regex : Regex::new( pattern ).expect( "pattern is a fixed valid regex" ), build } )
    .collect()
  }

  /// Holds the compiled pattern table; constructed once and shared.
  pub struct CommandParser
  {
    rules : Vec< Rule >,
  }

  impl core::fmt::Debug for CommandParser
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "CommandParser" ).field( "rules", &self.rules.len() ).finish()
    }
  }

  impl Default for CommandParser
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  impl CommandParser
  {
    /// Compile the fixed pattern table.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self { rules : rules() }
    }

    /// Normalize and match `text` against the pattern table in order.
    /// Falls back to `Unknown` (optionally carrying suggestions derived
    /// from `previous_intent`) when nothing matches.
    #[ must_use ]
    pub fn parse( &self, text : &str, previous_intent : Option< &str > ) -> ParsedCommand
    {
      let normalized = text.trim();
      for rule in &self.rules
      {
        if let Some( caps ) = rule.regex.captures( normalized )
        {
          return ( rule.build )( &caps );
        }
      }

      ParsedCommand::Unknown
      {
        original_text : normalized.to_lowercase(),
        suggestions : suggestions_for( previous_intent ),
      }
    }
  }

  fn suggestions_for( previous_intent : Option< &str > ) -> Vec< String >
  {
    match previous_intent
    {
      Some( "code" ) => vec![ "ask code-specialist to continue that snippet".to_string(), "run a workflow for this task".to_string() ],
      Some( "memory" ) => vec![ "search memory for related notes".to_string() ],
      Some( "github" ) => vec![ "github <owner>/<repo> info".to_string() ],
      Some( "time" ) => vec![ "current time".to_string(), "time in <city>".to_string() ],
      Some( other ) => vec![ format!( "ask main_brain about {other}" ) ],
      None => vec![ "help".to_string() ],
    }
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    ParsedCommand,
    ParserContext,
    CommandParser,
  };
}
