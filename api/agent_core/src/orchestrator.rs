//! Orchestrator (C10): the public façade. `process_input` runs the
//! Command Parser first, falls through to the Intent Classifier and
//! Routing Table on an `Unknown` result, and hands a model-bearing
//! intent to the Execution Flow. Grounded on
//! `original_source/utils/command_parser.py`'s `parse_command` fallback
//! chain for the parser→classifier handoff, and on the teacher's
//! `client.rs` for the "one struct holds every collaborator" shape.

#[ cfg( all( feature = "enabled", feature = "retry", feature = "health_checks" ) ) ]
mod private
{
  use crate::client::ModelClient;
  use crate::command_parser::{ CommandParser, ParsedCommand, ParserContext };
  use crate::execution::ExecutionFlow;
  use crate::intent::IntentClassifier;
  use crate::local_manager::{ system_memory, LocalManager };
  use crate::model::{ IntentLabel, Response };
  use crate::retry::RetryConfig;
  use crate::routing::RoutingTable;
  use std::sync::Arc;
  use std::time::Instant;

  /// Judge models used by Tier 2/3 of the classifier — distinct from the
  /// routing table's general-purpose aliases because a judge call is
  /// deliberately cheap and deterministic (`temperature = 0.0`).
  const REMOTE_JUDGE_MODEL : &str = "phi";
  const LOCAL_JUDGE_MODEL : &str = "phi3";

  /// Owns one instance of every collaborator and exposes the single
  /// `process_input` entry point the UI layer calls.
  pub struct Orchestrator
  {
    parser : CommandParser,
    parser_context : ParserContext,
    classifier : IntentClassifier,
    routing : Arc< RoutingTable >,
    execution : Arc< ExecutionFlow >,
    local_manager : Arc< LocalManager >,
    remote_client : Arc< dyn ModelClient >,
    local_client : Arc< dyn ModelClient >,
  }

  impl core::fmt::Debug for Orchestrator
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "Orchestrator" ).finish_non_exhaustive()
    }
  }

  impl Orchestrator
  {
    /// Wire the full pipeline together from already-constructed
    /// collaborators. Construction of the individual pieces (HTTP
    /// clients, cache file, routing defaults) is left to the binary that
    /// embeds this crate.
    #[ must_use ]
    pub fn new(
      routing : Arc< RoutingTable >,
      execution : Arc< ExecutionFlow >,
      local_manager : Arc< LocalManager >,
      remote_client : Arc< dyn ModelClient >,
      local_client : Arc< dyn ModelClient >,
    ) -> Self
    {
      Self
      {
        parser : CommandParser::new(),
        parser_context : ParserContext::new(),
        classifier : IntentClassifier::new(),
        routing,
        execution,
        local_manager,
        remote_client,
        local_client,
      }
    }

    /// Run one turn end-to-end.
    pub async fn process_input( &self, text : &str ) -> Response
    {
      let started = Instant::now();
      let previous_intent = self.parser_context.previous_intent();
      let command = self.parser.parse( text, previous_intent.as_deref() );

      match command
      {
        ParsedCommand::Help => Self::immediate(
          "Commands: ask <model> <prompt>, time, date, time in <city>, workflow <description>, search memory <query>, show personality, system status, ollama on|off|status|pull <model>, help, exit.",
          started,
        ),
        ParsedCommand::Exit => Self::immediate( "Goodbye.", started ),
        ParsedCommand::Time => Self::immediate( &format!( "The current time is {}.", chrono::Utc::now().format( "%H:%M:%S UTC" ) ), started ),
        ParsedCommand::Date => Self::immediate( &format!( "Today's date is {}.", chrono::Utc::now().format( "%Y-%m-%d" ) ), started ),
        ParsedCommand::Timezone { location } => Self::immediate(
          &format!( "I don't have timezone data for {location} offline; in UTC it is currently {}.", chrono::Utc::now().format( "%H:%M:%S" ) ),
          started,
        ),
        ParsedCommand::SystemStatus =>
        {
          let ( running, state ) = self.local_manager.check_status( false ).await;
          let memory = system_memory();
          Self::immediate(
            &format!( "local server: {state:?} (running={running}); memory: {:.1} GiB free of {:.1} GiB", memory.free_gib, memory.total_gib ),
            started,
          )
        }
        ParsedCommand::LocalModel { action, model } => self.dispatch_local_model( &action, model.as_deref(), started ).await,
        ParsedCommand::Memory { action, detail } => Self::immediate( &format!( "memory {action} is out of scope for this core; detail: {}", detail.unwrap_or_default() ), started ),
        ParsedCommand::Personality { action } => Self::immediate( &format!( "personality {action} is out of scope for this core" ), started ),
        ParsedCommand::Workflow { description } => self.run_model_query( &description, IntentLabel::Automate, None, started ).await,
        ParsedCommand::AskModel { model, prompt } => self.run_model_query( &prompt, IntentLabel::AiQuery, Some( model.as_str() ), started ).await,
        ParsedCommand::Unknown { original_text, suggestions } =>
        {
          let mut response = self.classify_and_run( &original_text, started ).await;
          response.suggestions = suggestions;
          response
        }
      }
    }

    async fn dispatch_local_model( &self, action : &str, model : Option< &str >, started : Instant ) -> Response
    {
      let message = match action
      {
        "on" | "enable" =>
        {
          let result = self.local_manager.toggle_offline_mode( true ).await;
          result.message
        }
        "off" | "disable" =>
        {
          let result = self.local_manager.toggle_offline_mode( false ).await;
          result.message
        }
        "toggle" =>
        {
          let currently_offline = self.local_manager.is_offline();
          let result = self.local_manager.toggle_offline_mode( !currently_offline ).await;
          result.message
        }
        "status" =>
        {
          let ( running, state ) = self.local_manager.check_status( true ).await;
          format!( "local server state: {state:?}, running: {running}" )
        }
        "pull" =>
        {
          let Some( name ) = model else { return Self::immediate( "pull requires a model name", started ) };
          let result = self.local_manager.pull_model( name ).await;
          result.message
        }
        other => format!( "unrecognized local-model action: {other}" ),
      };
      Self::immediate( &message, started )
    }

    async fn classify_and_run( &self, text : &str, started : Instant ) -> Response
    {
      let online = !self.local_manager.is_offline();
      let memory = system_memory();

      let classification = self
      .classifier
      .classify(
        text,
        Some( ( self.remote_client.as_ref(), REMOTE_JUDGE_MODEL ) ),
        Some( ( self.local_client.as_ref(), LOCAL_JUDGE_MODEL ) ),
        online,
        memory.percent_used,
      )
      .await;

      self.parser_context.record_intent( classification.label.as_str() );

      match classification.label
      {
        IntentLabel::Time => Self::immediate( &format!( "The current time is {}.", chrono::Utc::now().format( "%H:%M:%S UTC" ) ), started ),
        other => self.run_model_query( text, other, None, started ).await,
      }
    }

    async fn run_model_query( &self, prompt : &str, intent : IntentLabel, explicit_model : Option< &str >, started : Instant ) -> Response
    {
      let online = !self.local_manager.is_offline();
      let decision = self.routing.route( intent, online, explicit_model );

      let primary_alias = decision.primary.clone();
      let fallback_aliases = decision.fallbacks.clone();
      let routing = Arc::clone( &self.routing );
      let execution = Arc::clone( &self.execution );

      let prompt_owned = prompt.to_string();
      let primary_model_id = routing.resolve_alias( &primary_alias );
      let fallback_fns : Vec< _ > = fallback_aliases
      .iter()
      .map( | alias |
      {
        let execution = Arc::clone( &execution );
        let routing = Arc::clone( &routing );
        let model_id = routing.resolve_alias( alias );
        let prompt_owned = prompt_owned.clone();
        move ||
        {
          let execution = Arc::clone( &execution );
          let model_id = model_id.clone();
          let prompt_owned = prompt_owned.clone();
          async move { execution.execute_query( &prompt_owned, &model_id, None, 0.7, 1024 ).await }
        }
      } )
      .collect();

      let primary_execution = Arc::clone( &execution );
      let primary_prompt = prompt_owned.clone();
      let primary = move ||
      {
        let execution = Arc::clone( &primary_execution );
        let model_id = primary_model_id.clone();
        let prompt_owned = primary_prompt.clone();
        async move { execution.execute_query( &prompt_owned, &model_id, None, 0.7, 1024 ).await }
      };

      let result = self
      .execution
      .execute_with_fallbacks( primary, fallback_fns, RetryConfig::default(), None, None )
      .await;

      #[ allow( clippy::cast_possible_truncation ) ]
      let elapsed_ms = started.elapsed().as_millis() as u32;

      match result
      {
        Ok( response ) => Response { content : response.content, model_used : Some( response.model ), intent : Some( intent ), elapsed_ms, error : None, suggestions : Vec::new() },
        Err( failed ) => Response
        {
          content : failed.last_error.user_message.clone(),
          model_used : Some( primary_alias ),
          intent : Some( intent ),
          elapsed_ms,
          error : Some( failed.last_error.kind ),
          suggestions : Vec::new(),
        },
      }
    }

    fn immediate( content : &str, started : Instant ) -> Response
    {
      #[ allow( clippy::cast_possible_truncation ) ]
      let elapsed_ms = started.elapsed().as_millis() as u32;
      Response { content : content.to_string(), model_used : None, intent : None, elapsed_ms, error : None, suggestions : Vec::new() }
    }

  }
}

#[ cfg( all( feature = "enabled", feature = "retry", feature = "health_checks" ) ) ]
crate::mod_interface!
{
  exposed use
  {
    Orchestrator,
  };
}
