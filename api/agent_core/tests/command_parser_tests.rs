//! Command Parser (C9): deterministic pattern matches and the
//! `Unknown` fallback with context-aware suggestions.

#![ cfg( feature = "enabled" ) ]

use agent_core::{ CommandParser, ParsedCommand };

#[ test ]
fn recognizes_help_case_insensitively()
{
  let parser = CommandParser::new();
  assert_eq!( parser.parse( "HELP", None ), ParsedCommand::Help );
  assert_eq!( parser.parse( "what can you do", None ), ParsedCommand::Help );
}

#[ test ]
fn recognizes_exit_variants()
{
  let parser = CommandParser::new();
  assert_eq!( parser.parse( "quit", None ), ParsedCommand::Exit );
  assert_eq!( parser.parse( "bye", None ), ParsedCommand::Exit );
}

#[ test ]
fn recognizes_time_queries()
{
  let parser = CommandParser::new();
  assert_eq!( parser.parse( "what's the time", None ), ParsedCommand::Time );
  assert_eq!( parser.parse( "current time", None ), ParsedCommand::Time );
}

#[ test ]
fn recognizes_timezone_queries_and_captures_the_location()
{
  let parser = CommandParser::new();
  match parser.parse( "time in Tokyo", None )
  {
    ParsedCommand::Timezone { location } => assert_eq!( location, "Tokyo" ),
    other => panic!( "expected Timezone, got {other:?}" ),
  }
}

#[ test ]
fn ask_model_captures_model_and_prompt()
{
  let parser = CommandParser::new();
  match parser.parse( "ask phi what is rust ownership", None )
  {
    ParsedCommand::AskModel { model, prompt } =>
    {
      assert_eq!( model, "phi" );
      assert_eq!( prompt, "what is rust ownership" );
    }
    other => panic!( "expected AskModel, got {other:?}" ),
  }
}

#[ test ]
fn workflow_captures_the_description()
{
  let parser = CommandParser::new();
  match parser.parse( "workflow deploy the staging branch", None )
  {
    ParsedCommand::Workflow { description } => assert_eq!( description, "deploy the staging branch" ),
    other => panic!( "expected Workflow, got {other:?}" ),
  }
}

#[ test ]
fn ollama_pull_captures_action_and_model()
{
  let parser = CommandParser::new();
  match parser.parse( "ollama pull phi3", None )
  {
    ParsedCommand::LocalModel { action, model } =>
    {
      assert_eq!( action, "pull" );
      assert_eq!( model.as_deref(), Some( "phi3" ) );
    }
    other => panic!( "expected LocalModel, got {other:?}" ),
  }
}

#[ test ]
fn ollama_status_has_no_model()
{
  let parser = CommandParser::new();
  match parser.parse( "ollama status", None )
  {
    ParsedCommand::LocalModel { action, model } =>
    {
      assert_eq!( action, "status" );
      assert!( model.is_none() );
    }
    other => panic!( "expected LocalModel, got {other:?}" ),
  }
}

#[ test ]
fn unmatched_text_falls_back_to_unknown_with_suggestions()
{
  let parser = CommandParser::new();
  match parser.parse( "garble blorp zonk", Some( "code" ) )
  {
    ParsedCommand::Unknown { original_text, suggestions } =>
    {
      assert_eq!( original_text, "garble blorp zonk" );
      assert!( !suggestions.is_empty() );
    }
    other => panic!( "expected Unknown, got {other:?}" ),
  }
}

#[ test ]
fn unknown_without_prior_intent_suggests_help()
{
  let parser = CommandParser::new();
  match parser.parse( "garble blorp zonk", None )
  {
    ParsedCommand::Unknown { suggestions, .. } => assert_eq!( suggestions, vec![ "help".to_string() ] ),
    other => panic!( "expected Unknown, got {other:?}" ),
  }
}
