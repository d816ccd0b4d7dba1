//! Shared data model: chat messages, normalized model responses, the closed
//! intent-label set, and routing decisions. Grounded on the teacher's
//! `messages.rs`/`chat.rs`/`generate.rs` — tolerant `#[serde(default)]`
//! response deserialization, optional `Hash` for cache-key generation.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use serde::{ Deserialize, Serialize };
  use core::hash::{ Hash, Hasher };
  use crate::errors::ErrorKind;

  /// A single chat turn, in the shape both the remote aggregator and the
  /// local server accept.
  #[ derive( Debug, Clone, Serialize, Deserialize ) ]
  pub struct Message
  {
    /// `"user"`, `"assistant"`, or `"system"`.
    pub role : String,
    /// Text content of the turn.
    pub content : String,
  }

  impl Hash for Message
  {
    #[ inline ]
    fn hash< H : Hasher >( &self, state : &mut H )
    {
      self.role.hash( state );
      self.content.hash( state );
    }
  }

  /// Token accounting, read from whichever backend served the request.
  #[ derive( Debug, Clone, Copy, Default, Serialize, Deserialize ) ]
  pub struct Usage
  {
    /// Tokens in the prompt (`prompt_eval_count` on the local server).
    #[ serde( default ) ]
    pub prompt_tokens : u32,
    /// Tokens generated (`eval_count` on the local server).
    #[ serde( default ) ]
    pub completion_tokens : u32,
    /// Sum of the two, recomputed rather than trusted from upstream.
    #[ serde( default ) ]
    pub total_tokens : u32,
  }

  impl Usage
  {
    /// Build from prompt/completion counts, deriving the total.
    #[ inline ]
    #[ must_use ]
    pub fn new( prompt_tokens : u32, completion_tokens : u32 ) -> Self
    {
      Self { prompt_tokens, completion_tokens, total_tokens : prompt_tokens + completion_tokens }
    }
  }

  /// Which backend served (or attempted to serve) a [`ModelResponse`].
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum ResponseKind
  {
    /// Served by the remote aggregator.
    Remote,
    /// Served by the local model server.
    Local,
    /// Synthesized by the `SIMULATE=1` test-only path.
    Simulated,
  }

  /// Normalized response shape returned by both the remote and local
  /// clients, cached verbatim by the Execution Flow.
  #[ derive( Debug, Clone, Serialize, Deserialize ) ]
  pub struct ModelResponse
  {
    /// Whether the call succeeded.
    pub success : bool,
    /// Generated text (empty on failure).
    pub content : String,
    /// Model identifier that actually served the request.
    pub model : String,
    /// Which backend served it.
    pub kind : ResponseKind,
    /// Token accounting.
    pub usage : Usage,
    /// Canonical error kind, present iff `success` is `false`.
    pub error : Option< ErrorKind >,
    /// Raw diagnostic detail, present iff `success` is `false`. Never
    /// shown to the end user.
    pub error_detail : Option< String >,
    /// Wall-clock time for the call, in milliseconds.
    pub elapsed_ms : u32,
  }

  impl ModelResponse
  {
    /// Build a success response.
    #[ must_use ]
    pub fn success( content : impl Into< String >, model : impl Into< String >, kind : ResponseKind, usage : Usage, elapsed_ms : u32 ) -> Self
    {
      Self
      {
        success : true,
        content : content.into(),
        model : model.into(),
        kind,
        usage,
        error : None,
        error_detail : None,
        elapsed_ms,
      }
    }

    /// Build a failure response; content is left empty by convention.
    #[ must_use ]
    pub fn failure( model : impl Into< String >, kind : ResponseKind, error : ErrorKind, detail : impl Into< String >, elapsed_ms : u32 ) -> Self
    {
      Self
      {
        success : false,
        content : String::new(),
        model : model.into(),
        kind,
        usage : Usage::default(),
        error : Some( error ),
        error_detail : Some( detail.into() ),
        elapsed_ms,
      }
    }
  }

  /// The closed set of intent labels the classifier may ever return.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
  #[ serde( rename_all = "snake_case" ) ]
  pub enum IntentLabel
  {
    /// Time/date/timezone queries, resolved in-process.
    Time,
    /// Task-management requests.
    Task,
    /// GitHub-flavored requests (out-of-scope integration, label only).
    Github,
    /// Notion-flavored requests (out-of-scope integration, label only).
    Notion,
    /// General-purpose question answering routed to a model.
    AiQuery,
    /// System status / diagnostics.
    System,
    /// Personality / tone post-processing (out-of-scope feature, label only).
    Personality,
    /// Memory recall/search (out-of-scope feature, label only).
    Memory,
    /// Local-model / offline-mode control.
    Ollama,
    /// Code generation.
    Code,
    /// Debugging assistance.
    Debug,
    /// Troubleshooting assistance.
    Troubleshoot,
    /// Documentation requests.
    Docs,
    /// Explanations.
    Explain,
    /// Trend/analysis questions.
    Trends,
    /// Content generation (copy, prose).
    Content,
    /// Technical deep-dives.
    Technical,
    /// Brainstorming.
    Brainstorm,
    /// Ethics/values questions.
    Ethics,
    /// Workflow automation requests.
    Automate,
    /// Visual/image-related requests.
    Visual,
    /// Multi-step reasoning requests.
    Reasoning,
    /// Mathematics.
    Math,
    /// Catch-all for anything resolvable but unclassified.
    General,
    /// Used when nothing scores above zero.
    Other,
  }

  impl IntentLabel
  {
    /// All labels, in the fixed order used for embedding precomputation
    /// and deterministic iteration.
    #[ must_use ]
    pub fn all() -> &'static [ IntentLabel ]
    {
      use IntentLabel::*;
      &[
        Time, Task, Github, Notion, AiQuery, System, Personality, Memory, Ollama, Code,
        Debug, Troubleshoot, Docs, Explain, Trends, Content, Technical, Brainstorm, Ethics,
        Automate, Visual, Reasoning, Math, General, Other,
      ]
    }

    /// The canonical label name, matching the `snake_case` serde form,
    /// used as the embedding "label description" text and for parsing a
    /// judge model's single-word reply.
    #[ must_use ]
    pub fn as_str( self ) -> &'static str
    {
      match self
      {
        IntentLabel::Time => "time",
        IntentLabel::Task => "task",
        IntentLabel::Github => "github",
        IntentLabel::Notion => "notion",
        IntentLabel::AiQuery => "ai_query",
        IntentLabel::System => "system",
        IntentLabel::Personality => "personality",
        IntentLabel::Memory => "memory",
        IntentLabel::Ollama => "ollama",
        IntentLabel::Code => "code",
        IntentLabel::Debug => "debug",
        IntentLabel::Troubleshoot => "troubleshoot",
        IntentLabel::Docs => "docs",
        IntentLabel::Explain => "explain",
        IntentLabel::Trends => "trends",
        IntentLabel::Content => "content",
        IntentLabel::Technical => "technical",
        IntentLabel::Brainstorm => "brainstorm",
        IntentLabel::Ethics => "ethics",
        IntentLabel::Automate => "automate",
        IntentLabel::Visual => "visual",
        IntentLabel::Reasoning => "reasoning",
        IntentLabel::Math => "math",
        IntentLabel::General => "general",
        IntentLabel::Other => "other",
      }
    }

    /// Parse a judge model's reply (first word, validated against the
    /// closed set). Returns `None` on no match, the caller falls through
    /// to the next tier.
    #[ must_use ]
    pub fn parse( word : &str ) -> Option< Self >
    {
      let normalized = word.trim().trim_matches( | c : char | !c.is_alphanumeric() && c != '_' ).to_lowercase();
      Self::all().iter().copied().find( | label | label.as_str() == normalized )
    }
  }

  /// Which side of the online/offline split a [`RoutingDecision`] resolves
  /// to.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum Via
  {
    /// Served through the remote aggregator.
    Remote,
    /// Served through the local model server.
    Local,
  }

  /// Output of the Routing Table (C6): a primary model to try, an ordered
  /// list of fallbacks, and which side of the split it resolved to.
  #[ derive( Debug, Clone, Serialize, Deserialize ) ]
  pub struct RoutingDecision
  {
    /// The model alias to try first.
    pub primary : String,
    /// Ordered fallback aliases, tried in order after `primary` is
    /// exhausted.
    pub fallbacks : Vec< String >,
    /// Which backend the primary was resolved against.
    pub via : Via,
  }

  /// The Orchestrator's public output shape (§4.10): everything the UI
  /// layer needs to render one turn.
  #[ derive( Debug, Clone, Serialize, Deserialize ) ]
  pub struct Response
  {
    /// The text to show the user.
    pub content : String,
    /// Which model (or `None` for an in-process command) produced it.
    pub model_used : Option< String >,
    /// The resolved intent, present unless a command short-circuited
    /// classification entirely.
    pub intent : Option< IntentLabel >,
    /// Wall-clock time for the whole turn, in milliseconds.
    pub elapsed_ms : u32,
    /// Set iff every layer failed; `content` then carries a user-safe
    /// message rather than a model's answer.
    pub error : Option< ErrorKind >,
    /// UI-only hints for an unmatched command (§4.9); empty on every
    /// other path. Never consulted for routing decisions.
    #[ serde( default ) ]
    pub suggestions : Vec< String >,
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    Message,
    Usage,
    ResponseKind,
    ModelResponse,
    IntentLabel,
    Via,
    RoutingDecision,
    Response,
  };
}
