//! Intent Classifier (C5): a five-tier pipeline — explicit regex
//! patterns, embedding similarity, remote judge, local judge, keyword
//! scoring — that always resolves to a single [`IntentLabel`]. Grounded
//! on `original_source/utils/intent_handler.py` (`IntentHandler.classify`)
//! for the Tier 0 patterns, the keyword table, and the fuzzy-match
//! boosts, and on `original_source/utils/minilm_classifier.py` for the
//! embedding threshold and top-k shape.

#[ cfg( feature = "enabled" ) ]
mod private
{
  use crate::client::ModelClient;
  use crate::model::IntentLabel;
  use regex::Regex;
  use std::collections::HashMap;
  use std::sync::Mutex;
  use std::time::{ Duration, Instant };

  /// Default acceptance threshold for Tier 1 embedding similarity.
  pub const DEFAULT_EMBED_THRESHOLD : f64 = 0.65;
  /// How long a Tier 2 (text → label) judge result is cached.
  pub const JUDGE_CACHE_SECS : u64 = 3600;
  /// How often the dynamic threshold is allowed to be recomputed.
  const THRESHOLD_RECHECK_SECS : u64 = 60;
  /// Minimum word length considered for fuzzy keyword matching.
  const FUZZY_MIN_WORD_LEN : usize = 3;
  /// Acceptance threshold for a fuzzy keyword match.
  const FUZZY_THRESHOLD : f64 = 0.8;

  /// One tier of the pipeline that actually produced the final label, kept
  /// for diagnostics and testing — not part of the spec's external shape.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum ClassificationTier
  {
    /// Tier 0: explicit regex pattern.
    Pattern,
    /// Tier 1: embedding similarity.
    Embedding,
    /// Tier 2: remote judge.
    RemoteJudge,
    /// Tier 3: local judge.
    LocalJudge,
    /// Tier 4: keyword scoring.
    Keyword,
  }

  /// Classification result: the label plus which tier resolved it.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub struct Classification
  {
    /// The resolved label. Never absent.
    pub label : IntentLabel,
    /// Which tier produced it.
    pub tier : ClassificationTier,
  }

  /// Top-k view of Tier 1's embedding scores, used by Tier 2 as a
  /// fallback hint and for diagnostics.
  #[ derive( Debug, Clone ) ]
  pub struct EmbeddingDetail
  {
    /// `(label, cosine similarity)` pairs, highest first.
    pub top_k : Vec< ( IntentLabel, f64 ) >,
  }

  struct PatternRule
  {
    regex : Regex,
    label : IntentLabel,
  }

  fn tier0_patterns() -> Vec< PatternRule >
  {
    // Ordered; first match wins, mirroring the original's sequential
    // `if re.search(...)` chain.
    let specs : &[ ( &str, IntentLabel ) ] = &[
      ( r"(?i)^\s*(?:ask|query|use)\s+\w+\s+", IntentLabel::AiQuery ),
      ( r"(?i)^\s*(?:launch|open|show|display|start)\s+(?:cli|ui|dashboard|interface)", IntentLabel::System ),
      ( r"(?i)^\s*(?:search|save to|recall|show recent|show|get)\s+(?:memory|memories)", IntentLabel::Memory ),
      ( r"(?i)^\s*(?:show|adjust)\s+personality", IntentLabel::Personality ),
      ( r"(?i)^\s*(?:show|display|get)\s+(?:system|status)", IntentLabel::System ),
      ( r"(?i)^\s*system\s+(?:status|info|health)", IntentLabel::System ),
      ( r"(?i)^\s*ollama\s+(?:on|off|status|pull)", IntentLabel::Ollama ),
      ( r"(?i)^\s*(?:enable|disable|toggle)\s+offline\s+mode", IntentLabel::Ollama ),
    ];
    specs
    .iter()
    .map( | ( pattern, label ) | PatternRule { regex : Regex::new( pattern ).expect( "pattern is a fixed valid regex" ), label : *label } )
    .collect()
  }

  fn stopwords() -> &'static [ &'static str ]
  {
    &[
      "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "with",
      "is", "am", "are", "was", "were", "be", "been", "being", "have", "has", "had",
      "do", "does", "did", "i", "you", "he", "she", "it", "we", "they", "my", "your",
      "his", "her", "its", "our", "their", "me", "him", "us", "them",
    ]
  }

  fn default_keywords() -> HashMap< IntentLabel, Vec< &'static str > >
  {
    HashMap::from( [
      ( IntentLabel::Task, vec![ "task", "todo", "to-do", "to do", "list", "add", "create", "show", "display", "update", "edit", "complete", "finish", "goal", "goals" ] ),
      ( IntentLabel::Time, vec![ "time", "date", "day", "hour", "minute", "today", "tomorrow", "yesterday", "timezone", "clock" ] ),
      ( IntentLabel::Github, vec![ "github", "repo", "repository", "commit", "issue", "pull request", "pr", "branch", "merge", "code" ] ),
      ( IntentLabel::Notion, vec![ "notion", "document", "page", "journal", "entry", "note", "notes" ] ),
      ( IntentLabel::AiQuery, vec![ "ask", "query", "claude", "grok", "deepseek", "gemini", "ai", "model", "question", "llama", "mistral", "openai", "gpt", "anthropic", "openrouter", "main_brain" ] ),
      ( IntentLabel::System, vec![ "help", "exit", "quit", "stop", "restart", "system", "status", "cli", "ui", "dashboard", "interface", "launch", "open", "start", "vitals", "health", "check" ] ),
      ( IntentLabel::Personality, vec![ "personality", "trait", "traits", "adjust", "character", "mood", "style", "tone" ] ),
      ( IntentLabel::Memory, vec![ "memory", "remember", "recall", "forget", "search", "save", "store" ] ),
      ( IntentLabel::Ollama, vec![ "ollama", "offline", "local", "toggle", "status", "on", "off", "enable", "disable" ] ),
    ] )
  }

  /// Ratio similarity between two strings, in `[0.0, 1.0]`, computed from
  /// the length of their longest common subsequence — a stand-in for
  /// Python's `difflib.SequenceMatcher.ratio()` that needs no extra
  /// dependency.
  #[ must_use ]
  #[ allow( clippy::cast_precision_loss ) ]
  pub fn sequence_ratio( a : &str, b : &str ) -> f64
  {
    let a_chars : Vec< char > = a.chars().collect();
    let b_chars : Vec< char > = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty()
    {
      return 1.0;
    }
    let lcs = longest_common_subsequence( &a_chars, &b_chars );
    ( 2.0 * lcs as f64 ) / ( a_chars.len() + b_chars.len() ) as f64
  }

  fn longest_common_subsequence( a : &[ char ], b : &[ char ] ) -> usize
  {
    let mut table = vec![ vec![ 0_usize; b.len() + 1 ]; a.len() + 1 ];
    for i in 0..a.len()
    {
      for j in 0..b.len()
      {
        table[ i + 1 ][ j + 1 ] = if a[ i ] == b[ j ]
        {
          table[ i ][ j ] + 1
        }
        else
        {
          table[ i ][ j + 1 ].max( table[ i + 1 ][ j ] )
        };
      }
    }
    table[ a.len() ][ b.len() ]
  }

  fn tokenize( text : &str ) -> Vec< String >
  {
    text
    .to_lowercase()
    .split( | c : char | !c.is_alphanumeric() )
    .filter( | w | !w.is_empty() )
    .map( str::to_string )
    .collect()
  }

  /// A hashed bag-of-words vector standing in for a real sentence-embedding
  /// model: `§4.5`'s "small sentence-embedding model loaded once" is
  /// outside this workspace's dependency set, so the query and each
  /// label's description are projected into the same fixed-size bucket
  /// space and compared by cosine similarity — the same contract Tier 1
  /// needs (symmetric, deterministic, normalized) without a model file.
  const EMBED_DIM : usize = 128;

  fn hashed_embedding( text : &str ) -> [ f64; EMBED_DIM ]
  {
    let mut vector = [ 0.0_f64; EMBED_DIM ];
    for token in tokenize( text )
    {
      let mut hasher = std::collections::hash_map::DefaultHasher::new();
      core::hash::Hash::hash( &token, &mut hasher );
      #[ allow( clippy::cast_possible_truncation ) ]
      let bucket = ( core::hash::Hasher::finish( &hasher ) % EMBED_DIM as u64 ) as usize;
      vector[ bucket ] += 1.0;
    }
    let norm = vector.iter().map( | v | v * v ).sum::< f64 >().sqrt();
    if norm > 0.0
    {
      for v in &mut vector
      {
        *v /= norm;
      }
    }
    vector
  }

  fn cosine_similarity( a : &[ f64; EMBED_DIM ], b : &[ f64; EMBED_DIM ] ) -> f64
  {
    a.iter().zip( b.iter() ).map( | ( x, y ) | x * y ).sum()
  }

  fn label_description( label : IntentLabel ) -> &'static str
  {
    match label
    {
      IntentLabel::Time => "current time date day hour timezone",
      IntentLabel::Task => "task todo list add create track goal",
      IntentLabel::Github => "github repository commit issue pull request branch",
      IntentLabel::Notion => "notion document page note journal entry",
      IntentLabel::AiQuery => "ask a model a question using ai",
      IntentLabel::System => "system status help exit launch dashboard",
      IntentLabel::Personality => "personality trait character mood tone",
      IntentLabel::Memory => "remember recall search save memory",
      IntentLabel::Ollama => "ollama offline local toggle enable disable",
      IntentLabel::Code => "write or edit source code in a programming language",
      IntentLabel::Debug => "debug diagnose a failing program or stack trace",
      IntentLabel::Troubleshoot => "troubleshoot fix a broken system or configuration",
      IntentLabel::Docs => "write or look up documentation",
      IntentLabel::Explain => "explain or clarify a concept",
      IntentLabel::Trends => "analyze trends or patterns over time",
      IntentLabel::Content => "draft written content such as an article or post",
      IntentLabel::Technical => "answer a technical question",
      IntentLabel::Brainstorm => "brainstorm ideas or options",
      IntentLabel::Ethics => "discuss an ethical question or tradeoff",
      IntentLabel::Automate => "automate a repetitive task or workflow",
      IntentLabel::Visual => "generate or describe an image or visual",
      IntentLabel::Reasoning => "reason step by step through a problem",
      IntentLabel::Math => "solve a mathematics problem",
      IntentLabel::General => "a general purpose conversational query",
      IntentLabel::Other => "none of the above",
    }
  }

  struct JudgeCacheEntry
  {
    label : IntentLabel,
    recorded_at : Instant,
  }

  struct ThresholdCache
  {
    last_checked : Option< Instant >,
    embed_threshold : f64,
  }

  /// Owns the precomputed label embeddings and the Tier 2 judge cache.
  /// Constructed once per process, shared behind an `Arc`.
  pub struct IntentClassifier
  {
    patterns : Vec< PatternRule >,
    label_embeddings : Vec< ( IntentLabel, [ f64; EMBED_DIM ] ) >,
    keywords : HashMap< IntentLabel, Vec< &'static str > >,
    judge_cache : Mutex< HashMap< String, JudgeCacheEntry > >,
    threshold : Mutex< ThresholdCache >,
  }

  impl core::fmt::Debug for IntentClassifier
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "IntentClassifier" ).finish_non_exhaustive()
    }
  }

  impl Default for IntentClassifier
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  impl IntentClassifier
  {
    /// Precompute label embeddings and compile Tier 0 patterns.
    #[ must_use ]
    pub fn new() -> Self
    {
      let label_embeddings = IntentLabel::all().iter().map( | label | ( *label, hashed_embedding( label_description( *label ) ) ) ).collect();
      Self
      {
        patterns : tier0_patterns(),
        label_embeddings,
        keywords : default_keywords(),
        judge_cache : Mutex::new( HashMap::new() ),
        threshold : Mutex::new( ThresholdCache { last_checked : None, embed_threshold : DEFAULT_EMBED_THRESHOLD } ),
      }
    }

    /// Tier 0: first matching regex wins.
    #[ must_use ]
    pub fn match_pattern( &self, text : &str ) -> Option< IntentLabel >
    {
      self.patterns.iter().find( | rule | rule.regex.is_match( text ) ).map( | rule | rule.label )
    }

    /// Tier 1: cosine similarity against precomputed label embeddings,
    /// returning the full ranked top-k view.
    #[ must_use ]
    pub fn embed_detail( &self, text : &str ) -> EmbeddingDetail
    {
      let query = hashed_embedding( text );
      let mut scored : Vec< ( IntentLabel, f64 ) > = self.label_embeddings.iter().map( | ( label, emb ) | ( *label, cosine_similarity( &query, emb ) ) ).collect();
      scored.sort_by( | a, b | b.1.partial_cmp( &a.1 ).unwrap_or( core::cmp::Ordering::Equal ) );
      scored.truncate( 3 );
      EmbeddingDetail { top_k : scored }
    }

    /// Tier 1 acceptance: best score must clear `threshold`.
    #[ must_use ]
    pub fn match_embedding( &self, text : &str, threshold : f64 ) -> Option< ( IntentLabel, EmbeddingDetail ) >
    {
      let detail = self.embed_detail( text );
      let best = detail.top_k.first().copied();
      match best
      {
        Some( ( label, score ) ) if score >= threshold => Some( ( label, detail ) ),
        _ => None,
      }
    }

    /// Dynamic `θ_embed`: lowered under high memory pressure so more
    /// requests resolve without reaching tier 2/3. Rechecked at most
    /// every [`THRESHOLD_RECHECK_SECS`].
    #[ must_use ]
    pub fn current_embed_threshold( &self, memory_percent_used : f64 ) -> f64
    {
      let mut guard = self.threshold.lock().expect( "threshold mutex poisoned" );
      let stale = guard.last_checked.is_none_or( | t | t.elapsed() >= Duration::from_secs( THRESHOLD_RECHECK_SECS ) );
      if stale
      {
        guard.embed_threshold = if memory_percent_used >= 85.0
        {
          DEFAULT_EMBED_THRESHOLD - 0.15
        }
        else if memory_percent_used >= 70.0
        {
          DEFAULT_EMBED_THRESHOLD - 0.08
        }
        else
        {
          DEFAULT_EMBED_THRESHOLD
        };
        guard.last_checked = Some( Instant::now() );
      }
      guard.embed_threshold
    }

    /// Tier 2/3 prompt: a strict instruction asking for a single intent
    /// word from the closed set.
    #[ must_use ]
    pub fn judge_prompt( text : &str ) -> String
    {
      let labels : Vec< &str > = IntentLabel::all().iter().map( | l | l.as_str() ).collect();
      format!(
        "Classify the following user message into exactly one of these intents: {}.\nRespond with only the single intent word, nothing else.\n\nMessage: {text}",
        labels.join( ", " )
      )
    }

    /// Parses the first word of a judge reply and validates it against
    /// the closed label set.
    #[ must_use ]
    pub fn parse_judge_reply( reply : &str ) -> Option< IntentLabel >
    {
      let first_word = reply.split_whitespace().next()?;
      IntentLabel::parse( first_word )
    }

    fn cached_judge( &self, text : &str ) -> Option< IntentLabel >
    {
      let guard = self.judge_cache.lock().expect( "judge cache mutex poisoned" );
      guard
      .get( text )
      .filter( | entry | entry.recorded_at.elapsed() < Duration::from_secs( JUDGE_CACHE_SECS ) )
      .map( | entry | entry.label )
    }

    fn cache_judge( &self, text : &str, label : IntentLabel )
    {
      let mut guard = self.judge_cache.lock().expect( "judge cache mutex poisoned" );
      guard.insert( text.to_string(), JudgeCacheEntry { label, recorded_at : Instant::now() } );
    }

    /// Tier 2: ask a remote model for a label, skipped entirely when
    /// `online` is `false`. Cached by exact text for
    /// [`JUDGE_CACHE_SECS`].
    pub async fn judge_remote( &self, text : &str, client : &dyn ModelClient, model : &str, online : bool ) -> Option< IntentLabel >
    {
      if !online
      {
        return None;
      }
      if let Some( cached ) = self.cached_judge( text )
      {
        return Some( cached );
      }
      let response = client.generate( &Self::judge_prompt( text ), model, None, 0.0, 16 ).await;
      if !response.success
      {
        return None;
      }
      let label = Self::parse_judge_reply( &response.content )?;
      self.cache_judge( text, label );
      Some( label )
    }

    /// Tier 3: same strict prompt against the local judge model.
    pub async fn judge_local( &self, text : &str, client : &dyn ModelClient, model : &str ) -> Option< IntentLabel >
    {
      if let Some( cached ) = self.cached_judge( text )
      {
        return Some( cached );
      }
      let response = client.generate( &Self::judge_prompt( text ), model, None, 0.0, 16 ).await;
      if !response.success
      {
        return None;
      }
      let label = Self::parse_judge_reply( &response.content )?;
      self.cache_judge( text, label );
      Some( label )
    }

    /// Tier 4: exact + fuzzy keyword scoring with affinity boosts,
    /// `other` if every score is zero.
    #[ must_use ]
    pub fn classify_keyword( &self, text : &str ) -> IntentLabel
    {
      let lowered = text.to_lowercase();
      let stop : std::collections::HashSet< &str > = stopwords().iter().copied().collect();
      let words : std::collections::HashSet< String > = tokenize( &lowered ).into_iter().filter( | w | !stop.contains( w.as_str() ) ).collect();

      let mut best : Option< ( IntentLabel, f64 ) > = None;
      for ( label, keywords ) in &self.keywords
      {
        let exact : std::collections::HashSet< &String > = words.iter().filter( | w | keywords.contains( &w.as_str() ) ).collect();
        let mut score = exact.len() as f64;

        for word in words.iter().filter( | w | !exact.contains( w ) && w.len() >= FUZZY_MIN_WORD_LEN )
        {
          for keyword in keywords
          {
            let ratio = sequence_ratio( word, keyword );
            if ratio >= FUZZY_THRESHOLD
            {
              score += ratio;
            }
          }
        }

        score += affinity_boost( *label, &lowered, score );

        if best.is_none_or( | ( _, best_score ) | score > best_score )
        {
          best = Some( ( *label, score ) );
        }
      }

      match best
      {
        Some( ( label, score ) ) if score > 0.0 => label,
        _ => IntentLabel::Other,
      }
    }

    /// Runs the full pipeline in tier order, invoking `online` judges as
    /// needed. `memory_percent_used` drives the dynamic threshold.
    pub async fn classify(
      &self,
      text : &str,
      remote : Option< ( &dyn ModelClient, &str ) >,
      local : Option< ( &dyn ModelClient, &str ) >,
      online : bool,
      memory_percent_used : f64,
    ) -> Classification
    {
      if let Some( label ) = self.match_pattern( text )
      {
        return Classification { label, tier : ClassificationTier::Pattern };
      }

      let threshold = self.current_embed_threshold( memory_percent_used );
      if let Some( ( label, _detail ) ) = self.match_embedding( text, threshold )
      {
        return Classification { label, tier : ClassificationTier::Embedding };
      }

      if let Some( ( client, model ) ) = remote
      {
        if let Some( label ) = self.judge_remote( text, client, model, online ).await
        {
          return Classification { label, tier : ClassificationTier::RemoteJudge };
        }
      }

      if let Some( ( client, model ) ) = local
      {
        if let Some( label ) = self.judge_local( text, client, model ).await
        {
          return Classification { label, tier : ClassificationTier::LocalJudge };
        }
      }

      Classification { label : self.classify_keyword( text ), tier : ClassificationTier::Keyword }
    }
  }

  /// Small additive boosts for well-known label → keyword affinities,
  /// applied on top of the raw exact/fuzzy score. Mirrors the original's
  /// hand-tuned per-intent `score += N.0` branches.
  fn affinity_boost( label : IntentLabel, lowered_text : &str, current_score : f64 ) -> f64
  {
    match label
    {
      IntentLabel::AiQuery if [ "main_brain", "gemini", "claude", "deepseek", "grok", "llama", "mistral" ].iter().any( | m | lowered_text.contains( m ) ) => 3.0,
      IntentLabel::Memory if [ "memory", "remember", "recall", "search", "save" ].iter().any( | w | lowered_text.contains( w ) ) => 3.0,
      IntentLabel::Personality if [ "personality", "trait", "adjust", "show" ].iter().any( | w | lowered_text.contains( w ) ) => 3.0,
      IntentLabel::Ollama if [ "ollama", "offline", "local" ].iter().any( | w | lowered_text.contains( w ) ) => 3.0,
      IntentLabel::Task if current_score > 0.0 => 2.0,
      IntentLabel::Time if lowered_text.contains( "date" ) => 2.0,
      IntentLabel::Notion if lowered_text.contains( "document" ) || lowered_text.contains( "doc" ) => 2.0,
      _ => 0.0,
    }
  }
}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  exposed use
  {
    DEFAULT_EMBED_THRESHOLD,
    JUDGE_CACHE_SECS,
    ClassificationTier,
    Classification,
    EmbeddingDetail,
    IntentClassifier,
    sequence_ratio,
  };
}
