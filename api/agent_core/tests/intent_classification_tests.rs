//! Intent Classifier (C5): Tier 0 patterns, Tier 1 embedding shape,
//! Tier 4 keyword scoring, and the `sequence_ratio` fuzzy-match helper.
//! Tiers 2/3 (remote/local judge) need a `ModelClient` double and are
//! left to the orchestrator-level tests.

#![ cfg( feature = "enabled" ) ]

use agent_core::{ Classification, ClassificationTier, IntentClassifier, IntentLabel, sequence_ratio };

#[ test ]
fn sequence_ratio_is_one_for_identical_strings()
{
  assert!( ( sequence_ratio( "ollama", "ollama" ) - 1.0 ).abs() < f64::EPSILON );
}

#[ test ]
fn sequence_ratio_is_zero_for_completely_disjoint_strings()
{
  assert!( sequence_ratio( "abc", "xyz" ) < 0.1 );
}

#[ test ]
fn sequence_ratio_of_two_empty_strings_is_one()
{
  assert!( ( sequence_ratio( "", "" ) - 1.0 ).abs() < f64::EPSILON );
}

#[ test ]
fn sequence_ratio_tolerates_a_single_typo()
{
  // "olama" vs "ollama": one dropped letter, well above the 0.8 fuzzy
  // acceptance threshold used by Tier 4.
  assert!( sequence_ratio( "olama", "ollama" ) >= 0.8 );
}

#[ test ]
fn tier0_pattern_matches_ollama_commands()
{
  let classifier = IntentClassifier::new();
  assert_eq!( classifier.match_pattern( "ollama status" ), Some( IntentLabel::Ollama ) );
  assert_eq!( classifier.match_pattern( "ollama pull phi3" ), Some( IntentLabel::Ollama ) );
}

#[ test ]
fn tier0_pattern_matches_ai_query_prefix()
{
  let classifier = IntentClassifier::new();
  assert_eq!( classifier.match_pattern( "ask phi what is rust ownership" ), Some( IntentLabel::AiQuery ) );
}

#[ test ]
fn tier0_pattern_is_none_for_unrelated_text()
{
  let classifier = IntentClassifier::new();
  assert_eq!( classifier.match_pattern( "write me a short poem about the sea" ), None );
}

#[ test ]
fn embed_detail_ranks_the_closest_label_first()
{
  let classifier = IntentClassifier::new();
  let detail = classifier.embed_detail( "what time is it right now" );
  assert_eq!( detail.top_k.len(), 3 );
  assert_eq!( detail.top_k[ 0 ].0, IntentLabel::Time );
}

#[ test ]
fn match_embedding_is_none_below_threshold_and_some_above_it()
{
  let classifier = IntentClassifier::new();
  let text = "what time is it right now";
  assert!( classifier.match_embedding( text, 2.0 ).is_none() );
  let best_score = classifier.embed_detail( text ).top_k[ 0 ].1;
  assert!( classifier.match_embedding( text, best_score - 0.001 ).is_some() );
}

#[ test ]
fn classify_keyword_resolves_exact_keyword_matches()
{
  let classifier = IntentClassifier::new();
  assert_eq!( classifier.classify_keyword( "add a task to my todo list" ), IntentLabel::Task );
  assert_eq!( classifier.classify_keyword( "remember this for later" ), IntentLabel::Memory );
}

#[ test ]
fn classify_keyword_falls_back_to_other_when_nothing_scores()
{
  let classifier = IntentClassifier::new();
  assert_eq!( classifier.classify_keyword( "xyzzy plugh qux" ), IntentLabel::Other );
}

#[ tokio::test ]
async fn classify_resolves_via_pattern_tier_without_any_judge()
{
  let classifier = IntentClassifier::new();
  let result : Classification = classifier.classify( "ollama status", None, None, true, 10.0 ).await;
  assert_eq!( result.label, IntentLabel::Ollama );
  assert_eq!( result.tier, ClassificationTier::Pattern );
}

#[ tokio::test ]
async fn classify_falls_through_to_keyword_tier_when_no_judge_is_available()
{
  let classifier = IntentClassifier::new();
  // Below any plausible embedding score, forcing Tier 4.
  let result = classifier.classify( "todo add buy milk", None, None, false, 10.0 ).await;
  assert_eq!( result.tier, ClassificationTier::Keyword );
  assert_eq!( result.label, IntentLabel::Task );
}

#[ test ]
fn current_embed_threshold_lowers_under_memory_pressure()
{
  let classifier = IntentClassifier::new();
  let low_pressure = classifier.current_embed_threshold( 10.0 );
  let classifier2 = IntentClassifier::new();
  let high_pressure = classifier2.current_embed_threshold( 90.0 );
  assert!( high_pressure < low_pressure );
}

#[ test ]
fn parse_judge_reply_accepts_a_known_label_and_rejects_garbage()
{
  assert_eq!( IntentClassifier::parse_judge_reply( "task some trailing words" ), Some( IntentLabel::Task ) );
  assert_eq!( IntentClassifier::parse_judge_reply( "not_a_label" ), None );
}
