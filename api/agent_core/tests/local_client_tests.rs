//! Local Model Client (C4): CPU-only fallback gating.

#![ cfg( feature = "enabled" ) ]

use agent_core::cpu_only_options;

#[ test ]
fn below_six_gib_free_appends_num_gpu_zero()
{
  let options = cpu_only_options( Some( 4.0 ) ).expect( "low memory should trigger the CPU-only option" );
  assert_eq!( options, serde_json::json!( { "num_gpu" : 0 } ) );
}

#[ test ]
fn at_or_above_six_gib_free_adds_no_options()
{
  assert!( cpu_only_options( Some( 6.0 ) ).is_none() );
  assert!( cpu_only_options( Some( 16.0 ) ).is_none() );
}

#[ test ]
fn an_unknown_memory_reading_adds_no_options()
{
  assert!( cpu_only_options( None ).is_none() );
}
