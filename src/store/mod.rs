pub mod turns;
