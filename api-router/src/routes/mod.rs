pub mod probes;
pub mod search;
