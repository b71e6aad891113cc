pub mod answers;
pub mod derivation;
pub mod tables;
