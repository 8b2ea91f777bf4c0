pub mod compensation;
