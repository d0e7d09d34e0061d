pub mod denom;
