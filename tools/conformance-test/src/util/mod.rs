/*!
   Utility functions and types used across the harness.
*/

pub mod assert;
pub mod mutex;
pub mod random;
pub mod task_group;
