/*!
   Chains under test and helpers to interact with them.
*/

pub mod blocks;
pub mod handle;
pub mod users;
