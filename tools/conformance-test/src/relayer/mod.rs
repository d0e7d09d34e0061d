/*!
   Relayers under test.
*/

pub mod capability;
pub mod channel;
pub mod handle;
