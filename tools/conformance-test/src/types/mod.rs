/*!
   Types used by the conformance harness.
*/

pub mod amount;
pub mod channel;
pub mod config;
pub mod id;
pub mod packet;
pub mod timeout;
pub mod transfer;
pub mod wallet;
