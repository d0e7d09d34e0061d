/*!
   The conformance framework: scenarios, the phases they go through, and
   the runner that sequences them.
*/

pub mod balance;
pub mod chain_pair;
pub mod poll;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod transfer;
