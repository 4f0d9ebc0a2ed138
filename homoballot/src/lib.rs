#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

#[macro_use]
mod util;

mod audit;
mod authority;
mod ballot;
mod capability;
mod commitment;
mod election;
mod error;
mod event;
mod ledger;
mod paillier;
mod publisher;
mod registry;
mod serde_formats;
mod tally;

pub use audit::*;
pub use authority::*;
pub use ballot::*;
pub use capability::*;
pub use commitment::*;
pub use election::*;
pub use error::*;
pub use event::*;
pub use ledger::*;
pub use paillier::*;
pub use publisher::*;
pub use registry::*;
pub use serde_formats::*;
pub use tally::*;
pub use util::*;
