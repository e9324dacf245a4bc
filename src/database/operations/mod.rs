pub mod key_results;
pub mod objectives;

pub use key_results::*;
pub use objectives::*;
