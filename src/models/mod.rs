pub mod inputs;
pub mod key_result;
pub mod objective;
pub mod overview;

pub use inputs::*;
pub use key_result::*;
pub use objective::*;
pub use overview::*;
