pub mod enums;
pub mod facility;
pub mod location;
pub mod triage;

pub use enums::*;
pub use facility::*;
pub use location::*;
pub use triage::*;
