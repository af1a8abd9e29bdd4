pub mod consultation;
pub mod enums;
pub mod lexicon;
pub mod medication;
pub mod result;
pub mod term;

pub use consultation::*;
pub use enums::*;
pub use lexicon::*;
pub use medication::*;
pub use result::*;
pub use term::*;
