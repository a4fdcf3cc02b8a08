mod attr;
mod converter;
mod error;
mod ids;
mod input;
mod output;
mod pgm;
mod switch;
mod table;
mod tap;
mod winding;

pub mod debug;

pub use attr::*;
pub use converter::*;
pub use error::*;
pub use ids::*;
pub use input::*;
pub use output::*;
pub use pgm::*;
pub use switch::*;
pub use table::*;
pub use tap::*;
pub use winding::*;
