pub mod feed;
pub mod profiles;
pub mod recipes;
pub mod tags;
pub mod users;

pub use feed::*;
pub use profiles::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
