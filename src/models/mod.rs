mod facility;
mod resident;
mod transaction;
mod user;

pub use facility::*;
pub use resident::*;
pub use transaction::*;
pub use user::*;
