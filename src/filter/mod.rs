pub mod session;
pub mod state;

pub use session::{FilterSession, SessionHandle, ViewSnapshot};
pub use state::{Applied, FetchTicket, FilterError, FilterState, LoadStatus, Phase};
