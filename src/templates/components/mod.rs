pub mod filter_nav;
pub mod listing_card;
pub mod map_panel;
pub mod status_panel;

pub use filter_nav::filter_nav;
pub use listing_card::listing_card;
pub use map_panel::map_panel;
pub use status_panel::status_panel;
