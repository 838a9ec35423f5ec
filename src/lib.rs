pub mod alternative;
pub mod analysis;
pub mod config;
pub mod consensus;
pub mod coupon;
pub mod demo_feed;
pub mod feed;
pub mod http_client;
pub mod markets;
pub mod odds;
pub mod picks;
pub mod primary;
pub mod state;
pub mod ticket;
pub mod upcoming;
pub mod value;
