pub mod category;
pub mod movie;
pub mod movie_category;
pub mod order;
pub mod order_history;
pub mod order_item;
pub mod session;
pub mod user;
pub mod watchlist;
