pub mod api;
pub mod cart;
pub mod product;
pub mod wishlist;
