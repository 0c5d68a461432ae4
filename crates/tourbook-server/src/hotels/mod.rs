//! Hotel listing and detail read paths, fronted by the query cache.

pub mod routes;
pub mod source;

pub use routes::{get_hotel, list_hotels, list_locations};
pub use source::{HotelPage, HotelQuery, HotelSource, InMemoryHotelSource, LocationCount};
