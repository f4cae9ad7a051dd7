pub mod categories;
pub mod favorites;
pub mod movies;
pub mod users;

pub use categories::CategoryRepo;
pub use favorites::FavoriteRepo;
pub use movies::MovieRepo;
pub use users::{NewUser, UserRepo};
