pub mod booking;
pub mod review;
pub mod shortlist;
pub mod tour;
pub mod user;

pub use booking::{Booking, BookingWithTour};
pub use review::{Review, ReviewWithAuthor};
pub use shortlist::{ShortlistEntry, ShortlistKind};
pub use tour::{Difficulty, Tour};
pub use user::{Role, User};
