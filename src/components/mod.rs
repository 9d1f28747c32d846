pub mod alert;
pub mod header;
pub mod review_card;
pub mod tour_card;

/// Public path of a user's photo, falling back to the stock portrait.
pub fn user_photo(photo: Option<&str>) -> String {
    format!("/img/users/{}", photo.unwrap_or("default.jpg"))
}
