use leptos::*;

use crate::{components::user_photo, models::ReviewWithAuthor};

#[component]
pub fn ReviewCard(review: ReviewWithAuthor) -> impl IntoView {
    let (author, photo) = match &review.user {
        Some(user) => (user.name.clone(), user_photo(user.photo.as_deref())),
        None => ("Former traveller".to_string(), user_photo(None)),
    };
    let rating = review.review.rating;

    view! {
        <div class="reviews__card">
            <div class="reviews__avatar">
                <img src=photo alt=author.clone() class="reviews__avatar-img"/>
                <h6 class="reviews__user">{ author.clone() }</h6>
            </div>
            <p class="reviews__text">{ review.review.review.clone() }</p>
            <div class="reviews__rating">
                {
                    (1..=5).map(|star| {
                        let state = if rating >= f64::from(star) { "active" } else { "inactive" };
                        view! {
                            <span class=format!("reviews__star reviews__star--{state}")>{ "★" }</span>
                        }
                    }).collect::<Vec<_>>()
                }
            </div>
        </div>
    }
}
