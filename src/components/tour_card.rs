use leptos::*;

use crate::models::Tour;

/// Summary card on the overview and my-tours grids.
#[component]
pub fn TourCard(tour: Tour) -> impl IntoView {
    let cover = tour
        .image_cover
        .clone()
        .unwrap_or_else(|| "/img/tours/default.jpg".to_string());
    let start = tour
        .start_location
        .as_ref()
        .and_then(|location| location.description.clone())
        .unwrap_or_default();
    let next_date = tour
        .start_dates
        .first()
        .cloned()
        .unwrap_or_else(|| "Dates to be announced".to_string());

    view! {
        <div class="card">
            <div class="card__header">
                <div class="card__picture">
                    <div class="card__picture-overlay">{ " " }</div>
                    <img src=cover alt=tour.name.clone() class="card__picture-img"/>
                </div>
                <h3 class="heading-tertirary">
                    <span>{ tour.name.clone() }</span>
                </h3>
            </div>
            <div class="card__details">
                <h4 class="card__sub-heading">
                    { format!("{} {}-day tour", tour.difficulty, tour.duration) }
                </h4>
                <p class="card__text">{ tour.summary.clone() }</p>
                <div class="card__data"><span>{ start }</span></div>
                <div class="card__data"><span>{ next_date }</span></div>
                <div class="card__data">
                    <span>{ format!("{} stops", tour.locations.len()) }</span>
                </div>
                <div class="card__data">
                    <span>{ format!("{} people", tour.max_group_size) }</span>
                </div>
            </div>
            <div class="card__footer">
                <p>
                    <span class="card__footer-value">{ format!("${}", tour.price) }</span>
                    <span class="card__footer-text">{ " per person" }</span>
                </p>
                <p class="card__ratings">
                    <span class="card__footer-value">
                        { format!("{:.1}", tour.ratings_average) }
                    </span>
                    <span class="card__footer-text">
                        { format!(" rating ({})", tour.ratings_quantity) }
                    </span>
                </p>
                <a href=format!("/tour/{}", tour.slug) class="btn btn--green btn--small">
                    { "Details" }
                </a>
            </div>
        </div>
    }
}
