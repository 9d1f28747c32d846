use leptos::*;
use leptos_meta::Title;
use leptos_router::use_params_map;

use super::{error_text, loading, query_param};
use crate::{
    components::{
        alert::{Alert, ErrorMessage},
        review_card::ReviewCard,
        user_photo,
    },
    models::{Role, User},
    server_fns::{current_user, get_tour_details, TourDetails},
};

#[component]
pub fn TourPage() -> impl IntoView {
    let params = use_params_map();
    let slug = move || params.with(|params| params.get("slug").cloned().unwrap_or_default());
    let details = create_resource(slug, get_tour_details);
    let user = create_resource(|| (), |_| current_user());
    let error = query_param("error");

    view! {
        { error.map(|message| view! { <Alert kind="error" message=message/> }) }
        <Suspense fallback=loading>
            {move || match (details.get(), user.get()) {
                (Some(Ok(details)), Some(user)) => {
                    let user = user.ok().flatten();
                    view! { <TourDetail details=details user=user/> }.into_view()
                }
                (Some(Err(e)), _) => view! {
                    <Title text="Something went wrong"/>
                    <main class="main"><ErrorMessage message=error_text(&e)/></main>
                }.into_view(),
                _ => ().into_view(),
            }}
        </Suspense>
    }
}

fn guide_label(role: Role) -> &'static str {
    match role {
        Role::LeadGuide => "Lead guide",
        _ => "Tour guide",
    }
}

#[component]
fn TourDetail(details: TourDetails, user: Option<User>) -> impl IntoView {
    let TourDetails {
        tour,
        guides,
        reviews,
    } = details;

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
        .unwrap_or_else(|| "To be announced".to_string());

    let paragraphs = tour
        .description
        .split('\n')
        .filter(|paragraph| !paragraph.trim().is_empty())
        .map(|paragraph| view! { <p class="description__text">{ paragraph.to_string() }</p> })
        .collect::<Vec<_>>();

    let pictures = tour
        .images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            view! {
                <div class="picture-box">
                    <img
                        class=format!("picture-box__img picture-box__img--{}", i + 1)
                        src=image.clone()
                        alt=format!("{} tour {}", tour.name, i + 1)
                    />
                </div>
            }
        })
        .collect::<Vec<_>>();

    let guide_list = guides
        .into_iter()
        .map(|guide| {
            view! {
                <div class="overview-box__detail">
                    <img
                        src=user_photo(guide.photo.as_deref())
                        alt=guide.name.clone()
                        class="overview-box__img"
                    />
                    <span class="overview-box__label">{ guide_label(guide.role) }</span>
                    <span class="overview-box__text">{ guide.name.clone() }</span>
                </div>
            }
        })
        .collect::<Vec<_>>();

    let review_cards = reviews
        .into_iter()
        .map(|review| view! { <ReviewCard review=review/> })
        .collect::<Vec<_>>();

    let booking = match user {
        Some(_) => view! {
            <form method="post" action=format!("/tour/{}/book", tour.slug)>
                <button type="submit" class="btn btn--green span-all-rows">
                    { "Book tour now!" }
                </button>
            </form>
        }
        .into_view(),
        None => view! {
            <a href="/login" class="btn btn--green span-all-rows">{ "Log in to book tour" }</a>
        }
        .into_view(),
    };

    view! {
        <Title text=format!("{} tour", tour.name)/>
        <section class="section-header">
            <div class="header__hero">
                <div class="header__hero-overlay">{ " " }</div>
                <img class="header__hero-img" src=cover alt=tour.name.clone()/>
            </div>
            <div class="heading-box">
                <h1 class="heading-primary">
                    <span>{ format!("{} tour", tour.name) }</span>
                </h1>
                <div class="heading-box__group">
                    <div class="heading-box__detail">
                        <span class="heading-box__text">
                            { format!("{} days", tour.duration) }
                        </span>
                    </div>
                    <div class="heading-box__detail">
                        <span class="heading-box__text">{ start }</span>
                    </div>
                </div>
            </div>
        </section>

        <section class="section-description">
            <div class="overview-box">
                <div class="overview-box__group">
                    <h2 class="heading-secondary ma-bt-lg">{ "Quick facts" }</h2>
                    <div class="overview-box__detail">
                        <span class="overview-box__label">{ "Next date" }</span>
                        <span class="overview-box__text">{ next_date }</span>
                    </div>
                    <div class="overview-box__detail">
                        <span class="overview-box__label">{ "Difficulty" }</span>
                        <span class="overview-box__text">{ tour.difficulty.to_string() }</span>
                    </div>
                    <div class="overview-box__detail">
                        <span class="overview-box__label">{ "Participants" }</span>
                        <span class="overview-box__text">
                            { format!("{} people", tour.max_group_size) }
                        </span>
                    </div>
                    <div class="overview-box__detail">
                        <span class="overview-box__label">{ "Rating" }</span>
                        <span class="overview-box__text">
                            { format!("{:.1} / 5", tour.ratings_average) }
                        </span>
                    </div>
                </div>
                <div class="overview-box__group">
                    <h2 class="heading-secondary ma-bt-lg">{ "Your tour guides" }</h2>
                    { guide_list }
                </div>
            </div>
            <div class="description-box">
                <h2 class="heading-secondary ma-bt-lg">{ format!("About {} tour", tour.name) }</h2>
                { paragraphs }
            </div>
        </section>

        <section class="section-pictures">{ pictures }</section>

        <section class="section-reviews">
            <div class="reviews">{ review_cards }</div>
        </section>

        <section class="section-cta">
            <div class="cta">
                <div class="cta__content">
                    <h2 class="heading-secondary">{ "What are you waiting for?" }</h2>
                    <p class="cta__text">
                        { format!(
                            "{} days. 1 adventure. Infinite memories. Make it yours today!",
                            tour.duration,
                        ) }
                    </p>
                    { booking }
                </div>
            </div>
        </section>
    }
}
