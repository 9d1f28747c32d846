use leptos::*;
use leptos_meta::Title;

use super::{error_text, loading};
use crate::{
    components::{alert::ErrorMessage, tour_card::TourCard},
    models::Tour,
    server_fns::list_tours,
};

#[component]
pub fn OverviewPage() -> impl IntoView {
    let tours = create_resource(|| (), |_| list_tours());

    view! {
        <Title text="All tours"/>
        <main class="main">
            <Suspense fallback=loading>
                {move || tours.get().map(|tours| match tours {
                    Ok(tours) => view! { <TourGrid tours=tours/> }.into_view(),
                    Err(e) => view! { <ErrorMessage message=error_text(&e)/> }.into_view(),
                })}
            </Suspense>
        </main>
    }
}

#[component]
pub fn TourGrid(tours: Vec<Tour>) -> impl IntoView {
    view! {
        <div class="card-container">
            {
                tours.into_iter().map(|tour| {
                    view! { <TourCard tour=tour/> }
                }).collect::<Vec<_>>()
            }
        </div>
    }
}
