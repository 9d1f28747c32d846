use leptos::*;
use leptos_meta::Title;

use super::{error_text, loading, overview::TourGrid, query_param};
use crate::{
    components::alert::{Alert, ErrorMessage},
    server_fns::list_booked_tours,
};

/// Shown after Stripe sends the buyer back with `?alert=booking`. The
/// webhook may still be on its way, so the booking can lag behind.
pub const BOOKING_ALERT: &str = "Booking successful! Check your email for a confirmation. \
     If your booking doesn't show up here immediately, please come back later.";

#[component]
pub fn MyToursPage() -> impl IntoView {
    let tours = create_resource(|| (), |_| list_booked_tours());
    let alert = query_param("alert").filter(|alert| alert == "booking");

    view! {
        <Title text="My tours"/>
        { alert.map(|_| view! { <Alert kind="success" message=BOOKING_ALERT.to_string()/> }) }
        <main class="main">
            <Suspense fallback=loading>
                {move || tours.get().map(|tours| match tours {
                    Ok(tours) if tours.is_empty() => view! {
                        <p class="main__empty">{ "You have not booked any tours yet." }</p>
                    }.into_view(),
                    Ok(tours) => view! { <TourGrid tours=tours/> }.into_view(),
                    Err(e) => view! { <ErrorMessage message=error_text(&e)/> }.into_view(),
                })}
            </Suspense>
        </main>
    }
}
