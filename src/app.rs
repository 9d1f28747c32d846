/// Server-rendered pages for browsing tours, logging in, managing the account
/// and seeing booked tours. Forms on these pages post to `crate::forms`.
use leptos::*;
use leptos_meta::*;
use leptos_router::*;

use crate::{
    components::header::{Footer, Header},
    pages::{
        account::AccountPage,
        auth::{LoginPage, SignupPage},
        my_tours::MyToursPage,
        overview::OverviewPage,
        tour::TourPage,
    },
};

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    // Pages render only after their data has loaded, so every response is
    // complete HTML and a 404 status set while loading still applies.
    view! {
        <Stylesheet id="natours" href="/css/style.css"/>
        <Title formatter=|text| format!("Natours | {text}")/>
        <Router>
            <Header/>
            <Routes>
                <Route path="/" view=OverviewPage ssr=SsrMode::Async/>
                <Route path="/tour/:slug" view=TourPage ssr=SsrMode::Async/>
                <Route path="/login" view=LoginPage ssr=SsrMode::Async/>
                <Route path="/signup" view=SignupPage ssr=SsrMode::Async/>
                <Route path="/me" view=AccountPage ssr=SsrMode::Async/>
                <Route path="/my-tours" view=MyToursPage ssr=SsrMode::Async/>
            </Routes>
            <Footer/>
        </Router>
    }
}
