use leptos::*;

use crate::{components::user_photo, models::User, server_fns::current_user};

#[component]
pub fn Header() -> impl IntoView {
    let user = create_resource(|| (), |_| current_user());

    view! {
        <header class="header">
            <nav class="nav nav--tours">
                <a href="/" class="nav__el">{ "All tours" }</a>
            </nav>
            <div class="header__logo">
                <img src="/img/logo-white.png" alt="Natours logo"/>
            </div>
            <nav class="nav nav--user">
                <Suspense fallback=|| ()>
                    {move || user.get().map(|user| match user {
                        Ok(Some(user)) => view! { <LoggedInLinks user=user/> }.into_view(),
                        _ => view! { <LoggedOutLinks/> }.into_view(),
                    })}
                </Suspense>
            </nav>
        </header>
    }
}

#[component]
fn LoggedInLinks(user: User) -> impl IntoView {
    let first_name = user
        .name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    let photo = user_photo(user.photo.as_deref());

    view! {
        // Logging out is a POST so a prefetching browser cannot trigger it.
        <form method="post" action="/logout" class="nav__form">
            <button type="submit" class="nav__el nav__el--logout">{ "Log out" }</button>
        </form>
        <a href="/my-tours" class="nav__el">{ "My bookings" }</a>
        <a href="/me" class="nav__el">
            <img src=photo alt=format!("Photo of {first_name}") class="nav__user-img"/>
            <span>{ first_name.clone() }</span>
        </a>
    }
}

#[component]
fn LoggedOutLinks() -> impl IntoView {
    view! {
        <a href="/login" class="nav__el">{ "Log in" }</a>
        <a href="/signup" class="nav__el nav__el--cta">{ "Sign up" }</a>
    }
}

#[component]
pub fn Footer() -> impl IntoView {
    view! {
        <footer class="footer">
            <div class="footer__logo">
                <img src="/img/logo-green.png" alt="Natours logo"/>
            </div>
            <ul class="footer__nav">
                <li><a href="/">{ "All tours" }</a></li>
                <li><a href="/signup">{ "Become a guide" }</a></li>
            </ul>
        </footer>
    }
}
