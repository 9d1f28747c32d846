pub mod account;
pub mod auth;
pub mod my_tours;
pub mod overview;
pub mod tour;

use leptos::*;
use leptos_router::use_query_map;

/// A query-string value as it was when the page was requested.
pub fn query_param(name: &'static str) -> Option<String> {
    use_query_map().with_untracked(|query| query.get(name).cloned())
}

pub fn error_text(e: &ServerFnError) -> String {
    match e {
        ServerFnError::ServerError(message) => message.clone(),
        other => other.to_string(),
    }
}

pub fn loading() -> impl IntoView {
    view! { <div class="loader">{ "Loading..." }</div> }
}
