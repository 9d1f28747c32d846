use leptos::*;

/// A banner at the top of the page. `kind` is `success` or `error`.
#[component]
pub fn Alert(kind: &'static str, message: String) -> impl IntoView {
    view! {
        <div class=format!("alert alert--{kind}")>{ message }</div>
    }
}

/// Stand-in for page content that failed to load.
#[component]
pub fn ErrorMessage(message: String) -> impl IntoView {
    view! {
        <div class="error">
            <div class="error__title">
                <h2 class="heading-secondary heading-secondary--error">
                    { "Uh oh! Something went wrong!" }
                </h2>
            </div>
            <div class="error__msg">{ message }</div>
        </div>
    }
}
