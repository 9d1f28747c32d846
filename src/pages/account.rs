use leptos::*;
use leptos_meta::Title;

use super::{error_text, loading, query_param};
use crate::{
    components::{
        alert::{Alert, ErrorMessage},
        user_photo,
    },
    models::User,
    server_fns::{current_user, NOT_LOGGED_IN},
};

fn saved_message(alert: &str) -> Option<&'static str> {
    match alert {
        "saved" => Some("Your data was updated."),
        "password" => Some("Your password was changed."),
        _ => None,
    }
}

#[component]
pub fn AccountPage() -> impl IntoView {
    let user = create_resource(|| (), |_| current_user());
    let saved = query_param("alert").and_then(|alert| saved_message(&alert));
    let error = query_param("error");

    view! {
        <Title text="Your account"/>
        { saved.map(|message| view! { <Alert kind="success" message=message.to_string()/> }) }
        { error.map(|message| view! { <Alert kind="error" message=message/> }) }
        <main class="main">
            <Suspense fallback=loading>
                {move || user.get().map(|user| match user {
                    Ok(Some(user)) => view! { <AccountSettings user=user/> }.into_view(),
                    Ok(None) => view! {
                        <ErrorMessage message=NOT_LOGGED_IN.to_string()/>
                    }.into_view(),
                    Err(e) => view! { <ErrorMessage message=error_text(&e)/> }.into_view(),
                })}
            </Suspense>
        </main>
    }
}

#[component]
fn AccountSettings(user: User) -> impl IntoView {
    view! {
        <div class="user-view">
            <div class="user-view__content">
                <div class="user-view__form-container">
                    <h2 class="heading-secondary ma-bt-md">{ "Your account settings" }</h2>
                    <form class="form form-user-data" method="post" action="/submit-user-data">
                        <div class="form__group">
                            <label class="form__label">
                                { "Name" }
                                <input class="form__input" type="text" name="name"
                                    value=user.name.clone() required=true/>
                            </label>
                        </div>
                        <div class="form__group ma-bt-md">
                            <label class="form__label">
                                { "Email address" }
                                <input class="form__input" type="email" name="email"
                                    value=user.email.clone() required=true/>
                            </label>
                        </div>
                        <div class="form__group form__photo-upload">
                            <img class="form__user-photo"
                                src=user_photo(user.photo.as_deref()) alt="User photo"/>
                        </div>
                        <div class="form__group right">
                            <button type="submit" class="btn btn--small btn--green">
                                { "Save settings" }
                            </button>
                        </div>
                    </form>
                </div>
                <div class="line">{ " " }</div>
                <div class="user-view__form-container">
                    <h2 class="heading-secondary ma-bt-md">{ "Password change" }</h2>
                    <form class="form form-user-password" method="post" action="/submit-password">
                        <div class="form__group">
                            <label class="form__label">
                                { "Current password" }
                                <input class="form__input" type="password" name="passwordCurrent"
                                    required=true minlength="8"/>
                            </label>
                        </div>
                        <div class="form__group">
                            <label class="form__label">
                                { "New password" }
                                <input class="form__input" type="password" name="password"
                                    required=true minlength="8"/>
                            </label>
                        </div>
                        <div class="form__group ma-bt-lg">
                            <label class="form__label">
                                { "Confirm password" }
                                <input class="form__input" type="password" name="passwordConfirm"
                                    required=true minlength="8"/>
                            </label>
                        </div>
                        <div class="form__group right">
                            <button type="submit" class="btn btn--small btn--green">
                                { "Save password" }
                            </button>
                        </div>
                    </form>
                </div>
            </div>
        </div>
    }
}
