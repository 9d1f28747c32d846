use leptos::*;
use leptos_meta::Title;

use super::query_param;
use crate::components::alert::Alert;

#[component]
pub fn LoginPage() -> impl IntoView {
    let error = query_param("error");

    view! {
        <Title text="Log into your account"/>
        <main class="main">
            <div class="login-form">
                <h2 class="heading-secondary ma-bt-lg">{ "Log into your account" }</h2>
                { error.map(|message| view! { <Alert kind="error" message=message/> }) }
                <form class="form form--login" method="post" action="/login">
                    <div class="form__group">
                        <label class="form__label">
                            { "Email address" }
                            <input class="form__input" type="email" name="email"
                                placeholder="you@example.com" required=true/>
                        </label>
                    </div>
                    <div class="form__group ma-bt-md">
                        <label class="form__label">
                            { "Password" }
                            <input class="form__input" type="password" name="password"
                                placeholder="••••••••" required=true minlength="8"/>
                        </label>
                    </div>
                    <div class="form__group">
                        <button type="submit" class="btn btn--green">{ "Login" }</button>
                    </div>
                </form>
            </div>
        </main>
    }
}

#[component]
pub fn SignupPage() -> impl IntoView {
    let error = query_param("error");

    view! {
        <Title text="Create your account"/>
        <main class="main">
            <div class="login-form">
                <h2 class="heading-secondary ma-bt-lg">{ "Create your account" }</h2>
                { error.map(|message| view! { <Alert kind="error" message=message/> }) }
                <form class="form form--signup" method="post" action="/signup">
                    <div class="form__group">
                        <label class="form__label">
                            { "Your name" }
                            <input class="form__input" type="text" name="name" required=true/>
                        </label>
                    </div>
                    <div class="form__group">
                        <label class="form__label">
                            { "Email address" }
                            <input class="form__input" type="email" name="email"
                                placeholder="you@example.com" required=true/>
                        </label>
                    </div>
                    <div class="form__group">
                        <label class="form__label">
                            { "Password" }
                            <input class="form__input" type="password" name="password"
                                required=true minlength="8"/>
                        </label>
                    </div>
                    <div class="form__group ma-bt-md">
                        <label class="form__label">
                            { "Confirm password" }
                            <input class="form__input" type="password" name="passwordConfirm"
                                required=true minlength="8"/>
                        </label>
                    </div>
                    <div class="form__group">
                        <button type="submit" class="btn btn--green">{ "Sign up" }</button>
                    </div>
                </form>
            </div>
        </main>
    }
}
