use std::sync::Arc;

use actix_web::{
    cookie::Cookie,
    dev::ServiceResponse,
    http::{header, StatusCode},
    test, web, App,
};
use leptos_actix::{generate_route_list, LeptosRoutes};
use natours::{
    app::App as Site,
    auth::hash_password,
    config::Config,
    models::{tour::NewTour, Difficulty, Role, Tour, User},
    state::AppState,
};

mod mocks;
use mocks::FakeGateway;

async fn test_state() -> web::Data<AppState> {
    let state = AppState::new(Config::for_tests())
        .await
        .unwrap()
        .with_gateway(Arc::new(FakeGateway::default()));
    web::Data::new(state)
}

macro_rules! test_site {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(natours::configure)
                .leptos_routes(
                    natours::site_options(&$state.config),
                    generate_route_list(Site),
                    Site,
                ),
        )
        .await
    };
}

async fn create_user(state: &AppState, email: &str) -> (User, String) {
    let hash = hash_password("pass1234".into(), 4).await.unwrap();
    let user = state
        .db
        .insert_user("Jane Traveller", email, &hash, Role::User)
        .await
        .unwrap();
    let token = state.tokens.issue(&user.id).unwrap();
    (user, token)
}

async fn create_tour(state: &AppState, name: &str, secret: bool) -> Tour {
    state
        .db
        .insert_tour(NewTour {
            name: name.to_string(),
            duration: 4,
            max_group_size: 12,
            difficulty: Difficulty::Medium,
            price: 650.0,
            price_discount: None,
            summary: "Red rock and quiet trails".to_string(),
            description: "Day one climbs the rim.\nDay two follows the river.".to_string(),
            image_cover: None,
            images: vec![],
            start_dates: vec![],
            secret_tour: secret,
            start_location: None,
            locations: vec![],
            guides: vec![],
        })
        .await
        .unwrap()
}

async fn html(resp: ServiceResponse) -> String {
    let body = test::read_body(resp).await;
    String::from_utf8_lossy(&body).into_owned()
}

fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn set_cookie(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn test_overview_lists_public_tours() {
    let state = test_state().await;
    state.db.seed_sample_tours().await.unwrap();
    create_tour(&state, "Hidden Valley", true).await;
    let app = test_site!(state);

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));

    let page = html(resp).await;
    assert!(page.contains("The Forest Hiker"));
    assert!(page.contains("The Sea Explorer"));
    assert!(!page.contains("Hidden Valley"));
    assert!(page.contains("Log in"));
}

#[actix_web::test]
async fn test_tour_page_shows_reviews_and_booking_button() {
    let state = test_state().await;
    let tour = create_tour(&state, "Canyon Walk", false).await;
    let (user, token) = create_user(&state, "jane@example.com").await;
    state
        .db
        .insert_review(&tour.id, &user.id, "Sunrise over the canyon was unreal", 5.0)
        .await
        .unwrap();
    let app = test_site!(state);

    let req = test::TestRequest::get().uri("/tour/canyon-walk").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = html(resp).await;
    assert!(page.contains("Canyon Walk tour"));
    assert!(page.contains("Sunrise over the canyon was unreal"));
    assert!(page.contains("Day two follows the river."));
    assert!(page.contains("Log in to book tour"));

    let req = test::TestRequest::get()
        .uri("/tour/canyon-walk")
        .cookie(Cookie::new("jwt", token))
        .to_request();
    let page = html(test::call_service(&app, req).await).await;
    assert!(page.contains("Book tour now!"));
    assert!(page.contains("/tour/canyon-walk/book"));
}

#[actix_web::test]
async fn test_missing_and_secret_tour_pages_are_not_found() {
    let state = test_state().await;
    create_tour(&state, "Hidden Valley", true).await;
    let app = test_site!(state);

    for uri in ["/tour/nowhere", "/tour/hidden-valley"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        let page = html(resp).await;
        assert!(page.contains("There is no tour with that name"), "{uri}");
    }
}

#[actix_web::test]
async fn test_my_tours_after_checkout() {
    let state = test_state().await;
    let tour = create_tour(&state, "Canyon Walk", false).await;
    create_tour(&state, "River Run", false).await;
    let (user, token) = create_user(&state, "jane@example.com").await;
    state
        .db
        .create_pending_booking(&tour.id, &user.id, 650.0, "cs_test_view_1")
        .await
        .unwrap();
    let app = test_site!(state);

    let req = test::TestRequest::get()
        .uri("/my-tours?alert=booking")
        .cookie(Cookie::new("jwt", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = html(resp).await;
    assert!(page.contains("Booking successful!"));
    assert!(page.contains("Canyon Walk"));
    assert!(!page.contains("River Run"));

    let req = test::TestRequest::get().uri("/my-tours").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let page = html(resp).await;
    assert!(page.contains("You are not logged in! Please log in to get access."));
}

#[actix_web::test]
async fn test_header_ignores_a_bad_token() {
    let state = test_state().await;
    let app = test_site!(state);

    let req = test::TestRequest::get()
        .uri("/")
        .cookie(Cookie::new("jwt", "not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = html(resp).await;
    assert!(page.contains("Sign up"));
    assert!(!page.contains("My bookings"));
}

#[actix_web::test]
async fn test_login_form() {
    let state = test_state().await;
    create_user(&state, "jane@example.com").await;
    let app = test_site!(state);

    let req = test::TestRequest::get().uri("/login").to_request();
    let page = html(test::call_service(&app, req).await).await;
    assert!(page.contains("Log into your account"));

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "jane@example.com"), ("password", "pass1234")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    assert!(set_cookie(&resp).starts_with("jwt="));

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("email", "jane@example.com"), ("password", "wrong-pass")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        "/login?error=incorrect%20email%20or%20password"
    );

    let req = test::TestRequest::get()
        .uri("/login?error=incorrect%20email%20or%20password")
        .to_request();
    let page = html(test::call_service(&app, req).await).await;
    assert!(page.contains("incorrect email or password"));
}

#[actix_web::test]
async fn test_signup_form_logs_the_new_user_in() {
    let state = test_state().await;
    let app = test_site!(state);

    let req = test::TestRequest::post()
        .uri("/signup")
        .set_form([
            ("name", "Sam Hiker"),
            ("email", "sam@example.com"),
            ("password", "pass1234"),
            ("passwordConfirm", "pass1234"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    assert!(set_cookie(&resp).starts_with("jwt="));
    assert!(state
        .db
        .get_user_by_email("sam@example.com")
        .await
        .unwrap()
        .is_some());

    let req = test::TestRequest::post()
        .uri("/signup")
        .set_form([
            ("name", "Sam Again"),
            ("email", "sam2@example.com"),
            ("password", "pass1234"),
            ("passwordConfirm", "pass9999"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/signup?error="));
}

#[actix_web::test]
async fn test_account_settings_form() {
    let state = test_state().await;
    let (user, token) = create_user(&state, "jane@example.com").await;
    let app = test_site!(state);

    let req = test::TestRequest::post()
        .uri("/submit-user-data")
        .set_form([("name", "Jane Explorer"), ("email", "jane@example.com")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let req = test::TestRequest::post()
        .uri("/submit-user-data")
        .cookie(Cookie::new("jwt", token.clone()))
        .set_form([("name", "Jane Explorer"), ("email", "jane@example.com")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/me?alert=saved");
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Jane Explorer");

    let req = test::TestRequest::get()
        .uri("/me?alert=saved")
        .cookie(Cookie::new("jwt", token))
        .to_request();
    let page = html(test::call_service(&app, req).await).await;
    assert!(page.contains("Your data was updated."));
    assert!(page.contains("Jane Explorer"));
    assert!(page.contains("jane@example.com"));
}

#[actix_web::test]
async fn test_password_form_replaces_the_session() {
    let state = test_state().await;
    let (_, token) = create_user(&state, "jane@example.com").await;
    let app = test_site!(state);

    let req = test::TestRequest::post()
        .uri("/submit-password")
        .cookie(Cookie::new("jwt", token.clone()))
        .set_form([
            ("passwordCurrent", "not-my-password"),
            ("password", "newpass123"),
            ("passwordConfirm", "newpass123"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/me?error=Your%20current%20password%20is%20wrong."));

    let req = test::TestRequest::post()
        .uri("/submit-password")
        .cookie(Cookie::new("jwt", token))
        .set_form([
            ("passwordCurrent", "pass1234"),
            ("password", "newpass123"),
            ("passwordConfirm", "newpass123"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/me?alert=password");
    assert!(set_cookie(&resp).starts_with("jwt="));
}

#[actix_web::test]
async fn test_book_form_redirects_to_checkout() {
    let state = test_state().await;
    create_tour(&state, "Canyon Walk", false).await;
    let (user, token) = create_user(&state, "jane@example.com").await;
    let app = test_site!(state);

    let req = test::TestRequest::post()
        .uri("/tour/canyon-walk/book")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/login");

    let req = test::TestRequest::post()
        .uri("/tour/canyon-walk/book")
        .cookie(Cookie::new("jwt", token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "https://checkout.test/pay/cs_test_fake_1");
    let bookings = state.db.list_bookings_for_user(&user.id).await.unwrap();
    assert_eq!(bookings.len(), 1);

    let req = test::TestRequest::post()
        .uri("/tour/nowhere/book")
        .cookie(Cookie::new("jwt", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        "/tour/nowhere?error=There%20is%20no%20tour%20with%20that%20name"
    );
}

#[actix_web::test]
async fn test_logout_form() {
    let state = test_state().await;
    let app = test_site!(state);

    let req = test::TestRequest::post().uri("/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    assert!(set_cookie(&resp).starts_with("jwt=loggedout"));
}
