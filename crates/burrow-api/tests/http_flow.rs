use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use burrow_api::{AppState, AppStateInner, router};
use burrow_db::Database;

const GENERAL: &str = "00000000-0000-0000-0000-000000000001";

fn app() -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
    });
    (router(state.clone()), state)
}

fn form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

fn location(res: &Response<Body>) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn session_cookie(res: &Response<Body>) -> String {
    let raw = res
        .headers()
        .get(header::SET_COOKIE)
        .expect("no session cookie set")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_and_login(app: &Router, username: &str, email: &str) -> String {
    let res = send(
        app,
        form(
            "/signup",
            &format!("username={username}&email={email}&password=secret123"),
            None,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");

    let res = send(
        app,
        form("/login", &format!("email={email}&password=secret123"), None),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
    session_cookie(&res)
}

/// Creates a post through the API and returns its id.
async fn create_post(app: &Router, cookie: &str) -> String {
    let res = send(
        app,
        form(
            "/createpost",
            &format!("category_id={GENERAL}&title=hello&content=world"),
            Some(cookie),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let res = send(app, get("/posts", Some(cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let posts = body_json(res).await;
    posts[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn issued_cookie_resolves_to_the_user_until_logout() {
    let (app, _) = app();
    let cookie = register_and_login(&app, "alice", "a@x.com").await;

    // the cookie carries an identity: a mutation succeeds
    let res = send(
        &app,
        form(
            "/createpost",
            &format!("category_id={GENERAL}&title=t&content=c"),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(location(&res), "/");

    // logout revokes the token and clears the cookie
    let res = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    // the old token no longer resolves: anonymous redirect to /login
    let res = send(
        &app,
        form(
            "/createpost",
            &format!("category_id={GENERAL}&title=t&content=c"),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn expired_session_resolves_anonymous_even_though_row_remains() {
    let (app, state) = app();
    let user_id = uuid::Uuid::new_v4().to_string();
    state
        .db
        .create_user(&user_id, "alice", "a@x.com", "$argon2id$stub")
        .unwrap();
    state
        .db
        .create_session("tok-old", &user_id, "2020-01-01T00:00:00Z")
        .unwrap();

    let res = send(
        &app,
        form("/like", "post_id=x&value=1", Some("session_id=tok-old")),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // a live session on the same account works
    state
        .db
        .create_session("tok-live", &user_id, "2999-01-01T00:00:00Z")
        .unwrap();
    let res = send(
        &app,
        form(
            "/createpost",
            &format!("category_id={GENERAL}&title=t&content=c"),
            Some("session_id=tok-live"),
        ),
    )
    .await;
    assert_eq!(location(&res), "/");
}

#[tokio::test]
async fn signup_conflicts_are_generic_for_either_field() {
    let (app, _) = app();
    register_and_login(&app, "alice", "a@x.com").await;

    // same email, different username
    let res = send(
        &app,
        form("/signup", "username=other&email=a@x.com&password=secret123", None),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let first = body_text(res).await;

    // same username, different email: identical message
    let res = send(
        &app,
        form("/signup", "username=alice&email=b@x.com&password=secret123", None),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let second = body_text(res).await;

    assert_eq!(first, second);
    assert_eq!(first, "email or username already in use");
}

#[tokio::test]
async fn signup_validates_input() {
    let (app, _) = app();

    let res = send(&app, form("/signup", "username=&email=a@x.com&password=p", None)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(
        &app,
        form("/signup", "username=alice&email=not-an-email&password=p", None),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failure_is_identical_for_unknown_email_and_wrong_password() {
    let (app, _) = app();
    register_and_login(&app, "alice", "a@x.com").await;

    let res = send(&app, form("/login", "email=a@x.com&password=wrong", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let wrong_password = body_text(res).await;

    let res = send(&app, form("/login", "email=nobody@x.com&password=whatever", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let unknown_email = body_text(res).await;

    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password, "Invalid credentials");
}

#[tokio::test]
async fn anonymous_votes_get_a_hard_401_and_bad_values_a_400() {
    let (app, _) = app();

    let res = send(&app, form("/like", "post_id=x&value=1", None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let cookie = register_and_login(&app, "alice", "a@x.com").await;
    let post_id = create_post(&app, &cookie).await;

    // out-of-range value is rejected before storage
    let res = send(
        &app,
        form("/like", &format!("post_id={post_id}&value=2"), Some(&cookie)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // malformed id likewise
    let res = send(&app, form("/like", "post_id=nope&value=1", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vote_cast_change_and_retract_converge_on_one_row() {
    let (app, _) = app();
    let cookie = register_and_login(&app, "alice", "a@x.com").await;
    let post_id = create_post(&app, &cookie).await;

    let res = send(
        &app,
        form("/like", &format!("post_id={post_id}&value=1"), Some(&cookie)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&cookie))).await).await;
    assert_eq!(page["post"]["likes"], 1);
    assert_eq!(page["post"]["viewer_vote"], 1);

    // changing the vote transitions the same row; the +1 count drops
    send(
        &app,
        form("/like", &format!("post_id={post_id}&value=-1"), Some(&cookie)),
    )
    .await;
    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&cookie))).await).await;
    assert_eq!(page["post"]["likes"], 0);
    assert_eq!(page["post"]["viewer_vote"], -1);

    // retract removes the row entirely
    send(
        &app,
        form("/like", &format!("post_id={post_id}&value=0"), Some(&cookie)),
    )
    .await;
    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&cookie))).await).await;
    assert_eq!(page["post"]["likes"], 0);
    assert_eq!(page["post"]["viewer_vote"], 0);
}

#[tokio::test]
async fn delete_is_owner_only_with_a_conflated_forbidden() {
    let (app, _) = app();
    let alice = register_and_login(&app, "alice", "a@x.com").await;
    let bob = register_and_login(&app, "bob", "b@x.com").await;
    let post_id = create_post(&app, &alice).await;

    // not the owner
    let res = send(
        &app,
        form("/deletepost", &format!("post_id={post_id}"), Some(&bob)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // a nonexistent id yields the same outcome
    let res = send(
        &app,
        form(
            "/deletepost",
            &format!("post_id={}", uuid::Uuid::new_v4()),
            Some(&bob),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // the owner succeeds and the post is gone
    let res = send(
        &app,
        form("/deletepost", &format!("post_id={post_id}"), Some(&alice)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = send(&app, get(&format!("/post/{post_id}"), Some(&alice))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_require_identity_and_drop_blank_text() {
    let (app, _) = app();
    let alice = register_and_login(&app, "alice", "a@x.com").await;
    let post_id = create_post(&app, &alice).await;

    // anonymous commenters are redirected to authenticate
    let res = send(&app, form(&format!("/post/{post_id}"), "comment=hi", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");

    // whitespace-only text is a silent no-op
    let res = send(
        &app,
        form(&format!("/post/{post_id}"), "comment=%20%20", Some(&alice)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/post/{post_id}"));

    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&alice))).await).await;
    assert_eq!(page["comments"].as_array().unwrap().len(), 0);

    // a real comment lands, owned by its author
    let res = send(
        &app,
        form(&format!("/post/{post_id}"), "comment=nice+post", Some(&alice)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&alice))).await).await;
    let comments = page["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "nice post");
    assert_eq!(comments[0]["author"], "alice");

    // a second user cannot delete it
    let bob = register_and_login(&app, "bob", "b@x.com").await;
    let comment_id = comments[0]["id"].as_str().unwrap();
    let res = send(
        &app,
        form("/deletecomment", &format!("comment_id={comment_id}"), Some(&bob)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = send(
        &app,
        form("/deletecomment", &format!("comment_id={comment_id}"), Some(&alice)),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn comment_votes_follow_the_same_ledger_rules() {
    let (app, _) = app();
    let alice = register_and_login(&app, "alice", "a@x.com").await;
    let post_id = create_post(&app, &alice).await;

    send(
        &app,
        form(&format!("/post/{post_id}"), "comment=first", Some(&alice)),
    )
    .await;
    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&alice))).await).await;
    let comment_id = page["comments"][0]["id"].as_str().unwrap().to_string();

    let res = send(
        &app,
        form(
            "/comment-like",
            &format!("comment_id={comment_id}&value=1"),
            Some(&alice),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let page = body_json(send(&app, get(&format!("/post/{post_id}"), Some(&alice))).await).await;
    assert_eq!(page["comments"][0]["likes"], 1);
    assert_eq!(page["comments"][0]["viewer_vote"], 1);

    // anonymous comment votes are a hard 401 as well
    let res = send(
        &app,
        form("/comment-like", &format!("comment_id={comment_id}&value=1"), None),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_reads_work_without_a_viewer_vote() {
    let (app, _) = app();
    let alice = register_and_login(&app, "alice", "a@x.com").await;
    let post_id = create_post(&app, &alice).await;
    send(
        &app,
        form("/like", &format!("post_id={post_id}&value=1"), Some(&alice)),
    )
    .await;

    let res = send(&app, get("/posts", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let posts = body_json(res).await;
    assert_eq!(posts[0]["likes"], 1);
    assert_eq!(posts[0]["viewer_vote"], 0);

    let res = send(&app, get("/categories", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let categories = body_json(res).await;
    assert!(categories.as_array().unwrap().len() >= 3);
}
