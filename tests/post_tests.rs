// tests/post_tests.rs

mod common;

use blog_backend::config::RateLimit;
use common::{TestApp, comment_ids};
use serde_json::json;

#[tokio::test]
async fn create_and_fetch_by_slug() {
    let app = TestApp::spawn().await;
    let alice = app.user().await;

    let response = app
        .client
        .post(app.url("/api/posts"))
        .bearer_auth(&alice.token)
        .json(&json!({
            "slug": "hello-world",
            "title": "Hello",
            "summary": "First post",
            "body": "<p>Hi</p><script>alert('x')</script>",
            "featuredImageUrl": "https://cdn.example.com/hello.png"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let (status, post) = app.get_json("/api/posts/post/hello-world").await;
    assert_eq!(status, 200);
    assert_eq!(post["title"], "Hello");
    assert_eq!(post["author"]["username"], alice.username);
    assert_eq!(post["featuredImageUrl"], "https://cdn.example.com/hello.png");
    assert!(!post["body"].as_str().unwrap().contains("script"));

    let (status, _) = app.get_json("/api/posts/post/missing").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let app = TestApp::spawn().await;
    let alice = app.user().await;
    app.create_post(&alice, "taken").await;

    let response = app
        .client
        .post(app.url("/api/posts"))
        .bearer_auth(&alice.token)
        .json(&json!({
            "slug": "taken",
            "title": "Again",
            "summary": "Same slug",
            "body": "text"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn posts_are_paged_by_six_newest_first() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limits.create_post = RateLimit::per_hour(20);
    })
    .await;
    let alice = app.user().await;
    let bob = app.user().await;

    for i in 0..7 {
        app.create_post(&alice, &format!("alice-{}", i)).await;
    }
    app.create_post(&bob, "bob-0").await;

    let (status, first) = app.get_json("/api/posts").await;
    assert_eq!(status, 200);
    assert_eq!(first["page"], 1);
    assert_eq!(first["totalPages"], 2);
    let slugs: Vec<&str> = first["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs.len(), 6);
    assert_eq!(slugs[0], "bob-0");
    assert_eq!(slugs[1], "alice-6");

    let (_, by_alice) = app
        .get_json(&format!("/api/posts?authorId={}&page=2", alice.id))
        .await;
    assert_eq!(by_alice["totalPages"], 2);
    assert_eq!(by_alice["posts"].as_array().unwrap().len(), 1);
    assert_eq!(by_alice["posts"][0]["slug"], "alice-0");

    let (status, _) = app.get_json("/api/posts?page=0").await;
    assert_eq!(status, 400);

    let (_, slugs) = app.get_json("/api/posts/slugs").await;
    assert_eq!(slugs.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn only_the_author_may_update_a_post() {
    let app = TestApp::spawn().await;
    let alice = app.user().await;
    let bob = app.user().await;
    let post_id = app.create_post(&alice, "mine").await["id"].as_i64().unwrap();
    app.create_post(&alice, "also-mine").await;

    let update = |slug: &'static str| {
        json!({ "slug": slug, "title": "New title", "summary": "New summary", "body": "New body" })
    };

    let foreign = app
        .client
        .patch(app.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&bob.token)
        .json(&update("mine"))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 401);

    let clash = app
        .client
        .patch(app.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&alice.token)
        .json(&update("also-mine"))
        .send()
        .await
        .unwrap();
    assert_eq!(clash.status().as_u16(), 409);

    let own = app
        .client
        .patch(app.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&alice.token)
        .json(&update("renamed"))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status().as_u16(), 200);

    let (status, post) = app.get_json("/api/posts/post/renamed").await;
    assert_eq!(status, 200);
    assert_eq!(post["title"], "New title");

    let missing = app
        .client
        .patch(app.url("/api/posts/999999"))
        .bearer_auth(&alice.token)
        .json(&update("ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let app = TestApp::spawn().await;
    let alice = app.user().await;
    let post_id = app.create_post(&alice, "short-lived").await["id"].as_i64().unwrap();
    let comment = app.create_comment(&alice, post_id, "first", None).await;
    app.create_comment(&alice, post_id, "reply", Some(comment)).await;

    let response = app
        .client
        .delete(app.url(&format!("/api/posts/{}", post_id)))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let (status, _) = app.get_json("/api/posts/post/short-lived").await;
    assert_eq!(status, 404);

    let (_, page) = app.get_json(&format!("/api/posts/{}/comments", post_id)).await;
    assert!(comment_ids(&page).is_empty());
    let (_, replies) = app
        .get_json(&format!("/api/posts/comments/{}/replies", comment))
        .await;
    assert!(comment_ids(&replies).is_empty());
}

#[tokio::test]
async fn post_creation_is_rate_limited() {
    let app = TestApp::spawn().await;
    let alice = app.user().await;

    for i in 0..5 {
        app.create_post(&alice, &format!("burst-{}", i)).await;
    }

    let response = app
        .client
        .post(app.url("/api/posts"))
        .bearer_auth(&alice.token)
        .json(&json!({
            "slug": "one-too-many",
            "title": "Sixth",
            "summary": "Over budget",
            "body": "text"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 429);

    // Reads are not limited.
    let (status, _) = app.get_json("/api/posts").await;
    assert_eq!(status, 200);
}
