//! Comment thread tests.

mod common;

use axum::http::StatusCode;
use common::{app, run};
use serde_json::json;
use uuid::Uuid;

#[test]
fn add_comment_returns_created_comment() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_add").await;
        let post = app.create_post(&user, "commented").await;

        let resp = app
            .post_json(
                &format!("/posts/{}/comment/add", post),
                json!({ "content": "first!" }),
                Some(&user.access_token),
            )
            .await;

        assert_eq!(resp.status, StatusCode::CREATED);
        let body = resp.json();
        assert!(body["id"].is_i64());
        assert_eq!(body["author"], user.username.as_str());
        assert_eq!(body["author_uuid"], user.uuid.to_string().as_str());
        assert_eq!(body["content"], "first!");
        assert!(body["parent_id"].is_null());
    })
}

#[test]
fn legacy_comment_field_is_accepted() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_legacy").await;
        let post = app.create_post(&user, "legacy").await;

        let resp = app
            .post_json(
                &format!("/posts/{}/comment/add", post),
                json!({ "comment": "old form field" }),
                Some(&user.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.json()["content"], "old form field");
    })
}

#[test]
fn comment_content_is_validated() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_invalid").await;
        let post = app.create_post(&user, "invalid").await;
        let path = format!("/posts/{}/comment/add", post);

        let resp = app.post_json(&path, json!({ "content": "   " }), Some(&user.access_token)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_message(), "comment content is required");

        let resp = app
            .post_json(&path, json!({ "content": "x".repeat(301) }), Some(&user.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_message(), "comment content must be at most 300 characters");

        let resp = app
            .post_json(&path, json!({ "content": "x".repeat(300) }), Some(&user.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::CREATED);
    })
}

#[test]
fn parent_on_another_post_is_rejected() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_cross").await;
        let first = app.create_post(&user, "first").await;
        let second = app.create_post(&user, "second").await;

        let parent = app
            .post_json(
                &format!("/posts/{}/comment/add", first),
                json!({ "content": "on first" }),
                Some(&user.access_token),
            )
            .await
            .json();

        let resp = app
            .post_json(
                &format!("/posts/{}/comment/add", second),
                json!({ "content": "reply", "parent_id": parent["id"] }),
                Some(&user.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_message(), "parent comment does not belong to this post");

        let resp = app
            .post_json(
                &format!("/posts/{}/comment/add", second),
                json!({ "content": "reply", "parent_id": 999999999 }),
                Some(&user.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    })
}

#[test]
fn thread_nests_one_level_of_replies() {
    run(async {
        let app = app().await;
        let author = app.create_user("thread_author").await;
        let viewer = app.create_user("thread_viewer").await;
        let post = app.create_post(&author, "thread").await;
        let add = format!("/posts/{}/comment/add", post);

        let root = app
            .post_json(&add, json!({ "content": "root" }), Some(&author.access_token))
            .await
            .json();
        let reply = app
            .post_json(
                &add,
                json!({ "content": "reply", "parent_id": root["id"] }),
                Some(&viewer.access_token),
            )
            .await
            .json();
        app.post_json(
            &add,
            json!({ "content": "reply to reply", "parent_id": reply["id"] }),
            Some(&author.access_token),
        )
        .await;
        app.post_json(&add, json!({ "content": "second root" }), Some(&viewer.access_token))
            .await;

        app.post_empty(
            &format!("/comments/{}/like", root["id"].as_i64().unwrap()),
            Some(&viewer.access_token),
        )
        .await;

        let resp = app
            .get(&format!("/posts/{}/comment/get", post), Some(&viewer.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        let comments = resp.json()["comments"].as_array().unwrap().clone();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "root");
        assert_eq!(comments[0]["likes"], 1);
        assert_eq!(comments[0]["liked"], true);
        assert_eq!(comments[1]["content"], "second root");

        let replies = comments[0]["replies"].as_array().unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["content"], "reply");
        assert_eq!(replies[0]["parent_id"], root["id"]);
        assert!(replies[0].get("replies").is_none());

        // Anonymous viewers never see liked = true.
        let anon = app.get(&format!("/posts/{}/comment/get", post), None).await.json();
        assert_eq!(anon["comments"][0]["likes"], 1);
        assert_eq!(anon["comments"][0]["liked"], false);
    })
}

#[test]
fn comments_on_unknown_post_are_not_found() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_missing").await;

        let resp = app.get(&format!("/posts/{}/comment/get", Uuid::new_v4()), None).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = app
            .post_json(
                &format!("/posts/{}/comment/add", Uuid::new_v4()),
                json!({ "content": "hello" }),
                Some(&user.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    })
}

#[test]
fn comment_module_like_is_not_implemented() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_stub").await;
        let post = app.create_post(&user, "stub").await;

        let resp = app
            .post_empty(&format!("/posts/{}/comment/like", post), Some(&user.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::NOT_IMPLEMENTED);
    })
}

#[test]
fn malformed_parent_id_is_a_bad_request() {
    run(async {
        let app = app().await;
        let user = app.create_user("comment_bad_parent").await;
        let post = app.create_post(&user, "bad parent").await;

        let resp = app
            .post_json(
                &format!("/posts/{}/comment/add", post),
                json!({ "content": "reply", "parent_id": "abc" }),
                Some(&user.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.error_message().contains("parent_id"), "{}", resp.error_message());
    })
}
