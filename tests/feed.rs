//! Feed paging tests. Kept in their own binary so no other test adds posts
//! while the page counts are checked.

mod common;

use axum::http::StatusCode;
use common::{app, run};

fn titles(body: &serde_json::Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn feed_pages_are_lenient() {
    run(async {
        let app = app().await;
        let user = app.create_user("feed_author").await;

        let empty = app.get("/posts", None).await;
        assert_eq!(empty.status, StatusCode::OK);
        let body = empty.json();
        assert_eq!(body["page"], 1);
        assert_eq!(body["num_pages"], 1);
        assert!(body["items"].as_array().unwrap().is_empty());

        let mut created = Vec::new();
        for n in 1..=4 {
            created.push(app.create_post(&user, &format!("post {}", n)).await);
        }

        let first = app.get("/posts?page=1", None).await.json();
        assert_eq!(titles(&first), vec!["post 4", "post 3", "post 2"]);
        assert_eq!(first["num_pages"], 2);
        assert_eq!(first["has_next"], true);
        assert_eq!(first["has_previous"], false);

        let second = app.get("/posts?page=2", None).await.json();
        assert_eq!(titles(&second), vec!["post 1"]);
        assert_eq!(second["has_next"], false);
        assert_eq!(second["has_previous"], true);

        let garbage = app.get("/posts?page=abc", None).await.json();
        assert_eq!(garbage["page"], 1);

        let past_end = app.get("/posts?page=99", None).await.json();
        assert_eq!(past_end["page"], 2);

        let zero = app.get("/posts?page=0", None).await.json();
        assert_eq!(zero["page"], 2);

        // An update moves the post to the front and invalidates cached pages.
        let resp = app
            .post_multipart(
                &format!("/posts/{}/update", created[0]),
                &[("title", "post 1 edited"), ("content", "body")],
                None,
                Some(&user.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK);

        let first = app.get("/posts", None).await.json();
        assert_eq!(titles(&first), vec!["post 1 edited", "post 4", "post 3"]);
    })
}
