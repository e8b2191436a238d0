mod common;

use common::{get_page, location, messages};
use flixblog::models::{comment, Comment};
use reqwest::StatusCode;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn logged_in_comment_is_added() {
    let app = common::spawn_app().await;
    let (client, user_id) = app.signup("ana").await;
    let post = app.create_post(user_id, "Talk About It").await;

    let resp = client
        .post(app.url("/talk-about-it/"))
        .form(&[("body", "  Loved the ending.  ")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/talk-about-it/");

    let (status, page) = get_page(&app, &client, "/talk-about-it/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages(&page), vec!["Comment added!"]);

    let comments = page["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["body"], "Loved the ending.");
    assert_eq!(comments[0]["author"]["username"], "ana");

    // The POST and the GET both count as views.
    assert_eq!(app.reload_post(post.id).await.unwrap().views, 2);
}

#[tokio::test]
async fn comments_are_listed_newest_first() {
    let app = common::spawn_app().await;
    let (author, author_id) = app.signup("ben").await;
    let (reader, _) = app.signup("cleo").await;
    app.create_post(author_id, "Thread").await;

    for (client, body) in [(&author, "first"), (&reader, "second"), (&author, "third")] {
        let resp = client
            .post(app.url("/thread/"))
            .form(&[("body", body)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    let (_, page) = get_page(&app, &app.client, "/thread/").await;
    let bodies: Vec<&str> = page["data"]["comments"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["body"].as_str())
        .collect();
    assert_eq!(bodies, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn anonymous_comment_is_ignored() {
    let app = common::spawn_app().await;
    let (_, user_id) = app.signup("dan").await;
    let post = app.create_post(user_id, "Open Thread").await;

    let resp = app
        .client
        .post(app.url("/open-thread/"))
        .form(&[("body", "drive-by")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let page: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(page["data"]["post"]["slug"], "open-thread");
    assert_eq!(page["data"]["comment_form"]["data"]["body"], "");
    assert_eq!(page["data"]["comments"], serde_json::json!([]));

    let count = Comment::find()
        .filter(comment::Column::PostId.eq(post.id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(app.reload_post(post.id).await.unwrap().views, 1);
}

#[tokio::test]
async fn blank_comment_rerenders_with_errors() {
    let app = common::spawn_app().await;
    let (client, user_id) = app.signup("eve").await;
    app.create_post(user_id, "Quiet").await;

    let resp = client
        .post(app.url("/quiet/"))
        .form(&[("body", "   ")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let page: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        page["data"]["comment_form"]["errors"]["body"][0],
        "This field is required."
    );
    assert_eq!(page["data"]["post"]["title"], "Quiet");
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = common::spawn_app().await;
    let (client, _) = app.signup("finn").await;

    let resp = client
        .post(app.url("/no-such-post/"))
        .form(&[("body", "hello?")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
