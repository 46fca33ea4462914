use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn post_is_attributed_to_caller_and_linked_from_profile() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .post_with_token(
                routes::POSTS,
                &json!({
                    "title": "  Sunset  ",
                    "caption": "Golden hour",
                    "mediaUrl": "https://cdn.example.com/videos/1_clip.mp4",
                    "mediaType": "video",
                }),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let post = &res.body["data"];
        assert_eq!(post["title"], "Sunset");
        assert_eq!(post["author"], "alice");
        assert_eq!(post["userId"], alice.id.as_str());
        assert_eq!(post["mediaType"], "video");
        assert_eq!(post["likes"], json!([]));
        assert_eq!(post["likesCount"], 0);

        let user = app.user_body(&alice.id).await;
        assert_eq!(user["posts"], json!([post["id"]]));
    }

    #[tokio::test]
    async fn media_type_defaults_to_image() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let id = app.create_post(&alice, "Sunset").await;

        let res = app.get_without_token(&routes::post(&id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"]["mediaType"], "image");
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::POSTS,
                &json!({"title": "t", "caption": "c", "mediaUrl": "https://x/y.jpg"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .post_with_token(
                routes::POSTS,
                &json!({"title": "  ", "caption": "c", "mediaUrl": "https://x/y.jpg"}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn listing_is_newest_first_with_pagination_metadata() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let mut ids = Vec::new();
        for i in 0..15 {
            ids.push(app.create_post(&alice, &format!("Post {i}")).await);
        }

        let res = app
            .get_without_token(&format!("{}?page=2&limit=10", routes::POSTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let data = &res.body["data"];
        let posts = data["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 5);
        assert_eq!(posts[0]["id"], ids[4].as_str());
        assert_eq!(posts[4]["id"], ids[0].as_str());

        let meta = &data["pagination"];
        assert_eq!(meta["currentPage"], 2);
        assert_eq!(meta["totalPages"], 2);
        assert_eq!(meta["totalPosts"], 15);
        assert_eq!(meta["hasNextPage"], false);
        assert_eq!(meta["hasPrevPage"], true);
    }

    #[tokio::test]
    async fn bad_paging_values_fall_back_to_defaults() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        app.create_post(&alice, "Only").await;

        let res = app
            .get_without_token(&format!("{}?page=abc&limit=-3", routes::POSTS))
            .await;

        assert_eq!(res.status, 200);
        let meta = &res.body["data"]["pagination"];
        assert_eq!(meta["currentPage"], 1);
        assert_eq!(meta["totalPages"], 1);
        assert_eq!(meta["hasPrevPage"], false);
    }

    #[tokio::test]
    async fn page_beyond_u64_offsets_returns_an_empty_page() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        app.create_post(&alice, "Only").await;

        let res = app
            .get_without_token(&format!("{}?page={}", routes::POSTS, u64::MAX))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["posts"], json!([]));
        let meta = &res.body["data"]["pagination"];
        assert_eq!(meta["currentPage"], u64::MAX);
        assert_eq!(meta["totalPosts"], 1);
        assert_eq!(meta["hasNextPage"], false);
        assert_eq!(meta["hasPrevPage"], true);
    }

    #[tokio::test]
    async fn listing_by_author_only_includes_their_posts() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let mine = app.create_post(&alice, "Mine").await;
        app.create_post(&bob, "Theirs").await;

        let res = app.get_without_token(&routes::posts_by_user(&alice.id)).await;

        assert_eq!(res.status, 200);
        let posts = res.body["data"]["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["id"], mine.as_str());
        assert_eq!(res.body["data"]["pagination"]["totalPosts"], 1);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&routes::post("0190a4b2-7c3d-7000-8000-000000000000"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let res = app.get_without_token(&routes::post("42")).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Invalid post ID format");
    }
}

mod update_and_delete {
    use super::*;

    fn replacement() -> serde_json::Value {
        json!({
            "title": "Sunrise",
            "caption": "Blue hour",
            "mediaUrl": "https://cdn.example.com/images/2_sunrise.jpg",
        })
    }

    #[tokio::test]
    async fn owner_replaces_content_and_keeps_likes() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let id = app.create_post(&alice, "Sunset").await;
        app.put_with_token(&routes::like(&id), &json!({}), &bob.token)
            .await;

        let res = app
            .put_with_token(&routes::post(&id), &replacement(), &alice.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let post = &res.body["data"];
        assert_eq!(post["title"], "Sunrise");
        assert_eq!(post["mediaUrl"], "https://cdn.example.com/images/2_sunrise.jpg");
        assert_eq!(post["likesCount"], 1);
        assert_eq!(post["author"], "alice");
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let id = app.create_post(&alice, "Sunset").await;

        let res = app
            .put_with_token(&routes::post(&id), &replacement(), &bob.token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "FORBIDDEN");

        let res = app.delete_with_token(&routes::post(&id), &bob.token).await;
        assert_eq!(res.status, 403);

        let res = app.get_without_token(&routes::post(&id)).await;
        assert_eq!(res.body["data"]["title"], "Sunset");
    }

    #[tokio::test]
    async fn delete_removes_post_and_back_reference() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let id = app.create_post(&alice, "Sunset").await;

        let res = app.delete_with_token(&routes::post(&id), &alice.token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);

        let res = app.get_without_token(&routes::post(&id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(app.user_body(&alice.id).await["posts"], json!([]));

        let res = app.delete_with_token(&routes::post(&id), &alice.token).await;
        assert_eq!(res.status, 404);
    }
}

mod likes {
    use super::*;

    #[tokio::test]
    async fn toggle_likes_then_unlikes_and_tracks_author_total() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let id = app.create_post(&alice, "Sunset").await;

        let res = app
            .put_with_token(&routes::like(&id), &json!({}), &bob.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let data = &res.body["data"];
        assert_eq!(data["liked"], true);
        assert_eq!(data["likesCount"], 1);
        assert_eq!(data["likes"], json!([bob.id]));
        assert_eq!(data["authorTotalLikes"], 1);
        assert_eq!(res.body["message"], "Post liked");
        assert_eq!(app.user_body(&alice.id).await["totalLikesReceived"], 1);

        let res = app
            .put_with_token(&routes::like(&id), &json!({}), &bob.token)
            .await;
        assert_eq!(res.status, 200);
        let data = &res.body["data"];
        assert_eq!(data["liked"], false);
        assert_eq!(data["likesCount"], 0);
        assert_eq!(data["authorTotalLikes"], 0);
        assert_eq!(res.body["message"], "Post unliked");
    }

    #[tokio::test]
    async fn concurrent_likes_from_different_users_all_survive() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let id = app.create_post(&alice, "Sunset").await;

        let mut fans = Vec::new();
        for i in 0..8 {
            fans.push(app.create_authenticated_user(&format!("fan{i}")).await);
        }

        let like_path = routes::like(&id);
        let body = json!({});
        let responses = futures::future::join_all(
            fans.iter()
                .map(|fan| app.put_with_token(&like_path, &body, &fan.token)),
        )
        .await;
        for res in &responses {
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app.get_without_token(&routes::post(&id)).await;
        assert_eq!(res.body["data"]["likesCount"], 8);
        assert_eq!(res.body["data"]["likes"].as_array().unwrap().len(), 8);
        assert_eq!(app.user_body(&alice.id).await["totalLikesReceived"], 8);
    }

    #[tokio::test]
    async fn liking_requires_authentication_and_an_existing_post() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let id = app.create_post(&alice, "Sunset").await;

        let res = app.put_without_token(&routes::like(&id), &json!({})).await;
        assert_eq!(res.status, 401);

        let res = app
            .put_with_token(
                &routes::like("0190a4b2-7c3d-7000-8000-000000000000"),
                &json!({}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn liking_a_post_whose_author_is_gone_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let id = app.create_post(&alice, "Sunset").await;
        app.delete_with_token(&routes::user(&alice.id), &alice.token)
            .await;

        let res = app
            .put_with_token(&routes::like(&id), &json!({}), &bob.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["message"], "Post author not found");
        let res = app.get_without_token(&routes::post(&id)).await;
        assert_eq!(res.body["data"]["likesCount"], 0);
    }
}
