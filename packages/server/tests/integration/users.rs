use serde_json::json;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_and_password_is_never_returned() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::USERS,
                &json!({
                    "username": "alice",
                    "email": "Alice@Example.com",
                    "password": "securepass",
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["success"], true);
        let user = &res.body["data"];
        assert!(user["id"].is_string());
        assert_eq!(user["username"], "alice");
        assert_eq!(user["email"], "alice@example.com");
        assert_eq!(user["bio"], "");
        assert_eq!(user["profileImage"], "");
        assert_eq!(user["totalLikesReceived"], 0);
        assert_eq!(user["posts"], json!([]));
        assert!(user.get("password").is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::USERS,
                &json!({
                    "username": "alice",
                    "email": "other@example.com",
                    "password": "securepass",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "CONFLICT");
        assert_eq!(res.body["success"], false);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::USERS,
                &json!({
                    "username": "alicia",
                    "email": "ALICE@example.com",
                    "password": "securepass",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let app = TestApp::spawn().await;

        for body in [
            json!({"username": "al", "email": "a@example.com", "password": "securepass"}),
            json!({"username": "alice", "email": "not-an-email", "password": "securepass"}),
            json!({"username": "alice", "email": "a@example.com", "password": "short"}),
            json!({"username": "no spaces!", "email": "a@example.com", "password": "securepass"}),
        ] {
            let res = app.post_without_token(routes::USERS, &body).await;
            assert_eq!(res.status, 400, "body {body} was accepted");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::USERS, &json!({"username": 42}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_returns_token_usable_for_me() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(routes::ME, &alice.token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["id"], alice.id.as_str());
        assert_eq!(res.body["data"]["username"], "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice", "password": "wrongpass"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_user_looks_like_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "nobody", "password": "securepass"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn me_requires_a_valid_token() {
        let app = TestApp::spawn().await;

        let missing = app.get_without_token(routes::ME).await;
        assert_eq!(missing.status, 401);
        assert_eq!(missing.body["code"], "TOKEN_MISSING");

        let invalid = app.get_with_token(routes::ME, "not-a-jwt").await;
        assert_eq!(invalid.status, 401);
        assert_eq!(invalid.body["code"], "TOKEN_INVALID");
    }
}

mod profile {
    use super::*;

    #[tokio::test]
    async fn users_can_be_found_by_id_and_username() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let by_id = app.user_body(&alice.id).await;
        assert_eq!(by_id["username"], "alice");

        let res = app.get_without_token(&routes::profile("alice")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"]["id"], alice.id.as_str());

        let res = app.get_without_token(&routes::profile("nobody")).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::user("not-a-uuid")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], "Invalid user ID format");
    }

    #[tokio::test]
    async fn owner_can_update_profile_and_log_in_with_new_password() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .put_with_token(
                &routes::user(&alice.id),
                &json!({"bio": "Sunsets only", "password": "newsecret"}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["bio"], "Sunsets only");
        assert_eq!(res.body["data"]["username"], "alice");

        let old = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice", "password": "securepass"}),
            )
            .await;
        assert_eq!(old.status, 401);

        let new = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice", "password": "newsecret"}),
            )
            .await;
        assert_eq!(new.status, 200);
    }

    #[tokio::test]
    async fn users_cannot_update_or_delete_someone_else() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;

        let res = app
            .put_with_token(&routes::user(&alice.id), &json!({"bio": "hacked"}), &bob.token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "FORBIDDEN");

        let res = app.delete_with_token(&routes::user(&alice.id), &bob.token).await;
        assert_eq!(res.status, 403);

        assert_eq!(app.user_body(&alice.id).await["bio"], "");
    }

    #[tokio::test]
    async fn deleted_account_disappears_but_keeps_its_posts() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let post_id = app.create_post(&alice, "Sunset").await;

        let res = app.delete_with_token(&routes::user(&alice.id), &alice.token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);

        let res = app.get_without_token(&routes::user(&alice.id)).await;
        assert_eq!(res.status, 404);

        let res = app.get_without_token(&routes::post(&post_id)).await;
        assert_eq!(res.status, 200);
    }
}

mod leaderboard {
    use super::*;

    #[tokio::test]
    async fn ranked_by_likes_received_with_positional_ranks() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let carol = app.create_authenticated_user("carol").await;

        let bobs_post = app.create_post(&bob, "Bob's").await;
        let res = app
            .put_with_token(&routes::like(&bobs_post), &json!({}), &alice.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let res = app
            .put_with_token(&routes::like(&bobs_post), &json!({}), &carol.token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .get_without_token(&format!("{}?limit=2", routes::LEADERBOARD))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let board = res.body["data"].as_array().unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0]["rank"], 1);
        assert_eq!(board[0]["username"], "bob");
        assert_eq!(board[0]["totalLikesReceived"], 2);
        assert_eq!(board[1]["rank"], 2);
        assert_eq!(board[1]["username"], "alice");
        assert_eq!(board[1]["totalLikesReceived"], 0);
    }

    #[tokio::test]
    async fn non_numeric_limit_falls_back_to_default() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .get_without_token(&format!("{}?limit=lots", routes::LEADERBOARD))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    }
}

mod reconcile {
    use super::*;

    #[tokio::test]
    async fn consistent_account_reports_no_changes() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let post_id = app.create_post(&alice, "Sunset").await;

        let res = app
            .post_with_token(&routes::reconcile(&alice.id), &json!({}), &alice.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let report = &res.body["data"];
        assert_eq!(report["userId"], alice.id.as_str());
        assert_eq!(report["added"], json!([]));
        assert_eq!(report["removed"], json!([]));
        assert_eq!(report["posts"], json!([post_id]));
        assert_eq!(report["totalLikesReceived"], 0);
        assert_eq!(report["likesHeld"], 0);
    }

    #[tokio::test]
    async fn only_the_account_owner_can_reconcile() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;

        let res = app
            .post_with_token(&routes::reconcile(&alice.id), &json!({}), &bob.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "FORBIDDEN");
    }
}
