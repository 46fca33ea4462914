use futures::future::join_all;
use media::MediaType;
use snapgram::repository::sql::{SqlPostRepository, SqlUserRepository};
use snapgram::repository::{
    NewPost, NewUser, PostRecord, PostRepository, RepoError, UserRecord, UserRepository,
};

use crate::common::postgres::fresh_database;

struct Store {
    users: SqlUserRepository,
    posts: SqlPostRepository,
}

impl Store {
    async fn new() -> Self {
        let db = fresh_database().await;
        Self {
            users: SqlUserRepository::new(db.clone()),
            posts: SqlPostRepository::new(db),
        }
    }

    async fn user(&self, name: &str) -> UserRecord {
        self.users
            .insert(new_user(name, &format!("{name}@example.com")))
            .await
            .unwrap()
    }

    async fn post_by(&self, author: &UserRecord) -> PostRecord {
        let post = self
            .posts
            .insert(NewPost {
                title: "Sunset".into(),
                caption: "Golden hour".into(),
                author: author.username.clone(),
                user_id: author.id,
                media_url: "https://cdn.example.com/images/1_sunset.jpg".into(),
                media_type: MediaType::Image,
            })
            .await
            .unwrap();
        assert!(self.users.push_post(author.id, post.id).await.unwrap());
        post
    }
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.into(),
        email: email.into(),
        password: "unused".into(),
        bio: String::new(),
        profile_image: String::new(),
    }
}

mod likes {
    use super::*;

    #[tokio::test]
    async fn add_and_remove_are_idempotent_and_refresh_recounts() {
        let store = Store::new().await;
        let alice = store.user("alice").await;
        let bob = store.user("bob").await;
        let post = store.post_by(&alice).await;

        assert!(store.posts.add_like(post.id, bob.id).await.unwrap());
        assert!(!store.posts.add_like(post.id, bob.id).await.unwrap());
        let refreshed = store.posts.refresh_likes_count(post.id).await.unwrap().unwrap();
        assert_eq!(refreshed.likes, vec![bob.id]);
        assert_eq!(refreshed.likes_count, 1);

        assert!(store.posts.remove_like(post.id, bob.id).await.unwrap());
        assert!(!store.posts.remove_like(post.id, bob.id).await.unwrap());
        let refreshed = store.posts.refresh_likes_count(post.id).await.unwrap().unwrap();
        assert!(refreshed.likes.is_empty());
        assert_eq!(refreshed.likes_count, 0);
    }

    #[tokio::test]
    async fn concurrent_likes_are_all_counted() {
        let store = Store::new().await;
        let alice = store.user("alice").await;
        let post = store.post_by(&alice).await;
        let mut fans = Vec::new();
        for i in 0..8 {
            fans.push(store.user(&format!("fan{i}")).await);
        }

        let results = join_all(fans.iter().map(|fan| async {
            let added = store.posts.add_like(post.id, fan.id).await?;
            let refreshed = store.posts.refresh_likes_count(post.id).await?;
            let total = store.users.adjust_likes_received(alice.id, 1).await?;
            Ok::<_, RepoError>((added, refreshed, total))
        }))
        .await;
        for result in results {
            let (added, refreshed, total) = result.unwrap();
            assert!(added);
            assert!(refreshed.is_some());
            assert!(total.is_some());
        }

        let stored = store.posts.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.likes.len(), 8);
        assert_eq!(stored.likes_count, 8);
        let author = store.users.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(author.total_likes_received, 8);
    }

    #[tokio::test]
    async fn like_on_deleted_post_is_not_inserted() {
        let store = Store::new().await;
        let alice = store.user("alice").await;
        let bob = store.user("bob").await;
        let post = store.post_by(&alice).await;
        assert!(store.posts.delete(post.id).await.unwrap());

        assert!(!store.posts.add_like(post.id, bob.id).await.unwrap());
        assert!(store.posts.refresh_likes_count(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn received_total_floors_at_zero() {
        let store = Store::new().await;
        let alice = store.user("alice").await;

        assert_eq!(
            store.users.adjust_likes_received(alice.id, 2).await.unwrap(),
            Some(2)
        );
        assert_eq!(
            store.users.adjust_likes_received(alice.id, -5).await.unwrap(),
            Some(0)
        );
        assert_eq!(
            store
                .users
                .adjust_likes_received(uuid::Uuid::now_v7(), 1)
                .await
                .unwrap(),
            None
        );
    }
}

mod users {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_or_email_is_a_conflict() {
        let store = Store::new().await;
        store.user("alice").await;

        let err = store
            .users
            .insert(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)), "{err:?}");

        let err = store
            .users
            .insert(new_user("carol", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)), "{err:?}");
    }

    #[tokio::test]
    async fn deleting_a_post_and_pulling_it_clears_the_back_reference() {
        let store = Store::new().await;
        let alice = store.user("alice").await;
        let bob = store.user("bob").await;
        let post = store.post_by(&alice).await;
        let other = store.post_by(&alice).await;
        store.posts.add_like(post.id, bob.id).await.unwrap();

        // Appending an id that is already listed is a no-op.
        assert!(store.users.push_post(alice.id, post.id).await.unwrap());
        let listed = store.users.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(listed.posts, vec![post.id, other.id]);

        assert!(store.posts.delete(post.id).await.unwrap());
        assert!(store.posts.find_by_id(post.id).await.unwrap().is_none());
        assert!(!store.posts.delete(post.id).await.unwrap());

        assert!(store.users.pull_post(alice.id, post.id).await.unwrap());
        assert!(!store.users.pull_post(alice.id, post.id).await.unwrap());
        let owner = store.users.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(owner.posts, vec![other.id]);

        let summary = store.posts.author_summary(alice.id).await.unwrap();
        assert_eq!(summary.post_ids, vec![other.id]);
        assert_eq!(summary.likes_held, 0);
    }
}
