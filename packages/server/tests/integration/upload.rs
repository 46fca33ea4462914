use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::common::{KIB, MAX_IMAGE_BYTES, TRANSCODED, TestApp, routes};

#[tokio::test]
async fn image_is_stored_under_images_and_served_from_media() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;
    let bytes = vec![7u8; 4 * KIB];

    let res = app
        .upload_with_token("my photo!.png", "image/png", bytes.clone(), &alice.token)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["mediaType"], "image");
    let key = res.body["key"].as_str().unwrap();
    assert!(key.starts_with("images/"), "unexpected key {key}");
    assert!(key.ends_with("_myphoto.png"), "unexpected key {key}");
    let media_url = res.body["mediaUrl"].as_str().unwrap();
    assert_eq!(media_url, format!("/media/{key}"));

    assert_eq!(std::fs::read(app.media_root().join(key)).unwrap(), bytes);
    let served = app
        .client
        .get(format!("http://{}{}", app.addr, media_url))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status().as_u16(), 200);
    assert_eq!(served.bytes().await.unwrap().to_vec(), bytes);
    assert_eq!(app.transcoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn video_is_transcoded_to_mp4_and_scratch_is_cleaned() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .upload_with_token("clip.mov", "video/quicktime", vec![1u8; 100 * KIB], &alice.token)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["mediaType"], "video");
    let key = res.body["key"].as_str().unwrap();
    assert!(key.starts_with("videos/") && key.ends_with(".mp4"), "unexpected key {key}");
    assert_eq!(std::fs::read(app.media_root().join(key)).unwrap(), TRANSCODED);
    assert_eq!(app.transcoder.calls.load(Ordering::SeqCst), 1);
    assert!(app.scratch_is_empty());
}

#[tokio::test]
async fn video_upload_completes_after_client_hangs_up() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;
    app.transcoder.hold.store(true, Ordering::SeqCst);

    let part = reqwest::multipart::Part::bytes(vec![1u8; KIB])
        .file_name("clip.mp4")
        .mime_str("video/mp4")
        .unwrap();
    let sent = app
        .client
        .post(format!("http://{}{}", app.addr, routes::UPLOAD))
        .header("Authorization", format!("Bearer {}", alice.token))
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .timeout(Duration::from_millis(500))
        .send()
        .await;
    assert!(sent.is_err_and(|e| e.is_timeout()));
    assert!(
        app.eventually(|| app.transcoder.calls.load(Ordering::SeqCst) == 1)
            .await
    );

    app.transcoder.release.notify_one();

    let videos = app.media_root().join("videos");
    let stored = || {
        std::fs::read_dir(&videos)
            .map(|entries| entries.filter_map(Result::ok).count() == 1)
            .unwrap_or(false)
    };
    assert!(app.eventually(stored).await, "transcoded video was never stored");
    assert!(app.eventually(|| app.scratch_is_empty()).await);
}

#[tokio::test]
async fn uploaded_media_can_back_a_post() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;
    let upload = app
        .upload_with_token("clip.webm", "video/webm", vec![1u8; KIB], &alice.token)
        .await;
    assert_eq!(upload.status, 200, "{}", upload.text);

    let res = app
        .post_with_token(
            routes::POSTS,
            &serde_json::json!({
                "title": "Clip",
                "caption": "Short one",
                "mediaUrl": upload.body["mediaUrl"],
                "mediaType": upload.body["mediaType"],
            }),
            &alice.token,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["data"]["mediaType"], "video");
    assert_eq!(res.body["data"]["mediaUrl"], upload.body["mediaUrl"]);
}

#[tokio::test]
async fn oversized_image_is_rejected_before_storage() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .upload_with_token(
            "big.jpg",
            "image/jpeg",
            vec![0u8; MAX_IMAGE_BYTES + 1],
            &alice.token,
        )
        .await;

    assert_eq!(res.status, 413, "{}", res.text);
    assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
    assert!(!app.media_root().join("images").exists());
}

#[tokio::test]
async fn disallowed_type_is_unsupported() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .upload_with_token("doc.pdf", "application/pdf", vec![0u8; KIB], &alice.token)
        .await;

    assert_eq!(res.status, 415);
    assert_eq!(res.body["code"], "UNSUPPORTED_MEDIA_TYPE");
}

#[tokio::test]
async fn form_without_file_part_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let form = reqwest::multipart::Form::new().text("caption", "no file here");
    let res = app
        .client
        .post(format!("http://{}{}", app.addr, routes::UPLOAD))
        .header("Authorization", format!("Bearer {}", alice.token))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let res = crate::common::TestResponse::from_response(res).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(res.body["message"], "No file uploaded");
}

#[tokio::test]
async fn upload_requires_authentication() {
    let app = TestApp::spawn().await;

    let part = reqwest::multipart::Part::bytes(vec![0u8; KIB])
        .file_name("a.png")
        .mime_str("image/png")
        .unwrap();
    let res = app
        .client
        .post(format!("http://{}{}", app.addr, routes::UPLOAD))
        .multipart(reqwest::multipart::Form::new().part("file", part))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
}
