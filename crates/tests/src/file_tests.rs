use crate::fixtures::test_app::TestApp;
use serde_json::Value;

fn pdf_part(name: &str, bytes: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str("application/pdf")
        .unwrap()
}

fn png_part(name: &str, bytes: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes)
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap()
}

async fn upload(
    app: &TestApp,
    token: &str,
    category: &str,
    parts: Vec<reqwest::multipart::Part>,
) -> (u16, Value) {
    let mut form = reqwest::multipart::Form::new().text("category", category.to_string());
    for part in parts {
        form = form.part("file", part);
    }
    let resp = app
        .client
        .post(app.url("/api/file/upload"))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let json: Value = resp.json().await.unwrap();
    (status, json)
}

#[tokio::test]
async fn upload_and_retrieve_round_trip() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("updown").await;

    let content = b"%PDF-1.4 one megabyte of career advice".to_vec();
    let (status, json) = upload(
        &app,
        &pair.mentee.access_token,
        "resumes",
        vec![pdf_part("resume.pdf", content.clone())],
    )
    .await;
    assert_eq!(status, 200, "{}", json);
    let file = &json["files"][0];
    assert_eq!(file["original_name"], "resume.pdf");
    assert_eq!(file["content_type"], "application/pdf");
    assert_eq!(file["size"], content.len() as u64);
    let filename = file["filename"].as_str().unwrap();
    assert_ne!(filename, "resume.pdf", "storage key must be generated");

    // Retrieval by the generated name streams the same bytes back
    let resp = app
        .auth_get(&format!("/api/file/{}", filename), &pair.mentee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert!(
        resp.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .starts_with("inline")
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.to_vec(), content);
}

#[tokio::test]
async fn upload_enforces_type_allow_lists() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("types").await;

    // Executables never pass the resume field
    let exe = reqwest::multipart::Part::bytes(b"MZ\x90\x00".to_vec())
        .file_name("payload.exe")
        .mime_str("application/octet-stream")
        .unwrap();
    let (status, json) = upload(&app, &pair.mentee.access_token, "resumes", vec![exe]).await;
    assert_eq!(status, 400);
    assert!(
        json["message"].as_str().unwrap().contains("pdf, doc, docx"),
        "error should name the allowed types: {}",
        json
    );

    // Images are rejected for resumes but fine for avatars
    let (status, _) = upload(
        &app,
        &pair.mentee.access_token,
        "resumes",
        vec![png_part("me.png", b"\x89PNG fake".to_vec())],
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = upload(
        &app,
        &pair.mentee.access_token,
        "avatars",
        vec![png_part("me.png", b"\x89PNG fake".to_vec())],
    )
    .await;
    assert_eq!(status, 200);

    // Unknown category is rejected up front
    let (status, _) = upload(
        &app,
        &pair.mentee.access_token,
        "warez",
        vec![pdf_part("x.pdf", b"%PDF-1.4".to_vec())],
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn upload_enforces_size_and_count_ceilings() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("limits").await;

    // 6 MiB against a 5 MiB ceiling
    let (status, json) = upload(
        &app,
        &pair.mentee.access_token,
        "general",
        vec![pdf_part("big.pdf", vec![0u8; 6 * 1024 * 1024])],
    )
    .await;
    assert_eq!(status, 400);
    assert!(json["message"].as_str().unwrap().contains("too large"));

    // A sixth file in one request is one too many
    let parts: Vec<_> = (0..6)
        .map(|i| pdf_part(&format!("doc{}.pdf", i), b"%PDF-1.4".to_vec()))
        .collect();
    let (status, json) = upload(&app, &pair.mentee.access_token, "general", parts).await;
    assert_eq!(status, 400);
    assert!(json["message"].as_str().unwrap().contains("at most 5"));

    // No file at all
    let (status, _) = upload(&app, &pair.mentee.access_token, "general", vec![]).await;
    assert_eq!(status, 400);

    // Uploading needs a principal
    let form = reqwest::multipart::Form::new()
        .text("category", "general")
        .part("file", pdf_part("x.pdf", b"%PDF-1.4".to_vec()));
    let resp = app
        .anonymous_client()
        .post(app.url("/api/file/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn private_categories_are_gated() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("gating").await;

    let (_, json) = upload(
        &app,
        &pair.mentee.access_token,
        "resumes",
        vec![pdf_part("cv.pdf", b"%PDF-1.4 secret".to_vec())],
    )
    .await;
    let resume_name = json["files"][0]["filename"].as_str().unwrap().to_string();

    let (_, json) = upload(
        &app,
        &pair.mentee.access_token,
        "avatars",
        vec![png_part("face.png", b"\x89PNG public".to_vec())],
    )
    .await;
    let avatar_name = json["files"][0]["filename"].as_str().unwrap().to_string();

    let anon = app.anonymous_client();

    // Resume: anonymous rejected, authenticated served
    let resp = anon
        .get(app.url(&format!("/api/file/{}", resume_name)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .auth_get(
            &format!("/api/file/{}", resume_name),
            &pair.mentor.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Avatar: public, no principal needed
    let resp = anon
        .get(app.url(&format!("/api/file/{}", avatar_name)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Unknown object is a 404 either way
    let resp = anon
        .get(app.url("/api/file/no-such-object.pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn download_by_id_uses_attachment_disposition() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("download").await;

    let content = b"%PDF-1.4 download me".to_vec();
    let (_, json) = upload(
        &app,
        &pair.mentee.access_token,
        "general",
        vec![pdf_part("guide.pdf", content.clone())],
    )
    .await;
    let file_id = json["files"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .auth_get(
            &format!("/api/file/{}/download", file_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("guide.pdf"));
    assert_eq!(resp.bytes().await.unwrap().to_vec(), content);

    // Download requires auth
    let resp = app
        .anonymous_client()
        .get(app.url(&format!("/api/file/{}/download", file_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn delete_is_restricted_to_uploader_or_admin() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("filedel").await;
    let admin = app.seed_admin("filedel").await;

    let (_, json) = upload(
        &app,
        &pair.mentee.access_token,
        "general",
        vec![pdf_part("a.pdf", b"%PDF-1.4 a".to_vec())],
    )
    .await;
    let first_id = json["files"][0]["id"].as_str().unwrap().to_string();

    let (_, json) = upload(
        &app,
        &pair.mentee.access_token,
        "general",
        vec![pdf_part("b.pdf", b"%PDF-1.4 b".to_vec())],
    )
    .await;
    let second_id = json["files"][0]["id"].as_str().unwrap().to_string();

    // Another user cannot delete
    let resp = app
        .auth_delete(
            &format!("/api/file/{}", first_id),
            &pair.mentor.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // The uploader can
    let resp = app
        .auth_delete(
            &format!("/api/file/{}", first_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Hard delete: a second attempt finds nothing
    let resp = app
        .auth_delete(
            &format!("/api/file/{}", first_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    // An admin can delete anyone's file
    let resp = app
        .auth_delete(&format!("/api/file/{}", second_id), &admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn user_file_listing_is_self_or_admin() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("filelist").await;
    let admin = app.seed_admin("filelist").await;

    upload(
        &app,
        &pair.mentee.access_token,
        "resumes",
        vec![pdf_part("cv.pdf", b"%PDF-1.4 mine".to_vec())],
    )
    .await;
    upload(
        &app,
        &pair.mentee.access_token,
        "avatars",
        vec![png_part("me.png", b"\x89PNG mine".to_vec())],
    )
    .await;

    // Self: both descriptors, newest first
    let resp = app
        .auth_get(
            &format!("/api/file/user/{}", pair.mentee.id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().any(|f| f["category"] == "resumes"));
    assert!(items.iter().any(|f| f["category"] == "avatars"));

    // Another user: forbidden
    let resp = app
        .auth_get(
            &format!("/api/file/user/{}", pair.mentee.id),
            &pair.mentor.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Admin: allowed
    let resp = app
        .auth_get(
            &format!("/api/file/user/{}", pair.mentee.id),
            &admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}
