use std::time::Duration;

use crate::fixtures::test_app::TestApp;
use bson::{doc, oid::ObjectId};
use serde_json::Value;

/// Sends spaced a few milliseconds apart so store timestamps are strictly
/// increasing.
async fn send_spaced(app: &TestApp, sender: &crate::fixtures::seed::SeededUser, chat_id: &str, content: &str) -> String {
    tokio::time::sleep(Duration::from_millis(5)).await;
    app.send_text(sender, chat_id, content).await
}

#[tokio::test]
async fn listing_is_chronological_across_pages() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("order").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    for content in ["A", "B", "C"] {
        send_spaced(&app, &pair.mentee, &chat_id, content).await;
    }

    // One page holds everything, oldest first
    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message?page=1&per_page=10", chat_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 3);
    let contents: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["A", "B", "C"]);

    // Pagination walks newest-first internally: page 1 is the latest two,
    // still chronological within the page.
    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message?page=1&per_page=2", chat_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let contents: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["B", "C"]);

    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message?page=2&per_page=2", chat_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let contents: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["A"]);
}

#[tokio::test]
async fn unread_counts_accumulate_and_reset_on_listing() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("unread").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    for i in 1..=3 {
        send_spaced(&app, &pair.mentor, &chat_id, &format!("note {}", i)).await;
    }

    // Three unread for the mentee, none for the mentor
    let resp = app
        .auth_get("/api/chat", &pair.mentee.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["unread_count"]["mentee"], 3);
    assert_eq!(json["items"][0]["unread_count"]["mentor"], 0);

    // Listing marks the page read and resets the mentee slot
    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message", chat_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    let mentee_id = pair.mentee.id.as_str();
    for message in json["items"].as_array().unwrap() {
        let readers: Vec<&str> = message["read_by"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["user_id"].as_str().unwrap())
            .collect();
        assert!(readers.contains(&mentee_id), "receipt missing on {}", message["content"]);
    }

    let resp = app
        .auth_get("/api/chat", &pair.mentee.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["unread_count"]["mentee"], 0);
}

#[tokio::test]
async fn concurrent_sends_both_count() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("sendrace").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    // Two mentor sends race the `$inc` on the mentee's unread slot; both
    // must apply.
    let (a, b) = tokio::join!(
        app.send_text(&pair.mentor, &chat_id, "first"),
        app.send_text(&pair.mentor, &chat_id, "second"),
    );
    assert_ne!(a, b);

    let resp = app
        .auth_get("/api/chat", &pair.mentee.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["unread_count"]["mentee"], 2);
}

#[tokio::test]
async fn edit_allowed_only_within_window() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("editwin").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    let message_id = app.send_text(&pair.mentee, &chat_id, "draft").await;

    // Recent message: edit succeeds and flags the message
    let resp = app
        .auth_put(
            &format!("/api/chat/{}/message/{}", chat_id, message_id),
            &pair.mentee.access_token,
        )
        .json(&serde_json::json!({ "content": "final" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"]["content"], "final");
    assert_eq!(json["message"]["is_edited"], true);

    // Backdate the message past the 5-minute window
    let mid = ObjectId::parse_str(&message_id).unwrap();
    let six_minutes_ago =
        bson::DateTime::from_millis(bson::DateTime::now().timestamp_millis() - 6 * 60 * 1000);
    app.db
        .collection::<bson::Document>("messages")
        .update_one(
            doc! { "_id": mid },
            doc! { "$set": { "created_at": six_minutes_ago } },
        )
        .await
        .unwrap();

    let resp = app
        .auth_put(
            &format!("/api/chat/{}/message/{}", chat_id, message_id),
            &pair.mentee.access_token,
        )
        .json(&serde_json::json!({ "content": "too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // A non-sender is rejected regardless of age
    let other = app.send_text(&pair.mentee, &chat_id, "mine").await;
    let resp = app
        .auth_put(
            &format!("/api/chat/{}/message/{}", chat_id, other),
            &pair.mentor.access_token,
        )
        .json(&serde_json::json!({ "content": "hijack" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn delete_is_terminal_and_tombstones() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("tombstone").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    let keep = send_spaced(&app, &pair.mentee, &chat_id, "keep me").await;
    let doomed = send_spaced(&app, &pair.mentee, &chat_id, "delete me").await;

    // Only the sender may delete
    let resp = app
        .auth_delete(
            &format!("/api/chat/{}/message/{}", chat_id, doomed),
            &pair.mentor.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(
            &format!("/api/chat/{}/message/{}", chat_id, doomed),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // The record persists as a tombstone but vanishes from listings
    let record = app
        .db
        .collection::<bson::Document>("messages")
        .find_one(doc! { "_id": ObjectId::parse_str(&doomed).unwrap() })
        .await
        .unwrap()
        .expect("tombstoned record still exists");
    assert_eq!(record.get_str("content").unwrap(), "This message was deleted");
    assert_eq!(record.get_bool("is_deleted").unwrap(), true);

    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message", chat_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["content"], "keep me");

    // Deleted is terminal: no second delete, no edit
    let resp = app
        .auth_delete(
            &format!("/api/chat/{}/message/{}", chat_id, doomed),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_put(
            &format!("/api/chat/{}/message/{}", chat_id, doomed),
            &pair.mentee.access_token,
        )
        .json(&serde_json::json!({ "content": "resurrect" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // The chat summary points back at the surviving message
    let chat = app
        .db
        .collection::<bson::Document>("chats")
        .find_one(doc! { "_id": ObjectId::parse_str(&chat_id).unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        chat.get_object_id("last_message_id").unwrap().to_hex(),
        keep
    );
}

#[tokio::test]
async fn message_requires_content_or_attachment() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("empty").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    let form = reqwest::multipart::Form::new().text("content", "   ");
    let resp = app
        .client
        .post(app.url(&format!("/api/chat/{}/message", chat_id)))
        .header(
            "Authorization",
            format!("Bearer {}", pair.mentee.access_token),
        )
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Over the content ceiling
    let form = reqwest::multipart::Form::new().text("content", "x".repeat(2001));
    let resp = app
        .client
        .post(app.url(&format!("/api/chat/{}/message", chat_id)))
        .header(
            "Authorization",
            format!("Bearer {}", pair.mentee.access_token),
        )
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn outsiders_are_forbidden() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("outsider").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;
    app.send_text(&pair.mentee, &chat_id, "private").await;

    let outsider = app
        .register_user("nosy@outsider.test", "Nosy", "mentee")
        .await;

    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message", chat_id),
            &outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let form = reqwest::multipart::Form::new().text("content", "let me in");
    let resp = app
        .client
        .post(app.url(&format!("/api/chat/{}/message", chat_id)))
        .header("Authorization", format!("Bearer {}", outsider.access_token))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Malformed chat id is rejected before any lookup
    let resp = app
        .auth_get("/api/chat/oops/message", &pair.mentee.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn explicit_mark_read_is_idempotent() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("markread").await;
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;

    let message_id = app.send_text(&pair.mentor, &chat_id, "ack me").await;

    for _ in 0..2 {
        let resp = app
            .auth_put(
                &format!("/api/chat/{}/message/{}/read", chat_id, message_id),
                &pair.mentee.access_token,
            )
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let record = app
        .db
        .collection::<bson::Document>("messages")
        .find_one(doc! { "_id": ObjectId::parse_str(&message_id).unwrap() })
        .await
        .unwrap()
        .unwrap();
    let read_by = record.get_array("read_by").unwrap();
    assert_eq!(read_by.len(), 1, "receipt duplicated");

    // The sender acknowledging their own message is a no-op
    let resp = app
        .auth_put(
            &format!("/api/chat/{}/message/{}/read", chat_id, message_id),
            &pair.mentor.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let record = app
        .db
        .collection::<bson::Document>("messages")
        .find_one(doc! { "_id": ObjectId::parse_str(&message_id).unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.get_array("read_by").unwrap().len(), 1);
}

#[tokio::test]
async fn end_to_end_mentorship_conversation() {
    let app = TestApp::spawn().await;
    let pair = app.seed_pair("e2e").await;

    // Mentee opens the chat: created with zero unread on both sides
    let chat_id = app.open_chat(&pair.mentee, &pair.mentor.id).await;
    let resp = app
        .auth_get("/api/chat", &pair.mentee.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["unread_count"]["mentee"], 0);
    assert_eq!(json["items"][0]["unread_count"]["mentor"], 0);

    // Mentor says hello: one unread for the mentee
    let hello_id = app.send_text(&pair.mentor, &chat_id, "Hello").await;
    let resp = app
        .auth_get("/api/chat", &pair.mentor.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["unread_count"]["mentee"], 1);
    assert_eq!(json["items"][0]["last_message_id"], hello_id.as_str());

    // Mentee reads: counter resets, receipt lands
    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message", chat_id),
            &pair.mentee.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["content"], "Hello");
    let readers: Vec<&str> = json["items"][0]["read_by"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["user_id"].as_str().unwrap())
        .collect();
    assert!(readers.contains(&pair.mentee.id.as_str()));

    // Mentee replies with a PDF and no text
    tokio::time::sleep(Duration::from_millis(5)).await;
    let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 sample resume".to_vec())
        .file_name("resume.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("attachment", part);
    let resp = app
        .client
        .post(app.url(&format!("/api/chat/{}/message", chat_id)))
        .header(
            "Authorization",
            format!("Bearer {}", pair.mentee.access_token),
        )
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["message"]["message_type"], "file");
    assert_eq!(json["message"]["content"], "");
    assert_eq!(
        json["message"]["attachment"]["original_name"],
        "resume.pdf"
    );

    // Mentor lists: both messages in order, mentor counter resets
    let resp = app
        .auth_get(
            &format!("/api/chat/{}/message", chat_id),
            &pair.mentor.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["items"][0]["content"], "Hello");
    assert_eq!(json["items"][1]["message_type"], "file");

    let resp = app
        .auth_get("/api/chat", &pair.mentor.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["items"][0]["unread_count"]["mentor"], 0);
    assert_eq!(json["items"][0]["unread_count"]["mentee"], 0);
}
