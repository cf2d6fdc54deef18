use ::common::Capability;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{TestApp, png_bytes, routes};

async fn uploader(app: &TestApp) -> String {
    app.user_with_caps("uploader@example.com", &Capability::default_user_set())
        .await
        .1
}

async fn moderator(app: &TestApp) -> String {
    app.user_with_caps("mod@example.com", &Capability::admin_set())
        .await
        .1
}

fn ids(body: &serde_json::Value) -> Vec<String> {
    body["pics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["pic_id"].as_str().unwrap().to_string())
        .collect()
}

fn count_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| if p.is_dir() { count_files(&p) } else { 1 })
        .sum()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn file_upload_creates_pic_with_tags() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;

        let res = app
            .upload(Some(png_bytes(16, 12, 1)), None, &["cats", "Cute"], Some(&token))
            .await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.body["mime"], "PNG");
        assert_eq!(res.body["width"], 16);
        assert_eq!(res.body["height"], 12);
        let pic_id = res.body["pic_id"].as_str().unwrap();
        assert_eq!(res.body["relative_url"], format!("pix/{pic_id}.png"));

        let details = app.get(&routes::pic(pic_id), Some(&token)).await;
        assert_eq!(details.status, 200, "{}", details.text());
        let mut names: Vec<_> = details.body["pic_tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["Cute", "cats"]);
    }

    #[tokio::test]
    async fn same_bytes_merge_into_one_pic() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let data = png_bytes(8, 8, 2);

        let first = app.upload_pic(data.clone(), &["a"], &token).await;
        let second = app.upload_pic(data, &["b"], &token).await;

        assert_eq!(first, second);
        let details = app.get(&routes::pic(&first), Some(&token)).await;
        assert_eq!(details.body["pic_tags"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_identical_uploads_share_one_pic() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let data = png_bytes(8, 8, 5);

        let uploads = (0..4).map(|_| app.upload(Some(data.clone()), None, &["fresh"], Some(&token)));
        let results = futures::future::join_all(uploads).await;

        let mut pic_ids: Vec<String> = results
            .iter()
            .map(|res| {
                assert_eq!(res.status, 200, "{}", res.text());
                res.body["pic_id"].as_str().unwrap().to_string()
            })
            .collect();
        pic_ids.dedup();
        assert_eq!(pic_ids.len(), 1);

        let details = app.get(&routes::pic(&pic_ids[0]), Some(&token)).await;
        assert_eq!(details.body["pic_tags"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn url_upload_fetches_the_bytes() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cat.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png_bytes(10, 10, 3)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let res = app
            .upload(None, Some(&format!("{}/cat.png", server.uri())), &[], Some(&token))
            .await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.body["width"], 10);
    }

    #[tokio::test]
    async fn failed_download_is_invalid_argument() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let res = app
            .upload(None, Some(&format!("{}/gone.png", server.uri())), &[], Some(&token))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn garbage_bytes_are_rejected() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;

        let res = app
            .upload(Some(b"definitely not a png".to_vec()), None, &[], Some(&token))
            .await;

        assert_eq!(res.status, 400, "{}", res.text());
    }

    #[tokio::test]
    async fn anonymous_upload_is_permission_denied() {
        let app = TestApp::spawn().await;

        let res = app.upload(Some(png_bytes(8, 8, 4)), None, &[], None).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["message"], "missing cap PIC_CREATE");
    }
}

mod browse {
    use super::*;

    #[tokio::test]
    async fn index_lists_newest_first() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let a = app.upload_pic(png_bytes(8, 8, 10), &[], &token).await;
        let b = app.upload_pic(png_bytes(8, 8, 20), &[], &token).await;

        let res = app.get(routes::PICS, None).await;
        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(ids(&res.body), [b.clone(), a.clone()]);

        let res = app
            .get(&format!("{}?start_pic_id={a}&ascending=true", routes::PICS), None)
            .await;
        // The start pic itself is excluded when paging forward.
        assert_eq!(ids(&res.body), [b]);
    }

    #[tokio::test]
    async fn bad_start_id_is_invalid_argument() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?start_pic_id=!!", routes::PICS), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn unknown_pic_is_not_found() {
        let app = TestApp::spawn().await;

        let missing = ::common::Varint(987_654).encode();
        let res = app.get(&routes::pic(&missing), None).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn views_are_counted() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 11), &[], &token).await;

        for _ in 0..2 {
            let res = app.post(&routes::pic_views(&pic_id), &json!({}), None).await;
            assert_eq!(res.status, 204, "{}", res.text());
        }

        let details = app.get(&routes::pic(&pic_id), None).await;
        assert_eq!(details.body["pic"]["view_count"], 2);
    }

    #[tokio::test]
    async fn similar_pics_share_a_perceptual_hash() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let a = app.upload_pic(png_bytes(32, 32, 40), &[], &token).await;
        let b = app.upload_pic(png_bytes(32, 32, 41), &[], &token).await;
        assert_ne!(a, b);

        let res = app.get(&routes::similar(&a), None).await;

        assert_eq!(res.status, 200, "{}", res.text());
        let similar = res.body["pic_ids"].as_array().unwrap();
        assert!(similar.contains(&json!(b)));
        assert!(!similar.contains(&json!(a)));
    }
}

mod data {
    use super::*;

    #[tokio::test]
    async fn reads_ranges_and_reports_eof() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let bytes = png_bytes(8, 8, 12);
        let pic_id = app.upload_pic(bytes.clone(), &[], &token).await;

        let head = app
            .get(&format!("{}?limit=4", routes::pic_data(&pic_id)), None)
            .await;
        assert_eq!(head.status, 200, "{}", head.text());
        assert_eq!(head.bytes, bytes[..4]);
        assert_eq!(head.headers["x-pix-eof"], "false");
        assert_eq!(head.headers["content-type"], "image/png");

        let tail = app
            .get(&format!("{}?offset=4", routes::pic_data(&pic_id)), None)
            .await;
        assert_eq!(tail.bytes, bytes[4..]);
        assert_eq!(tail.headers["x-pix-eof"], "true");

        let past = app
            .get(
                &format!("{}?offset={}", routes::pic_data(&pic_id), bytes.len() + 1),
                None,
            )
            .await;
        assert_eq!(past.status, 400);
        assert_eq!(past.body["code"], "OUT_OF_RANGE");
    }

    #[tokio::test]
    async fn thumbnail_is_served() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(300, 200, 13), &[], &token).await;

        let res = app
            .get(&format!("{}?thumbnail=true", routes::pic_data(&pic_id)), None)
            .await;

        assert_eq!(res.status, 200, "{}", res.text());
        let thumb = image::load_from_memory(&res.bytes).unwrap();
        assert!(thumb.width() <= 192 && thumb.height() <= 192);
    }

    #[tokio::test]
    async fn pix_cookie_unlocks_public_urls() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.anonymous_capability = vec![Capability::UserCreate];
        })
        .await;
        let (_, token) = app
            .user_with_caps("viewer@example.com", &Capability::default_user_set())
            .await;
        let res = app
            .upload(Some(png_bytes(8, 8, 14)), None, &[], Some(&token))
            .await;
        let url = format!("/{}", res.body["relative_url"].as_str().unwrap());

        // The login above left a pix cookie scoped to /pix/.
        let res = app.client.get(app.url(&url)).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");

        let anonymous = reqwest::Client::new();
        let res = anonymous.get(app.url(&url)).send().await.unwrap();
        assert_eq!(res.status(), 403);
    }

    #[tokio::test]
    async fn malformed_pix_name_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get("/pix/nothing-here", None).await;

        assert_eq!(res.status, 404);
    }
}

mod votes {
    use super::*;

    #[tokio::test]
    async fn users_vote_once() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 30), &[], &token).await;

        let res = app
            .post(&routes::pic_vote(&pic_id), &json!({"vote": "UP"}), Some(&token))
            .await;
        assert_eq!(res.status, 204, "{}", res.text());

        let again = app
            .post(&routes::pic_vote(&pic_id), &json!({"vote": "DOWN"}), Some(&token))
            .await;
        assert_eq!(again.status, 409);
        assert_eq!(again.body["code"], "ALREADY_EXISTS");

        let mine = app.get(&routes::pic_vote(&pic_id), Some(&token)).await;
        assert_eq!(mine.status, 200, "{}", mine.text());
        assert_eq!(mine.body["vote"]["vote"], "UP");

        let details = app.get(&routes::pic(&pic_id), None).await;
        assert_eq!(details.body["pic"]["vote_up"], 1);
        assert_eq!(details.body["pic"]["vote_down"], 0);
    }

    #[tokio::test]
    async fn anonymous_vote_is_rejected() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.anonymous_capability.push(Capability::PicVoteCreate);
        })
        .await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 31), &[], &token).await;

        let res = app
            .post(&routes::pic_vote(&pic_id), &json!({"vote": "UP"}), None)
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "UNAUTHENTICATED");
    }
}

mod comments {
    use super::*;

    #[tokio::test]
    async fn replies_nest_under_their_parent() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 50), &[], &token).await;

        let top = app
            .post(&routes::pic_comments(&pic_id), &json!({"text": "nice"}), Some(&token))
            .await;
        assert_eq!(top.status, 201, "{}", top.text());
        assert_eq!(top.body["comment_parent_id"], "0");
        let parent = top.body["comment_id"].as_str().unwrap();

        let reply = app
            .post(
                &routes::pic_comments(&pic_id),
                &json!({"text": "agreed", "comment_parent_id": parent}),
                Some(&token),
            )
            .await;
        assert_eq!(reply.status, 201, "{}", reply.text());

        let details = app.get(&routes::pic(&pic_id), None).await;
        let tree = &details.body["comment_tree"];
        assert!(tree["comment"].is_null());
        let children = tree["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["comment"]["text"], "nice");
        assert_eq!(children[0]["children"][0]["comment"]["text"], "agreed");
    }

    #[tokio::test]
    async fn empty_text_is_invalid_argument() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 51), &[], &token).await;

        let res = app
            .post(&routes::pic_comments(&pic_id), &json!({"text": ""}), Some(&token))
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_parent_is_not_found() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 52), &[], &token).await;

        let res = app
            .post(
                &routes::pic_comments(&pic_id),
                &json!({"text": "hi", "comment_parent_id": ::common::Varint(987_654).encode()}),
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod tags {
    use super::*;

    #[tokio::test]
    async fn tags_are_added_once() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 60), &["dog"], &token).await;

        let res = app
            .post(&routes::pic_tags(&pic_id), &json!({"tags": ["dog", "park"]}), Some(&token))
            .await;
        assert_eq!(res.status, 204, "{}", res.text());

        let details = app.get(&routes::pic(&pic_id), None).await;
        assert_eq!(details.body["pic_tags"].as_array().unwrap().len(), 2);
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn soft_delete_hides_and_temporary_reupload_revives() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let admin = moderator(&app).await;
        let data = png_bytes(8, 8, 70);
        let pic_id = app.upload_pic(data.clone(), &[], &token).await;

        let res = app
            .post(
                &routes::soft_delete(&pic_id),
                &json!({"reason": "RULE_VIOLATION", "temporary": true}),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, 204, "{}", res.text());
        let index = app.get(routes::PICS, None).await;
        assert!(!ids(&index.body).contains(&pic_id));

        let revived = app.upload_pic(data, &[], &token).await;
        assert_eq!(revived, pic_id);
        let index = app.get(routes::PICS, None).await;
        assert!(ids(&index.body).contains(&pic_id));
    }

    #[tokio::test]
    async fn permanent_soft_delete_merges_but_stays_hidden() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let admin = moderator(&app).await;
        let data = png_bytes(8, 8, 71);
        let pic_id = app.upload_pic(data.clone(), &[], &token).await;

        let res = app
            .post(
                &routes::soft_delete(&pic_id),
                &json!({"reason": "RULE_VIOLATION", "details": "spam"}),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, 204, "{}", res.text());

        let merged = app.upload_pic(data, &["again"], &token).await;
        assert_eq!(merged, pic_id);
        let index = app.get(routes::PICS, None).await;
        assert!(!ids(&index.body).contains(&pic_id));
        let details = app.get(&routes::pic(&pic_id), Some(&admin)).await;
        assert!(details.body["pic"]["deletion"].is_object());
    }

    #[tokio::test]
    async fn permanent_hard_delete_blocks_reupload() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let admin = moderator(&app).await;
        let data = png_bytes(8, 8, 74);
        let pic_id = app.upload_pic(data.clone(), &[], &token).await;

        let res = app
            .post(&routes::hard_delete(&pic_id), &json!({}), Some(&admin))
            .await;
        assert_eq!(res.status, 204, "{}", res.text());

        let res = app.upload(Some(data), None, &[], Some(&token)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Can't upload deleted pic.");
    }

    #[tokio::test]
    async fn soft_delete_needs_a_reason_and_the_capability() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let admin = moderator(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 72), &[], &token).await;

        let res = app
            .post(&routes::soft_delete(&pic_id), &json!({"reason": "RULE_VIOLATION"}), Some(&token))
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post(&routes::soft_delete(&pic_id), &json!({}), Some(&admin))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "deletion reason required");
    }

    #[tokio::test]
    async fn hard_delete_removes_the_bytes() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let admin = moderator(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 73), &[], &token).await;

        let res = app
            .post(&routes::hard_delete(&pic_id), &json!({}), Some(&admin))
            .await;
        assert_eq!(res.status, 204, "{}", res.text());

        let details = app.get(&routes::pic(&pic_id), None).await;
        assert_eq!(details.status, 200);
        assert!(details.body["pic"]["deletion"].is_object());

        let data = app.get(&routes::pic_data(&pic_id), None).await;
        assert_eq!(data.status, 404);
    }

    #[tokio::test]
    async fn purge_forgets_the_pic() {
        let app = TestApp::spawn().await;
        let token = uploader(&app).await;
        let admin = moderator(&app).await;
        let pic_id = app.upload_pic(png_bytes(8, 8, 74), &["gone"], &token).await;

        let denied = app.delete(&routes::pic(&pic_id), Some(&token)).await;
        assert_eq!(denied.status, 403);

        let res = app.delete(&routes::pic(&pic_id), Some(&admin)).await;
        assert_eq!(res.status, 204, "{}", res.text());

        let details = app.get(&routes::pic(&pic_id), None).await;
        assert_eq!(details.status, 404);
        assert_eq!(count_files(app.pix.path()), 0);
    }
}
