use ::common::Capability;
use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn anonymous_caller_can_sign_up_when_open() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::USERS, &json!({"ident": "alice@example.com", "secret": "pw"}), None)
            .await;

        assert_eq!(res.status, 201, "{}", res.text());
        assert_eq!(res.body["ident"], "alice@example.com");
        assert!(res.body["user_id"].is_string());
        assert!(res.body.get("secret").is_none());
        assert!(
            res.body["capability"]
                .as_array()
                .unwrap()
                .contains(&json!("PIC_CREATE"))
        );
    }

    #[tokio::test]
    async fn duplicate_ident_is_already_exists() {
        let app = TestApp::spawn().await;
        let body = json!({"ident": "alice@example.com", "secret": "pw"});

        let first = app.post(routes::USERS, &body, None).await;
        assert_eq!(first.status, 201, "{}", first.text());

        let res = app.post(routes::USERS, &body, None).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn closed_sign_up_is_permission_denied() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.anonymous_capability = Capability::default_anonymous_set();
        })
        .await;

        let res = app
            .post(routes::USERS, &json!({"ident": "bob@example.com", "secret": "pw"}), None)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        assert_eq!(res.body["message"], "missing cap USER_CREATE");
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_argument() {
        let app = TestApp::spawn().await;

        let res = app.post(routes::USERS, &json!({"ident": 7}), None).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }
}

mod tokens {
    use super::*;

    #[tokio::test]
    async fn login_issues_tokens_and_cookies() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", "pw", &Capability::default_user_set())
            .await;

        let res = app.login("alice@example.com", "pw").await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert!(res.body["refresh_token"].is_string());
        assert!(res.body["auth_token"].is_string());
        assert!(res.body["pix_token"].is_string());
        assert_eq!(res.body["auth_payload"]["typ"], "AUTH");
        let cookies: Vec<_> = res
            .headers
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        for name in ["refresh_token=", "auth_token=", "pix_token=", "xsrf_token="] {
            assert!(cookies.iter().any(|c| c.starts_with(name)), "missing {name}");
        }
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthenticated() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", "pw", &[]).await;

        let res = app.login("alice@example.com", "nope").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn refresh_cookie_renews_the_session() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", "pw", &Capability::default_user_set())
            .await;
        let first = app.login("alice@example.com", "pw").await;
        assert_eq!(first.status, 200);

        let res = app.post(routes::TOKEN, &json!({}), None).await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(
            res.body["refresh_payload"]["jti"],
            first.body["refresh_payload"]["jti"]
        );
    }

    #[tokio::test]
    async fn deleted_token_stops_working() {
        let app = TestApp::spawn().await;
        let (_, token) = app
            .user_with_caps("alice@example.com", &Capability::default_user_set())
            .await;

        let res = app.delete(routes::TOKEN, Some(&token)).await;
        assert_eq!(res.status, 204, "{}", res.text());

        let res = app.get(routes::PICS, Some(&token)).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["message"], "token id has been deleted");
    }

    #[tokio::test]
    async fn forged_token_is_unauthenticated() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PICS, Some("not.a.token")).await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn cookie_mutation_without_xsrf_header_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_user("alice@example.com", "pw", &Capability::default_user_set())
            .await;
        assert_eq!(app.login("alice@example.com", "pw").await.status, 200);

        let res = app
            .client
            .post(app.url(routes::TOKEN))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        // Logging in never needs the XSRF pair.
        assert_eq!(res.status(), 200);

        let res = app
            .client
            .delete(app.url(routes::TOKEN))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 401);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn admin_grants_capabilities() {
        let app = TestApp::spawn().await;
        let (_, admin) = app
            .user_with_caps("admin@example.com", &Capability::admin_set())
            .await;
        let user_id = app.create_user("bob@example.com", "pw", &[]).await;

        let version = user_version(&app, &user_id).await;
        let res = app
            .patch(
                &routes::user(&user_id),
                &json!({"version": version, "set_capability": ["PIC_SOFT_DELETE"]}),
                Some(&admin),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.body["capability"], json!(["PIC_SOFT_DELETE"]));
        assert_ne!(res.body["version"], json!(version));
    }

    #[tokio::test]
    async fn stale_version_is_aborted() {
        let app = TestApp::spawn().await;
        let (_, admin) = app
            .user_with_caps("admin@example.com", &Capability::admin_set())
            .await;
        let user_id = app.create_user("bob@example.com", "pw", &[]).await;
        let version = user_version(&app, &user_id).await;

        let body = json!({"version": version, "set_capability": ["PIC_READ"]});
        let first = app.patch(&routes::user(&user_id), &body, Some(&admin)).await;
        assert_eq!(first.status, 200, "{}", first.text());

        let second = app.patch(&routes::user(&user_id), &body, Some(&admin)).await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "ABORTED");
    }

    #[tokio::test]
    async fn users_cannot_grant_themselves_capabilities() {
        let app = TestApp::spawn().await;
        let (user_id, token) = app
            .user_with_caps("bob@example.com", &Capability::default_user_set())
            .await;
        let version = user_version(&app, &user_id).await;

        let res = app
            .patch(
                &routes::user(&user_id),
                &json!({"version": version, "set_capability": ["PIC_SOFT_DELETE"]}),
                Some(&token),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    async fn user_version(app: &TestApp, user_id: &str) -> i64 {
        let id = user_id.parse::<::common::Varint>().unwrap().0;
        let j = pixur_server::db::Job::begin(&app.db, None).await.unwrap();
        let user = j
            .lookup_user(id, pixur_server::db::Lock::None)
            .await
            .unwrap()
            .unwrap();
        j.rollback().await.unwrap();
        user.version()
    }
}
