use serde_json::json;

use crate::common::{TestApp, routes};

fn codenames(body: &serde_json::Value) -> Vec<String> {
    let mut names: Vec<String> = body
        .as_array()
        .expect("permissions should be an array")
        .iter()
        .map(|p| p.as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn seeded_admin_group_holds_every_permission() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app.get_with_token(routes::GROUPS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let admin = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["name"] == "Administrators")
            .expect("seeded group should be listed");
        assert_eq!(
            admin["permissions"].as_array().unwrap().len(),
            ::common::permissions::CATALOG.len()
        );
        assert!(admin["position_id"].is_null());
    }

    #[tokio::test]
    async fn permission_catalog_is_listed() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app.get_with_token(routes::PERMISSIONS, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let entries = res.body.as_array().unwrap();
        assert_eq!(entries.len(), ::common::permissions::CATALOG.len());
        assert!(entries.iter().any(|p| p["codename"] == "position:view"));
    }

    #[tokio::test]
    async fn catalog_requires_group_view() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(routes::PERMISSIONS, &token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod management {
    use super::*;

    #[tokio::test]
    async fn create_group_with_permissions() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app
            .post_with_token(
                routes::GROUPS,
                &json!({"name": "Auditors", "permissions": ["user:view", "division:view"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Auditors");
        assert_eq!(
            codenames(&res.body["permissions"]),
            vec!["division:view", "user:view"]
        );
        assert_eq!(res.body["member_count"], 0);

        let fetched = app.get_with_token(&routes::group(res.id()), &token).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["name"], "Auditors");
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app
            .post_with_token(routes::GROUPS, &json!({"name": "Administrators"}), &token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_permission_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app
            .post_with_token(
                routes::GROUPS,
                &json!({"name": "Auditors", "permissions": ["payroll:steal"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn set_permissions_replaces_the_previous_set() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let created = app
            .post_with_token(
                routes::GROUPS,
                &json!({"name": "Auditors", "permissions": ["user:view"]}),
                &token,
            )
            .await;

        let res = app
            .put_with_token(
                &routes::group_permissions(created.id()),
                &json!({"permissions": ["position:view"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(codenames(&res.body["permissions"]), vec!["position:view"]);
    }

    #[tokio::test]
    async fn missing_group_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app.get_with_token(&routes::group(9999), &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let res = app
            .put_with_token(
                &routes::group_permissions(9999),
                &json!({"permissions": []}),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn position_group_reports_its_holders() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let group_id = spv["group_id"].as_i64().unwrap() as i32;
        let alice = app.register_user("alice").await;
        app.assign_position(&token, alice, Some(spv["id"].as_i64().unwrap() as i32))
            .await;

        let res = app.get_with_token(&routes::group(group_id), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["position_id"], spv["id"]);
        assert_eq!(res.body["member_count"], 1);
    }
}
