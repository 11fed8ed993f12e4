use serde_json::json;

use crate::common::{TestApp, routes};

mod crud {
    use super::*;

    #[tokio::test]
    async fn child_division_is_one_level_below_parent() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let root = app.create_division(&token, "HQ", "Head Office", None).await;
        let eng = app
            .create_division(&token, "eng", "Engineering", Some(root))
            .await;

        let res = app.get_with_token(&routes::division(eng), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["code"], "ENG");
        assert_eq!(res.body["level"], 1);
        assert_eq!(res.body["full_path"], "Head Office / Engineering");
        assert_eq!(res.body["employee_count"], 0);
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        app.create_division(&token, "HQ", "Head Office", None).await;

        let res = app
            .post_with_token(
                routes::DIVISIONS,
                &json!({"code": "hq", "name": "Another office"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "DUPLICATE_CODE");
    }

    #[tokio::test]
    async fn short_name_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let res = app
            .post_with_token(routes::DIVISIONS, &json!({"code": "IT", "name": "IT"}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn moving_a_division_relevels_its_subtree() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let hq = app.create_division(&token, "HQ", "Head Office", None).await;
        let ops = app.create_division(&token, "OPS", "Operations", None).await;
        let eng = app.create_division(&token, "ENG", "Engineering", Some(ops)).await;
        let web = app.create_division(&token, "WEB", "Web team", Some(eng)).await;

        let res = app
            .patch_with_token(&routes::division(ops), &json!({"parent_id": hq}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["level"], 1);

        let web = app.get_with_token(&routes::division(web), &token).await;
        assert_eq!(web.body["level"], 3);
        assert_eq!(
            web.body["full_path"],
            "Head Office / Operations / Engineering / Web team"
        );
    }

    #[tokio::test]
    async fn division_cannot_move_under_its_descendant() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let hq = app.create_division(&token, "HQ", "Head Office", None).await;
        let eng = app.create_division(&token, "ENG", "Engineering", Some(hq)).await;

        let res = app
            .patch_with_token(&routes::division(hq), &json!({"parent_id": eng}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_HIERARCHY");
    }

    #[tokio::test]
    async fn list_searches_and_sorts() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        app.create_division(&token, "HQ", "Head Office", None).await;
        app.create_division(&token, "ENG", "Engineering", None).await;
        app.create_division(&token, "FIN", "Finance", None).await;

        let res = app
            .get_with_token(&format!("{}?search=in", routes::DIVISIONS), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert_eq!(res.body["data"][0]["code"], "ENG");
        assert_eq!(res.body["data"][1]["code"], "FIN");

        let bad = app
            .get_with_token(&format!("{}?sort_by=level", routes::DIVISIONS), &token)
            .await;
        assert_eq!(bad.status, 400);
    }
}

mod removal {
    use super::*;

    #[tokio::test]
    async fn empty_division_is_deleted() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let hq = app.create_division(&token, "HQ", "Head Office", None).await;

        let res = app.delete_with_token(&routes::division(hq), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["deactivated"], false);

        let gone = app.get_with_token(&routes::division(hq), &token).await;
        assert_eq!(gone.status, 404);
    }

    #[tokio::test]
    async fn division_with_employees_is_only_deactivated() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let hq = app.create_division(&token, "HQ", "Head Office", None).await;
        let alice = app.register_user("alice").await;
        let res = app
            .patch_with_token(&routes::user(alice), &json!({"division_id": hq}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.delete_with_token(&routes::division(hq), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["deactivated"], true);

        let still = app.get_with_token(&routes::division(hq), &token).await;
        assert_eq!(still.body["is_active"], false);
        assert_eq!(still.body["employee_count"], 1);
    }
}

mod roster {
    use super::*;

    #[tokio::test]
    async fn statistics_split_active_and_inactive() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let hq = app.create_division(&token, "HQ", "Head Office", None).await;
        for (name, active) in [("alice", true), ("bob", true), ("carol", false)] {
            let id = app.register_user(name).await;
            let res = app
                .patch_with_token(
                    &routes::user(id),
                    &json!({"division_id": hq, "is_active": active}),
                    &token,
                )
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app
            .get_with_token(&routes::division_statistics(hq), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["employee_count"], 3);
        assert_eq!(res.body["active_employees"], 2);
        assert_eq!(res.body["inactive_employees"], 1);
    }

    #[tokio::test]
    async fn employees_lists_assigned_users() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let hq = app.create_division(&token, "HQ", "Head Office", None).await;
        let alice = app.register_user("alice").await;
        app.register_user("bob").await;
        app.patch_with_token(&routes::user(alice), &json!({"division_id": hq}), &token)
            .await;

        let res = app
            .get_with_token(&routes::division_employees(hq), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let employees = res.body.as_array().unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0]["username"], "alice");
    }
}
