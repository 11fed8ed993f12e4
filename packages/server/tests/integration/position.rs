use serde_json::json;

use crate::common::{TestApp, routes};

mod hierarchy {
    use super::*;

    #[tokio::test]
    async fn positions_chain_with_increasing_levels() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let spv = app
            .create_position(&token, "Supervisor", "SPV", 2, Some(stf["id"].as_i64().unwrap() as i32))
            .await;
        let mgr = app
            .create_position(&token, "Manager", "MGR", 3, Some(spv["id"].as_i64().unwrap() as i32))
            .await;

        assert_eq!(mgr["level"], 3);
        assert_eq!(mgr["parent_id"], spv["id"]);
        assert!(mgr["group_id"].is_number());
    }

    #[tokio::test]
    async fn parent_must_have_a_lower_level() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;

        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;

        for level in [1, 2] {
            let res = app
                .post_with_token(
                    routes::POSITIONS,
                    &json!({"name": "Bad", "code": format!("BAD{level}"), "level": level, "parent_id": spv["id"]}),
                    &token,
                )
                .await;
            assert_eq!(res.status, 400, "level {level}: {}", res.text);
            assert_eq!(res.body["code"], "INVALID_HIERARCHY");
        }
    }

    #[tokio::test]
    async fn rejected_create_leaves_no_group_behind() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;

        let before = app.get_with_token(routes::GROUPS, &token).await;
        let res = app
            .post_with_token(
                routes::POSITIONS,
                &json!({"name": "Clerk", "code": "CLK", "level": 1, "parent_id": spv["id"]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);

        let after = app.get_with_token(routes::GROUPS, &token).await;
        assert_eq!(
            before.body.as_array().unwrap().len(),
            after.body.as_array().unwrap().len()
        );
    }

    #[tokio::test]
    async fn position_cannot_be_its_own_parent() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let id = stf["id"].as_i64().unwrap() as i32;

        let res = app
            .patch_with_token(&routes::position(id), &json!({"parent_id": id}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_HIERARCHY");
    }

    #[tokio::test]
    async fn lowering_a_level_cannot_overtake_a_subordinate() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let stf_id = stf["id"].as_i64().unwrap() as i32;
        app.create_position(&token, "Supervisor", "SPV", 2, Some(stf_id))
            .await;

        let res = app
            .patch_with_token(&routes::position(stf_id), &json!({"level": 2}), &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_HIERARCHY");

        let unchanged = app.get_with_token(&routes::position(stf_id), &token).await;
        assert_eq!(unchanged.body["level"], 1);
    }

    #[tokio::test]
    async fn reparent_to_null_makes_a_root() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let spv = app
            .create_position(&token, "Supervisor", "SPV", 2, Some(stf["id"].as_i64().unwrap() as i32))
            .await;
        let spv_id = spv["id"].as_i64().unwrap() as i32;

        let res = app
            .patch_with_token(&routes::position(spv_id), &json!({"parent_id": null}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["parent_id"].is_null());
    }

    #[tokio::test]
    async fn tree_nests_subordinates() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let stf_id = stf["id"].as_i64().unwrap() as i32;
        let spv = app
            .create_position(&token, "Supervisor", "SPV", 2, Some(stf_id))
            .await;
        app.create_position(&token, "Manager", "MGR", 3, Some(spv["id"].as_i64().unwrap() as i32))
            .await;

        let res = app.get_with_token(routes::POSITION_TREE, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let roots = res.body.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["code"], "STF");
        assert_eq!(roots[0]["subordinates"][0]["code"], "SPV");
        assert_eq!(roots[0]["subordinates"][0]["subordinates"][0]["code"], "MGR");
    }
}

mod codes {
    use super::*;

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        app.create_position(&token, "Staff", "STF", 1, None).await;

        let res = app
            .post_with_token(
                routes::POSITIONS,
                &json!({"name": "Other staff", "code": "STF", "level": 4}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "DUPLICATE_CODE");
    }

    #[tokio::test]
    async fn codes_are_upper_cased_before_comparison() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", " stf ", 1, None).await;
        assert_eq!(stf["code"], "STF");

        let res = app
            .post_with_token(
                routes::POSITIONS,
                &json!({"name": "Other staff", "code": "Stf", "level": 2}),
                &token,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "DUPLICATE_CODE");
    }

    #[tokio::test]
    async fn changing_to_a_taken_code_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        app.create_position(&token, "Staff", "STF", 1, None).await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;

        let res = app
            .patch_with_token(
                &routes::position(spv["id"].as_i64().unwrap() as i32),
                &json!({"code": "STF"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "DUPLICATE_CODE");
    }
}

mod groups {
    use super::*;

    #[tokio::test]
    async fn create_makes_a_labelled_group() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;

        let group = app
            .get_with_token(&routes::group(spv["group_id"].as_i64().unwrap() as i32), &token)
            .await;

        assert_eq!(group.status, 200);
        assert_eq!(group.body["name"], "Position: Supervisor");
        assert_eq!(group.body["position_id"], spv["id"]);
    }

    #[tokio::test]
    async fn rename_relabels_the_linked_group() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let id = spv["id"].as_i64().unwrap() as i32;
        let group_id = spv["group_id"].as_i64().unwrap() as i32;

        let res = app
            .patch_with_token(&routes::position(id), &json!({"name": "Team Lead"}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["group_id"], group_id);

        let group = app.get_with_token(&routes::group(group_id), &token).await;
        assert_eq!(group.body["name"], "Position: Team Lead");
    }

    #[tokio::test]
    async fn rename_clashing_with_a_group_name_changes_nothing() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let id = spv["id"].as_i64().unwrap() as i32;
        let group_id = spv["group_id"].as_i64().unwrap() as i32;
        let manual = app
            .post_with_token(routes::GROUPS, &json!({"name": "Position: Lead"}), &token)
            .await;
        assert_eq!(manual.status, 201, "{}", manual.text);

        let res = app
            .patch_with_token(&routes::position(id), &json!({"name": "Lead"}), &token)
            .await;
        assert_eq!(res.status, 409, "{}", res.text);
        assert_eq!(res.body["code"], "CONFLICT");

        let position = app.get_with_token(&routes::position(id), &token).await;
        assert_eq!(position.body["name"], "Supervisor");
        let group = app.get_with_token(&routes::group(group_id), &token).await;
        assert_eq!(group.body["name"], "Position: Supervisor");
    }

    #[tokio::test]
    async fn create_can_link_an_existing_group() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let group = app
            .post_with_token(routes::GROUPS, &json!({"name": "Leads"}), &token)
            .await;
        assert_eq!(group.status, 201, "{}", group.text);

        let res = app
            .post_with_token(
                routes::POSITIONS,
                &json!({"name": "Lead", "code": "LD", "level": 3, "group_id": group.body["id"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["group_id"], group.body["id"]);
    }

    #[tokio::test]
    async fn group_cannot_be_linked_to_two_positions() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;

        let res = app
            .put_with_token(
                &routes::position_group(spv["id"].as_i64().unwrap() as i32),
                &json!({"group_id": stf["group_id"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }
}

mod membership {
    use sea_orm::{EntityTrait, Set};
    use server::entity::user_group;

    use super::*;

    #[tokio::test]
    async fn assigning_a_position_joins_its_group() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let alice = app.register_user("alice").await;

        app.assign_position(&token, alice, Some(spv["id"].as_i64().unwrap() as i32))
            .await;

        assert_eq!(
            app.group_names(&token, alice).await,
            vec!["Position: Supervisor".to_string()]
        );
    }

    #[tokio::test]
    async fn moving_position_swaps_groups_but_keeps_manual_ones() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let alice = app.register_user("alice").await;

        // Seeded manual group; not linked to any position.
        let admins = app.get_with_token(routes::GROUPS, &token).await;
        let admin_group = admins
            .body
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["name"] == "Administrators")
            .unwrap()["id"]
            .as_i64()
            .unwrap() as i32;
        user_group::Entity::insert(user_group::ActiveModel {
            user_id: Set(alice),
            group_id: Set(admin_group),
        })
        .exec_without_returning(&app.db)
        .await
        .unwrap();

        app.assign_position(&token, alice, Some(stf["id"].as_i64().unwrap() as i32))
            .await;
        app.assign_position(&token, alice, Some(spv["id"].as_i64().unwrap() as i32))
            .await;

        let mut groups = app.group_names(&token, alice).await;
        groups.sort();
        assert_eq!(groups, vec!["Administrators", "Position: Supervisor"]);
    }

    #[tokio::test]
    async fn relinking_moves_all_holders() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let spv_id = spv["id"].as_i64().unwrap() as i32;
        let alice = app.register_user("alice").await;
        let bob = app.register_user("bob").await;
        app.assign_position(&token, alice, Some(spv_id)).await;
        app.assign_position(&token, bob, Some(spv_id)).await;

        let group = app
            .post_with_token(routes::GROUPS, &json!({"name": "Shift leads"}), &token)
            .await;
        let res = app
            .put_with_token(
                &routes::position_group(spv_id),
                &json!({"group_id": group.body["id"]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        for user in [alice, bob] {
            assert_eq!(
                app.group_names(&token, user).await,
                vec!["Shift leads".to_string()]
            );
        }
    }

    #[tokio::test]
    async fn sync_members_reports_holder_count() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let spv_id = spv["id"].as_i64().unwrap() as i32;
        for name in ["alice", "bob"] {
            let id = app.register_user(name).await;
            app.assign_position(&token, id, Some(spv_id)).await;
        }

        let res = app
            .post_with_token(&routes::position_sync(spv_id), &json!({}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["synced"], 2);
        assert_eq!(res.body["group_id"], spv["group_id"]);
    }

    #[tokio::test]
    async fn holders_gain_permissions_of_the_position_group() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let spv = app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        let alice = app.register_user("alice").await;
        app.assign_position(&token, alice, Some(spv["id"].as_i64().unwrap() as i32))
            .await;

        let res = app
            .put_with_token(
                &routes::group_permissions(spv["group_id"].as_i64().unwrap() as i32),
                &json!({"permissions": ["position:view"]}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let alice_token = app.login("alice").await;
        let list = app.get_with_token(routes::POSITIONS, &alice_token).await;
        assert_eq!(list.status, 200, "{}", list.text);
        assert_eq!(list.body["pagination"]["total"], 1);
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn hard_delete_is_blocked_by_subordinates() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let stf_id = stf["id"].as_i64().unwrap() as i32;
        let spv = app
            .post_with_token(
                routes::POSITIONS,
                &json!({"name": "Supervisor", "code": "SPV", "level": 2, "parent_id": stf_id}),
                &token,
            )
            .await;
        assert_eq!(spv.status, 201, "{}", spv.text);

        let res = app.delete_with_token(&routes::position(stf_id), &token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "HAS_SUBORDINATES");
        let still_there = app.get_with_token(&routes::position(stf_id), &token).await;
        assert_eq!(still_there.status, 200);
        let group_id = stf["group_id"].as_i64().unwrap() as i32;
        let group = app.get_with_token(&routes::group(group_id), &token).await;
        assert_eq!(group.status, 200);
        let subordinate = app.get_with_token(&routes::position(spv.id()), &token).await;
        assert_eq!(subordinate.status, 200);
        assert_eq!(subordinate.body["parent_id"], stf_id);
    }

    #[tokio::test]
    async fn hard_delete_is_blocked_by_holders() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let stf_id = stf["id"].as_i64().unwrap() as i32;
        let alice = app.register_user("alice").await;
        app.assign_position(&token, alice, Some(stf_id)).await;

        let res = app.delete_with_token(&routes::position(stf_id), &token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn hard_delete_removes_position_and_group() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let stf_id = stf["id"].as_i64().unwrap() as i32;
        let group_id = stf["group_id"].as_i64().unwrap() as i32;

        let res = app.delete_with_token(&routes::position(stf_id), &token).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let gone = app.get_with_token(&routes::position(stf_id), &token).await;
        assert_eq!(gone.status, 404);
        let group = app.get_with_token(&routes::group(group_id), &token).await;
        assert_eq!(group.status, 404);
    }

    #[tokio::test]
    async fn deactivate_keeps_subordinates_and_can_be_undone() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        let stf_id = stf["id"].as_i64().unwrap() as i32;
        let spv = app
            .create_position(&token, "Supervisor", "SPV", 2, Some(stf_id))
            .await;

        let res = app
            .post_with_token(&routes::position_deactivate(stf_id), &json!({}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_active"], false);

        let child = app
            .get_with_token(&routes::position(spv["id"].as_i64().unwrap() as i32), &token)
            .await;
        assert_eq!(child.body["parent_id"], stf_id);

        let res = app
            .post_with_token(&routes::position_activate(stf_id), &json!({}), &token)
            .await;
        assert_eq!(res.body["is_active"], true);
    }

    #[tokio::test]
    async fn list_filters_by_active_flag() {
        let app = TestApp::spawn().await;
        let token = app.create_admin("admin").await;
        let stf = app.create_position(&token, "Staff", "STF", 1, None).await;
        app.create_position(&token, "Supervisor", "SPV", 2, None).await;
        app.post_with_token(
            &routes::position_deactivate(stf["id"].as_i64().unwrap() as i32),
            &json!({}),
            &token,
        )
        .await;

        let res = app
            .get_with_token(&format!("{}?is_active=true", routes::POSITIONS), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["code"], "SPV");
    }
}

mod service {
    use common::PositionDiff;
    use std::time::Duration;

    use sea_orm::{
        ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
    };
    use server::entity::{access_group, position, user, user_group};
    use server::services::membership::MembershipSync;
    use server::services::position::{NewPosition, PositionError, PositionService};

    use super::*;

    fn new_position(name: &str, code: &str, level: i32, parent_id: Option<i32>) -> NewPosition {
        NewPosition {
            name: name.into(),
            code: code.into(),
            level,
            parent_id,
            group_id: None,
        }
    }

    #[tokio::test]
    async fn rejected_update_rolls_back_with_the_transaction() {
        let app = TestApp::spawn().await;
        let service = PositionService::new(&app.db);
        let stf = service
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();
        let spv = service
            .create(new_position("Supervisor", "SPV", 2, Some(stf.id)))
            .await
            .unwrap();

        let txn = app.db.begin().await.unwrap();
        let err = PositionService::new(&txn)
            .update(
                spv.id,
                PositionDiff {
                    name: Some("Lead".into()),
                    level: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PositionError::InvalidHierarchy(_)));
        txn.rollback().await.unwrap();

        let group = access_group::Entity::find()
            .filter(access_group::Column::Name.eq("Position: Supervisor"))
            .one(&app.db)
            .await
            .unwrap();
        assert!(group.is_some());
    }

    #[tokio::test]
    async fn noop_update_returns_current_state() {
        let app = TestApp::spawn().await;
        let service = PositionService::new(&app.db);
        let stf = service
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();

        let same = service
            .update(
                stf.id,
                PositionDiff {
                    name: Some("Staff".into()),
                    code: Some("stf".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(same.updated_at, stf.updated_at);
    }

    #[tokio::test]
    async fn change_level_and_reparent_helpers_enforce_ordering() {
        let app = TestApp::spawn().await;
        let service = PositionService::new(&app.db);
        let stf = service
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();
        let mgr = service
            .create(new_position("Manager", "MGR", 3, None))
            .await
            .unwrap();

        let moved = service.reparent(mgr.id, Some(stf.id)).await.unwrap();
        assert_eq!(moved.parent_id, Some(stf.id));

        let err = service.change_level(mgr.id, 1).await.unwrap_err();
        assert!(matches!(err, PositionError::InvalidHierarchy(_)));

        let code = service.change_code(mgr.id, "mgr-1").await.unwrap();
        assert_eq!(code.code, "MGR-1");
    }

    #[tokio::test]
    async fn missing_parent_is_not_found() {
        let app = TestApp::spawn().await;
        let err = PositionService::new(&app.db)
            .create(new_position("Staff", "STF", 1, Some(9999)))
            .await
            .unwrap_err();
        assert!(matches!(err, PositionError::NotFound(_)));
    }

    #[tokio::test]
    async fn sync_members_leaves_holders_in_exactly_the_linked_group() {
        let app = TestApp::spawn().await;
        let service = PositionService::new(&app.db);
        let stf = service
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();
        let spv = service
            .create(new_position("Supervisor", "SPV", 2, Some(stf.id)))
            .await
            .unwrap();
        let stale_group = stf.group_id.unwrap();

        let mut holders = Vec::new();
        for name in ["alice", "bob"] {
            let id = app.register_user(name).await;
            user::ActiveModel {
                id: Set(id),
                position_id: Set(Some(spv.id)),
                ..Default::default()
            }
            .update(&app.db)
            .await
            .unwrap();
            user_group::Entity::insert(user_group::ActiveModel {
                user_id: Set(id),
                group_id: Set(stale_group),
            })
            .exec(&app.db)
            .await
            .unwrap();
            holders.push(id);
        }

        let synced = MembershipSync::new(&app.db).sync_members(&spv).await.unwrap();
        assert_eq!(synced, 2);

        for id in holders {
            let groups: Vec<i32> = user_group::Entity::find()
                .filter(user_group::Column::UserId.eq(id))
                .all(&app.db)
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.group_id)
                .collect();
            assert_eq!(groups, vec![spv.group_id.unwrap()]);
        }
    }

    #[tokio::test]
    async fn rename_relabels_group_within_the_transaction() {
        let app = TestApp::spawn().await;
        let spv = PositionService::new(&app.db)
            .create(new_position("Supervisor", "SPV", 2, None))
            .await
            .unwrap();
        let group_id = spv.group_id.unwrap();

        let txn = app.db.begin().await.unwrap();
        let renamed = PositionService::new(&txn)
            .rename(spv.id, "  Team Lead ")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Team Lead");
        let inside = access_group::Entity::find_by_id(group_id)
            .one(&txn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inside.name, "Position: Team Lead");
        txn.rollback().await.unwrap();

        let position = position::Entity::find_by_id(spv.id).one(&app.db).await.unwrap().unwrap();
        let group = access_group::Entity::find_by_id(group_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.name, "Supervisor");
        assert_eq!(group.name, "Position: Supervisor");
    }

    #[tokio::test]
    async fn create_waits_for_a_concurrent_parent_level_change() {
        let app = TestApp::spawn().await;
        let stf = PositionService::new(&app.db)
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();
        let stf_id = stf.id;

        let raise = app.db.begin().await.unwrap();
        PositionService::new(&raise).change_level(stf_id, 5).await.unwrap();

        let db = app.db.clone();
        let child = tokio::spawn(async move {
            let txn = db.begin().await.unwrap();
            let result = PositionService::new(&txn)
                .create(new_position("Supervisor", "SPV", 2, Some(stf_id)))
                .await;
            match result {
                Ok(_) => txn.commit().await.unwrap(),
                Err(_) => txn.rollback().await.unwrap(),
            }
            result
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!child.is_finished(), "create must block on the locked parent");
        raise.commit().await.unwrap();

        let err = child.await.unwrap().unwrap_err();
        assert!(matches!(err, PositionError::InvalidHierarchy(_)));
        let children = position::Entity::find()
            .filter(position::Column::ParentId.eq(stf_id))
            .all(&app.db)
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn hard_delete_waits_for_a_concurrent_subordinate() {
        let app = TestApp::spawn().await;
        let stf = PositionService::new(&app.db)
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();
        let stf_id = stf.id;

        let insert = app.db.begin().await.unwrap();
        PositionService::new(&insert)
            .create(new_position("Supervisor", "SPV", 2, Some(stf_id)))
            .await
            .unwrap();

        let db = app.db.clone();
        let delete = tokio::spawn(async move {
            let txn = db.begin().await.unwrap();
            let result = PositionService::new(&txn).hard_delete(stf_id).await;
            match result {
                Ok(()) => txn.commit().await.unwrap(),
                Err(_) => txn.rollback().await.unwrap(),
            }
            result
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!delete.is_finished(), "delete must block on the share-locked parent");
        insert.commit().await.unwrap();

        let err = delete.await.unwrap().unwrap_err();
        assert!(matches!(err, PositionError::HasSubordinates(_)));
        assert!(
            position::Entity::find_by_id(stf_id)
                .one(&app.db)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn store_refuses_to_delete_a_referenced_parent() {
        let app = TestApp::spawn().await;
        let service = PositionService::new(&app.db);
        let stf = service
            .create(new_position("Staff", "STF", 1, None))
            .await
            .unwrap();
        service
            .create(new_position("Supervisor", "SPV", 2, Some(stf.id)))
            .await
            .unwrap();

        let err = position::Entity::delete_by_id(stf.id)
            .exec(&app.db)
            .await
            .unwrap_err();

        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::ForeignKeyConstraintViolation(_))
        ));
    }
}
