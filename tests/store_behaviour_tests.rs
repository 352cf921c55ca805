mod common;

use common::{backends, leonard, lily, oak, sheldon, trees};
use leaf_library::types::{NewUser, Role};

#[tokio::test]
async fn created_user_reads_back_equal() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        assert_eq!(user.role, Role::Default, "{name}");
        assert_eq!(user.about_me, None, "{name}");

        let by_id = db.users.get_by_id(&user.id).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&user), "{name}");
        let by_email = db.users.get_by_email("sheldon@caltech.edu").await.unwrap();
        assert_eq!(by_email, Some(user.clone()), "{name}");

        assert!(db.users.get_by_id("missing").await.unwrap().is_none(), "{name}");
        assert_eq!(db.users.get_all().await.unwrap(), vec![user], "{name}");
    }
}

#[tokio::test]
async fn admin_seeding_is_idempotent() {
    let (_dir, dbs) = backends().await;
    let admin = NewUser {
        email: "admin@leaf.test".into(),
        password: "root".into(),
        first_name: "admin".into(),
        second_name: "admin".into(),
    };
    for (name, db) in dbs {
        db.users.init_admins(vec![admin.clone()]).await.unwrap();
        db.users.init_admins(vec![admin.clone()]).await.unwrap();
        db.users.create(sheldon()).await.unwrap();

        let all = db.users.get_all().await.unwrap();
        assert_eq!(all.len(), 2, "{name}");
        assert_eq!(
            all.iter().filter(|u| u.role == Role::Admin).count(),
            1,
            "{name}"
        );

        let regular = db.users.get_all_non_admin().await.unwrap();
        assert_eq!(regular.len(), 1, "{name}");
        assert_eq!(regular[0].email, "sheldon@caltech.edu", "{name}");
    }
}

#[tokio::test]
async fn user_update_keeps_role() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let mut user = db.users.create(sheldon()).await.unwrap();
        user.about_me = Some("Theoretical physicist".into());
        user.role = Role::Admin;

        let updated = db.users.update(user).await.unwrap().unwrap();
        assert_eq!(updated.about_me.as_deref(), Some("Theoretical physicist"), "{name}");
        assert_eq!(updated.role, Role::Default, "{name}");

        let mut ghost = updated.clone();
        ghost.id = "missing".into();
        assert!(db.users.update(ghost).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn creating_for_unknown_user_fails() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        assert!(db.plants.create_for_user("nobody", oak()).await.unwrap().is_none(), "{name}");
        assert!(
            db.collections
                .create_for_user("nobody", trees())
                .await
                .unwrap()
                .is_none(),
            "{name}"
        );
        assert!(db.plants.get_all().await.unwrap().is_empty(), "{name}");
        assert!(db.plants.get_all_for_user("nobody").await.unwrap().is_empty(), "{name}");
        assert!(
            db.collections.get_all_for_user("nobody").await.unwrap().is_empty(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn created_plant_reads_back_equal() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let plant = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        assert_eq!(plant.user_id, user.id, "{name}");

        let fetched = db.plants.get_by_id(&plant.id).await.unwrap();
        assert_eq!(fetched, Some(plant.clone()), "{name}");
        assert_eq!(
            db.plants.get_all_for_user(&user.id).await.unwrap(),
            vec![plant],
            "{name}"
        );
    }
}

#[tokio::test]
async fn plant_update_keeps_owner_and_date() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let plant = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();

        let mut changed = plant.clone();
        changed.common_name = "English oak".into();
        changed.image_urls = vec!["/uploads/oak.jpg".into()];
        changed.user_id = "someone-else".into();
        changed.date = chrono::Utc::now() + chrono::Duration::days(3);

        let updated = db.plants.update(changed).await.unwrap().unwrap();
        assert_eq!(updated.common_name, "English oak", "{name}");
        assert_eq!(updated.image_urls, vec!["/uploads/oak.jpg".to_string()], "{name}");
        assert_eq!(updated.user_id, user.id, "{name}");
        assert_eq!(updated.date, plant.date, "{name}");
    }
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let sheldon = db.users.create(sheldon()).await.unwrap();
        let leonard = db.users.create(leonard()).await.unwrap();
        let sheldons_oak = db.plants.create_for_user(&sheldon.id, oak()).await.unwrap().unwrap();
        let leonards_lily = db.plants.create_for_user(&leonard.id, lily()).await.unwrap().unwrap();
        db.collections.create_for_user(&sheldon.id, trees()).await.unwrap().unwrap();
        let shared = db.collections.create_for_user(&leonard.id, trees()).await.unwrap().unwrap();
        db.collections
            .add_plant_to_collection(&shared.id, &sheldons_oak.id)
            .await
            .unwrap()
            .unwrap();
        db.collections
            .add_plant_to_collection(&shared.id, &leonards_lily.id)
            .await
            .unwrap()
            .unwrap();

        let deleted = db.users.delete_by_id(&sheldon.id).await.unwrap();
        assert_eq!(deleted.map(|u| u.id), Some(sheldon.id.clone()), "{name}");

        assert!(db.plants.get_all_for_user(&sheldon.id).await.unwrap().is_empty(), "{name}");
        assert!(
            db.collections.get_all_for_user(&sheldon.id).await.unwrap().is_empty(),
            "{name}"
        );
        let shared = db.collections.get_by_id(&shared.id).await.unwrap().unwrap();
        assert_eq!(shared.plant_ids, vec![leonards_lily.id.clone()], "{name}");
        assert_eq!(db.plants.get_all().await.unwrap().len(), 1, "{name}");

        assert!(db.users.delete_by_id(&sheldon.id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn deleting_a_plant_removes_it_from_collections() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let oak = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        let lily = db.plants.create_for_user(&user.id, lily()).await.unwrap().unwrap();
        let first = db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();
        let second = db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();
        for collection in [&first, &second] {
            for plant in [&oak, &lily] {
                db.collections
                    .add_plant_to_collection(&collection.id, &plant.id)
                    .await
                    .unwrap();
            }
        }

        db.plants.delete_by_id(&oak.id).await.unwrap().unwrap();

        for collection in db.collections.get_all().await.unwrap() {
            assert_eq!(collection.plant_ids, vec![lily.id.clone()], "{name}");
        }
    }
}

#[tokio::test]
async fn deleting_all_plants_empties_collections() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let oak = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        let collection = db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();
        db.collections
            .add_plant_to_collection(&collection.id, &oak.id)
            .await
            .unwrap();

        let removed = db.plants.delete_all().await.unwrap();
        assert_eq!(removed.len(), 1, "{name}");

        let collection = db.collections.get_by_id(&collection.id).await.unwrap().unwrap();
        assert!(collection.plant_ids.is_empty(), "{name}");
        assert!(db.plants.get_all().await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn deleting_all_users_empties_everything() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();

        let removed = db.users.delete_all().await.unwrap();
        assert_eq!(removed.len(), 1, "{name}");
        assert!(db.users.get_all().await.unwrap().is_empty(), "{name}");
        assert!(db.plants.get_all().await.unwrap().is_empty(), "{name}");
        assert!(db.collections.get_all().await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn adding_unknown_ids_leaves_collection_untouched() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let oak = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        let collection = db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();

        let missing_plant = db
            .collections
            .add_plant_to_collection(&collection.id, "no-such-plant")
            .await
            .unwrap();
        assert!(missing_plant.is_none(), "{name}");
        let missing_collection = db
            .collections
            .add_plant_to_collection("no-such-collection", &oak.id)
            .await
            .unwrap();
        assert!(missing_collection.is_none(), "{name}");

        let unchanged = db.collections.get_by_id(&collection.id).await.unwrap().unwrap();
        assert_eq!(unchanged, collection, "{name}");
    }
}

#[tokio::test]
async fn collection_membership_is_an_ordered_set() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let oak = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        let lily = db.plants.create_for_user(&user.id, lily()).await.unwrap().unwrap();
        let collection = db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();

        db.collections.add_plant_to_collection(&collection.id, &lily.id).await.unwrap();
        db.collections.add_plant_to_collection(&collection.id, &oak.id).await.unwrap();
        let again = db
            .collections
            .add_plant_to_collection(&collection.id, &lily.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.plant_ids, vec![lily.id.clone(), oak.id.clone()], "{name}");

        let plants = db
            .collections
            .get_all_plants_for_collection(&collection.id)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<_> = plants.iter().map(|p| p.common_name.as_str()).collect();
        assert_eq!(names, vec!["Water lily", "Oak"], "{name}");

        let after = db
            .collections
            .delete_plant_from_collection(&collection.id, &lily.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.plant_ids, vec![oak.id.clone()], "{name}");

        assert!(
            db.collections
                .delete_plant_from_collection(&collection.id, "no-such-plant")
                .await
                .unwrap()
                .is_none(),
            "{name}"
        );
        assert!(
            db.collections
                .get_all_plants_for_collection("no-such-collection")
                .await
                .unwrap()
                .is_none(),
            "{name}"
        );
    }
}

#[tokio::test]
async fn collection_update_keeps_owner_and_plants() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let user = db.users.create(sheldon()).await.unwrap();
        let oak = db.plants.create_for_user(&user.id, oak()).await.unwrap().unwrap();
        let collection = db.collections.create_for_user(&user.id, trees()).await.unwrap().unwrap();
        db.collections.add_plant_to_collection(&collection.id, &oak.id).await.unwrap();

        let mut changed = collection.clone();
        changed.name = "Old trees".into();
        changed.image_url = Some("/uploads/forest.png".into());
        changed.user_id = "someone-else".into();
        changed.plant_ids.clear();

        let updated = db.collections.update(changed).await.unwrap().unwrap();
        assert_eq!(updated.name, "Old trees", "{name}");
        assert_eq!(updated.image_url.as_deref(), Some("/uploads/forest.png"), "{name}");
        assert_eq!(updated.user_id, user.id, "{name}");
        assert_eq!(updated.plant_ids, vec![oak.id.clone()], "{name}");

        let removed = db.collections.delete_by_id(&collection.id).await.unwrap();
        assert!(removed.is_some(), "{name}");
        assert!(db.collections.get_by_id(&collection.id).await.unwrap().is_none(), "{name}");
        // the plant itself survives
        assert!(db.plants.get_by_id(&oak.id).await.unwrap().is_some(), "{name}");
    }
}

#[tokio::test]
async fn listing_collections_per_user_carries_their_plants() {
    let (_dir, dbs) = backends().await;
    for (name, db) in dbs {
        let sheldon = db.users.create(sheldon()).await.unwrap();
        let leonard = db.users.create(leonard()).await.unwrap();
        let oak = db.plants.create_for_user(&sheldon.id, oak()).await.unwrap().unwrap();
        let lily = db.plants.create_for_user(&leonard.id, lily()).await.unwrap().unwrap();
        let mine = db.collections.create_for_user(&sheldon.id, trees()).await.unwrap().unwrap();
        let theirs = db.collections.create_for_user(&leonard.id, trees()).await.unwrap().unwrap();
        db.collections.add_plant_to_collection(&mine.id, &oak.id).await.unwrap();
        db.collections.add_plant_to_collection(&theirs.id, &lily.id).await.unwrap();

        let listed = db.collections.get_all_for_user(&sheldon.id).await.unwrap();
        assert_eq!(listed.len(), 1, "{name}");
        assert_eq!(listed[0].id, mine.id, "{name}");
        assert_eq!(listed[0].plant_ids, vec![oak.id.clone()], "{name}");

        let all = db.collections.get_all().await.unwrap();
        assert_eq!(all.len(), 2, "{name}");
        let other = all.iter().find(|c| c.id == theirs.id).unwrap();
        assert_eq!(other.plant_ids, vec![lily.id.clone()], "{name}");
    }
}
