//! The Postgres ReID gallery.

use attendex::data::PgFaceStore;
use attendex::face::FaceStore;
use attendex::face::embedding::Embedding;
use attendex::face::registry::FaceIdentity;
use sqlx::PgPool;

fn identity(reid_num: u32, name: &str) -> FaceIdentity {
    FaceIdentity {
        reid_num,
        name: name.to_owned(),
        embedding: Embedding::new(vec![0.6, 0.8, 0.0]),
    }
}

#[sqlx::test]
async fn gallery_survives_a_reload(pool: PgPool) {
    let store = PgFaceStore::new(pool.clone());
    store.insert(&identity(2, "Unknown_2")).await.unwrap();
    store.insert(&identity(1, "Ana Ruiz")).await.unwrap();

    let reloaded = PgFaceStore::new(pool).load_all().await.unwrap();
    let names: Vec<(u32, &str)> = reloaded
        .iter()
        .map(|f| (f.reid_num, f.name.as_str()))
        .collect();
    assert_eq!(names, vec![(1, "Ana Ruiz"), (2, "Unknown_2")]);
    assert_eq!(reloaded[0].embedding.len(), 3);
}

#[sqlx::test]
async fn renames_hit_existing_rows_only(pool: PgPool) {
    let store = PgFaceStore::new(pool);
    store.insert(&identity(1, "Unknown_1")).await.unwrap();

    assert!(store.update_name(1, "Ben Ito").await.unwrap());
    assert!(!store.update_name(7, "Nobody").await.unwrap());

    let rows = store.load_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Ben Ito");
}

#[sqlx::test]
async fn reinserting_a_reid_replaces_it(pool: PgPool) {
    let store = PgFaceStore::new(pool);
    store.insert(&identity(3, "Unknown_3")).await.unwrap();
    store.insert(&identity(3, "Merged_to_1")).await.unwrap();

    let rows = store.load_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Merged_to_1");
}
