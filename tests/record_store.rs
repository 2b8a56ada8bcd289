mod common;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use uuid::Uuid;

use resource_api::AppError;
use resource_api::domain::entities::User;
use resource_api::domain::entity::{
    Entity, EntityDescriptor, Field, FieldKind, Fields, Relation, SortResolver,
};
use resource_api::domain::sort::{Direction, Nulls, SortSpec};
use resource_api::domain::PageWindow;
use resource_api::infrastructure::persistence::{ListQuery, Predicate, RecordStore};

#[derive(Debug, Clone, sqlx::FromRow)]
struct Note {
    id: Uuid,
    created_date: DateTime<Utc>,
    modified_date: DateTime<Utc>,
    title: String,
    rank: Option<i64>,
    owner_id: Option<Uuid>,
}

static NOTE_FIELDS: [Field; 2] = [
    Field::new("title", FieldKind::Text).required(),
    Field::new("rank", FieldKind::Integer),
];

static NOTE_RELATIONS: [Relation; 1] = [Relation {
    name: "owner",
    column: "owner_id",
    target: "users",
    target_soft_delete: Some("deleted"),
    nullable: true,
    required: false,
}];

static NOTE: EntityDescriptor = EntityDescriptor {
    table: "notes",
    fields: &NOTE_FIELDS,
    relations: &NOTE_RELATIONS,
    sort_resolvers: &[SortResolver {
        name: "ranking",
        columns: &["rank", "title"],
    }],
    default_sort: None,
    soft_delete: None,
};

impl Entity for Note {
    fn descriptor() -> &'static EntityDescriptor {
        &NOTE
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

async fn setup() -> SqlitePool {
    let pool = common::create_test_pool().await;
    sqlx::query(
        "CREATE TABLE notes (
            id            BLOB PRIMARY KEY NOT NULL,
            created_date  TEXT NOT NULL,
            modified_date TEXT NOT NULL,
            title         TEXT NOT NULL,
            rank          INTEGER,
            owner_id      BLOB REFERENCES users (id)
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool
}

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

async fn note(pool: &SqlitePool, value: Value) -> Note {
    let mut conn = pool.acquire().await.unwrap();
    RecordStore::<Note>::new(&mut conn)
        .create(&fields(value))
        .await
        .unwrap()
}

fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|n| n.title.as_str()).collect()
}

#[tokio::test]
async fn test_create_assigns_id_and_timestamps() {
    let pool = setup().await;
    let created = note(&pool, json!({ "title": "first", "rank": 3 })).await;

    assert_ne!(created.id, Uuid::nil());
    assert_eq!(created.created_date, created.modified_date);
    assert_eq!(created.rank, Some(3));
    assert_eq!(created.owner_id, None);
}

#[tokio::test]
async fn test_create_validates_input() {
    let pool = setup().await;
    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);

    let err = store
        .create(&fields(json!({ "title": "x", "colour": "red", "size": 2 })))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownField(ref keys) if keys == &["colour", "size"]));

    let err = store.create(&fields(json!({ "rank": 1 }))).await.unwrap_err();
    assert_eq!(err.public_message(false), "Missing required attributes: title");

    let err = store
        .create(&fields(json!({ "title": "x", "rank": "high" })))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(false), "Attribute rank has a wrong type");

    let err = store
        .create(&fields(json!({ "title": "x", "id": Uuid::new_v4().to_string() })))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(false), "Read-only attributes: id");
}

#[tokio::test]
async fn test_relation_must_point_at_live_row() {
    let pool = setup().await;
    let owner = common::seed_user(&pool, "owner@example.com", false).await;

    let linked = note(&pool, json!({ "title": "mine", "owner": owner.id.to_string() })).await;
    assert_eq!(linked.owner_id, Some(owner.id));

    let mut conn = pool.acquire().await.unwrap();
    let err = RecordStore::<Note>::new(&mut conn)
        .create(&fields(
            json!({ "title": "orphan", "owner": Uuid::new_v4().to_string() }),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(false), "Related owner doesn't exist");
    drop(conn);

    common::soft_delete(&pool, &owner).await;

    let mut conn = pool.acquire().await.unwrap();
    let err = RecordStore::<Note>::new(&mut conn)
        .create(&fields(json!({ "title": "late", "owner": owner.id.to_string() })))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_sort_with_null_placement() {
    let pool = setup().await;
    note(&pool, json!({ "title": "b", "rank": 2 })).await;
    note(&pool, json!({ "title": "none" })).await;
    note(&pool, json!({ "title": "a", "rank": 1 })).await;

    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);

    let rows = store
        .all(&ListQuery::new().sort(Some(SortSpec::parse("rank").unwrap())))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["none", "a", "b"]);

    let rows = store
        .all(&ListQuery::new().sort(Some(SortSpec::parse("rank:last").unwrap())))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["a", "b", "none"]);

    let rows = store
        .all(&ListQuery::new().sort(Some(SortSpec::parse("-title").unwrap())))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["none", "b", "a"]);
}

#[tokio::test]
async fn test_virtual_sort_expands_columns() {
    let terms = RecordStore::<User>::set_sort(Some(&SortSpec::parse("-name:last").unwrap()))
        .unwrap();

    let columns: Vec<&str> = terms.iter().map(|t| t.column).collect();
    assert_eq!(columns, vec!["last_name", "first_name", "id"]);
    assert!(terms[..2]
        .iter()
        .all(|t| t.direction == Direction::Desc && t.nulls == Nulls::Last));
    assert_eq!(terms[2].direction, Direction::Asc);
}

#[tokio::test]
async fn test_default_sort() {
    let terms = RecordStore::<User>::set_sort(None).unwrap();
    assert_eq!(terms[0].column, "created_date");
    assert_eq!(terms[0].direction, Direction::Desc);

    let terms = RecordStore::<Note>::set_sort(None).unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].column, "id");
    assert_eq!(terms[0].direction, Direction::Desc);
}

#[tokio::test]
async fn test_unknown_sort_fields_are_listed() {
    let err = RecordStore::<User>::set_sort(Some(&SortSpec::parse("age,-password,name").unwrap()))
        .unwrap_err();
    assert_eq!(err.public_message(false), "Unknown sort fields: age, password");

    let pool = setup().await;
    let mut conn = pool.acquire().await.unwrap();
    let err = RecordStore::<Note>::new(&mut conn)
        .count(&ListQuery::new().sort(Some(SortSpec::parse("colour").unwrap())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_filters_and_count() {
    let pool = setup().await;
    for (title, rank) in [("a", 1), ("b", 2), ("c", 3)] {
        note(&pool, json!({ "title": title, "rank": rank })).await;
    }
    note(&pool, json!({ "title": "d" })).await;

    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);
    let by_title = ListQuery::new().sort(Some(SortSpec::parse("title").unwrap()));

    let rows = store
        .all(&by_title.clone().filter(Predicate::gt("rank", 1i64)))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["b", "c"]);

    let rows = store
        .all(&by_title.clone().filter(Predicate::is_null("rank")))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["d"]);

    let rows = store
        .all(&by_title.clone().filter(Predicate::is_in("title", ["a", "c", "zzz"])))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["a", "c"]);

    let empty: [&str; 0] = [];
    let rows = store
        .all(&by_title.clone().filter(Predicate::is_in("title", empty)))
        .await
        .unwrap();
    assert!(rows.is_empty());

    let rows = store
        .all(
            &by_title
                .clone()
                .filter(Predicate::lt("rank", 3i64))
                .filter(Predicate::ne("title", "a")),
        )
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["b"]);

    let count = store
        .count(&ListQuery::new().filter(Predicate::not_null("rank")))
        .await
        .unwrap();
    assert_eq!(count, 3);

    let err = store
        .all(&ListQuery::new().filter(Predicate::eq("colour", "red")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownField(_)));
}

#[tokio::test]
async fn test_pagination_window() {
    let pool = setup().await;
    for rank in 1..=5i64 {
        note(&pool, json!({ "title": format!("n{rank}"), "rank": rank })).await;
    }

    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);
    let query = ListQuery::new()
        .sort(Some(SortSpec::parse("rank").unwrap()))
        .window(PageWindow::new(2, 2));

    let rows = store.all(&query).await.unwrap();
    assert_eq!(titles(&rows), vec!["n3", "n4"]);

    // The window never affects the count.
    assert_eq!(store.count(&query).await.unwrap(), 5);
}

#[tokio::test]
async fn test_find_keeps_input_order() {
    let pool = setup().await;
    let a = note(&pool, json!({ "title": "a" })).await;
    let b = note(&pool, json!({ "title": "b" })).await;

    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);

    let rows = store
        .find(&[b.id, Uuid::new_v4(), a.id, b.id])
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["b", "a", "b"]);

    assert!(store.find(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_bumps_modified_date() {
    let pool = setup().await;
    let created = note(&pool, json!({ "title": "draft", "rank": 1 })).await;

    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);

    let updated = store
        .update(created.id, &fields(json!({ "title": "final", "rank": null })))
        .await
        .unwrap();
    assert_eq!(updated.title, "final");
    assert_eq!(updated.rank, None);
    assert_eq!(updated.created_date, created.created_date);
    assert!(updated.modified_date >= created.modified_date);

    let err = store
        .update(created.id, &fields(json!({ "title": null })))
        .await
        .unwrap_err();
    assert_eq!(err.public_message(false), "Attribute title can't be empty");

    let err = store
        .update(Uuid::new_v4(), &fields(json!({ "title": "x" })))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_hard_delete() {
    let pool = setup().await;
    let created = note(&pool, json!({ "title": "temp" })).await;

    let mut conn = pool.acquire().await.unwrap();
    let mut store = RecordStore::<Note>::new(&mut conn);

    store.delete(created.id).await.unwrap();
    assert!(store.get_optional(created.id).await.unwrap().is_none());
    assert!(matches!(
        store.delete(created.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    drop(store);

    let err = RecordStore::<Note>::new(&mut conn)
        .including_deleted()
        .restore(created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_soft_delete_and_restore() {
    let pool = setup().await;
    let user = common::seed_user(&pool, "ada@example.com", false).await;
    common::soft_delete(&pool, &user).await;

    let mut conn = pool.acquire().await.unwrap();

    let mut live = RecordStore::<User>::new(&mut conn);
    assert!(matches!(live.get(user.id).await.unwrap_err(), AppError::NotFound(_)));
    assert!(live.find(&[user.id]).await.unwrap().is_empty());
    assert_eq!(live.count(&ListQuery::new()).await.unwrap(), 0);
    assert!(matches!(
        live.update(user.id, &fields(json!({ "first_name": "Ada" })))
            .await
            .unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(live.delete(user.id).await.unwrap_err(), AppError::NotFound(_)));
    assert!(matches!(live.restore(user.id).await.unwrap_err(), AppError::Internal(_)));
    drop(live);

    let mut all = RecordStore::<User>::new(&mut conn).including_deleted();
    let deleted = all.get(user.id).await.unwrap();
    assert!(deleted.is_deleted());

    let restored = all.restore(user.id).await.unwrap();
    assert!(!restored.is_deleted());
    drop(all);

    let found = RecordStore::<User>::new(&mut conn).get(user.id).await.unwrap();
    assert_eq!(found.email, "ada@example.com");
}
