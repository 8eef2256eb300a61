//! Typed store CRUD tests over the in-memory backend.

use bson::Uuid;
use docshape::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: Uuid,
    name: String,
    age: i32,
}

impl Document for User {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn database_name() -> &'static str {
        "app"
    }

    fn collection_name() -> &'static str {
        "users"
    }
}

fn user(name: &str, age: i32) -> User {
    User {
        id: Uuid::new(),
        name: name.to_string(),
        age,
    }
}

#[tokio::test]
async fn typed_crud_roundtrip() {
    let store = DocumentStore::new(InMemoryStore::new());
    let users = store.typed_collection::<User>();

    let ada = user("ada", 36);
    let grace = user("grace", 45);
    users
        .insert(vec![ada.clone(), grace.clone()])
        .await
        .unwrap();

    let fetched = users.get(vec![*ada.id()]).await.unwrap();
    assert_eq!(fetched, vec![ada.clone()]);

    let mut renamed = ada.clone();
    renamed.name = "lovelace".to_string();
    users.update(vec![renamed.clone()]).await.unwrap();
    assert_eq!(
        users.get(vec![*ada.id()]).await.unwrap(),
        vec![renamed]
    );

    users.delete(vec![*grace.id()]).await.unwrap();
    assert!(users
        .get(vec![*grace.id()])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn typed_query_filters_and_sorts() {
    let store = DocumentStore::new(InMemoryStore::new());
    let users = store.typed_collection::<User>();

    users
        .insert(vec![user("ada", 36), user("grace", 45), user("edsger", 36)])
        .await
        .unwrap();

    let same_age = users
        .query(
            Query::builder()
                .filter(Filter::eq("age", 36))
                .sort("name", SortDirection::Asc)
                .build(),
        )
        .await
        .unwrap();

    let names = same_age
        .iter()
        .map(|u| u.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["ada", "edsger"]);
}

#[tokio::test]
async fn query_page_reports_full_match_count() {
    let store = DocumentStore::new(InMemoryStore::new());
    let users = store.typed_collection::<User>();

    users
        .insert(
            (0..25)
                .map(|i| user(&format!("user-{i:02}"), i))
                .collect(),
        )
        .await
        .unwrap();

    let page = users
        .query_page(
            Query::builder()
                .sort("age", SortDirection::Asc)
                .build(),
            PaginationParams::new(2, 10),
        )
        .await
        .unwrap();

    assert_eq!(page.count, 25);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].age, 10);
    assert_eq!(page.next_page, Some(3));
    assert_eq!(page.previous_page, Some(1));
}

#[tokio::test]
async fn collection_management_per_database() {
    let store = DocumentStore::new(InMemoryStore::new());

    store.create_collection("app", "users").await.unwrap();
    store
        .create_collection("app", "orders")
        .await
        .unwrap();
    store
        .create_collection("staging", "users")
        .await
        .unwrap();

    let mut names = store.list_collections("app").await.unwrap();
    names.sort();
    assert_eq!(names, vec!["orders", "users"]);

    store.drop_collection("app", "orders").await.unwrap();
    assert_eq!(
        store.list_collections("app").await.unwrap(),
        vec!["users"]
    );
    assert_eq!(
        store
            .list_collections("staging")
            .await
            .unwrap(),
        vec!["users"]
    );
}
