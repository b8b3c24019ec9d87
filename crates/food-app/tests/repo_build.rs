use food_repo::{build_repo, Repo};
use food_types::domain::page::Pageable;
use food_types::ports::order_repository::{OrderFilter, OrderRepository, OutboxRepository};

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn builds_sqlite_repo_from_url() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("food-test.db");
    let url = format!("sqlite://{}", db_path.display());

    let repo: Repo = build_repo(Some(&url)).await.expect("build repo");
    assert_eq!(repo.backend_name(), "sqlite");
    assert!(db_path.exists());

    let page = repo
        .search(&OrderFilter::default(), Pageable::default())
        .await
        .expect("search");
    assert_eq!(page.total_elements, 0);
    let now = chrono::Utc::now();
    let claimed = repo.claim_pending(5, 10, now, now).await.expect("claim");
    assert!(claimed.is_empty());
}

#[cfg(all(feature = "memory", feature = "sqlite"))]
#[tokio::test]
async fn no_url_falls_back_to_memory() {
    let repo: Repo = build_repo(None).await.expect("build repo");
    assert_eq!(repo.backend_name(), "memory");
}
