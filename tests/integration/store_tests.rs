//! Postgres store tests
//!
//! Each test gets a fresh migrated database from `DATABASE_URL`.
//! Run with: DATABASE_URL=postgres://... cargo test --test store_tests -- --ignored

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use pustaka_server::{
    error::AppError,
    models::{
        book::BookQuery,
        loan::{LoanRules, LoanStatus},
    },
    repository::{books::BooksRepository, loans::LoansRepository, LoanStore},
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

async fn add_member(pool: &PgPool, username: &str) -> i32 {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (fullname, username, email, password)
        VALUES ($1, $1, $1 || '@example.com', 'not-a-hash')
        RETURNING id
        "#,
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .expect("Failed to insert member")
}

async fn add_book(pool: &PgPool, title: &str, stock: i32, fine_amount: i64) -> i32 {
    sqlx::query_scalar(
        r#"
        INSERT INTO books (title, total_stock, available_stock, fine_amount)
        VALUES ($1, $2, $2, $3)
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(stock)
    .bind(Decimal::from(fine_amount))
    .fetch_one(pool)
    .await
    .expect("Failed to insert book")
}

async fn available(pool: &PgPool, book_id: i32) -> i32 {
    sqlx::query_scalar("SELECT available_stock FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read stock")
}

async fn borrowed_loan(repo: &LoansRepository, book_id: i32, user_id: i32) -> i32 {
    let rules = LoanRules::default();
    let id = repo.create_request(book_id, user_id, t0()).await.unwrap().loan.id;
    repo.transition(id, LoanStatus::Approved, &rules, t0()).await.unwrap();
    repo.transition(id, LoanStatus::Borrowed, &rules, t0()).await.unwrap();
    id
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Needs DATABASE_URL
async fn parallel_requests_for_last_copy_admit_one(pool: PgPool) {
    let book_id = add_book(&pool, "Laskar Pelangi", 1, 0).await;
    let repo = LoansRepository::new(pool.clone());

    let mut handles = Vec::new();
    for n in 0..10 {
        let user_id = add_member(&pool, &format!("member{}", n)).await;
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_request(book_id, user_id, t0()).await
        }));
    }

    let mut granted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(granted, 1);
    assert_eq!(conflicts, 9);
    assert_eq!(available(&pool, book_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn duplicate_pending_request_keeps_stock(pool: PgPool) {
    let book_id = add_book(&pool, "Bumi Manusia", 2, 0).await;
    let user_id = add_member(&pool, "sri").await;
    let repo = LoansRepository::new(pool.clone());

    repo.create_request(book_id, user_id, t0()).await.unwrap();
    assert!(matches!(
        repo.create_request(book_id, user_id, t0()).await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(available(&pool, book_id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn simultaneous_duplicates_hit_the_pending_index(pool: PgPool) {
    let book_id = add_book(&pool, "Ronggeng Dukuh Paruk", 5, 0).await;
    let user_id = add_member(&pool, "budi").await;
    let repo = LoansRepository::new(pool.clone());

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create_request(book_id, user_id, t0()).await })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(granted, 1);
    // losers roll back their reservation
    assert_eq!(available(&pool, book_id).await, 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_transition_leaves_status_and_stock(pool: PgPool) {
    let book_id = add_book(&pool, "Cantik Itu Luka", 2, 0).await;
    let user_id = add_member(&pool, "wati").await;
    let repo = LoansRepository::new(pool.clone());
    let rules = LoanRules::default();

    let id = repo.create_request(book_id, user_id, t0()).await.unwrap().loan.id;
    for target in [LoanStatus::Borrowed, LoanStatus::Returned, LoanStatus::Lost] {
        assert!(matches!(
            repo.transition(id, target, &rules, t0()).await,
            Err(AppError::Conflict(_))
        ));
    }
    assert!(matches!(
        repo.transition(999, LoanStatus::Approved, &rules, t0()).await,
        Err(AppError::NotFound(_))
    ));

    let stored = repo.get_loan(id).await.unwrap();
    assert_eq!(stored.loan.status, LoanStatus::Requested);
    assert_eq!(stored.username, "wati");
    assert_eq!(available(&pool, book_id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn late_return_is_fined_and_restocked(pool: PgPool) {
    let book_id = add_book(&pool, "Pulang", 2, 0).await;
    let user_id = add_member(&pool, "agus").await;
    let repo = LoansRepository::new(pool.clone());

    let id = borrowed_loan(&repo, book_id, user_id).await;
    assert_eq!(available(&pool, book_id).await, 1);

    let returned = repo
        .transition(id, LoanStatus::Returned, &LoanRules::default(), t0() + Duration::days(10))
        .await
        .unwrap();

    assert_eq!(returned.fine_total, Decimal::from(25_000));
    assert_eq!(returned.date_due, Some(t0() + Duration::days(7)));
    assert_eq!(available(&pool, book_id).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn restore_never_exceeds_total(pool: PgPool) {
    let book_id = add_book(&pool, "Gadis Kretek", 1, 0).await;
    let user_id = add_member(&pool, "rina").await;
    let repo = LoansRepository::new(pool.clone());

    let id = repo.create_request(book_id, user_id, t0()).await.unwrap().loan.id;
    sqlx::query("UPDATE books SET available_stock = total_stock WHERE id = $1")
        .bind(book_id)
        .execute(&pool)
        .await
        .unwrap();

    let rejected = repo
        .transition(id, LoanStatus::Rejected, &LoanRules::default(), t0())
        .await
        .unwrap();
    assert_eq!(rejected.status, LoanStatus::Rejected);
    assert_eq!(available(&pool, book_id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn sweep_updates_overdue_loans_once(pool: PgPool) {
    let book_id = add_book(&pool, "Saman", 1, 0).await;
    let user_id = add_member(&pool, "dewi").await;
    let repo = LoansRepository::new(pool.clone());

    let id = borrowed_loan(&repo, book_id, user_id).await;
    let now = t0() + Duration::days(9);

    assert_eq!(repo.recalculate_fines(now).await.unwrap(), 1);
    assert_eq!(repo.get_loan(id).await.unwrap().loan.fine_total, Decimal::from(20_000));
    assert_eq!(repo.recalculate_fines(now).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn lost_fine_is_frozen(pool: PgPool) {
    let book_id = add_book(&pool, "Amba", 1, 75_000).await;
    let user_id = add_member(&pool, "yanto").await;
    let repo = LoansRepository::new(pool.clone());

    let id = borrowed_loan(&repo, book_id, user_id).await;
    let lost = repo
        .transition(id, LoanStatus::Lost, &LoanRules::default(), t0() + Duration::days(9))
        .await
        .unwrap();
    assert_eq!(lost.fine_total, Decimal::from(95_000));
    assert_eq!(available(&pool, book_id).await, 0);

    assert_eq!(repo.recalculate_fines(t0() + Duration::days(40)).await.unwrap(), 0);
    assert_eq!(repo.get_loan(id).await.unwrap().loan.fine_total, Decimal::from(95_000));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn search_matches_wildcards_literally(pool: PgPool) {
    add_book(&pool, "100% Halal", 1, 0).await;
    add_book(&pool, "1000 Kisah", 1, 0).await;
    add_book(&pool, "Sejarah_Nusantara", 1, 0).await;
    let repo = BooksRepository::new(pool.clone());

    let percent = repo
        .list(&BookQuery {
            search: Some("100%".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, "100% Halal");

    let underscore = repo
        .list(&BookQuery {
            search: Some("h_".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].title, "Sejarah_Nusantara");
}
