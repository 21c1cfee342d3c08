//! Runs against a live server. Skipped unless `DATABASE_URL` is set.

use sqlbatch::{Condition, Db, DbConfig, DbError, PgConnection, Value};

async fn try_connect() -> Option<Db> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let conn = PgConnection::connect_url(&database_url)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    let db = Db::with_connection(conn, DbConfig::new())
        .await
        .expect("server did not answer");
    Some(db)
}

async fn setup(db: &mut Db) {
    db.single(
        "CREATE TEMP TABLE feeds (\
            fID int PRIMARY KEY, \
            fURL text NOT NULL, \
            feed_title text, \
            rating numeric, \
            created_at timestamptz DEFAULT now())",
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn batch_round_trip() {
    let Some(mut db) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    setup(&mut db).await;

    db.insert(
        [
            ("fID", Value::from(1)),
            ("fURL", Value::from("https://example.com/it's.xml")),
            ("feed_title", Value::Null),
            ("rating", Value::from("4.5")),
        ],
        "feeds",
        "",
    )
    .insert(
        [("fID", Value::from(2)), ("fURL", Value::from("b")), ("feed_title", Value::from("B"))],
        "feeds",
        "RETURNING fID",
    )
    .update([("feed_title", "A")], "feeds", [Condition::eq("fID", 1)], "")
    .select(
        ["fID", "fURL", "feed_title"],
        "feeds",
        [Condition::gte("fID", 1), Condition::like("fURL", "https://%").and()],
        "ORDER BY fID",
    );

    let results = db.run().await.unwrap();
    assert_eq!(results.len(), 4);
    assert!(results[0].is_empty());
    // The server folds unquoted names, and so does the builder.
    assert_eq!(results[1][0].get("fid"), Some(&Value::Int(2)));
    assert!(results[2].is_empty());

    let rows = &results[3];
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("furl"), Some(&Value::from("https://example.com/it's.xml")));
    assert_eq!(rows[0].get("feed_title"), Some(&Value::from("A")));
    assert_eq!(db.query_count(), 4);
}

#[tokio::test]
async fn failing_statement_stops_the_batch() {
    let Some(mut db) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    setup(&mut db).await;

    db.insert([("fID", Value::from(1)), ("fURL", Value::from("a"))], "feeds", "")
        .insert([("fID", Value::from(1)), ("fURL", Value::from("dup"))], "feeds", "")
        .insert([("fID", Value::from(3)), ("fURL", Value::from("never"))], "feeds", "");

    let err = db.run().await.unwrap_err();
    assert!(matches!(err, DbError::Query { .. }));
    assert_eq!(err.sqlstate(), Some("23505"));
    assert!(db.pending().is_empty());

    let rows = db.single("SELECT fID FROM feeds ORDER BY 1").await.unwrap();
    assert_eq!(rows.len(), 1);
    // Simple-protocol rows arrive as text.
    assert_eq!(rows[0].get("fid"), Some(&Value::from("1")));
}

#[tokio::test]
async fn transaction_rollback_discards_writes() {
    let Some(mut db) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    setup(&mut db).await;

    db.start_transaction().await.unwrap();
    db.insert([("fID", Value::from(9)), ("fURL", Value::from("tx"))], "feeds", "");
    db.run().await.unwrap();
    db.rollback().await.unwrap();
    assert!(!db.in_transaction());

    db.select([] as [&str; 0], "feeds", [], "");
    let results = db.run().await.unwrap();
    assert!(results[0].is_empty());
}

#[tokio::test]
async fn self_contained_raw_transaction() {
    let Some(mut db) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    setup(&mut db).await;

    db.queue_raw("BEGIN; INSERT INTO feeds (fID, fURL) VALUES (5, 'x;y'); COMMIT");
    db.run().await.unwrap();
    assert!(!db.in_transaction());

    db.start_transaction().await.unwrap();
    db.commit().await.unwrap();
}

#[tokio::test]
async fn raw_batch_with_several_statements() {
    let Some(mut db) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    db.queue_raw("SELECT 1 AS a; SELECT 2 AS a");
    let results = db.run().await.unwrap();
    assert_eq!(results[0].len(), 2);
    assert_eq!(results[0][1].get("a"), Some(&Value::from("2")));
}
