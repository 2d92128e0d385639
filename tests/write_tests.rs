mod common;

use common::{Currency, Customer, Visit, create_test_db};
use serde_json::json;
use sqlite_facade::{
   Entity, Error, Filter, InsertOutcome, ReadFacade, Row, Statement, WriteFacade,
};

fn email(address: &str) -> Filter {
   Filter::new().eq("email", address)
}

#[tokio::test]
async fn operations_share_one_unit_of_work_until_commit() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   assert!(!writer.is_active());
   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();
   let session = writer.session_id();
   assert!(session.is_some());

   writer.insert(&Customer::new("bob@example.com", "Bob")).await.unwrap();
   assert_eq!(writer.session_id(), session);

   // Flushed into the open transaction, not yet committed
   assert!(reader.select::<Customer>(&email("ada@example.com")).await.unwrap().is_none());

   writer.commit().await.unwrap();
   assert!(!writer.is_active());

   let all = reader.select_all::<Customer>(&Filter::new()).await.unwrap();
   assert_eq!(all.len(), 2);

   // Next call opens a new unit of work
   writer.insert(&Customer::new("cy@example.com", "Cy")).await.unwrap();
   assert_ne!(writer.session_id(), session);
   writer.rollback().await.unwrap();

   db.remove().await.unwrap();
}

#[tokio::test]
async fn start_transaction_rejects_nested_transaction() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   writer.start_transaction().await.unwrap();
   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();
   let session = writer.session_id();

   let err = writer.start_transaction().await.unwrap_err();
   assert_eq!(err.error_code(), "TRANSACTION_ALREADY_ACTIVE");

   // Open unit of work and its work are untouched
   assert_eq!(writer.session_id(), session);
   writer.commit().await.unwrap();

   let reader = ReadFacade::new(db.clone());
   assert!(reader.select::<Customer>(&email("ada@example.com")).await.unwrap().is_some());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn rollback_discards_inserts_and_updates() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();
   writer.commit().await.unwrap();

   writer.insert(&Customer::new("bob@example.com", "Bob")).await.unwrap();
   let properties = Row::from([("name".to_string(), json!("Countess"))]);
   let updated = writer
      .update::<Customer>(&email("ada@example.com"), &properties)
      .await
      .unwrap();
   assert_eq!(updated, 1);
   writer.rollback().await.unwrap();

   let all = reader.select_all::<Customer>(&Filter::new()).await.unwrap();
   assert_eq!(all.len(), 1);
   assert_eq!(all[0].name, "Ada");

   db.remove().await.unwrap();
}

#[tokio::test]
async fn upsert_twice_keeps_one_row_with_latest_fields() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer
      .upsert(&Customer::new("ada@example.com", "Ada").with_id(7))
      .await
      .unwrap();
   let mut latest = Customer::new("ada@lovelace.org", "Ada Lovelace").with_id(7);
   latest.vip = true;
   writer.upsert(&latest).await.unwrap();
   writer.commit().await.unwrap();

   let all = reader.select_all::<Customer>(&Filter::new()).await.unwrap();
   assert_eq!(all, vec![latest]);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn bulk_upsert_on_unique_column_keeps_existing_key() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();

   let mut row = Customer::new("ada@example.com", "Ada L.").to_row().unwrap();
   row.insert("vip".into(), json!(true));
   let affected = writer
      .bulk_upsert::<Customer>(&[row], &["email"], None)
      .await
      .unwrap();
   assert_eq!(affected, 1);
   writer.commit().await.unwrap();

   let ada = reader
      .select::<Customer>(&email("ada@example.com"))
      .await
      .unwrap()
      .unwrap();
   assert_eq!(ada.id, Some(1));
   assert_eq!(ada.name, "Ada L.");
   assert!(ada.vip);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn upsert_on_explicit_index_elements() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();
   writer.commit().await.unwrap();

   // Whole payload is the update, including the new id
   writer
      .upsert_on(&Customer::new("ada@example.com", "Ada L.").with_id(40), &["email"])
      .await
      .unwrap();
   writer.commit().await.unwrap();

   let all = reader.select_all::<Customer>(&Filter::new()).await.unwrap();
   assert_eq!(all.len(), 1);
   assert_eq!(all[0].id, Some(40));
   assert_eq!(all[0].name, "Ada L.");

   db.remove().await.unwrap();
}

#[tokio::test]
async fn upsert_on_with_unset_key_keeps_existing_key() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();
   writer.insert(&Customer::new("bob@example.com", "Bob")).await.unwrap();
   writer.commit().await.unwrap();

   writer
      .upsert_on(&Customer::new("ada@example.com", "Ada L."), &["email"])
      .await
      .unwrap();
   writer.commit().await.unwrap();

   let all = reader.select_all::<Customer>(&Filter::new()).await.unwrap();
   assert_eq!(
      all,
      vec![
         Customer::new("ada@example.com", "Ada L.").with_id(1),
         Customer::new("bob@example.com", "Bob").with_id(2),
      ]
   );

   // Same for the multi-row form built from entity payloads
   let rows = vec![Customer::new("bob@example.com", "Robert").to_row().unwrap()];
   writer
      .bulk_upsert::<Customer>(&rows, &["email"], None)
      .await
      .unwrap();
   writer.commit().await.unwrap();

   let bob = reader
      .select::<Customer>(&email("bob@example.com"))
      .await
      .unwrap()
      .unwrap();
   assert_eq!(bob.id, Some(2));
   assert_eq!(bob.name, "Robert");

   db.remove().await.unwrap();
}

#[tokio::test]
async fn empty_bulk_upsert_opens_no_unit_of_work() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   let affected = writer
      .bulk_upsert::<Customer>(&[], &["email"], None)
      .await
      .unwrap();

   assert_eq!(affected, 0);
   assert!(!writer.is_active());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn bulk_upsert_rejects_ragged_rows_and_closes() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());
   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();

   let rows = vec![
      Row::from([
         ("email".to_string(), json!("bob@example.com")),
         ("name".to_string(), json!("Bob")),
      ]),
      Row::from([("email".to_string(), json!("cy@example.com"))]),
   ];
   let err = writer
      .bulk_upsert::<Customer>(&rows, &["email"], None)
      .await
      .unwrap_err();

   assert_eq!(err.error_code(), "ROW_SHAPE_MISMATCH");
   assert!(!writer.is_active());

   let reader = ReadFacade::new(db.clone());
   assert!(reader.select_all::<Customer>(&Filter::new()).await.unwrap().is_empty());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn insert_ignore_reports_conflicts() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   let first = writer
      .insert_ignore(&Customer::new("ada@example.com", "Ada"))
      .await
      .unwrap();
   assert_eq!(first, InsertOutcome::Inserted(json!(1)));
   assert_eq!(first.id(), Some(1));

   let second = writer
      .insert_ignore(&Customer::new("ada@example.com", "Someone else"))
      .await
      .unwrap();
   assert_eq!(second, InsertOutcome::Conflicted);
   assert!(writer.is_active());
   writer.commit().await.unwrap();

   let reader = ReadFacade::new(db.clone());
   let ada = reader
      .select::<Customer>(&email("ada@example.com"))
      .await
      .unwrap()
      .unwrap();
   assert_eq!(ada.name, "Ada");

   db.remove().await.unwrap();
}

#[tokio::test]
async fn insert_ignore_with_text_key_keeps_the_row() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   let first = writer
      .insert_ignore(&Currency::new("EUR", "Euro"))
      .await
      .unwrap();
   assert_eq!(first, InsertOutcome::Inserted(json!("EUR")));
   assert_eq!(first.id(), None);

   let second = writer
      .insert_ignore(&Currency::new("EUR", "Euro again"))
      .await
      .unwrap();
   assert_eq!(second, InsertOutcome::Conflicted);
   assert!(writer.is_active());
   writer.commit().await.unwrap();

   let reader = ReadFacade::new(db.clone());
   let all = reader.select_all::<Currency>(&Filter::new()).await.unwrap();
   assert_eq!(all, vec![Currency::new("EUR", "Euro")]);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn insert_ignore_get_id_rejects_text_key_before_writing() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Currency::new("USD", "Dollar")).await.unwrap();

   let err = writer
      .insert_ignore_get_id(&Currency::new("EUR", "Euro"))
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "NON_INTEGER_KEY");
   assert!(!writer.is_active());

   let reader = ReadFacade::new(db.clone());
   assert!(reader.select_all::<Currency>(&Filter::new()).await.unwrap().is_empty());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn insert_ignore_get_id_returns_new_or_existing_key() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();

   let bob = writer
      .insert_ignore_get_id(&Customer::new("bob@example.com", "Bob"))
      .await
      .unwrap();
   assert_eq!(bob, 2);

   // Conflict on email; the lookup uses the unique email column
   let ada = writer
      .insert_ignore_get_id(&Customer::new("ada@example.com", "Another name"))
      .await
      .unwrap();
   assert_eq!(ada, 1);
   writer.commit().await.unwrap();

   let stored = reader
      .select::<Customer>(&email("bob@example.com"))
      .await
      .unwrap()
      .unwrap();
   assert_eq!(stored.id, Some(bob));

   db.remove().await.unwrap();
}

#[tokio::test]
async fn insert_ignore_get_id_falls_back_to_scalar_columns() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   let mut visit = Visit::new(1, "/pricing");
   visit.id = Some(5);
   let first = writer.insert_ignore_get_id(&visit).await.unwrap();
   assert_eq!(first, 5);

   // Same key conflicts; found again by id, customer_id and page
   let again = writer.insert_ignore_get_id(&visit).await.unwrap();
   assert_eq!(again, 5);
   writer.commit().await.unwrap();

   db.remove().await.unwrap();
}

#[tokio::test]
async fn insert_ignore_get_id_by_explicit_lookup() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   writer
      .insert(&Customer::new("ada@example.com", "Ada").with_id(3))
      .await
      .unwrap();

   let id = writer
      .insert_ignore_get_id_by(
         &Customer::new("ada@example.com", "Ada").with_id(3),
         &Filter::new().eq("id", 3),
      )
      .await
      .unwrap();
   assert_eq!(id, 3);

   let err = writer
      .insert_ignore_get_id_by(&Customer::new("x@example.com", "X"), &Filter::new())
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "EMPTY_LOOKUP_FILTER");
   assert!(!writer.is_active());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn update_with_mutates_loaded_entities() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer
      .bulk_insert(&[
         Customer::new("ada@example.com", "Ada"),
         Customer::new("bob@example.com", "Bob"),
         Customer::new("cy@example.com", "Cy"),
      ])
      .await
      .unwrap();

   let loaded = writer
      .update_with::<Customer, _>(&Filter::new().eq("vip", false), |customer| {
         customer.name = customer.name.to_uppercase();
         customer.vip = customer.email.starts_with('b');
      })
      .await
      .unwrap();
   assert_eq!(loaded, 3);
   writer.commit().await.unwrap();

   let vips = reader
      .select_all::<Customer>(&Filter::new().eq("vip", true))
      .await
      .unwrap();
   assert_eq!(vips.len(), 1);
   assert_eq!(vips[0].name, "BOB");

   db.remove().await.unwrap();
}

#[tokio::test]
async fn delete_then_select_all_is_empty() {
   let (db, _temp) = create_test_db().await;
   let reader = ReadFacade::new(db.clone());
   let mut writer = WriteFacade::new(db.clone());

   writer
      .bulk_insert(&[
         Customer::new("ada@example.com", "Ada"),
         Customer::new("bob@example.com", "Bob"),
      ])
      .await
      .unwrap();
   writer.commit().await.unwrap();

   let filter = Filter::new().eq("name", "Bob");
   let deleted = writer.delete::<Customer>(&filter).await.unwrap();
   assert_eq!(deleted, 1);
   writer.commit().await.unwrap();

   assert!(reader.select_all::<Customer>(&filter).await.unwrap().is_empty());
   assert_eq!(
      reader.select_all::<Customer>(&Filter::new()).await.unwrap().len(),
      1
   );

   db.remove().await.unwrap();
}

#[tokio::test]
async fn failure_closes_unit_of_work_and_discards_earlier_work() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   writer.insert(&Customer::new("ada@example.com", "Ada")).await.unwrap();

   // Duplicate email is not covered by an ON CONFLICT clause
   let err = writer
      .insert(&Customer::new("ada@example.com", "Ada again"))
      .await
      .unwrap_err();
   assert!(matches!(err, Error::Sqlx(_)));
   assert!(err.error_code().starts_with("SQLITE_"));
   assert!(!writer.is_active());

   // Nothing to commit; the writer connection was released
   writer.commit().await.unwrap();
   let reader = ReadFacade::new(db.clone());
   assert!(reader.select_all::<Customer>(&Filter::new()).await.unwrap().is_empty());

   writer.insert(&Customer::new("bob@example.com", "Bob")).await.unwrap();
   writer.commit().await.unwrap();
   assert_eq!(
      reader.select_all::<Customer>(&Filter::new()).await.unwrap().len(),
      1
   );

   db.remove().await.unwrap();
}

#[tokio::test]
async fn unknown_filter_column_is_an_error() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   let err = writer
      .delete::<Customer>(&Filter::new().eq("nickname", "Ada"))
      .await
      .unwrap_err();
   assert_eq!(err.error_code(), "UNKNOWN_COLUMN");
   assert!(!writer.is_active());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn execute_and_execute_statement_run_in_the_shared_transaction() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   let result = writer
      .execute(
         &Statement::new("INSERT INTO crm.customers (email, name) VALUES (?1, ?2)")
            .bind("ada@example.com")
            .bind("Ada"),
      )
      .await
      .unwrap();
   assert_eq!((result.rows_affected, result.last_insert_id), (1, 1));

   let rows = writer
      .execute_statement(
         &Statement::new("UPDATE crm.customers SET vip = 1 WHERE id = ?1 RETURNING id, vip")
            .bind(1),
      )
      .await
      .unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["id"], json!(1));

   writer.close().await.unwrap();
   assert!(!writer.is_active());

   let reader = ReadFacade::new(db.clone());
   assert!(reader.select_all::<Customer>(&Filter::new()).await.unwrap().is_empty());

   db.remove().await.unwrap();
}

#[tokio::test]
async fn commit_and_rollback_without_unit_of_work_are_no_ops() {
   let (db, _temp) = create_test_db().await;
   let mut writer = WriteFacade::new(db.clone());

   writer.commit().await.unwrap();
   writer.rollback().await.unwrap();
   writer.close().await.unwrap();
   assert!(!writer.is_active());

   db.remove().await.unwrap();
}
