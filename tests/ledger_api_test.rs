// ==========================================
// LedgerApi 集成测试
// ==========================================
// 测试目标: 导入后的台账查询、修改、删除（客户范围隔离）
// ==========================================

mod test_helpers;

use sellout_ledger::api::{ApiError, IngestApi, LedgerApi};
use sellout_ledger::domain::{LedgerFilter, SalesRecordUpdate};
use sellout_ledger::logging;
use tempfile::NamedTempFile;
use test_helpers::{create_seeded_db, open_test_conn, rm_sales_csv, seed_client, TEST_CLIENT};

const OTHER_CLIENT: &str = "MZCL-000010";

/// 准备数据: 默认客户 3 行（CB1 两天 + CB2），另一客户 1 行
async fn setup() -> (NamedTempFile, String) {
    logging::init_test();
    let (temp_file, db_path) = create_seeded_db();
    seed_client(&open_test_conn(&db_path), OTHER_CLIENT, "Otro");

    let ingest = IngestApi::new(db_path.clone());
    let own = rm_sales_csv(&[
        "10/01/2024;ST1;CB1;2;5;Quito",
        "11/01/2024;ST1;CB1;3;6;Quito",
        "05/02/2024;ST2;CB2;1;1;Cuenca",
    ]);
    ingest.upload(&own, "rm.csv", Some(TEST_CLIENT), false).await.unwrap();
    let other = rm_sales_csv(&["10/01/2024;ST9;CB1;9;9;Loja"]);
    ingest.upload(&other, "rm.csv", Some(OTHER_CLIENT), false).await.unwrap();

    (temp_file, db_path)
}

fn update_from(item: &sellout_ledger::domain::SalesRecord) -> SalesRecordUpdate {
    SalesRecordUpdate {
        year: item.year,
        month: item.month,
        day: item.day,
        product_code: item.product_code.clone(),
        store_code: Some(item.store_code.clone()),
        store_name: item.store_name.clone(),
        city: item.city.clone(),
        brand: item.brand.clone(),
        product_name: item.product_name.clone(),
        description: item.description.clone(),
        sap_code: item.sap_code.clone(),
        product_id: item.product_id,
        units_sold: item.units_sold,
        value_sold: item.value_sold,
        stock_units: item.stock_units,
        stock_value: item.stock_value,
    }
}

#[tokio::test]
async fn test_list_is_scoped_and_filtered() {
    let (_temp_file, db_path) = setup().await;
    let api = LedgerApi::new(&db_path).unwrap();

    let all = api.list_records(TEST_CLIENT, &LedgerFilter::default()).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|i| i.client_code == TEST_CLIENT));
    // 日期倒序
    assert_eq!((all[0].record.month, all[0].record.day), (2, 5));
    assert_eq!((all[2].record.month, all[2].record.day), (1, 10));

    let january = api
        .list_records(
            TEST_CLIENT,
            &LedgerFilter {
                year: Some(2024),
                month: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(january.len(), 2);

    let brand_b = api
        .list_all_records(
            TEST_CLIENT,
            &LedgerFilter {
                brand: Some("MARCA_B".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(brand_b.len(), 1);
    assert_eq!(brand_b[0].record.product_code, "CB2");

    let paged = api
        .list_records(
            TEST_CLIENT,
            &LedgerFilter {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].record.day, 11);

    assert!(matches!(
        api.list_records("  ", &LedgerFilter::default()),
        Err(ApiError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_get_and_update_record() {
    let (_temp_file, db_path) = setup().await;
    let api = LedgerApi::new(&db_path).unwrap();

    let items = api.list_all_records(TEST_CLIENT, &LedgerFilter::default()).unwrap();
    let id = items[0].record.id.unwrap();
    let record = api.get_record(id, TEST_CLIENT).unwrap();

    let mut update = update_from(&record);
    update.units_sold = 42.0;
    update.city = Some("Guayaquil".to_string());
    let updated = api.update_record(id, TEST_CLIENT, &update).unwrap();
    assert_eq!(updated.units_sold, 42.0);
    assert_eq!(updated.city.as_deref(), Some("Guayaquil"));

    // 其他客户不可见、不可改
    assert!(matches!(api.get_record(id, OTHER_CLIENT), Err(ApiError::NotFound(_))));
    assert!(api.update_record(id, OTHER_CLIENT, &update).is_err());

    let mut invalid = update_from(&record);
    invalid.product_code = "  ".to_string();
    assert!(matches!(
        api.update_record(id, TEST_CLIENT, &invalid),
        Err(ApiError::ValidationError(_))
    ));
    let mut bad_date = update_from(&record);
    bad_date.month = 13;
    assert!(matches!(
        api.update_record(id, TEST_CLIENT, &bad_date),
        Err(ApiError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_delete_record_is_scoped() {
    let (_temp_file, db_path) = setup().await;
    let api = LedgerApi::new(&db_path).unwrap();

    let items = api.list_all_records(TEST_CLIENT, &LedgerFilter::default()).unwrap();
    let id = items[0].record.id.unwrap();

    assert!(!api.delete_record(id, OTHER_CLIENT).unwrap());
    assert!(api.delete_record(id, TEST_CLIENT).unwrap());
    assert!(!api.delete_record(id, TEST_CLIENT).unwrap());

    let remaining = api.list_all_records(TEST_CLIENT, &LedgerFilter::default()).unwrap();
    assert_eq!(remaining.len(), 2);
}

#[tokio::test]
async fn test_bulk_delete() {
    let (_temp_file, db_path) = setup().await;
    let api = LedgerApi::new(&db_path).unwrap();

    let own: Vec<i64> = api
        .list_all_records(TEST_CLIENT, &LedgerFilter::default())
        .unwrap()
        .iter()
        .filter_map(|i| i.record.id)
        .collect();
    let foreign: Vec<i64> = api
        .list_all_records(OTHER_CLIENT, &LedgerFilter::default())
        .unwrap()
        .iter()
        .filter_map(|i| i.record.id)
        .collect();

    let empty = api.bulk_delete(&[], TEST_CLIENT).unwrap();
    assert!(empty.ok);
    assert_eq!(empty.deleted, 0);

    assert!(matches!(
        api.bulk_delete(&own, "MZCL-404"),
        Err(ApiError::NotFound(_))
    ));

    let mut ids = vec![own[0], own[1]];
    ids.extend(&foreign);
    let outcome = api.bulk_delete(&ids, TEST_CLIENT).unwrap();
    assert!(outcome.ok);
    assert_eq!(outcome.requested, 3);
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.omitted, 1);

    assert_eq!(api.list_all_records(TEST_CLIENT, &LedgerFilter::default()).unwrap().len(), 1);
    assert_eq!(api.list_all_records(OTHER_CLIENT, &LedgerFilter::default()).unwrap().len(), 1);
}
