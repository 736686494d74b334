// ==========================================
// IngestApi 集成测试
// ==========================================
// 测试目标: 上传接口的汇总 / 文本报告两种输出与输入校验
// ==========================================

mod test_helpers;

use sellout_ledger::api::{ApiError, IngestApi, IngestResponse};
use sellout_ledger::domain::DEPRATI_CLIENT_CODE;
use sellout_ledger::importer::PartnerLayout;
use sellout_ledger::logging;
use test_helpers::{
    count_ledger, create_seeded_db, open_test_conn, rm_sales_csv, seed_client, xlsx_workbook, XCell,
};

#[tokio::test]
async fn test_upload_returns_summary() {
    logging::init_test();
    let (_temp_file, db_path) = create_seeded_db();
    let api = IngestApi::new(db_path.clone());

    let bytes = rm_sales_csv(&["10/01/2024;ST1;CB1;2;5;Quito", "10/01/2024;ST1;CB9;1;1;Quito"]);
    let response = api.upload(&bytes, "rm.csv", None, false).await.unwrap();

    let IngestResponse::Summary(result) = response else {
        panic!("应返回 JSON 汇总");
    };
    assert!(result.ok);
    assert_eq!(result.partner, "RM");
    assert_eq!(result.client_code, "MZCL-000008");
    assert_eq!(result.sales_rows_read, 2);
    assert_eq!(result.sales_rows_processed, 1);
    assert_eq!(result.unmatched_codes, vec!["CB9".to_string()]);
    assert!(!result.detail.run_id.is_empty());
    assert_eq!(count_ledger(&open_test_conn(&db_path)), 1);

    // 对外字段名
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["filasLeidasVentas"], 2);
    assert_eq!(json["codigosNoEncontrados"][0], "CB9");
    assert_eq!(json["incidencias"][0]["hoja"], "VENTAS");
    assert_eq!(json["formato"], "RM");
}

#[tokio::test]
async fn test_upload_returns_text_report() {
    logging::init_test();
    let (_temp_file, db_path) = create_seeded_db();
    let api = IngestApi::new(db_path);

    let bytes = rm_sales_csv(&["10/01/2024;ST1;CB9;1;1;Quito"]);
    let response = api.upload(&bytes, "rm.csv", None, true).await.unwrap();

    let IngestResponse::TextReport { file_name, content } = response else {
        panic!("应返回文本报告");
    };
    assert!(file_name.starts_with("incidencias_RM_"));
    assert!(file_name.ends_with(".txt"));
    assert!(content.starts_with("INCIDENCIAS DE CARGA RM\nArchivo: rm.csv\n"));
    assert!(content.contains("Ventas - Filas leídas: 1\n"));
    assert!(content.contains("CODIGOS_NO_ENCONTRADOS\nCB9\n"));
    assert!(content.contains("VENTAS\t2\tCB9\tNo existe en SAP_Prod_cache (cod_barra).\n"));
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    logging::init_test();
    let (_temp_file, db_path) = create_seeded_db();
    let api = IngestApi::new(db_path);

    let empty = api.upload(&[], "rm.xlsx", None, false).await;
    assert!(matches!(empty, Err(ApiError::InvalidInput(_))));

    let unsupported = api.upload(b"hola", "rm.docx", None, false).await;
    assert!(matches!(unsupported, Err(ApiError::InvalidInput(_))));
}

#[tokio::test]
async fn test_corrupt_workbook_is_fatal_incidence() {
    logging::init_test();
    let (_temp_file, db_path) = create_seeded_db();
    let api = IngestApi::new(db_path);

    let response = api
        .upload(b"esto no es un zip", "rm.xlsx", None, false)
        .await
        .unwrap();
    let IngestResponse::Summary(result) = response else {
        panic!("应返回 JSON 汇总");
    };
    assert!(!result.ok);
    assert_eq!(result.incidences.len(), 1);
    assert!(result.incidences[0]
        .reason
        .starts_with("ERROR FATAL: No se pudo leer el archivo"));
}

#[tokio::test]
async fn test_upload_with_deprati_layout() {
    logging::init_test();
    let (_temp_file, db_path) = create_seeded_db();
    seed_client(&open_test_conn(&db_path), DEPRATI_CLIENT_CODE, "Deprati");
    let api = IngestApi::new(db_path.clone());

    let bytes = xlsx_workbook(&[(
        "Hoja1",
        vec![
            vec![XCell::Empty, XCell::Empty, XCell::Empty, XCell::Empty, XCell::Text("Tienda 101")],
            vec![XCell::Empty, XCell::Empty, XCell::Empty, XCell::Empty, XCell::Text("Mall del Sol")],
            vec![
                XCell::Text("Día natural"),
                XCell::Text("Marca"),
                XCell::Text("Nombre Producto"),
                XCell::Text("Código de Barras"),
            ],
            vec![XCell::Empty, XCell::Empty, XCell::Empty, XCell::Empty, XCell::Text("UN"), XCell::Text("USD")],
            vec![
                XCell::Date(2024, 1, 10),
                XCell::Text("MARCA_B"),
                XCell::Text("Yogurt"),
                XCell::Text("CB2"),
                XCell::Number(4.0),
                XCell::Number(6.0),
            ],
            vec![
                XCell::Text("10/01/24"),
                XCell::Text("MARCA_B"),
                XCell::Text("Yogurt"),
                XCell::Text("CB2"),
                XCell::Number(1.0),
            ],
        ],
    )]);

    let response = api
        .upload_with_layout(&bytes, "deprati.xlsx", None, true, PartnerLayout::deprati())
        .await
        .unwrap();
    let IngestResponse::TextReport { file_name, content } = response else {
        panic!("应返回文本报告");
    };

    assert!(file_name.starts_with("incidencias_DEPRATI_"));
    assert!(content.starts_with("INCIDENCIAS DE CARGA DEPRATI\nArchivo: deprati.xlsx\n"));
    assert!(content.contains("Ventas - Filas leídas: 2\n"));
    assert!(content.contains("Ventas - Filas procesadas: 1\n"));
    // 两位年份不被当作公元 24 年
    assert!(content.contains("VENTAS\t6\tCB2\tfecha vacía o no reconocida\n"));
    assert_eq!(count_ledger(&open_test_conn(&db_path)), 1);
}
