use std::io::Write as _;

use rusqlite::Connection;
use tabula::{
    render, streaming_render, Column, ColumnType, Format, RenderOptions,
    Row, RowStream, SqliteSource, Value,
};

fn seeded_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER, name VARCHAR(30));
         INSERT INTO users VALUES (1, 'Alice'), (2, NULL);",
    )
    .unwrap();
    conn
}

#[test]
fn test_sqlite_query_to_csv() {
    let conn = seeded_connection();
    let source = SqliteSource::new(&conn);
    let result = source
        .query("SELECT id, name FROM users ORDER BY id", &[])
        .unwrap();

    let options = RenderOptions::new(Format::Csv);
    let bytes = render(&options, &result.columns, &result.rows).unwrap();
    assert_eq!(bytes, b"\xEF\xBB\xBFid,name\n1,Alice\n2,\n".to_vec());
}

#[test]
fn test_sqlite_query_to_insert_statements() {
    let conn = seeded_connection();
    let source = SqliteSource::new(&conn);
    let result = source
        .query("SELECT id, name FROM users ORDER BY id", &[])
        .unwrap();

    let options = RenderOptions {
        target_table: Some("users"),
        ..RenderOptions::new(Format::Sql)
    };
    let bytes = render(&options, &result.columns, &result.rows).unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "INSERT INTO users (id,name) VALUES (1,'Alice');\n\
         INSERT INTO users (id,name) VALUES (2,NULL);\n"
    );
}

#[test]
fn test_sqlite_query_to_json_array() {
    let conn = seeded_connection();
    let source = SqliteSource::new(&conn);
    let result = source
        .query("SELECT id, name FROM users ORDER BY id", &[])
        .unwrap();

    let options = RenderOptions::new(Format::Json);
    let bytes = render(&options, &result.columns, &result.rows).unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"[{"id":1,"name":"Alice"},{"id":2,"name":null}]"#
    );
}

#[test]
fn test_streaming_and_eager_plain_agree() {
    let columns = vec![
        Column::new("id".to_string(), ColumnType::Int),
        Column::varchar("name"),
    ];
    let rows = vec![
        Row::new(vec![
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("Alice".to_string())),
        ]),
        Row::new(vec![
            ("id".to_string(), Value::Int(2)),
            ("name".to_string(), Value::Null),
        ]),
    ];

    let options = RenderOptions {
        no_header: true,
        ..RenderOptions::new(Format::Plain)
    };
    let eager = render(&options, &columns, &rows).unwrap();
    assert_eq!(String::from_utf8(eager.clone()).unwrap(), "1, Alice\n2, \n");

    let stream = RowStream::from_rows(columns, rows);
    let mut streamed: Vec<u8> = Vec::new();
    let total = streaming_render(&mut streamed, &options, stream).unwrap();

    assert_eq!(total, 2);
    assert_eq!(eager, streamed);
}

#[test]
fn test_streaming_ndjson_envelope_differs_from_eager_array() {
    let columns = vec![Column::new("n".to_string(), ColumnType::Int)];
    let rows =
        vec![Row::new(vec![("n".to_string(), Value::Int(1))])];

    let options = RenderOptions::new(Format::Json);
    let eager = render(&options, &columns, &rows).unwrap();
    assert_eq!(String::from_utf8(eager).unwrap(), r#"[{"n":1}]"#);

    let stream = RowStream::from_rows(columns, rows);
    let mut streamed: Vec<u8> = Vec::new();
    streaming_render(&mut streamed, &options, stream).unwrap();
    assert_eq!(String::from_utf8(streamed).unwrap(), "{\"n\":1}\n");
}

#[test]
fn test_fly_tables_queried_through_renderer() {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();
    file.write_all(b"city,population\nTokyo,37400068\nDelhi,28514000\n")
        .unwrap();

    let options = tabula::FlyOptions {
        input_files: vec![format!(
            "cities:{}",
            file.path().to_string_lossy()
        )],
        csv_delimiter: b',',
        temp_ds: ":memory:".to_string(),
        use_column_num: false,
        headers_only: false,
    };

    let conn = tabula::open_database(":memory:").unwrap();
    let tables = tabula::load_tables(&conn, &options).unwrap();
    assert_eq!(tables.len(), 1);

    let source = SqliteSource::new(&conn);
    let result = source
        .query(
            "SELECT city FROM cities WHERE CAST(population AS INTEGER) \
             > 30000000",
            &[],
        )
        .unwrap();

    let render_options = RenderOptions {
        no_header: true,
        ..RenderOptions::new(Format::Plain)
    };
    let bytes =
        render(&render_options, &result.columns, &result.rows).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), "Tokyo\n");
}
