use bookshelf_core::db::open_db_in_memory;
use bookshelf_core::interchange::{
    export_all, export_to_writer, import_all, import_from_reader, CSV_HEADER,
};
use bookshelf_core::{
    Book, BookListQuery, BookPatch, BookRepository, BookService, FieldUpdate, ImportReport,
    InterchangeError, SqliteBookRepository,
};
use std::collections::HashSet;
use std::io::Cursor;

fn catalog() -> Vec<Book> {
    vec![
        Book {
            id: None,
            title: "The Left Hand of Darkness".to_string(),
            author: Some("Ursula K. Le Guin".to_string()),
            year: Some(1969),
            genre: Some("Science Fiction".to_string()),
            rating: Some(5),
            notes: Some("Gethen, \"winter\", ansible".to_string()),
        },
        Book {
            id: None,
            title: "Notes, Unsorted".to_string(),
            author: None,
            year: None,
            genre: None,
            rating: None,
            notes: Some("first line\nsecond line".to_string()),
        },
        Book {
            id: None,
            title: "Middlemarch".to_string(),
            author: Some("George Eliot".to_string()),
            year: Some(1871),
            genre: None,
            rating: None,
            notes: None,
        },
    ]
}

type BookFields = (
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<i64>,
    Option<String>,
);

fn without_ids(books: Vec<Book>) -> HashSet<BookFields> {
    books
        .into_iter()
        .map(|b| (b.title, b.author, b.year, b.genre, b.rating, b.notes))
        .collect()
}

#[test]
fn export_writes_header_and_empty_cells_for_absent_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    repo.create_book(&Book::new("Lonely Title")).unwrap();

    let mut out = Vec::new();
    let count = export_to_writer(&repo, &mut out).unwrap();
    assert_eq!(count, 1);

    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
    assert_eq!(lines.next(), Some("1,Lonely Title,,,,,"));
    assert_eq!(lines.next(), None);
}

#[test]
fn export_then_import_reproduces_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("books_export.csv");

    let source_conn = open_db_in_memory().unwrap();
    let source = SqliteBookRepository::try_new(&source_conn).unwrap();
    for book in catalog() {
        source.create_book(&book).unwrap();
    }
    assert_eq!(export_all(&source, &path).unwrap(), 3);

    let target_conn = open_db_in_memory().unwrap();
    let target = SqliteBookRepository::try_new(&target_conn).unwrap();
    let report = import_all(&target, &path, true).unwrap();
    assert_eq!(
        report,
        ImportReport {
            imported: 3,
            skipped: 0
        }
    );

    let imported = target.list_books(&BookListQuery::default()).unwrap();
    assert_eq!(without_ids(imported), without_ids(catalog()));
}

#[test]
fn empty_text_written_through_repository_survives_round_trip() {
    let source_conn = open_db_in_memory().unwrap();
    let source = SqliteBookRepository::try_new(&source_conn).unwrap();
    let id = source
        .create_book(&Book {
            author: Some(String::new()),
            genre: Some("Drama".to_string()),
            ..Book::new("Blank Byline")
        })
        .unwrap();
    source
        .update_book(
            id,
            &BookPatch {
                genre: FieldUpdate::Set(String::new()),
                ..BookPatch::default()
            },
        )
        .unwrap();

    let mut out = Vec::new();
    export_to_writer(&source, &mut out).unwrap();

    let target_conn = open_db_in_memory().unwrap();
    let target = SqliteBookRepository::try_new(&target_conn).unwrap();
    import_from_reader(&target, Cursor::new(out), true).unwrap();

    let before = source.list_books(&BookListQuery::default()).unwrap();
    let after = target.list_books(&BookListQuery::default()).unwrap();
    assert_eq!(before[0].author, None);
    assert_eq!(before[0].genre, None);
    assert_eq!(without_ids(after), without_ids(before));
}

#[test]
fn import_skips_rows_without_title_and_counts_them() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let input = "id,title,author,year,genre,rating,notes\n\
                 1,Kept,Author,2001,Drama,3,\n\
                 2,,Nobody,1999,,,\n\
                 3\n\
                 4,   ,Blank,,,,\n\
                 5,Also Kept\n";
    let report = import_from_reader(&repo, Cursor::new(input), true).unwrap();
    assert_eq!(
        report,
        ImportReport {
            imported: 2,
            skipped: 3
        }
    );

    let books = repo.list_books(&BookListQuery::default()).unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title, "Kept");
    assert_eq!(books[0].rating, Some(3));
    assert_eq!(books[1].title, "Also Kept");
    assert_eq!(books[1].author, None);
}

#[test]
fn import_treats_non_numeric_year_and_rating_as_absent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let input = "9,Odd Numbers,Someone,circa 1900,Essay,-2,kept note\n";
    let report = import_from_reader(&repo, Cursor::new(input), false).unwrap();
    assert_eq!(report.imported, 1);

    let book = repo.get_book(1).unwrap().unwrap();
    assert_eq!(book.year, None);
    assert_eq!(book.rating, None);
    assert_eq!(book.genre.as_deref(), Some("Essay"));
    assert_eq!(book.notes.as_deref(), Some("kept note"));
}

#[test]
fn import_without_skip_header_reads_first_row_as_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let input = ",Headerless,Writer,2020,,,\n";
    let report = import_from_reader(&repo, Cursor::new(input), false).unwrap();
    assert_eq!(report.imported, 1);

    let with_header = "id,title,author,year,genre,rating,notes\n";
    let report = import_from_reader(&repo, Cursor::new(with_header), false).unwrap();
    assert_eq!(report.imported, 1, "header row has a usable `title` cell");
}

#[test]
fn import_skips_undecodable_records_and_continues() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();

    let mut input = b"id,title\n1,Good One\n2,".to_vec();
    input.extend_from_slice(&[0xff, 0xfe]);
    input.extend_from_slice(b"\n3,Good Two\n");

    let report = import_from_reader(&repo, Cursor::new(input), true).unwrap();
    assert_eq!(
        report,
        ImportReport {
            imported: 2,
            skipped: 1
        }
    );
}

#[test]
fn import_of_missing_file_reports_path() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.csv");

    match import_all(&repo, &missing, true).unwrap_err() {
        InterchangeError::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn service_exports_and_imports_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shelf.csv");

    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    service.add_book(&Book::new("Beloved")).unwrap();

    assert_eq!(service.export_csv(&path).unwrap(), 1);
    let report = service.import_csv(&path, true).unwrap();
    assert_eq!(report.imported, 1);

    let titles: Vec<String> = service
        .list_books(&BookListQuery::default())
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["Beloved", "Beloved"]);
}
